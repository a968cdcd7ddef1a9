//! Charter Types - Core types for the governance policy engine
//!
//! Charter lets a system evolve its own operating parameters (risk limits,
//! fees, asset lists, emergency halts) through time-boxed voting, and applies
//! approved changes to a versioned policy store.
//!
//! ## Key Concepts
//!
//! - **Change**: a single `parameter_key = new_value` mutation, stringly encoded
//! - **ParameterKey**: the closed set of governable parameters a change may name
//! - **AssetDefinition**: one entry of the governed asset registry
//! - **Clock**: injectable time source so lifecycle tests are deterministic

#![deny(unsafe_code)]

pub mod asset;
pub mod change;
pub mod clock;
pub mod error;
pub mod ids;

pub use asset::{AssetDefinition, AssetSymbol};
pub use change::{Change, ParameterKey, ParameterValue, ParsedChange};
pub use clock::{Clock, ManualClock, SystemClock};
pub use error::ChangeError;
pub use ids::{ProposalId, VoterId};
