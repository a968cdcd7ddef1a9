//! # charter-rulebook
//!
//! The versioned policy store. A [`Ruleset`] is an immutable snapshot of every
//! governable parameter; the [`Rulebook`] holds the current one plus all
//! previous versions and is the only place a new ruleset can become current.
//!
//! ## Update discipline
//!
//! [`Rulebook::apply_update`] clones the current ruleset, applies every change
//! to the clone through a closed `match` over [`ParameterKey`], validates the
//! result as a whole, and only then swaps it in. Any failure discards the
//! clone, so readers never observe a partially applied ruleset.
//!
//! ## Holistic invariants
//!
//! - collateralization ratio > 1.0
//! - 0 <= liquidation penalty <= 0.5
//! - max position size >= 0
//! - max open orders per account > 0
//! - transaction fee <= 10 000 bps
//! - asset registry non-empty, asset decimals <= 28
//!
//! [`ParameterKey`]: charter_types::ParameterKey

#![deny(unsafe_code)]

pub mod error;
pub mod loader;
pub mod ruleset;
pub mod store;
pub mod validation;

pub use error::{LoaderError, RulebookError};
pub use loader::{FilePolicyLoader, GenesisDocument, PolicyLoader, StaticPolicyLoader};
pub use ruleset::{RiskParameters, Ruleset, SystemParameters};
pub use store::Rulebook;
pub use validation::Violation;
