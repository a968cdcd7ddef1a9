//! Charter Engine: governance proposals from submission to enactment.
//!
//! Proposals are submitted with a list of parameter [`Change`]s, voted on
//! during a fixed window, evaluated against quorum and pass thresholds, and
//! after an enactment delay handed to a [`ChangeApplier`]. The applier used in
//! production is [`RulebookApplier`], which activates a new ruleset version.
//!
//! Time only moves when [`Engine::tick`] is called, normally by a
//! [`TickScheduler`]. Every failure path leaves the proposal `Failed` (or the
//! request rejected) and the ruleset untouched.
//!
//! [`Change`]: charter_types::Change

#![deny(unsafe_code)]

pub mod applier;
pub mod config;
pub mod engine;
pub mod error;
pub mod events;
pub mod proposal;
pub mod scheduler;
pub mod tally;

pub use applier::{ChangeApplier, Enactment, RulebookApplier};
pub use config::{EngineConfig, VotingRules};
pub use engine::{Engine, TickReport, Transition};
pub use error::{ApplyError, GovernanceError};
pub use events::{GovernanceEvent, GovernanceEventKind};
pub use proposal::{
    FailureReason, Proposal, ProposalDraft, ProposalState, VetoRecord, Vote, VoteRecord,
};
pub use scheduler::TickScheduler;
pub use tally::{evaluate, TallyOutcome, Verdict};
