//! Governance engine error types.

use charter_rulebook::RulebookError;
use charter_types::{ProposalId, VoterId};
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::proposal::ProposalState;

/// Errors returned by [`Engine`](crate::Engine) operations.
#[derive(Debug, Error)]
pub enum GovernanceError {
    /// No proposal with this ID exists.
    #[error("proposal not found: {0}")]
    NotFound(ProposalId),

    /// A proposal with this ID was already submitted.
    #[error("duplicate proposal id: {0}")]
    DuplicateId(ProposalId),

    /// The operation is not legal in the proposal's current lifecycle state.
    #[error("cannot {operation} proposal {proposal_id} in state {state}")]
    InvalidState {
        proposal_id: ProposalId,
        state: ProposalState,
        operation: &'static str,
    },

    /// The vote arrived outside the voting window.
    #[error("voting is closed for proposal {0}")]
    VotingClosed(ProposalId),

    /// The voter already has a recorded vote on this proposal.
    #[error("voter {voter_id} already voted on proposal {proposal_id}")]
    AlreadyVoted {
        proposal_id: ProposalId,
        voter_id: VoterId,
    },

    /// The submitted proposal is malformed.
    #[error("invalid proposal: {0}")]
    InvalidProposal(String),

    /// The engine configuration is unusable.
    #[error("invalid engine configuration: {0}")]
    InvalidConfig(String),

    /// `tick` was called with a time earlier than the previous tick.
    #[error("tick time {now} precedes previous tick at {previous}")]
    ClockRegression {
        previous: DateTime<Utc>,
        now: DateTime<Utc>,
    },
}

/// Errors from a [`ChangeApplier`](crate::ChangeApplier).
///
/// Any of these turns a succeeded proposal into a failed one.
#[derive(Debug, Error)]
pub enum ApplyError {
    /// The policy store refused the changes.
    #[error("changes rejected: {0}")]
    Rejected(#[from] RulebookError),

    /// The applier did not finish within the configured timeout.
    #[error("apply timed out after {0}ms")]
    Timeout(u64),

    /// The downstream target could not be reached.
    #[error("apply target unavailable: {0}")]
    Unavailable(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn invalid_state_display() {
        let err = GovernanceError::InvalidState {
            proposal_id: ProposalId::new("prop-7"),
            state: ProposalState::Proposed,
            operation: "vote on",
        };
        assert_eq!(
            err.to_string(),
            "cannot vote on proposal prop-7 in state proposed"
        );
    }

    #[test]
    fn timeout_display() {
        assert_eq!(
            ApplyError::Timeout(30000).to_string(),
            "apply timed out after 30000ms"
        );
    }
}
