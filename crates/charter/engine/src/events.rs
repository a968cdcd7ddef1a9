//! Operator-visible governance events.

use charter_types::{ProposalId, VoterId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::proposal::FailureReason;

/// Capacity of the engine's event channel. Slow subscribers lag rather than
/// block the engine.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;

/// Something that happened to a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GovernanceEventKind {
    Submitted { proposer: String, changes: usize },
    VotingOpened { voting_end_time: DateTime<Utc> },
    VoteCast { voter_id: VoterId, in_favor: bool },
    Succeeded { votes_for: u64, votes_against: u64 },
    Failed { reason: FailureReason },
    Enacted { ruleset_version: Option<u64> },
    EnactmentFailed { error: String },
    Vetoed { by: String, reason: String },
    Expired,
}

/// Envelope broadcast by the engine.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GovernanceEvent {
    pub proposal_id: ProposalId,
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: GovernanceEventKind,
}

impl GovernanceEvent {
    pub fn new(proposal_id: ProposalId, at: DateTime<Utc>, kind: GovernanceEventKind) -> Self {
        Self {
            proposal_id,
            at,
            kind,
        }
    }
}
