//! Proposals and their lifecycle.
//!
//! ```text
//! Proposed ──► Voting ──► Succeeded ──► Enacted
//!    │            │   └─► Failed    ├─► Failed
//!    └──► Vetoed ◄┘                 └─► Expired
//! ```
//!
//! Terminal states never transition again.

use charter_types::{Change, ProposalId, VoterId};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

use crate::error::GovernanceError;
use crate::tally::TallyOutcome;

/// Lifecycle state of a proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProposalState {
    Proposed,
    Voting,
    Succeeded,
    Failed,
    Enacted,
    Vetoed,
    Expired,
}

impl ProposalState {
    pub fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::Failed | Self::Enacted | Self::Vetoed | Self::Expired
        )
    }

    /// Whether `next` is a legal successor of this state.
    pub fn can_transition_to(self, next: ProposalState) -> bool {
        use ProposalState::*;
        matches!(
            (self, next),
            (Proposed, Voting)
                | (Proposed, Vetoed)
                | (Voting, Succeeded)
                | (Voting, Failed)
                | (Voting, Vetoed)
                | (Succeeded, Enacted)
                | (Succeeded, Failed)
                | (Succeeded, Expired)
        )
    }
}

impl fmt::Display for ProposalState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Proposed => "proposed",
            Self::Voting => "voting",
            Self::Succeeded => "succeeded",
            Self::Failed => "failed",
            Self::Enacted => "enacted",
            Self::Vetoed => "vetoed",
            Self::Expired => "expired",
        };
        f.write_str(name)
    }
}

/// What a caller supplies to submit a proposal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProposalDraft {
    pub id: ProposalId,
    pub title: String,
    pub description: String,
    pub proposer: String,
    /// Applied together, in order, or not at all.
    pub changes: Vec<Change>,
}

impl ProposalDraft {
    pub fn new(id: impl Into<ProposalId>, proposer: impl Into<String>, changes: Vec<Change>) -> Self {
        Self {
            id: id.into(),
            title: String::new(),
            description: String::new(),
            proposer: proposer.into(),
            changes,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }
}

/// A single ballot, as handed over by the authentication layer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Vote {
    pub voter_id: VoterId,
    pub proposal_id: ProposalId,
    pub in_favor: bool,
    pub timestamp: DateTime<Utc>,
}

impl Vote {
    pub fn new(
        voter_id: impl Into<VoterId>,
        proposal_id: impl Into<ProposalId>,
        in_favor: bool,
        timestamp: DateTime<Utc>,
    ) -> Self {
        Self {
            voter_id: voter_id.into(),
            proposal_id: proposal_id.into(),
            in_favor,
            timestamp,
        }
    }
}

/// A recorded vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteRecord {
    pub in_favor: bool,
    /// Engine time at which the vote was accepted.
    pub cast_at: DateTime<Utc>,
    /// Time the voter claims to have signed the vote.
    pub submitted_at: DateTime<Utc>,
}

/// Why a proposal ended in [`ProposalState::Failed`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "detail", rename_all = "snake_case")]
pub enum FailureReason {
    QuorumNotMet,
    NoVotes,
    BelowPassThreshold,
    ApplicationFailed(String),
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::QuorumNotMet => f.write_str("quorum not met"),
            Self::NoVotes => f.write_str("no votes cast"),
            Self::BelowPassThreshold => f.write_str("pass threshold not reached"),
            Self::ApplicationFailed(reason) => write!(f, "application failed: {reason}"),
        }
    }
}

/// Administrative override record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VetoRecord {
    pub by: String,
    pub reason: String,
    pub at: DateTime<Utc>,
}

/// A governance proposal.
///
/// The engine owns the live value; callers only ever see clones.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Proposal {
    pub id: ProposalId,
    pub title: String,
    pub description: String,
    pub proposer: String,
    pub changes: Vec<Change>,
    pub state: ProposalState,
    pub submit_time: DateTime<Utc>,
    pub voting_start_time: DateTime<Utc>,
    pub voting_end_time: DateTime<Utc>,
    pub enactment_time: DateTime<Utc>,
    pub votes_for: u64,
    pub votes_against: u64,
    pub voters: BTreeMap<VoterId, VoteRecord>,
    /// Tally captured when voting closed.
    pub outcome: Option<TallyOutcome>,
    pub failure_reason: Option<FailureReason>,
    /// Ruleset version produced by enactment, when the applier reports one.
    pub enacted_version: Option<u64>,
    pub veto: Option<VetoRecord>,
}

impl Proposal {
    pub(crate) fn from_draft(
        draft: ProposalDraft,
        submit_time: DateTime<Utc>,
        voting_end_time: DateTime<Utc>,
        enactment_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: draft.id,
            title: draft.title,
            description: draft.description,
            proposer: draft.proposer,
            changes: draft.changes,
            state: ProposalState::Proposed,
            submit_time,
            voting_start_time: submit_time,
            voting_end_time,
            enactment_time,
            votes_for: 0,
            votes_against: 0,
            voters: BTreeMap::new(),
            outcome: None,
            failure_reason: None,
            enacted_version: None,
            veto: None,
        }
    }

    pub fn total_votes(&self) -> u64 {
        self.votes_for + self.votes_against
    }

    pub fn has_voted(&self, voter_id: &VoterId) -> bool {
        self.voters.contains_key(voter_id)
    }

    /// Whether `now` falls in `[voting_start_time, voting_end_time)`.
    pub fn is_voting_open_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.voting_start_time && now < self.voting_end_time
    }

    /// Record a ballot. The voter map is the only double-vote guard.
    pub(crate) fn record_vote(
        &mut self,
        vote: &Vote,
        now: DateTime<Utc>,
    ) -> Result<(), GovernanceError> {
        if self.state != ProposalState::Voting {
            return Err(GovernanceError::InvalidState {
                proposal_id: self.id.clone(),
                state: self.state,
                operation: "vote on",
            });
        }
        if !self.is_voting_open_at(now) {
            return Err(GovernanceError::VotingClosed(self.id.clone()));
        }
        if self.has_voted(&vote.voter_id) {
            return Err(GovernanceError::AlreadyVoted {
                proposal_id: self.id.clone(),
                voter_id: vote.voter_id.clone(),
            });
        }

        if vote.in_favor {
            self.votes_for += 1;
        } else {
            self.votes_against += 1;
        }
        self.voters.insert(
            vote.voter_id.clone(),
            VoteRecord {
                in_favor: vote.in_favor,
                cast_at: now,
                submitted_at: vote.timestamp,
            },
        );
        Ok(())
    }

    pub(crate) fn transition(&mut self, next: ProposalState) {
        debug_assert!(
            self.state.can_transition_to(next),
            "illegal transition {} -> {}",
            self.state,
            next
        );
        self.state = next;
    }

    pub(crate) fn fail(&mut self, reason: FailureReason) {
        self.transition(ProposalState::Failed);
        self.failure_reason = Some(reason);
    }
}
