//! Vote evaluation.
//!
//! Quorum is checked before anything that assumes votes were cast. Ratios are
//! compared by cross-multiplication in exact decimal arithmetic
//! (`for >= pass * total` rather than `for / total >= pass`), so a tie is never
//! lost to rounding. Ties pass.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::config::VotingRules;
use crate::proposal::FailureReason;

/// Result of evaluating a closed vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Passed,
    QuorumNotMet,
    NoVotes,
    BelowPassThreshold,
}

impl Verdict {
    pub fn passed(self) -> bool {
        matches!(self, Self::Passed)
    }

    pub fn failure_reason(self) -> Option<FailureReason> {
        match self {
            Self::Passed => None,
            Self::QuorumNotMet => Some(FailureReason::QuorumNotMet),
            Self::NoVotes => Some(FailureReason::NoVotes),
            Self::BelowPassThreshold => Some(FailureReason::BelowPassThreshold),
        }
    }
}

/// The numbers behind a verdict, kept on the proposal for audit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TallyOutcome {
    pub votes_for: u64,
    pub votes_against: u64,
    pub total_voting_power: u64,
    /// `total / total_voting_power`; zero when there is no voting power.
    pub participation: Decimal,
    /// `for / total`; absent when no votes were cast.
    pub pass_rate: Option<Decimal>,
    pub verdict: Verdict,
}

/// Evaluate a closed vote.
pub fn evaluate(votes_for: u64, votes_against: u64, rules: &VotingRules) -> TallyOutcome {
    let total = votes_for + votes_against;
    let total_d = Decimal::from(total);
    let power_d = Decimal::from(rules.total_voting_power);

    let participation = total_d.checked_div(power_d).unwrap_or(Decimal::ZERO);
    let pass_rate = Decimal::from(votes_for).checked_div(total_d);

    let verdict = if rules.total_voting_power == 0
        || total_d < rules.quorum_threshold * power_d
    {
        Verdict::QuorumNotMet
    } else if total == 0 {
        Verdict::NoVotes
    } else if Decimal::from(votes_for) >= rules.pass_threshold * total_d {
        Verdict::Passed
    } else {
        Verdict::BelowPassThreshold
    };

    TallyOutcome {
        votes_for,
        votes_against,
        total_voting_power: rules.total_voting_power,
        participation,
        pass_rate,
        verdict,
    }
}
