//! Engine configuration

use chrono::Duration;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::GovernanceError;

/// Upper bound on any configured period, about a century.
pub const MAX_PERIOD_SECS: u64 = 100 * 365 * 24 * 60 * 60;

/// Governance timing and voting rules.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Length of the voting window
    #[serde(default = "default_voting_period")]
    pub voting_period_secs: u64,

    /// Cool-down between the end of voting and enactment
    #[serde(default = "default_enactment_delay")]
    pub enactment_delay_secs: u64,

    /// How long after `enactment_time` a succeeded proposal may still be
    /// enacted. `None` never expires.
    #[serde(default = "default_enactment_grace")]
    pub enactment_grace_secs: Option<u64>,

    /// Minimum participation, as a fraction of total voting power
    #[serde(default = "default_quorum")]
    pub quorum_threshold: Decimal,

    /// Minimum share of votes cast that must be in favor
    #[serde(default = "default_pass")]
    pub pass_threshold: Decimal,

    /// Number of eligible voters
    #[serde(default = "default_voting_power")]
    pub total_voting_power: u64,

    /// Deadline for a single `ChangeApplier::apply` call
    #[serde(default = "default_apply_timeout")]
    pub apply_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            voting_period_secs: default_voting_period(),
            enactment_delay_secs: default_enactment_delay(),
            enactment_grace_secs: default_enactment_grace(),
            quorum_threshold: default_quorum(),
            pass_threshold: default_pass(),
            total_voting_power: default_voting_power(),
            apply_timeout_ms: default_apply_timeout(),
        }
    }
}

impl EngineConfig {
    pub fn validate(&self) -> Result<(), GovernanceError> {
        if self.voting_period_secs == 0 {
            return invalid("voting_period_secs must be positive");
        }
        let periods = [
            ("voting_period_secs", Some(self.voting_period_secs)),
            ("enactment_delay_secs", Some(self.enactment_delay_secs)),
            ("enactment_grace_secs", self.enactment_grace_secs),
        ];
        for (name, secs) in periods {
            if secs.is_some_and(|s| s > MAX_PERIOD_SECS) {
                return invalid(format!("{name} exceeds {MAX_PERIOD_SECS}"));
            }
        }
        for (name, value) in [
            ("quorum_threshold", self.quorum_threshold),
            ("pass_threshold", self.pass_threshold),
        ] {
            if value < Decimal::ZERO || value > Decimal::ONE {
                return invalid(format!("{name} must be within [0, 1], got {value}"));
            }
        }
        if self.apply_timeout_ms == 0 {
            return invalid("apply_timeout_ms must be positive");
        }
        Ok(())
    }

    pub fn voting_period(&self) -> Duration {
        seconds(self.voting_period_secs)
    }

    pub fn enactment_delay(&self) -> Duration {
        seconds(self.enactment_delay_secs)
    }

    pub fn enactment_grace(&self) -> Option<Duration> {
        self.enactment_grace_secs.map(seconds)
    }

    pub fn apply_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.apply_timeout_ms)
    }

    pub fn voting_rules(&self) -> VotingRules {
        VotingRules {
            quorum_threshold: self.quorum_threshold,
            pass_threshold: self.pass_threshold,
            total_voting_power: self.total_voting_power,
        }
    }
}

/// The subset of [`EngineConfig`] that decides a vote.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VotingRules {
    pub quorum_threshold: Decimal,
    pub pass_threshold: Decimal,
    pub total_voting_power: u64,
}

fn invalid(reason: impl Into<String>) -> Result<(), GovernanceError> {
    Err(GovernanceError::InvalidConfig(reason.into()))
}

fn seconds(secs: u64) -> Duration {
    // Clamped so an unvalidated config cannot overflow chrono.
    Duration::seconds(secs.min(MAX_PERIOD_SECS) as i64)
}

// Default value helpers
fn default_voting_period() -> u64 {
    3 * 24 * 60 * 60
}

fn default_enactment_delay() -> u64 {
    24 * 60 * 60
}

fn default_enactment_grace() -> Option<u64> {
    Some(7 * 24 * 60 * 60)
}

fn default_quorum() -> Decimal {
    Decimal::new(4, 1)
}

fn default_pass() -> Decimal {
    Decimal::new(66, 2)
}

fn default_voting_power() -> u64 {
    100
}

fn default_apply_timeout() -> u64 {
    30_000
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_default_config() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.voting_period(), Duration::days(3));
        assert_eq!(config.enactment_delay(), Duration::days(1));
        assert_eq!(config.enactment_grace(), Some(Duration::days(7)));
        assert_eq!(config.quorum_threshold, dec!(0.4));
        assert_eq!(config.pass_threshold, dec!(0.66));
    }

    #[test]
    fn thresholds_must_be_fractions() {
        let config = EngineConfig {
            pass_threshold: dec!(1.01),
            ..Default::default()
        };
        assert!(matches!(
            config.validate(),
            Err(GovernanceError::InvalidConfig(_))
        ));

        let config = EngineConfig {
            quorum_threshold: dec!(-0.1),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn zero_voting_period_rejected() {
        let config = EngineConfig {
            voting_period_secs: 0,
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn missing_fields_take_defaults() {
        let config: EngineConfig =
            serde_json::from_str(r#"{"quorum_threshold":"0.5","enactment_grace_secs":null}"#)
                .unwrap();
        assert_eq!(config.quorum_threshold, dec!(0.5));
        assert_eq!(config.enactment_grace_secs, None);
        assert_eq!(config.total_voting_power, 100);
    }
}
