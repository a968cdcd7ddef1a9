//! Error types for charterd

use charter_engine::GovernanceError;
use charter_rulebook::RulebookError;
use thiserror::Error;

/// Daemon-level errors
#[derive(Debug, Error)]
pub enum DaemonError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// The genesis ruleset could not be loaded or is invalid
    #[error("Genesis error: {0}")]
    Genesis(#[from] RulebookError),

    /// The engine refused its configuration
    #[error("Engine error: {0}")]
    Engine(#[from] GovernanceError),

    /// The tick scheduler task ended abnormally
    #[error("Scheduler error: {0}")]
    Scheduler(String),
}

impl From<config::ConfigError> for DaemonError {
    fn from(err: config::ConfigError) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for daemon operations
pub type DaemonResult<T> = Result<T, DaemonError>;
