use charter_types::ChangeError;
use std::path::PathBuf;
use thiserror::Error;

use crate::validation::Violation;

/// Errors from the Rulebook.
#[derive(Debug, Error)]
pub enum RulebookError {
    #[error("ruleset version not found: {0}")]
    VersionNotFound(u64),

    #[error("change rejected: {0}")]
    InvalidChange(#[from] ChangeError),

    #[error("update contains no changes")]
    EmptyChangeSet,

    #[error("ruleset validation failed: {}", join_violations(.0))]
    ValidationFailed(Vec<Violation>),

    #[error("genesis ruleset must be version 1, got version {0}")]
    InvalidGenesisVersion(u64),

    #[error("policy load failed: {0}")]
    Load(#[from] LoaderError),
}

impl RulebookError {
    /// Whether this error came from holistic validation rather than from
    /// decoding an individual change.
    pub fn is_validation_failure(&self) -> bool {
        matches!(self, Self::ValidationFailed(_))
    }
}

fn join_violations(violations: &[Violation]) -> String {
    violations
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// Errors from a [`PolicyLoader`](crate::PolicyLoader).
#[derive(Debug, Error)]
pub enum LoaderError {
    #[error("cannot read policy file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse policy file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}
