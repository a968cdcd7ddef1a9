//! The enactment seam between the engine and the policy store.

use async_trait::async_trait;
use charter_rulebook::Rulebook;
use charter_types::{Change, ProposalId};
use std::sync::Arc;

use crate::error::ApplyError;

/// What a successful apply produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Enactment {
    /// Version activated by the apply, when the target is versioned.
    pub ruleset_version: Option<u64>,
}

/// Applies an enacted proposal's changes to their target.
///
/// Implementations must be all-or-nothing: an `Err` means nothing was
/// applied.
#[async_trait]
pub trait ChangeApplier: Send + Sync {
    async fn apply(
        &self,
        proposal_id: &ProposalId,
        changes: &[Change],
    ) -> Result<Enactment, ApplyError>;
}

/// Applies changes to a shared [`Rulebook`].
#[derive(Clone)]
pub struct RulebookApplier {
    rulebook: Arc<Rulebook>,
}

impl RulebookApplier {
    pub fn new(rulebook: Arc<Rulebook>) -> Self {
        Self { rulebook }
    }

    pub fn rulebook(&self) -> &Arc<Rulebook> {
        &self.rulebook
    }
}

#[async_trait]
impl ChangeApplier for RulebookApplier {
    async fn apply(
        &self,
        proposal_id: &ProposalId,
        changes: &[Change],
    ) -> Result<Enactment, ApplyError> {
        let activated = self.rulebook.apply_update(proposal_id, changes)?;
        Ok(Enactment {
            ruleset_version: Some(activated.version),
        })
    }
}
