use charter_types::{Change, Clock, ProposalId, SystemClock};
use std::collections::BTreeMap;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::RulebookError;
use crate::loader::PolicyLoader;
use crate::ruleset::Ruleset;

/// Thread-safe holder of the current [`Ruleset`] and every prior version.
///
/// Construct one per process (or per test) and share it by `Arc`; there is no
/// global instance. Readers get an `Arc<Ruleset>` snapshot under a brief read
/// lock. Updates serialize on the write lock; governance changes are rare, so
/// one lock for the whole store is enough.
pub struct Rulebook {
    state: RwLock<RulebookState>,
    clock: Arc<dyn Clock>,
    activations: watch::Sender<Arc<Ruleset>>,
}

struct RulebookState {
    current: Arc<Ruleset>,
    history: BTreeMap<u64, Arc<Ruleset>>,
}

impl Rulebook {
    /// Create a rulebook from a genesis ruleset, using the system clock.
    pub fn new(genesis: Ruleset) -> Result<Self, RulebookError> {
        Self::with_clock(genesis, Arc::new(SystemClock))
    }

    /// Create a rulebook from a genesis ruleset.
    ///
    /// The genesis ruleset must be version 1 and pass holistic validation.
    pub fn with_clock(genesis: Ruleset, clock: Arc<dyn Clock>) -> Result<Self, RulebookError> {
        if genesis.version != 1 {
            return Err(RulebookError::InvalidGenesisVersion(genesis.version));
        }
        genesis
            .validate()
            .map_err(RulebookError::ValidationFailed)?;

        let genesis = Arc::new(genesis);
        let mut history = BTreeMap::new();
        history.insert(genesis.version, Arc::clone(&genesis));
        let (activations, _) = watch::channel(Arc::clone(&genesis));

        info!(
            version = genesis.version,
            assets = genesis.assets.len(),
            "Rulebook initialized from genesis"
        );

        Ok(Self {
            state: RwLock::new(RulebookState {
                current: genesis,
                history,
            }),
            clock,
            activations,
        })
    }

    /// Load, validate and install the genesis ruleset from a loader.
    pub fn from_loader(
        loader: &dyn PolicyLoader,
        clock: Arc<dyn Clock>,
    ) -> Result<Self, RulebookError> {
        let genesis = loader.load()?;
        Self::with_clock(genesis, clock)
    }

    /// The current ruleset.
    pub fn current(&self) -> Arc<Ruleset> {
        Arc::clone(&self.read().current)
    }

    /// A historical ruleset by version.
    pub fn get_by_version(&self, version: u64) -> Result<Arc<Ruleset>, RulebookError> {
        self.read()
            .history
            .get(&version)
            .cloned()
            .ok_or(RulebookError::VersionNotFound(version))
    }

    /// All known versions, ascending.
    pub fn versions(&self) -> Vec<u64> {
        self.read().history.keys().copied().collect()
    }

    /// Observe every newly activated ruleset.
    pub fn subscribe(&self) -> watch::Receiver<Arc<Ruleset>> {
        self.activations.subscribe()
    }

    /// Apply a set of changes atomically and activate the result.
    ///
    /// Either every change applies and the resulting ruleset validates, in
    /// which case it becomes current with `version + 1`, or nothing changes.
    pub fn apply_update(
        &self,
        proposal_id: &ProposalId,
        changes: &[Change],
    ) -> Result<Arc<Ruleset>, RulebookError> {
        if changes.is_empty() {
            return Err(RulebookError::EmptyChangeSet);
        }

        let mut state = self.write();
        let mut candidate = Ruleset::clone(&state.current);

        for change in changes {
            let parsed = change.parse().map_err(|e| {
                warn!(proposal_id = %proposal_id, change = %change, error = %e, "Change rejected");
                RulebookError::InvalidChange(e)
            })?;
            candidate.apply(&parsed).map_err(|e| {
                warn!(proposal_id = %proposal_id, change = %change, error = %e, "Change rejected");
                RulebookError::InvalidChange(e)
            })?;
        }

        if let Err(violations) = candidate.validate() {
            warn!(
                proposal_id = %proposal_id,
                violations = violations.len(),
                "Ruleset update failed validation"
            );
            return Err(RulebookError::ValidationFailed(violations));
        }

        candidate.version = state.current.version + 1;
        candidate.activation_time = self.clock.now();
        candidate.enacting_proposal_id = Some(proposal_id.clone());
        candidate.applied_changes = changes.to_vec();

        let activated = Arc::new(candidate);
        state.history.insert(activated.version, Arc::clone(&activated));
        state.current = Arc::clone(&activated);
        drop(state);

        self.activations.send_replace(Arc::clone(&activated));

        info!(
            version = activated.version,
            proposal_id = %proposal_id,
            changes = changes.len(),
            "Ruleset activated"
        );

        Ok(activated)
    }

    fn read(&self) -> RwLockReadGuard<'_, RulebookState> {
        self.state.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, RulebookState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}
