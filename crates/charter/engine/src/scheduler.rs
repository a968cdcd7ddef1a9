//! Periodic tick driver

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use crate::engine::Engine;
use crate::error::GovernanceError;

/// Drives [`Engine::tick`] from the engine clock on a fixed interval.
///
/// This is the single logical tick driver for an engine.
pub struct TickScheduler {
    engine: Arc<Engine>,
    period: Duration,
}

impl TickScheduler {
    /// `period` must be non-zero.
    pub fn new(engine: Arc<Engine>, period: Duration) -> Result<Self, GovernanceError> {
        if period.is_zero() {
            return Err(GovernanceError::InvalidConfig(
                "tick period must be greater than zero".into(),
            ));
        }
        Ok(Self { engine, period })
    }

    /// Run until `shutdown` flips to `true` or its sender is dropped.
    pub async fn run(self, mut shutdown: watch::Receiver<bool>) {
        let mut ticker = interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(period_ms = self.period.as_millis() as u64, "Tick scheduler started");

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.engine.tick_now().await {
                        Ok(report) if !report.is_empty() => {
                            tracing::info!(transitions = report.len(), "Proposals advanced");
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::error!(error = %e, "Tick failed");
                        }
                    }
                }
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                }
            }
        }

        tracing::info!("Tick scheduler stopped");
    }

    /// Spawn onto the current runtime.
    pub fn spawn(self, shutdown: watch::Receiver<bool>) -> JoinHandle<()> {
        tokio::spawn(self.run(shutdown))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::applier::{ChangeApplier, Enactment};
    use crate::config::EngineConfig;
    use crate::error::ApplyError;
    use crate::proposal::{ProposalDraft, ProposalState};
    use async_trait::async_trait;
    use charter_types::{Change, ManualClock, ProposalId};
    use chrono::{TimeZone, Utc};

    struct NoopApplier;

    #[async_trait]
    impl ChangeApplier for NoopApplier {
        async fn apply(
            &self,
            _proposal_id: &ProposalId,
            _changes: &[Change],
        ) -> Result<Enactment, ApplyError> {
            Ok(Enactment::default())
        }
    }

    fn engine() -> Arc<Engine> {
        let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
        Arc::new(
            Engine::new(
                EngineConfig::default(),
                Arc::new(NoopApplier),
                Arc::new(clock),
            )
            .unwrap(),
        )
    }

    #[test]
    fn zero_period_rejected() {
        assert!(matches!(
            TickScheduler::new(engine(), Duration::ZERO),
            Err(GovernanceError::InvalidConfig(_))
        ));
    }

    #[tokio::test]
    async fn scheduler_opens_voting_and_stops_on_shutdown() {
        let engine = engine();
        engine
            .submit_proposal(ProposalDraft::new(
                "prop-1",
                "alice",
                vec![Change::new("system.global_halt", "true")],
            ))
            .unwrap();

        let (tx, rx) = watch::channel(false);
        let handle = TickScheduler::new(Arc::clone(&engine), Duration::from_millis(10))
            .unwrap()
            .spawn(rx);

        let id = ProposalId::new("prop-1");
        let mut state = ProposalState::Proposed;
        for _ in 0..100 {
            state = engine.get_proposal(&id).await.unwrap().state;
            if state == ProposalState::Voting {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(state, ProposalState::Voting);

        tx.send(true).unwrap();
        tokio::time::timeout(Duration::from_secs(1), handle)
            .await
            .unwrap()
            .unwrap();
    }
}
