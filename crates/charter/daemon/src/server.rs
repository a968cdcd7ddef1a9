//! Daemon setup and lifecycle management

use charter_engine::{Engine, RulebookApplier, TickScheduler};
use charter_rulebook::{FilePolicyLoader, Rulebook};
use charter_types::{Clock, SystemClock};
use std::sync::Arc;
use tokio::sync::watch;

use crate::config::DaemonConfig;
use crate::error::{DaemonError, DaemonResult};

/// A wired-up engine, rulebook and tick loop.
pub struct Daemon {
    config: DaemonConfig,
    rulebook: Arc<Rulebook>,
    engine: Arc<Engine>,
}

impl Daemon {
    /// Load the genesis ruleset and build the engine. Any failure here is
    /// fatal to the process.
    pub fn new(config: DaemonConfig) -> DaemonResult<Self> {
        Self::with_clock(config, Arc::new(SystemClock))
    }

    pub fn with_clock(config: DaemonConfig, clock: Arc<dyn Clock>) -> DaemonResult<Self> {
        config.validate()?;

        let loader = FilePolicyLoader::with_clock(&config.genesis.path, Arc::clone(&clock));
        let rulebook = Arc::new(Rulebook::from_loader(&loader, Arc::clone(&clock))?);

        let applier = Arc::new(RulebookApplier::new(Arc::clone(&rulebook)));
        let engine = Arc::new(Engine::new(config.engine.clone(), applier, clock)?);

        Ok(Self {
            config,
            rulebook,
            engine,
        })
    }

    pub fn engine(&self) -> &Arc<Engine> {
        &self.engine
    }

    pub fn rulebook(&self) -> &Arc<Rulebook> {
        &self.rulebook
    }

    /// Run until Ctrl+C or SIGTERM.
    pub async fn run(self) -> DaemonResult<()> {
        self.run_until(shutdown_signal()).await
    }

    /// Run until `shutdown` completes.
    pub async fn run_until(
        self,
        shutdown: impl std::future::Future<Output = ()>,
    ) -> DaemonResult<()> {
        let current = self.rulebook.current();
        tracing::info!(
            genesis = %self.config.genesis.path.display(),
            version = current.version,
            assets = current.assets.len(),
            tick_interval_ms = self.config.scheduler.tick_interval_ms,
            "Charter daemon running"
        );

        let scheduler = TickScheduler::new(
            Arc::clone(&self.engine),
            self.config.scheduler.tick_interval(),
        )?;

        let (stop_tx, stop_rx) = watch::channel(false);
        let scheduler = scheduler.spawn(stop_rx.clone());

        let activations = tokio::spawn(log_activations(Arc::clone(&self.rulebook), stop_rx.clone()));
        let events = tokio::spawn(log_events(Arc::clone(&self.engine), stop_rx));

        shutdown.await;
        tracing::info!("Charter daemon shutting down");

        // Receivers may already be gone if a task exited early.
        let _ = stop_tx.send(true);

        scheduler
            .await
            .map_err(|e| DaemonError::Scheduler(e.to_string()))?;
        let _ = activations.await;
        let _ = events.await;

        Ok(())
    }
}

/// Log every ruleset that becomes current.
async fn log_activations(rulebook: Arc<Rulebook>, mut stop: watch::Receiver<bool>) {
    let mut activations = rulebook.subscribe();

    loop {
        tokio::select! {
            changed = activations.changed() => {
                if changed.is_err() {
                    break;
                }
                let ruleset = activations.borrow_and_update().clone();
                tracing::info!(
                    version = ruleset.version,
                    proposal_id = ?ruleset.enacting_proposal_id.as_ref().map(|id| id.as_str()),
                    changes = ruleset.applied_changes.len(),
                    global_halt = ruleset.system.global_halt,
                    "New ruleset active"
                );
            }
            _ = stop.changed() => break,
        }
    }
}

/// Mirror governance events into the log as structured JSON payloads.
async fn log_events(engine: Arc<Engine>, mut stop: watch::Receiver<bool>) {
    use tokio::sync::broadcast::error::RecvError;

    let mut events = engine.subscribe();
    loop {
        tokio::select! {
            received = events.recv() => match received {
                Ok(event) => {
                    let payload = serde_json::to_string(&event).unwrap_or_default();
                    tracing::debug!(proposal_id = %event.proposal_id, event = %payload, "Governance event");
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Governance event log lagged");
                }
                Err(RecvError::Closed) => break,
            },
            _ = stop.changed() => break,
        }
    }
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to install Ctrl+C handler");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received Ctrl+C, initiating graceful shutdown");
        }
        _ = terminate => {
            tracing::info!("Received terminate signal, initiating graceful shutdown");
        }
    }
}
