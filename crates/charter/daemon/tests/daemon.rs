use std::io::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use charter_daemon::config::{GenesisConfig, SchedulerConfig};
use charter_daemon::{Daemon, DaemonConfig, DaemonError};
use charter_engine::{EngineConfig, ProposalDraft, ProposalState, Vote};
use charter_rulebook::{LoaderError, RulebookError};
use charter_types::{Change, Clock, ManualClock, ProposalId};
use chrono::{TimeZone, Utc};
use tempfile::NamedTempFile;
use tokio::sync::oneshot;

const SAMPLE_GENESIS: &str = include_str!("../config/genesis.json");

fn genesis_file(contents: &str) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    file.write_all(contents.as_bytes()).unwrap();
    file
}

fn config(genesis: &Path) -> DaemonConfig {
    DaemonConfig {
        engine: EngineConfig {
            voting_period_secs: 60,
            enactment_delay_secs: 60,
            total_voting_power: 3,
            ..Default::default()
        },
        scheduler: SchedulerConfig {
            tick_interval_ms: 10,
        },
        genesis: GenesisConfig {
            path: genesis.to_path_buf(),
        },
        ..Default::default()
    }
}

async fn wait_for(mut check: impl FnMut() -> bool) -> bool {
    for _ in 0..200 {
        if check() {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    false
}

#[tokio::test]
async fn sample_genesis_loads() {
    let file = genesis_file(SAMPLE_GENESIS);
    let daemon = Daemon::new(config(file.path())).unwrap();

    let current = daemon.rulebook().current();
    assert_eq!(current.version, 1);
    assert_eq!(current.assets.len(), 3);
    assert_eq!(current.system.transaction_fee_bps, 30);
}

#[tokio::test]
async fn missing_genesis_is_fatal() {
    let result = Daemon::new(config(Path::new("/nonexistent/genesis.json")));
    assert!(matches!(
        result,
        Err(DaemonError::Genesis(RulebookError::Load(LoaderError::Io { .. })))
    ));
}

#[tokio::test]
async fn invalid_genesis_is_fatal() {
    let broken = SAMPLE_GENESIS.replace(
        r#""collateralization_ratio": "1.5""#,
        r#""collateralization_ratio": "0.9""#,
    );
    let file = genesis_file(&broken);
    assert!(matches!(
        Daemon::new(config(file.path())),
        Err(DaemonError::Genesis(RulebookError::ValidationFailed(_)))
    ));
}

#[tokio::test]
async fn zero_tick_interval_is_fatal() {
    let file = genesis_file(SAMPLE_GENESIS);
    let mut config = config(file.path());
    config.scheduler.tick_interval_ms = 0;

    assert!(matches!(
        Daemon::new(config),
        Err(DaemonError::Config(_))
    ));
}

#[tokio::test]
async fn scheduler_carries_proposal_to_enactment() {
    let file = genesis_file(SAMPLE_GENESIS);
    let clock = ManualClock::new(Utc.with_ymd_and_hms(2025, 1, 1, 0, 0, 0).unwrap());
    let daemon = Daemon::with_clock(config(file.path()), Arc::new(clock.clone())).unwrap();
    let engine = Arc::clone(daemon.engine());
    let rulebook = Arc::clone(daemon.rulebook());

    let (stop_tx, stop_rx) = oneshot::channel::<()>();
    let running = tokio::spawn(daemon.run_until(async {
        let _ = stop_rx.await;
    }));

    let id = ProposalId::new("prop-halt");
    engine
        .submit_proposal(ProposalDraft::new(
            id.clone(),
            "ops",
            vec![Change::new("system.global_halt", "true")],
        ))
        .unwrap();

    let mut opened = false;
    for _ in 0..200 {
        if engine.get_proposal(&id).await.unwrap().state == ProposalState::Voting {
            opened = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(opened, "voting never opened");

    for voter in ["alice", "bob"] {
        engine
            .cast_vote(Vote::new(voter, id.clone(), true, clock.now()))
            .await
            .unwrap();
    }

    clock.advance(chrono::Duration::seconds(120));
    assert!(
        wait_for(|| rulebook.current().version == 2).await,
        "ruleset was never activated"
    );
    assert!(rulebook.current().system.global_halt);
    assert_eq!(
        engine.get_proposal(&id).await.unwrap().state,
        ProposalState::Enacted
    );

    stop_tx.send(()).unwrap();
    running.await.unwrap().unwrap();
}
