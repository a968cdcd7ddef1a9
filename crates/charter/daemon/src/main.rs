//! Charter Daemon - governance policy engine host
//!
//! Loads the genesis ruleset, starts the governance engine and drives its
//! tick loop until shut down.

use anyhow::Context;
use charter_daemon::{Daemon, DaemonConfig};
use clap::Parser;
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Charter Daemon CLI
#[derive(Parser)]
#[command(name = "charterd")]
#[command(about = "Charter Daemon - vote-driven governance of operating parameters", long_about = None)]
#[command(version)]
struct Cli {
    /// Configuration file path
    #[arg(short, long, env = "CHARTER_CONFIG")]
    config: Option<PathBuf>,

    /// Genesis ruleset (JSON), overrides the configured path
    #[arg(short, long, env = "CHARTER_GENESIS_PATH")]
    genesis: Option<PathBuf>,

    /// Log level
    #[arg(long, env = "CHARTER_LOG_LEVEL")]
    log_level: Option<String>,

    /// Enable JSON logging
    #[arg(long, env = "CHARTER_LOG_JSON")]
    json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Load configuration
    let mut config = DaemonConfig::load(cli.config.as_deref())
        .context("failed to load configuration")?;

    // Override with CLI args
    if let Some(genesis) = cli.genesis {
        config.genesis.path = genesis;
    }
    if let Some(level) = cli.log_level {
        config.logging.level = level;
    }
    if cli.json {
        config.logging.json = true;
    }

    // Initialize tracing
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| config.logging.level.clone().into());

    if config.logging.json {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer().json())
            .init();
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(tracing_subscriber::fmt::layer())
            .init();
    }

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "Starting charterd");

    let daemon = Daemon::new(config).context("failed to start governance engine")?;
    daemon.run().await?;

    Ok(())
}
