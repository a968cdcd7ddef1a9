//! Configuration for charterd

use charter_engine::EngineConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{DaemonError, DaemonResult};

/// Main daemon configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DaemonConfig {
    /// Voting and enactment rules
    #[serde(default)]
    pub engine: EngineConfig,

    /// Tick loop configuration
    #[serde(default)]
    pub scheduler: SchedulerConfig,

    /// Genesis ruleset source
    #[serde(default)]
    pub genesis: GenesisConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Tick loop configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SchedulerConfig {
    /// Interval between engine ticks in milliseconds
    #[serde(default = "default_tick_interval")]
    pub tick_interval_ms: u64,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            tick_interval_ms: default_tick_interval(),
        }
    }
}

impl SchedulerConfig {
    pub fn tick_interval(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.tick_interval_ms)
    }
}

/// Genesis ruleset source
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisConfig {
    /// Path to the JSON genesis document
    #[serde(default = "default_genesis_path")]
    pub path: PathBuf,
}

impl Default for GenesisConfig {
    fn default() -> Self {
        Self {
            path: default_genesis_path(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level, used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,

    /// JSON format
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

// Default value helpers
fn default_tick_interval() -> u64 {
    1_000
}

fn default_genesis_path() -> PathBuf {
    PathBuf::from("genesis.json")
}

fn default_log_level() -> String {
    "info".to_string()
}

impl DaemonConfig {
    /// Load configuration: defaults, then the optional file, then
    /// `CHARTER_`-prefixed environment variables.
    ///
    /// Nested keys use a double underscore, e.g.
    /// `CHARTER_ENGINE__QUORUM_THRESHOLD=0.5`. Single-underscore names such
    /// as `CHARTER_GENESIS_PATH` belong to the command line and are ignored.
    pub fn load(path: Option<&Path>) -> DaemonResult<Self> {
        let mut builder = config::Config::builder();

        // Add default configuration
        builder = builder.add_source(config::Config::try_from(&DaemonConfig::default())?);

        // Add file configuration if provided
        if let Some(path) = path {
            builder = builder.add_source(config::File::from(path).required(true));
        }

        // Add environment variables with CHARTER_ prefix
        builder = builder.add_source(
            config::Environment::with_prefix("CHARTER")
                .prefix_separator("_")
                .separator("__")
                .try_parsing(true),
        );

        let config: Self = builder.build()?.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject settings the daemon cannot run with.
    pub fn validate(&self) -> DaemonResult<()> {
        if self.scheduler.tick_interval_ms == 0 {
            return Err(DaemonError::Config(
                "scheduler.tick_interval_ms must be greater than zero".into(),
            ));
        }
        self.engine.validate()?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::io::Write;

    #[test]
    fn test_default_config() {
        let config = DaemonConfig::default();
        assert_eq!(config.scheduler.tick_interval_ms, 1_000);
        assert_eq!(config.genesis.path, PathBuf::from("genesis.json"));
        assert_eq!(config.logging.level, "info");
        assert!(config.engine.validate().is_ok());
    }

    #[test]
    fn file_overrides_defaults() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(
            file,
            r#"
[engine]
voting_period_secs = 600
quorum_threshold = "0.5"

[scheduler]
tick_interval_ms = 250

[genesis]
path = "/etc/charter/genesis.json"
"#
        )
        .unwrap();

        let config = DaemonConfig::load(Some(file.path())).unwrap();
        assert_eq!(config.engine.voting_period_secs, 600);
        assert_eq!(config.engine.quorum_threshold, dec!(0.5));
        // Untouched keys keep their defaults.
        assert_eq!(config.engine.pass_threshold, dec!(0.66));
        assert_eq!(config.engine.enactment_grace_secs, Some(7 * 24 * 60 * 60));
        assert_eq!(config.scheduler.tick_interval_ms, 250);
        assert_eq!(
            config.genesis.path,
            PathBuf::from("/etc/charter/genesis.json")
        );
    }

    #[test]
    fn missing_explicit_file_is_an_error() {
        assert!(matches!(
            DaemonConfig::load(Some(Path::new("/nonexistent/charterd.toml"))),
            Err(DaemonError::Config(_))
        ));
    }

    #[test]
    fn cli_genesis_variable_does_not_shadow_genesis_table() {
        std::env::set_var("CHARTER_GENESIS_PATH", "/tmp/charter-genesis.json");
        let loaded = DaemonConfig::load(None);
        std::env::remove_var("CHARTER_GENESIS_PATH");

        let config = loaded.unwrap();
        assert_eq!(config.genesis.path, PathBuf::from("genesis.json"));
    }

    #[test]
    fn zero_tick_interval_rejected() {
        let mut file = tempfile::Builder::new().suffix(".toml").tempfile().unwrap();
        writeln!(file, "[scheduler]\ntick_interval_ms = 0").unwrap();

        let err = DaemonConfig::load(Some(file.path())).unwrap_err();
        assert!(matches!(err, DaemonError::Config(ref msg) if msg.contains("tick_interval_ms")));
    }

    #[test]
    fn invalid_engine_section_rejected() {
        let config = DaemonConfig {
            engine: EngineConfig {
                pass_threshold: dec!(1.5),
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(matches!(config.validate(), Err(DaemonError::Engine(_))));
    }
}
