//! Genesis policy loading.
//!
//! A loader only produces a ruleset; it is [`Rulebook::from_loader`] that
//! checks the version and runs holistic validation, so a loader can never
//! install an unvalidated policy.
//!
//! [`Rulebook::from_loader`]: crate::Rulebook::from_loader

use charter_types::{AssetDefinition, AssetSymbol, Clock, SystemClock};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::info;

use crate::error::LoaderError;
use crate::ruleset::{RiskParameters, Ruleset, SystemParameters};

/// Source of the genesis ruleset.
pub trait PolicyLoader: Send + Sync {
    fn load(&self) -> Result<Ruleset, LoaderError>;
}

/// On-disk genesis policy.
///
/// Decimals are written as JSON strings (`"1.5"`) so no value passes through
/// a float on the way in.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenesisDocument {
    #[serde(default = "default_genesis_version")]
    pub version: u64,
    #[serde(default)]
    pub activation_time: Option<DateTime<Utc>>,
    pub risk: RiskParameters,
    pub assets: BTreeMap<AssetSymbol, AssetDefinition>,
    pub system: SystemParameters,
}

fn default_genesis_version() -> u64 {
    1
}

impl GenesisDocument {
    pub fn into_ruleset(self, now: DateTime<Utc>) -> Ruleset {
        let mut ruleset = Ruleset::genesis(
            self.risk,
            self.assets,
            self.system,
            self.activation_time.unwrap_or(now),
        );
        ruleset.version = self.version;
        ruleset
    }
}

/// Loads a [`GenesisDocument`] from a JSON file.
pub struct FilePolicyLoader {
    path: PathBuf,
    clock: Arc<dyn Clock>,
}

impl FilePolicyLoader {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self::with_clock(path, Arc::new(SystemClock))
    }

    pub fn with_clock(path: impl AsRef<Path>, clock: Arc<dyn Clock>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            clock,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PolicyLoader for FilePolicyLoader {
    fn load(&self) -> Result<Ruleset, LoaderError> {
        let raw = std::fs::read_to_string(&self.path).map_err(|source| LoaderError::Io {
            path: self.path.clone(),
            source,
        })?;
        let document: GenesisDocument =
            serde_json::from_str(&raw).map_err(|source| LoaderError::Parse {
                path: self.path.clone(),
                source,
            })?;

        info!(path = %self.path.display(), "Genesis policy loaded");
        Ok(document.into_ruleset(self.clock.now()))
    }
}

/// Hands out a fixed ruleset; for embedding and tests.
pub struct StaticPolicyLoader {
    ruleset: Ruleset,
}

impl StaticPolicyLoader {
    pub fn new(ruleset: Ruleset) -> Self {
        Self { ruleset }
    }
}

impl PolicyLoader for StaticPolicyLoader {
    fn load(&self) -> Result<Ruleset, LoaderError> {
        Ok(self.ruleset.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{Rulebook, RulebookError};
    use charter_types::ManualClock;
    use chrono::TimeZone;
    use rust_decimal_macros::dec;
    use std::io::Write;

    const GENESIS: &str = r#"{
        "risk": {
            "max_position_size": "250000",
            "collateralization_ratio": "1.25",
            "liquidation_penalty": "0.075"
        },
        "assets": {
            "USDC": { "decimals": 6, "is_collateral": true, "is_tradable": true },
            "ETH": { "decimals": 18, "is_collateral": true, "is_tradable": true }
        },
        "system": {
            "transaction_fee_bps": 20,
            "max_open_orders_per_account": 200,
            "global_halt": false
        }
    }"#;

    fn write_genesis(contents: &str) -> tempfile::NamedTempFile {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn loads_genesis_file() {
        let start = Utc.with_ymd_and_hms(2025, 6, 1, 0, 0, 0).unwrap();
        let file = write_genesis(GENESIS);
        let loader = FilePolicyLoader::with_clock(file.path(), Arc::new(ManualClock::new(start)));

        let ruleset = loader.load().unwrap();
        assert_eq!(ruleset.version, 1);
        assert_eq!(ruleset.activation_time, start);
        assert_eq!(ruleset.risk.liquidation_penalty, dec!(0.075));
        assert_eq!(ruleset.assets.len(), 2);
        assert!(ruleset.enacting_proposal_id.is_none());
    }

    #[test]
    fn missing_file_is_io_error() {
        let loader = FilePolicyLoader::new("/nonexistent/charter/genesis.json");
        assert!(matches!(loader.load(), Err(LoaderError::Io { .. })));
    }

    #[test]
    fn malformed_file_is_parse_error() {
        let file = write_genesis("{ \"risk\": ");
        let loader = FilePolicyLoader::new(file.path());
        assert!(matches!(loader.load(), Err(LoaderError::Parse { .. })));
    }

    #[test]
    fn invalid_genesis_refused_by_rulebook() {
        let file = write_genesis(&GENESIS.replace("\"1.25\"", "\"0.8\""));
        let loader = FilePolicyLoader::new(file.path());
        let result = Rulebook::from_loader(&loader, Arc::new(SystemClock));
        assert!(matches!(result, Err(RulebookError::ValidationFailed(_))));
    }

    #[test]
    fn non_genesis_version_refused_by_rulebook() {
        let file = write_genesis(&GENESIS.replacen('{', "{ \"version\": 3,", 1));
        let loader = FilePolicyLoader::new(file.path());
        let result = Rulebook::from_loader(&loader, Arc::new(SystemClock));
        assert!(matches!(
            result,
            Err(RulebookError::InvalidGenesisVersion(3))
        ));
    }

    #[test]
    fn static_loader_round_trip() {
        let file = write_genesis(GENESIS);
        let ruleset = FilePolicyLoader::new(file.path()).load().unwrap();
        let book = Rulebook::from_loader(
            &StaticPolicyLoader::new(ruleset.clone()),
            Arc::new(SystemClock),
        )
        .unwrap();
        assert_eq!(*book.current(), ruleset);
    }
}
