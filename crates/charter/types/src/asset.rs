//! Governed asset registry entries.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::ChangeError;

/// Longest accepted asset ticker.
pub const MAX_SYMBOL_LEN: usize = 12;

/// Asset ticker: 1-12 ASCII uppercase letters or digits.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetSymbol(String);

impl AssetSymbol {
    pub fn parse(raw: &str) -> Result<Self, ChangeError> {
        let well_formed = !raw.is_empty()
            && raw.len() <= MAX_SYMBOL_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit());
        if well_formed {
            Ok(Self(raw.to_string()))
        } else {
            Err(ChangeError::InvalidSymbol(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl FromStr for AssetSymbol {
    type Err = ChangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for AssetSymbol {
    type Error = ChangeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<AssetSymbol> for String {
    fn from(symbol: AssetSymbol) -> Self {
        symbol.0
    }
}

impl fmt::Display for AssetSymbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Definition of a single asset in the registry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetDefinition {
    /// Number of fractional digits in the asset's smallest unit.
    pub decimals: u32,
    /// Whether positions in this asset count as collateral.
    pub is_collateral: bool,
    /// Whether the asset may be traded.
    pub is_tradable: bool,
}

impl AssetDefinition {
    pub fn new(decimals: u32, is_collateral: bool, is_tradable: bool) -> Self {
        Self {
            decimals,
            is_collateral,
            is_tradable,
        }
    }
}
