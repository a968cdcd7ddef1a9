//! Governable parameter changes.
//!
//! A [`Change`] arrives stringly encoded from the proposal submission API.
//! Before it can touch a ruleset it must parse into a [`ParameterKey`] from the
//! closed set below and a [`ParameterValue`] of the type that key expects.
//! There is no reflective field lookup: a key that is not spelled out here is
//! rejected.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::asset::{AssetDefinition, AssetSymbol};
use crate::error::ChangeError;

/// A single governable-parameter mutation, as submitted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Change {
    /// Typed key path, e.g. `risk.max_position_size`.
    pub parameter_key: String,
    /// String-encoded new value; its type depends on the key.
    pub new_value: String,
}

impl Change {
    pub fn new(parameter_key: impl Into<String>, new_value: impl Into<String>) -> Self {
        Self {
            parameter_key: parameter_key.into(),
            new_value: new_value.into(),
        }
    }

    /// Resolve the key and decode the value.
    pub fn parse(&self) -> Result<ParsedChange, ChangeError> {
        let key: ParameterKey = self.parameter_key.parse()?;
        let value = key.parse_value(&self.new_value)?;
        Ok(ParsedChange { key, value })
    }
}

impl fmt::Display for Change {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} = {}", self.parameter_key, self.new_value)
    }
}

/// The closed set of parameters governance may change.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ParameterKey {
    /// `risk.max_position_size`
    MaxPositionSize,
    /// `risk.collateralization_ratio`
    CollateralizationRatio,
    /// `risk.liquidation_penalty`
    LiquidationPenalty,
    /// `system.transaction_fee_bps`
    TransactionFeeBps,
    /// `system.max_open_orders_per_account`
    MaxOpenOrdersPerAccount,
    /// `system.global_halt`
    GlobalHalt,
    /// `assets.<SYMBOL>.decimals`
    AssetDecimals(AssetSymbol),
    /// `assets.<SYMBOL>.is_collateral`
    AssetIsCollateral(AssetSymbol),
    /// `assets.<SYMBOL>.is_tradable`
    AssetIsTradable(AssetSymbol),
    /// `assets.<SYMBOL>.listing` (adds or replaces the whole definition)
    AssetListing(AssetSymbol),
    /// `assets.<SYMBOL>.delist`
    AssetDelisting(AssetSymbol),
}

impl ParameterKey {
    /// Decode a raw value into the type this key expects.
    pub fn parse_value(&self, raw: &str) -> Result<ParameterValue, ChangeError> {
        let trimmed = raw.trim();
        match self {
            Self::MaxPositionSize | Self::CollateralizationRatio | Self::LiquidationPenalty => {
                Decimal::from_str_exact(trimmed)
                    .map(ParameterValue::Decimal)
                    .map_err(|e| ChangeError::invalid_value(self, raw, e.to_string()))
            }
            Self::TransactionFeeBps | Self::MaxOpenOrdersPerAccount | Self::AssetDecimals(_) => {
                trimmed
                    .parse::<u32>()
                    .map(ParameterValue::Count)
                    .map_err(|e| ChangeError::invalid_value(self, raw, e.to_string()))
            }
            Self::GlobalHalt | Self::AssetIsCollateral(_) | Self::AssetIsTradable(_) => {
                parse_flag(self, raw).map(ParameterValue::Flag)
            }
            Self::AssetListing(_) => serde_json::from_str::<AssetDefinition>(trimmed)
                .map(ParameterValue::Listing)
                .map_err(|e| ChangeError::invalid_value(self, raw, e.to_string())),
            Self::AssetDelisting(_) => match parse_flag(self, raw)? {
                true => Ok(ParameterValue::Delist),
                false => Err(ChangeError::invalid_value(
                    self,
                    raw,
                    "delisting must be confirmed with \"true\"",
                )),
            },
        }
    }

    /// The asset this key targets, if any.
    pub fn asset(&self) -> Option<&AssetSymbol> {
        match self {
            Self::AssetDecimals(s)
            | Self::AssetIsCollateral(s)
            | Self::AssetIsTradable(s)
            | Self::AssetListing(s)
            | Self::AssetDelisting(s) => Some(s),
            _ => None,
        }
    }
}

fn parse_flag(key: &ParameterKey, raw: &str) -> Result<bool, ChangeError> {
    raw.trim()
        .parse::<bool>()
        .map_err(|_| ChangeError::invalid_value(key, raw, "expected \"true\" or \"false\""))
}

impl FromStr for ParameterKey {
    type Err = ChangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let key = match s {
            "risk.max_position_size" => Self::MaxPositionSize,
            "risk.collateralization_ratio" => Self::CollateralizationRatio,
            "risk.liquidation_penalty" => Self::LiquidationPenalty,
            "system.transaction_fee_bps" => Self::TransactionFeeBps,
            "system.max_open_orders_per_account" => Self::MaxOpenOrdersPerAccount,
            "system.global_halt" => Self::GlobalHalt,
            other => {
                let (symbol, field) = other
                    .strip_prefix("assets.")
                    .and_then(|rest| rest.rsplit_once('.'))
                    .ok_or_else(|| ChangeError::UnknownParameter(s.to_string()))?;
                let constructor: fn(AssetSymbol) -> Self = match field {
                    "decimals" => Self::AssetDecimals,
                    "is_collateral" => Self::AssetIsCollateral,
                    "is_tradable" => Self::AssetIsTradable,
                    "listing" => Self::AssetListing,
                    "delist" => Self::AssetDelisting,
                    _ => return Err(ChangeError::UnknownParameter(s.to_string())),
                };
                constructor(AssetSymbol::parse(symbol)?)
            }
        };
        Ok(key)
    }
}

impl fmt::Display for ParameterKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MaxPositionSize => f.write_str("risk.max_position_size"),
            Self::CollateralizationRatio => f.write_str("risk.collateralization_ratio"),
            Self::LiquidationPenalty => f.write_str("risk.liquidation_penalty"),
            Self::TransactionFeeBps => f.write_str("system.transaction_fee_bps"),
            Self::MaxOpenOrdersPerAccount => f.write_str("system.max_open_orders_per_account"),
            Self::GlobalHalt => f.write_str("system.global_halt"),
            Self::AssetDecimals(s) => write!(f, "assets.{s}.decimals"),
            Self::AssetIsCollateral(s) => write!(f, "assets.{s}.is_collateral"),
            Self::AssetIsTradable(s) => write!(f, "assets.{s}.is_tradable"),
            Self::AssetListing(s) => write!(f, "assets.{s}.listing"),
            Self::AssetDelisting(s) => write!(f, "assets.{s}.delist"),
        }
    }
}

/// A decoded parameter value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterValue {
    Decimal(Decimal),
    Count(u32),
    Flag(bool),
    Listing(AssetDefinition),
    Delist,
}

/// A change whose key and value have both been resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedChange {
    pub key: ParameterKey,
    pub value: ParameterValue,
}
