//! Holistic ruleset validation.
//!
//! Validation runs on a fully mutated candidate, never on individual changes,
//! so multi-change proposals are judged by the state they would produce.
//! Every violation is collected rather than stopping at the first one.

use charter_types::AssetSymbol;
use rust_decimal::Decimal;
use thiserror::Error;

use crate::ruleset::Ruleset;

/// Upper bound for the liquidation penalty (50%).
pub const MAX_LIQUIDATION_PENALTY: Decimal = Decimal::from_parts(5, 0, 0, false, 1);

/// Upper bound for the transaction fee (100%).
pub const MAX_TRANSACTION_FEE_BPS: u32 = 10_000;

/// Upper bound for asset decimals; the scale limit of the decimal type.
pub const MAX_ASSET_DECIMALS: u32 = 28;

/// A single ruleset invariant violation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum Violation {
    #[error("collateralization ratio must be greater than 1.0, got {0}")]
    CollateralizationRatioTooLow(Decimal),

    #[error("liquidation penalty must be within [0, 0.5], got {0}")]
    LiquidationPenaltyOutOfRange(Decimal),

    #[error("max position size must not be negative, got {0}")]
    NegativeMaxPositionSize(Decimal),

    #[error("max open orders per account must be positive")]
    NoOpenOrdersAllowed,

    #[error("transaction fee must not exceed 10000 bps, got {0}")]
    FeeAboveMaximum(u32),

    #[error("asset registry must not be empty")]
    EmptyAssetRegistry,

    #[error("asset {symbol} decimals must not exceed 28, got {decimals}")]
    AssetDecimalsTooLarge { symbol: AssetSymbol, decimals: u32 },
}

/// Check every holistic invariant.
pub fn validate(ruleset: &Ruleset) -> Result<(), Vec<Violation>> {
    let mut violations = Vec::new();
    let risk = &ruleset.risk;
    let system = &ruleset.system;

    if risk.collateralization_ratio <= Decimal::ONE {
        violations.push(Violation::CollateralizationRatioTooLow(
            risk.collateralization_ratio,
        ));
    }

    if risk.liquidation_penalty < Decimal::ZERO
        || risk.liquidation_penalty > MAX_LIQUIDATION_PENALTY
    {
        violations.push(Violation::LiquidationPenaltyOutOfRange(
            risk.liquidation_penalty,
        ));
    }

    if risk.max_position_size < Decimal::ZERO {
        violations.push(Violation::NegativeMaxPositionSize(risk.max_position_size));
    }

    if system.max_open_orders_per_account == 0 {
        violations.push(Violation::NoOpenOrdersAllowed);
    }

    if system.transaction_fee_bps > MAX_TRANSACTION_FEE_BPS {
        violations.push(Violation::FeeAboveMaximum(system.transaction_fee_bps));
    }

    if ruleset.assets.is_empty() {
        violations.push(Violation::EmptyAssetRegistry);
    }

    for (symbol, asset) in &ruleset.assets {
        if asset.decimals > MAX_ASSET_DECIMALS {
            violations.push(Violation::AssetDecimalsTooLarge {
                symbol: symbol.clone(),
                decimals: asset.decimals,
            });
        }
    }

    if violations.is_empty() {
        Ok(())
    } else {
        Err(violations)
    }
}
