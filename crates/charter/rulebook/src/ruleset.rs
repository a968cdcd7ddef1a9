use charter_types::{
    AssetDefinition, AssetSymbol, Change, ChangeError, ParameterKey, ParameterValue, ParsedChange,
    ProposalId,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::validation::{self, Violation};

/// Immutable, versioned snapshot of every governable parameter.
///
/// Rulesets handed out by the [`Rulebook`](crate::Rulebook) are shared behind
/// an `Arc` and never mutated; a new version is always a fresh value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Ruleset {
    /// Monotonic version, 1 for genesis.
    pub version: u64,
    /// When this version became current.
    pub activation_time: DateTime<Utc>,
    /// The proposal whose enactment produced this version; `None` for genesis.
    pub enacting_proposal_id: Option<ProposalId>,
    pub risk: RiskParameters,
    pub assets: BTreeMap<AssetSymbol, AssetDefinition>,
    pub system: SystemParameters,
    /// The changes that turned the previous version into this one.
    #[serde(default)]
    pub applied_changes: Vec<Change>,
}

/// Risk limits. Decimal throughout; floating point never touches these.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskParameters {
    pub max_position_size: Decimal,
    pub collateralization_ratio: Decimal,
    pub liquidation_penalty: Decimal,
}

/// System-wide operating parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SystemParameters {
    pub transaction_fee_bps: u32,
    pub max_open_orders_per_account: u32,
    /// Emergency halt of all trading activity.
    pub global_halt: bool,
}

impl Ruleset {
    /// Build a version-1 ruleset.
    pub fn genesis(
        risk: RiskParameters,
        assets: BTreeMap<AssetSymbol, AssetDefinition>,
        system: SystemParameters,
        activation_time: DateTime<Utc>,
    ) -> Self {
        Self {
            version: 1,
            activation_time,
            enacting_proposal_id: None,
            risk,
            assets,
            system,
            applied_changes: Vec::new(),
        }
    }

    /// Check every holistic invariant.
    pub fn validate(&self) -> Result<(), Vec<Violation>> {
        validation::validate(self)
    }

    pub fn asset(&self, symbol: &AssetSymbol) -> Option<&AssetDefinition> {
        self.assets.get(symbol)
    }

    /// Apply one decoded change in place.
    ///
    /// Only ever called on a private clone; see [`Rulebook::apply_update`].
    ///
    /// [`Rulebook::apply_update`]: crate::Rulebook::apply_update
    pub(crate) fn apply(&mut self, change: &ParsedChange) -> Result<(), ChangeError> {
        use ParameterKey as K;
        use ParameterValue as V;

        match (&change.key, &change.value) {
            (K::MaxPositionSize, V::Decimal(v)) => self.risk.max_position_size = *v,
            (K::CollateralizationRatio, V::Decimal(v)) => self.risk.collateralization_ratio = *v,
            (K::LiquidationPenalty, V::Decimal(v)) => self.risk.liquidation_penalty = *v,
            (K::TransactionFeeBps, V::Count(v)) => self.system.transaction_fee_bps = *v,
            (K::MaxOpenOrdersPerAccount, V::Count(v)) => {
                self.system.max_open_orders_per_account = *v
            }
            (K::GlobalHalt, V::Flag(v)) => self.system.global_halt = *v,
            (K::AssetDecimals(symbol), V::Count(v)) => self.listed_mut(symbol)?.decimals = *v,
            (K::AssetIsCollateral(symbol), V::Flag(v)) => {
                self.listed_mut(symbol)?.is_collateral = *v
            }
            (K::AssetIsTradable(symbol), V::Flag(v)) => self.listed_mut(symbol)?.is_tradable = *v,
            (K::AssetListing(symbol), V::Listing(definition)) => {
                self.assets.insert(symbol.clone(), *definition);
            }
            (K::AssetDelisting(symbol), V::Delist) => {
                self.assets
                    .remove(symbol)
                    .ok_or_else(|| ChangeError::AssetNotListed(symbol.to_string()))?;
            }
            (key, value) => {
                return Err(ChangeError::invalid_value(
                    key,
                    &format!("{value:?}"),
                    "value type does not match parameter",
                ))
            }
        }
        Ok(())
    }

    fn listed_mut(&mut self, symbol: &AssetSymbol) -> Result<&mut AssetDefinition, ChangeError> {
        self.assets
            .get_mut(symbol)
            .ok_or_else(|| ChangeError::AssetNotListed(symbol.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn sample() -> Ruleset {
        let mut assets = BTreeMap::new();
        assets.insert(
            AssetSymbol::parse("BTC").unwrap(),
            AssetDefinition::new(8, true, true),
        );
        Ruleset::genesis(
            RiskParameters {
                max_position_size: dec!(500000),
                collateralization_ratio: dec!(1.5),
                liquidation_penalty: dec!(0.05),
            },
            assets,
            SystemParameters {
                transaction_fee_bps: 10,
                max_open_orders_per_account: 50,
                global_halt: false,
            },
            Utc::now(),
        )
    }

    fn apply(rs: &mut Ruleset, key: &str, value: &str) -> Result<(), ChangeError> {
        let parsed = Change::new(key, value).parse()?;
        rs.apply(&parsed)
    }

    #[test]
    fn scalar_changes_apply() {
        let mut rs = sample();
        apply(&mut rs, "risk.max_position_size", "750000.25").unwrap();
        apply(&mut rs, "system.global_halt", "true").unwrap();
        apply(&mut rs, "system.transaction_fee_bps", "5").unwrap();

        assert_eq!(rs.risk.max_position_size, dec!(750000.25));
        assert!(rs.system.global_halt);
        assert_eq!(rs.system.transaction_fee_bps, 5);
    }

    #[test]
    fn asset_field_changes_require_listing() {
        let mut rs = sample();
        apply(&mut rs, "assets.BTC.is_tradable", "false").unwrap();
        assert!(!rs.assets[&AssetSymbol::parse("BTC").unwrap()].is_tradable);

        assert_eq!(
            apply(&mut rs, "assets.DOGE.decimals", "8"),
            Err(ChangeError::AssetNotListed("DOGE".into()))
        );
    }

    #[test]
    fn listing_and_delisting() {
        let mut rs = sample();
        apply(
            &mut rs,
            "assets.ETH.listing",
            r#"{"decimals":18,"is_collateral":true,"is_tradable":true}"#,
        )
        .unwrap();
        let eth = AssetSymbol::parse("ETH").unwrap();
        assert_eq!(rs.asset(&eth), Some(&AssetDefinition::new(18, true, true)));

        apply(&mut rs, "assets.ETH.delist", "true").unwrap();
        assert!(rs.asset(&eth).is_none());

        assert!(matches!(
            apply(&mut rs, "assets.ETH.delist", "true"),
            Err(ChangeError::AssetNotListed(_))
        ));
    }

    #[test]
    fn mismatched_value_type_rejected() {
        let mut rs = sample();
        let forged = ParsedChange {
            key: ParameterKey::GlobalHalt,
            value: ParameterValue::Decimal(dec!(1)),
        };
        assert!(matches!(
            rs.apply(&forged),
            Err(ChangeError::InvalidValue { .. })
        ));
        assert!(!rs.system.global_halt);
    }

    #[test]
    fn serde_keeps_decimals_exact() {
        let mut rs = sample();
        rs.risk.max_position_size = dec!(0.1000000000000000000000000001);
        let json = serde_json::to_string(&rs).unwrap();
        let back: Ruleset = serde_json::from_str(&json).unwrap();
        assert_eq!(back, rs);
    }
}
