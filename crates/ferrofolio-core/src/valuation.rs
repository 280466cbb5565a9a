//! Portfolio valuation against a reference currency.

use std::collections::HashMap;

use rust_decimal::Decimal;
use tracing::{debug, warn};

use crate::{
    AssetBalance, AssetCode, AssetKind, PortfolioSnapshot, PriceQuote, UtcDateTime, ValuedAsset,
};

/// How balances are resolved to reference-currency values.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValuationPolicy {
    pub reference_currency: AssetCode,
    /// Tried in order when no direct pair exists; first bridge with both legs quoted wins.
    pub bridge_assets: Vec<AssetCode>,
    /// Assets valued at or below this are left out of the snapshot.
    pub materiality_threshold: Decimal,
}

impl Default for ValuationPolicy {
    fn default() -> Self {
        Self {
            reference_currency: AssetCode::from_static("USDT"),
            bridge_assets: vec![AssetCode::from_static("BTC")],
            materiality_threshold: Decimal::new(1, 2),
        }
    }
}

impl ValuationPolicy {
    pub fn new(reference_currency: AssetCode) -> Self {
        Self {
            reference_currency,
            ..Self::default()
        }
    }

    pub fn with_bridge_assets(mut self, bridge_assets: Vec<AssetCode>) -> Self {
        self.bridge_assets = bridge_assets;
        self
    }

    pub fn with_materiality_threshold(mut self, threshold: Decimal) -> Self {
        self.materiality_threshold = threshold;
        self
    }

    /// Pair symbols whose quotes can price `balances`: direct pairs, asset to
    /// bridge pairs and bridge to reference pairs. Zero balances are skipped.
    pub fn required_pairs(&self, balances: &[AssetBalance]) -> Vec<AssetCode> {
        let reference = &self.reference_currency;
        let mut pairs: Vec<String> = Vec::new();
        let mut push = |pair: String| {
            if !pairs.contains(&pair) {
                pairs.push(pair);
            }
        };

        for balance in balances.iter().filter(|b| b.is_held()) {
            if &balance.asset == reference {
                continue;
            }
            push(AssetCode::pair(&balance.asset, reference));
            for bridge in &self.bridge_assets {
                if bridge == &balance.asset || bridge == reference {
                    continue;
                }
                push(AssetCode::pair(&balance.asset, bridge));
                push(AssetCode::pair(bridge, reference));
            }
        }

        pairs
            .into_iter()
            .filter_map(|pair| AssetCode::parse(&pair).ok())
            .collect()
    }
}

/// Stateless valuator; every call produces a fresh snapshot.
#[derive(Debug, Clone, Default)]
pub struct PortfolioValuator {
    policy: ValuationPolicy,
}

impl PortfolioValuator {
    pub fn new(policy: ValuationPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &ValuationPolicy {
        &self.policy
    }

    pub fn valuate(&self, balances: &[AssetBalance], prices: &[PriceQuote]) -> PortfolioSnapshot {
        let lookup: HashMap<&str, Decimal> = prices
            .iter()
            .map(|quote| (quote.symbol.as_str(), quote.price))
            .collect();

        let mut assets: Vec<ValuedAsset> = balances
            .iter()
            .filter(|balance| balance.is_held())
            .filter_map(|balance| self.value_balance(balance, &lookup))
            .filter(|asset| asset.value > self.policy.materiality_threshold)
            .collect();

        // Stable: equal values keep balance order.
        assets.sort_by(|a, b| b.value.cmp(&a.value));

        let mut total_value = Decimal::ZERO;
        assets.retain(|asset| match total_value.checked_add(asset.value) {
            Some(sum) => {
                total_value = sum;
                true
            }
            None => {
                warn!(
                    asset = %asset.asset,
                    value = %asset.value,
                    "portfolio total overflows; asset dropped"
                );
                false
            }
        });

        PortfolioSnapshot {
            reference_currency: self.policy.reference_currency.clone(),
            total_value,
            assets,
            captured_at: UtcDateTime::now(),
        }
    }

    /// Price of one unit of `asset` in the reference currency, if any quote path exists.
    pub fn resolve_price(&self, asset: &AssetCode, lookup: &HashMap<&str, Decimal>) -> Option<Decimal> {
        let reference = &self.policy.reference_currency;
        if asset == reference {
            return Some(Decimal::ONE);
        }

        if let Some(price) = lookup.get(AssetCode::pair(asset, reference).as_str()) {
            return Some(*price);
        }

        self.policy.bridge_assets.iter().find_map(|bridge| {
            let leg = lookup.get(AssetCode::pair(asset, bridge).as_str())?;
            let bridge_price = lookup.get(AssetCode::pair(bridge, reference).as_str())?;
            leg.checked_mul(*bridge_price)
        })
    }

    fn value_balance(
        &self,
        balance: &AssetBalance,
        lookup: &HashMap<&str, Decimal>,
    ) -> Option<ValuedAsset> {
        let total = balance.total()?;
        let Some(price) = self.resolve_price(&balance.asset, lookup) else {
            debug!(asset = %balance.asset, "no quote path to reference currency");
            return None;
        };
        let Some(value) = total.checked_mul(price) else {
            warn!(asset = %balance.asset, %total, %price, "asset value overflows; skipped");
            return None;
        };

        Some(ValuedAsset {
            asset: balance.asset.clone(),
            free: balance.free,
            locked: balance.locked,
            total,
            price: Some(price),
            value,
            kind: AssetKind::Spot,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn code(raw: &str) -> AssetCode {
        AssetCode::parse(raw).expect("valid code")
    }

    fn dec(raw: &str) -> Decimal {
        Decimal::from_str(raw).expect("valid decimal")
    }

    fn balance(asset: &str, free: &str, locked: &str) -> AssetBalance {
        AssetBalance::new(code(asset), dec(free), dec(locked)).expect("valid balance")
    }

    fn quote(symbol: &str, price: &str) -> PriceQuote {
        PriceQuote::new(code(symbol), dec(price)).expect("valid quote")
    }

    #[test]
    fn default_policy_values() {
        let policy = ValuationPolicy::default();
        assert_eq!(policy.reference_currency.as_str(), "USDT");
        assert_eq!(policy.bridge_assets, vec![code("BTC")]);
        assert_eq!(policy.materiality_threshold, dec("0.01"));
    }

    #[test]
    fn locked_amounts_count_toward_value() {
        let snapshot = PortfolioValuator::default().valuate(
            &[balance("ETH", "1", "0.5")],
            &[quote("ETHUSDT", "2000")],
        );

        assert_eq!(snapshot.total_value, dec("3000"));
        assert_eq!(snapshot.assets[0].total, dec("1.5"));
        assert_eq!(snapshot.assets[0].price, Some(dec("2000")));
    }

    #[test]
    fn unresolvable_assets_are_omitted() {
        let snapshot = PortfolioValuator::default().valuate(
            &[balance("ABC", "10", "0"), balance("USDT", "5", "0")],
            &[],
        );

        assert_eq!(snapshot.assets.len(), 1);
        assert_eq!(snapshot.assets[0].asset.as_str(), "USDT");
        assert_eq!(snapshot.total_value, dec("5"));
    }

    #[test]
    fn later_bridge_is_used_when_first_is_unquoted() {
        let policy = ValuationPolicy::default().with_bridge_assets(vec![code("BTC"), code("BNB")]);
        let snapshot = PortfolioValuator::new(policy).valuate(
            &[balance("XYZ", "4", "0")],
            &[quote("XYZBNB", "0.5"), quote("BNBUSDT", "300")],
        );

        assert_eq!(snapshot.assets[0].price, Some(dec("150")));
        assert_eq!(snapshot.total_value, dec("600"));
    }

    #[test]
    fn direct_pair_wins_over_bridge() {
        let snapshot = PortfolioValuator::default().valuate(
            &[balance("ETH", "1", "0")],
            &[
                quote("ETHUSDT", "2000"),
                quote("ETHBTC", "0.05"),
                quote("BTCUSDT", "50000"),
            ],
        );

        assert_eq!(snapshot.assets[0].price, Some(dec("2000")));
    }

    #[test]
    fn required_pairs_cover_direct_and_bridge_legs() {
        let pairs = ValuationPolicy::default().required_pairs(&[
            balance("ETH", "1", "0"),
            balance("BTC", "1", "0"),
            balance("USDT", "10", "0"),
            balance("DOGE", "0", "0"),
        ]);
        let pairs: Vec<&str> = pairs.iter().map(AssetCode::as_str).collect();

        assert_eq!(pairs, vec!["ETHUSDT", "ETHBTC", "BTCUSDT"]);
    }

    #[test]
    fn overflowing_total_drops_the_asset_instead_of_panicking() {
        let half_plus_one = Decimal::MAX / Decimal::TWO + Decimal::ONE;
        let balances = [
            AssetBalance::new(code("USDT"), half_plus_one, Decimal::ZERO).expect("valid"),
            AssetBalance::new(code("ETH"), half_plus_one, Decimal::ZERO).expect("valid"),
        ];

        let snapshot =
            PortfolioValuator::default().valuate(&balances, &[quote("ETHUSDT", "1")]);

        assert_eq!(snapshot.assets.len(), 1);
        assert_eq!(snapshot.assets[0].asset.as_str(), "USDT");
        assert_eq!(snapshot.total_value, half_plus_one);
    }

    #[test]
    fn overflowing_value_skips_the_asset() {
        let snapshot = PortfolioValuator::default().valuate(
            &[
                AssetBalance::new(code("ETH"), Decimal::MAX, Decimal::ZERO).expect("valid"),
                balance("USDT", "5", "0"),
            ],
            &[quote("ETHUSDT", "2000")],
        );

        assert_eq!(snapshot.assets.len(), 1);
        assert_eq!(snapshot.total_value, dec("5"));
    }
}
