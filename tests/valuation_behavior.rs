//! Behavior-driven tests for portfolio valuation

use std::str::FromStr;

use ferrofolio_core::{
    AssetBalance, AssetCode, AssetKind, PortfolioValuator, PriceQuote, ValuationPolicy,
};
use rust_decimal::Decimal;

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
fn portfolio_with_direct_pair_and_reference_currency_is_summed_and_sorted() {
    // Given: 1 BTC, 100 USDT and a BTCUSDT quote of 50000
    let balances = vec![balance("USDT", "100", "0"), balance("BTC", "1", "0")];
    let prices = vec![quote("BTCUSDT", "50000")];

    // When: The portfolio is valuated
    let snapshot = PortfolioValuator::default().valuate(&balances, &prices);

    // Then: The total is 50100 with BTC listed first
    assert_eq!(snapshot.total_value, dec("50100"));
    assert_eq!(snapshot.assets.len(), 2);
    assert_eq!(snapshot.assets[0].asset.as_str(), "BTC");
    assert_eq!(snapshot.assets[0].value, dec("50000"));
    assert_eq!(snapshot.assets[1].asset.as_str(), "USDT");
    assert_eq!(snapshot.assets[1].value, dec("100"));
    assert_eq!(snapshot.assets[1].price, Some(Decimal::ONE));
    assert_eq!(snapshot.assets[0].kind, AssetKind::Spot);
}

#[test]
fn asset_without_direct_pair_is_priced_through_the_bridge() {
    // Given: 2 XYZ, no XYZUSDT quote, but XYZBTC and BTCUSDT quotes
    let balances = vec![balance("XYZ", "2", "0")];
    let prices = vec![quote("XYZBTC", "0.01"), quote("BTCUSDT", "50000")];

    // When: The portfolio is valuated
    let snapshot = PortfolioValuator::default().valuate(&balances, &prices);

    // Then: XYZ resolves to 500 per unit and 1000 in total
    assert_eq!(snapshot.assets.len(), 1);
    assert_eq!(snapshot.assets[0].price, Some(dec("500")));
    assert_eq!(snapshot.assets[0].value, dec("1000"));
    assert_eq!(snapshot.total_value, dec("1000"));
}

#[test]
fn immaterial_assets_are_dropped_even_when_priced() {
    // Given: Dust worth 0.005 and a position worth exactly the threshold
    let balances = vec![balance("DUST", "0.5", "0"), balance("EDGE", "1", "0")];
    let prices = vec![quote("DUSTUSDT", "0.01"), quote("EDGEUSDT", "0.01")];

    // When: The portfolio is valuated
    let snapshot = PortfolioValuator::default().valuate(&balances, &prices);

    // Then: Neither passes the strict 0.01 threshold
    assert!(snapshot.assets.is_empty());
    assert_eq!(snapshot.total_value, Decimal::ZERO);
}

#[test]
fn empty_account_produces_empty_snapshot() {
    // Given: No balances, or only zero balances
    let valuator = PortfolioValuator::default();

    // When: Each is valuated
    let empty = valuator.valuate(&[], &[quote("BTCUSDT", "50000")]);
    let zeros = valuator.valuate(&[balance("BTC", "0", "0")], &[quote("BTCUSDT", "50000")]);

    // Then: Both snapshots are empty with a zero total
    for snapshot in [empty, zeros] {
        assert!(snapshot.assets.is_empty());
        assert_eq!(snapshot.total_value, Decimal::ZERO);
        assert_eq!(snapshot.reference_currency.as_str(), "USDT");
    }
}

#[test]
fn duplicate_balances_are_valued_independently() {
    // Given: The same asset reported twice
    let balances = vec![balance("ETH", "1", "0"), balance("ETH", "2", "0")];
    let prices = vec![quote("ETHUSDT", "100")];

    // When: The portfolio is valuated
    let snapshot = PortfolioValuator::default().valuate(&balances, &prices);

    // Then: Both rows appear and both count toward the total
    assert_eq!(snapshot.assets.len(), 2);
    assert_eq!(snapshot.total_value, dec("300"));
}

#[test]
fn custom_reference_currency_and_threshold_are_respected() {
    // Given: A policy valuing in BUSD with a threshold of 10
    let policy = ValuationPolicy::new(code("BUSD")).with_materiality_threshold(dec("10"));
    let balances = vec![balance("ETH", "0.001", "0"), balance("BNB", "1", "0")];
    let prices = vec![quote("ETHBUSD", "2000"), quote("BNBBUSD", "300")];

    // When: The portfolio is valuated
    let snapshot = PortfolioValuator::new(policy).valuate(&balances, &prices);

    // Then: Only BNB clears the threshold
    assert_eq!(snapshot.reference_currency.as_str(), "BUSD");
    assert_eq!(snapshot.assets.len(), 1);
    assert_eq!(snapshot.assets[0].asset.as_str(), "BNB");
}

#[test]
fn holdings_projection_keeps_snapshot_order() {
    // Given: A valuated two-asset portfolio
    let snapshot = PortfolioValuator::default().valuate(
        &[balance("ETH", "1", "1"), balance("BTC", "1", "0")],
        &[quote("ETHUSDT", "2000"), quote("BTCUSDT", "50000")],
    );

    // When: Holdings are derived
    let holdings = snapshot.holdings();

    // Then: They follow value order and report total amounts
    assert_eq!(holdings[0].asset.as_str(), "BTC");
    assert_eq!(holdings[1].asset.as_str(), "ETH");
    assert_eq!(holdings[1].total_amount, dec("2"));
}
