//! # Domain Models
//!
//! Canonical types shared by the exchange client, price service and valuator.
//!
//! | Type | Description |
//! |------|-------------|
//! | [`AssetCode`] | Validated asset or trading-pair code |
//! | [`AssetBalance`] | Free/locked amounts for one asset |
//! | [`PriceQuote`] | Last price for one trading pair |
//! | [`ValuedAsset`] | Balance resolved against the reference currency |
//! | [`PortfolioSnapshot`] | Immutable valuation result |
//! | [`Holding`] / [`TokenPrice`] | Front-end facing projections |
//! | [`UtcDateTime`] | UTC timestamp |
//!
//! Amounts and prices are [`rust_decimal::Decimal`] so valuation sums are exact.

mod models;
mod symbol;
mod timestamp;

pub use models::{
    AssetBalance, AssetKind, Holding, PortfolioSnapshot, PriceQuote, TokenPrice, ValuedAsset,
};
pub use symbol::AssetCode;
pub use timestamp::UtcDateTime;
