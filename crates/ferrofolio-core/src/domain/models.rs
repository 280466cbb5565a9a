use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::{AssetCode, UtcDateTime, ValidationError};

/// Classification tag carried through to holdings output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetKind {
    Spot,
}

impl AssetKind {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Spot => "spot",
        }
    }
}

/// Account balance for a single asset.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AssetBalance {
    pub asset: AssetCode,
    pub free: Decimal,
    pub locked: Decimal,
}

impl AssetBalance {
    pub fn new(asset: AssetCode, free: Decimal, locked: Decimal) -> Result<Self, ValidationError> {
        validate_non_negative("free", free)?;
        validate_non_negative("locked", locked)?;
        free.checked_add(locked)
            .ok_or(ValidationError::AmountOverflow { field: "total" })?;

        Ok(Self {
            asset,
            free,
            locked,
        })
    }

    /// `free + locked`, or `None` if the sum leaves the decimal range.
    pub fn total(&self) -> Option<Decimal> {
        self.free.checked_add(self.locked)
    }

    /// Whether anything is held. Overflowing balances count as not held.
    pub fn is_held(&self) -> bool {
        self.total().is_some_and(|total| total > Decimal::ZERO)
    }
}

/// Last traded price for one trading pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceQuote {
    pub symbol: AssetCode,
    pub price: Decimal,
}

impl PriceQuote {
    pub fn new(symbol: AssetCode, price: Decimal) -> Result<Self, ValidationError> {
        validate_non_negative("price", price)?;
        Ok(Self { symbol, price })
    }
}

/// One line of a valuation: amounts, resolved reference price and value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValuedAsset {
    pub asset: AssetCode,
    pub free: Decimal,
    pub locked: Decimal,
    pub total: Decimal,
    /// `None` when no quote path to the reference currency exists.
    pub price: Option<Decimal>,
    pub value: Decimal,
    pub kind: AssetKind,
}

/// Immutable result of one valuation run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortfolioSnapshot {
    pub reference_currency: AssetCode,
    pub total_value: Decimal,
    /// Sorted by value, largest first.
    pub assets: Vec<ValuedAsset>,
    pub captured_at: UtcDateTime,
}

impl PortfolioSnapshot {
    pub fn holdings(&self) -> Vec<Holding> {
        self.assets
            .iter()
            .map(|asset| Holding {
                asset: asset.asset.clone(),
                kind: asset.kind,
                total_amount: asset.total,
            })
            .collect()
    }
}

/// Holding row handed to front-ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Holding {
    pub asset: AssetCode,
    #[serde(rename = "type")]
    pub kind: AssetKind,
    pub total_amount: Decimal,
}

/// Token price row handed to front-ends; `token` is the pair symbol as quoted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TokenPrice {
    pub token: AssetCode,
    pub price: Decimal,
}

impl From<PriceQuote> for TokenPrice {
    fn from(quote: PriceQuote) -> Self {
        Self {
            token: quote.symbol,
            price: quote.price,
        }
    }
}

fn validate_non_negative(field: &'static str, value: Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::NegativeValue { field });
    }
    Ok(())
}
