//! Account-facing operations: balances, valuation, holdings, token prices and
//! order validation.

use std::fmt::{Display, Formatter};
use std::sync::Arc;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::client::{SignedRequestClient, ACCOUNT_ENDPOINT, ORDER_TEST_ENDPOINT};
use crate::config::ExchangeConfig;
use crate::http_client::{HttpClient, HttpMethod, ReqwestHttpClient};
use crate::prices::{parse_decimal, PriceService, PriceServiceConfig};
use crate::signing::QueryParams;
use crate::valuation::PortfolioValuator;
use crate::{
    AssetBalance, AssetCode, ExchangeError, Holding, PortfolioSnapshot, TokenPrice,
    ValidationError,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderSide {
    Buy,
    Sell,
}

impl OrderSide {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Buy => "BUY",
            Self::Sell => "SELL",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderType {
    Market,
    Limit,
}

impl OrderType {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Market => "MARKET",
            Self::Limit => "LIMIT",
        }
    }
}

impl Display for OrderType {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Order shape sent to the exchange's test endpoint. Nothing is placed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderProbe {
    pub symbol: AssetCode,
    pub side: OrderSide,
    pub order_type: OrderType,
    pub quantity: Decimal,
    /// Required for limit orders, ignored for market orders.
    pub price: Option<Decimal>,
}

impl OrderProbe {
    pub fn market(symbol: AssetCode, side: OrderSide, quantity: Decimal) -> Result<Self, ValidationError> {
        Self::validate_quantity(quantity)?;
        Ok(Self {
            symbol,
            side,
            order_type: OrderType::Market,
            quantity,
            price: None,
        })
    }

    pub fn limit(
        symbol: AssetCode,
        side: OrderSide,
        quantity: Decimal,
        price: Decimal,
    ) -> Result<Self, ValidationError> {
        Self::validate_quantity(quantity)?;
        if price <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveValue { field: "price" });
        }
        Ok(Self {
            symbol,
            side,
            order_type: OrderType::Limit,
            quantity,
            price: Some(price),
        })
    }

    fn validate_quantity(quantity: Decimal) -> Result<(), ValidationError> {
        if quantity <= Decimal::ZERO {
            return Err(ValidationError::NonPositiveValue { field: "quantity" });
        }
        Ok(())
    }

    /// Form parameters in the order the exchange documents them.
    pub fn to_params(&self) -> Result<QueryParams, ValidationError> {
        let mut params = QueryParams::new()
            .with("symbol", self.symbol.as_str())
            .with("side", self.side.as_str())
            .with("type", self.order_type.as_str());

        if self.order_type == OrderType::Limit {
            params.push("timeInForce", "GTC");
        }
        params.push("quantity", self.quantity.normalize().to_string());

        if self.order_type == OrderType::Limit {
            let price = self.price.ok_or(ValidationError::MissingField {
                field: "price",
                context: "limit orders",
            })?;
            params.push("price", price.normalize().to_string());
        }

        Ok(params)
    }
}

/// Entry point for callers: wires the signed client, price service and
/// valuator from one [`ExchangeConfig`].
#[derive(Debug, Clone)]
pub struct AccountService {
    client: SignedRequestClient,
    prices: PriceService,
    valuator: PortfolioValuator,
}

impl AccountService {
    pub fn new(config: &ExchangeConfig, http_client: Arc<dyn HttpClient>) -> Self {
        let client = SignedRequestClient::new(config, http_client);
        Self {
            prices: PriceService::new(client.clone(), PriceServiceConfig::from(config)),
            valuator: PortfolioValuator::new(config.valuation.clone()),
            client,
        }
    }

    pub fn from_config(config: &ExchangeConfig) -> Self {
        Self::new(config, Arc::new(ReqwestHttpClient::new()))
    }

    pub fn prices(&self) -> &PriceService {
        &self.prices
    }

    pub fn valuator(&self) -> &PortfolioValuator {
        &self.valuator
    }

    /// Signed account lookup, decoded to domain balances.
    pub async fn account_balances(&self) -> Result<Vec<AssetBalance>, ExchangeError> {
        let body = self
            .client
            .execute_signed(ACCOUNT_ENDPOINT, &QueryParams::new(), HttpMethod::Get)
            .await?;
        let balances = decode_balances(&body)?;
        debug!(count = balances.len(), "decoded account balances");
        Ok(balances)
    }

    /// Values the account against live prices.
    pub async fn snapshot(&self) -> Result<PortfolioSnapshot, ExchangeError> {
        let balances = self.account_balances().await?;
        let universe = self
            .prices
            .price_universe_for(&balances, self.valuator.policy())
            .await?;
        let snapshot = self.valuator.valuate(&balances, &universe);

        info!(
            assets = snapshot.assets.len(),
            total_value = %snapshot.total_value,
            reference = %snapshot.reference_currency,
            "portfolio valuated"
        );
        Ok(snapshot)
    }

    pub async fn fetch_holdings(&self) -> Result<Vec<Holding>, ExchangeError> {
        Ok(self.snapshot().await?.holdings())
    }

    /// Prices for already-normalized pair symbols (e.g. `ETHUSDT`).
    pub async fn fetch_token_prices(
        &self,
        pair_symbols: &[AssetCode],
    ) -> Result<Vec<TokenPrice>, ExchangeError> {
        let quotes = self.prices.get_symbol_prices(pair_symbols).await?;
        Ok(quotes.into_iter().map(TokenPrice::from).collect())
    }

    /// Asks the exchange to validate an order without placing it.
    pub async fn test_order(&self, probe: &OrderProbe) -> Result<(), ExchangeError> {
        let params = probe.to_params()?;
        self.client
            .execute_signed(ORDER_TEST_ENDPOINT, &params, HttpMethod::Post)
            .await?;
        info!(symbol = %probe.symbol, order_type = %probe.order_type, "order probe accepted");
        Ok(())
    }
}

/// A row that cannot be represented is skipped; the rest of the account survives.
fn decode_balances(body: &str) -> Result<Vec<AssetBalance>, ExchangeError> {
    let account: RawAccount = serde_json::from_str(body)?;
    Ok(account
        .balances
        .into_iter()
        .filter_map(|row| {
            let asset = row.asset.clone();
            row.into_balance()
                .map_err(|err| warn!(%asset, error = %err, "skipping account balance row"))
                .ok()
        })
        .collect())
}

#[derive(Debug, Deserialize)]
struct RawAccount {
    #[serde(default)]
    balances: Vec<RawBalance>,
}

#[derive(Debug, Deserialize)]
struct RawBalance {
    asset: String,
    free: String,
    locked: String,
}

impl RawBalance {
    fn into_balance(self) -> Result<AssetBalance, ValidationError> {
        AssetBalance::new(
            AssetCode::parse(&self.asset)?,
            parse_decimal("free", &self.free)?,
            parse_decimal("locked", &self.locked)?,
        )
    }
}
