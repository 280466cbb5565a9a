use std::num::NonZeroU32;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info, warn};

use crate::cache::{CacheKey, CachedPrices, PriceCache};
use crate::client::{SignedRequestClient, TICKER_PRICE_ENDPOINT};
use crate::config::ExchangeConfig;
use crate::signing::QueryParams;
use crate::valuation::ValuationPolicy;
use crate::{AssetBalance, AssetCode, ExchangeError, PriceQuote, ValidationError};

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Paces per-symbol price requests so a batch stays inside exchange limits.
#[derive(Clone)]
pub struct SymbolThrottle {
    limiter: Arc<DirectRateLimiter>,
}

impl SymbolThrottle {
    /// `None` when `rate` is zero.
    pub fn per_second(rate: u32) -> Option<Self> {
        let rate = NonZeroU32::new(rate)?;
        Some(Self {
            limiter: Arc::new(RateLimiter::direct(Quota::per_second(rate))),
        })
    }

    /// Returns immediately when budget is available.
    #[cfg(test)]
    fn try_acquire(&self) -> bool {
        self.limiter.check().is_ok()
    }

    pub async fn acquire(&self) {
        self.limiter.until_ready().await;
    }
}

impl std::fmt::Debug for SymbolThrottle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolThrottle").finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceServiceConfig {
    pub cache_ttl: Duration,
    /// Held-asset count at or above which the full snapshot is fetched instead
    /// of per-symbol prices.
    pub bulk_threshold: usize,
    pub symbol_rate_per_second: Option<u32>,
}

impl Default for PriceServiceConfig {
    fn default() -> Self {
        Self::from(&ExchangeConfig::default())
    }
}

impl From<&ExchangeConfig> for PriceServiceConfig {
    fn from(config: &ExchangeConfig) -> Self {
        Self {
            cache_ttl: config.cache_ttl,
            bulk_threshold: config.bulk_threshold,
            symbol_rate_per_second: config.symbol_rate_per_second,
        }
    }
}

/// Public ticker lookups with a short-lived cache in front.
#[derive(Debug, Clone)]
pub struct PriceService {
    client: SignedRequestClient,
    cache: PriceCache,
    throttle: Option<SymbolThrottle>,
    bulk_threshold: usize,
}

impl PriceService {
    pub fn new(client: SignedRequestClient, config: PriceServiceConfig) -> Self {
        Self {
            client,
            cache: PriceCache::new(config.cache_ttl),
            throttle: config
                .symbol_rate_per_second
                .and_then(SymbolThrottle::per_second),
            bulk_threshold: config.bulk_threshold,
        }
    }

    pub fn cache(&self) -> &PriceCache {
        &self.cache
    }

    pub fn bulk_threshold(&self) -> usize {
        self.bulk_threshold
    }

    /// Full ticker snapshot.
    pub async fn get_all_prices(&self) -> Result<Vec<PriceQuote>, ExchangeError> {
        if let Some(quotes) = self.cache.get_all().await {
            debug!(count = quotes.len(), "all prices served from cache");
            return Ok(quotes);
        }

        let body = self
            .client
            .execute_public(TICKER_PRICE_ENDPOINT, &QueryParams::new())
            .await?;
        let quotes = parse_ticker_list(&body)?;

        info!(count = quotes.len(), "fetched full ticker snapshot");
        self.cache
            .put(CacheKey::AllPrices, CachedPrices::All(quotes.clone()))
            .await;
        Ok(quotes)
    }

    /// Prices for specific pair symbols, one request per symbol.
    ///
    /// A failing symbol is logged and skipped. When no symbol resolves the
    /// full snapshot is returned instead.
    pub async fn get_symbol_prices(
        &self,
        symbols: &[AssetCode],
    ) -> Result<Vec<PriceQuote>, ExchangeError> {
        if symbols.is_empty() {
            return Ok(Vec::new());
        }

        let key = CacheKey::for_symbols(symbols);
        if let Some(quotes) = self.cache.get_targeted(&key).await {
            debug!(key = %key, "symbol prices served from cache");
            return Ok(quotes);
        }

        let mut unique: Vec<&AssetCode> = Vec::with_capacity(symbols.len());
        for symbol in symbols {
            if !unique.contains(&symbol) {
                unique.push(symbol);
            }
        }

        let mut quotes = Vec::with_capacity(unique.len());
        for symbol in unique {
            if let Some(throttle) = &self.throttle {
                throttle.acquire().await;
            }
            match self.fetch_symbol_price(symbol).await {
                Ok(quote) => quotes.push(quote),
                Err(err) => {
                    warn!(symbol = %symbol, code = err.code(), error = %err, "skipping symbol price");
                }
            }
        }

        if quotes.is_empty() {
            warn!(key = %key, "no symbol prices resolved; falling back to full ticker snapshot");
            return self.get_all_prices().await;
        }

        self.cache
            .put(key, CachedPrices::Targeted(quotes.clone()))
            .await;
        Ok(quotes)
    }

    /// Quotes the valuator needs for `balances`.
    ///
    /// Large portfolios pull the full snapshot; smaller ones request only
    /// the direct and bridge pairs.
    pub async fn price_universe_for(
        &self,
        balances: &[AssetBalance],
        policy: &ValuationPolicy,
    ) -> Result<Vec<PriceQuote>, ExchangeError> {
        let held = balances
            .iter()
            .filter(|balance| balance.is_held())
            .count();

        if held >= self.bulk_threshold {
            debug!(held, threshold = self.bulk_threshold, "using full ticker snapshot");
            return self.get_all_prices().await;
        }

        let pairs = policy.required_pairs(balances);
        debug!(held, pairs = pairs.len(), "requesting targeted symbol prices");
        self.get_symbol_prices(&pairs).await
    }

    async fn fetch_symbol_price(&self, symbol: &AssetCode) -> Result<PriceQuote, ExchangeError> {
        let params = QueryParams::new().with("symbol", symbol.as_str());
        let body = self
            .client
            .execute_public(TICKER_PRICE_ENDPOINT, &params)
            .await?;
        let raw: RawTicker = serde_json::from_str(&body)?;
        Ok(raw.into_quote()?)
    }
}

#[derive(Debug, Deserialize)]
struct RawTicker {
    symbol: String,
    price: String,
}

impl RawTicker {
    fn into_quote(self) -> Result<PriceQuote, ValidationError> {
        let price = parse_decimal("price", &self.price)?;
        PriceQuote::new(AssetCode::parse(&self.symbol)?, price)
    }
}

pub(crate) fn parse_decimal(field: &'static str, raw: &str) -> Result<Decimal, ValidationError> {
    Decimal::from_str(raw.trim()).map_err(|_| ValidationError::InvalidDecimal {
        field,
        value: raw.to_owned(),
    })
}

/// Rows the domain cannot represent are dropped from the snapshot.
fn parse_ticker_list(body: &str) -> Result<Vec<PriceQuote>, ExchangeError> {
    let rows: Vec<RawTicker> = serde_json::from_str(body)?;
    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let symbol = row.symbol.clone();
            row.into_quote()
                .map_err(|err| debug!(%symbol, error = %err, "dropping ticker row"))
                .ok()
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::future::Future;
    use std::pin::Pin;
    use std::sync::Mutex;

    use super::*;
    use crate::http_client::{HttpClient, HttpError, HttpRequest, HttpResponse};
    use crate::retry::RetryPolicy;

    #[derive(Default)]
    struct ScriptedHttpClient {
        responses: Mutex<VecDeque<HttpResponse>>,
        urls: Mutex<Vec<String>>,
    }

    impl ScriptedHttpClient {
        fn with(responses: Vec<HttpResponse>) -> Self {
            Self {
                responses: Mutex::new(responses.into()),
                urls: Mutex::new(Vec::new()),
            }
        }

        fn urls(&self) -> Vec<String> {
            self.urls.lock().expect("lock").clone()
        }
    }

    impl HttpClient for ScriptedHttpClient {
        fn execute<'a>(
            &'a self,
            request: HttpRequest,
        ) -> Pin<Box<dyn Future<Output = Result<HttpResponse, HttpError>> + Send + 'a>> {
            self.urls.lock().expect("lock").push(request.url);
            let next = self
                .responses
                .lock()
                .expect("lock")
                .pop_front()
                .unwrap_or_else(|| HttpResponse::with_status(500, ""));
            Box::pin(async move { Ok(next) })
        }
    }

    fn service(http: Arc<ScriptedHttpClient>) -> PriceService {
        let config = ExchangeConfig::default()
            .with_base_url("https://exchange.test")
            .with_retry(RetryPolicy::no_retry())
            .with_symbol_rate_per_second(None);
        PriceService::new(
            SignedRequestClient::new(&config, http),
            PriceServiceConfig::from(&config),
        )
    }

    fn code(raw: &str) -> AssetCode {
        AssetCode::parse(raw).expect("valid code")
    }

    #[test]
    fn ticker_list_drops_malformed_rows() {
        let quotes = parse_ticker_list(
            r#"[{"symbol":"BTCUSDT","price":"50000.00"},{"symbol":"BADUSDT","price":"n/a"}]"#,
        )
        .expect("list decodes");

        assert_eq!(quotes.len(), 1);
        assert_eq!(quotes[0].price, Decimal::from(50_000));
    }

    #[test]
    fn malformed_json_is_a_decode_error() {
        let err = parse_ticker_list("<html>").expect_err("not json");
        assert_eq!(err.code(), "exchange.decode");
    }

    #[test]
    fn zero_rate_disables_throttle() {
        assert!(SymbolThrottle::per_second(0).is_none());
        let throttle = SymbolThrottle::per_second(1).expect("non-zero rate");
        assert!(throttle.try_acquire());
        assert!(!throttle.try_acquire());
    }

    #[tokio::test]
    async fn noop_transport_yields_empty_snapshot() {
        let config = ExchangeConfig::default().with_symbol_rate_per_second(None);
        let service = PriceService::new(
            SignedRequestClient::new(&config, Arc::new(crate::http_client::NoopHttpClient)),
            PriceServiceConfig::from(&config),
        );

        let quotes = service.get_all_prices().await.expect("empty list decodes");
        assert!(quotes.is_empty());
        assert!(service.cache().get_all().await.is_some());
    }

    #[tokio::test]
    async fn empty_symbol_list_makes_no_request() {
        let http = Arc::new(ScriptedHttpClient::default());
        let quotes = service(http.clone())
            .get_symbol_prices(&[])
            .await
            .expect("empty input is fine");

        assert!(quotes.is_empty());
        assert!(http.urls().is_empty());
    }

    #[tokio::test]
    async fn duplicate_symbols_are_fetched_once() {
        let http = Arc::new(ScriptedHttpClient::with(vec![HttpResponse::ok_json(
            r#"{"symbol":"ETHUSDT","price":"2000"}"#,
        )]));
        let quotes = service(http.clone())
            .get_symbol_prices(&[code("ETHUSDT"), code("ETHUSDT")])
            .await
            .expect("prices");

        assert_eq!(quotes.len(), 1);
        assert_eq!(
            http.urls(),
            vec![String::from(
                "https://exchange.test/api/v3/ticker/price?symbol=ETHUSDT"
            )]
        );
    }

    #[tokio::test]
    async fn large_portfolios_use_full_snapshot() {
        let http = Arc::new(ScriptedHttpClient::with(vec![HttpResponse::ok_json(
            r#"[{"symbol":"BTCUSDT","price":"50000"}]"#,
        )]));
        let config = ExchangeConfig::default()
            .with_base_url("https://exchange.test")
            .with_bulk_threshold(2)
            .with_symbol_rate_per_second(None);
        let service = PriceService::new(
            SignedRequestClient::new(&config, http.clone()),
            PriceServiceConfig::from(&config),
        );
        let balances = vec![
            AssetBalance::new(code("BTC"), Decimal::ONE, Decimal::ZERO).expect("valid"),
            AssetBalance::new(code("ETH"), Decimal::ONE, Decimal::ZERO).expect("valid"),
        ];

        let quotes = service
            .price_universe_for(&balances, &ValuationPolicy::default())
            .await
            .expect("snapshot");

        assert_eq!(quotes.len(), 1);
        assert_eq!(
            http.urls(),
            vec![String::from("https://exchange.test/api/v3/ticker/price")]
        );
    }
}
