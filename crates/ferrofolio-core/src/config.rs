//! Exchange connection settings passed explicitly into the client and services.

use std::fmt::{Debug, Formatter};
use std::time::Duration;

use crate::cache::DEFAULT_PRICE_TTL;
use crate::retry::RetryPolicy;
use crate::valuation::ValuationPolicy;
use crate::{AssetCode, ExchangeError};

pub const DEFAULT_BASE_URL: &str = "https://api.binance.com";
pub const DEFAULT_BULK_THRESHOLD: usize = 50;

pub const API_KEY_ENV: &str = "FERROFOLIO_API_KEY";
pub const API_SECRET_ENV: &str = "FERROFOLIO_API_SECRET";
pub const BASE_URL_ENV: &str = "FERROFOLIO_BASE_URL";
pub const REFERENCE_CURRENCY_ENV: &str = "FERROFOLIO_REFERENCE_CURRENCY";

/// API key and secret. The secret only ever feeds the signer.
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    api_key: String,
    api_secret: String,
}

impl Credentials {
    pub fn new(api_key: impl Into<String>, api_secret: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            api_secret: api_secret.into(),
        }
    }

    /// Builds credentials only when both halves are non-empty.
    pub fn from_parts(api_key: Option<String>, api_secret: Option<String>) -> Option<Self> {
        let api_key = api_key.filter(|value| !value.trim().is_empty())?;
        let api_secret = api_secret.filter(|value| !value.trim().is_empty())?;
        Some(Self::new(api_key, api_secret))
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    pub fn api_secret(&self) -> &str {
        &self.api_secret
    }
}

impl Debug for Credentials {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &"<redacted>")
            .field("api_secret", &"<redacted>")
            .finish()
    }
}

/// Everything the exchange stack needs, built once and handed to constructors.
#[derive(Debug, Clone)]
pub struct ExchangeConfig {
    pub credentials: Option<Credentials>,
    pub base_url: String,
    pub timeout_ms: u64,
    pub retry: RetryPolicy,
    pub cache_ttl: Duration,
    /// Held-asset count at which valuation pulls the full ticker snapshot.
    pub bulk_threshold: usize,
    pub valuation: ValuationPolicy,
    /// Per-symbol price requests per second; `None` disables throttling.
    pub symbol_rate_per_second: Option<u32>,
}

impl Default for ExchangeConfig {
    fn default() -> Self {
        Self {
            credentials: None,
            base_url: String::from(DEFAULT_BASE_URL),
            timeout_ms: 10_000,
            retry: RetryPolicy::default(),
            cache_ttl: DEFAULT_PRICE_TTL,
            bulk_threshold: DEFAULT_BULK_THRESHOLD,
            valuation: ValuationPolicy::default(),
            symbol_rate_per_second: Some(10),
        }
    }
}

impl ExchangeConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reads credentials and overrides from the process environment.
    ///
    /// Empty variables count as unset. Missing credentials are not an error
    /// here; signed calls fail later with a configuration error.
    pub fn from_env() -> Result<Self, ExchangeError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ExchangeError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let non_empty = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

        let mut config = Self::default();
        config.credentials = Credentials::from_parts(non_empty(API_KEY_ENV), non_empty(API_SECRET_ENV));

        if let Some(base_url) = non_empty(BASE_URL_ENV) {
            config = config.with_base_url(base_url);
        }

        if let Some(reference) = non_empty(REFERENCE_CURRENCY_ENV) {
            config = config.with_reference_currency(AssetCode::parse(&reference)?);
        }

        Ok(config)
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_owned();
        self
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_cache_ttl(mut self, cache_ttl: Duration) -> Self {
        self.cache_ttl = cache_ttl;
        self
    }

    pub fn with_bulk_threshold(mut self, bulk_threshold: usize) -> Self {
        self.bulk_threshold = bulk_threshold;
        self
    }

    pub fn with_valuation(mut self, valuation: ValuationPolicy) -> Self {
        self.valuation = valuation;
        self
    }

    pub fn with_reference_currency(mut self, reference: AssetCode) -> Self {
        self.valuation.reference_currency = reference;
        self
    }

    pub fn with_symbol_rate_per_second(mut self, rate: Option<u32>) -> Self {
        self.symbol_rate_per_second = rate;
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.credentials.is_some()
    }
}
