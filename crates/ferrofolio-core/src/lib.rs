//! # Ferrofolio Core
//!
//! Exchange client, price cache and portfolio valuation for a single spot
//! crypto exchange account.
//!
//! ## Overview
//!
//! - **Signed requests**: HMAC-SHA256 signing with bounded retry per failure class
//! - **Price service**: full ticker snapshot or targeted symbols behind a 1 s cache
//! - **Valuation**: balances priced directly or through bridge assets, filtered
//!   by a materiality threshold and sorted by value
//! - **Account service**: balances, holdings, token prices and order probes
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`account`] | Account balances, snapshot, holdings, token prices, order probe |
//! | [`cache`] | Typed price cache with a fixed TTL |
//! | [`client`] | Signed/public request execution with retries |
//! | [`config`] | Credentials and exchange configuration |
//! | [`domain`] | Domain models (AssetCode, AssetBalance, PriceQuote, snapshots) |
//! | [`error`] | Error types |
//! | [`http_client`] | HTTP client abstraction |
//! | [`prices`] | Price service and per-symbol throttling |
//! | [`retry`] | Retry policy and backoff formulas |
//! | [`signing`] | Canonical query and signature construction |
//! | [`valuation`] | Portfolio valuator and policy |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use ferrofolio_core::{AccountService, ExchangeConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = ExchangeConfig::from_env()?;
//!     let account = AccountService::from_config(&config);
//!
//!     let snapshot = account.snapshot().await?;
//!     println!("total: {} {}", snapshot.total_value, snapshot.reference_currency);
//!
//!     Ok(())
//! }
//! ```
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────┐
//! │ AccountService  │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ PriceService    │────▶│ PriceCache       │
//! └────────┬────────┘     └──────────────────┘
//!          │
//!          ▼
//! ┌─────────────────┐     ┌──────────────────┐
//! │ SignedRequest   │────▶│ HTTP Client      │
//! │ Client          │     │ (reqwest/none)   │
//! └─────────────────┘     └──────────────────┘
//! ```
//!
//! ## Error Handling
//!
//! ```rust
//! use ferrofolio_core::{ExchangeError, ExchangeErrorKind};
//!
//! fn handle_error(error: ExchangeError) {
//!     match error.kind() {
//!         ExchangeErrorKind::RateLimitExhausted => {
//!             // Back off at a higher level
//!         }
//!         ExchangeErrorKind::Configuration => {
//!             // Credentials missing
//!         }
//!         _ => {}
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - The API secret only feeds the signer and is redacted from `Debug` output
//! - The API key travels in a header, never in logs

pub mod account;
pub mod cache;
pub mod client;
pub mod config;
pub mod domain;
pub mod error;
pub mod http_client;
pub mod prices;
pub mod retry;
pub mod signing;
pub mod valuation;

// Account operations
pub use account::{AccountService, OrderProbe, OrderSide, OrderType};

// Caching
pub use cache::{CacheKey, CachedPrices, PriceCache, DEFAULT_PRICE_TTL};

// Exchange client
pub use client::{
    SignedRequestClient, ACCOUNT_ENDPOINT, ORDER_TEST_ENDPOINT, TICKER_PRICE_ENDPOINT,
};

// Configuration
pub use config::{Credentials, ExchangeConfig};

// Domain models
pub use domain::{
    AssetBalance, AssetCode, AssetKind, Holding, PortfolioSnapshot, PriceQuote, TokenPrice,
    UtcDateTime, ValuedAsset,
};

// Error types
pub use error::{ExchangeError, ExchangeErrorKind, ValidationError};

// HTTP client types
pub use http_client::{
    HttpAuth, HttpClient, HttpError, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient,
    TransportFailure,
};

// Prices
pub use prices::{PriceService, PriceServiceConfig, SymbolThrottle};

// Retry logic
pub use retry::{Backoff, FailureClass, RetryPolicy};

// Signing
pub use signing::{
    canonical_query, create_signature, QueryParams, RequestClock, RequestSigner, SignedRequest,
    SystemClock,
};

// Valuation
pub use valuation::{PortfolioValuator, ValuationPolicy};
