//! Short-lived in-memory cache for ticker price lookups.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;

use crate::{AssetCode, PriceQuote};

/// Entries stay valid for this long after capture.
pub const DEFAULT_PRICE_TTL: Duration = Duration::from_millis(1_000);

const ALL_PRICES_KEY: &str = "__all_prices__";

/// Fingerprint of a price lookup.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CacheKey {
    AllPrices,
    /// Sorted, de-duplicated, comma-joined pair symbols.
    Symbols(String),
}

impl CacheKey {
    /// Key for a symbol subset; independent of input order and duplicates.
    pub fn for_symbols<'a, I>(symbols: I) -> Self
    where
        I: IntoIterator<Item = &'a AssetCode>,
    {
        let mut sorted: Vec<&str> = symbols.into_iter().map(AssetCode::as_str).collect();
        sorted.sort_unstable();
        sorted.dedup();
        Self::Symbols(sorted.join(","))
    }
}

impl Display for CacheKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::AllPrices => f.write_str(ALL_PRICES_KEY),
            Self::Symbols(joined) => f.write_str(joined),
        }
    }
}

/// The two payload shapes the price service stores.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CachedPrices {
    /// Full ticker snapshot.
    All(Vec<PriceQuote>),
    /// Quotes for a requested symbol subset.
    Targeted(Vec<PriceQuote>),
}

impl CachedPrices {
    pub fn quotes(&self) -> &[PriceQuote] {
        match self {
            Self::All(quotes) | Self::Targeted(quotes) => quotes,
        }
    }

    pub fn into_quotes(self) -> Vec<PriceQuote> {
        match self {
            Self::All(quotes) | Self::Targeted(quotes) => quotes,
        }
    }
}

#[derive(Debug, Clone)]
struct CacheEntry {
    payload: CachedPrices,
    captured_at: Instant,
}

#[derive(Debug)]
struct CacheInner {
    map: HashMap<CacheKey, CacheEntry>,
    ttl: Duration,
}

impl CacheInner {
    fn get(&self, key: &CacheKey) -> Option<CachedPrices> {
        self.map.get(key).and_then(|entry| {
            if entry.captured_at.elapsed() < self.ttl {
                Some(entry.payload.clone())
            } else {
                None
            }
        })
    }

    fn clear_expired(&mut self) {
        let ttl = self.ttl;
        self.map.retain(|_, entry| entry.captured_at.elapsed() < ttl);
    }
}

/// Thread-safe price cache with a single fixed TTL.
#[derive(Debug, Clone)]
pub struct PriceCache {
    inner: Arc<tokio::sync::RwLock<CacheInner>>,
}

impl Default for PriceCache {
    fn default() -> Self {
        Self::new(DEFAULT_PRICE_TTL)
    }
}

impl PriceCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            inner: Arc::new(tokio::sync::RwLock::new(CacheInner {
                map: HashMap::new(),
                ttl,
            })),
        }
    }

    /// Returns the payload when it was captured less than one TTL ago.
    /// Expired entries behave exactly like missing ones.
    pub async fn get(&self, key: &CacheKey) -> Option<CachedPrices> {
        let store = self.inner.read().await;
        store.get(key)
    }

    pub async fn get_all(&self) -> Option<Vec<PriceQuote>> {
        match self.get(&CacheKey::AllPrices).await {
            Some(CachedPrices::All(quotes)) => Some(quotes),
            _ => None,
        }
    }

    pub async fn get_targeted(&self, key: &CacheKey) -> Option<Vec<PriceQuote>> {
        match self.get(key).await {
            Some(CachedPrices::Targeted(quotes)) => Some(quotes),
            _ => None,
        }
    }

    /// Stores `payload`, replacing any entry under `key` and restarting its TTL.
    pub async fn put(&self, key: CacheKey, payload: CachedPrices) {
        let mut store = self.inner.write().await;
        store.map.insert(
            key,
            CacheEntry {
                payload,
                captured_at: Instant::now(),
            },
        );
    }

    pub async fn clear_expired(&self) {
        let mut store = self.inner.write().await;
        store.clear_expired();
    }

    pub async fn clear(&self) {
        let mut store = self.inner.write().await;
        store.map.clear();
    }

    /// Number of entries, expired ones included.
    pub async fn len(&self) -> usize {
        let store = self.inner.read().await;
        store.map.len()
    }

    pub async fn ttl(&self) -> Duration {
        let store = self.inner.read().await;
        store.ttl
    }
}

#[cfg(test)]
mod tests {
    use rust_decimal::Decimal;

    use super::*;

    fn code(raw: &str) -> AssetCode {
        AssetCode::parse(raw).expect("valid code")
    }

    fn quotes(symbol: &str, price: i64) -> Vec<PriceQuote> {
        vec![PriceQuote::new(code(symbol), Decimal::from(price)).expect("valid quote")]
    }

    #[test]
    fn symbol_key_ignores_order_and_duplicates() {
        let forward = CacheKey::for_symbols(&[code("ETHUSDT"), code("BTCUSDT")]);
        let reverse = CacheKey::for_symbols(&[code("BTCUSDT"), code("ETHUSDT"), code("BTCUSDT")]);

        assert_eq!(forward, reverse);
        assert_eq!(forward.to_string(), "BTCUSDT,ETHUSDT");
    }

    #[tokio::test(start_paused = true)]
    async fn entry_is_fresh_just_before_ttl_and_stale_just_after() {
        let cache = PriceCache::default();
        cache
            .put(CacheKey::AllPrices, CachedPrices::All(quotes("BTCUSDT", 50_000)))
            .await;

        tokio::time::advance(Duration::from_millis(999)).await;
        assert_eq!(cache.get_all().await, Some(quotes("BTCUSDT", 50_000)));

        tokio::time::advance(Duration::from_millis(2)).await;
        assert!(cache.get_all().await.is_none());
    }

    #[tokio::test(start_paused = true)]
    async fn put_overwrites_and_restarts_ttl() {
        let cache = PriceCache::new(Duration::from_millis(100));
        let key = CacheKey::for_symbols(&[code("BTCUSDT")]);

        cache
            .put(key.clone(), CachedPrices::Targeted(quotes("BTCUSDT", 1)))
            .await;
        tokio::time::advance(Duration::from_millis(150)).await;
        assert!(cache.get(&key).await.is_none());

        cache
            .put(key.clone(), CachedPrices::Targeted(quotes("BTCUSDT", 2)))
            .await;
        assert_eq!(cache.get_targeted(&key).await, Some(quotes("BTCUSDT", 2)));
        assert_eq!(cache.len().await, 1);
    }

    #[tokio::test]
    async fn wrong_payload_shape_is_a_miss() {
        let cache = PriceCache::default();
        cache
            .put(CacheKey::AllPrices, CachedPrices::Targeted(quotes("BTCUSDT", 1)))
            .await;

        assert!(cache.get_all().await.is_none());
        assert!(cache.get(&CacheKey::AllPrices).await.is_some());
    }

    #[tokio::test(start_paused = true)]
    async fn clear_expired_drops_only_stale_entries() {
        let cache = PriceCache::new(Duration::from_millis(100));
        cache
            .put(CacheKey::AllPrices, CachedPrices::All(Vec::new()))
            .await;
        tokio::time::advance(Duration::from_millis(60)).await;
        cache
            .put(
                CacheKey::for_symbols(&[code("ETHUSDT")]),
                CachedPrices::Targeted(Vec::new()),
            )
            .await;
        tokio::time::advance(Duration::from_millis(60)).await;

        cache.clear_expired().await;
        assert_eq!(cache.len().await, 1);

        cache.clear().await;
        assert_eq!(cache.len().await, 0);
    }
}
