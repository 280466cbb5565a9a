//! HMAC-SHA256 request signing.
//!
//! The signed payload is the canonical query followed by `&timestamp=<ms>`.
//! The hex signature is appended last as `&signature=<hex>` and is never part
//! of its own input.

use hmac::{Hmac, Mac};
use sha2::Sha256;
use tracing::trace;

use crate::config::Credentials;
use crate::http_client::HttpMethod;
use crate::{ExchangeError, UtcDateTime};

type HmacSha256 = Hmac<Sha256>;

pub const API_KEY_HEADER: &str = "X-MBX-APIKEY";

/// Query parameters kept in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.push(key, value);
        self
    }

    pub fn push(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.pairs.push((key.into(), value.into()));
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.pairs.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K, V> FromIterator<(K, V)> for QueryParams
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self {
            pairs: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

/// Joins `key=value` pairs with `&` in insertion order, percent-encoding values.
pub fn canonical_query(params: &QueryParams) -> String {
    params
        .iter()
        .map(|(key, value)| format!("{key}={}", urlencoding::encode(value)))
        .collect::<Vec<_>>()
        .join("&")
}

/// Hex-encoded HMAC-SHA256 of `payload` keyed by `secret`.
pub fn create_signature(secret: &str, payload: &str) -> Result<String, ExchangeError> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|e| ExchangeError::Configuration(format!("invalid signing key: {e}")))?;
    mac.update(payload.as_bytes());
    Ok(hex::encode(mac.finalize().into_bytes()))
}

/// A request ready to send: its signed query plus the pieces it was built from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignedRequest {
    pub method: HttpMethod,
    pub endpoint: String,
    pub timestamp_ms: i64,
    /// `<canonical query>&timestamp=<ms>`, the exact signature input.
    pub payload: String,
    pub signature: String,
}

impl SignedRequest {
    /// Payload with the signature appended; goes in the URL or the form body.
    pub fn query_string(&self) -> String {
        format!("{}&signature={}", self.payload, self.signature)
    }
}

/// Source of the epoch-millisecond timestamp stamped on each signed attempt.
pub trait RequestClock: Send + Sync {
    fn unix_millis(&self) -> i64;
}

/// Wall clock in UTC.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl RequestClock for SystemClock {
    fn unix_millis(&self) -> i64 {
        UtcDateTime::now().unix_millis()
    }
}

/// Signs requests with one set of credentials.
#[derive(Debug, Clone)]
pub struct RequestSigner {
    credentials: Credentials,
}

impl RequestSigner {
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }

    pub fn api_key(&self) -> &str {
        self.credentials.api_key()
    }

    pub fn sign(
        &self,
        method: HttpMethod,
        endpoint: &str,
        params: &QueryParams,
        timestamp_ms: i64,
    ) -> Result<SignedRequest, ExchangeError> {
        let canonical = canonical_query(params);
        let payload = if canonical.is_empty() {
            format!("timestamp={timestamp_ms}")
        } else {
            format!("{canonical}&timestamp={timestamp_ms}")
        };
        let signature = create_signature(self.credentials.api_secret(), &payload)?;

        trace!(%method, endpoint, timestamp_ms, "signed request");

        Ok(SignedRequest {
            method,
            endpoint: endpoint.to_owned(),
            timestamp_ms,
            payload,
            signature,
        })
    }
}
