use std::sync::Arc;

use serde::Deserialize;
use tracing::{debug, error, warn};

use crate::config::ExchangeConfig;
use crate::http_client::{HttpAuth, HttpClient, HttpMethod, HttpRequest, HttpResponse, ReqwestHttpClient};
use crate::retry::{FailureClass, RetryPolicy};
use crate::signing::{
    canonical_query, QueryParams, RequestClock, RequestSigner, SystemClock, API_KEY_HEADER,
};
use crate::ExchangeError;

pub const ACCOUNT_ENDPOINT: &str = "/api/v3/account";
pub const TICKER_PRICE_ENDPOINT: &str = "/api/v3/ticker/price";
pub const ORDER_TEST_ENDPOINT: &str = "/api/v3/order/test";

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

/// Exchange REST client: signs requests and retries transient failures.
///
/// Holds no state between calls apart from its configuration.
#[derive(Clone)]
pub struct SignedRequestClient {
    http_client: Arc<dyn HttpClient>,
    signer: Option<RequestSigner>,
    clock: Arc<dyn RequestClock>,
    base_url: String,
    timeout_ms: u64,
    retry: RetryPolicy,
}

impl SignedRequestClient {
    pub fn new(config: &ExchangeConfig, http_client: Arc<dyn HttpClient>) -> Self {
        if config.credentials.is_none() {
            warn!("exchange credentials are not configured; signed requests will fail");
        }

        Self {
            http_client,
            signer: config.credentials.clone().map(RequestSigner::new),
            clock: Arc::new(SystemClock),
            base_url: config.base_url.clone(),
            timeout_ms: config.timeout_ms,
            retry: config.retry.clone(),
        }
    }

    /// Client backed by the production reqwest transport.
    pub fn from_config(config: &ExchangeConfig) -> Self {
        Self::new(config, Arc::new(ReqwestHttpClient::new()))
    }

    /// Replaces the wall clock used for request timestamps.
    pub fn with_clock(mut self, clock: Arc<dyn RequestClock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn has_credentials(&self) -> bool {
        self.signer.is_some()
    }

    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Signed call with an explicit attempt ceiling.
    ///
    /// Each attempt captures a fresh timestamp and signature. Fails with a
    /// configuration error before touching the network when credentials are
    /// missing.
    pub async fn execute(
        &self,
        endpoint: &str,
        params: &QueryParams,
        method: HttpMethod,
        max_attempts: u32,
    ) -> Result<String, ExchangeError> {
        let signer = self
            .signer
            .as_ref()
            .ok_or_else(ExchangeError::missing_credentials)?;

        let policy = RetryPolicy {
            max_attempts,
            ..self.retry.clone()
        };
        let auth = HttpAuth::Header {
            name: String::from(API_KEY_HEADER),
            value: signer.api_key().to_owned(),
        };

        self.send_with_retry(endpoint, &policy, || {
            let signed = signer.sign(method, endpoint, params, self.clock.unix_millis())?;
            let query = signed.query_string();
            let request = match method {
                HttpMethod::Get => HttpRequest::get(format!("{}?{query}", self.url(endpoint))),
                HttpMethod::Post => HttpRequest::post(self.url(endpoint))
                    .with_header("content-type", FORM_CONTENT_TYPE)
                    .with_body(query),
            };
            Ok(request.with_auth(&auth).with_timeout_ms(self.timeout_ms))
        })
        .await
    }

    /// Signed call using the configured attempt ceiling.
    pub async fn execute_signed(
        &self,
        endpoint: &str,
        params: &QueryParams,
        method: HttpMethod,
    ) -> Result<String, ExchangeError> {
        self.execute(endpoint, params, method, self.retry.max_attempts)
            .await
    }

    /// Unsigned GET; goes through the same retry policy but needs no credentials.
    pub async fn execute_public(
        &self,
        endpoint: &str,
        params: &QueryParams,
    ) -> Result<String, ExchangeError> {
        let url = if params.is_empty() {
            self.url(endpoint)
        } else {
            format!("{}?{}", self.url(endpoint), canonical_query(params))
        };

        self.send_with_retry(endpoint, &self.retry, || {
            Ok(HttpRequest::get(url.clone()).with_timeout_ms(self.timeout_ms))
        })
        .await
    }

    fn url(&self, endpoint: &str) -> String {
        format!(
            "{}/{}",
            self.base_url.trim_end_matches('/'),
            endpoint.trim_start_matches('/')
        )
    }

    async fn send_with_retry<F>(
        &self,
        endpoint: &str,
        policy: &RetryPolicy,
        mut build_request: F,
    ) -> Result<String, ExchangeError>
    where
        F: FnMut() -> Result<HttpRequest, ExchangeError>,
    {
        let mut attempt: u32 = 1;

        loop {
            let request = build_request()?;
            debug!(endpoint, method = %request.method, attempt, "sending exchange request");

            let (class, message) = match self.http_client.execute(request).await {
                Ok(response) if response.is_success() => return Ok(response.body),
                Ok(response) if response.status == 429 => {
                    (FailureClass::RateLimit, String::from("HTTP 429 Too Many Requests"))
                }
                Ok(response) => return Err(rejected(endpoint, &response)),
                Err(err) => (err.failure().failure_class(), err.message().to_owned()),
            };

            match policy.delay_for(class, attempt) {
                Some(delay) => {
                    warn!(
                        endpoint,
                        attempt,
                        failure = %class,
                        delay_ms = delay.as_millis() as u64,
                        %message,
                        "exchange request failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                None => {
                    error!(endpoint, attempts = attempt, failure = %class, %message, "exchange retries exhausted");
                    return Err(exhausted(class, attempt, message));
                }
            }
        }
    }
}

impl std::fmt::Debug for SignedRequestClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignedRequestClient")
            .field("base_url", &self.base_url)
            .field("has_credentials", &self.has_credentials())
            .field("timeout_ms", &self.timeout_ms)
            .field("retry", &self.retry)
            .finish()
    }
}

#[derive(Debug, Deserialize)]
struct ExchangeErrorBody {
    msg: String,
}

fn rejected(endpoint: &str, response: &HttpResponse) -> ExchangeError {
    let message = serde_json::from_str::<ExchangeErrorBody>(&response.body)
        .map(|body| body.msg)
        .ok()
        .filter(|msg| !msg.is_empty())
        .or_else(|| {
            reqwest::StatusCode::from_u16(response.status)
                .ok()
                .and_then(|status| status.canonical_reason())
                .map(str::to_owned)
        })
        .unwrap_or_else(|| format!("HTTP {}", response.status));

    error!(endpoint, status = response.status, %message, "exchange rejected request");

    ExchangeError::ExchangeRejected {
        status: response.status,
        message,
    }
}

fn exhausted(class: FailureClass, attempts: u32, message: String) -> ExchangeError {
    match class {
        FailureClass::RateLimit => ExchangeError::RateLimitExhausted { attempts },
        FailureClass::Network => ExchangeError::NetworkExhausted { attempts, message },
        FailureClass::NoResponse => ExchangeError::NoResponseExhausted { attempts, message },
    }
}
