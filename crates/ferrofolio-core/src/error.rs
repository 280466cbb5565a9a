use thiserror::Error;

/// Validation errors raised while constructing domain values.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("asset code cannot be empty")]
    EmptyCode,
    #[error("asset code length {len} exceeds max {max}")]
    CodeTooLong { len: usize, max: usize },
    #[error("asset code contains invalid character '{ch}' at index {index}")]
    CodeInvalidChar { ch: char, index: usize },

    #[error("timestamp must be RFC3339 UTC (suffix Z): '{value}'")]
    TimestampNotUtc { value: String },
    #[error("epoch milliseconds {millis} are out of range")]
    TimestampOutOfRange { millis: i64 },

    #[error("field '{field}' must be non-negative")]
    NegativeValue { field: &'static str },
    #[error("field '{field}' is not a decimal number: '{value}'")]
    InvalidDecimal { field: &'static str, value: String },
    #[error("field '{field}' overflows the decimal range")]
    AmountOverflow { field: &'static str },
    #[error("field '{field}' must be greater than zero")]
    NonPositiveValue { field: &'static str },
    #[error("field '{field}' is required for {context}")]
    MissingField {
        field: &'static str,
        context: &'static str,
    },
}

/// Coarse classification of [`ExchangeError`] for callers that branch on it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExchangeErrorKind {
    Configuration,
    RateLimitExhausted,
    NetworkExhausted,
    NoResponseExhausted,
    ExchangeRejected,
    Decode,
    Validation,
}

/// Terminal failures surfaced by the exchange client and the services above it.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("configuration error: {0}")]
    Configuration(String),

    #[error("rate limit still exceeded after {attempts} attempts")]
    RateLimitExhausted { attempts: u32 },

    #[error("network failure after {attempts} attempts: {message}")]
    NetworkExhausted { attempts: u32, message: String },

    #[error("no response from exchange after {attempts} attempts: {message}")]
    NoResponseExhausted { attempts: u32, message: String },

    #[error("exchange rejected request ({status}): {message}")]
    ExchangeRejected { status: u16, message: String },

    #[error("failed to decode exchange response: {0}")]
    Decode(String),

    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl ExchangeError {
    pub fn missing_credentials() -> Self {
        Self::Configuration(String::from(
            "API key and secret are required for signed requests",
        ))
    }

    pub const fn kind(&self) -> ExchangeErrorKind {
        match self {
            Self::Configuration(_) => ExchangeErrorKind::Configuration,
            Self::RateLimitExhausted { .. } => ExchangeErrorKind::RateLimitExhausted,
            Self::NetworkExhausted { .. } => ExchangeErrorKind::NetworkExhausted,
            Self::NoResponseExhausted { .. } => ExchangeErrorKind::NoResponseExhausted,
            Self::ExchangeRejected { .. } => ExchangeErrorKind::ExchangeRejected,
            Self::Decode(_) => ExchangeErrorKind::Decode,
            Self::Validation(_) => ExchangeErrorKind::Validation,
        }
    }

    /// Exhaustion errors may succeed if the caller tries again later.
    pub const fn retryable(&self) -> bool {
        matches!(
            self.kind(),
            ExchangeErrorKind::RateLimitExhausted
                | ExchangeErrorKind::NetworkExhausted
                | ExchangeErrorKind::NoResponseExhausted
        )
    }

    pub const fn code(&self) -> &'static str {
        match self.kind() {
            ExchangeErrorKind::Configuration => "exchange.configuration",
            ExchangeErrorKind::RateLimitExhausted => "exchange.rate_limit_exhausted",
            ExchangeErrorKind::NetworkExhausted => "exchange.network_exhausted",
            ExchangeErrorKind::NoResponseExhausted => "exchange.no_response_exhausted",
            ExchangeErrorKind::ExchangeRejected => "exchange.rejected",
            ExchangeErrorKind::Decode => "exchange.decode",
            ExchangeErrorKind::Validation => "exchange.validation",
        }
    }
}

impl From<serde_json::Error> for ExchangeError {
    fn from(error: serde_json::Error) -> Self {
        Self::Decode(error.to_string())
    }
}
