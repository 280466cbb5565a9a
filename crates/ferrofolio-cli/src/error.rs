use ferrofolio_core::{ExchangeError, ExchangeErrorKind};
use thiserror::Error;

/// CLI-level error categories mapped to exit codes.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Validation(#[from] ferrofolio_core::ValidationError),

    #[error(transparent)]
    Exchange(#[from] ExchangeError),

    #[error(transparent)]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl CliError {
    pub const fn exit_code(&self) -> u8 {
        match self {
            Self::Validation(_) => 2,
            Self::Exchange(error) => match error.kind() {
                ExchangeErrorKind::Configuration | ExchangeErrorKind::Validation => 2,
                ExchangeErrorKind::RateLimitExhausted
                | ExchangeErrorKind::NetworkExhausted
                | ExchangeErrorKind::NoResponseExhausted => 3,
                ExchangeErrorKind::ExchangeRejected | ExchangeErrorKind::Decode => 1,
            },
            Self::Serialization(_) => 4,
            Self::Io(_) => 10,
        }
    }
}
