use std::fmt::{Display, Formatter};

use serde::{Deserialize, Serialize};

use crate::ValidationError;

const MAX_CODE_LEN: usize = 20;

/// Normalized exchange code: either a single asset (`BTC`) or a trading pair
/// written as base followed by quote (`BTCUSDT`).
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct AssetCode(String);

impl AssetCode {
    /// Parse and normalize a code to uppercase.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(ValidationError::EmptyCode);
        }

        let normalized = trimmed.to_ascii_uppercase();
        let len = normalized.chars().count();
        if len > MAX_CODE_LEN {
            return Err(ValidationError::CodeTooLong {
                len,
                max: MAX_CODE_LEN,
            });
        }

        // Listed assets may start with a digit (1INCH), so only the charset is checked.
        for (index, ch) in normalized.chars().enumerate() {
            if !ch.is_ascii_alphanumeric() {
                return Err(ValidationError::CodeInvalidChar { ch, index });
            }
        }

        Ok(Self(normalized))
    }

    /// For literals already in normalized form.
    pub(crate) fn from_static(code: &'static str) -> Self {
        debug_assert!(Self::parse(code).is_ok_and(|parsed| parsed.0 == code));
        Self(code.to_owned())
    }

    /// Concatenates two codes into the pair symbol the exchange quotes.
    pub fn pair(base: &AssetCode, quote: &AssetCode) -> String {
        format!("{}{}", base.0, quote.0)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the base part when `self` is a pair quoted in `quote`.
    pub fn strip_quote<'a>(&'a self, quote: &AssetCode) -> Option<&'a str> {
        self.0
            .strip_suffix(quote.as_str())
            .filter(|base| !base.is_empty())
    }
}

impl Display for AssetCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for AssetCode {
    type Error = ValidationError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl TryFrom<&str> for AssetCode {
    type Error = ValidationError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::parse(value)
    }
}

impl From<AssetCode> for String {
    fn from(value: AssetCode) -> Self {
        value.0
    }
}
