use ferrofolio_core::{AccountService, AssetCode, Holding, UtcDateTime};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::error::CliError;

#[derive(Debug, Serialize)]
struct HoldingsResponseData {
    reference_currency: AssetCode,
    total_value: Decimal,
    captured_at: UtcDateTime,
    holdings: Vec<Holding>,
}

pub async fn run(account: &AccountService) -> Result<Value, CliError> {
    let snapshot = account.snapshot().await?;

    let data = HoldingsResponseData {
        holdings: snapshot.holdings(),
        reference_currency: snapshot.reference_currency,
        total_value: snapshot.total_value,
        captured_at: snapshot.captured_at,
    };
    Ok(serde_json::to_value(data)?)
}
