use ferrofolio_core::{AccountService, AssetCode, TokenPrice, ValidationError};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;

use crate::cli::PricesArgs;
use crate::error::CliError;

#[derive(Debug, Serialize)]
struct PriceRow {
    token: String,
    price: Decimal,
}

#[derive(Debug, Serialize)]
struct PricesResponseData {
    reference_currency: AssetCode,
    prices: Vec<PriceRow>,
}

pub async fn run(
    args: &PricesArgs,
    account: &AccountService,
    reference: &AssetCode,
) -> Result<Value, CliError> {
    let pairs = args
        .tokens
        .iter()
        .map(|token| to_pair_symbol(token, reference))
        .collect::<Result<Vec<_>, _>>()?;

    let prices = account
        .fetch_token_prices(&pairs)
        .await?
        .into_iter()
        .map(|price| to_row(price, reference))
        .collect();

    Ok(serde_json::to_value(PricesResponseData {
        reference_currency: reference.clone(),
        prices,
    })?)
}

/// `eth` becomes `ETHUSDT`; tokens already quoted in the reference are kept.
fn to_pair_symbol(token: &str, reference: &AssetCode) -> Result<AssetCode, ValidationError> {
    let code = AssetCode::parse(token)?;
    if code.strip_quote(reference).is_some() {
        return Ok(code);
    }
    AssetCode::parse(&AssetCode::pair(&code, reference))
}

fn to_row(price: TokenPrice, reference: &AssetCode) -> PriceRow {
    let token = price
        .token
        .strip_quote(reference)
        .unwrap_or(price.token.as_str())
        .to_owned();
    PriceRow {
        token,
        price: price.price,
    }
}
