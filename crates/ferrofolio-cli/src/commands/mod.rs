mod holdings;
mod prices;

use ferrofolio_core::{AccountService, AssetCode, ExchangeConfig};
use serde_json::Value;

use crate::cli::{Cli, Command};
use crate::error::CliError;

pub async fn run(cli: &Cli) -> Result<Value, CliError> {
    let config = build_config(cli)?;
    let account = AccountService::from_config(&config);

    match &cli.command {
        Command::Holdings => holdings::run(&account).await,
        Command::Prices(args) => {
            prices::run(args, &account, &config.valuation.reference_currency).await
        }
    }
}

/// Environment first, then command-line overrides.
fn build_config(cli: &Cli) -> Result<ExchangeConfig, CliError> {
    let mut config = ExchangeConfig::from_env()?;

    if let Some(base_url) = &cli.base_url {
        config = config.with_base_url(base_url.as_str());
    }
    if let Some(reference) = &cli.reference {
        config = config.with_reference_currency(AssetCode::parse(reference)?);
    }

    Ok(config)
}
