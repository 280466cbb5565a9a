//! CLI argument definitions for Ferrofolio.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `holdings` | Value the account and list holdings |
//! | `prices` | Look up token prices in the reference currency |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--verbose` | `false` | Debug-level logs on stderr |
//! | `--base-url` | exchange URL | Override the REST base URL |
//! | `--reference` | `USDT` | Reference currency |
//!
//! Credentials come from `FERROFOLIO_API_KEY` and `FERROFOLIO_API_SECRET`.
//!
//! # Examples
//!
//! ```bash
//! ferrofolio holdings --pretty
//! ferrofolio prices eth btc --reference busd
//! ```

use clap::{Args, Parser, Subcommand};

/// Ferrofolio - exchange portfolio valuation CLI
#[derive(Debug, Parser)]
#[command(
    name = "ferrofolio",
    author,
    version,
    about = "Exchange portfolio valuation and price lookup"
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Log at debug level unless RUST_LOG is set.
    #[arg(long, short, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Exchange REST base URL.
    #[arg(long, global = true)]
    pub base_url: Option<String>,

    /// Reference currency used for valuation and price suffixes.
    #[arg(long, global = true)]
    pub reference: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Value the account and list holdings, largest first.
    Holdings,
    /// Fetch prices for tokens quoted in the reference currency.
    Prices(PricesArgs),
}

#[derive(Debug, Args)]
pub struct PricesArgs {
    /// Token symbols, e.g. `eth` or `ETHUSDT`.
    #[arg(required = true)]
    pub tokens: Vec<String>,
}
