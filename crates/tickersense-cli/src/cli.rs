//! CLI argument definitions for tickersense.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `chart` | Full pipeline: prices, earnings, sentiment, HTML chart |
//! | `sentiment` | News sentiment only, for an entity name |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--pretty` | `false` | Pretty-print JSON output |
//! | `--mock` | `false` | Serve deterministic offline data |
//! | `--verbose` | `false` | Debug logging on stderr |
//! | `--timeout-ms` | from env | Request timeout in ms |
//!
//! # Examples
//!
//! ```bash
//! tickersense chart AAPL --period 6mo --interval 1wk --output aapl.html
//! tickersense chart MSFT --no-render --pretty
//! tickersense sentiment "Tesla, Inc." --mock
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

/// Ticker price, earnings and news-sentiment charts.
#[derive(Debug, Parser)]
#[command(
    name = "tickersense",
    author,
    version,
    about = "Ticker price, earnings and news-sentiment charts",
    long_about = "tickersense fuses a security's price history, its earnings calendar and the \
sentiment of recent headlines into one time-aligned chart.\n\
\n\
The JSON run report goes to stdout; logs go to stderr (RUST_LOG overrides the filter).\n\
Set NEWS_API_KEY (or put it in .env) to enable live headlines."
)]
pub struct Cli {
    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    /// Use deterministic offline data instead of live providers.
    #[arg(long, global = true, default_value_t = false)]
    pub mock: bool,

    /// Log at debug level.
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Request timeout in milliseconds; overrides TICKERSENSE_TIMEOUT_MS.
    #[arg(long, global = true)]
    pub timeout_ms: Option<u64>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Run the full pipeline for one symbol.
    ///
    /// # Examples
    ///
    ///   tickersense chart AAPL
    ///   tickersense chart NVDA --period 1y --interval 1wk --horizon-months 6
    Chart(ChartArgs),

    /// Score recent headlines about an entity.
    ///
    /// # Examples
    ///
    ///   tickersense sentiment "Apple Inc."
    Sentiment(SentimentArgs),
}

#[derive(Debug, Args)]
pub struct ChartArgs {
    /// Ticker symbol (e.g. AAPL, ^GSPC, BTC-USD).
    pub symbol: String,

    /// Look-back period: 1mo, 3mo, 6mo or 1y.
    #[arg(long, default_value = "3mo")]
    pub period: String,

    /// Sampling interval: 1d or 1wk.
    #[arg(long, default_value = "1d")]
    pub interval: String,

    /// Months to extend the x-axis past the last price (0-12).
    #[arg(long, allow_negative_numbers = true)]
    pub horizon_months: Option<i32>,

    /// Skip chart assembly and report data only.
    #[arg(long, default_value_t = false)]
    pub no_render: bool,

    /// Where to write the HTML chart.
    #[arg(long, default_value = "chart.html")]
    pub output: PathBuf,
}

#[derive(Debug, Args)]
pub struct SentimentArgs {
    /// Entity name used to build the news query.
    pub name: String,
}
