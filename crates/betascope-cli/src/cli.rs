//! CLI argument definitions for betascope.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `beta` | Beta, alpha and volatility against the exchange benchmark, with peers |
//! | `peers` | Verified same-industry peers ranked by market-cap distance |
//! | `history` | Recent searches stored in the local warehouse |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--format` | `json` | Output format (json, table) |
//! | `--pretty` | `false` | Pretty-print JSON output |
//!
//! # Examples
//!
//! ```bash
//! betascope beta TCS --exchange NSE --start 2020-01-01 --end 2024-01-01 --pretty
//! betascope beta RELIANCE --period 3Y --industry-table industries.csv --format table
//! betascope peers INFY --exchange BSE --industry-table industries.csv
//! betascope history --limit 5
//! ```

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// Equity beta against NIFTY 50 / BSE SENSEX, with industry peers.
#[derive(Debug, Parser)]
#[command(
    name = "betascope",
    author,
    version,
    about = "Equity beta and peer comparison for Indian listings"
)]
pub struct Cli {
    /// Output format for results.
    #[arg(long, global = true, value_enum, default_value_t = OutputFormat::Json)]
    pub format: OutputFormat,

    /// Pretty-print JSON output with indentation.
    #[arg(long, global = true, default_value_t = false)]
    pub pretty: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// Aligned text for terminal display.
    Table,
    /// Single JSON object output.
    Json,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Regress daily returns against the benchmark and compare with peers.
    ///
    /// # Examples
    ///
    ///   betascope beta TCS --start 2020-01-01 --end 2024-01-01
    ///   betascope beta 500325 --exchange BSE --period 1Y
    Beta(BetaArgs),

    /// Discover, verify and rank peers without computing metrics.
    Peers(PeersArgs),

    /// List recent searches from the warehouse.
    History(HistoryArgs),
}

/// Options shared by commands that talk to the market-data provider.
#[derive(Debug, Clone, Args)]
pub struct EngineArgs {
    /// Exchange the ticker trades on (NSE or BSE).
    #[arg(long, env = "BETASCOPE_EXCHANGE", default_value = "NSE")]
    pub exchange: String,

    /// CSV export of the industry classification table.
    #[arg(long, env = "BETASCOPE_INDUSTRY_TABLE")]
    pub industry_table: Option<PathBuf>,

    /// Maximum number of peers to keep after ranking.
    #[arg(long)]
    pub max_peers: Option<usize>,

    /// Per-request provider timeout in milliseconds.
    #[arg(long)]
    pub timeout_ms: Option<u64>,
}

#[derive(Debug, Args)]
pub struct BetaArgs {
    /// Ticker symbol, with or without exchange suffix (e.g. TCS, TCS.NS).
    pub ticker: String,

    #[command(flatten)]
    pub engine: EngineArgs,

    /// Lookback label (1Y, 3Y, 5Y). Also sizes the window when dates are omitted.
    #[arg(long)]
    pub period: Option<String>,

    /// Window start (YYYY-MM-DD or RFC3339).
    #[arg(long, requires = "end")]
    pub start: Option<String>,

    /// Window end, exclusive (YYYY-MM-DD or RFC3339).
    #[arg(long)]
    pub end: Option<String>,

    /// Skip recording the search in the warehouse.
    #[arg(long, default_value_t = false)]
    pub no_persist: bool,
}

#[derive(Debug, Args)]
pub struct PeersArgs {
    /// Ticker symbol, with or without exchange suffix.
    pub ticker: String,

    #[command(flatten)]
    pub engine: EngineArgs,
}

#[derive(Debug, Args)]
pub struct HistoryArgs {
    /// Number of searches to list, newest first.
    #[arg(long, default_value_t = betascope_warehouse::DEFAULT_RECENT_LIMIT)]
    pub limit: usize,
}
