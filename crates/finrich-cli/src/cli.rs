//! CLI argument definitions for finrich.
//!
//! # Commands
//!
//! | Command | Description |
//! |---------|-------------|
//! | `tickers` | Save an identifier list |
//! | `details` | Fetch company details for a list |
//! | `history` | Fetch daily bars for a list |
//! | `top` | Rank a list by a metric, keep the top K, fetch their details |
//! | `screen` | List identifiers closing below a price on one date |
//! | `merge` | Deduplicate saved detail tables into one |
//!
//! # Global Options
//!
//! | Option | Default | Description |
//! |--------|---------|-------------|
//! | `--workers` | `1` | Concurrent fetches; 1 runs sequentially with batch pauses |
//! | `--batch-size` | per command | Items between pauses |
//! | `--pause-ms` | per command | Pause length in ms |
//! | `--max-attempts` | `3` | Attempts per identifier |
//! | `--output-dir` | `.` | Where result files are written |
//! | `--log-level` | `info` | Log level for finrich targets |
//! | `--date` | today (UTC) | Run date for file names, screens and history windows |
//!
//! # Examples
//!
//! ```bash
//! finrich tickers nasdaq100
//! finrich details sp500 --workers 4
//! finrich history nasdaq100 --days 30
//! finrich history low-price --max-close 5 --limit 50
//! finrich top sp500 --k 100 --metric market_cap
//! finrich screen --date 2025-03-04 --max-close 5
//! finrich merge nasdaq100_companies_2025-03-04.csv sp100_companies_2025-03-04.csv \
//!     --policy best-metric --metric market_cap --sort-desc market_cap
//! ```

use std::num::NonZeroUsize;
use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};
use finrich_core::LowPriceThreshold;

/// Resilient batch enrichment of market identifiers.
///
/// Pulls identifier lists, enriches them from Polygon.io with retry and
/// pacing, and merges the resulting tables. Requires `POLYGON_STOCK_API` in
/// the environment or a `.env` file for every command except `merge`.
#[derive(Debug, Parser)]
#[command(name = "finrich", author, version, about = "Resilient batch enrichment of market identifiers")]
pub struct Cli {
    /// Number of concurrent fetches. 1 runs sequentially with batch pauses.
    #[arg(long, global = true)]
    pub workers: Option<usize>,

    /// Items processed between pauses (sequential) or token bucket size (concurrent).
    #[arg(long, global = true)]
    pub batch_size: Option<usize>,

    /// Pause after each batch, in milliseconds.
    #[arg(long, global = true)]
    pub pause_ms: Option<u64>,

    /// Attempts per identifier before it is dropped.
    #[arg(long, global = true)]
    pub max_attempts: Option<u32>,

    /// Directory for result files.
    #[arg(long, global = true, default_value = ".")]
    pub output_dir: PathBuf,

    /// Log level for finrich targets (trace, debug, info, warn, error).
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Run date, YYYY-MM-DD. Defaults to today in UTC.
    #[arg(long, global = true)]
    pub date: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

/// Available CLI commands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fetch an identifier list and save it as a `Symbol` table.
    Tickers(SourceArgs),
    /// Fetch company details for every identifier in a list.
    Details(SourceArgs),
    /// Fetch daily bars for every identifier in a list.
    History(HistoryArgs),
    /// Rank a list by a numeric detail field and enrich the top K.
    Top(TopArgs),
    /// List identifiers whose close on `--date` is below `--max-close`.
    Screen(ScreenArgs),
    /// Merge saved detail tables into one record per identifier.
    Merge(MergeArgs),
}

/// Where the identifier list comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum SourceKind {
    /// Nasdaq-100 constituents from the Nasdaq list API.
    Nasdaq100,
    /// S&P 500 constituents from the Wikipedia table.
    Sp500,
    /// Identifiers closing below `--max-close` on `--date`.
    LowPrice,
    /// A saved `Symbol` table given by `--tickers-file`.
    File,
}

#[derive(Debug, Clone, Args)]
pub struct SourceArgs {
    #[arg(value_enum)]
    pub source: SourceKind,

    /// Symbol table read by the `file` source.
    #[arg(long, required_if_eq("source", "file"))]
    pub tickers_file: Option<PathBuf>,

    /// Closing-price ceiling used by the `low-price` source.
    #[arg(long, default_value = "10")]
    pub max_close: LowPriceThreshold,

    /// Process only the first N identifiers of the list.
    #[arg(long)]
    pub limit: Option<NonZeroUsize>,
}

#[derive(Debug, Clone, Args)]
pub struct HistoryArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Calendar days of history ending on the run date.
    #[arg(long, default_value_t = 30)]
    pub days: u32,
}

#[derive(Debug, Clone, Args)]
pub struct TopArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    /// Number of identifiers to keep.
    #[arg(long, default_value_t = 100)]
    pub k: usize,

    /// Numeric detail field to rank by.
    #[arg(long, default_value = "market_cap")]
    pub metric: String,
}

#[derive(Debug, Clone, Args)]
pub struct ScreenArgs {
    /// Closing-price ceiling; identifiers closing strictly below it are kept.
    #[arg(long, default_value = "10")]
    pub max_close: LowPriceThreshold,
}

/// Duplicate resolution for `merge`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum PolicyKind {
    /// Keep the record from the first file that has the identifier.
    FirstSeen,
    /// Keep the record with the largest `--metric`.
    BestMetric,
}

#[derive(Debug, Clone, Args)]
pub struct MergeArgs {
    /// Detail tables in priority order.
    #[arg(required = true)]
    pub inputs: Vec<PathBuf>,

    #[arg(long, value_enum, default_value_t = PolicyKind::FirstSeen)]
    pub policy: PolicyKind,

    /// Field compared by the `best-metric` policy.
    #[arg(long, default_value = "market_cap")]
    pub metric: String,

    /// Sort the merged table by this field, largest first.
    #[arg(long, conflicts_with = "sort_asc")]
    pub sort_desc: Option<String>,

    /// Sort the merged table by this field, smallest first.
    #[arg(long)]
    pub sort_asc: Option<String>,

    /// Output path. Defaults to `merged_<date>.csv` in the output directory.
    #[arg(long)]
    pub output: Option<PathBuf>,
}
