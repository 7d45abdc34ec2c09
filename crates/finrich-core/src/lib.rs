//! # Finrich Core
//!
//! Resilient batch enrichment of financial instrument identifiers.
//!
//! ## Overview
//!
//! - **Identifier sources** produce an ordered, duplicate-free ticker universe
//! - **Retry executor** wraps one upstream read with bounded doubling backoff
//! - **Pacer** and **rate budget** keep a run inside provider rate limits
//! - **Enrichment engine** fetches details or daily history for every
//!   identifier and drops the ones whose retries are exhausted
//! - **Merger** collapses several datasets to one record per identifier
//!
//! ## Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`adapters`] | Nasdaq-100, wikitable and file list sources; Polygon client |
//! | [`config`] | Environment and `.env` settings |
//! | [`data_source`] | Market data trait and structured source error |
//! | [`domain`] | Identifier, records, dataset, calendar helpers |
//! | [`enrichment`] | Enrichment engine and fetch contract |
//! | [`error`] | Validation, config, table and pipeline errors |
//! | [`fetchers`] | Details and history fetch adapters |
//! | [`http_client`] | HTTP client abstraction |
//! | [`merge`] | Deduplication policies, presentation sort, top-K |
//! | [`pacer`] | Fixed-window pacing on item count |
//! | [`pipeline`] | Top-K universe selection |
//! | [`policy`] | Pacing, retry and worker presets per run kind |
//! | [`retry`] | Backoff schedule, sleeper seam, retry executor |
//! | [`screening`] | Low-price screen over grouped daily bars |
//! | [`source`] | Identifier source trait |
//! | [`table`] | CSV persistence with an explicit missing marker |
//! | [`throttling`] | Shared token bucket for concurrent runs |
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use finrich_core::{
//!     collect_identifiers, Config, DetailsFetcher, EnrichmentEngine, EnrichmentPolicy,
//!     Nasdaq100Source, PolygonClient, ReqwestHttpClient,
//! };
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::from_env()?;
//!     let http = Arc::new(ReqwestHttpClient::new());
//!     let engine = EnrichmentEngine::new(EnrichmentPolicy::details_default());
//!
//!     let tickers = collect_identifiers(&Nasdaq100Source::new(http.clone()), engine.retry()).await?;
//!     let polygon = Arc::new(PolygonClient::new(http, config.api_key()));
//!     let outcome = engine.run(&tickers, &DetailsFetcher::new(polygon)).await;
//!
//!     println!("requested {}, produced {}", outcome.requested, outcome.produced());
//!     Ok(())
//! }
//! ```
//!
//! ## Error Handling
//!
//! Per-identifier failures never escape the engine; they are reported in
//! [`EnrichmentOutcome::failures`]. Run-level failures surface as
//! [`PipelineError`]:
//!
//! ```rust
//! use finrich_core::PipelineError;
//!
//! fn exit_code(error: &PipelineError) -> u8 {
//!     match error {
//!         PipelineError::Config(_) => 3,
//!         PipelineError::NoIdentifiers { .. } => 4,
//!         PipelineError::Table(_) => 10,
//!         PipelineError::Validation(_) => 2,
//!     }
//! }
//! ```
//!
//! ## Security
//!
//! - The API key is read from the environment or `.env` only and never logged
//! - `Debug` output of [`Config`] and [`HttpAuth`] redacts credentials

pub mod adapters;
pub mod config;
pub mod data_source;
pub mod domain;
pub mod enrichment;
pub mod error;
pub mod fetchers;
pub mod http_client;
pub mod merge;
pub mod pacer;
pub mod pipeline;
pub mod policy;
pub mod retry;
pub mod screening;
pub mod source;
pub mod table;
pub mod throttling;

// Identifier sources and provider client
pub use adapters::{
    decode_ticker_details, parse_nasdaq_rows, parse_wikitable, CsvListSource, Nasdaq100Source,
    PolygonClient, TickerDetailsPayload, WikitableSource, NASDAQ100_URL, POLYGON_BASE_URL,
    SP500_WIKITABLE_URL,
};

// Configuration
pub use config::{Config, API_KEY_VAR};

// Market data trait and errors
pub use data_source::{MarketDataSource, SourceError, SourceErrorKind};

// Domain models
pub use domain::{
    date_from_unix_millis, detail_field_kind, format_date, parse_date, today_utc,
    unique_identifiers, Dataset, EnrichmentRecord, FieldKind, FieldValue, HistoryRecord,
    HistoryWindow, Identifier, DETAIL_SCHEMA, IDENTIFIER_FIELD,
};

// Engine
pub use enrichment::{
    fetch_fn, EnrichmentEngine, EnrichmentFailure, EnrichmentOutcome, Fetch, FnFetch,
};
pub use fetchers::{DetailsFetcher, HistoryFetcher};

// Error types
pub use error::{ConfigError, PipelineError, TableError, ValidationError};

// HTTP client types
pub use http_client::{HttpAuth, HttpClient, HttpError, HttpRequest, HttpResponse, ReqwestHttpClient};

// Merge
pub use merge::{sort_records, top_k_by_metric, Keyed, MergePolicy, Merger, SortOrder};

// Pacing, retry and throttling
pub use pacer::{Pacer, PacingConfig};
pub use policy::EnrichmentPolicy;
pub use retry::{
    Backoff, RecordingSleeper, RetryConfig, RetryExecutor, RetryExhausted, Sleeper, TokioSleeper,
};
pub use throttling::RateBudget;

// Pipelines
pub use pipeline::select_top_k;
pub use screening::{low_price_snapshot, screen_low_price, LowPriceSource, LowPriceThreshold};
pub use source::{collect_identifiers, limit_identifiers, IdentifierSource};
