mod details;
mod history;
mod merge;
mod screen;
#[cfg(test)]
mod test_support;
mod tickers;
mod top;

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use finrich_core::{
    collect_identifiers, limit_identifiers, parse_date, today_utc, Config, CsvListSource,
    EnrichmentEngine, EnrichmentPolicy, HttpClient, Identifier, IdentifierSource, LowPriceSource,
    MarketDataSource, Nasdaq100Source, PolygonClient, ReqwestHttpClient, WikitableSource,
};
use time::Date;
use tokio_util::sync::CancellationToken;

use crate::cli::{Cli, Command, SourceArgs, SourceKind};
use crate::error::CliError;

/// Everything a command needs, resolved once from the command line and environment.
pub struct RunContext {
    config: Option<Config>,
    http: Arc<dyn HttpClient>,
    overrides: PolicyOverrides,
    output_dir: PathBuf,
    date: Date,
    cancel: CancellationToken,
}

struct PolicyOverrides {
    batch_size: Option<usize>,
    pause: Option<Duration>,
    max_attempts: Option<u32>,
    workers: Option<usize>,
}

pub async fn run(cli: &Cli, cancel: CancellationToken) -> Result<(), CliError> {
    let date = match &cli.date {
        Some(raw) => parse_date(raw)?,
        None => today_utc(),
    };

    // The credential is checked before any network activity.
    let config = match cli.command {
        Command::Merge(_) => None,
        _ => Some(Config::from_env()?),
    };
    let http: Arc<dyn HttpClient> = Arc::new(ReqwestHttpClient::new());

    let context = RunContext {
        config,
        http,
        overrides: PolicyOverrides {
            batch_size: cli.batch_size,
            pause: cli.pause_ms.map(Duration::from_millis),
            max_attempts: cli.max_attempts,
            workers: cli.workers,
        },
        output_dir: cli.output_dir.clone(),
        date,
        cancel,
    };

    match &cli.command {
        Command::Tickers(args) => tickers::run(args, &context).await,
        Command::Details(args) => details::run(args, &context).await,
        Command::History(args) => history::run(args, &context).await,
        Command::Top(args) => top::run(args, &context).await,
        Command::Screen(args) => screen::run(args, &context).await,
        Command::Merge(args) => merge::run(args, &context),
    }
}

impl RunContext {
    pub fn date(&self) -> Date {
        self.date
    }

    fn config(&self) -> Result<&Config, CliError> {
        self.config
            .as_ref()
            .ok_or_else(|| CliError::Command(String::from("configuration was not loaded")))
    }

    /// Engine for one run kind with the operator's overrides applied.
    pub fn engine(&self, preset: EnrichmentPolicy) -> Result<EnrichmentEngine, CliError> {
        let policy = preset.with_overrides(
            self.overrides.batch_size,
            self.overrides.pause,
            self.overrides.max_attempts,
            self.overrides.workers,
        )?;
        Ok(EnrichmentEngine::new(policy).with_cancellation(self.cancel.clone()))
    }

    pub fn market(&self) -> Result<Arc<dyn MarketDataSource>, CliError> {
        let config = self.config()?;
        Ok(Arc::new(
            PolygonClient::new(Arc::clone(&self.http), config.api_key())
                .with_base_url(config.polygon_base_url.as_str())
                .with_timeout_ms(config.http_timeout_ms),
        ))
    }

    fn identifier_source(&self, args: &SourceArgs) -> Result<Box<dyn IdentifierSource>, CliError> {
        let config = self.config()?;
        let http = Arc::clone(&self.http);

        let source: Box<dyn IdentifierSource> = match args.source {
            SourceKind::Nasdaq100 => Box::new(
                Nasdaq100Source::with_url(http, config.nasdaq100_url.as_str())
                    .with_timeout_ms(config.http_timeout_ms),
            ),
            SourceKind::Sp500 => Box::new(
                WikitableSource::new(http, "sp500", config.sp500_url.as_str())
                    .with_timeout_ms(config.http_timeout_ms),
            ),
            SourceKind::LowPrice => Box::new(LowPriceSource::new(
                self.market()?,
                self.date,
                args.max_close,
            )),
            SourceKind::File => {
                let path = args.tickers_file.clone().ok_or_else(|| {
                    CliError::Command(String::from("the file source requires --tickers-file"))
                })?;
                Box::new(CsvListSource::new(path))
            }
        };
        Ok(source)
    }

    /// Loads the identifier list, retrying the list fetch like any other read,
    /// and applies `--limit`.
    pub async fn identifiers(
        &self,
        args: &SourceArgs,
        preset: EnrichmentPolicy,
    ) -> Result<Vec<Identifier>, CliError> {
        let source = self.identifier_source(args)?;
        let engine = self.engine(preset)?;
        let identifiers = collect_identifiers(source.as_ref(), engine.retry()).await?;
        Ok(limit_identifiers(identifiers, args.limit))
    }

    /// File name prefix describing where a list came from.
    pub fn prefix(&self, args: &SourceArgs) -> String {
        match args.source {
            SourceKind::Nasdaq100 => String::from("nasdaq100"),
            SourceKind::Sp500 => String::from("sp500"),
            SourceKind::LowPrice => String::from("low_price"),
            SourceKind::File => args
                .tickers_file
                .as_deref()
                .and_then(Path::file_stem)
                .and_then(|stem| stem.to_str())
                .map(|stem| stem.trim_end_matches("_tickers").to_owned())
                .filter(|stem| !stem.is_empty())
                .unwrap_or_else(|| String::from("custom")),
        }
    }

    /// Path under the output directory, creating the directory on first use.
    pub fn output_path(&self, file_name: &str) -> Result<PathBuf, CliError> {
        std::fs::create_dir_all(&self.output_dir)?;
        Ok(self.output_dir.join(file_name))
    }
}
