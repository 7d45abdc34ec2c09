use finrich_core::{select_top_k, table, DetailsFetcher, EnrichmentPolicy};
use tracing::{info, warn};

use super::RunContext;
use crate::cli::{SourceKind, TopArgs};
use crate::error::CliError;

/// Ranks the universe, then enriches the selection. Both passes use history pacing.
pub async fn run(args: &TopArgs, context: &RunContext) -> Result<(), CliError> {
    if args.k == 0 {
        return Err(CliError::Command(String::from("--k must be greater than zero")));
    }

    let universe = context
        .identifiers(&args.source, EnrichmentPolicy::history_default())
        .await?;
    // A file source is already on disk.
    if args.source.source != SourceKind::File {
        let universe_path =
            context.output_path(&table::tickers_file_name(&context.prefix(&args.source)))?;
        table::save_identifiers(&universe_path, &universe)?;
        info!(
            target: "finrich::cli",
            count = universe.len(),
            path = %universe_path.display(),
            "saved ranking universe"
        );
    }
    let fetcher = DetailsFetcher::new(context.market()?);

    let ranking = context.engine(EnrichmentPolicy::history_default())?;
    let selected = select_top_k(&ranking, &universe, &fetcher, &args.metric, args.k).await;
    if selected.is_empty() {
        warn!(
            target: "finrich::cli",
            metric = %args.metric,
            "no identifier carried the ranking metric; nothing saved"
        );
        return Ok(());
    }

    let prefix = format!("{}_top{}", context.prefix(&args.source), args.k);
    let tickers_path = context.output_path(&table::tickers_file_name(&prefix))?;
    table::save_identifiers(&tickers_path, &selected)?;
    info!(
        target: "finrich::cli",
        selected = selected.len(),
        path = %tickers_path.display(),
        "saved top-k selection"
    );

    let enrichment = context.engine(EnrichmentPolicy::history_default())?;
    let dataset = enrichment.run(&selected, &fetcher).await.into_dataset();

    let path = context.output_path(&table::companies_file_name(&prefix, context.date()))?;
    table::save_details(&path, dataset.records())?;

    println!(
        "selected {} of {} identifiers by {}; saved {} company records to {}",
        selected.len(),
        universe.len(),
        args.metric,
        dataset.len(),
        path.display()
    );
    Ok(())
}
