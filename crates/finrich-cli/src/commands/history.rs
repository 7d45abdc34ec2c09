use finrich_core::{table, EnrichmentPolicy, HistoryFetcher, HistoryWindow};
use tracing::{info, warn};

use super::RunContext;
use crate::cli::HistoryArgs;
use crate::error::CliError;

pub async fn run(args: &HistoryArgs, context: &RunContext) -> Result<(), CliError> {
    let window = HistoryWindow::trailing(context.date(), args.days)?;
    let preset = EnrichmentPolicy::history_default();
    let identifiers = context.identifiers(&args.source, preset).await?;

    let engine = context.engine(preset)?;
    let fetcher = HistoryFetcher::new(context.market()?, window);
    info!(target: "finrich::cli", window = %fetcher.window(), "fetching daily history");
    let outcome = engine.run(&identifiers, &fetcher).await;
    let covered = outcome.produced();
    let dataset = outcome.into_flat_dataset();

    if dataset.is_empty() {
        warn!(target: "finrich::cli", "no history records produced; nothing saved");
        return Ok(());
    }

    let file_name =
        table::history_file_name(&context.prefix(&args.source), args.days, context.date());
    let path = context.output_path(&file_name)?;
    table::save_history(&path, dataset.records())?;

    println!(
        "saved {} daily bars for {} of {} identifiers to {}",
        dataset.len(),
        covered,
        identifiers.len(),
        path.display()
    );
    Ok(())
}
