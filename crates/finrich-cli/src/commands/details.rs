use finrich_core::{table, DetailsFetcher, EnrichmentPolicy};
use tracing::warn;

use super::RunContext;
use crate::cli::SourceArgs;
use crate::error::CliError;

pub async fn run(args: &SourceArgs, context: &RunContext) -> Result<(), CliError> {
    let preset = EnrichmentPolicy::details_default();
    let identifiers = context.identifiers(args, preset).await?;

    let engine = context.engine(preset)?;
    let fetcher = DetailsFetcher::new(context.market()?);
    let dataset = engine.run(&identifiers, &fetcher).await.into_dataset();

    if dataset.is_empty() {
        warn!(target: "finrich::cli", "no detail records produced; nothing saved");
        return Ok(());
    }

    let file_name = table::companies_file_name(&context.prefix(args), context.date());
    let path = context.output_path(&file_name)?;
    table::save_details(&path, dataset.records())?;

    println!(
        "saved {} of {} company records to {}",
        dataset.len(),
        identifiers.len(),
        path.display()
    );
    Ok(())
}
