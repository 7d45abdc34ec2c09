use finrich_core::{table, EnrichmentPolicy};

use super::RunContext;
use crate::cli::SourceArgs;
use crate::error::CliError;

pub async fn run(args: &SourceArgs, context: &RunContext) -> Result<(), CliError> {
    let identifiers = context
        .identifiers(args, EnrichmentPolicy::details_default())
        .await?;

    let path = context.output_path(&table::tickers_file_name(&context.prefix(args)))?;
    table::save_identifiers(&path, &identifiers)?;

    println!("saved {} identifiers to {}", identifiers.len(), path.display());
    Ok(())
}
