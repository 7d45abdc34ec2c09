use finrich_core::{table, Dataset, MergePolicy, Merger, SortOrder};
use tracing::info;

use super::RunContext;
use crate::cli::{MergeArgs, PolicyKind};
use crate::error::CliError;

pub fn run(args: &MergeArgs, context: &RunContext) -> Result<(), CliError> {
    let mut datasets = Vec::with_capacity(args.inputs.len());
    for input in &args.inputs {
        let records = table::load_details(input)?;
        info!(
            target: "finrich::cli",
            path = %input.display(),
            records = records.len(),
            "loaded detail table"
        );
        datasets.push(Dataset::new(records));
    }

    let policy = match args.policy {
        PolicyKind::FirstSeen => MergePolicy::FirstSeenWins,
        PolicyKind::BestMetric => MergePolicy::BestMetricWins {
            field: args.metric.clone(),
        },
    };
    let sort = match (&args.sort_desc, &args.sort_asc) {
        (Some(field), _) => SortOrder::Descending(field.clone()),
        (None, Some(field)) => SortOrder::Ascending(field.clone()),
        (None, None) => SortOrder::Preserve,
    };

    let merged = Merger::new(policy).with_sort(sort).merge(&datasets);

    let path = match &args.output {
        Some(path) => path.clone(),
        None => context.output_path(&table::merged_file_name(context.date()))?,
    };
    table::save_details(&path, merged.records())?;

    let total = datasets.iter().map(Dataset::len).sum::<usize>();
    println!(
        "merged {} records from {} tables into {} unique identifiers at {}",
        total,
        datasets.len(),
        merged.len(),
        path.display()
    );
    Ok(())
}
