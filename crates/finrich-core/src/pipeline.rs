use tracing::info;

use crate::enrichment::{EnrichmentEngine, Fetch};
use crate::merge::top_k_by_metric;
use crate::{EnrichmentRecord, Identifier};

/// Ranks a universe by `field` and returns the `k` largest identifiers.
///
/// Detail records are fetched for every identifier in `universe` through the
/// engine; records lacking the metric are discarded before ranking. This is
/// how an index approximation such as "S&P 100 = top 100 of the S&P 500 by
/// market cap" is derived.
pub async fn select_top_k<F>(
    engine: &EnrichmentEngine,
    universe: &[Identifier],
    fetcher: &F,
    field: &str,
    k: usize,
) -> Vec<Identifier>
where
    F: Fetch<Output = EnrichmentRecord>,
{
    let dataset = engine.run(universe, fetcher).await.into_dataset();
    let selected = top_k_by_metric(dataset.records(), field, k);

    info!(
        target: "finrich::pipeline",
        universe = universe.len(),
        ranked = dataset.iter().filter(|record| record.metric(field).is_some()).count(),
        selected = selected.len(),
        field,
        "top-k selection complete"
    );
    selected
}
