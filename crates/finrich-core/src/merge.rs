//! Multi-dataset deduplication.
//!
//! Datasets are read in priority order. The output holds exactly one record
//! per identifier seen anywhere in the input, positioned where that
//! identifier first appeared. An optional presentation sort runs after
//! deduplication and never changes which record was kept.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::{Dataset, EnrichmentRecord, Identifier};

/// Record that can be deduplicated by identifier and ranked by a numeric field.
pub trait Keyed {
    fn key(&self) -> &Identifier;

    /// Finite numeric value of `field`, or `None` when absent or not numeric.
    fn metric(&self, field: &str) -> Option<f64>;
}

impl Keyed for EnrichmentRecord {
    fn key(&self) -> &Identifier {
        self.ticker()
    }

    fn metric(&self, field: &str) -> Option<f64> {
        EnrichmentRecord::metric(self, field)
    }
}

/// Which record survives when an identifier appears more than once.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MergePolicy {
    /// The first record in priority order.
    FirstSeenWins,
    /// The record with the largest `field`; the earliest wins a tie. Records
    /// without the field never win a comparison, and an identifier none of
    /// whose records carries the field keeps its first-seen record.
    BestMetricWins { field: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SortOrder {
    #[default]
    Preserve,
    Descending(String),
    Ascending(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merger {
    policy: MergePolicy,
    sort: SortOrder,
}

impl Merger {
    pub fn new(policy: MergePolicy) -> Self {
        Self {
            policy,
            sort: SortOrder::Preserve,
        }
    }

    pub fn with_sort(mut self, sort: SortOrder) -> Self {
        self.sort = sort;
        self
    }

    pub fn merge<R: Keyed + Clone>(&self, datasets: &[Dataset<R>]) -> Dataset<R> {
        let mut order: Vec<Identifier> = Vec::new();
        let mut kept: HashMap<Identifier, (R, Option<f64>)> = HashMap::new();

        for record in datasets.iter().flat_map(Dataset::iter) {
            let metric = match &self.policy {
                MergePolicy::FirstSeenWins => None,
                MergePolicy::BestMetricWins { field } => record.metric(field),
            };

            match kept.get_mut(record.key()) {
                None => {
                    order.push(record.key().clone());
                    kept.insert(record.key().clone(), (record.clone(), metric));
                }
                Some(current) => {
                    if let MergePolicy::BestMetricWins { .. } = self.policy {
                        let better = match (metric, current.1) {
                            (Some(candidate), Some(best)) => candidate > best,
                            (Some(_), None) => true,
                            (None, _) => false,
                        };
                        if better {
                            *current = (record.clone(), metric);
                        }
                    }
                }
            }
        }

        let mut merged = order
            .iter()
            .filter_map(|identifier| kept.remove(identifier).map(|(record, _)| record))
            .collect::<Vec<_>>();
        sort_records(&mut merged, &self.sort);
        Dataset::new(merged)
    }
}

/// Stable sort by a metric; records without it go last in either direction.
pub fn sort_records<R: Keyed>(records: &mut [R], order: &SortOrder) {
    let (field, descending) = match order {
        SortOrder::Preserve => return,
        SortOrder::Descending(field) => (field, true),
        SortOrder::Ascending(field) => (field, false),
    };

    records.sort_by(|left, right| {
        compare_metrics(left.metric(field), right.metric(field), descending)
    });
}

fn compare_metrics(left: Option<f64>, right: Option<f64>, descending: bool) -> Ordering {
    match (left, right) {
        (Some(left), Some(right)) if descending => right.total_cmp(&left),
        (Some(left), Some(right)) => left.total_cmp(&right),
        (Some(_), None) => Ordering::Less,
        (None, Some(_)) => Ordering::Greater,
        (None, None) => Ordering::Equal,
    }
}

/// Identifiers of the `k` records with the largest `field`, largest first.
/// Records lacking the field are discarded; ties keep input order.
pub fn top_k_by_metric<R: Keyed>(records: &[R], field: &str, k: usize) -> Vec<Identifier> {
    let mut ranked = records
        .iter()
        .filter_map(|record| record.metric(field).map(|value| (record.key(), value)))
        .collect::<Vec<_>>();
    ranked.sort_by(|left, right| right.1.total_cmp(&left.1));

    ranked
        .into_iter()
        .take(k)
        .map(|(identifier, _)| identifier.clone())
        .collect()
}
