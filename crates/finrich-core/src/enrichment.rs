//! Partial-failure-tolerant batch enrichment.
//!
//! One mechanism serves both detail snapshots (one record per identifier) and
//! time series (many records per identifier). Every identifier is fetched
//! through the [`RetryExecutor`]; one whose retries are exhausted is logged and
//! dropped, and the run continues with the next. Output keeps input order.
//!
//! Two modes share those semantics:
//!
//! | Mode | Selected by | Throttle |
//! |------|-------------|----------|
//! | sequential | `workers == 1` | [`Pacer`] sleeps after every `batch_size` items |
//! | concurrent | `workers > 1` | shared [`RateBudget`] token bucket |

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use futures::stream::{self, StreamExt};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::data_source::SourceError;
use crate::pacer::Pacer;
use crate::policy::EnrichmentPolicy;
use crate::retry::{RetryExecutor, RetryExhausted, Sleeper, TokioSleeper};
use crate::throttling::RateBudget;
use crate::{Dataset, Identifier};

/// Per-identifier fetch operation driven by the engine. Must be an idempotent read.
pub trait Fetch: Send + Sync {
    type Output: Send;

    fn fetch<'a>(
        &'a self,
        identifier: &'a Identifier,
    ) -> Pin<Box<dyn Future<Output = Result<Self::Output, SourceError>> + Send + 'a>>;
}

/// [`Fetch`] backed by a closure. Build with [`fetch_fn`].
pub struct FnFetch<F> {
    f: F,
}

/// Wraps `f` so it can be passed to [`EnrichmentEngine::run`].
pub fn fetch_fn<F, Fut, O>(f: F) -> FnFetch<F>
where
    F: Fn(Identifier) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, SourceError>> + Send + 'static,
    O: Send,
{
    FnFetch { f }
}

impl<F, Fut, O> Fetch for FnFetch<F>
where
    F: Fn(Identifier) -> Fut + Send + Sync,
    Fut: Future<Output = Result<O, SourceError>> + Send + 'static,
    O: Send,
{
    type Output = O;

    fn fetch<'a>(
        &'a self,
        identifier: &'a Identifier,
    ) -> Pin<Box<dyn Future<Output = Result<O, SourceError>> + Send + 'a>> {
        Box::pin((self.f)(identifier.clone()))
    }
}

/// An identifier dropped from the output after its retries were exhausted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EnrichmentFailure {
    pub identifier: Identifier,
    pub attempts: u32,
    pub error: SourceError,
}

/// Result of one engine run.
#[derive(Debug)]
pub struct EnrichmentOutcome<O> {
    pub requested: usize,
    /// Successful outputs in input order.
    pub items: Vec<(Identifier, O)>,
    pub failures: Vec<EnrichmentFailure>,
    /// Identifiers never attempted because the run was cancelled.
    pub skipped: usize,
}

impl<O> EnrichmentOutcome<O> {
    fn empty(requested: usize) -> Self {
        Self {
            requested,
            items: Vec::with_capacity(requested),
            failures: Vec::new(),
            skipped: 0,
        }
    }

    fn push(&mut self, identifier: &Identifier, settled: Result<O, EnrichmentFailure>) {
        match settled {
            Ok(output) => self.items.push((identifier.clone(), output)),
            Err(failure) => self.failures.push(failure),
        }
    }

    pub fn produced(&self) -> usize {
        self.items.len()
    }

    pub fn is_complete(&self) -> bool {
        self.failures.is_empty() && self.skipped == 0
    }

    pub fn identifiers(&self) -> impl Iterator<Item = &Identifier> {
        self.items.iter().map(|(identifier, _)| identifier)
    }

    pub fn into_dataset(self) -> Dataset<O> {
        self.items.into_iter().map(|(_, output)| output).collect()
    }
}

impl<R> EnrichmentOutcome<Vec<R>> {
    /// Concatenates per-identifier series, keeping input order.
    pub fn into_flat_dataset(self) -> Dataset<R> {
        self.items
            .into_iter()
            .flat_map(|(_, records)| records)
            .collect()
    }
}

/// Drives a [`Fetch`] over an identifier sequence.
#[derive(Clone)]
pub struct EnrichmentEngine {
    retry: RetryExecutor,
    pacer: Pacer,
    budget: RateBudget,
    workers: usize,
    cancel: CancellationToken,
}

impl EnrichmentEngine {
    pub fn new(policy: EnrichmentPolicy) -> Self {
        Self::with_sleeper(policy, Arc::new(TokioSleeper))
    }

    /// Engine whose retry backoff and batch pauses go through `sleeper`.
    pub fn with_sleeper(policy: EnrichmentPolicy, sleeper: Arc<dyn Sleeper>) -> Self {
        Self {
            retry: RetryExecutor::with_sleeper(policy.retry, Arc::clone(&sleeper)),
            pacer: Pacer::with_sleeper(policy.pacing, sleeper),
            budget: RateBudget::from_pacing(&policy.pacing),
            workers: policy.workers(),
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_cancellation(mut self, cancel: CancellationToken) -> Self {
        self.cancel = cancel;
        self
    }

    pub fn with_rate_budget(mut self, budget: RateBudget) -> Self {
        self.budget = budget;
        self
    }

    pub fn cancellation_token(&self) -> CancellationToken {
        self.cancel.clone()
    }

    pub fn retry(&self) -> &RetryExecutor {
        &self.retry
    }

    pub async fn run<F: Fetch>(
        &self,
        identifiers: &[Identifier],
        fetcher: &F,
    ) -> EnrichmentOutcome<F::Output> {
        let outcome = if self.workers <= 1 {
            self.run_sequential(identifiers, fetcher).await
        } else {
            self.run_concurrent(identifiers, fetcher).await
        };

        info!(
            target: "finrich::enrichment",
            requested = outcome.requested,
            produced = outcome.produced(),
            failed = outcome.failures.len(),
            skipped = outcome.skipped,
            "enrichment finished: requested {}, produced {}",
            outcome.requested,
            outcome.produced()
        );
        outcome
    }

    async fn run_sequential<F: Fetch>(
        &self,
        identifiers: &[Identifier],
        fetcher: &F,
    ) -> EnrichmentOutcome<F::Output> {
        let total = identifiers.len();
        let mut outcome = EnrichmentOutcome::empty(total);

        for (index, identifier) in identifiers.iter().enumerate() {
            if self.cancel.is_cancelled() {
                outcome.skipped = total - index;
                warn!(
                    target: "finrich::enrichment",
                    skipped = outcome.skipped,
                    "run cancelled, not issuing further fetches"
                );
                break;
            }

            info!(target: "finrich::enrichment", "fetching {}/{}: {}", index + 1, total, identifier);
            let result = self
                .retry
                .execute(identifier.as_str(), || fetcher.fetch(identifier))
                .await;
            outcome.push(identifier, settle(identifier, result));

            self.pacer.after_item(index).await;
        }

        outcome
    }

    async fn run_concurrent<F: Fetch>(
        &self,
        identifiers: &[Identifier],
        fetcher: &F,
    ) -> EnrichmentOutcome<F::Output> {
        let total = identifiers.len();

        let mut completed = stream::iter(identifiers.iter().enumerate())
            .map(|(index, identifier)| async move {
                if self.cancel.is_cancelled() {
                    return (index, identifier, None);
                }
                tokio::select! {
                    biased;
                    _ = self.cancel.cancelled() => return (index, identifier, None),
                    _ = self.budget.acquire() => {}
                }

                info!(target: "finrich::enrichment", "fetching {}/{}: {}", index + 1, total, identifier);
                // The first attempt spends the cell taken above; each retry takes its own.
                let mut prepaid = true;
                let result = self
                    .retry
                    .execute(identifier.as_str(), || {
                        let paid = std::mem::take(&mut prepaid);
                        async move {
                            if !paid {
                                self.budget.acquire().await;
                            }
                            fetcher.fetch(identifier).await
                        }
                    })
                    .await;
                (index, identifier, Some(settle(identifier, result)))
            })
            .buffer_unordered(self.workers)
            .collect::<Vec<_>>()
            .await;
        completed.sort_by_key(|(index, _, _)| *index);

        let mut outcome = EnrichmentOutcome::empty(total);
        for (_, identifier, settled) in completed {
            match settled {
                Some(settled) => outcome.push(identifier, settled),
                None => outcome.skipped += 1,
            }
        }
        if outcome.skipped > 0 {
            warn!(
                target: "finrich::enrichment",
                skipped = outcome.skipped,
                "run cancelled, not issuing further fetches"
            );
        }

        outcome
    }
}

/// Turns an exhausted retry into a failure entry, logging it on the spot.
fn settle<O>(
    identifier: &Identifier,
    result: Result<O, RetryExhausted>,
) -> Result<O, EnrichmentFailure> {
    result.map_err(|exhausted| {
        warn!(
            target: "finrich::enrichment",
            ticker = %identifier,
            attempts = exhausted.attempts,
            error = %exhausted.last_error,
            "dropping identifier after exhausted retries"
        );
        EnrichmentFailure {
            identifier: identifier.clone(),
            attempts: exhausted.attempts,
            error: exhausted.last_error,
        }
    })
}
