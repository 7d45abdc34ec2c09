use std::future::Future;
use std::num::NonZeroUsize;
use std::pin::Pin;

use tracing::info;

use crate::data_source::SourceError;
use crate::retry::RetryExecutor;
use crate::{Identifier, PipelineError};

/// Produces the ordered, duplicate-free identifier universe of one run.
///
/// Implementations differ only in where the list lives and how its shape is
/// parsed. A response whose shape is not recognized yields an empty list; a
/// transport failure is returned as an error so the caller can retry it.
pub trait IdentifierSource: Send + Sync {
    fn name(&self) -> &str;

    fn fetch_identifiers<'a>(
        &'a self,
    ) -> Pin<Box<dyn Future<Output = Result<Vec<Identifier>, SourceError>> + Send + 'a>>;
}

/// Fetches the identifier list through the retry executor.
///
/// An empty list, whether from exhausted retries or an unrecognized response
/// shape, is fatal to the run and reported as [`PipelineError::NoIdentifiers`].
pub async fn collect_identifiers(
    source: &dyn IdentifierSource,
    retry: &RetryExecutor,
) -> Result<Vec<Identifier>, PipelineError> {
    let identifiers = retry
        .execute(source.name(), || source.fetch_identifiers())
        .await
        .map_err(|exhausted| PipelineError::NoIdentifiers {
            source_name: source.name().to_owned(),
            reason: exhausted.to_string(),
        })?;

    if identifiers.is_empty() {
        return Err(PipelineError::NoIdentifiers {
            source_name: source.name().to_owned(),
            reason: String::from("response contained no usable identifiers"),
        });
    }

    info!(
        target: "finrich::source",
        source = source.name(),
        count = identifiers.len(),
        "identifier list loaded"
    );
    Ok(identifiers)
}

/// Keeps the first `limit` identifiers, or all of them without a limit.
pub fn limit_identifiers(
    mut identifiers: Vec<Identifier>,
    limit: Option<NonZeroUsize>,
) -> Vec<Identifier> {
    if let Some(limit) = limit {
        if identifiers.len() > limit.get() {
            info!(
                target: "finrich::source",
                available = identifiers.len(),
                limit = limit.get(),
                "processing only the first identifiers of the list"
            );
            identifiers.truncate(limit.get());
        }
    }
    identifiers
}
