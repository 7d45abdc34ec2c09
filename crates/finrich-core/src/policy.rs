use std::time::Duration;

use crate::pacer::PacingConfig;
use crate::retry::RetryConfig;
use crate::ValidationError;

/// How one enrichment run talks to its provider: pacing, retry and worker count.
///
/// `workers == 1` selects the sequential paced mode. Larger values run that
/// many fetches concurrently under a shared token bucket derived from `pacing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EnrichmentPolicy {
    pub pacing: PacingConfig,
    pub retry: RetryConfig,
    workers: usize,
}

impl EnrichmentPolicy {
    pub fn new(
        pacing: PacingConfig,
        retry: RetryConfig,
        workers: usize,
    ) -> Result<Self, ValidationError> {
        if workers == 0 {
            return Err(ValidationError::ZeroWorkers);
        }
        Ok(Self {
            pacing,
            retry,
            workers,
        })
    }

    pub fn details_default() -> Self {
        Self {
            pacing: PacingConfig::details(),
            retry: RetryConfig::default(),
            workers: 1,
        }
    }

    pub fn history_default() -> Self {
        Self {
            pacing: PacingConfig::history(),
            retry: RetryConfig::default(),
            workers: 1,
        }
    }

    pub const fn workers(&self) -> usize {
        self.workers
    }

    pub const fn is_sequential(&self) -> bool {
        self.workers == 1
    }

    /// Replaces the parts an operator overrode and keeps the rest of the preset.
    pub fn with_overrides(
        self,
        batch_size: Option<usize>,
        pause: Option<Duration>,
        max_attempts: Option<u32>,
        workers: Option<usize>,
    ) -> Result<Self, ValidationError> {
        let pacing = PacingConfig::new(
            batch_size.unwrap_or(self.pacing.batch_size()),
            pause.unwrap_or(self.pacing.pause()),
        )?;
        let retry = match max_attempts {
            Some(attempts) => RetryConfig::new(attempts)?.with_backoff(self.retry.backoff),
            None => self.retry,
        };
        Self::new(pacing, retry, workers.unwrap_or(self.workers))
    }
}
