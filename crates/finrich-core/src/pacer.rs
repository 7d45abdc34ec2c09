//! Fixed-window pacing on item count.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::retry::{Sleeper, TokioSleeper};
use crate::ValidationError;

/// Pause `pause` after every `batch_size` processed items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacingConfig {
    batch_size: usize,
    pause: Duration,
}

impl PacingConfig {
    pub fn new(batch_size: usize, pause: Duration) -> Result<Self, ValidationError> {
        if batch_size == 0 {
            return Err(ValidationError::ZeroBatchSize);
        }
        Ok(Self { batch_size, pause })
    }

    /// Company detail snapshots: 10 items, then 2 s.
    pub fn details() -> Self {
        Self {
            batch_size: 10,
            pause: Duration::from_secs(2),
        }
    }

    /// Daily history and market-cap ranking: 5 items, then 1 s.
    pub fn history() -> Self {
        Self {
            batch_size: 5,
            pause: Duration::from_secs(1),
        }
    }

    pub const fn batch_size(&self) -> usize {
        self.batch_size
    }

    pub const fn pause(&self) -> Duration {
        self.pause
    }

    /// True exactly when `index % batch_size == batch_size - 1`.
    pub const fn should_pause(&self, index: usize) -> bool {
        index % self.batch_size == self.batch_size - 1
    }
}

/// Applies a [`PacingConfig`] through an injectable sleeper.
#[derive(Clone)]
pub struct Pacer {
    config: PacingConfig,
    sleeper: Arc<dyn Sleeper>,
}

impl Pacer {
    pub fn new(config: PacingConfig) -> Self {
        Self::with_sleeper(config, Arc::new(TokioSleeper))
    }

    pub fn with_sleeper(config: PacingConfig, sleeper: Arc<dyn Sleeper>) -> Self {
        Self { config, sleeper }
    }

    pub fn config(&self) -> &PacingConfig {
        &self.config
    }

    /// Called after item `index` (0-based) completes. Returns whether it paused.
    pub async fn after_item(&self, index: usize) -> bool {
        if !self.config.should_pause(index) {
            return false;
        }

        debug!(
            target: "finrich::pacer",
            index,
            pause_ms = self.config.pause.as_millis() as u64,
            "batch boundary reached, pausing"
        );
        self.sleeper.sleep(self.config.pause).await;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RecordingSleeper;

    #[test]
    fn batch_of_five_fires_on_every_fifth_index_only() {
        let config = PacingConfig::history();
        let fired = (0..20)
            .filter(|index| config.should_pause(*index))
            .collect::<Vec<_>>();
        assert_eq!(fired, vec![4, 9, 14, 19]);
    }

    #[test]
    fn batch_of_one_fires_after_every_item() {
        let config = PacingConfig::new(1, Duration::from_millis(10)).expect("valid");
        assert!((0..5).all(|index| config.should_pause(index)));
    }

    #[test]
    fn zero_batch_size_is_rejected() {
        assert_eq!(
            PacingConfig::new(0, Duration::from_secs(1)),
            Err(ValidationError::ZeroBatchSize)
        );
    }

    #[tokio::test]
    async fn pacer_sleeps_only_at_batch_boundaries() {
        let sleeper = Arc::new(RecordingSleeper::new());
        let pacer = Pacer::with_sleeper(PacingConfig::details(), sleeper.clone());

        let mut paused = Vec::new();
        for index in 0..25 {
            if pacer.after_item(index).await {
                paused.push(index);
            }
        }

        assert_eq!(paused, vec![9, 19]);
        assert_eq!(sleeper.recorded(), vec![Duration::from_secs(2); 2]);
    }
}
