use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use governor::clock::DefaultClock;
use governor::state::direct::NotKeyed;
use governor::state::InMemoryState;
use governor::{Quota, RateLimiter};

use crate::pacer::PacingConfig;

type DirectRateLimiter = RateLimiter<NotKeyed, InMemoryState, DefaultClock>;

/// Token bucket shared by every worker of one enrichment run.
///
/// A `(batch_size, pause)` pacing pair becomes a bucket of `batch_size` cells
/// refilled at `batch_size / pause`. A zero pause means no limit.
#[derive(Clone)]
pub struct RateBudget {
    limiter: Option<Arc<DirectRateLimiter>>,
}

impl RateBudget {
    pub fn new(quota_window: Duration, quota_limit: u32) -> Self {
        Self {
            limiter: quota_from_window(quota_window, quota_limit)
                .map(|quota| Arc::new(RateLimiter::direct(quota))),
        }
    }

    pub fn unlimited() -> Self {
        Self { limiter: None }
    }

    pub fn from_pacing(pacing: &PacingConfig) -> Self {
        let limit = u32::try_from(pacing.batch_size()).unwrap_or(u32::MAX);
        Self::new(pacing.pause(), limit)
    }

    pub fn is_limited(&self) -> bool {
        self.limiter.is_some()
    }

    /// Takes one cell if available without waiting.
    pub fn try_acquire(&self) -> bool {
        match &self.limiter {
            Some(limiter) => limiter.check().is_ok(),
            None => true,
        }
    }

    /// Waits until one cell is available.
    pub async fn acquire(&self) {
        if let Some(limiter) = &self.limiter {
            limiter.until_ready().await;
        }
    }
}

fn quota_from_window(quota_window: Duration, quota_limit: u32) -> Option<Quota> {
    if quota_window.is_zero() {
        return None;
    }

    let burst = NonZeroU32::new(quota_limit).unwrap_or(NonZeroU32::MIN);
    let seconds_per_cell = (quota_window.as_secs_f64() / f64::from(burst.get())).max(0.001);

    Quota::with_period(Duration::from_secs_f64(seconds_per_cell))
        .map(|quota| quota.allow_burst(burst))
}
