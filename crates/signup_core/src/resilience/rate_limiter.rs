//! Permit limiter on a `governor` GCRA bucket.
//!
//! The bucket holds `limit_for_period` permits and refills one every
//! `limit_refresh_period / limit_for_period`. A caller that finds it empty
//! sleeps until the next permit is due, for at most `timeout_duration`, and
//! is refused after that. A zero limit refuses every caller at once.
//!
//! The bucket reads tokio's clock and waits with `tokio::time::sleep`, so
//! paused-time tests drive it like every other timer in the policy.

use std::num::NonZeroU32;
use std::time::{Duration, Instant};

use governor::clock::Clock;
use governor::middleware::NoOpMiddleware;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter as Gcra};
use serde::{Deserialize, Serialize};

use super::duration_ms;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimiterConfig {
    #[serde(with = "duration_ms")]
    pub limit_refresh_period: Duration,
    #[serde(with = "duration_ms")]
    pub timeout_duration: Duration,
    pub limit_for_period: u32,
}

impl Default for RateLimiterConfig {
    fn default() -> Self {
        Self {
            limit_refresh_period: Duration::from_secs(1),
            timeout_duration: Duration::from_secs(30),
            limit_for_period: 10,
        }
    }
}

impl RateLimiterConfig {
    /// `None` when no permit can ever be handed out. A zero refresh period
    /// refills instantly, which leaves only the burst size.
    fn quota(&self) -> Option<Quota> {
        let burst = NonZeroU32::new(self.limit_for_period)?;
        let interval = self.limit_refresh_period / burst.get();
        let quota =
            Quota::with_period(interval).unwrap_or_else(|| Quota::per_second(NonZeroU32::MAX));
        Some(quota.allow_burst(burst))
    }
}

/// `governor` clock backed by `tokio::time`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioClock;

impl Clock for TokioClock {
    type Instant = Instant;

    fn now(&self) -> Instant {
        tokio::time::Instant::now().into_std()
    }
}

type Bucket = Gcra<NotKeyed, InMemoryState, TokioClock, NoOpMiddleware<Instant>>;

/// Refusal carrying how long the caller waited before giving up.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PermitTimeout {
    pub waited: Duration,
}

pub struct RateLimiter {
    name: String,
    timeout: Duration,
    bucket: Option<Bucket>,
}

impl RateLimiter {
    pub fn new(name: impl Into<String>, config: RateLimiterConfig) -> Self {
        let name = name.into();
        let bucket = config
            .quota()
            .map(|quota| Gcra::direct_with_clock(quota, &TokioClock));
        if bucket.is_none() {
            tracing::warn!(limiter = %name, "limit_for_period is 0, every call will be refused");
        }
        Self {
            name,
            timeout: config.timeout_duration,
            bucket,
        }
    }

    pub async fn acquire(&self) -> Result<(), PermitTimeout> {
        let Some(bucket) = &self.bucket else {
            return Err(PermitTimeout {
                waited: Duration::ZERO,
            });
        };

        match tokio::time::timeout(self.timeout, self.until_ready(bucket)).await {
            Ok(()) => Ok(()),
            Err(_) => {
                tracing::warn!(limiter = %self.name, waited = ?self.timeout, "no permit within timeout");
                Err(PermitTimeout {
                    waited: self.timeout,
                })
            }
        }
    }

    async fn until_ready(&self, bucket: &Bucket) {
        while let Err(not_until) = bucket.check() {
            let wait = not_until.wait_time_from(TokioClock.now());
            tracing::debug!(limiter = %self.name, ?wait, "waiting for permit");
            tokio::time::sleep(wait).await;
        }
    }
}
