//! Resilience policy for remote calls.
//!
//! A [`ResiliencePolicy`] composes four guards around a zero-argument async
//! call. Executed outermost first:
//!
//! ```text
//! circuit breaker ─ fail fast while open; records the retry layer's final outcome
//!   rate limiter  ─ one permit per execution, bounded wait
//!     retry       ─ fixed backoff, transient failures only
//!       time limit ─ bounds each attempt; an elapsed attempt is a failed attempt
//!         call
//! ```
//!
//! Breaker and limiter state live in the policy, so every caller holding the
//! same `Arc<ResiliencePolicy>` shares them. One policy per downstream
//! dependency, not per user.
//!
//! Business absence is the caller's `Ok(None)` and passes straight through.
//! Every way the infrastructure can give up is its own [`ResilienceError`]
//! variant.

pub mod cache;
pub mod circuit_breaker;
pub mod rate_limiter;

use std::fmt;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub use cache::TtlCache;
pub use circuit_breaker::{CircuitBreaker, CircuitBreakerConfig, CircuitState};
pub use rate_limiter::{RateLimiter, RateLimiterConfig};

/// Classifies failures for the retry layer.
pub trait Retryable {
    fn is_retryable(&self) -> bool;
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TimeLimiterConfig {
    #[serde(with = "duration_ms")]
    pub timeout_duration: Duration,
}

impl Default for TimeLimiterConfig {
    fn default() -> Self {
        Self {
            timeout_duration: Duration::from_secs(2),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryConfig {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    #[serde(with = "duration_ms")]
    pub wait_duration: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: 3,
            wait_duration: Duration::from_secs(1),
        }
    }
}

/// Which guards a policy applies. `None` switches a guard off.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResilienceConfig {
    pub name: String,
    #[serde(default)]
    pub time_limiter: Option<TimeLimiterConfig>,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub rate_limiter: Option<RateLimiterConfig>,
    #[serde(default)]
    pub circuit_breaker: Option<CircuitBreakerConfig>,
}

impl ResilienceConfig {
    /// No guards at all.
    pub fn empty(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            time_limiter: None,
            retry: None,
            rate_limiter: None,
            circuit_breaker: None,
        }
    }

    /// 2 s time limit, 3 attempts 1 s apart, 10 permits/s with a 30 s wait,
    /// breaker at 50 % failures with a 10 s open wait.
    pub fn standard(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            time_limiter: Some(TimeLimiterConfig::default()),
            retry: Some(RetryConfig::default()),
            rate_limiter: Some(RateLimiterConfig::default()),
            circuit_breaker: Some(CircuitBreakerConfig::default()),
        }
    }

    pub fn time_limiter(mut self, config: TimeLimiterConfig) -> Self {
        self.time_limiter = Some(config);
        self
    }

    pub fn retry(mut self, config: RetryConfig) -> Self {
        self.retry = Some(config);
        self
    }

    pub fn rate_limiter(mut self, config: RateLimiterConfig) -> Self {
        self.rate_limiter = Some(config);
        self
    }

    pub fn circuit_breaker(mut self, config: CircuitBreakerConfig) -> Self {
        self.circuit_breaker = Some(config);
        self
    }
}

/// Why a single attempt failed.
#[derive(Debug, Error)]
pub enum AttemptError<E> {
    #[error("attempt timed out after {0:?}")]
    Timeout(Duration),
    #[error("{0}")]
    Call(E),
}

#[derive(Debug, Error)]
pub enum ResilienceError<E> {
    /// The call failed with an error the retry layer does not retry.
    #[error("{0}")]
    Rejected(E),

    #[error("gave up after {attempts} attempt(s): {last}")]
    Exhausted {
        attempts: u32,
        last: AttemptError<E>,
    },

    #[error("circuit breaker '{name}' is open")]
    CircuitOpen { name: String },

    #[error("rate limiter '{name}' refused a permit after {waited:?}")]
    RateLimited { name: String, waited: Duration },
}

impl<E> ResilienceError<E> {
    /// True for failures the policy itself produced, as opposed to a
    /// non-retryable error handed back from the call.
    pub fn is_infrastructure(&self) -> bool {
        !matches!(self, Self::Rejected(_))
    }
}

pub struct ResiliencePolicy {
    config: ResilienceConfig,
    breaker: Option<CircuitBreaker>,
    limiter: Option<RateLimiter>,
}

impl fmt::Debug for ResiliencePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResiliencePolicy")
            .field("config", &self.config)
            .field("circuit", &self.circuit_state())
            .finish()
    }
}

impl ResiliencePolicy {
    pub fn new(config: ResilienceConfig) -> Self {
        let breaker = config
            .circuit_breaker
            .clone()
            .map(|c| CircuitBreaker::new(config.name.clone(), c));
        let limiter = config
            .rate_limiter
            .clone()
            .map(|c| RateLimiter::new(config.name.clone(), c));
        Self {
            config,
            breaker,
            limiter,
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ResilienceConfig {
        &self.config
    }

    pub fn circuit_state(&self) -> Option<CircuitState> {
        self.breaker.as_ref().map(CircuitBreaker::state)
    }

    /// Run `call` under the policy. `call` is invoked once per attempt.
    pub async fn execute<T, E, F, Fut>(&self, mut call: F) -> Result<T, ResilienceError<E>>
    where
        E: Retryable + fmt::Display,
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        let permit = match &self.breaker {
            Some(breaker) => Some(breaker.try_acquire().map_err(|_| {
                tracing::debug!(policy = %self.config.name, "call short-circuited");
                ResilienceError::CircuitOpen {
                    name: self.config.name.clone(),
                }
            })?),
            None => None,
        };

        if let Some(limiter) = &self.limiter {
            limiter
                .acquire()
                .await
                .map_err(|refused| ResilienceError::RateLimited {
                    name: self.config.name.clone(),
                    waited: refused.waited,
                })?;
        }

        let (max_attempts, backoff) = match &self.config.retry {
            Some(retry) => (retry.max_attempts.max(1), retry.wait_duration),
            None => (1, Duration::ZERO),
        };

        let mut attempt = 1;
        loop {
            match self.attempt(&mut call).await {
                Ok(value) => {
                    if let Some(permit) = permit {
                        permit.success();
                    }
                    return Ok(value);
                }
                Err(AttemptError::Call(err)) if !err.is_retryable() => {
                    // Not an infrastructure failure; the breaker ignores it.
                    return Err(ResilienceError::Rejected(err));
                }
                Err(err) if attempt < max_attempts => {
                    tracing::warn!(
                        policy = %self.config.name,
                        attempt,
                        max_attempts,
                        error = %err,
                        "attempt failed, retrying"
                    );
                    tokio::time::sleep(backoff).await;
                    attempt += 1;
                }
                Err(err) => {
                    if let Some(permit) = permit {
                        permit.failure();
                    }
                    return Err(ResilienceError::Exhausted {
                        attempts: attempt,
                        last: err,
                    });
                }
            }
        }
    }

    async fn attempt<T, E, F, Fut>(&self, call: &mut F) -> Result<T, AttemptError<E>>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, E>>,
    {
        match &self.config.time_limiter {
            Some(limit) => match tokio::time::timeout(limit.timeout_duration, call()).await {
                Ok(result) => result.map_err(AttemptError::Call),
                Err(_) => Err(AttemptError::Timeout(limit.timeout_duration)),
            },
            None => call().await.map_err(AttemptError::Call),
        }
    }
}

/// Serde adapter: `Duration` as integer milliseconds.
pub mod duration_ms {
    use std::time::Duration;

    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(value: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(value.as_millis() as u64)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Duration, D::Error> {
        u64::deserialize(deserializer).map(Duration::from_millis)
    }
}
