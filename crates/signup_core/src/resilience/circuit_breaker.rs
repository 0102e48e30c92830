//! Count-based circuit breaker.
//!
//! Closed → Open when the failure rate over the last `sliding_window_size`
//! recorded calls reaches `failure_rate_threshold` (once at least
//! `minimum_number_of_calls` are recorded). Open → HalfOpen after
//! `wait_duration_in_open_state`. HalfOpen admits
//! `permitted_calls_in_half_open_state` probes and then closes or reopens
//! based on their failure rate.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;

use super::duration_ms;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CircuitBreakerConfig {
    /// Percentage (0–100).
    pub failure_rate_threshold: f32,
    #[serde(with = "duration_ms")]
    pub wait_duration_in_open_state: Duration,
    pub sliding_window_size: usize,
    pub minimum_number_of_calls: usize,
    pub permitted_calls_in_half_open_state: usize,
}

impl Default for CircuitBreakerConfig {
    fn default() -> Self {
        Self {
            failure_rate_threshold: 50.0,
            wait_duration_in_open_state: Duration::from_secs(10),
            sliding_window_size: 100,
            minimum_number_of_calls: 10,
            permitted_calls_in_half_open_state: 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CircuitState {
    Closed,
    Open,
    HalfOpen,
}

impl CircuitState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Closed => "closed",
            Self::Open => "open",
            Self::HalfOpen => "half_open",
        }
    }
}

impl fmt::Display for CircuitState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug)]
enum Phase {
    Closed {
        window: VecDeque<bool>,
    },
    Open {
        until: Instant,
    },
    HalfOpen {
        admitted: usize,
        outcomes: Vec<bool>,
    },
}

/// Rejection returned while the breaker is open (or half-open and saturated).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallNotPermitted;

pub struct CircuitBreaker {
    name: String,
    config: CircuitBreakerConfig,
    phase: Mutex<Phase>,
}

impl CircuitBreaker {
    pub fn new(name: impl Into<String>, config: CircuitBreakerConfig) -> Self {
        Self {
            name: name.into(),
            config,
            phase: Mutex::new(Phase::Closed {
                window: VecDeque::new(),
            }),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn state(&self) -> CircuitState {
        let mut phase = self.lock();
        self.advance(&mut phase);
        match *phase {
            Phase::Closed { .. } => CircuitState::Closed,
            Phase::Open { .. } => CircuitState::Open,
            Phase::HalfOpen { .. } => CircuitState::HalfOpen,
        }
    }

    /// Ask to run one call. The returned permit must be resolved with
    /// [`CallPermit::success`] or [`CallPermit::failure`]; dropping it
    /// unresolved releases the slot without recording anything.
    pub fn try_acquire(&self) -> Result<CallPermit<'_>, CallNotPermitted> {
        let mut phase = self.lock();
        self.advance(&mut phase);
        match &mut *phase {
            Phase::Closed { .. } => {}
            Phase::Open { .. } => return Err(CallNotPermitted),
            Phase::HalfOpen { admitted, .. } => {
                if *admitted >= self.config.permitted_calls_in_half_open_state {
                    return Err(CallNotPermitted);
                }
                *admitted += 1;
            }
        }
        Ok(CallPermit {
            breaker: self,
            resolved: false,
        })
    }

    fn lock(&self) -> MutexGuard<'_, Phase> {
        // Phase transitions never panic midway; a poisoned lock holds valid state.
        self.phase.lock().unwrap_or_else(|p| p.into_inner())
    }

    /// Open → HalfOpen once the wait has elapsed.
    fn advance(&self, phase: &mut Phase) {
        if let Phase::Open { until } = phase {
            if Instant::now() >= *until {
                tracing::debug!(breaker = %self.name, "circuit half-open");
                *phase = Phase::HalfOpen {
                    admitted: 0,
                    outcomes: Vec::new(),
                };
            }
        }
    }

    fn record(&self, success: bool) {
        let mut phase = self.lock();
        let next = match &mut *phase {
            Phase::Closed { window } => {
                window.push_back(success);
                while window.len() > self.config.sliding_window_size {
                    window.pop_front();
                }
                if window.len() >= self.config.minimum_number_of_calls
                    && failure_rate(window.iter()) >= self.config.failure_rate_threshold
                {
                    Some(self.open_phase())
                } else {
                    None
                }
            }
            Phase::HalfOpen { outcomes, .. } => {
                outcomes.push(success);
                if outcomes.len() >= self.config.permitted_calls_in_half_open_state {
                    if failure_rate(outcomes.iter()) >= self.config.failure_rate_threshold {
                        Some(self.open_phase())
                    } else {
                        tracing::info!(breaker = %self.name, "circuit closed");
                        Some(Phase::Closed {
                            window: VecDeque::new(),
                        })
                    }
                } else {
                    None
                }
            }
            // A call admitted before the breaker opened; its outcome is stale.
            Phase::Open { .. } => None,
        };
        if let Some(next) = next {
            *phase = next;
        }
    }

    fn release(&self) {
        let mut phase = self.lock();
        if let Phase::HalfOpen { admitted, .. } = &mut *phase {
            *admitted = admitted.saturating_sub(1);
        }
    }

    fn open_phase(&self) -> Phase {
        tracing::warn!(
            breaker = %self.name,
            wait = ?self.config.wait_duration_in_open_state,
            "circuit opened"
        );
        Phase::Open {
            until: Instant::now() + self.config.wait_duration_in_open_state,
        }
    }
}

fn failure_rate<'a>(outcomes: impl ExactSizeIterator<Item = &'a bool>) -> f32 {
    let total = outcomes.len();
    if total == 0 {
        return 0.0;
    }
    let failures = outcomes.filter(|ok| !**ok).count();
    failures as f32 * 100.0 / total as f32
}

/// One admitted call.
pub struct CallPermit<'a> {
    breaker: &'a CircuitBreaker,
    resolved: bool,
}

impl CallPermit<'_> {
    pub fn success(mut self) {
        self.resolved = true;
        self.breaker.record(true);
    }

    pub fn failure(mut self) {
        self.resolved = true;
        self.breaker.record(false);
    }
}

impl Drop for CallPermit<'_> {
    fn drop(&mut self) {
        if !self.resolved {
            self.breaker.release();
        }
    }
}
