//! Fault injection for the mock services.
//!
//! A [`FaultDirective`] rides along with a request (the `delay` / `fault`
//! headers or query parameters). The mocks hand it to [`FaultInjector::apply`]
//! before doing any work. Retrying is the caller's business, not the injector's.

use std::sync::Mutex;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use crate::error::{Result, SignupError};

/// Per-request latency / failure instruction. Never persisted.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultDirective {
    /// Milliseconds to sleep before handling the request.
    pub delay_ms: Option<u64>,
    /// Probability (0–100) that the request fails with a transient error.
    pub fail_percent: Option<u8>,
}

impl FaultDirective {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn delay(ms: u64) -> Self {
        Self {
            delay_ms: Some(ms),
            fail_percent: None,
        }
    }

    pub fn fail(percent: u8) -> Self {
        Self {
            delay_ms: None,
            fail_percent: Some(percent),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.delay_ms.is_none() && self.fail_percent.is_none()
    }

    /// Build a directive from the raw `delay` / `fault` values of a request.
    pub fn parse(delay: Option<&str>, fault: Option<&str>) -> Result<Self> {
        let delay_ms = delay
            .map(|v| {
                v.trim()
                    .parse::<u64>()
                    .map_err(|_| SignupError::InvalidInput(format!("invalid delay '{v}'")))
            })
            .transpose()?;
        let fail_percent = fault
            .map(|v| match v.trim().parse::<u8>() {
                Ok(p) if p <= 100 => Ok(p),
                _ => Err(SignupError::InvalidInput(format!(
                    "invalid fault percentage '{v}' (expected 0-100)"
                ))),
            })
            .transpose()?;
        Ok(Self {
            delay_ms,
            fail_percent,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("injected fault ({percent}% failure rate)")]
pub struct InjectedFault {
    pub percent: u8,
}

/// Applies fault directives. The random source is owned so tests can seed it.
pub struct FaultInjector {
    rng: Mutex<StdRng>,
}

impl FaultInjector {
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Sleep for the requested delay, then roll for the requested failure rate.
    pub async fn apply(&self, directive: &FaultDirective) -> std::result::Result<(), InjectedFault> {
        if let Some(ms) = directive.delay_ms {
            tracing::debug!(delay_ms = ms, "injecting latency");
            tokio::time::sleep(Duration::from_millis(ms)).await;
        }

        if let Some(percent) = directive.fail_percent {
            if self.roll() < u32::from(percent) {
                tracing::debug!(percent, "injecting failure");
                return Err(InjectedFault { percent });
            }
        }

        Ok(())
    }

    /// Uniform draw in `[0, 100)`.
    fn roll(&self) -> u32 {
        match self.rng.lock() {
            Ok(mut rng) => rng.gen_range(0..100),
            // A poisoned rng is still a usable rng.
            Err(poisoned) => poisoned.into_inner().gen_range(0..100),
        }
    }
}

impl Default for FaultInjector {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_accepts_both_fields() {
        let d = FaultDirective::parse(Some("250"), Some("30")).unwrap();
        assert_eq!(d.delay_ms, Some(250));
        assert_eq!(d.fail_percent, Some(30));
    }

    #[test]
    fn parse_absent_is_empty() {
        assert!(FaultDirective::parse(None, None).unwrap().is_empty());
    }

    #[test]
    fn parse_rejects_out_of_range_percent() {
        let err = FaultDirective::parse(None, Some("101")).unwrap_err();
        assert!(matches!(err, SignupError::InvalidInput(_)));
    }

    #[test]
    fn parse_rejects_garbage_delay() {
        let err = FaultDirective::parse(Some("soon"), None).unwrap_err();
        assert!(err.to_string().contains("invalid delay"));
    }

    #[tokio::test]
    async fn always_fails_at_100_percent() {
        let injector = FaultInjector::seeded(7);
        for _ in 0..50 {
            assert!(injector.apply(&FaultDirective::fail(100)).await.is_err());
        }
    }

    #[tokio::test]
    async fn never_fails_at_0_percent() {
        let injector = FaultInjector::seeded(7);
        for _ in 0..50 {
            assert!(injector.apply(&FaultDirective::fail(0)).await.is_ok());
        }
    }

    #[tokio::test]
    async fn partial_rate_produces_a_mix() {
        let injector = FaultInjector::seeded(42);
        let mut failures = 0;
        for _ in 0..200 {
            if injector.apply(&FaultDirective::fail(50)).await.is_err() {
                failures += 1;
            }
        }
        assert!(failures > 50 && failures < 150, "failures = {failures}");
    }

    #[tokio::test(start_paused = true)]
    async fn delay_consumes_wall_clock() {
        let injector = FaultInjector::seeded(1);
        let start = tokio::time::Instant::now();
        injector.apply(&FaultDirective::delay(1500)).await.unwrap();
        assert_eq!(start.elapsed(), Duration::from_millis(1500));
    }
}
