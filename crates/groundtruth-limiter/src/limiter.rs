//! Token bucket for a single origin

use crate::LimiterError;
use governor::clock::{Clock, DefaultClock};
use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use groundtruth_domain::RateBudget;
use std::num::NonZeroU32;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::time::Instant;

/// Proof that a token was taken from the bucket
///
/// Tokens are consumed on acquire; there is nothing to release.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Permit {
    waited: Duration,
}

impl Permit {
    /// Time spent waiting for the token
    pub fn waited(&self) -> Duration {
        self.waited
    }
}

/// Snapshot of one origin's limiter counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LimiterStats {
    /// Permits handed out
    pub granted: u64,
    /// Permits that needed a bounded wait first
    pub waited: u64,
    /// Acquisitions that failed fast
    pub throttled: u64,
}

/// Token-bucket limiter bound to one external origin
///
/// State is owned by the governor limiter and mutated only through
/// [`acquire`](Self::acquire).
pub struct OriginLimiter {
    origin: String,
    budget: RateBudget,
    max_wait: Duration,
    limiter: DefaultDirectRateLimiter,
    clock: DefaultClock,
    granted: AtomicU64,
    waited: AtomicU64,
    throttled: AtomicU64,
}

impl OriginLimiter {
    /// Create a limiter for `origin` from its declared budget
    ///
    /// The bucket holds `budget.capacity` tokens and refills one token every
    /// `budget.refill_interval()`.
    pub fn new(
        origin: impl Into<String>,
        budget: RateBudget,
        max_wait: Duration,
    ) -> Result<Self, LimiterError> {
        let origin = origin.into();
        let capacity = NonZeroU32::new(budget.capacity).ok_or_else(|| LimiterError::InvalidBudget {
            origin: origin.clone(),
            reason: "capacity must be greater than 0".to_string(),
        })?;
        let quota = Quota::with_period(budget.refill_interval())
            .ok_or_else(|| LimiterError::InvalidBudget {
                origin: origin.clone(),
                reason: "refill interval must be non-zero".to_string(),
            })?
            .allow_burst(capacity);

        tracing::debug!(
            origin = %origin,
            capacity = budget.capacity,
            per = ?budget.per,
            "Rate limiter created"
        );

        Ok(Self {
            origin,
            budget,
            max_wait,
            limiter: RateLimiter::direct(quota),
            clock: DefaultClock::default(),
            granted: AtomicU64::new(0),
            waited: AtomicU64::new(0),
            throttled: AtomicU64::new(0),
        })
    }

    /// Origin this limiter guards
    pub fn origin(&self) -> &str {
        &self.origin
    }

    /// Declared budget
    pub fn budget(&self) -> RateBudget {
        self.budget
    }

    /// Bounded queue timeout
    pub fn max_wait(&self) -> Duration {
        self.max_wait
    }

    /// Take a token, waiting at most [`max_wait`](Self::max_wait)
    ///
    /// # Errors
    ///
    /// Returns [`LimiterError::Throttled`] when the next token is further away
    /// than the remaining wait budget. No token is consumed in that case.
    pub async fn acquire(&self) -> Result<Permit, LimiterError> {
        let start = Instant::now();
        let mut slept = false;

        loop {
            let not_until = match self.limiter.check() {
                Ok(()) => {
                    self.granted.fetch_add(1, Ordering::Relaxed);
                    let waited = if slept {
                        self.waited.fetch_add(1, Ordering::Relaxed);
                        start.elapsed()
                    } else {
                        Duration::ZERO
                    };
                    return Ok(Permit { waited });
                }
                Err(not_until) => not_until,
            };

            let retry_after = not_until.wait_time_from(self.clock.now());
            let elapsed = start.elapsed();
            if elapsed + retry_after > self.max_wait {
                self.throttled.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    origin = %self.origin,
                    retry_after_ms = retry_after.as_millis() as u64,
                    "Origin throttled"
                );
                return Err(LimiterError::Throttled {
                    origin: self.origin.clone(),
                    retry_after,
                });
            }

            tracing::debug!(
                origin = %self.origin,
                wait_ms = retry_after.as_millis() as u64,
                "Waiting for rate limit token"
            );
            tokio::time::sleep(retry_after).await;
            slept = true;
        }
    }

    /// Counter snapshot
    pub fn stats(&self) -> LimiterStats {
        LimiterStats {
            granted: self.granted.load(Ordering::Relaxed),
            waited: self.waited.load(Ordering::Relaxed),
            throttled: self.throttled.load(Ordering::Relaxed),
        }
    }
}

impl std::fmt::Debug for OriginLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OriginLimiter")
            .field("origin", &self.origin)
            .field("budget", &self.budget)
            .field("max_wait", &self.max_wait)
            .field("stats", &self.stats())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_zero_capacity_rejected() {
        let err = OriginLimiter::new("x", RateBudget::per_second(0), Duration::ZERO).unwrap_err();
        assert!(matches!(err, LimiterError::InvalidBudget { .. }));
    }

    #[test]
    fn test_zero_period_rejected() {
        let budget = RateBudget::new(5, Duration::ZERO);
        assert!(OriginLimiter::new("x", budget, Duration::ZERO).is_err());
    }

    #[tokio::test]
    async fn test_burst_then_throttle() {
        let limiter =
            OriginLimiter::new("edgar", RateBudget::per_minute(3), Duration::from_millis(10)).unwrap();

        for _ in 0..3 {
            let permit = limiter.acquire().await.unwrap();
            assert!(permit.waited().is_zero());
        }

        let err = limiter.acquire().await.unwrap_err();
        match err {
            LimiterError::Throttled { origin, retry_after } => {
                assert_eq!(origin, "edgar");
                assert!(retry_after > Duration::from_secs(1));
            }
            other => panic!("expected Throttled, got {other:?}"),
        }

        let stats = limiter.stats();
        assert_eq!(stats.granted, 3);
        assert_eq!(stats.throttled, 1);
        assert_eq!(stats.waited, 0);
    }

    #[tokio::test]
    async fn test_bounded_wait_succeeds() {
        // 1 token per 20ms, caller allowed to wait 200ms
        let budget = RateBudget::new(1, Duration::from_millis(20));
        let limiter = OriginLimiter::new("quotes", budget, Duration::from_millis(200)).unwrap();

        limiter.acquire().await.unwrap();
        let permit = limiter.acquire().await.unwrap();
        assert!(!permit.waited().is_zero());

        let stats = limiter.stats();
        assert_eq!(stats.granted, 2);
        assert_eq!(stats.waited, 1);
        assert_eq!(stats.throttled, 0);
    }
}
