//! Configuration for the rate limiter

use crate::LimiterError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Limiter configuration
///
/// Bucket sizes come from each module's declared budget (optionally
/// overridden in the engine config); this struct only holds the bounded
/// queue timeout shared by every origin.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LimiterConfig {
    /// Longest a caller may wait for a token before failing fast (ms)
    /// Default: 250
    pub max_wait_ms: u64,
}

impl Default for LimiterConfig {
    fn default() -> Self {
        Self { max_wait_ms: 250 }
    }
}

impl LimiterConfig {
    /// Never wait: throttle as soon as the bucket is empty
    pub fn aggressive() -> Self {
        Self { max_wait_ms: 0 }
    }

    /// Wait up to one second for a token
    pub fn lenient() -> Self {
        Self { max_wait_ms: 1_000 }
    }

    /// Get max wait as Duration
    pub fn max_wait(&self) -> Duration {
        Duration::from_millis(self.max_wait_ms)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<(), LimiterError> {
        // 10 minutes is already far beyond any sane request deadline
        if self.max_wait_ms > 600_000 {
            return Err(LimiterError::Config(format!(
                "max_wait_ms must be at most 600000, got {}",
                self.max_wait_ms
            )));
        }
        Ok(())
    }
}
