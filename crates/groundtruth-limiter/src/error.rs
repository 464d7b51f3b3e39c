//! Error types for rate limiting

use std::time::Duration;
use thiserror::Error;

/// Errors returned by the limiter
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LimiterError {
    /// No token within the bounded wait; the origin must not be called
    #[error("Throttled: origin '{origin}' has no capacity for {retry_after:?}")]
    Throttled {
        /// Origin that was throttled
        origin: String,
        /// Time until the next token would have been available
        retry_after: Duration,
    },

    /// Budget cannot be expressed as a token bucket
    #[error("Invalid rate budget for origin '{origin}': {reason}")]
    InvalidBudget {
        /// Origin the budget was declared for
        origin: String,
        /// What is wrong with it
        reason: String,
    },

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl LimiterError {
    /// Whether this is a throttling outcome (as opposed to a setup error)
    pub fn is_throttled(&self) -> bool {
        matches!(self, LimiterError::Throttled { .. })
    }
}
