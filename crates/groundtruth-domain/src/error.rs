//! Error types shared across the engine

use thiserror::Error;

/// Errors raised while constructing domain values
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DomainError {
    /// Confidence outside `[0, 1]`
    #[error("Invalid confidence: {0} (must be in [0, 1])")]
    InvalidConfidence(f64),

    /// Range whose low bound exceeds its high bound
    #[error("Invalid range: low {low} exceeds high {high}")]
    InvalidRange {
        /// Lower bound
        low: f64,
        /// Upper bound
        high: f64,
    },

    /// Malformed metric request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Errors a source module may return from `query`
///
/// All variants are recoverable by falling back; the Truth Layer records
/// them in the resolution trace and treats the module as abstaining.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ModuleError {
    /// Origin has no data for this identifier/metric
    #[error("Not found")]
    NotFound,

    /// Transient failure, safe to fall back
    #[error("Unavailable: {0}")]
    Unavailable(String),

    /// Origin returned unparseable data
    #[error("Malformed payload: {0}")]
    Malformed(String),

    /// Origin itself signaled throttling
    #[error("Rate limited by origin")]
    RateLimited,
}

impl ModuleError {
    /// Short machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            ModuleError::NotFound => "not_found",
            ModuleError::Unavailable(_) => "unavailable",
            ModuleError::Malformed(_) => "malformed",
            ModuleError::RateLimited => "rate_limited",
        }
    }

    /// Whether a retry might succeed
    ///
    /// `Malformed` is treated like `Unavailable` for fallback, but retrying
    /// the same origin would return the same bytes.
    pub fn is_transient(&self) -> bool {
        matches!(self, ModuleError::Unavailable(_))
    }
}
