//! Error types for cache operations

use thiserror::Error;

/// Errors that can occur while configuring or running the cache
#[derive(Error, Debug)]
pub enum CacheError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Sweeper worker error
    #[error("Worker error: {0}")]
    Worker(String),
}
