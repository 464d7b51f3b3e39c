//! Error types for the Truth Layer

use crate::ConfigError;
use groundtruth_domain::DomainError;
use std::time::Duration;
use thiserror::Error;

/// Errors that end a resolution (or prevent the engine from starting)
///
/// Module failures are never reported here; they are absorbed into the
/// resolution trace.
#[derive(Error, Debug)]
pub enum EngineError {
    /// The request-level deadline elapsed
    #[error("Request timed out after {0:?}")]
    RequestTimeout(Duration),

    /// The caller cancelled the request
    #[error("Request cancelled")]
    Cancelled,

    /// The request cannot be answered as posed
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// No source modules were registered
    #[error("No source modules registered")]
    NoModules,

    /// A module could not be registered
    #[error("Module registration failed: {0}")]
    Registration(String),

    /// Configuration error
    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl EngineError {
    /// Short machine-readable kind
    pub fn kind(&self) -> &'static str {
        match self {
            EngineError::RequestTimeout(_) => "request_timeout",
            EngineError::Cancelled => "cancelled",
            EngineError::InvalidRequest(_) => "invalid_request",
            EngineError::NoModules => "no_modules",
            EngineError::Registration(_) => "registration",
            EngineError::Config(_) => "config",
        }
    }
}

impl From<DomainError> for EngineError {
    fn from(err: DomainError) -> Self {
        EngineError::InvalidRequest(err.to_string())
    }
}
