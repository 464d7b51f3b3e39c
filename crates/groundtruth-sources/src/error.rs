//! Error types for constructing source modules

use thiserror::Error;

/// Errors that can occur while building a source module
///
/// Query-time failures are reported as
/// [`ModuleError`](groundtruth_domain::ModuleError) instead.
#[derive(Error, Debug)]
pub enum SourceError {
    /// HTTP client could not be built
    #[error("HTTP client error: {0}")]
    Client(String),

    /// Module settings are unusable
    #[error("Invalid module configuration: {0}")]
    InvalidConfig(String),

    /// Unknown seeded profile name
    #[error("Unknown profile: {0}")]
    UnknownProfile(String),
}
