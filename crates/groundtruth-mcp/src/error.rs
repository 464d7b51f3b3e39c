//! Error types for the tool server

use groundtruth_engine::{ConfigError, EngineError};
use thiserror::Error;

/// Tool server error types
///
/// These become JSON-RPC errors. Outcomes a caller is expected to handle
/// (no authoritative data, request timeout) travel inside the response
/// envelope instead.
#[derive(Error, Debug)]
pub enum McpError {
    /// Invalid request format or tool arguments
    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    /// Required parameter missing from the JSON-RPC call
    #[error("Invalid params: {0}")]
    InvalidParams(String),

    /// Unknown JSON-RPC method
    #[error("Method not found: {0}")]
    MethodNotFound(String),

    /// Unknown tool name
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Engine failure
    #[error("Engine error: {0}")]
    Engine(#[from] EngineError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Claim pattern failed to compile
    #[error("Invalid claim pattern: {0}")]
    Pattern(#[from] regex::Error),

    /// JSON serialization/deserialization error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// IO error
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

impl McpError {
    /// Short machine-readable name, sent as `error.data.kind`
    pub fn kind(&self) -> &'static str {
        match self {
            McpError::InvalidRequest(_) => "invalid_request",
            McpError::InvalidParams(_) => "invalid_params",
            McpError::MethodNotFound(_) => "method_not_found",
            McpError::ToolNotFound(_) => "tool_not_found",
            McpError::Engine(e) => e.kind(),
            McpError::Config(_) => "config",
            McpError::Pattern(_) => "pattern",
            McpError::JsonError(_) => "parse_error",
            McpError::IoError(_) => "io",
        }
    }

    /// Convert to JSON-RPC error code
    pub fn error_code(&self) -> i32 {
        match self {
            McpError::InvalidRequest(_) => -32600,
            McpError::InvalidParams(_) => -32602,
            McpError::MethodNotFound(_) | McpError::ToolNotFound(_) => -32601,
            McpError::Engine(EngineError::InvalidRequest(_)) => -32600,
            McpError::Engine(_) => -32000,
            McpError::Config(_) | McpError::Pattern(_) => -32000,
            McpError::JsonError(_) => -32700,
            McpError::IoError(_) => -32000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_codes() {
        assert_eq!(McpError::InvalidRequest("x".into()).error_code(), -32600);
        assert_eq!(McpError::InvalidParams("x".into()).error_code(), -32602);
        assert_eq!(McpError::ToolNotFound("x".into()).error_code(), -32601);
        assert_eq!(McpError::MethodNotFound("x".into()).error_code(), -32601);
        assert_eq!(McpError::Engine(EngineError::NoModules).error_code(), -32000);
        assert_eq!(
            McpError::Engine(EngineError::InvalidRequest("empty".into())).error_code(),
            -32600
        );

        let json_err = serde_json::from_str::<serde_json::Value>("{").unwrap_err();
        assert_eq!(McpError::from(json_err).error_code(), -32700);
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(McpError::InvalidParams("x".into()).kind(), "invalid_params");
        assert_eq!(McpError::Engine(EngineError::Cancelled).kind(), "cancelled");
    }
}
