//! MCP server implementation

use serde_json::{json, Value};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::error::McpError;
use crate::protocol::{
    Capabilities, InitializeResult, Method, Request, Response, ServerInfo, ToolDefinition, ToolList,
    ToolsCapability,
};
use crate::tools::{self, ToolContext};

/// Protocol version reported by `initialize`
pub const PROTOCOL_VERSION: &str = "0.1.0";

/// Authoritative metric lookup
pub const TOOL_LOOKUP: &str = "groundtruth_lookup";
/// Private-company revenue estimate
pub const TOOL_ESTIMATE: &str = "groundtruth_estimate_private";
/// Claim verification
pub const TOOL_VERIFY: &str = "groundtruth_verify_claim";
/// Benchmark comparison
pub const TOOL_DRIVERS: &str = "groundtruth_value_drivers";

/// MCP Server
///
/// Handles Model Context Protocol requests, one JSON-RPC message per line.
pub struct McpServer {
    ctx: ToolContext,
}

impl McpServer {
    /// Create a server over a tool context
    pub fn new(ctx: ToolContext) -> Self {
        Self { ctx }
    }

    /// Tool context the server dispatches into
    pub fn context(&self) -> &ToolContext {
        &self.ctx
    }

    /// Serve line-delimited JSON-RPC until the reader closes or `shutdown` fires
    ///
    /// Each call gets a child of `shutdown`, so a shutdown cancels whatever
    /// resolution is in flight.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W, shutdown: CancellationToken) -> Result<(), McpError>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        info!("MCP server started");
        let mut lines = reader.lines();

        loop {
            let line = tokio::select! {
                _ = shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                line = lines.next_line() => line?,
            };
            let Some(line) = line else {
                break;
            };

            let call = shutdown.child_token();
            if let Some(response) = self.handle_line_with(&line, &call).await {
                let response_str = serde_json::to_string(&response)?;
                writer.write_all(response_str.as_bytes()).await?;
                writer.write_all(b"\n").await?;
                writer.flush().await?;
                debug!("Sent response: {}", response_str);
            }
        }

        info!("MCP server stopped");
        Ok(())
    }

    /// Handle one line of input
    ///
    /// Returns `None` for blank lines and notifications (requests without
    /// an id), which get no response.
    pub async fn handle_line(&self, line: &str) -> Option<Value> {
        self.handle_line_with(line, &CancellationToken::new()).await
    }

    async fn handle_line_with(&self, line: &str, cancel: &CancellationToken) -> Option<Value> {
        if line.trim().is_empty() {
            return None;
        }
        debug!("Received request: {}", line);

        let request = match Request::parse(line) {
            Ok(request) => request,
            Err(e) => {
                error!("Failed to parse request: {}", e);
                return Some(Response::failure(None, &e).into_value());
            }
        };

        if let Err(e) = request.check_version() {
            return Some(Response::failure(request.id, &e).into_value());
        }

        if request.is_notification() {
            debug!(method = %request.method, "Notification ignored");
            return None;
        }

        Some(self.handle_request(request, cancel).await)
    }

    async fn handle_request(&self, request: Request, cancel: &CancellationToken) -> Value {
        let reply = match request.method() {
            Ok(Method::Initialize) => Ok(Response::ok(request.id.clone(), self.initialize()).into_value()),
            Ok(Method::ListTools) => Ok(Response::ok(request.id.clone(), tool_list()).into_value()),
            Ok(Method::CallTool) => self.tool_call(&request, cancel).await,
            Err(e) => Err(e),
        };

        reply.unwrap_or_else(|e| {
            warn!(code = e.error_code(), kind = e.kind(), "Request failed: {}", e);
            Response::failure(request.id, &e).into_value()
        })
    }

    fn initialize(&self) -> InitializeResult<'_> {
        InitializeResult {
            protocol_version: PROTOCOL_VERSION,
            server_info: ServerInfo {
                name: "groundtruth-mcp",
                version: env!("CARGO_PKG_VERSION"),
            },
            capabilities: Capabilities {
                tools: ToolsCapability { list_changed: false },
                sources: self.ctx.engine().describe(),
            },
        }
    }

    /// Run a tool and wrap its envelope in the reply
    async fn tool_call(&self, request: &Request, cancel: &CancellationToken) -> Result<Value, McpError> {
        let call = request.tool_call()?;
        let id = request.id.clone();

        debug!(tool = %call.name, "Tool call");
        let reply = match call.name.as_str() {
            TOOL_LOOKUP => {
                let envelope = tools::handle_lookup(&self.ctx, call.arguments()?, cancel).await?;
                Response::ok(id, envelope).into_value()
            }
            TOOL_ESTIMATE => {
                let envelope = tools::handle_estimate(&self.ctx, call.arguments()?, cancel).await?;
                Response::ok(id, envelope).into_value()
            }
            TOOL_VERIFY => {
                let envelope = tools::handle_verify(&self.ctx, call.arguments()?, cancel).await?;
                Response::ok(id, envelope).into_value()
            }
            TOOL_DRIVERS => {
                let envelope = tools::handle_value_drivers(&self.ctx, call.arguments()?, cancel).await?;
                Response::ok(id, envelope).into_value()
            }
            other => return Err(McpError::ToolNotFound(other.to_string())),
        };
        Ok(reply)
    }
}

fn tool_list() -> ToolList {
    ToolList {
        tools: vec![
            tool_definition_lookup(),
            tool_definition_estimate(),
            tool_definition_verify(),
            tool_definition_drivers(),
        ],
    }
}

// Tool definitions for tools/list response
fn tool_definition_lookup() -> ToolDefinition {
    ToolDefinition {
        name: TOOL_LOOKUP,
        description: "Look up a financial metric for an entity from the most authoritative source available",
        input_schema: json!({
            "type": "object",
            "properties": {
                "identifier": {"type": "string", "description": "Entity identifier (e.g. a filing ID or ticker)"},
                "metric": {"type": "string", "description": "Metric name (e.g. revenue_total)"},
                "metrics": {"type": "array", "items": {"type": "string"}, "description": "Several metrics, resolved independently"},
                "period": {"type": "string", "description": "Reporting period (e.g. FY2024)"},
                "tier_floor": {"type": "string", "enum": ["Tier1", "Tier2", "Tier3"], "description": "Least authoritative tier accepted (default: Tier1)"},
                "include_trace": {"type": "boolean", "description": "Attach the resolution trace", "default": false}
            },
            "required": ["identifier"]
        }),
    }
}

fn tool_definition_estimate() -> ToolDefinition {
    ToolDefinition {
        name: TOOL_ESTIMATE,
        description: "Estimate a private company's revenue from headcount or funding and an industry benchmark",
        input_schema: json!({
            "type": "object",
            "properties": {
                "identifier": {"type": "string", "description": "Private entity identifier"},
                "classification_code": {"type": "string", "description": "Industry classification code (e.g. NAICS-5112)"},
                "proxy": {"type": "string", "enum": ["headcount", "funding_total"], "default": "headcount"},
                "period": {"type": "string", "description": "Reporting period"},
                "include_trace": {"type": "boolean", "default": false}
            },
            "required": ["identifier", "classification_code"]
        }),
    }
}

fn tool_definition_verify() -> ToolDefinition {
    ToolDefinition {
        name: TOOL_VERIFY,
        description: "Check the numeric claims in a passage of text against authoritative data",
        input_schema: json!({
            "type": "object",
            "properties": {
                "identifier": {"type": "string", "description": "Entity the text talks about"},
                "text": {"type": "string", "description": "Text containing numeric claims"},
                "period": {"type": "string", "description": "Period for claims that do not name one"},
                "tolerance_pct": {"type": "number", "minimum": 0.0, "description": "Allowed relative difference in percent"},
                "include_trace": {"type": "boolean", "default": false}
            },
            "required": ["identifier", "text"]
        }),
    }
}

fn tool_definition_drivers() -> ToolDefinition {
    ToolDefinition {
        name: TOOL_DRIVERS,
        description: "Compare an entity's metric with its industry benchmark (advisory)",
        input_schema: json!({
            "type": "object",
            "properties": {
                "identifier": {"type": "string", "description": "Target entity"},
                "metric": {"type": "string", "description": "Entity metric to compare"},
                "classification_code": {"type": "string", "description": "Industry classification code"},
                "benchmark_metric": {"type": "string", "description": "Benchmark metric (default: same as metric)"},
                "mode": {"type": "string", "enum": ["gap", "ratio"], "default": "gap"},
                "period": {"type": "string"},
                "include_trace": {"type": "boolean", "default": false}
            },
            "required": ["identifier", "metric", "classification_code"]
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_definitions_have_schemas() {
        for def in [
            tool_definition_lookup(),
            tool_definition_estimate(),
            tool_definition_verify(),
            tool_definition_drivers(),
        ] {
            assert!(def.name.starts_with("groundtruth_"));
            assert_eq!(def.input_schema["type"], "object");
            assert!(def.input_schema["required"]
                .as_array()
                .unwrap()
                .contains(&json!("identifier")));
        }
    }

    #[test]
    fn test_tool_list_order() {
        let names: Vec<_> = tool_list().tools.iter().map(|t| t.name).collect();
        assert_eq!(names, [TOOL_LOOKUP, TOOL_ESTIMATE, TOOL_VERIFY, TOOL_DRIVERS]);
    }
}
