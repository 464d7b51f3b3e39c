//! JSON-RPC 2.0 framing for the tool server
//!
//! Requests are validated here before dispatch: version, notification
//! detection, method lookup and `tools/call` parameters. Responses are
//! generic over their result so tool envelopes are serialized once, straight
//! into the reply.

use crate::error::McpError;
use groundtruth_engine::ModuleDescriptor;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The only JSON-RPC version accepted
pub const JSONRPC_VERSION: &str = "2.0";

/// Incoming JSON-RPC message
#[derive(Debug, Deserialize)]
pub struct Request {
    /// Declared JSON-RPC version
    pub jsonrpc: String,
    /// Absent for notifications
    #[serde(default)]
    pub id: Option<Value>,
    /// Method name
    pub method: String,
    /// Method parameters
    #[serde(default)]
    pub params: Value,
}

impl Request {
    /// Parse one line of input
    pub fn parse(line: &str) -> Result<Self, McpError> {
        Ok(serde_json::from_str(line)?)
    }

    /// Reject anything but JSON-RPC 2.0
    pub fn check_version(&self) -> Result<(), McpError> {
        if self.jsonrpc == JSONRPC_VERSION {
            Ok(())
        } else {
            Err(McpError::InvalidRequest(format!(
                "unsupported jsonrpc version '{}'",
                self.jsonrpc
            )))
        }
    }

    /// Notifications get no response
    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }

    /// Known method named by the request
    pub fn method(&self) -> Result<Method, McpError> {
        Method::parse(&self.method)
    }

    /// Parameters of a `tools/call`
    pub fn tool_call(&self) -> Result<ToolCall, McpError> {
        ToolCall::deserialize(&self.params).map_err(|e| McpError::InvalidParams(e.to_string()))
    }
}

/// Methods the server answers
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Method {
    /// `initialize`
    Initialize,
    /// `tools/list`
    ListTools,
    /// `tools/call`
    CallTool,
}

impl Method {
    /// Look up a method by its wire name
    pub fn parse(name: &str) -> Result<Self, McpError> {
        match name {
            "initialize" => Ok(Method::Initialize),
            "tools/list" => Ok(Method::ListTools),
            "tools/call" => Ok(Method::CallTool),
            other => Err(McpError::MethodNotFound(other.to_string())),
        }
    }
}

/// `tools/call` parameters
#[derive(Debug, Deserialize)]
pub struct ToolCall {
    /// Tool name
    pub name: String,
    /// Tool arguments (an empty object when omitted)
    #[serde(default)]
    pub arguments: Option<Value>,
}

impl ToolCall {
    /// Decode the arguments into a tool's parameter type
    pub fn arguments<T: DeserializeOwned>(&self) -> Result<T, McpError> {
        let arguments = self
            .arguments
            .clone()
            .unwrap_or_else(|| Value::Object(Default::default()));
        serde_json::from_value(arguments).map_err(|e| McpError::InvalidRequest(e.to_string()))
    }
}

/// Outgoing JSON-RPC message
#[derive(Debug, Serialize)]
pub struct Response<T> {
    jsonrpc: &'static str,
    id: Option<Value>,
    #[serde(flatten)]
    body: Body<T>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "lowercase")]
enum Body<T> {
    Result(T),
    Error(RpcError),
}

impl<T: Serialize> Response<T> {
    /// Successful reply
    pub fn ok(id: Option<Value>, result: T) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            body: Body::Result(result),
        }
    }

    /// Serialize for the wire
    ///
    /// A result that cannot be represented as JSON becomes an internal error
    /// reply for the same id.
    pub fn into_value(self) -> Value {
        let id = self.id.clone();
        serde_json::to_value(&self)
            .or_else(|e| serde_json::to_value(Response::<()>::failure(id, &McpError::from(e))))
            .unwrap_or(Value::Null)
    }
}

impl Response<()> {
    /// Error reply
    pub fn failure(id: Option<Value>, err: &McpError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            body: Body::Error(RpcError::from(err)),
        }
    }
}

/// JSON-RPC error object
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RpcError {
    /// JSON-RPC error code
    pub code: i32,
    /// Human-readable message
    pub message: String,
    /// Machine-readable detail: `{"kind": ...}`
    pub data: Value,
}

impl From<&McpError> for RpcError {
    fn from(err: &McpError) -> Self {
        Self {
            code: err.error_code(),
            message: err.to_string(),
            data: serde_json::json!({ "kind": err.kind() }),
        }
    }
}

/// `initialize` result
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult<'a> {
    /// Protocol version spoken by the server
    pub protocol_version: &'static str,
    /// Server identity
    pub server_info: ServerInfo,
    /// What the server offers
    pub capabilities: Capabilities<'a>,
}

/// Server identity
#[derive(Debug, Serialize)]
pub struct ServerInfo {
    /// Binary name
    pub name: &'static str,
    /// Crate version
    pub version: &'static str,
}

/// Advertised capabilities
#[derive(Debug, Serialize)]
pub struct Capabilities<'a> {
    /// Tool support
    pub tools: ToolsCapability,
    /// Registered source modules, in registration order
    pub sources: &'a [ModuleDescriptor],
}

/// Tool support flags
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolsCapability {
    /// The tool set is fixed for the life of the server
    pub list_changed: bool,
}

/// `tools/list` result
#[derive(Debug, Serialize)]
pub struct ToolList {
    /// Available tools
    pub tools: Vec<ToolDefinition>,
}

/// One advertised tool
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Tool name
    pub name: &'static str,
    /// What the tool does
    pub description: &'static str,
    /// JSON Schema of the arguments
    pub input_schema: Value,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_checks() {
        let request = Request::parse(r#"{"jsonrpc": "1.0", "id": 1, "method": "initialize"}"#).unwrap();
        assert!(matches!(request.check_version(), Err(McpError::InvalidRequest(_))));
        assert!(!request.is_notification());

        let request = Request::parse(r#"{"jsonrpc": "2.0", "method": "notifications/initialized"}"#).unwrap();
        assert!(request.check_version().is_ok());
        assert!(request.is_notification());
        assert!(matches!(request.method(), Err(McpError::MethodNotFound(_))));

        assert!(matches!(Request::parse("{"), Err(McpError::JsonError(_))));
    }

    #[test]
    fn test_tool_call_params() {
        let request = Request::parse(
            r#"{"jsonrpc": "2.0", "id": 1, "method": "tools/call", "params": {"name": "groundtruth_lookup"}}"#,
        )
        .unwrap();
        assert_eq!(request.method().unwrap(), Method::CallTool);

        let call = request.tool_call().unwrap();
        assert_eq!(call.name, "groundtruth_lookup");
        let arguments: Value = call.arguments().unwrap();
        assert_eq!(arguments, json!({}));

        let missing = Request::parse(r#"{"jsonrpc": "2.0", "id": 2, "method": "tools/call", "params": {}}"#).unwrap();
        assert!(matches!(missing.tool_call(), Err(McpError::InvalidParams(_))));
    }

    #[test]
    fn test_response_shapes() {
        let ok = Response::ok(Some(json!(7)), json!({"status": "ok"})).into_value();
        assert_eq!(ok["jsonrpc"], "2.0");
        assert_eq!(ok["id"], 7);
        assert_eq!(ok["result"]["status"], "ok");
        assert!(ok.get("error").is_none());

        let err = Response::failure(Some(json!(8)), &McpError::ToolNotFound("nope".to_string())).into_value();
        assert_eq!(err["error"]["code"], -32601);
        assert_eq!(err["error"]["data"]["kind"], "tool_not_found");
        assert!(err.get("result").is_none());
    }
}
