//! JSON-RPC 2.0 message types for the MCP server side
//!
//! References:
//! - <https://www.jsonrpc.org/specification>
//! - <https://modelcontextprotocol.io/specification/2025-03-26>
//!
//! Only (de)serialization lives here. Line framing is in `transport`, method
//! dispatch in `server`.

use crate::gateway::{ExecutionResult, GatewayError};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

pub const JSONRPC_VERSION: &str = "2.0";

/// Protocol version answered when the client does not propose one
pub const DEFAULT_PROTOCOL_VERSION: &str = "2025-03-26";

/// Request id as sent by the client; echoed back unchanged
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(untagged)]
pub enum RequestId {
    Number(i64),
    String(String),
}

/// Message from the client
///
/// ```json
/// {"jsonrpc": "2.0", "id": 1, "method": "tools/call",
///  "params": {"name": "git_status", "arguments": {}}}
/// ```
///
/// Without an `id` the message is a notification and is never answered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct McpRequest {
    pub jsonrpc: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,

    pub method: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub params: Option<Value>,
}

impl McpRequest {
    pub fn new(id: RequestId, method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id: Some(id),
            method: method.into(),
            params,
        }
    }

    pub fn notification(method: impl Into<String>, params: Option<Value>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id: None,
            method: method.into(),
            params,
        }
    }

    pub fn is_notification(&self) -> bool {
        self.id.is_none()
    }
}

/// Message to the client: exactly one of `result` / `error`
///
/// `id` serializes as `null` when the offending line was too broken to
/// recover one.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct McpResponse {
    pub jsonrpc: String,

    pub id: Option<RequestId>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<McpError>,
}

impl McpResponse {
    pub fn ok(id: Option<RequestId>, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn err(id: Option<RequestId>, error: McpError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.result.is_some()
    }

    /// Split into the payload or the error object
    pub fn into_result(self) -> Result<Value, McpError> {
        match (self.result, self.error) {
            (Some(result), None) => Ok(result),
            (_, Some(error)) => Err(error),
            (None, None) => Err(McpError::internal_error(
                "Response carries neither result nor error",
            )),
        }
    }
}

/// JSON-RPC error object
///
/// Codes -32700..-32600 are the standard ones. The server adds -32001 (the
/// delegated binary could not start) and -32002 (it ran past its deadline),
/// both tagged with `data.kind`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct McpError {
    pub code: i32,
    pub message: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl McpError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            data: None,
        }
    }

    pub fn with_data(code: i32, message: impl Into<String>, data: Value) -> Self {
        Self {
            data: Some(data),
            ..Self::new(code, message)
        }
    }

    pub fn parse_error(message: impl Into<String>) -> Self {
        Self::new(-32700, message)
    }

    pub fn invalid_request(message: impl Into<String>) -> Self {
        Self::new(-32600, message)
    }

    pub fn method_not_found(method: impl Into<String>) -> Self {
        Self::new(-32601, format!("Method not found: {}", method.into()))
    }

    /// Unknown tool, or arguments that fail the tool's schema
    pub fn invalid_params(message: impl Into<String>) -> Self {
        Self::new(-32602, message)
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self::new(-32603, message)
    }

    pub fn launch_error(message: impl Into<String>) -> Self {
        Self::with_data(-32001, message, json!({"kind": "launch"}))
    }

    pub fn timeout_error(message: impl Into<String>) -> Self {
        Self::with_data(-32002, message, json!({"kind": "timeout"}))
    }
}

impl From<&GatewayError> for McpError {
    fn from(err: &GatewayError) -> Self {
        match err {
            GatewayError::Launch { .. } => Self::launch_error(err.to_string()),
            GatewayError::Timeout { .. } => Self::timeout_error(err.to_string()),
            GatewayError::Wait { .. } => {
                Self::with_data(-32603, err.to_string(), json!({"kind": err.kind()}))
            }
        }
    }
}

/// Methods the server dispatches on
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum McpMethod {
    Initialize,
    /// `notifications/initialized`, sent once after the handshake
    Initialized,
    Ping,
    ToolsList,
    ToolsCall,
    /// Anything the server does not implement
    Custom(String),
}

impl McpMethod {
    pub fn as_str(&self) -> &str {
        match self {
            Self::Initialize => "initialize",
            Self::Initialized => "notifications/initialized",
            Self::Ping => "ping",
            Self::ToolsList => "tools/list",
            Self::ToolsCall => "tools/call",
            Self::Custom(name) => name.as_str(),
        }
    }
}

impl From<&str> for McpMethod {
    fn from(name: &str) -> Self {
        match name {
            "initialize" => Self::Initialize,
            "notifications/initialized" => Self::Initialized,
            "ping" => Self::Ping,
            "tools/list" => Self::ToolsList,
            "tools/call" => Self::ToolsCall,
            other => Self::Custom(other.to_string()),
        }
    }
}

/// `initialize` params; every field is optional on the wire
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    #[serde(default)]
    pub protocol_version: Option<String>,

    #[serde(default)]
    pub capabilities: Value,

    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct InitializeResult {
    /// The client's version when it sent one
    pub protocol_version: String,
    pub capabilities: Value,
    pub server_info: ServerInfo,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ServerInfo {
    pub name: String,
    pub version: String,
}

/// One entry of the `tools/list` answer
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct Tool {
    pub name: String,
    pub description: String,
    pub input_schema: Value,
}

/// `tools/call` params; missing `arguments` decode as `null`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ToolCallParams {
    pub name: String,

    #[serde(default)]
    pub arguments: Value,
}

/// Build the `tools/call` result for a completed invocation
///
/// Non-zero exit codes are still successful tool responses; the code travels
/// in the payload.
pub fn tool_call_result(result: &ExecutionResult) -> Value {
    let payload = json!({
        "code": result.code,
        "stdout": result.stdout,
        "stderr": result.stderr,
    });

    json!({
        "content": [{"type": "text", "text": payload.to_string()}],
        "structuredContent": payload,
        "isError": false,
    })
}
