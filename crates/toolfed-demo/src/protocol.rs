//! Server-side JSON-RPC 2.0 / MCP message types.

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

pub const JSONRPC_VERSION: &str = "2.0";

/// MCP protocol version we answer `initialize` with.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// An incoming request or notification. Notifications carry no id.
#[derive(Debug, Clone, Deserialize)]
pub struct Request {
    #[serde(default)]
    pub id: Option<Value>,
    pub method: String,
    #[serde(default)]
    pub params: Option<Value>,
}

/// An outgoing response.
#[derive(Debug, Clone, Serialize)]
pub struct Response {
    pub jsonrpc: &'static str,
    pub id: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorObject>,
}

impl Response {
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: Some(result),
            error: None,
        }
    }

    pub fn error(id: Value, error: &RpcError) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION,
            id,
            result: None,
            error: Some(ErrorObject {
                code: error.code(),
                message: error.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ErrorObject {
    pub code: i64,
    pub message: String,
}

/// Protocol-level failures, answered with a JSON-RPC error object.
#[derive(Debug, Error)]
pub enum RpcError {
    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Invalid request: {0}")]
    InvalidRequest(String),

    #[error("Method not found: {0}")]
    MethodNotFound(String),

    #[error("{0}")]
    InvalidParams(String),

    #[error("Unknown resource: {0}")]
    ResourceNotFound(String),
}

impl RpcError {
    pub fn code(&self) -> i64 {
        match self {
            Self::Parse(_) => -32700,
            Self::InvalidRequest(_) => -32600,
            Self::MethodNotFound(_) => -32601,
            Self::InvalidParams(_) => -32602,
            Self::ResourceNotFound(_) => -32002,
        }
    }
}

/// A tool as advertised in `tools/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ToolSpec {
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "inputSchema")]
    pub input_schema: Value,
}

/// A resource as advertised in `resources/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceSpec {
    pub uri: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "mimeType")]
    pub mime_type: &'static str,
}

/// A parameterized resource as advertised in `resources/templates/list`.
#[derive(Debug, Clone, Serialize)]
pub struct ResourceTemplateSpec {
    #[serde(rename = "uriTemplate")]
    pub uri_template: &'static str,
    pub name: &'static str,
    pub description: &'static str,
    #[serde(rename = "mimeType")]
    pub mime_type: &'static str,
}

/// Text returned from `resources/read`.
#[derive(Debug, Clone, PartialEq)]
pub struct ResourceText {
    pub mime_type: &'static str,
    pub text: String,
}

/// One item of a tool result.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum Content {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
}

/// The result of a `tools/call`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolOutput {
    pub content: Vec<Content>,
    #[serde(rename = "isError")]
    pub is_error: bool,
}

impl ToolOutput {
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![Content::Text { text: text.into() }],
            is_error: false,
        }
    }

    /// A result the server ran but reports as failed.
    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            is_error: true,
            ..Self::text(text)
        }
    }

    /// Pretty-printed JSON, as the data tools answer.
    pub fn json<T: Serialize>(value: &T) -> Self {
        match serde_json::to_string_pretty(value) {
            Ok(text) => Self::text(text),
            Err(e) => Self::failure(format!("Failed to encode result: {e}")),
        }
    }
}

/// Why a tool call could not produce a normal result.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Answered with a JSON-RPC `-32602` error.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// Answered with an `isError` result, so the model can correct itself.
    #[error("{0}")]
    InvalidArgument(String),
}

/// Arguments of one tool call.
#[derive(Debug, Clone, Default)]
pub struct Args(serde_json::Map<String, Value>);

impl Args {
    pub fn new(map: serde_json::Map<String, Value>) -> Self {
        Self(map)
    }

    pub fn str(&self, key: &str) -> Result<&str, ToolError> {
        self.opt_str(key)?.ok_or_else(|| missing(key))
    }

    pub fn opt_str(&self, key: &str) -> Result<Option<&str>, ToolError> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::String(s)) => Ok(Some(s)),
            Some(other) => Err(wrong_type(key, "a string", other)),
        }
    }

    pub fn f64(&self, key: &str) -> Result<f64, ToolError> {
        self.opt_f64(key)?.ok_or_else(|| missing(key))
    }

    pub fn opt_f64(&self, key: &str) -> Result<Option<f64>, ToolError> {
        match self.0.get(key) {
            None | Some(Value::Null) => Ok(None),
            Some(Value::Number(n)) => Ok(n.as_f64()),
            Some(other) => Err(wrong_type(key, "a number", other)),
        }
    }
}

fn missing(key: &str) -> ToolError {
    ToolError::InvalidArgument(format!("Missing required argument '{key}'"))
}

fn wrong_type(key: &str, expected: &str, got: &Value) -> ToolError {
    ToolError::InvalidArgument(format!("Argument '{key}' must be {expected}, got {got}"))
}
