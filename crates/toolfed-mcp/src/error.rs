//! Error types for MCP communication and tool federation.

use thiserror::Error;

/// Errors from talking to a single MCP server over a transport.
#[derive(Debug, Error)]
pub enum McpError {
    #[error("Failed to spawn MCP server '{name}': {source}")]
    SpawnFailed {
        name: String,
        source: std::io::Error,
    },

    #[error("Failed to connect to '{url}': {reason}")]
    ConnectFailed { url: String, reason: String },

    #[error("HTTP {status} from '{url}'")]
    HttpStatus { url: String, status: u16 },

    #[error("JSON-RPC error from '{server}' (code {code}): {message}")]
    JsonRpc {
        server: String,
        code: i64,
        message: String,
    },

    #[error("MCP protocol error: {0}")]
    Protocol(String),

    #[error("MCP request '{name}' timed out after {timeout_ms}ms")]
    Timeout { name: String, timeout_ms: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Caller-facing failures of the federation layer.
///
/// Nothing in this crate panics or propagates a transport fault past the
/// catalog builder or the call router; every failure ends up as one of these.
#[derive(Debug, Error)]
pub enum FederationError {
    /// Transport, handshake or session-timeout failure talking to a server.
    #[error("Tool server '{server}' is unavailable: {reason}")]
    ServerUnavailable { server: String, reason: String },

    #[error("Unknown tool server '{server}'")]
    UnknownServer { server: String },

    /// The composite tool name could not be split into (server, tool).
    #[error("Invalid tool name format '{name}' (expected '<server>__<tool>')")]
    InvalidToolName { name: String },

    /// The server ran the request and reported a failure.
    #[error("Tool '{tool}' on server '{server}' failed: {message}")]
    RemoteToolError {
        server: String,
        tool: String,
        message: String,
    },

    #[error("Invalid arguments for tool '{name}': {message}")]
    InvalidArguments { name: String, message: String },

    #[error("Invalid tool server id '{server}': {reason}")]
    InvalidServerId { server: String, reason: String },
}

impl FederationError {
    /// Map a transport-level failure to `ServerUnavailable`.
    pub fn unavailable(server: impl Into<String>, err: McpError) -> Self {
        Self::ServerUnavailable {
            server: server.into(),
            reason: err.to_string(),
        }
    }

    /// Map a failure from `tools/call`.
    ///
    /// A JSON-RPC error means the server processed the request and rejected
    /// it (unknown tool, bad arguments); anything else is an infra failure.
    pub fn from_call(server: &str, tool: &str, err: McpError) -> Self {
        match err {
            McpError::JsonRpc { message, .. } => Self::RemoteToolError {
                server: server.to_string(),
                tool: tool.to_string(),
                message,
            },
            other => Self::unavailable(server, other),
        }
    }

    /// Whether retrying the same request later could succeed.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ServerUnavailable { .. })
    }
}
