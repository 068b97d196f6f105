//! Transports for MCP server communication.
//!
//! Both transports correlate responses to requests by JSON-RPC id through a
//! shared [`RequestTracker`]; they differ only in how bytes move.

mod sse;
mod sse_parser;
mod stdio;

pub use sse::SseTransport;
pub use stdio::StdioTransport;

use crate::config::{ServerEndpoint, ToolServerEntry};
use crate::error::McpError;
use crate::jsonrpc::JsonRpcResponse;
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tokio::sync::{Mutex, oneshot};

type PendingMap = Arc<Mutex<HashMap<u64, oneshot::Sender<JsonRpcResponse>>>>;

/// A connected transport to one tool server.
pub enum Transport {
    Stdio(StdioTransport),
    Sse(SseTransport),
}

impl Transport {
    /// Connect to the endpoint described by `entry`.
    pub async fn connect(entry: &ToolServerEntry) -> Result<Self, McpError> {
        match &entry.endpoint {
            ServerEndpoint::Stdio { command, args, env } => Ok(Self::Stdio(
                StdioTransport::spawn(command, args, env, entry.timeout_ms)?,
            )),
            ServerEndpoint::Sse { url } => {
                Ok(Self::Sse(SseTransport::connect(url, entry.timeout_ms).await?))
            }
        }
    }

    /// Send a JSON-RPC request and wait for the matching response.
    pub async fn send_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<JsonRpcResponse, McpError> {
        match self {
            Self::Stdio(t) => t.send_request(method, params).await,
            Self::Sse(t) => t.send_request(method, params).await,
        }
    }

    /// Send a JSON-RPC notification (no response expected).
    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), McpError> {
        match self {
            Self::Stdio(t) => t.send_notification(method, params).await,
            Self::Sse(t) => t.send_notification(method, params).await,
        }
    }

    /// Close the connection and release its background tasks.
    pub async fn shutdown(self) {
        match self {
            Self::Stdio(t) => t.shutdown().await,
            Self::Sse(t) => t.shutdown().await,
        }
    }
}

/// Allocates request ids and routes responses back to waiting callers.
pub(crate) struct RequestTracker {
    next_id: AtomicU64,
    pending: PendingMap,
    timeout_ms: u64,
}

impl RequestTracker {
    pub(crate) fn new(timeout_ms: u64) -> Self {
        Self {
            next_id: AtomicU64::new(1),
            pending: Arc::new(Mutex::new(HashMap::new())),
            timeout_ms,
        }
    }

    pub(crate) fn timeout_ms(&self) -> u64 {
        self.timeout_ms
    }

    /// Handle for the background reader task.
    pub(crate) fn dispatcher(&self) -> ResponseDispatcher {
        ResponseDispatcher {
            pending: Arc::clone(&self.pending),
        }
    }

    /// Reserve an id and a slot for its response.
    pub(crate) async fn register(&self) -> (u64, oneshot::Receiver<JsonRpcResponse>) {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let (tx, rx) = oneshot::channel();
        self.pending.lock().await.insert(id, tx);
        (id, rx)
    }

    /// Drop the slot for a request that was never sent.
    pub(crate) async fn forget(&self, id: u64) {
        self.pending.lock().await.remove(&id);
    }

    /// Wait for the response to request `id`, bounded by the request timeout.
    pub(crate) async fn wait(
        &self,
        id: u64,
        method: &str,
        rx: oneshot::Receiver<JsonRpcResponse>,
    ) -> Result<JsonRpcResponse, McpError> {
        match tokio::time::timeout(Duration::from_millis(self.timeout_ms), rx).await {
            Ok(Ok(resp)) => Ok(resp),
            Ok(Err(_)) => Err(McpError::Protocol(format!(
                "Connection closed before '{method}' response"
            ))),
            Err(_) => {
                self.forget(id).await;
                Err(McpError::Timeout {
                    name: method.to_string(),
                    timeout_ms: self.timeout_ms,
                })
            }
        }
    }
}

/// Reader-side half of a [`RequestTracker`].
#[derive(Clone)]
pub(crate) struct ResponseDispatcher {
    pending: PendingMap,
}

impl ResponseDispatcher {
    /// Parse one JSON-RPC message and hand it to whoever is waiting on its id.
    pub(crate) async fn dispatch(&self, payload: &str) {
        let payload = payload.trim();
        if payload.is_empty() {
            return;
        }
        let message: serde_json::Value = match serde_json::from_str(payload) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Failed to parse MCP message: {e}: {payload}");
                return;
            }
        };
        // Server-initiated requests and notifications; their ids are not ours.
        if let Some(method) = message.get("method") {
            tracing::debug!("Ignoring server message {method}: {payload}");
            return;
        }
        let resp: JsonRpcResponse = match serde_json::from_value(message) {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!("Failed to parse MCP response: {e}: {payload}");
                return;
            }
        };
        match resp.id {
            Some(id) => {
                if let Some(tx) = self.pending.lock().await.remove(&id) {
                    let _ = tx.send(resp);
                }
            }
            None => tracing::debug!("Ignoring response without id: {payload}"),
        }
    }

    /// Fail every outstanding request; called when the connection ends.
    pub(crate) async fn close_all(&self) {
        self.pending.lock().await.clear();
    }
}
