//! Session broker: one fresh, initialized session per operation.
//!
//! There is no pooling and no keep-alive. [`with_session`] opens a session,
//! runs one operation on it and closes it on every exit path.

use crate::client::{McpClient, McpToolInfo, McpToolResult};
use crate::config::ToolServerEntry;
use crate::error::{FederationError, McpError};
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A live, handshake-complete session with one tool server.
pub trait ToolSession: Send + Sync {
    fn server_id(&self) -> &str;

    fn list_tools(&self) -> BoxFuture<'_, Result<Vec<McpToolInfo>, McpError>>;

    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        arguments: serde_json::Value,
    ) -> BoxFuture<'a, Result<McpToolResult, McpError>>;

    /// Tear down the transport.
    fn close(self: Box<Self>) -> BoxFuture<'static, ()>;
}

/// Opens sessions. Implementations connect and perform the handshake.
pub trait SessionBroker: Send + Sync {
    fn open<'a>(
        &'a self,
        server_id: &'a str,
        entry: &'a ToolServerEntry,
    ) -> BoxFuture<'a, Result<Box<dyn ToolSession>, McpError>>;
}

/// Broker that speaks MCP over the entry's configured transport.
#[derive(Debug, Clone, Copy, Default)]
pub struct McpSessionBroker;

impl SessionBroker for McpSessionBroker {
    fn open<'a>(
        &'a self,
        server_id: &'a str,
        entry: &'a ToolServerEntry,
    ) -> BoxFuture<'a, Result<Box<dyn ToolSession>, McpError>> {
        Box::pin(async move {
            let client = McpClient::connect(server_id, entry).await?;
            Ok(Box::new(client) as Box<dyn ToolSession>)
        })
    }
}

impl ToolSession for McpClient {
    fn server_id(&self) -> &str {
        McpClient::server_id(self)
    }

    fn list_tools(&self) -> BoxFuture<'_, Result<Vec<McpToolInfo>, McpError>> {
        Box::pin(McpClient::list_tools(self))
    }

    fn call_tool<'a>(
        &'a self,
        name: &'a str,
        arguments: serde_json::Value,
    ) -> BoxFuture<'a, Result<McpToolResult, McpError>> {
        Box::pin(McpClient::call_tool(self, name, arguments))
    }

    fn close(self: Box<Self>) -> BoxFuture<'static, ()> {
        Box::pin(async move { (*self).shutdown().await })
    }
}

/// Run `operation` against a fresh session with `server_id`.
///
/// Connect, handshake and operation together are bounded by `timeout`.
/// Connect/handshake failures and the timeout surface as
/// [`FederationError::ServerUnavailable`]; errors from `operation` are passed
/// through as-is. A session reporting a different server id is refused. The
/// session is closed before this returns, whatever the outcome.
pub async fn with_session<T, F>(
    broker: &dyn SessionBroker,
    server_id: &str,
    entry: &ToolServerEntry,
    timeout: Duration,
    operation: F,
) -> Result<T, FederationError>
where
    F: for<'s> FnOnce(&'s dyn ToolSession) -> BoxFuture<'s, Result<T, FederationError>>,
{
    let deadline = tokio::time::Instant::now() + timeout;
    let timed_out = || FederationError::ServerUnavailable {
        server: server_id.to_string(),
        reason: format!("session timed out after {}ms", timeout.as_millis()),
    };

    let session = match tokio::time::timeout_at(deadline, broker.open(server_id, entry)).await {
        Ok(Ok(session)) => session,
        Ok(Err(e)) => return Err(FederationError::unavailable(server_id, e)),
        Err(_) => return Err(timed_out()),
    };
    if session.server_id() != server_id {
        let reason = format!("broker opened a session with '{}'", session.server_id());
        session.close().await;
        return Err(FederationError::ServerUnavailable {
            server: server_id.to_string(),
            reason,
        });
    }
    tracing::debug!("Session open with '{}'", session.server_id());

    let outcome = tokio::time::timeout_at(deadline, operation(session.as_ref())).await;
    session.close().await;

    outcome.unwrap_or_else(|_| Err(timed_out()))
}
