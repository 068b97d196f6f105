//! HTTP + Server-Sent Events transport.
//!
//! `GET <url>` opens a long-lived event stream. The server's first `endpoint`
//! event carries the (usually relative) URL that JSON-RPC messages are POSTed
//! to; responses come back on the stream as `message` events.

use super::RequestTracker;
use super::sse_parser::SseParser;
use crate::error::McpError;
use crate::jsonrpc::{JsonRpcNotification, JsonRpcRequest, JsonRpcResponse};
use futures_util::StreamExt;
use reqwest::Url;
use reqwest::header::{ACCEPT, CONTENT_TYPE};
use std::time::Duration;
use tokio::sync::oneshot;
use tokio::task::JoinHandle;

/// Async SSE transport for one tool server.
pub struct SseTransport {
    http: reqwest::Client,
    post_url: Url,
    tracker: RequestTracker,
    reader_handle: JoinHandle<()>,
}

impl SseTransport {
    /// Open the event stream and wait for the server to announce its
    /// message endpoint.
    pub async fn connect(url: &str, timeout_ms: u64) -> Result<Self, McpError> {
        let timeout = Duration::from_millis(timeout_ms);
        let connect_err = |reason: String| McpError::ConnectFailed {
            url: url.to_string(),
            reason,
        };

        let base = Url::parse(url).map_err(|e| connect_err(e.to_string()))?;
        let http = reqwest::Client::builder()
            .connect_timeout(timeout)
            .build()
            .map_err(|e| connect_err(e.to_string()))?;

        let response = tokio::time::timeout(
            timeout,
            http.get(base.clone())
                .header(ACCEPT, "text/event-stream")
                .send(),
        )
        .await
        .map_err(|_| McpError::Timeout {
            name: format!("GET {url}"),
            timeout_ms,
        })?
        .map_err(|e| connect_err(e.to_string()))?;

        if !response.status().is_success() {
            return Err(McpError::HttpStatus {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        let tracker = RequestTracker::new(timeout_ms);
        let dispatcher = tracker.dispatcher();
        let (endpoint_tx, endpoint_rx) = oneshot::channel::<String>();

        let reader_handle = tokio::spawn(async move {
            let mut endpoint_tx = Some(endpoint_tx);
            let mut parser = SseParser::new();
            let mut stream = response.bytes_stream();
            while let Some(chunk) = stream.next().await {
                let chunk = match chunk {
                    Ok(c) => c,
                    Err(e) => {
                        tracing::debug!("SSE stream error: {e}");
                        break;
                    }
                };
                for event in parser.feed_bytes(&chunk) {
                    match event.event_type.as_deref() {
                        Some("endpoint") => match endpoint_tx.take() {
                            Some(tx) => {
                                let _ = tx.send(event.data);
                            }
                            None => tracing::debug!("Ignoring repeated endpoint event"),
                        },
                        Some("message") | None => dispatcher.dispatch(&event.data).await,
                        Some(other) => tracing::debug!("Ignoring SSE event '{other}'"),
                    }
                }
            }
            dispatcher.close_all().await;
        });

        let endpoint = match tokio::time::timeout(timeout, endpoint_rx).await {
            Ok(Ok(endpoint)) => endpoint,
            Ok(Err(_)) => {
                reader_handle.abort();
                return Err(McpError::Protocol(format!(
                    "Event stream from '{url}' closed before the endpoint event"
                )));
            }
            Err(_) => {
                reader_handle.abort();
                return Err(McpError::Timeout {
                    name: "endpoint event".to_string(),
                    timeout_ms,
                });
            }
        };

        let post_url = match base.join(endpoint.trim()) {
            Ok(u) => u,
            Err(e) => {
                reader_handle.abort();
                return Err(McpError::Protocol(format!(
                    "Invalid message endpoint '{endpoint}': {e}"
                )));
            }
        };
        tracing::debug!("SSE session for {url} posts to {post_url}");

        Ok(Self {
            http,
            post_url,
            tracker,
            reader_handle,
        })
    }

    pub async fn send_request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<JsonRpcResponse, McpError> {
        let (id, rx) = self.tracker.register().await;
        let body = serde_json::to_string(&JsonRpcRequest::new(id, method, params))?;

        if let Err(e) = self.post(body).await {
            self.tracker.forget(id).await;
            return Err(e);
        }

        self.tracker.wait(id, method, rx).await
    }

    pub async fn send_notification(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<(), McpError> {
        let body = serde_json::to_string(&JsonRpcNotification::new(method, params))?;
        self.post(body).await
    }

    /// Drop the event stream; the server sees the connection close.
    pub async fn shutdown(self) {
        self.reader_handle.abort();
        let _ = self.reader_handle.await;
    }

    async fn post(&self, body: String) -> Result<(), McpError> {
        let response = self
            .http
            .post(self.post_url.clone())
            .header(CONTENT_TYPE, "application/json")
            .timeout(Duration::from_millis(self.tracker.timeout_ms()))
            .body(body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    McpError::Timeout {
                        name: format!("POST {}", self.post_url),
                        timeout_ms: self.tracker.timeout_ms(),
                    }
                } else {
                    McpError::ConnectFailed {
                        url: self.post_url.to_string(),
                        reason: e.to_string(),
                    }
                }
            })?;

        if !response.status().is_success() {
            return Err(McpError::HttpStatus {
                url: self.post_url.to_string(),
                status: response.status().as_u16(),
            });
        }
        Ok(())
    }
}
