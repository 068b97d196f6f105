//! Newline-delimited JSON-RPC 2.0 server loop.
//!
//! stdout carries protocol messages only; logging goes to stderr.

use crate::profiles::Profile;
use crate::protocol::{
    Args, PROTOCOL_VERSION, Request, Response, RpcError, ToolError, ToolOutput,
};
use serde_json::{Value, json};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};

/// Serves one profile to one client.
pub struct DemoServer {
    profile: Box<dyn Profile>,
}

impl DemoServer {
    pub fn new(profile: Box<dyn Profile>) -> Self {
        Self { profile }
    }

    /// Read requests until EOF, answering each on `writer`.
    pub async fn serve<R, W>(&mut self, reader: R, mut writer: W) -> std::io::Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        tracing::info!("{} serving on stdio", self.profile.server_name());
        let mut lines = reader.lines();
        while let Some(line) = lines.next_line().await? {
            let Some(reply) = self.handle_line(&line) else {
                continue;
            };
            writer.write_all(reply.as_bytes()).await?;
            writer.write_all(b"\n").await?;
            writer.flush().await?;
        }
        tracing::info!("{} client disconnected", self.profile.server_name());
        Ok(())
    }

    /// Handle one message. Notifications and blank lines get no reply.
    pub fn handle_line(&mut self, line: &str) -> Option<String> {
        let line = line.trim();
        if line.is_empty() {
            return None;
        }

        let response = match serde_json::from_str::<Value>(line) {
            Err(e) => Response::error(Value::Null, &RpcError::Parse(e.to_string())),
            Ok(value) => {
                let id = value.get("id").cloned();
                match serde_json::from_value::<Request>(value) {
                    Ok(request) => self.handle_request(request)?,
                    Err(e) => Response::error(
                        id.unwrap_or(Value::Null),
                        &RpcError::InvalidRequest(e.to_string()),
                    ),
                }
            }
        };

        match serde_json::to_string(&response) {
            Ok(s) => Some(s),
            Err(e) => {
                tracing::error!("Failed to encode response: {e}");
                None
            }
        }
    }

    fn handle_request(&mut self, request: Request) -> Option<Response> {
        let Some(id) = request.id else {
            tracing::debug!("Notification {}", request.method);
            return None;
        };
        tracing::debug!("<- {} (id {id})", request.method);

        let params = request.params.unwrap_or(Value::Null);
        Some(match self.dispatch(&request.method, params) {
            Ok(result) => Response::success(id, result),
            Err(e) => {
                tracing::warn!("{} failed: {e}", request.method);
                Response::error(id, &e)
            }
        })
    }

    fn dispatch(&mut self, method: &str, params: Value) -> Result<Value, RpcError> {
        match method {
            "initialize" => Ok(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {"tools": {}, "resources": {}},
                "serverInfo": {
                    "name": self.profile.server_name(),
                    "version": env!("CARGO_PKG_VERSION")
                }
            })),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.profile.tools() })),
            "tools/call" => self.call_tool(params),
            "resources/list" => Ok(json!({ "resources": self.profile.resources() })),
            "resources/templates/list" => Ok(json!({
                "resourceTemplates": self.profile.resource_templates()
            })),
            "resources/read" => {
                let uri = params
                    .get("uri")
                    .and_then(Value::as_str)
                    .ok_or_else(|| RpcError::InvalidParams("Missing resource uri".to_string()))?;
                let resource = self
                    .profile
                    .read_resource(uri)
                    .ok_or_else(|| RpcError::ResourceNotFound(uri.to_string()))?;
                Ok(json!({
                    "contents": [{
                        "uri": uri,
                        "mimeType": resource.mime_type,
                        "text": resource.text
                    }]
                }))
            }
            other => Err(RpcError::MethodNotFound(other.to_string())),
        }
    }

    fn call_tool(&mut self, params: Value) -> Result<Value, RpcError> {
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| RpcError::InvalidParams("Missing tool name".to_string()))?;
        let args = match params.get("arguments") {
            None | Some(Value::Null) => Args::default(),
            Some(Value::Object(map)) => Args::new(map.clone()),
            Some(other) => {
                return Err(RpcError::InvalidParams(format!(
                    "Tool arguments must be an object, got {other}"
                )));
            }
        };

        tracing::info!("Calling tool {name}");
        let output = match self.profile.call_tool(name, &args) {
            Ok(output) => output,
            Err(e @ ToolError::UnknownTool(_)) => {
                return Err(RpcError::InvalidParams(e.to_string()));
            }
            Err(ToolError::InvalidArgument(message)) => ToolOutput::failure(message),
        };
        serde_json::to_value(output).map_err(|e| RpcError::InvalidParams(e.to_string()))
    }
}
