//! MCP client: one initialized session with one tool server.
//!
//! Handles the protocol handshake (initialize + initialized notification),
//! tool discovery (tools/list), tool invocation (tools/call) and resource
//! access (resources/list, resources/read).

use crate::config::ToolServerEntry;
use crate::error::McpError;
use crate::transport::Transport;
use serde::Deserialize;

/// MCP protocol version we speak.
const PROTOCOL_VERSION: &str = "2024-11-05";

/// Upper bound on `nextCursor` pages followed for one listing.
const MAX_LIST_PAGES: usize = 64;

/// A tool exactly as a server describes it.
#[derive(Debug, Clone, PartialEq)]
pub struct McpToolInfo {
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

/// Result of calling a tool.
#[derive(Debug, Clone)]
pub struct McpToolResult {
    pub content: Vec<McpToolContent>,
    pub is_error: bool,
}

/// A content item in a tool result.
///
/// Kinds this client does not model decode as [`McpToolContent::Unsupported`]
/// rather than failing the whole result.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum McpToolContent {
    Text {
        text: String,
    },
    Image {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Audio {
        data: String,
        #[serde(rename = "mimeType")]
        mime_type: String,
    },
    Resource {
        resource: serde_json::Value,
    },
    #[serde(other)]
    Unsupported,
}

/// A readable resource advertised by a server.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct McpResourceInfo {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default, rename = "mimeType")]
    pub mime_type: Option<String>,
}

/// One part of a resource read.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct McpResourceContents {
    pub uri: String,
    #[serde(default, rename = "mimeType")]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub text: Option<String>,
    #[serde(default)]
    pub blob: Option<String>,
}

#[derive(Deserialize)]
struct ToolsListResult {
    tools: Vec<ToolEntry>,
    #[serde(default, rename = "nextCursor")]
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct ToolEntry {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default = "default_schema", rename = "inputSchema")]
    input_schema: serde_json::Value,
}

fn default_schema() -> serde_json::Value {
    serde_json::json!({"type": "object", "properties": {}})
}

#[derive(Deserialize)]
struct ToolCallResult {
    #[serde(default)]
    content: Vec<McpToolContent>,
    #[serde(default, rename = "isError")]
    is_error: bool,
}

#[derive(Deserialize)]
struct ResourcesListResult {
    resources: Vec<McpResourceInfo>,
    #[serde(default, rename = "nextCursor")]
    next_cursor: Option<String>,
}

#[derive(Deserialize)]
struct ResourceReadResult {
    contents: Vec<McpResourceContents>,
}

/// Client for a single tool server session.
pub struct McpClient {
    server_id: String,
    transport: Transport,
}

impl McpClient {
    /// Connect and perform the handshake. The transport is closed again if
    /// the handshake fails.
    pub async fn connect(server_id: &str, entry: &ToolServerEntry) -> Result<Self, McpError> {
        let transport = Transport::connect(entry).await?;
        let client = Self {
            server_id: server_id.to_string(),
            transport,
        };

        if let Err(e) = client.initialize().await {
            client.shutdown().await;
            return Err(e);
        }

        tracing::debug!("MCP session with '{server_id}' initialized");
        Ok(client)
    }

    async fn initialize(&self) -> Result<(), McpError> {
        let params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "toolfed",
                "version": env!("CARGO_PKG_VERSION")
            }
        });
        self.request("initialize", Some(params)).await?;
        self.transport
            .send_notification("notifications/initialized", None)
            .await
    }

    /// List the server's tools, following pagination cursors.
    pub async fn list_tools(&self) -> Result<Vec<McpToolInfo>, McpError> {
        let mut tools = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let params = cursor.take().map(|c| serde_json::json!({ "cursor": c }));
            let result = self.request("tools/list", params).await?;
            let page: ToolsListResult = serde_json::from_value(result).map_err(|e| {
                McpError::Protocol(format!("Failed to parse tools/list response: {e}"))
            })?;

            tools.extend(page.tools.into_iter().map(|t| McpToolInfo {
                name: t.name,
                description: t.description.unwrap_or_default(),
                input_schema: t.input_schema,
            }));

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => return Ok(tools),
            }
        }

        tracing::warn!(
            "'{}' kept paginating tools/list; stopping after {MAX_LIST_PAGES} pages",
            self.server_id
        );
        Ok(tools)
    }

    /// Call a tool by its name on this server.
    pub async fn call_tool(
        &self,
        tool_name: &str,
        arguments: serde_json::Value,
    ) -> Result<McpToolResult, McpError> {
        let params = serde_json::json!({
            "name": tool_name,
            "arguments": arguments,
        });
        let result = self.request("tools/call", Some(params)).await?;
        let call: ToolCallResult = serde_json::from_value(result)
            .map_err(|e| McpError::Protocol(format!("Failed to parse tools/call result: {e}")))?;

        Ok(McpToolResult {
            content: call.content,
            is_error: call.is_error,
        })
    }

    /// List the server's readable resources, following pagination cursors.
    pub async fn list_resources(&self) -> Result<Vec<McpResourceInfo>, McpError> {
        let mut resources = Vec::new();
        let mut cursor: Option<String> = None;

        for _ in 0..MAX_LIST_PAGES {
            let params = cursor.take().map(|c| serde_json::json!({ "cursor": c }));
            let result = self.request("resources/list", params).await?;
            let page: ResourcesListResult = serde_json::from_value(result).map_err(|e| {
                McpError::Protocol(format!("Failed to parse resources/list response: {e}"))
            })?;
            resources.extend(page.resources);

            match page.next_cursor {
                Some(next) if !next.is_empty() => cursor = Some(next),
                _ => break,
            }
        }
        Ok(resources)
    }

    /// Read one resource by URI.
    pub async fn read_resource(&self, uri: &str) -> Result<Vec<McpResourceContents>, McpError> {
        let result = self
            .request("resources/read", Some(serde_json::json!({ "uri": uri })))
            .await?;
        let read: ResourceReadResult = serde_json::from_value(result).map_err(|e| {
            McpError::Protocol(format!("Failed to parse resources/read result: {e}"))
        })?;
        Ok(read.contents)
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    /// Close the session.
    pub async fn shutdown(self) {
        self.transport.shutdown().await;
    }

    async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> Result<serde_json::Value, McpError> {
        tracing::debug!("-> {} {method}", self.server_id);
        self.transport
            .send_request(method, params)
            .await?
            .into_result(&self.server_id, method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_entry_without_description_or_schema() {
        let entry: ToolEntry = serde_json::from_str(r#"{"name": "ping"}"#).unwrap();
        assert_eq!(entry.name, "ping");
        assert!(entry.description.is_none());
        assert_eq!(entry.input_schema["type"], "object");
    }

    #[test]
    fn tools_list_with_cursor() {
        let json = r#"{
            "tools": [
                {"name": "a", "description": "Tool A", "inputSchema": {"type": "object"}},
                {"name": "b", "inputSchema": {"type": "object"}}
            ],
            "nextCursor": "page-2"
        }"#;
        let page: ToolsListResult = serde_json::from_str(json).unwrap();
        assert_eq!(page.tools.len(), 2);
        assert_eq!(page.next_cursor.as_deref(), Some("page-2"));
    }

    #[test]
    fn call_result_with_mixed_content() {
        let json = r#"{
            "content": [
                {"type": "text", "text": "part1"},
                {"type": "image", "data": "iVBORw0", "mimeType": "image/png"},
                {"type": "resource", "resource": {"uri": "weather://status", "text": "Online"}},
                {"type": "resource_link", "uri": "file:///x", "name": "x"}
            ]
        }"#;
        let result: ToolCallResult = serde_json::from_str(json).unwrap();
        assert!(!result.is_error);
        assert_eq!(
            result.content[0],
            McpToolContent::Text {
                text: "part1".into()
            }
        );
        assert!(matches!(result.content[1], McpToolContent::Image { .. }));
        assert!(matches!(result.content[2], McpToolContent::Resource { .. }));
        assert_eq!(result.content[3], McpToolContent::Unsupported);
    }

    #[test]
    fn call_result_error_flag() {
        let json = r#"{"content": [{"type": "text", "text": "not found"}], "isError": true}"#;
        let result: ToolCallResult = serde_json::from_str(json).unwrap();
        assert!(result.is_error);
    }

    #[test]
    fn resource_read_result() {
        let json = r#"{"contents": [{"uri": "weather://status", "mimeType": "text/plain", "text": "Online"}]}"#;
        let read: ResourceReadResult = serde_json::from_str(json).unwrap();
        assert_eq!(read.contents[0].text.as_deref(), Some("Online"));
        assert!(read.contents[0].blob.is_none());
    }

    #[test]
    fn resources_list_result() {
        let json = r#"{"resources": [{"uri": "sales://dashboard", "name": "Sales Dashboard", "mimeType": "application/json"}]}"#;
        let page: ResourcesListResult = serde_json::from_str(json).unwrap();
        assert_eq!(page.resources[0].name, "Sales Dashboard");
        assert!(page.resources[0].description.is_none());
        assert!(page.next_cursor.is_none());
    }
}
