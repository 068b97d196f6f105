//! Call router: sends a composite-named tool call to its origin server.

use crate::broker::{SessionBroker, with_session};
use crate::client::McpToolContent;
use crate::config::FederationSettings;
use crate::error::FederationError;
use crate::registry::ToolServerRegistry;
use crate::tool::CompositeToolName;
use serde::Serialize;
use std::sync::Arc;

/// Text result of a tool call in the shape an LLM tool loop feeds back.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ToolCallOutput {
    pub text: String,
    pub is_error: bool,
}

/// Routes tool calls. Every call is independent and opens its own session.
#[derive(Clone)]
pub struct CallRouter {
    registry: Arc<ToolServerRegistry>,
    broker: Arc<dyn SessionBroker>,
    settings: FederationSettings,
}

impl CallRouter {
    pub fn new(
        registry: Arc<ToolServerRegistry>,
        broker: Arc<dyn SessionBroker>,
        settings: FederationSettings,
    ) -> Self {
        Self {
            registry,
            broker,
            settings,
        }
    }

    /// Invoke `composite` with `arguments` and return the text the tool produced.
    ///
    /// A malformed name is rejected before any connection is attempted.
    /// No retries happen here.
    pub async fn invoke(
        &self,
        composite: &str,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> Result<String, FederationError> {
        let name = CompositeToolName::parse(composite)?;
        let entry = self.registry.resolve(name.server_id())?;

        tracing::debug!("Routing {composite} to '{}'", name.server_id());

        let server = name.server_id().to_string();
        let tool = name.tool_name().to_string();
        let result = with_session(
            self.broker.as_ref(),
            name.server_id(),
            entry,
            self.settings.session_timeout(),
            move |session| {
                Box::pin(async move {
                    session
                        .call_tool(&tool, serde_json::Value::Object(arguments))
                        .await
                        .map_err(|e| FederationError::from_call(&server, &tool, e))
                })
            },
        )
        .await?;

        let text = text_content(result.content);
        if result.is_error {
            return Err(FederationError::RemoteToolError {
                server: name.server_id().to_string(),
                tool: name.tool_name().to_string(),
                message: text,
            });
        }
        Ok(text)
    }

    /// Invoke with the raw JSON argument string a model emits.
    ///
    /// An empty string means no arguments. Anything that is not a JSON object
    /// is rejected without contacting the server. The name is checked before
    /// the arguments.
    pub async fn invoke_json(
        &self,
        composite: &str,
        raw_arguments: &str,
    ) -> Result<String, FederationError> {
        CompositeToolName::parse(composite)?;
        let arguments = parse_arguments(composite, raw_arguments)?;
        self.invoke(composite, arguments).await
    }

    /// Like [`invoke_json`](Self::invoke_json), but failures become an error
    /// text so the tool loop can hand them back to the model.
    pub async fn invoke_for_llm(&self, composite: &str, raw_arguments: &str) -> ToolCallOutput {
        match self.invoke_json(composite, raw_arguments).await {
            Ok(text) => ToolCallOutput {
                text,
                is_error: false,
            },
            Err(e) => {
                tracing::warn!("Tool call {composite} failed: {e}");
                ToolCallOutput {
                    text: format!("Error executing tool '{composite}': {e}"),
                    is_error: true,
                }
            }
        }
    }
}

fn parse_arguments(
    composite: &str,
    raw: &str,
) -> Result<serde_json::Map<String, serde_json::Value>, FederationError> {
    let invalid = |message: String| FederationError::InvalidArguments {
        name: composite.to_string(),
        message,
    };

    if raw.trim().is_empty() {
        return Ok(serde_json::Map::new());
    }
    match serde_json::from_str::<serde_json::Value>(raw) {
        Ok(serde_json::Value::Object(map)) => Ok(map),
        Ok(serde_json::Value::Null) => Ok(serde_json::Map::new()),
        Ok(other) => Err(invalid(format!("expected a JSON object, got {other}"))),
        Err(e) => Err(invalid(e.to_string())),
    }
}

/// Join the text items with newlines; other content kinds are dropped.
fn text_content(content: Vec<McpToolContent>) -> String {
    let total = content.len();
    let texts: Vec<String> = content
        .into_iter()
        .filter_map(|item| match item {
            McpToolContent::Text { text } => Some(text),
            _ => None,
        })
        .collect();

    if texts.len() < total {
        tracing::debug!("Dropped {} non-text content items", total - texts.len());
    }
    texts.join("\n")
}
