//! MCP (Model Context Protocol) tool federation.
//!
//! Discovers tools from several independent MCP servers, exposes them to an
//! LLM as one function-call catalog under collision-proof `server__tool`
//! names, and routes each call back to the server it came from. Every
//! discovery or call opens its own short-lived session over SSE or stdio.

pub mod broker;
pub mod catalog;
pub mod client;
pub mod config;
pub mod error;
pub mod jsonrpc;
pub mod registry;
pub mod router;
pub mod tool;
mod transport;

pub use broker::{BoxFuture, McpSessionBroker, SessionBroker, ToolSession, with_session};
pub use catalog::CatalogBuilder;
pub use client::{
    McpClient, McpResourceContents, McpResourceInfo, McpToolContent, McpToolInfo, McpToolResult,
};
pub use config::{DiscoveryMode, FederationSettings, ServerEndpoint, ToolServerEntry};
pub use error::{FederationError, McpError};
pub use registry::ToolServerRegistry;
pub use router::{CallRouter, ToolCallOutput};
pub use tool::{CompositeToolName, FunctionDefinition, FunctionTool, SEPARATOR, ToolDefinition};

use std::sync::Arc;

/// Catalog builder and call router sharing one registry and broker.
#[derive(Clone)]
pub struct Federation {
    pub catalog: CatalogBuilder,
    pub router: CallRouter,
}

impl Federation {
    pub fn new(
        registry: ToolServerRegistry,
        broker: Arc<dyn SessionBroker>,
        settings: FederationSettings,
    ) -> Self {
        let registry = Arc::new(registry);
        Self {
            catalog: CatalogBuilder::new(
                Arc::clone(&registry),
                Arc::clone(&broker),
                settings.clone(),
            ),
            router: CallRouter::new(registry, broker, settings),
        }
    }

    /// Federation over real MCP transports.
    pub fn with_mcp(registry: ToolServerRegistry, settings: FederationSettings) -> Self {
        Self::new(registry, Arc::new(McpSessionBroker), settings)
    }
}
