//! Catalog builder: merges tool lists from many servers into one catalog.
//!
//! Each server is isolated: one that is unknown, unreachable or returns
//! garbage is logged and skipped, and the rest of the catalog is still built.

use crate::broker::{SessionBroker, with_session};
use crate::config::{DiscoveryMode, FederationSettings};
use crate::error::FederationError;
use crate::registry::ToolServerRegistry;
use crate::tool::{FunctionTool, MAX_FUNCTION_NAME_LEN, ToolDefinition};
use futures_util::future::join_all;
use std::sync::Arc;

/// Builds function-call catalogs from registered tool servers.
///
/// Holds no per-build state; clones share the registry and broker.
#[derive(Clone)]
pub struct CatalogBuilder {
    registry: Arc<ToolServerRegistry>,
    broker: Arc<dyn SessionBroker>,
    settings: FederationSettings,
}

impl CatalogBuilder {
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

    pub fn registry(&self) -> &ToolServerRegistry {
        &self.registry
    }

    /// Build the catalog for `server_ids`, in that order.
    ///
    /// Never fails. Servers that cannot be queried contribute nothing, so the
    /// result is empty when every server fails; callers that care must check.
    pub async fn build_catalog<S: AsRef<str>>(&self, server_ids: &[S]) -> Vec<FunctionTool> {
        let per_server: Vec<Vec<ToolDefinition>> = match self.settings.discovery {
            DiscoveryMode::Sequential => {
                let mut lists = Vec::with_capacity(server_ids.len());
                for id in server_ids {
                    lists.push(self.discover_or_skip(id.as_ref()).await);
                }
                lists
            }
            // join_all yields results in input order regardless of completion order
            DiscoveryMode::Concurrent => {
                join_all(server_ids.iter().map(|id| self.discover_or_skip(id.as_ref()))).await
            }
        };

        let catalog: Vec<FunctionTool> = per_server
            .into_iter()
            .flatten()
            .map(FunctionTool::from)
            .inspect(|tool| {
                if tool.name().len() > MAX_FUNCTION_NAME_LEN {
                    tracing::warn!(
                        "Tool name '{}' exceeds {MAX_FUNCTION_NAME_LEN} characters; some models will reject it",
                        tool.name()
                    );
                }
            })
            .collect();

        tracing::info!(
            "Built tool catalog with {} tools from {} requested servers",
            catalog.len(),
            server_ids.len()
        );
        catalog
    }

    /// Build the catalog for every registered server, in sorted id order.
    pub async fn build_full_catalog(&self) -> Vec<FunctionTool> {
        let ids = self.registry.server_ids();
        self.build_catalog(&ids).await
    }

    /// Fetch one server's tools, in the order the server lists them.
    pub async fn discover(&self, server_id: &str) -> Result<Vec<ToolDefinition>, FederationError> {
        let entry = self.registry.resolve(server_id)?;
        let owner = server_id.to_string();

        let infos = with_session(
            self.broker.as_ref(),
            server_id,
            entry,
            self.settings.session_timeout(),
            move |session| {
                Box::pin(async move {
                    session
                        .list_tools()
                        .await
                        .map_err(|e| FederationError::unavailable(owner, e))
                })
            },
        )
        .await?;

        let tools: Vec<ToolDefinition> = infos
            .into_iter()
            .map(|info| ToolDefinition::from_info(server_id, info))
            .collect();
        for tool in &tools {
            tracing::info!("Registered tool {}", tool.composite_name());
        }
        Ok(tools)
    }

    async fn discover_or_skip(&self, server_id: &str) -> Vec<ToolDefinition> {
        match self.discover(server_id).await {
            Ok(tools) => tools,
            Err(e) => {
                tracing::warn!("Skipping tool server '{server_id}': {e}");
                Vec::new()
            }
        }
    }
}
