//! Tool server registry: server id to endpoint, fixed for the process lifetime.

use crate::config::ToolServerEntry;
use crate::error::FederationError;
use crate::tool::SEPARATOR;
use std::collections::HashMap;

/// Maps short server identifiers to connection settings.
///
/// Identifiers are validated on registration so that every composite tool
/// name built from them splits back unambiguously.
#[derive(Debug, Clone, Default)]
pub struct ToolServerRegistry {
    servers: HashMap<String, ToolServerEntry>,
}

impl ToolServerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from `(id, entry)` pairs, rejecting the first invalid id.
    pub fn from_entries<I, S>(entries: I) -> Result<Self, FederationError>
    where
        I: IntoIterator<Item = (S, ToolServerEntry)>,
        S: Into<String>,
    {
        let mut registry = Self::new();
        for (id, entry) in entries {
            registry.register(id, entry)?;
        }
        Ok(registry)
    }

    /// Add a server. Ids must be non-empty and unique. They may not contain
    /// the `__` separator or end in `_`, since `svc_` + `__` + `ping` would
    /// split back as `svc` + `_ping`.
    pub fn register(
        &mut self,
        server_id: impl Into<String>,
        entry: ToolServerEntry,
    ) -> Result<(), FederationError> {
        let server_id = server_id.into();
        let invalid = |reason: &str| FederationError::InvalidServerId {
            server: server_id.clone(),
            reason: reason.to_string(),
        };

        if server_id.is_empty() {
            return Err(invalid("identifier is empty"));
        }
        if server_id.contains(SEPARATOR) {
            return Err(invalid("identifier must not contain '__'"));
        }
        if server_id.ends_with('_') {
            return Err(invalid("identifier must not end with '_'"));
        }
        if self.servers.contains_key(&server_id) {
            return Err(invalid("identifier is already registered"));
        }

        self.servers.insert(server_id, entry);
        Ok(())
    }

    /// Builder form of [`register`](Self::register).
    pub fn with_server(
        mut self,
        server_id: impl Into<String>,
        entry: ToolServerEntry,
    ) -> Result<Self, FederationError> {
        self.register(server_id, entry)?;
        Ok(self)
    }

    /// Look up a server's connection settings.
    pub fn resolve(&self, server_id: &str) -> Result<&ToolServerEntry, FederationError> {
        self.servers
            .get(server_id)
            .ok_or_else(|| FederationError::UnknownServer {
                server: server_id.to_string(),
            })
    }

    /// All registered ids, sorted.
    pub fn server_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self.servers.keys().cloned().collect();
        ids.sort();
        ids
    }

    pub fn len(&self) -> usize {
        self.servers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.servers.is_empty()
    }
}
