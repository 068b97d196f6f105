//! Tool definitions, composite names and the function-call catalog format.
//!
//! A tool from server `svc-a` named `ping` is exposed to the model as
//! `svc-a__ping`, so identically-named tools from different servers never
//! collide in one catalog.

use crate::client::McpToolInfo;
use crate::error::FederationError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Separator between the server id and the tool name.
pub const SEPARATOR: &str = "__";

/// Function names longer than this are rejected by common tool-calling APIs.
pub const MAX_FUNCTION_NAME_LEN: usize = 64;

/// A `(server, tool)` pair and its `server__tool` rendering.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CompositeToolName {
    server_id: String,
    tool_name: String,
}

impl CompositeToolName {
    pub fn new(server_id: impl Into<String>, tool_name: impl Into<String>) -> Self {
        Self {
            server_id: server_id.into(),
            tool_name: tool_name.into(),
        }
    }

    /// Split on the first separator.
    ///
    /// Server ids never contain the separator, so everything after the first
    /// `__` is the tool name, even if it contains `__` itself.
    pub fn parse(composite: &str) -> Result<Self, FederationError> {
        match composite.split_once(SEPARATOR) {
            Some((server, tool)) if !server.is_empty() && !tool.is_empty() => {
                Ok(Self::new(server, tool))
            }
            _ => Err(FederationError::InvalidToolName {
                name: composite.to_string(),
            }),
        }
    }

    pub fn server_id(&self) -> &str {
        &self.server_id
    }

    pub fn tool_name(&self) -> &str {
        &self.tool_name
    }
}

impl fmt::Display for CompositeToolName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{SEPARATOR}{}", self.server_id, self.tool_name)
    }
}

/// A tool as discovered from one origin server.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDefinition {
    pub server_id: String,
    pub name: String,
    pub description: String,
    pub input_schema: serde_json::Value,
}

impl ToolDefinition {
    pub fn from_info(server_id: &str, info: McpToolInfo) -> Self {
        Self {
            server_id: server_id.to_string(),
            name: info.name,
            description: info.description,
            input_schema: info.input_schema,
        }
    }

    pub fn composite_name(&self) -> CompositeToolName {
        CompositeToolName::new(&self.server_id, &self.name)
    }
}

/// The `type` tag of a catalog entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ToolType {
    #[default]
    Function,
}

/// One catalog entry: `{"type": "function", "function": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionTool {
    #[serde(rename = "type")]
    pub tool_type: ToolType,
    pub function: FunctionDefinition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    /// The origin server's input schema, verbatim.
    pub parameters: serde_json::Value,
}

impl FunctionTool {
    pub fn name(&self) -> &str {
        &self.function.name
    }
}

impl From<ToolDefinition> for FunctionTool {
    fn from(def: ToolDefinition) -> Self {
        let name = def.composite_name().to_string();
        Self {
            tool_type: ToolType::Function,
            function: FunctionDefinition {
                name,
                description: def.description,
                parameters: def.input_schema,
            },
        }
    }
}
