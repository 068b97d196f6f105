//! Configuration types for tool servers and federation behavior.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

fn default_timeout() -> u64 {
    30000
}

fn default_session_timeout() -> u64 {
    60000
}

/// Connection settings for one registered tool server.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolServerEntry {
    #[serde(flatten)]
    pub endpoint: ServerEndpoint,
    /// Timeout for each request in milliseconds (default: 30000).
    #[serde(default = "default_timeout")]
    pub timeout_ms: u64,
}

impl ToolServerEntry {
    pub fn new(endpoint: ServerEndpoint) -> Self {
        Self {
            endpoint,
            timeout_ms: default_timeout(),
        }
    }

    pub fn sse(url: impl Into<String>) -> Self {
        Self::new(ServerEndpoint::Sse { url: url.into() })
    }

    pub fn stdio(command: impl Into<String>, args: Vec<String>) -> Self {
        Self::new(ServerEndpoint::Stdio {
            command: command.into(),
            args,
            env: HashMap::new(),
        })
    }

    pub fn with_timeout_ms(mut self, timeout_ms: u64) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }
}

/// Where a tool server lives and how to reach it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ServerEndpoint {
    /// HTTP event stream: `GET url` opens the stream, messages are POSTed to
    /// the URL announced by the server's `endpoint` event.
    Sse { url: String },
    /// Child process speaking newline-delimited JSON-RPC on stdin/stdout.
    Stdio {
        command: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default)]
        env: HashMap<String, String>,
    },
}

impl fmt::Display for ServerEndpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sse { url } => write!(f, "{url}"),
            Self::Stdio { command, args, .. } if args.is_empty() => write!(f, "stdio: {command}"),
            Self::Stdio { command, args, .. } => write!(f, "stdio: {command} {}", args.join(" ")),
        }
    }
}

/// How the catalog builder visits servers.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscoveryMode {
    /// One server after another.
    Sequential,
    /// All servers at once; the catalog keeps the requested order.
    #[default]
    Concurrent,
}

/// Settings shared by the catalog builder and the call router.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FederationSettings {
    /// Upper bound on one session, handshake included (default: 60000).
    #[serde(default = "default_session_timeout")]
    pub session_timeout_ms: u64,
    #[serde(default)]
    pub discovery: DiscoveryMode,
}

impl FederationSettings {
    pub fn session_timeout(&self) -> Duration {
        Duration::from_millis(self.session_timeout_ms)
    }
}

impl Default for FederationSettings {
    fn default() -> Self {
        Self {
            session_timeout_ms: default_session_timeout(),
            discovery: DiscoveryMode::default(),
        }
    }
}
