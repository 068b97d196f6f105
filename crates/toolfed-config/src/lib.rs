//! Multi-tier TOML configuration for toolfed.
//!
//! Reads configuration from the first source found, in precedence order:
//! explicit path > `TOOLFED_CONFIG` > project `./toolfed.toml` >
//! global `~/.toolfed/config.toml` > built-in defaults

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use thiserror::Error;
use toolfed_mcp::{FederationError, FederationSettings, ToolServerEntry, ToolServerRegistry};

/// Env var naming a config file.
pub const CONFIG_ENV: &str = "TOOLFED_CONFIG";

/// Env var overriding the global config directory.
pub const CONFIG_DIR_ENV: &str = "TOOLFED_CONFIG_DIR";

/// Project config file, looked up in the working directory.
pub const PROJECT_CONFIG_FILE: &str = "toolfed.toml";

/// Servers used when no config file names any: the four SSE tool servers of
/// the reference deployment.
pub const DEFAULT_SERVERS: &[(&str, u16)] = &[
    ("mcp-sales-crm", 8001),
    ("mcp-supply-chain", 8002),
    ("mcp-hr-policy", 8003),
    ("mcp-weather", 8004),
];

/// Errors from configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: String,
        source: std::io::Error,
    },

    #[error("Config file parse error at {path}: {message}")]
    Parse { path: String, message: String },

    #[error("Invalid server configuration: {0}")]
    InvalidServer(#[from] FederationError),
}

/// Settings that can be read from a TOML config file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SettingsFile {
    #[serde(default)]
    pub federation: FederationSettings,
    /// Absent means "use the defaults"; an empty table means no servers.
    #[serde(default)]
    pub servers: Option<BTreeMap<String, ToolServerEntry>>,
}

/// Where the resolved configuration came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    File(PathBuf),
    Defaults,
}

/// Candidate config locations, highest precedence first.
#[derive(Debug, Clone, Default)]
pub struct ConfigPaths {
    /// `--config` on the command line.
    pub explicit: Option<PathBuf>,
    /// `TOOLFED_CONFIG`.
    pub env: Option<PathBuf>,
    pub project: Option<PathBuf>,
    pub global: Option<PathBuf>,
}

impl ConfigPaths {
    /// The standard locations, with `explicit` on top.
    pub fn discover(explicit: Option<PathBuf>) -> Self {
        Self {
            explicit,
            env: std::env::var_os(CONFIG_ENV).map(PathBuf::from),
            project: Some(PathBuf::from(PROJECT_CONFIG_FILE)),
            global: Some(config_dir().join("config.toml")),
        }
    }
}

/// Resolved federation configuration.
#[derive(Debug, Clone)]
pub struct FederationConfig {
    pub settings: FederationSettings,
    pub servers: BTreeMap<String, ToolServerEntry>,
    pub source: ConfigSource,
}

impl FederationConfig {
    /// Load configuration from the standard locations.
    ///
    /// Precedence (highest to lowest):
    /// 1. `explicit` (the `--config` flag)
    /// 2. `TOOLFED_CONFIG`
    /// 3. Project config (./toolfed.toml)
    /// 4. Global config (~/.toolfed/config.toml)
    /// 5. Defaults
    pub fn load(explicit: Option<PathBuf>) -> Result<Self, ConfigError> {
        Self::load_from(&ConfigPaths::discover(explicit))
    }

    /// Load from the given candidates. The first file that exists wins.
    ///
    /// Explicitly named files (flag or env var) must exist and parse.
    /// Implicit ones that fail to parse are logged and skipped.
    pub fn load_from(paths: &ConfigPaths) -> Result<Self, ConfigError> {
        if let Some(path) = paths.explicit.as_ref().or(paths.env.as_ref()) {
            let settings = read_settings_file(path)?;
            return Ok(Self::from_settings(settings, ConfigSource::File(path.clone())));
        }

        for path in [&paths.project, &paths.global].into_iter().flatten() {
            if !path.is_file() {
                continue;
            }
            match read_settings_file(path) {
                Ok(settings) => {
                    return Ok(Self::from_settings(
                        settings,
                        ConfigSource::File(path.clone()),
                    ));
                }
                Err(e) => tracing::warn!("Ignoring config file: {e}"),
            }
        }

        Ok(Self::defaults())
    }

    /// Built-in defaults: the reference servers on localhost.
    pub fn defaults() -> Self {
        Self {
            settings: FederationSettings::default(),
            servers: default_servers(),
            source: ConfigSource::Defaults,
        }
    }

    fn from_settings(file: SettingsFile, source: ConfigSource) -> Self {
        let servers = file.servers.unwrap_or_else(default_servers);
        if servers.is_empty() {
            tracing::warn!("No tool servers configured");
        }
        Self {
            settings: file.federation,
            servers,
            source,
        }
    }

    /// Validate the server ids into a registry.
    pub fn registry(&self) -> Result<ToolServerRegistry, ConfigError> {
        let registry = ToolServerRegistry::from_entries(
            self.servers
                .iter()
                .map(|(id, entry)| (id.clone(), entry.clone())),
        )?;
        Ok(registry)
    }
}

fn default_servers() -> BTreeMap<String, ToolServerEntry> {
    DEFAULT_SERVERS
        .iter()
        .map(|(id, port)| {
            (
                id.to_string(),
                ToolServerEntry::sse(format!("http://localhost:{port}/sse")),
            )
        })
        .collect()
}

/// Get the toolfed config directory path (~/.toolfed/).
pub fn config_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(CONFIG_DIR_ENV) {
        return PathBuf::from(dir);
    }
    dirs_next::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".toolfed")
}

/// Read and parse a TOML settings file.
pub fn read_settings_file(path: &Path) -> Result<SettingsFile, ConfigError> {
    let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.display().to_string(),
        source,
    })?;
    toml::from_str(&content).map_err(|e| ConfigError::Parse {
        path: path.display().to_string(),
        message: e.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;
    use toolfed_mcp::{DiscoveryMode, ServerEndpoint};

    fn write(dir: &TempDir, name: &str, content: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    #[test]
    fn test_defaults_are_reference_servers() {
        let config = FederationConfig::defaults();
        assert_eq!(config.source, ConfigSource::Defaults);
        assert_eq!(config.servers.len(), 4);
        assert_eq!(
            config.servers["mcp-weather"].endpoint,
            ServerEndpoint::Sse {
                url: "http://localhost:8004/sse".into()
            }
        );
        assert_eq!(config.settings.session_timeout_ms, 60000);
        assert_eq!(config.settings.discovery, DiscoveryMode::Concurrent);
    }

    #[test]
    fn test_no_files_gives_defaults() {
        let dir = TempDir::new().unwrap();
        let paths = ConfigPaths {
            project: Some(dir.path().join("toolfed.toml")),
            global: Some(dir.path().join("config.toml")),
            ..ConfigPaths::default()
        };
        let config = FederationConfig::load_from(&paths).unwrap();
        assert_eq!(config.source, ConfigSource::Defaults);
    }

    #[test]
    fn test_settings_toml_parse() {
        let toml_str = r#"
[federation]
session_timeout_ms = 5000
discovery = "sequential"

[servers.mcp-weather]
url = "http://localhost:8004/sse"
timeout_ms = 10000

[servers.local-hr]
command = "toolfed-demo-server"
args = ["hr-policy"]
env = { RUST_LOG = "warn" }
"#;
        let settings: SettingsFile = toml::from_str(toml_str).unwrap();
        assert_eq!(settings.federation.session_timeout_ms, 5000);
        assert_eq!(settings.federation.discovery, DiscoveryMode::Sequential);

        let servers = settings.servers.unwrap();
        assert_eq!(servers["mcp-weather"].timeout_ms, 10000);
        match &servers["local-hr"].endpoint {
            ServerEndpoint::Stdio { command, args, env } => {
                assert_eq!(command, "toolfed-demo-server");
                assert_eq!(args, &vec!["hr-policy".to_string()]);
                assert_eq!(env["RUST_LOG"], "warn");
            }
            other => panic!("Expected stdio endpoint, got {other:?}"),
        }
        assert_eq!(servers["local-hr"].timeout_ms, 30000);
    }

    #[test]
    fn test_explicit_file_wins() {
        let dir = TempDir::new().unwrap();
        let explicit = write(&dir, "explicit.toml", "[servers.a]\nurl = \"http://a/sse\"\n");
        let project = write(&dir, "toolfed.toml", "[servers.b]\nurl = \"http://b/sse\"\n");
        let paths = ConfigPaths {
            explicit: Some(explicit.clone()),
            project: Some(project),
            ..ConfigPaths::default()
        };
        let config = FederationConfig::load_from(&paths).unwrap();
        assert_eq!(config.source, ConfigSource::File(explicit));
        assert!(config.servers.contains_key("a"));
        assert!(!config.servers.contains_key("b"));
    }

    #[test]
    fn test_env_file_beats_project_and_global() {
        let dir = TempDir::new().unwrap();
        let env = write(&dir, "env.toml", "[servers.from-env]\nurl = \"http://e/sse\"\n");
        let project = write(&dir, "toolfed.toml", "[servers.b]\nurl = \"http://b/sse\"\n");
        let paths = ConfigPaths {
            env: Some(env),
            project: Some(project),
            ..ConfigPaths::default()
        };
        let config = FederationConfig::load_from(&paths).unwrap();
        assert_eq!(
            config.servers.keys().collect::<Vec<_>>(),
            vec!["from-env"]
        );
    }

    #[test]
    fn test_project_beats_global() {
        let dir = TempDir::new().unwrap();
        let project = write(&dir, "toolfed.toml", "[servers.proj]\nurl = \"http://p/sse\"\n");
        let global = write(&dir, "config.toml", "[servers.glob]\nurl = \"http://g/sse\"\n");
        let paths = ConfigPaths {
            project: Some(project.clone()),
            global: Some(global),
            ..ConfigPaths::default()
        };
        let config = FederationConfig::load_from(&paths).unwrap();
        assert_eq!(config.source, ConfigSource::File(project));
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let dir = TempDir::new().unwrap();
        let paths = ConfigPaths {
            explicit: Some(dir.path().join("nope.toml")),
            ..ConfigPaths::default()
        };
        assert!(matches!(
            FederationConfig::load_from(&paths),
            Err(ConfigError::Read { .. })
        ));
    }

    #[test]
    fn test_broken_explicit_file_is_error() {
        let dir = TempDir::new().unwrap();
        let explicit = write(&dir, "bad.toml", "[servers\nurl = ");
        let paths = ConfigPaths {
            explicit: Some(explicit),
            ..ConfigPaths::default()
        };
        assert!(matches!(
            FederationConfig::load_from(&paths),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_broken_project_file_falls_through() {
        let dir = TempDir::new().unwrap();
        let project = write(&dir, "toolfed.toml", "not = [valid");
        let global = write(&dir, "config.toml", "[servers.glob]\nurl = \"http://g/sse\"\n");
        let paths = ConfigPaths {
            project: Some(project),
            global: Some(global.clone()),
            ..ConfigPaths::default()
        };
        let config = FederationConfig::load_from(&paths).unwrap();
        assert_eq!(config.source, ConfigSource::File(global));
    }

    #[test]
    fn test_file_without_servers_keeps_default_servers() {
        let dir = TempDir::new().unwrap();
        let explicit = write(&dir, "c.toml", "[federation]\ndiscovery = \"sequential\"\n");
        let paths = ConfigPaths {
            explicit: Some(explicit),
            ..ConfigPaths::default()
        };
        let config = FederationConfig::load_from(&paths).unwrap();
        assert_eq!(config.settings.discovery, DiscoveryMode::Sequential);
        assert_eq!(config.servers.len(), DEFAULT_SERVERS.len());
    }

    #[test]
    fn test_empty_servers_table_means_no_servers() {
        let dir = TempDir::new().unwrap();
        let explicit = write(&dir, "c.toml", "[servers]\n");
        let paths = ConfigPaths {
            explicit: Some(explicit),
            ..ConfigPaths::default()
        };
        let config = FederationConfig::load_from(&paths).unwrap();
        assert!(config.servers.is_empty());
        assert!(config.registry().unwrap().is_empty());
    }

    #[test]
    fn test_registry_rejects_separator_in_id() {
        let toml_str = "[servers.bad__id]\nurl = \"http://x/sse\"\n";
        let settings: SettingsFile = toml::from_str(toml_str).unwrap();
        let config = FederationConfig::from_settings(settings, ConfigSource::Defaults);
        assert!(matches!(
            config.registry(),
            Err(ConfigError::InvalidServer(
                FederationError::InvalidServerId { .. }
            ))
        ));
    }

    #[test]
    fn test_registry_from_defaults() {
        let registry = FederationConfig::defaults().registry().unwrap();
        assert_eq!(
            registry.server_ids(),
            vec![
                "mcp-hr-policy",
                "mcp-sales-crm",
                "mcp-supply-chain",
                "mcp-weather"
            ]
        );
    }
}
