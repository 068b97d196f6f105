//! toolfed CLI: inspect and drive a federation of MCP tool servers.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand, ValueEnum};
use std::io;
use std::path::PathBuf;
use toolfed_config::{ConfigSource, FederationConfig};
use toolfed_mcp::{Federation, McpClient, ToolServerRegistry};

#[derive(Parser)]
#[command(
    name = "toolfed",
    version,
    about = "Federate tools from several MCP servers into one catalog"
)]
struct Cli {
    /// Config file (overrides TOOLFED_CONFIG and the default locations)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Enable verbose/debug logging
    #[arg(long, global = true)]
    verbose: bool,

    /// Log output format
    #[arg(long, global = true, value_enum, default_value_t = LogFormat::Text)]
    log_format: LogFormat,

    #[command(subcommand)]
    command: Command,
}

#[derive(Clone, Copy, PartialEq, Eq, ValueEnum)]
enum LogFormat {
    Text,
    Json,
}

#[derive(Subcommand)]
enum Command {
    /// List the registered tool servers
    Servers,

    /// Build the tool catalog and print it as JSON
    Catalog {
        /// Servers to include, in order (default: all registered servers)
        servers: Vec<String>,
    },

    /// Invoke a tool by its composite name (<server>__<tool>)
    Invoke {
        name: String,

        /// Arguments as a JSON object
        #[arg(long, default_value = "{}")]
        args: String,

        /// Print the {text, is_error} result object instead of plain text
        #[arg(long)]
        json: bool,
    },

    /// List a server's resources
    Resources { server: String },

    /// Print the contents of one resource
    ReadResource { server: String, uri: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose, cli.log_format);

    let config = FederationConfig::load(cli.config).context("Failed to load configuration")?;
    if let ConfigSource::File(path) = &config.source {
        tracing::debug!("Using config {}", path.display());
    }
    let registry = config.registry().context("Invalid tool server configuration")?;

    match cli.command {
        Command::Servers => {
            print_servers(&config);
            Ok(())
        }
        Command::Catalog { servers } => {
            let fed = Federation::with_mcp(registry, config.settings);
            let catalog = if servers.is_empty() {
                fed.catalog.build_full_catalog().await
            } else {
                fed.catalog.build_catalog(&servers).await
            };
            if catalog.is_empty() {
                tracing::warn!("No tools discovered");
            }
            println!("{}", serde_json::to_string_pretty(&catalog)?);
            Ok(())
        }
        Command::Invoke { name, args, json } => {
            let fed = Federation::with_mcp(registry, config.settings);
            if json {
                let output = fed.router.invoke_for_llm(&name, &args).await;
                println!("{}", serde_json::to_string_pretty(&output)?);
                if output.is_error {
                    std::process::exit(1);
                }
                return Ok(());
            }
            let text = fed
                .router
                .invoke_json(&name, &args)
                .await
                .with_context(|| format!("Tool call {name} failed"))?;
            println!("{text}");
            Ok(())
        }
        Command::Resources { server } => {
            let client = connect(&registry, &server, &config).await?;
            let result = client.list_resources().await;
            client.shutdown().await;
            let resources =
                result.with_context(|| format!("Failed to list resources of '{server}'"))?;
            for resource in resources {
                match resource.description {
                    Some(desc) => println!("{}\t{}\t{desc}", resource.uri, resource.name),
                    None => println!("{}\t{}", resource.uri, resource.name),
                }
            }
            Ok(())
        }
        Command::ReadResource { server, uri } => {
            let client = connect(&registry, &server, &config).await?;
            let result = client.read_resource(&uri).await;
            client.shutdown().await;
            let contents = result.with_context(|| format!("Failed to read {uri}"))?;
            for part in contents {
                match (part.text, part.blob) {
                    (Some(text), _) => println!("{text}"),
                    (None, Some(blob)) => println!(
                        "[binary {} ({} base64 bytes)]",
                        part.mime_type.as_deref().unwrap_or("application/octet-stream"),
                        blob.len()
                    ),
                    (None, None) => {}
                }
            }
            Ok(())
        }
    }
}

fn init_logging(verbose: bool, format: LogFormat) {
    let log_level = if verbose { "debug" } else { "warn" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level));

    match format {
        LogFormat::Text => tracing_subscriber::fmt()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init(),
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .with_writer(io::stderr)
            .init(),
    }
}

fn print_servers(config: &FederationConfig) {
    match &config.source {
        ConfigSource::File(path) => eprintln!("Config: {}", path.display()),
        ConfigSource::Defaults => eprintln!("Config: built-in defaults"),
    }
    let width = config.servers.keys().map(|id| id.len()).max().unwrap_or(0);
    for (id, entry) in &config.servers {
        println!(
            "{id:<width$}  {}  (timeout {}ms)",
            entry.endpoint, entry.timeout_ms
        );
    }
}

/// One session for the resource commands, bounded by the session timeout.
async fn connect(
    registry: &ToolServerRegistry,
    server: &str,
    config: &FederationConfig,
) -> Result<McpClient> {
    let entry = registry.resolve(server)?;
    let timeout = config.settings.session_timeout();
    match tokio::time::timeout(timeout, McpClient::connect(server, entry)).await {
        Ok(client) => client.with_context(|| format!("Failed to connect to '{server}'")),
        Err(_) => bail!(
            "Timed out connecting to '{server}' after {}ms",
            timeout.as_millis()
        ),
    }
}
