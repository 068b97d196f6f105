use anyhow::Context;
use clap::Parser;
use clap::builder::PossibleValuesParser;
use std::io;
use toolfed_demo::{DemoServer, profiles};

/// Serve one demo tool profile over stdio.
#[derive(Parser, Debug)]
#[command(name = "toolfed-demo-server", version, about)]
struct Cli {
    /// Profile to serve
    #[arg(value_parser = PossibleValuesParser::new(profiles::PROFILE_NAMES))]
    profile: String,

    /// Log at debug level on stderr
    #[arg(long, short)]
    verbose: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout is the protocol channel; logs must stay on stderr.
    let log_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with_writer(io::stderr)
        .init();

    let profile = profiles::by_name(&cli.profile)
        .with_context(|| format!("Unknown profile '{}'", cli.profile))?;
    let stdin = tokio::io::BufReader::new(tokio::io::stdin());
    DemoServer::new(profile)
        .serve(stdin, tokio::io::stdout())
        .await
        .context("stdio transport failed")
}
