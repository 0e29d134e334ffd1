//! mcp-bridge: run one integration bridge as an MCP server over STDIO
//!
//! Usage:
//!   mcp-bridge jira
//!   mcp-bridge zoom --log-level debug
//!   mcp-bridge slack --list-tools
//!
//! Connect from an MCP client config:
//!   { "command": "mcp-bridge", "args": ["confluence"] }
//!
//! Logs go to stderr; stdout carries only protocol messages.

use anyhow::{Context, Result};
use bridge_mcp::{adapter_tools, serve_stdio, Adapter, BridgeConfig, CredentialProvider, McpServer};
use clap::Parser;
use std::sync::Arc;
use tokio::io::BufReader;
use tracing::info;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "mcp-bridge", version, about = "MCP server for Jira, Confluence, Slack or Zoom")]
struct Args {
    /// Adapter to serve: jira, confluence, slack or zoom
    adapter: Adapter,

    /// Log filter (overrides RUST_LOG), e.g. "debug" or "bridge_mcp=trace"
    #[arg(long)]
    log_level: Option<String>,

    /// Secrets program used to resolve credentials (overrides BRIDGE_SECRETS_COMMAND)
    #[arg(long)]
    secrets_command: Option<String>,

    /// HTTP timeout in seconds (overrides BRIDGE_TIMEOUT_SECS)
    #[arg(long)]
    timeout_secs: Option<u64>,

    /// Print the adapter's tool definitions as JSON and exit
    #[arg(long)]
    list_tools: bool,
}

fn init_logging(level: Option<&str>) {
    let filter = match level {
        Some(level) => EnvFilter::new(level),
        None => EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
    };
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(args: &Args) -> Result<BridgeConfig> {
    let mut config = BridgeConfig::from_env().context("invalid bridge configuration")?;
    if let Some(command) = &args.secrets_command {
        config = config.with_secrets_command(command);
    }
    if let Some(secs) = args.timeout_secs {
        config = config.with_timeout_secs(secs)?;
    }
    Ok(config)
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    init_logging(args.log_level.as_deref());

    let config = load_config(&args)?;
    let provider: Arc<dyn CredentialProvider> = Arc::new(config.credential_provider());

    let server = McpServer::for_adapter(args.adapter);
    let tools = adapter_tools(args.adapter, &config, provider)
        .with_context(|| format!("failed to set up the {} adapter", args.adapter))?;
    server.register_tools(tools).await?;

    if args.list_tools {
        let tools = server.list_tools().await;
        println!("{}", serde_json::to_string_pretty(&tools)?);
        return Ok(());
    }

    info!(
        "{} v{} starting on STDIO ({} tools)",
        server.info().name,
        env!("CARGO_PKG_VERSION"),
        server.list_tools().await.len()
    );

    serve_stdio(&server, BufReader::new(tokio::io::stdin()), tokio::io::stdout()).await?;

    info!("STDIN closed, shutting down");
    Ok(())
}
