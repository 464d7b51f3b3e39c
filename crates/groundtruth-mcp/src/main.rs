//! Ground Truth MCP Server - Main entry point

use anyhow::Context;
use clap::Parser;
use groundtruth_cache::CacheSweeper;
use groundtruth_mcp::{build_engine, GroundTruthConfig, McpServer, ToolContext};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::BufReader;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Ground Truth MCP server (JSON-RPC over stdio)
#[derive(Parser, Debug)]
#[command(name = "groundtruth-mcp", version, about)]
struct Args {
    /// TOML configuration file (defaults and demo sources when omitted)
    #[arg(short, long, env = "GROUNDTRUTH_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Log to stderr; stdout carries the protocol
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();

    let config = GroundTruthConfig::load(args.config.as_deref()).with_context(|| match &args.config {
        Some(path) => format!("Failed to load config from {}", path.display()),
        None => "Invalid default config".to_string(),
    })?;

    let engine = Arc::new(build_engine(&config).context("Failed to build truth layer")?);
    let ctx = ToolContext::new(Arc::clone(&engine), config.verification.clone())
        .context("Failed to compile claim patterns")?;

    let shutdown = CancellationToken::new();

    let sweeper = CacheSweeper::new(engine.cache(), &config.cache);
    let sweeper_token = shutdown.clone();
    let sweeper_handle = tokio::spawn(async move {
        if let Err(e) = sweeper.run(sweeper_token).await {
            tracing::error!("Cache sweeper stopped: {}", e);
        }
    });

    let signal_token = shutdown.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::info!("Interrupt received");
            signal_token.cancel();
        }
    });

    let server = McpServer::new(ctx);
    let result = server
        .serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout(), shutdown.clone())
        .await;

    shutdown.cancel();
    let _ = sweeper_handle.await;

    result.context("MCP server error")
}
