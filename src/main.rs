use std::env;
use std::path::Path;
use std::sync::Arc;

use anyhow::Context;
use tracing::info;
use tracing_subscriber::EnvFilter;

use claude_history_mcp::config::Config;
use claude_history_mcp::mcp::run_stdio;
use claude_history_mcp::search::SearchEngine;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the protocol
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let config = match env::args().nth(1) {
        Some(path) => Config::load_from_path(Path::new(&path))
            .with_context(|| format!("loading config from {path}"))?,
        None => Config::default(),
    };

    let engine = Arc::new(SearchEngine::from_config(&config));
    info!(root = %engine.paths().root.display(), "claude-history-mcp starting");

    run_stdio(engine).await?;
    Ok(())
}
