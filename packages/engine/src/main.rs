// packages/engine/src/main.rs
//! srProxy bridge
//!
//! Reads host agent events from stdin, one JSON object per line, and
//! answers each on stdout. Logs go to stderr.

use anyhow::{Context, Result};
use clap::Parser;
use srproxy_engine::observability::init_tracing;
use srproxy_engine::{Bridge, BuildInfo, EngineConfig};
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "srproxy")]
#[command(author, version, about = "Redirects recognized game endpoints to a custom server")]
struct Args {
    /// Configuration file path (TOML, JSON or YAML)
    #[arg(short, long, env = "SRPROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the config file
    #[arg(long)]
    log_level: Option<String>,

    /// Output logs as JSON
    #[arg(long)]
    json_logs: bool,

    /// Print the default configuration and exit
    #[arg(long)]
    print_config: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    if args.print_config {
        print!("{}", EngineConfig::example());
        return Ok(());
    }

    // Load configuration
    let mut config = EngineConfig::load_from(args.config.as_deref()).with_context(|| {
        format!(
            "Failed to load configuration{}",
            args.config
                .as_ref()
                .map(|p| format!(" from {}", p.display()))
                .unwrap_or_default()
        )
    })?;

    if let Some(level) = args.log_level {
        config.logging.level = level;
    }
    if args.json_logs {
        config.logging.json = true;
    }

    init_tracing(&config.logging)?;

    let build = BuildInfo::current();
    info!(
        version = build.version,
        git_hash = build.git_hash,
        target_package = %config.module.target_package,
        "Starting srProxy bridge"
    );

    let mut bridge = Bridge::new(config);
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = tokio::io::stdout();

    while let Some(line) = lines.next_line().await.context("Failed to read from stdin")? {
        if line.trim().is_empty() {
            continue;
        }

        let reply = bridge.handle_line(&line);
        stdout.write_all(reply.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }

    info!("Host agent disconnected, shutting down");
    Ok(())
}
