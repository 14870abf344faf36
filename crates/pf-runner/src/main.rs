//! # pf-runner
//!
//! Host process for the trending feed client.
//!
//! Loads an optional JSON configuration file, starts one stream client, and
//! logs every state snapshot until Ctrl+C.
//!
//! # Usage
//!
//! ```bash
//! pf-runner config.json --log-level info
//! ```

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use pf_core::config::{AppConfig, load_config};
use pf_stream::{StateObserver, StreamClient};
use tracing::{info, warn};

/// Trending feed stream client.
#[derive(Parser)]
#[command(name = "pf-runner", about = "Trending feed stream client")]
struct Cli {
    /// Configuration file path (JSON). Defaults apply when omitted.
    config: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error).
    #[arg(short, long, default_value = "info")]
    log_level: String,

    /// Optional log directory for file output.
    #[arg(long)]
    log_dir: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // 1. Load configuration
    let config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };

    // 2. Initialize logging
    let log_dir = cli.log_dir.clone().or_else(|| config.log_path());
    pf_core::logging::init_logging(&cli.log_level, log_dir.as_deref(), &config.module_name());

    info!(
        "pf-runner starting — url={}, topic={}, chain_id={}",
        config.feed.url, config.feed.topic, config.feed.chain_id
    );

    // 3. Start the stream client
    let (mut client, observer) = StreamClient::connect(config.feed)?;
    let reporter = tokio::spawn(report(observer));

    // 4. Wait for shutdown signal
    tokio::signal::ctrl_c().await?;
    info!("shutdown signal received");

    // 5. Stop gracefully
    client.stop().await;
    reporter.abort();
    info!("stream client stopped — goodbye");
    Ok(())
}

/// Log each snapshot the client publishes.
async fn report(mut observer: StateObserver) {
    while let Ok(state) = observer.next().await {
        match (&state.last_error, state.connected) {
            (Some(err), false) => warn!("disconnected — last error: {err}"),
            (_, false) => warn!("disconnected"),
            (_, true) => {
                let top: Vec<&str> = state.records.iter().take(5).map(|r| r.base_symbol.as_str()).collect();
                info!("connected — {} record(s), top: {}", state.records.len(), top.join(", "));
            }
        }
    }
}
