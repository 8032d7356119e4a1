//! Ledger server binary
//!
//! Usage: `sft-ledger-server [config.toml]`. Without a path, configuration
//! comes from `SFT_LEDGER_*` environment variables.

use anyhow::Context;
use sft_ledger::{config::LogFormat, Config, Ledger};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = match std::env::args().nth(1) {
        Some(path) => Config::from_file(&path)
            .with_context(|| format!("loading configuration from {}", path))?,
        None => Config::from_env().context("loading configuration from environment")?,
    };

    // Initialize tracing
    let filter = tracing_subscriber::EnvFilter::from_default_env()
        .add_directive(tracing::Level::INFO.into());
    match config.log_format {
        LogFormat::Json => tracing_subscriber::fmt()
            .json()
            .with_env_filter(filter)
            .init(),
        LogFormat::Pretty => tracing_subscriber::fmt().with_env_filter(filter).init(),
    }

    tracing::info!("Starting SFT Ledger Server");

    let ledger = Ledger::open(config).await?;
    tracing::info!(live_tokens = ledger.total_supply(), "Ledger opened successfully");

    tokio::signal::ctrl_c().await?;

    if let Some(metrics) = ledger.metrics() {
        tracing::info!("Final metrics:\n{}", metrics.encode()?);
    }

    tracing::info!("Shutting down ledger server");
    ledger.shutdown().await?;
    Ok(())
}
