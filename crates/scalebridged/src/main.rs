//! scalebridged — KEDA external push scaler driven by HTTP events.
//!
//! # Usage
//!
//! ```text
//! scalebridged --config config.yaml -v 1
//! ```

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;

use scalebridged::{Bridge, BridgeConfig, telemetry};

#[derive(Parser)]
#[command(name = "scalebridged", about = "KEDA external push scaler driven by HTTP events")]
struct Cli {
    /// Path to the config file (YAML, or TOML with a .toml extension).
    #[arg(long)]
    config: PathBuf,

    /// Log verbosity: 0 = info, 1 = debug, 2+ = trace.
    #[arg(short = 'v', long = "log-level", default_value = "0")]
    log_level: u8,

    /// Emit logs as JSON.
    #[arg(long)]
    log_json: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    telemetry::init(cli.log_level, cli.log_json);

    let config = BridgeConfig::from_file(&cli.config)
        .with_context(|| format!("load config from {}", cli.config.display()))?;
    info!(
        grpc_port = config.grpc_port,
        http_port = config.http_port,
        metric = %config.default.metric_name,
        target_size = config.default.target_size,
        "scalebridge starting"
    );

    let bridge = Bridge::bind(&config).await?;

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    tokio::spawn(async move {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install CTRL+C handler");
        let _ = shutdown_tx.send(true);
    });

    bridge.serve(shutdown_rx).await?;

    info!("scalebridge stopped");
    Ok(())
}
