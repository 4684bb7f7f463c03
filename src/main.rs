//! DexMail API server.
//!
//! ```text
//!   web client ──▶ http (axum) ──▶ auth / mail / claim / wallets
//!                                        │          │
//!                                        ▼          ▼
//!                                   ipfs (Pinata)  blockchain (mailer contract)
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use clap::Parser;
use tokio::net::TcpListener;

use dexmail::config::{load_config, DexmailConfig};
use dexmail::lifecycle::{bootstrap, run_flusher, signals, Shutdown};
use dexmail::observability::{logging, metrics};
use dexmail::HttpServer;

#[derive(Parser, Debug)]
#[command(name = "dexmail", version, about = "DexMail API server")]
struct Args {
    /// Path to the TOML configuration file. Defaults apply when omitted.
    #[arg(short, long)]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match &args.config {
        Some(path) => load_config(path)?,
        None => DexmailConfig::default(),
    };

    logging::init_logging(&config.observability);
    tracing::info!(version = env!("CARGO_PKG_VERSION"), "dexmail starting");
    tracing::info!(
        bind_address = %config.listener.bind_address,
        request_timeout_secs = config.timeouts.request_secs,
        blockchain = config.blockchain.enabled,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let state = bootstrap(config).await?;
    let server = HttpServer::new(state.clone());

    let shutdown = Arc::new(Shutdown::new());
    signals::spawn_signal_listener(shutdown.clone());
    let flusher = tokio::spawn(run_flusher(
        state.clone(),
        Duration::from_secs(state.config.storage.flush_interval_secs),
        shutdown.subscribe(),
    ));
    server.run(listener, shutdown.subscribe()).await?;
    if let Err(e) = flusher.await {
        tracing::warn!(error = %e, "Store flusher did not stop cleanly");
    }

    if let Err(e) = state.persist() {
        tracing::error!(error = %e, "Failed to persist stores");
        return Err(e.into());
    }
    tracing::info!("Shutdown complete");
    Ok(())
}
