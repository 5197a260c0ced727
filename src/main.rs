//! Main entry point for the segment state server.
//!
//! Runs the two cooperating contexts in one process: the control context
//! behind an Axum HTTP/WebSocket front end, and the compute context as a
//! background task fed by the replication channel.

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use tokio::sync::{Mutex, watch};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use segment_sets::config::ServerConfig;
use segment_sets::rpc::{CounterpartWorker, RpcHandle};
use segment_sets::server::{ControlContext, SharedState, create_router};

/// Segment state server: control context over HTTP, compute context in the background
#[derive(Parser)]
#[command(name = "segment-sets")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "segment-sets.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let config = if cli.config.exists() {
        ServerConfig::from_file(&cli.config)?
    } else {
        ServerConfig::default()
    };

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    if !cli.config.exists() {
        warn!("{} not found, using defaults", cli.config.display());
    }

    info!("Starting segment state server...");

    let (rpc, receiver) = RpcHandle::channel();
    let worker = CounterpartWorker::new(receiver);
    let compute = worker.counterparts();
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let worker_task = tokio::spawn(worker.run(shutdown_rx));

    let mut control = ControlContext::new(&rpc);
    if config.replication.capacity_hint > 0 {
        control
            .visible_segments
            .reserve(config.replication.capacity_hint);
    }

    let state = Arc::new(SharedState {
        control: Mutex::new(control),
        compute,
    });
    let app = create_router(state);

    let addr = config.bind_address()?;
    info!("Server listening on http://{}", addr);
    info!("Available endpoints:");
    info!("  GET  /health       - Health check");
    info!("  GET  /state        - Control-side segment state");
    info!("  GET  /counterparts - Compute-side replicated sets");
    info!("  GET  /ws           - WebSocket for edits");

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!("Failed to listen for shutdown signal: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await?;

    // Pending replication is abandoned, not flushed.
    if shutdown_tx.send(true).is_err() {
        debug!("compute context already stopped");
    }
    worker_task.await?;
    info!("Server stopped");
    Ok(())
}
