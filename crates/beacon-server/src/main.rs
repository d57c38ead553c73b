//! # beacond
//!
//! Interval-push websocket relay server.
//!
//! ## Usage
//!
//! ```bash
//! # Push every second on port 4000
//! beacond 4000 1000
//!
//! # Bind all interfaces, push every 250ms, export Prometheus metrics
//! beacond 4000 250 --host 0.0.0.0 --metrics-port 9090
//! ```

use anyhow::Result;
use beacon_server::{config::Config, handlers::Server, metrics};
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beacon_server=debug,beacon_core=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::parse();

    // Initialize metrics
    metrics::init();
    if let Some(port) = config.metrics_port {
        if let Err(e) = metrics::start_exporter(port) {
            error!(error = %e, "Failed to start metrics exporter");
        }
    }

    // Start the server
    let server = Server::bind(config).await?;
    info!("Listening on ws://{}", server.local_addr()?);

    server.run_until_ctrl_c().await
}
