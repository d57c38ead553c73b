//! # beacon
//!
//! Interactive command-line client for the Beacon relay.
//!
//! ## Usage
//!
//! ```bash
//! beacon ws://127.0.0.1:4000
//! ```
//!
//! Every line typed on stdin becomes this connection's new message; every
//! push from the server is printed as it arrives.

use anyhow::Result;
use beacon_client::{cli::Args, session};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "beacon_client=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    args.validate()?;

    session::run(&args).await
}
