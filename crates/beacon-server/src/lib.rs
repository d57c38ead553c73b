//! # beacon-server
//!
//! The Beacon relay server. It accepts websocket connections, seeds each
//! one with a greeting, re-sends the connection's current message on a
//! fixed interval, and replaces that message whenever the client sends a
//! new one. Each module covers one concern:
//!
//! - [`config`] parses the command-line configuration.
//! - [`handlers`] runs the accept loop and the per-connection tasks.
//! - [`metrics`] instruments connections and relayed messages.
//!
//! The `beacond` binary lives in `main.rs`; everything else is library
//! code so integration tests can run a server in-process on an ephemeral
//! port.

pub mod config;
pub mod handlers;
pub mod metrics;

pub use config::Config;
pub use handlers::{Server, ServerState};
