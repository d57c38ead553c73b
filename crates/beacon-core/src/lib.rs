//! # beacon-core
//!
//! Connection registry and push scheduling for the Beacon relay.
//!
//! This crate provides the fundamental building blocks:
//!
//! - **Registry** - Per-connection mutable state, keyed by identity
//! - **Pusher** - Interval task that re-delivers a connection's current message
//! - **Greeting** - The templated message every connection starts with
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐ update  ┌─────────────┐  read  ┌─────────────┐
//! │   inbound   │────────▶│  Registry   │◀───────│   Pusher    │
//! │   frames    │         └─────────────┘        └──────┬──────┘
//! └─────────────┘                                       │
//!                                                       ▼
//!                                                ┌─────────────┐
//!                                                │ writer sink │
//!                                                └─────────────┘
//! ```

pub mod greeting;
pub mod pusher;
pub mod registry;

pub use pusher::Pusher;
pub use registry::{ConnectionHandle, ConnectionId, Registry, RegistryError};
