//! # beacon-client
//!
//! Library half of the `beacon` binary: endpoint validation and the
//! interactive relay session.
//!
//! - [`cli`] parses and validates the command line.
//! - [`session`] connects to a relay, prints every pushed message, and
//!   sends each input line as the connection's replacement message.
//!
//! Integration tests use this crate directly to run a session with
//! scripted input against an in-process server.

pub mod cli;
pub mod session;

pub use cli::Args;
pub use session::SessionState;
