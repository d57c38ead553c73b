//! The interactive relay session.
//!
//! A session is one outbound connection. While it is open, input lines go
//! to the server as replacement messages and every pushed message is
//! printed as it arrives. There is no reconnect: a transport error is
//! surfaced and the session closes.

use crate::cli::Args;
use anyhow::{Context, Result};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, error, info, warn};

/// Lifecycle of a session.
///
/// `Connecting` and `Open` can fall into `Error`, which always resolves
/// to `Closed`. `Closed` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Handshake in progress.
    Connecting,
    /// Frames flow in both directions.
    Open,
    /// A failure was surfaced; the session is about to close.
    Error,
    /// Terminal. Input lines from here on are dropped.
    Closed,
}

impl SessionState {
    /// Check if outbound sends are currently allowed.
    #[must_use]
    pub fn is_open(self) -> bool {
        matches!(self, SessionState::Open)
    }
}

/// Run a session against the configured endpoint, relaying stdin.
///
/// # Errors
///
/// Returns an error if the connection cannot be established. Failures
/// after that point are logged and end the session cleanly.
pub async fn run(args: &Args) -> Result<()> {
    let stdin = BufReader::new(tokio::io::stdin());
    run_with_input(&args.url, stdin).await
}

/// Run a session with a caller-supplied line source.
///
/// Split out from [`run`] so tests can drive a session with scripted
/// input instead of a live stdin.
///
/// # Errors
///
/// Returns an error if the connection cannot be established.
pub async fn run_with_input<R>(url: &str, input: R) -> Result<()>
where
    R: AsyncBufRead + Unpin,
{
    let mut state = SessionState::Connecting;
    debug!(peer = %url, state = ?state, "Connecting");

    let (ws, _response) = connect_async(url)
        .await
        .with_context(|| format!("Failed to connect to {url}"))?;

    state = SessionState::Open;
    info!(peer = %url, "Connection established");

    let (mut sender, mut receiver) = ws.split();
    let mut lines = input.lines();
    let mut input_open = true;

    while state.is_open() {
        tokio::select! {
            // Relay input lines as replacement messages
            line = lines.next_line(), if input_open => match line {
                Ok(Some(line)) => {
                    debug!(peer = %url, message = %line, "Sending message");
                    if let Err(e) = sender.send(Message::Text(line)).await {
                        error!(peer = %url, error = %e, "Failed to send message");
                        state = SessionState::Error;
                    }
                }
                Ok(None) => {
                    // Input exhausted; keep printing whatever the server pushes
                    debug!(peer = %url, "Input closed");
                    input_open = false;
                }
                Err(e) => {
                    warn!(peer = %url, error = %e, "Failed to read input");
                    input_open = false;
                }
            },

            // Print pushed messages
            frame = receiver.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    info!(peer = %url, message = %text, "Received message");
                }
                Some(Ok(Message::Binary(data))) => {
                    let text = String::from_utf8_lossy(&data);
                    info!(peer = %url, message = %text, "Received message");
                }
                Some(Ok(Message::Ping(payload))) => {
                    if sender.send(Message::Pong(payload)).await.is_err() {
                        state = SessionState::Error;
                    }
                }
                Some(Ok(Message::Pong(_) | Message::Frame(_))) => {
                    // Nothing to do
                }
                Some(Ok(Message::Close(_))) => {
                    debug!(peer = %url, "Received close frame");
                    state = SessionState::Closed;
                }
                Some(Err(e)) => {
                    error!(peer = %url, error = %e, "Connection error");
                    state = SessionState::Error;
                }
                None => {
                    debug!(peer = %url, "Stream ended");
                    state = SessionState::Closed;
                }
            },
        }

        // An error never lingers: the session closes right after it
        if state == SessionState::Error {
            state = SessionState::Closed;
        }
    }

    let _ = sender.close().await;
    info!(peer = %url, "Connection closed");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_state_open_gates_sends() {
        assert!(SessionState::Open.is_open());
        assert!(!SessionState::Connecting.is_open());
        assert!(!SessionState::Error.is_open());
        assert!(!SessionState::Closed.is_open());
    }
}
