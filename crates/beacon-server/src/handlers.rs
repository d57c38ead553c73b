//! Connection handlers for the Beacon server.
//!
//! This module runs the accept loop and the per-connection lifecycle.
//! Each accepted socket gets one task driving its frames and one pusher
//! re-delivering its current message; every close signal (close frame,
//! stream end, transport error, failed send) funnels into the same
//! teardown path, which runs exactly once per connection.

use crate::config::Config;
use crate::metrics::{self, ConnectionMetricsGuard};
use anyhow::{Context, Result};
use beacon_core::{greeting, ConnectionHandle, ConnectionId, Pusher, Registry};
use futures_util::{SinkExt, StreamExt};
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tracing::{debug, info, warn};

/// Pushes buffered between a connection's pusher and its writer. Ticks
/// arriving while the buffer is full are skipped, not queued.
const PUSH_QUEUE_CAPACITY: usize = 8;

/// Shared server state.
pub struct ServerState {
    /// The connection registry.
    pub registry: Arc<Registry>,
    /// Server configuration.
    pub config: Config,
}

impl ServerState {
    /// Create new server state.
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self {
            registry: Arc::new(Registry::new()),
            config,
        }
    }
}

/// The websocket relay server.
pub struct Server {
    listener: TcpListener,
    state: Arc<ServerState>,
}

impl Server {
    /// Bind the listener for the configured address.
    ///
    /// # Errors
    ///
    /// Returns an error if the address cannot be bound.
    pub async fn bind(config: Config) -> Result<Self> {
        let addr = config.bind_addr();
        let listener = TcpListener::bind(addr)
            .await
            .with_context(|| format!("Failed to bind {addr}"))?;

        Ok(Self {
            listener,
            state: Arc::new(ServerState::new(config)),
        })
    }

    /// Get the address the listener actually bound. Differs from the
    /// configured address when port 0 requested an ephemeral port.
    ///
    /// # Errors
    ///
    /// Returns an error if the local address cannot be read.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Get a handle to the shared connection registry.
    #[must_use]
    pub fn registry(&self) -> Arc<Registry> {
        Arc::clone(&self.state.registry)
    }

    /// Accept connections until `shutdown` completes, then tear down any
    /// connections still open.
    ///
    /// # Errors
    ///
    /// Currently infallible; the `Result` keeps the signature stable for
    /// callers that propagate errors.
    pub async fn run_until<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()> + Send,
    {
        let Self { listener, state } = self;
        let mut connection_tasks: Vec<JoinHandle<()>> = Vec::new();
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    info!("Shutting down");
                    break;
                }
                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        let state = Arc::clone(&state);
                        connection_tasks.retain(|task| !task.is_finished());
                        connection_tasks.push(tokio::spawn(handle_connection(stream, peer, state)));
                    }
                    Err(e) => {
                        warn!(error = %e, "Failed to accept connection");
                        metrics::record_error("accept");
                    }
                },
            }
        }

        // Cleanup: abort the remaining connection tasks and wait them out
        for task in &connection_tasks {
            task.abort();
        }
        for task in connection_tasks {
            let _ = task.await;
        }

        Ok(())
    }

    /// Accept connections until ctrl-c.
    ///
    /// # Errors
    ///
    /// Returns an error if the server fails while running.
    pub async fn run_until_ctrl_c(self) -> Result<()> {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "Failed to listen for ctrl-c");
            }
        })
        .await
    }
}

/// Drive one client connection from handshake to teardown.
async fn handle_connection(stream: TcpStream, peer: SocketAddr, state: Arc<ServerState>) {
    let ws = match accept_async(stream).await {
        Ok(ws) => ws,
        Err(e) => {
            warn!(client = %peer, error = %e, "WebSocket handshake failed");
            metrics::record_error("handshake");
            return;
        }
    };

    let _metrics_guard = ConnectionMetricsGuard::new();
    let id = ConnectionId::from(peer);
    info!(client = %id, "Connection established");

    let interval = state.config.push_interval();
    let handle = match state
        .registry
        .register(id.clone(), greeting::for_interval(interval))
    {
        Ok(handle) => handle,
        Err(e) => {
            // Two live sockets with one peer address should not happen;
            // refuse the newcomer and keep the registered connection
            warn!(client = %id, error = %e, "Refusing connection");
            metrics::record_error("registry");
            return;
        }
    };

    let (push_tx, mut push_rx) = mpsc::channel(PUSH_QUEUE_CAPACITY);
    let mut pusher = Pusher::start(
        Arc::clone(&state.registry),
        handle.clone(),
        interval,
        push_tx,
    );

    let (mut sender, mut receiver) = ws.split();

    // Message processing loop
    loop {
        tokio::select! {
            biased;

            // Deliver scheduled pushes to the client
            pushed = push_rx.recv() => {
                let text = match pushed {
                    Some(text) => text,
                    // The pusher only drops its sender once it has stopped
                    None => break,
                };
                debug!(client = %id, message = %text, "Sending message");
                metrics::record_message(text.len(), "outbound");
                if let Err(e) = sender.send(Message::Text(text)).await {
                    warn!(client = %id, error = %e, "Failed to send message");
                    metrics::record_error("send");
                    break;
                }
            }

            // Receive from the client
            frame = receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        debug!(client = %id, message = %text, "Received message");
                        metrics::record_message(text.len(), "inbound");
                        apply_update(&state.registry, &handle, text);
                    }
                    Some(Ok(Message::Binary(data))) => {
                        // Binary payloads are stored as their utf8-lossy text
                        let text = String::from_utf8_lossy(&data).into_owned();
                        debug!(client = %id, message = %text, "Received message");
                        metrics::record_message(data.len(), "inbound");
                        apply_update(&state.registry, &handle, text);
                    }
                    Some(Ok(Message::Ping(payload))) => {
                        if sender.send(Message::Pong(payload)).await.is_err() {
                            break;
                        }
                    }
                    Some(Ok(Message::Pong(_))) => {
                        // Ignore pongs
                    }
                    Some(Ok(Message::Close(_))) => {
                        debug!(client = %id, "Received close frame");
                        break;
                    }
                    Some(Ok(Message::Frame(_))) => {
                        // Raw frames do not surface from a handshaked stream
                    }
                    Some(Err(e)) => {
                        warn!(client = %id, error = %e, "WebSocket error");
                        metrics::record_error("websocket");
                        break;
                    }
                    None => {
                        debug!(client = %id, "WebSocket stream ended");
                        break;
                    }
                }
            }
        }
    }

    // Cleanup: stop the pusher before removing the registry entry, so no
    // push can land after teardown
    pusher.stop().await;
    state.registry.unregister(&handle);
    let _ = sender.close().await;

    info!(client = %id, "Connection closed");
}

/// Store a replacement message for a connection.
///
/// An update can race teardown; losing that race is a logged no-op.
fn apply_update(registry: &Registry, handle: &ConnectionHandle, text: String) {
    if let Err(e) = registry.update_message(handle, text) {
        debug!(client = %handle.id(), error = %e, "Dropped update for closed connection");
    }
}
