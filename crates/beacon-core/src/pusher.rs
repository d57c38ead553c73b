//! Periodic push scheduling.
//!
//! Every connection gets one pusher: a task that wakes on a fixed
//! interval, reads the connection's current message from the registry, and
//! hands it to the connection's writer through an mpsc sink. The pusher
//! never touches the socket itself, so a slow or dead peer only ever
//! stalls its own connection.

use crate::registry::{ConnectionHandle, Registry};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace};

/// A running periodic pusher for one connection.
///
/// The task stops on its own when the connection disappears from the
/// registry or the sink closes; [`Pusher::stop`] cancels it eagerly.
/// Dropping a pusher aborts the task.
pub struct Pusher {
    task: Option<JoinHandle<()>>,
}

impl Pusher {
    /// Start pushing the connection's current message into `sink` every
    /// `interval`.
    ///
    /// The first push happens one full `interval` after this call, which
    /// is the cadence the greeting promises.
    #[must_use]
    pub fn start(
        registry: Arc<Registry>,
        handle: ConnectionHandle,
        interval: Duration,
        sink: mpsc::Sender<String>,
    ) -> Self {
        let task = tokio::spawn(run(registry, handle, interval, sink));
        Self { task: Some(task) }
    }

    /// Cancel the pusher and wait for the task to finish.
    ///
    /// Once this returns no further pushes happen for the connection.
    /// Idempotent: calling it again, or after the task already stopped on
    /// its own, is a no-op.
    pub async fn stop(&mut self) {
        if let Some(task) = self.task.take() {
            task.abort();
            // The JoinError from an aborted task is the cancellation we
            // just requested
            let _ = task.await;
        }
    }

    /// Check if the push task has finished, either stopped or
    /// self-terminated.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.task.as_ref().map_or(true, JoinHandle::is_finished)
    }
}

impl Drop for Pusher {
    fn drop(&mut self) {
        if let Some(task) = &self.task {
            task.abort();
        }
    }
}

/// The push loop.
async fn run(
    registry: Arc<Registry>,
    handle: ConnectionHandle,
    interval: Duration,
    sink: mpsc::Sender<String>,
) {
    let mut ticker = time::interval_at(Instant::now() + interval, interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        ticker.tick().await;

        // The entry vanishing is the registry's stop signal
        let message = match registry.current_message(&handle) {
            Ok(message) => message,
            Err(_) => {
                debug!(client = %handle.id(), "Stopping pusher: connection unregistered");
                break;
            }
        };

        match sink.try_send(message) {
            Ok(()) => {
                trace!(client = %handle.id(), "Pushed current message");
            }
            Err(TrySendError::Full(_)) => {
                // Writer is behind; skip this tick rather than queue up
                debug!(client = %handle.id(), "Push sink full, skipping tick");
            }
            Err(TrySendError::Closed(_)) => {
                debug!(client = %handle.id(), "Stopping pusher: sink closed");
                break;
            }
        }
    }
}
