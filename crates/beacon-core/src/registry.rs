//! Connection registry for Beacon.
//!
//! The registry is the authoritative map from a connection's identity to
//! its current outbound message. Inbound frame handling and the periodic
//! pusher touch the same entry from different tasks, so every access is a
//! full-replacement write or a snapshot read.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::fmt;
use std::net::SocketAddr;
use thiserror::Error;
use tracing::debug;

/// Registry errors.
#[derive(Debug, Error)]
pub enum RegistryError {
    /// A connection with this identity is already registered.
    #[error("Duplicate connection identity: {0}")]
    DuplicateIdentity(ConnectionId),

    /// The handle no longer refers to a registered connection.
    #[error("Unknown connection handle: {0}")]
    UnknownHandle(ConnectionId),
}

/// Identity of one client connection, derived from the peer address.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionId(String);

impl ConnectionId {
    /// Create a connection ID from a raw string.
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Get the ID as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<SocketAddr> for ConnectionId {
    fn from(addr: SocketAddr) -> Self {
        Self(addr.to_string())
    }
}

impl From<&str> for ConnectionId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// Reference to a registered connection.
///
/// Handles are only handed out by [`Registry::register`], so holding one
/// proves the connection was registered at some point. It may have been
/// unregistered since; operations on a stale handle return
/// [`RegistryError::UnknownHandle`].
#[derive(Debug, Clone)]
pub struct ConnectionHandle {
    id: ConnectionId,
}

impl ConnectionHandle {
    /// The identity this handle refers to.
    #[must_use]
    pub fn id(&self) -> &ConnectionId {
        &self.id
    }
}

/// Per-connection state.
struct ConnectionEntry {
    message: String,
}

/// The connection registry.
///
/// Backed by a sharded concurrent map: a reader observes either the old
/// or the new message around a concurrent update, never a mix, and no two
/// connections share an entry.
pub struct Registry {
    /// Connections indexed by identity.
    connections: DashMap<ConnectionId, ConnectionEntry>,
}

impl Registry {
    /// Create an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            connections: DashMap::new(),
        }
    }

    /// Register a connection with its initial outbound message.
    ///
    /// # Errors
    ///
    /// Returns `DuplicateIdentity` if the identity is already registered.
    /// The existing entry is left untouched.
    pub fn register(
        &self,
        id: ConnectionId,
        initial_message: impl Into<String>,
    ) -> Result<ConnectionHandle, RegistryError> {
        match self.connections.entry(id.clone()) {
            Entry::Occupied(_) => Err(RegistryError::DuplicateIdentity(id)),
            Entry::Vacant(slot) => {
                slot.insert(ConnectionEntry {
                    message: initial_message.into(),
                });
                debug!(client = %id, "Registered connection");
                Ok(ConnectionHandle { id })
            }
        }
    }

    /// Replace the stored message for a connection.
    ///
    /// # Errors
    ///
    /// Returns `UnknownHandle` if the connection is no longer registered.
    pub fn update_message(
        &self,
        handle: &ConnectionHandle,
        message: impl Into<String>,
    ) -> Result<(), RegistryError> {
        match self.connections.get_mut(&handle.id) {
            Some(mut entry) => {
                entry.message = message.into();
                Ok(())
            }
            None => Err(RegistryError::UnknownHandle(handle.id.clone())),
        }
    }

    /// Get the latest stored message for a connection.
    ///
    /// # Errors
    ///
    /// Returns `UnknownHandle` if the connection is no longer registered.
    pub fn current_message(&self, handle: &ConnectionHandle) -> Result<String, RegistryError> {
        match self.connections.get(&handle.id) {
            Some(entry) => Ok(entry.message.clone()),
            None => Err(RegistryError::UnknownHandle(handle.id.clone())),
        }
    }

    /// Remove a connection.
    ///
    /// Removal doubles as the stop signal for the connection's pusher: the
    /// next tick sees `UnknownHandle` and shuts down. Returns `false` if
    /// the entry was already gone, which callers treat as a no-op.
    pub fn unregister(&self, handle: &ConnectionHandle) -> bool {
        let removed = self.connections.remove(&handle.id).is_some();
        if removed {
            debug!(client = %handle.id, "Unregistered connection");
        } else {
            debug!(client = %handle.id, "Unregister of unknown handle ignored");
        }
        removed
    }

    /// Check if an identity is currently registered.
    #[must_use]
    pub fn contains(&self, id: &ConnectionId) -> bool {
        self.connections.contains_key(id)
    }

    /// Number of registered connections.
    #[must_use]
    pub fn len(&self) -> usize {
        self.connections.len()
    }

    /// Check if the registry is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.connections.is_empty()
    }

    /// Snapshot of every registered connection and its current message.
    #[must_use]
    pub fn snapshot(&self) -> Vec<(ConnectionId, String)> {
        self.connections
            .iter()
            .map(|e| (e.key().clone(), e.message.clone()))
            .collect()
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    fn id(s: &str) -> ConnectionId {
        ConnectionId::from(s)
    }

    #[test]
    fn test_registry_register_and_read_back() {
        let registry = Registry::new();

        let handle = registry.register(id("127.0.0.1:4000"), "hello").unwrap();
        assert_eq!(registry.current_message(&handle).unwrap(), "hello");
        assert!(registry.contains(&id("127.0.0.1:4000")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_registry_duplicate_identity() {
        let registry = Registry::new();

        let handle = registry.register(id("127.0.0.1:4000"), "first").unwrap();
        assert!(matches!(
            registry.register(id("127.0.0.1:4000"), "second"),
            Err(RegistryError::DuplicateIdentity(_))
        ));
        // The existing entry survives the rejected attempt
        assert_eq!(registry.current_message(&handle).unwrap(), "first");
    }

    #[test]
    fn test_registry_connections_never_collide() {
        let registry = Registry::new();

        let a = registry.register(id("127.0.0.1:4000"), "a").unwrap();
        let b = registry.register(id("127.0.0.1:4001"), "b").unwrap();

        registry.update_message(&a, "updated").unwrap();
        assert_eq!(registry.current_message(&a).unwrap(), "updated");
        assert_eq!(registry.current_message(&b).unwrap(), "b");
    }

    #[test]
    fn test_registry_last_write_wins() {
        let registry = Registry::new();

        let handle = registry.register(id("127.0.0.1:4000"), "initial").unwrap();
        for text in ["one", "two", "three"] {
            registry.update_message(&handle, text).unwrap();
        }
        assert_eq!(registry.current_message(&handle).unwrap(), "three");
    }

    #[test]
    fn test_registry_unregister_is_idempotent() {
        let registry = Registry::new();

        let handle = registry.register(id("127.0.0.1:4000"), "x").unwrap();
        assert!(registry.unregister(&handle));
        assert!(!registry.unregister(&handle));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_stale_handle_fails_safe() {
        let registry = Registry::new();

        let handle = registry.register(id("127.0.0.1:4000"), "x").unwrap();
        registry.unregister(&handle);

        assert!(matches!(
            registry.update_message(&handle, "y"),
            Err(RegistryError::UnknownHandle(_))
        ));
        assert!(matches!(
            registry.current_message(&handle),
            Err(RegistryError::UnknownHandle(_))
        ));
    }

    #[test]
    fn test_registry_snapshot() {
        let registry = Registry::new();

        registry.register(id("127.0.0.1:4000"), "a").unwrap();
        registry.register(id("127.0.0.1:4001"), "b").unwrap();

        let mut snapshot = registry.snapshot();
        snapshot.sort_by(|(a, _), (b, _)| a.as_str().cmp(b.as_str()));
        assert_eq!(snapshot.len(), 2);
        assert_eq!(snapshot[0].1, "a");
        assert_eq!(snapshot[1].1, "b");
    }

    #[test]
    fn test_registry_concurrent_reads_never_tear() {
        let registry = Arc::new(Registry::new());
        let handle = registry.register(id("127.0.0.1:4000"), "value-0").unwrap();

        let writer = {
            let registry = Arc::clone(&registry);
            let handle = handle.clone();
            std::thread::spawn(move || {
                for n in 1..=1000 {
                    registry
                        .update_message(&handle, format!("value-{n}"))
                        .unwrap();
                }
            })
        };

        // Every read observes some fully written value
        for _ in 0..1000 {
            let message = registry.current_message(&handle).unwrap();
            assert!(message.starts_with("value-"));
        }

        writer.join().unwrap();
        assert_eq!(registry.current_message(&handle).unwrap(), "value-1000");
    }
}
