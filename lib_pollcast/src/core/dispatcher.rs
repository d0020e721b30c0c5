//! # Snapshot Dispatcher
//!
//! The `Dispatcher` delivers snapshots to connected clients. It owns the
//! `ConnectionRegistry` and reads the `SnapshotCache`.
//!
//! ## Core Design Principles:
//!
//! 1.  **Zero-Copy Fan-out**: A snapshot is wrapped in an `Arc` once, when it is
//!     published to the cache. Every client queue receives a clone of that
//!     pointer, never a copy of the document.
//!
//! 2.  **Register-and-Sync**: `connect` inserts the new handle and enqueues the
//!     currently cached snapshot while holding the registry guard. `broadcast`
//!     takes the same guard after the cache has been updated. A client thus
//!     gets either the new snapshot as its first frame, or the previous one
//!     followed by the broadcast. It may see the same snapshot twice; it never
//!     misses the latest one.
//!
//! 3.  **Best-Effort Delivery**: Sends go into unbounded channels and never
//!     block. A failed send means the session task has gone away; that one
//!     handle is dropped from the registry and everybody else is unaffected.

use std::sync::Arc;

use thiserror::Error;
use tokio::sync::mpsc;

use crate::core::cache::SnapshotCache;
use crate::core::registry::{ClientHandle, ClientId, ConnectionRegistry};
use crate::core::snapshot::Snapshot;

/// Per-channel delivery failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SendError {
    /// No client with this id is registered.
    #[error("client {0} is not registered")]
    UnknownClient(ClientId),

    /// The client's session has gone away; it has been unregistered.
    #[error("client {0} disconnected")]
    Disconnected(ClientId),
}

/// # Core Dispatcher
///
/// Manages client registration, point-to-point sends and broadcasts.
pub struct Dispatcher {
    /// Live client channels.
    registry: ConnectionRegistry,
    /// Read side of the snapshot cache, used to sync new clients.
    cache: SnapshotCache,
}

impl Dispatcher {
    /// Creates a dispatcher reading from the given cache.
    pub fn new(cache: SnapshotCache) -> Self {
        Self {
            registry: ConnectionRegistry::new(),
            cache,
        }
    }

    /// # Connect
    ///
    /// Registers a new client and queues the current snapshot, if any, for that
    /// client only. Both happen under the registry guard so a concurrent
    /// `broadcast` cannot slip in between.
    ///
    /// # Returns
    /// The new client's id and the receiver its session task should drain.
    pub fn connect(&self, label: &str) -> (ClientId, mpsc::UnboundedReceiver<Arc<Snapshot>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let id = self.registry.next_id();
        let handle = ClientHandle::new(id, label, tx);

        let mut synced = None;
        self.registry.register_with(handle, |handle| {
            synced = self.cache.get();
            if let Some(snapshot) = &synced {
                // The receiver is still in our hands, so this cannot fail.
                handle.push(snapshot);
            }
        });

        match synced {
            Some(snapshot) => log::info!(
                "Client {} ({}) connected, synced to version {}",
                id,
                label,
                snapshot.version()
            ),
            None => log::info!("Client {} ({}) connected, cache still empty", id, label),
        }
        (id, rx)
    }

    /// # Send To
    ///
    /// Point-to-point delivery to one registered client. A failed send
    /// unregisters that client.
    ///
    /// # Errors
    /// `SendError::UnknownClient` if the id is not registered,
    /// `SendError::Disconnected` if the client's receiver is gone.
    pub fn send_to(&self, id: ClientId, snapshot: &Arc<Snapshot>) -> Result<(), SendError> {
        let mut clients = self.registry.lock();
        let delivered = match clients.get(&id) {
            Some(handle) => handle.push(snapshot),
            None => return Err(SendError::UnknownClient(id)),
        };

        if delivered {
            Ok(())
        } else {
            clients.remove(&id);
            log::info!("Client {} disconnected. Removing from dispatcher.", id);
            Err(SendError::Disconnected(id))
        }
    }

    /// # Broadcast
    ///
    /// Queues the snapshot for every registered client. Clients whose receiver
    /// is gone are removed along the way.
    ///
    /// # Returns
    /// The number of clients the snapshot was queued for.
    pub fn broadcast(&self, snapshot: &Arc<Snapshot>) -> usize {
        let mut delivered = 0;
        self.registry.retain(|client| {
            if client.push(snapshot) {
                delivered += 1;
                true
            } else {
                log::info!(
                    "Client {} ({}) disconnected. Removing from dispatcher.",
                    client.id(),
                    client.label()
                );
                false
            }
        });
        log::debug!("Broadcast version {} to {} client(s)", snapshot.version(), delivered);
        delivered
    }

    /// Removes a client. Safe to call more than once.
    pub fn disconnect(&self, id: ClientId) -> bool {
        let removed = self.registry.unregister(id);
        if removed {
            log::debug!("Client {} explicitly removed.", id);
        }
        removed
    }

    /// Labels of all registered clients, in id order.
    pub fn client_labels(&self) -> Vec<String> {
        let mut labels = Vec::with_capacity(self.registry.len());
        self.registry.for_each(|client| labels.push(client.label().to_string()));
        labels
    }

    /// Number of registered clients.
    pub fn client_count(&self) -> usize {
        self.registry.len()
    }

    /// The cache this dispatcher syncs new clients from.
    pub fn cache(&self) -> &SnapshotCache {
        &self.cache
    }
}
