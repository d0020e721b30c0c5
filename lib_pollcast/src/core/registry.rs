//! # Connection Registry
//!
//! Tracks the client channels that are currently open. Each member is a
//! `ClientHandle` holding the sending half of an unbounded MPSC channel; the
//! receiving half is owned by the client's session task.
//!
//! Membership lives in a `BTreeMap` keyed by `ClientId` behind a
//! `std::sync::Mutex`. The guard is only ever held for in-memory work (no
//! `.await` while locked), so it is safe to use from async code.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;

use crate::core::snapshot::Snapshot;

/// Identity of one client channel. Never reused within a process.
pub type ClientId = u64;

/// # Client Handle
///
/// One live client channel, as seen by the registry.
#[derive(Debug)]
pub struct ClientHandle {
    /// Unique identity of the channel.
    id: ClientId,
    /// Human-readable origin, usually the peer address.
    label: String,
    /// Sending half of the client's frame queue. Sends never block.
    sender: mpsc::UnboundedSender<Arc<Snapshot>>,
}

impl ClientHandle {
    /// Creates a handle around an existing channel sender.
    pub fn new(id: ClientId, label: impl Into<String>, sender: mpsc::UnboundedSender<Arc<Snapshot>>) -> Self {
        Self {
            id,
            label: label.into(),
            sender,
        }
    }

    /// The channel identity.
    pub fn id(&self) -> ClientId {
        self.id
    }

    /// The origin label given at registration.
    pub fn label(&self) -> &str {
        &self.label
    }

    /// `false` once the session task has dropped its receiver.
    pub fn is_connected(&self) -> bool {
        !self.sender.is_closed()
    }

    /// Queues one snapshot for this client. Returns `false` if the client is gone.
    pub fn push(&self, snapshot: &Arc<Snapshot>) -> bool {
        self.sender.send(Arc::clone(snapshot)).is_ok()
    }
}

/// # Connection Registry
///
/// The set of registered client channels.
#[derive(Debug, Default)]
pub struct ConnectionRegistry {
    clients: Mutex<BTreeMap<ClientId, ClientHandle>>,
    next_id: AtomicU64,
}

impl ConnectionRegistry {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Reserves a fresh, never-used client id.
    pub fn next_id(&self) -> ClientId {
        self.next_id.fetch_add(1, Ordering::Relaxed) + 1
    }

    /// Adds a handle. A handle with the same id is replaced.
    pub fn register(&self, handle: ClientHandle) {
        self.register_with(handle, |_| {});
    }

    /// # Register With
    ///
    /// Adds a handle after running `sync` on it, both under the membership
    /// guard. No `retain` or `for_each` pass can interleave between the two,
    /// so whatever `sync` queues is ahead of any later fan-out.
    pub fn register_with<F>(&self, handle: ClientHandle, sync: F)
    where
        F: FnOnce(&ClientHandle),
    {
        let mut clients = self.lock();
        sync(&handle);
        clients.insert(handle.id, handle);
    }

    /// Removes a handle. Removing an absent id is a no-op; returns whether
    /// anything was removed.
    pub fn unregister(&self, id: ClientId) -> bool {
        self.lock().remove(&id).is_some()
    }

    /// Visits every current member in id order.
    pub fn for_each<F>(&self, mut visit: F)
    where
        F: FnMut(&ClientHandle),
    {
        for handle in self.lock().values() {
            visit(handle);
        }
    }

    /// Keeps only the members for which `keep` returns `true`.
    pub fn retain<F>(&self, mut keep: F)
    where
        F: FnMut(&ClientHandle) -> bool,
    {
        self.lock().retain(|_, handle| keep(handle));
    }

    /// Number of registered members.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// `true` if nobody is registered.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Takes the membership guard. A poisoned guard is recovered: the map is
    /// still structurally valid because no mutation panics half-way.
    pub(crate) fn lock(&self) -> MutexGuard<'_, BTreeMap<ClientId, ClientHandle>> {
        self.clients.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
