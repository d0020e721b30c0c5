//! # Snapshot Cache
//!
//! Holds zero or one current `Snapshot`. The slot is an `ArcSwapOption`:
//! publishing a new snapshot is a single atomic pointer swap, and reading is a
//! wait-free load. A reader therefore sees either the whole previous snapshot
//! or the whole new one, never a marker from one paired with a document from
//! another.
//!
//! ## Single Writer
//! The slot is created by a `CacheWriter`, which is deliberately not `Clone`.
//! Whoever owns it (the poll loop) is the only component able to `set`.
//! Everyone else gets a cheap, cloneable `SnapshotCache` reader.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::core::snapshot::{Snapshot, VersionMarker};

/// Cloneable read-only view of the cache.
#[derive(Clone, Default)]
pub struct SnapshotCache {
    slot: Arc<ArcSwapOption<Snapshot>>,
}

impl SnapshotCache {
    /// The current snapshot, if one has been published.
    pub fn get(&self) -> Option<Arc<Snapshot>> {
        self.slot.load_full()
    }

    /// Marker of the current snapshot, if any.
    pub fn version(&self) -> Option<VersionMarker> {
        (*self.slot.load()).as_ref().map(|snapshot| snapshot.version().clone())
    }

    /// `true` until the first snapshot is published.
    pub fn is_empty(&self) -> bool {
        self.slot.load().is_none()
    }
}

/// The exclusive writing end of the cache.
#[derive(Default)]
pub struct CacheWriter {
    cache: SnapshotCache,
}

impl CacheWriter {
    /// Creates an empty cache and returns its writer.
    pub fn new() -> Self {
        Self::default()
    }

    /// Hands out a reader sharing this writer's slot.
    pub fn reader(&self) -> SnapshotCache {
        self.cache.clone()
    }

    /// Current snapshot, as seen by the writer.
    pub fn get(&self) -> Option<Arc<Snapshot>> {
        self.cache.get()
    }

    /// Replaces the cached snapshot wholesale and returns the published `Arc`.
    pub fn set(&self, snapshot: Snapshot) -> Arc<Snapshot> {
        let published = Arc::new(snapshot);
        self.cache.slot.store(Some(Arc::clone(&published)));
        published
    }
}
