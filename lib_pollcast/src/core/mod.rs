//! # Core Engine Module
//!
//! The change-detection-and-fanout engine. Everything that crosses a
//! concurrency boundary lives here.
//!
//! ## Core Components:
//!
//! - **`snapshot`**: The immutable `(version, document)` pair that flows through
//!   the system, plus the version marker type.
//! - **`detector`**: The pure accept/reject decision for a freshly fetched
//!   candidate.
//! - **`cache`**: A lock-free, single-writer holder of the current snapshot.
//!   Readers never block and never see a torn value.
//! - **`registry`**: The set of live client channels.
//! - **`dispatcher`**: Point-to-point and broadcast delivery of snapshots to
//!   the registry's members, including the register-and-sync connect path.

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unused_qualifications)]

/// Immutable snapshot model and version marker.
pub mod snapshot;
/// Pure staleness comparison.
pub mod detector;
/// Atomic single-writer snapshot cache.
pub mod cache;
/// Live client channel membership.
pub mod registry;
/// Fan-out of snapshots to registered clients.
pub mod dispatcher;

// --- Public API Re-exports ---
pub use snapshot::{Snapshot, SnapshotError, VersionMarker, VERSION_FIELD};
pub use detector::should_accept;
pub use cache::{CacheWriter, SnapshotCache};
pub use registry::{ClientHandle, ClientId, ConnectionRegistry};
pub use dispatcher::{Dispatcher, SendError};
