//! # Change Detector
//!
//! Decides whether a freshly fetched snapshot should replace the cached one.
//! Only the version markers are compared, by exact equality. There is no
//! ordering assumption: a marker that moves "backwards" is still a change.

use crate::core::snapshot::Snapshot;

/// Returns `true` when `candidate` should be promoted to the cache.
///
/// That is the case when nothing is cached yet, or when the candidate's marker
/// differs from the cached marker. Payload content is never inspected.
pub fn should_accept(current: Option<&Snapshot>, candidate: &Snapshot) -> bool {
    match current {
        None => true,
        Some(current) => current.version() != candidate.version(),
    }
}
