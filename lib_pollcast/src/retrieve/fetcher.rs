//! # Fetcher Contract
//!
//! The poll loop talks to its upstream only through `Fetcher`. One call is one
//! round trip; every way it can go wrong is a `FetchError` value, so a bad
//! cycle never unwinds past the loop.

use std::future::Future;

use thiserror::Error;

use crate::core::snapshot::{Snapshot, SnapshotError};

/// Why one fetch attempt produced no snapshot. Always returned, never thrown.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FetchError {
    /// The request did not complete within the configured timeout.
    #[error("upstream request timed out")]
    Timeout,

    /// Connecting to or talking to the upstream failed.
    #[error("network error: {0}")]
    Network(String),

    /// The upstream answered with something other than `200 OK`.
    #[error("unexpected upstream status: {0}")]
    Status(u16),

    /// The body is not JSON, or not a well-formed feed document.
    #[error("unparseable upstream body: {0}")]
    Parse(String),

    /// The fetcher itself could not be built.
    #[error("fetcher setup failed: {0}")]
    Setup(String),
}

impl From<SnapshotError> for FetchError {
    fn from(err: SnapshotError) -> Self {
        FetchError::Parse(err.to_string())
    }
}

impl From<serde_json::Error> for FetchError {
    fn from(err: serde_json::Error) -> Self {
        FetchError::Parse(err.to_string())
    }
}

/// # Fetcher
///
/// One round trip to the upstream per call. Implementations must not retry
/// and must turn every failure into a `FetchError`.
pub trait Fetcher: Send + Sync {
    /// Fetches and parses the current upstream document.
    fn fetch(&self) -> impl Future<Output = Result<Snapshot, FetchError>> + Send;
}
