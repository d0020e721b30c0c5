//! # Snapshot Model
//!
//! A `Snapshot` pairs the upstream version marker with the full upstream
//! document. It is built once from a parsed JSON body and never mutated
//! afterwards; the cache and the dispatcher share it as `Arc<Snapshot>`.
//!
//! The document is expected to look like:
//!
//! ```json
//! { "last_updated": "2025-01-01T00:00:00.000Z", "NCAAB": [ ... ], "NFL": [ ... ] }
//! ```
//!
//! Every key other than `last_updated` names a group and must hold an array.
//! The records inside a group are opaque to this crate.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// Name of the document field carrying the version marker.
pub const VERSION_FIELD: &str = "last_updated";

/// Reasons an upstream document cannot become a `Snapshot`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SnapshotError {
    /// The top-level JSON value is not an object.
    #[error("document is not a JSON object")]
    NotAnObject,

    /// The `last_updated` field is absent.
    #[error("document has no `last_updated` field")]
    MissingVersion,

    /// The `last_updated` field is present but not a string.
    #[error("`last_updated` is not a string")]
    VersionNotString,

    /// A group field holds something other than an array of records.
    #[error("group `{0}` is not an array")]
    GroupNotArray(String),
}

/// # Version Marker
///
/// Opaque token used only to answer "has the upstream data changed". It is
/// observed as an ISO-8601 timestamp but is never parsed as time: two markers
/// are either equal or different, nothing else.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct VersionMarker(String);

impl VersionMarker {
    /// Wraps a raw marker string.
    pub fn new(raw: impl Into<String>) -> Self {
        Self(raw.into())
    }

    /// The raw marker text.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for VersionMarker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for VersionMarker {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for VersionMarker {
    fn from(raw: String) -> Self {
        Self(raw)
    }
}

/// # Snapshot
///
/// One complete upstream document and the marker extracted from it. Fields are
/// private so a marker can never be paired with a document it was not read from.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    version: VersionMarker,
    document: Value,
}

impl Snapshot {
    /// Validates an upstream document and extracts its version marker.
    ///
    /// # Errors
    /// Returns a `SnapshotError` when the document is not an object, the marker
    /// is missing or not a string, or a group is not an array.
    pub fn from_document(document: Value) -> Result<Self, SnapshotError> {
        let fields = document.as_object().ok_or(SnapshotError::NotAnObject)?;

        let version = match fields.get(VERSION_FIELD) {
            None => return Err(SnapshotError::MissingVersion),
            Some(Value::String(raw)) => VersionMarker::new(raw.as_str()),
            Some(_) => return Err(SnapshotError::VersionNotString),
        };

        if let Some((name, _)) = fields
            .iter()
            .filter(|(name, _)| name.as_str() != VERSION_FIELD)
            .find(|(_, value)| !value.is_array())
        {
            return Err(SnapshotError::GroupNotArray(name.clone()));
        }

        Ok(Self { version, document })
    }

    /// The version marker of this snapshot.
    pub fn version(&self) -> &VersionMarker {
        &self.version
    }

    /// The full upstream document, marker included. This is what clients receive.
    pub fn document(&self) -> &Value {
        &self.document
    }

    /// Records of one named group, if the group exists.
    pub fn group(&self, name: &str) -> Option<&Vec<Value>> {
        if name == VERSION_FIELD {
            return None;
        }
        self.document.get(name).and_then(Value::as_array)
    }

    /// Names of all groups in document order.
    pub fn group_names(&self) -> impl Iterator<Item = &str> {
        self.document
            .as_object()
            .into_iter()
            .flat_map(|fields| fields.keys())
            .map(String::as_str)
            .filter(|name| *name != VERSION_FIELD)
    }
}
