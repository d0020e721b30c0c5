use serde::Serialize;
use serde_json::Value;

use crate::core::snapshot::{Snapshot, VersionMarker};
use crate::ingestors::poll_loop::{PollState, PollStats};

/// Name of the event carrying a snapshot document to clients.
pub const DATA_UPDATE: &str = "data_update";

/// Server-to-client frame: a named event and its payload.
#[derive(Debug, Clone, Serialize)]
pub struct ServerEvent<'a> {
    /// Event name, e.g. `data_update`.
    pub event: &'static str,
    /// Event payload.
    pub data: &'a Value,
}

impl<'a> ServerEvent<'a> {
    /// The `data_update` frame for a snapshot.
    pub fn data_update(snapshot: &'a Snapshot) -> Self {
        Self {
            event: DATA_UPDATE,
            data: snapshot.document(),
        }
    }

    /// Encodes the frame as JSON text.
    pub fn to_text(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}

/// Body of `GET /health`.
#[derive(Debug, Clone, Serialize)]
pub struct HealthReport {
    /// Always `"ok"` while the process serves requests.
    pub status: &'static str,
    /// Connected WebSocket clients.
    pub clients: usize,
    /// Peer labels of the connected clients, in connection order.
    pub peers: Vec<String>,
    /// Marker of the cached snapshot, `null` before the first accepted poll.
    pub version: Option<VersionMarker>,
    /// Whether a poll cycle is running right now.
    pub state: PollState,
    /// Poll outcome counters.
    #[serde(flatten)]
    pub stats: PollStats,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_data_update_envelope_carries_full_document() {
        let doc = json!({ "last_updated": "t1", "NFL": [{ "id": "7" }] });
        let snapshot = Snapshot::from_document(doc.clone()).unwrap();

        let text = ServerEvent::data_update(&snapshot).to_text().unwrap();
        let parsed: Value = serde_json::from_str(&text).unwrap();

        assert_eq!(parsed, json!({ "event": "data_update", "data": doc }));
    }

    #[test]
    fn test_health_report_flattens_stats() {
        let report = HealthReport {
            status: "ok",
            clients: 2,
            peers: vec!["127.0.0.1:50000".to_string(), "127.0.0.1:50001".to_string()],
            version: None,
            state: PollState::Idle,
            stats: PollStats { cycles: 4, accepted: 1, unchanged: 2, failed: 1 },
        };

        let value = serde_json::to_value(&report).unwrap();

        assert_eq!(
            value,
            json!({
                "status": "ok",
                "clients": 2,
                "peers": ["127.0.0.1:50000", "127.0.0.1:50001"],
                "version": null,
                "state": "idle",
                "cycles": 4,
                "accepted": 1,
                "unchanged": 2,
                "failed": 1
            })
        );
    }
}
