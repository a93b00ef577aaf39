use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tessel_types::{EventId, ObjectHash};

/// The single mutable pointer record of a tile.
///
/// Overwritten atomically on every flush and snapshot commit. Every hash it
/// names must already exist in the object store when it is written.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileIndex {
    pub tip_event: EventId,
    pub tip_segment: ObjectHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_snapshot: Option<ObjectHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_event: Option<EventId>,
    pub updated_at: DateTime<Utc>,
}

impl TileIndex {
    /// Index after a flush. Snapshot pointers carry over from `previous`.
    pub fn advanced(previous: Option<&TileIndex>, tip_event: EventId, tip_segment: ObjectHash) -> Self {
        Self {
            tip_event,
            tip_segment,
            last_snapshot: previous.and_then(|p| p.last_snapshot),
            snapshot_event: previous.and_then(|p| p.snapshot_event.clone()),
            updated_at: Utc::now(),
        }
    }

    /// Index after a snapshot commit. The tip is untouched.
    pub fn with_snapshot(&self, snapshot: ObjectHash, at_event: EventId) -> Self {
        Self {
            last_snapshot: Some(snapshot),
            snapshot_event: Some(at_event),
            updated_at: Utc::now(),
            ..self.clone()
        }
    }
}
