//! Response shapes of the engine's logical operations.
//!
//! Transport layers serialize these as JSON; the engine itself has no
//! opinion on framing.

use serde::{Deserialize, Serialize};
use tessel_tiles::{SegmentRef, TileIndex};
use tessel_types::{EventId, ObjectHash};
use tessel_validate::ValidationError;

/// Answer to `get_tile_tip`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TileTip {
    pub tip_event: EventId,
    pub tip_segment: ObjectHash,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_snapshot: Option<ObjectHash>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub snapshot_event: Option<EventId>,
}

impl From<TileIndex> for TileTip {
    fn from(index: TileIndex) -> Self {
        Self {
            tip_event: index.tip_event,
            tip_segment: index.tip_segment,
            last_snapshot: index.last_snapshot,
            snapshot_event: index.snapshot_event,
        }
    }
}

/// Answer to `get_segments_since`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentsSince {
    pub segments: Vec<SegmentRef>,
}

/// Answer to `append_events`. Never an `Err`: failures are described here.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppendResponse {
    pub ok: bool,
    pub appended_count: usize,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// One `path: message` line per validation problem.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub problems: Vec<String>,
}

impl AppendResponse {
    pub fn accepted(count: usize) -> Self {
        Self {
            ok: true,
            appended_count: count,
            error: None,
            problems: Vec::new(),
        }
    }

    pub fn rejected(error: impl ToString) -> Self {
        Self {
            ok: false,
            appended_count: 0,
            error: Some(error.to_string()),
            problems: Vec::new(),
        }
    }

    pub fn invalid(error: &ValidationError) -> Self {
        Self {
            problems: error.messages(),
            ..Self::rejected(error)
        }
    }
}
