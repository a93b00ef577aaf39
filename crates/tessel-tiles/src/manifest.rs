use serde::{Deserialize, Serialize};
use tessel_types::{EventId, ObjectHash};

/// Reference to one immutable segment in the object store.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentRef {
    pub hash: ObjectHash,
    /// First event in the segment, in append order.
    pub from_event: EventId,
    /// Last event in the segment; this is the cursor readers resume from.
    pub to_event: EventId,
}

/// Append-only, ordered list of a tile's segments.
///
/// Order is append order and is never re-sorted.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    segments: Vec<SegmentRef>,
}

impl Manifest {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.segments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.segments.is_empty()
    }

    pub fn segments(&self) -> &[SegmentRef] {
        &self.segments
    }

    pub fn last(&self) -> Option<&SegmentRef> {
        self.segments.last()
    }

    /// Append the newest segment. The only mutation a manifest supports.
    pub fn append(&mut self, segment: SegmentRef) {
        self.segments.push(segment);
    }

    /// Every segment strictly after the one whose `to_event` is `after`.
    ///
    /// `None` returns all segments. A cursor that matches no segment also
    /// returns all segments, so a reader with an unknown tip resyncs fully.
    pub fn segments_since(&self, after: Option<&EventId>) -> Vec<SegmentRef> {
        let start = after
            .and_then(|cursor| self.segments.iter().position(|s| &s.to_event == cursor))
            .map_or(0, |i| i + 1);
        self.segments[start..].to_vec()
    }
}
