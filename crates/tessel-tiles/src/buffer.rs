use std::time::{Duration, Instant};

use tessel_types::Event;

/// Validated events waiting to be flushed for one tile.
///
/// Owned by exactly one tile actor. Byte size is the encoded size of the
/// events plus separators, tracked incrementally on push.
#[derive(Debug, Default)]
pub struct TileBuffer {
    events: Vec<Event>,
    bytes: usize,
    last_touched: Option<Instant>,
}

impl TileBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, events: Vec<Event>) {
        self.push_at(events, Instant::now());
    }

    pub fn push_at(&mut self, events: Vec<Event>, now: Instant) {
        if events.is_empty() {
            return;
        }
        for event in &events {
            self.bytes += serde_json::to_vec(event).map_or(0, |v| v.len()) + 1;
        }
        self.events.extend(events);
        self.last_touched = Some(now);
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn byte_size(&self) -> usize {
        self.bytes
    }

    /// Over the size threshold.
    pub fn is_full(&self, threshold_bytes: usize) -> bool {
        !self.is_empty() && self.bytes >= threshold_bytes
    }

    /// Over the size threshold, or untouched for longer than `interval`.
    pub fn is_due(&self, now: Instant, threshold_bytes: usize, interval: Duration) -> bool {
        if self.is_full(threshold_bytes) {
            return true;
        }
        match self.last_touched {
            Some(touched) if !self.is_empty() => now.saturating_duration_since(touched) >= interval,
            _ => false,
        }
    }

    /// Drop the first `count` events after they were durably flushed.
    ///
    /// Events appended while the flush was in flight stay buffered.
    pub fn drain_flushed(&mut self, count: usize) {
        let count = count.min(self.events.len());
        self.events.drain(..count);
        self.bytes = self
            .events
            .iter()
            .map(|e| serde_json::to_vec(e).map_or(0, |v| v.len()) + 1)
            .sum();
        if self.events.is_empty() {
            self.last_touched = None;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tessel_types::{EventBuilder, Operation};

    fn merge(id: &str) -> Event {
        EventBuilder::new("s", "t").event_id(id).build(Operation::Merge)
    }

    #[test]
    fn empty_buffer_is_never_due() {
        let buffer = TileBuffer::new();
        assert!(!buffer.is_due(Instant::now(), 0, Duration::ZERO));
    }

    #[test]
    fn size_threshold_triggers() {
        let mut buffer = TileBuffer::new();
        buffer.push(vec![merge("e1")]);
        assert!(buffer.byte_size() > 0);
        assert!(buffer.is_full(1));
        assert!(!buffer.is_full(1 << 20));
    }

    #[test]
    fn idle_interval_triggers() {
        let start = Instant::now();
        let mut buffer = TileBuffer::new();
        buffer.push_at(vec![merge("e1")], start);
        let interval = Duration::from_millis(100);
        assert!(!buffer.is_due(start + Duration::from_millis(50), usize::MAX, interval));
        assert!(buffer.is_due(start + Duration::from_millis(100), usize::MAX, interval));
    }

    #[test]
    fn drain_keeps_events_that_arrived_mid_flush() {
        let mut buffer = TileBuffer::new();
        buffer.push(vec![merge("e1"), merge("e2")]);
        buffer.push(vec![merge("e3")]);
        buffer.drain_flushed(2);
        assert_eq!(buffer.len(), 1);
        assert_eq!(buffer.events()[0].event_id.as_str(), "e3");
        buffer.drain_flushed(1);
        assert!(buffer.is_empty());
        assert_eq!(buffer.byte_size(), 0);
    }
}
