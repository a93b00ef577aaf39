//! Segment encoding: canonical JSON events joined by `\n`.

use tessel_crypto::to_canonical_vec;
use tessel_types::{Event, ObjectHash};

use crate::error::{TileError, TileResult};

/// Encode events in the given order. No trailing newline.
pub fn encode_segment(events: &[Event]) -> TileResult<Vec<u8>> {
    let mut out = Vec::new();
    for (i, event) in events.iter().enumerate() {
        if i > 0 {
            out.push(b'\n');
        }
        out.extend_from_slice(&to_canonical_vec(event)?);
    }
    Ok(out)
}

/// Decode a segment fetched from `hash`. Blank lines are ignored.
pub fn decode_segment(hash: &ObjectHash, bytes: &[u8]) -> TileResult<Vec<Event>> {
    bytes
        .split(|b| *b == b'\n')
        .enumerate()
        .filter(|(_, line)| !line.iter().all(u8::is_ascii_whitespace))
        .map(|(i, line)| {
            serde_json::from_slice(line).map_err(|e| TileError::CorruptSegment {
                hash: *hash,
                reason: format!("line {}: {e}", i + 1),
            })
        })
        .collect()
}
