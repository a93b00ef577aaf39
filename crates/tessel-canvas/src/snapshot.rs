//! Conversion between live state and immutable snapshots.

use tessel_types::{EventId, Snapshot, SpaceId};

use crate::state::TileState;

/// Rebuild live state from a snapshot. Tombstones are kept.
pub fn state_from_snapshot(snapshot: &Snapshot) -> TileState {
    TileState {
        tile_id: snapshot.tile_id.clone(),
        nodes: snapshot
            .nodes
            .iter()
            .map(|node| (node.node_id.clone(), node.clone()))
            .collect(),
        horizon: snapshot.horizon.clone(),
    }
}

/// Freeze `state` as the snapshot taken at `at_event`.
///
/// Every node is written, tombstones included, in ascending `node_id`
/// order; [`state_from_snapshot`] is its exact inverse.
pub fn make_snapshot(state: &TileState, space_id: impl Into<SpaceId>, at_event: impl Into<EventId>) -> Snapshot {
    Snapshot {
        space_id: space_id.into(),
        tile_id: state.tile_id.clone(),
        at_event: at_event.into(),
        nodes: state.nodes.values().cloned().collect(),
        horizon: state.horizon.clone(),
    }
}
