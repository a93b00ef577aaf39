use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tessel_crypto::{to_canonical_vec, ContentHasher};
use tessel_types::{Node, NodeId, ObjectHash, OrderMark, TileId};

use crate::error::CanvasResult;

/// Materialized node map of one tile.
///
/// Tombstoned nodes stay in the map with `deleted = true`. Iteration is in
/// ascending `node_id` order.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TileState {
    pub tile_id: TileId,
    pub nodes: BTreeMap<NodeId, Node>,
    /// Latest applied event. Not part of the canonical encoding.
    #[serde(skip)]
    pub horizon: Option<OrderMark>,
}

impl TileState {
    pub fn new(tile_id: impl Into<TileId>) -> Self {
        Self {
            tile_id: tile_id.into(),
            nodes: BTreeMap::new(),
            horizon: None,
        }
    }

    /// Move the horizon forward to `mark` if it sorts later.
    pub fn advance_horizon(&mut self, mark: OrderMark) {
        if self.horizon.as_ref().map_or(true, |h| *h < mark) {
            self.horizon = Some(mark);
        }
    }

    /// Any node, tombstoned or not.
    pub fn node(&self, node_id: &NodeId) -> Option<&Node> {
        self.nodes.get(node_id)
    }

    /// A node that exists and is not tombstoned.
    pub fn live_node(&self, node_id: &NodeId) -> Option<&Node> {
        self.nodes.get(node_id).filter(|n| n.is_live())
    }

    pub fn live_nodes(&self) -> impl Iterator<Item = &Node> {
        self.nodes.values().filter(|n| n.is_live())
    }

    /// Node count including tombstones.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Canonical JSON encoding. Equal states encode to equal bytes.
    pub fn canonical_bytes(&self) -> CanvasResult<Vec<u8>> {
        Ok(to_canonical_vec(self)?)
    }

    /// Content hash of [`canonical_bytes`](Self::canonical_bytes).
    pub fn state_hash(&self, hasher: &ContentHasher) -> CanvasResult<ObjectHash> {
        Ok(hasher.hash(&self.canonical_bytes()?))
    }
}
