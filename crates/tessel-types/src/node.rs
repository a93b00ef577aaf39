use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::event::{Event, OrderMark};
use crate::id::{EventId, NodeId, SpaceId, TileId};
use crate::transform::Transform;

/// A directed, labelled edge from one node to another.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Link {
    pub relation: String,
    pub target_node_id: NodeId,
}

impl Link {
    pub fn new(relation: impl Into<String>, target_node_id: impl Into<NodeId>) -> Self {
        Self {
            relation: relation.into(),
            target_node_id: target_node_id.into(),
        }
    }
}

/// A materialized entity in a tile.
///
/// Nodes are never physically removed; `delete_node` only sets `deleted`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub node_id: NodeId,
    pub kind: String,
    pub transform: Transform,
    #[serde(default)]
    pub properties: BTreeMap<String, Value>,
    #[serde(default)]
    pub links: Vec<Link>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub geometry: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<Value>,
    #[serde(default)]
    pub deleted: bool,
}

impl Node {
    /// A fresh, live node with no links or payloads.
    pub fn new(
        node_id: impl Into<NodeId>,
        kind: impl Into<String>,
        transform: Transform,
        properties: BTreeMap<String, Value>,
    ) -> Self {
        Self {
            node_id: node_id.into(),
            kind: kind.into(),
            transform,
            properties,
            links: Vec::new(),
            geometry: None,
            media: None,
            text: None,
            document: None,
            deleted: false,
        }
    }

    pub fn is_live(&self) -> bool {
        !self.deleted
    }

    /// Links from this node matching `relation` and `target`.
    pub fn links_to<'a>(
        &'a self,
        relation: &'a str,
        target: &'a NodeId,
    ) -> impl Iterator<Item = &'a Link> + 'a {
        self.links
            .iter()
            .filter(move |l| l.relation == relation && &l.target_node_id == target)
    }
}

/// Immutable materialized state of one tile at a specific event.
///
/// Addressed by the content hash of its canonical JSON encoding. Nodes are
/// listed in ascending `node_id` order, tombstones included.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub space_id: SpaceId,
    pub tile_id: TileId,
    pub at_event: EventId,
    pub nodes: Vec<Node>,
    /// Latest folded event in application order. Events that sort at or
    /// before it cannot be applied on top of this snapshot.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub horizon: Option<OrderMark>,
}

impl Snapshot {
    /// Returns `true` if every event in `events` sorts after the horizon, so
    /// folding them over this snapshot matches a full replay. A snapshot
    /// without a horizon only accepts an empty tail.
    pub fn accepts(&self, events: &[Event]) -> bool {
        match &self.horizon {
            Some(horizon) => events.iter().all(|e| e.is_after(horizon)),
            None => events.is_empty(),
        }
    }
}
