use std::fmt;

use tessel_types::{EventId, NodeId};

/// A non-fatal conflict found while folding events.
///
/// The event was already accepted into the ledger, so it is skipped rather
/// than rejected.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum CanvasWarning {
    /// `create_node` for a node that already exists. First writer wins.
    DuplicateCreate { event_id: EventId, node_id: NodeId },
    /// The target node was never created in this tile.
    MissingNode {
        event_id: EventId,
        operation: String,
        node_id: NodeId,
    },
    /// The target node is tombstoned.
    TombstonedNode {
        event_id: EventId,
        operation: String,
        node_id: NodeId,
    },
    /// Operation name the canvas does not understand.
    UnknownOperation { event_id: EventId, operation: String },
}

impl CanvasWarning {
    pub fn event_id(&self) -> &EventId {
        match self {
            Self::DuplicateCreate { event_id, .. }
            | Self::MissingNode { event_id, .. }
            | Self::TombstonedNode { event_id, .. }
            | Self::UnknownOperation { event_id, .. } => event_id,
        }
    }
}

impl fmt::Display for CanvasWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DuplicateCreate { event_id, node_id } => {
                write!(f, "{event_id}: node {node_id} already exists")
            }
            Self::MissingNode {
                event_id,
                operation,
                node_id,
            } => write!(f, "{event_id}: {operation} targets missing node {node_id}"),
            Self::TombstonedNode {
                event_id,
                operation,
                node_id,
            } => write!(f, "{event_id}: {operation} targets deleted node {node_id}"),
            Self::UnknownOperation { event_id, operation } => {
                write!(f, "{event_id}: unknown operation {operation}")
            }
        }
    }
}

/// What a build did besides producing state.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct BuildReport {
    /// Distinct events folded, in application order.
    pub applied: usize,
    /// Events dropped because their `event_id` was already folded.
    pub duplicates: usize,
    pub warnings: Vec<CanvasWarning>,
}

impl BuildReport {
    pub fn has_warnings(&self) -> bool {
        !self.warnings.is_empty()
    }
}
