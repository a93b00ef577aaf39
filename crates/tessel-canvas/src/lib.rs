//! Shadow canvas: the materializer for Tessel tiles.
//!
//! [`ShadowCanvas::build`] folds a tile's events, optionally on top of a
//! snapshot, into a [`TileState`]. Events are sorted by
//! `(timestamp, event_id)` before folding, so the result depends only on the
//! set of events and never on arrival or flush order.
//!
//! # Conflict Rules
//!
//! - `create_node`: first under the order wins; later creates are skipped.
//! - `update_transform`, `set_properties`: last writer wins, per key for
//!   properties.
//! - `link_nodes` / `unlink_nodes`: unlink removes every matching link.
//! - `delete_node`: tombstone only; the node stays addressable.
//! - Anything aimed at a missing or tombstoned node is skipped.
//!
//! Skipped events are reported as [`CanvasWarning`]s, never as errors.

pub mod canvas;
pub mod error;
pub mod report;
pub mod snapshot;
pub mod state;

pub use canvas::ShadowCanvas;
pub use error::{CanvasError, CanvasResult};
pub use report::{BuildReport, CanvasWarning};
pub use snapshot::{make_snapshot, state_from_snapshot};
pub use state::TileState;
