//! Foundation types for Tessel.
//!
//! Tessel persists an append-only stream of typed spatial events into
//! tile-partitioned, content-addressed storage and folds that stream into
//! live node state. This crate holds the vocabulary every other crate shares.
//!
//! # Key Types
//!
//! - [`Event`]: immutable, uniquely identified fact with scope metadata
//! - [`Operation`]: closed sum of event operations, with forward-compatible
//!   `Macro` and `Unrecognized` variants
//! - [`Scope`]: realm / authority / boundary / policy of an event
//! - [`Transform`]: position, rotation (quaternion), and scale
//! - [`Node`] / [`Snapshot`]: materialized tile state
//! - [`ObjectHash`]: `"<algo>:<hex>"` content address

pub mod error;
pub mod event;
pub mod id;
pub mod node;
pub mod object;
pub mod operation;
pub mod scope;
pub mod transform;

pub use error::TypeError;
pub use event::{Event, EventBuilder, EventRecord, OrderMark, ROOT_INVARIANTS};
pub use id::{ActorId, EventId, LayerId, NodeId, SpaceId, TileId};
pub use node::{Link, Node, Snapshot};
pub use object::{HashAlgorithm, ObjectHash};
pub use operation::{
    CreateNode, DeleteNode, DerivedFeature, LinkChange, Operation, PhysicsStep, SetDocument,
    SetGeometry, SetMedia, SetProperties, SetText, TransformUpdate, UpdateTransform, MACRO_PREFIX,
};
pub use scope::{Authority, Boundary, Policy, Realm, Scope};
pub use transform::Transform;
