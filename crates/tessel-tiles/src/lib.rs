//! Per-tile append log for Tessel.
//!
//! Every `(space, tile)` pair owns an independent log. Validated events are
//! buffered per tile and flushed as **segments**: newline-joined canonical
//! JSON stored in the shared object store. Each tile keeps three records:
//!
//! - `manifest.json`: append-only list of `{hash, from_event, to_event}`
//! - `index.json`: the single mutable pointer to the tip and last snapshot
//! - `snapshots/`: immutable materialized-state blobs
//!
//! # Flush Ordering
//!
//! 1. Encode the buffered events.
//! 2. `put` the bytes into the object store.
//! 3. Append the segment to the manifest.
//! 4. Replace the index.
//!
//! A crash after step 2 leaves an unreferenced object. A crash after step 3
//! leaves a stale index that the next flush corrects. Neither is visible as
//! torn state.
//!
//! # Layers
//!
//! - [`TileStore`]: synchronous validation, ordered writes, and reads
//! - [`TileRuntime`]: async actor per tile plus a flush timer
//! - [`TileCatalog`]: index/manifest/snapshot storage, in memory or on disk

pub mod buffer;
pub mod catalog;
pub mod config;
pub mod error;
pub mod index;
pub mod layout;
pub mod manifest;
pub mod runtime;
pub mod segment;
pub mod store;

#[cfg(test)]
pub(crate) mod test_support;

pub use buffer::TileBuffer;
pub use catalog::{FsTileCatalog, InMemoryTileCatalog, TileCatalog};
pub use config::TileStoreConfig;
pub use error::{TileError, TileResult};
pub use index::TileIndex;
pub use layout::{TileKey, TileLayout};
pub use manifest::{Manifest, SegmentRef};
pub use runtime::TileRuntime;
pub use segment::{decode_segment, encode_segment};
pub use store::TileStore;
