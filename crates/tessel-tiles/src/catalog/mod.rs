//! The [`TileCatalog`] trait: per-tile metadata storage.
//!
//! A catalog holds each tile's index, manifest, and snapshot collection.
//! Segment and snapshot bytes themselves are content-addressed and live in the
//! object store; the catalog only stores what points at them.
//!
//! Catalogs do not lock. Callers serialize read-modify-write cycles per tile
//! (see [`TileStore`](crate::TileStore)).

mod fs;
mod memory;

pub use fs::FsTileCatalog;
pub use memory::InMemoryTileCatalog;

use tessel_types::{ObjectHash, SpaceId, TileId};

use crate::error::TileResult;
use crate::index::TileIndex;
use crate::layout::TileKey;
use crate::manifest::Manifest;

/// Storage backend for tile metadata.
///
/// Implementations must make `write_index` and `write_manifest` atomic: a
/// concurrent reader sees either the old or the new record, never a torn one.
pub trait TileCatalog: Send + Sync {
    /// Read the tile's index. `Ok(None)` if the tile has never been flushed.
    fn read_index(&self, key: &TileKey) -> TileResult<Option<TileIndex>>;

    /// Replace the tile's index.
    fn write_index(&self, key: &TileKey, index: &TileIndex) -> TileResult<()>;

    /// Read the tile's manifest. An unknown tile has an empty manifest.
    fn read_manifest(&self, key: &TileKey) -> TileResult<Manifest>;

    /// Replace the tile's manifest.
    fn write_manifest(&self, key: &TileKey, manifest: &Manifest) -> TileResult<()>;

    /// Store snapshot bytes in the tile's snapshot collection. Idempotent.
    fn put_snapshot(&self, key: &TileKey, hash: &ObjectHash, bytes: &[u8]) -> TileResult<()>;

    /// Addresses of every snapshot in the tile's collection, sorted.
    fn list_snapshots(&self, key: &TileKey) -> TileResult<Vec<ObjectHash>>;

    /// Tiles of `space` that have an index, sorted.
    fn list_tiles(&self, space: &SpaceId) -> TileResult<Vec<TileId>>;
}

#[cfg(test)]
mod tests {
    //! Behaviour every backend must share.

    use super::*;
    use crate::manifest::SegmentRef;
    use tessel_crypto::ContentHasher;

    fn exercise(catalog: &dyn TileCatalog) {
        let key = TileKey::new("office", "t_0_0");
        assert!(catalog.read_index(&key).unwrap().is_none());
        assert!(catalog.read_manifest(&key).unwrap().is_empty());
        assert!(catalog.list_tiles(&key.space).unwrap().is_empty());

        let seg = ContentHasher::SHA256.hash(b"segment");
        let mut manifest = Manifest::new();
        manifest.append(SegmentRef {
            hash: seg,
            from_event: "e1".into(),
            to_event: "e2".into(),
        });
        catalog.write_manifest(&key, &manifest).unwrap();
        let index = TileIndex::advanced(None, "e2".into(), seg);
        catalog.write_index(&key, &index).unwrap();

        assert_eq!(catalog.read_manifest(&key).unwrap(), manifest);
        assert_eq!(catalog.read_index(&key).unwrap(), Some(index));
        assert_eq!(catalog.list_tiles(&key.space).unwrap(), vec![TileId::from("t_0_0")]);

        let snap = ContentHasher::SHA256.hash(b"snap");
        catalog.put_snapshot(&key, &snap, b"snap").unwrap();
        catalog.put_snapshot(&key, &snap, b"snap").unwrap();
        assert_eq!(catalog.list_snapshots(&key).unwrap(), vec![snap]);

        // a manifest alone does not make a tile listable
        let other = TileKey::new("office", "t_1_0");
        catalog.write_manifest(&other, &manifest).unwrap();
        assert_eq!(catalog.list_tiles(&key.space).unwrap().len(), 1);
        assert!(catalog.list_tiles(&SpaceId::from("lobby")).unwrap().is_empty());
    }

    #[test]
    fn in_memory_catalog_contract() {
        exercise(&InMemoryTileCatalog::new());
    }

    #[test]
    fn fs_catalog_contract() {
        let dir = tempfile::tempdir().unwrap();
        exercise(&FsTileCatalog::new(dir.path()));
    }
}
