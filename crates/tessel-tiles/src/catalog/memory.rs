use std::collections::{BTreeMap, HashMap};
use std::sync::RwLock;

use tessel_types::{ObjectHash, SpaceId, TileId};

use crate::catalog::TileCatalog;
use crate::error::TileResult;
use crate::index::TileIndex;
use crate::layout::TileKey;
use crate::manifest::Manifest;

#[derive(Debug, Default)]
struct TileRecord {
    index: Option<TileIndex>,
    manifest: Manifest,
    snapshots: BTreeMap<ObjectHash, Vec<u8>>,
}

/// An in-memory implementation of [`TileCatalog`].
///
/// Data is lost when the catalog is dropped.
#[derive(Debug, Default)]
pub struct InMemoryTileCatalog {
    tiles: RwLock<HashMap<TileKey, TileRecord>>,
}

impl InMemoryTileCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Raw snapshot bytes held for `key`, if any.
    pub fn snapshot_bytes(&self, key: &TileKey, hash: &ObjectHash) -> Option<Vec<u8>> {
        let tiles = self.tiles.read().expect("catalog lock poisoned");
        tiles.get(key)?.snapshots.get(hash).cloned()
    }
}

impl TileCatalog for InMemoryTileCatalog {
    fn read_index(&self, key: &TileKey) -> TileResult<Option<TileIndex>> {
        let tiles = self.tiles.read().expect("catalog lock poisoned");
        Ok(tiles.get(key).and_then(|t| t.index.clone()))
    }

    fn write_index(&self, key: &TileKey, index: &TileIndex) -> TileResult<()> {
        let mut tiles = self.tiles.write().expect("catalog lock poisoned");
        tiles.entry(key.clone()).or_default().index = Some(index.clone());
        Ok(())
    }

    fn read_manifest(&self, key: &TileKey) -> TileResult<Manifest> {
        let tiles = self.tiles.read().expect("catalog lock poisoned");
        Ok(tiles.get(key).map(|t| t.manifest.clone()).unwrap_or_default())
    }

    fn write_manifest(&self, key: &TileKey, manifest: &Manifest) -> TileResult<()> {
        let mut tiles = self.tiles.write().expect("catalog lock poisoned");
        tiles.entry(key.clone()).or_default().manifest = manifest.clone();
        Ok(())
    }

    fn put_snapshot(&self, key: &TileKey, hash: &ObjectHash, bytes: &[u8]) -> TileResult<()> {
        let mut tiles = self.tiles.write().expect("catalog lock poisoned");
        tiles
            .entry(key.clone())
            .or_default()
            .snapshots
            .entry(*hash)
            .or_insert_with(|| bytes.to_vec());
        Ok(())
    }

    fn list_snapshots(&self, key: &TileKey) -> TileResult<Vec<ObjectHash>> {
        let tiles = self.tiles.read().expect("catalog lock poisoned");
        Ok(tiles
            .get(key)
            .map(|t| t.snapshots.keys().copied().collect())
            .unwrap_or_default())
    }

    fn list_tiles(&self, space: &SpaceId) -> TileResult<Vec<TileId>> {
        let tiles = self.tiles.read().expect("catalog lock poisoned");
        let mut found: Vec<TileId> = tiles
            .iter()
            .filter(|(key, record)| &key.space == space && record.index.is_some())
            .map(|(key, _)| key.tile.clone())
            .collect();
        found.sort();
        Ok(found)
    }
}
