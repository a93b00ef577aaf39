//! Catalog wrappers for failure-path tests.

use std::sync::atomic::{AtomicBool, Ordering};

use tessel_types::{ObjectHash, SpaceId, TileId};

use crate::catalog::{InMemoryTileCatalog, TileCatalog};
use crate::error::TileResult;
use crate::index::TileIndex;
use crate::layout::TileKey;
use crate::manifest::Manifest;

/// Catalog whose index writes fail while `broken` is set.
#[derive(Default)]
pub(crate) struct FlakyCatalog {
    pub inner: InMemoryTileCatalog,
    pub broken: AtomicBool,
}

impl FlakyCatalog {
    pub fn broken() -> Self {
        let catalog = Self::default();
        catalog.set_broken(true);
        catalog
    }

    pub fn set_broken(&self, broken: bool) {
        self.broken.store(broken, Ordering::SeqCst);
    }
}

impl TileCatalog for FlakyCatalog {
    fn read_index(&self, key: &TileKey) -> TileResult<Option<TileIndex>> {
        self.inner.read_index(key)
    }
    fn write_index(&self, key: &TileKey, index: &TileIndex) -> TileResult<()> {
        if self.broken.load(Ordering::SeqCst) {
            return Err(std::io::Error::other("disk full").into());
        }
        self.inner.write_index(key, index)
    }
    fn read_manifest(&self, key: &TileKey) -> TileResult<Manifest> {
        self.inner.read_manifest(key)
    }
    fn write_manifest(&self, key: &TileKey, manifest: &Manifest) -> TileResult<()> {
        self.inner.write_manifest(key, manifest)
    }
    fn put_snapshot(&self, key: &TileKey, hash: &ObjectHash, bytes: &[u8]) -> TileResult<()> {
        self.inner.put_snapshot(key, hash, bytes)
    }
    fn list_snapshots(&self, key: &TileKey) -> TileResult<Vec<ObjectHash>> {
        self.inner.list_snapshots(key)
    }
    fn list_tiles(&self, space: &SpaceId) -> TileResult<Vec<TileId>> {
        self.inner.list_tiles(space)
    }
}
