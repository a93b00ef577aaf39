use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, Mutex};

use serde_json::Value;
use tessel_crypto::to_canonical_vec;
use tessel_store::{FsObjectStore, InMemoryObjectStore, ObjectStore};
use tessel_types::{Event, EventId, ObjectHash, Snapshot, SpaceId, TileId};
use tessel_validate::{EventValidator, ValidationError};
use tracing::{debug, info};

use crate::catalog::{FsTileCatalog, InMemoryTileCatalog, TileCatalog};
use crate::config::TileStoreConfig;
use crate::error::{TileError, TileResult};
use crate::index::TileIndex;
use crate::layout::TileKey;
use crate::manifest::SegmentRef;
use crate::segment::{decode_segment, encode_segment};

/// Synchronous tile store: validation, ordered segment writes, and reads.
///
/// Writes to one tile are serialized by a per-tile lock; different tiles
/// never contend on the same lock. Readers take no lock and always see a
/// complete index and manifest, possibly a stale one.
pub struct TileStore {
    objects: Arc<dyn ObjectStore>,
    catalog: Arc<dyn TileCatalog>,
    validator: EventValidator,
    tile_locks: Mutex<HashMap<TileKey, Arc<Mutex<()>>>>,
}

impl TileStore {
    pub fn new(
        objects: Arc<dyn ObjectStore>,
        catalog: Arc<dyn TileCatalog>,
        validator: EventValidator,
    ) -> Self {
        Self {
            objects,
            catalog,
            validator,
            tile_locks: Mutex::new(HashMap::new()),
        }
    }

    /// Fully in-memory store.
    pub fn in_memory(config: &TileStoreConfig) -> Self {
        Self::new(
            Arc::new(InMemoryObjectStore::with_algorithm(config.hash_algorithm)),
            Arc::new(InMemoryTileCatalog::new()),
            EventValidator::new(config.validator.clone()),
        )
    }

    /// Filesystem store: objects under `<root>/objects`, tiles under
    /// `<root>/spaces`.
    pub fn open(root: &Path, config: &TileStoreConfig) -> TileResult<Self> {
        let objects = FsObjectStore::open_with_algorithm(root.join("objects"), config.hash_algorithm)?;
        Ok(Self::new(
            Arc::new(objects),
            Arc::new(FsTileCatalog::new(root)),
            EventValidator::new(config.validator.clone()),
        ))
    }

    pub fn objects(&self) -> &Arc<dyn ObjectStore> {
        &self.objects
    }

    pub fn validator(&self) -> &EventValidator {
        &self.validator
    }

    /// Run `f` holding the write lock for `key`.
    ///
    /// The lock entry is dropped from the table once no other writer holds
    /// it, so the table only tracks tiles with writes in flight.
    fn with_tile_lock<T>(&self, key: &TileKey, f: impl FnOnce() -> TileResult<T>) -> TileResult<T> {
        let lock = {
            let mut locks = self.tile_locks.lock().expect("tile lock table poisoned");
            Arc::clone(locks.entry(key.clone()).or_default())
        };
        let result = {
            let _guard = lock.lock().expect("tile lock poisoned");
            f()
        };

        let mut locks = self.tile_locks.lock().expect("tile lock table poisoned");
        // Clones are only taken under the table lock: two owners means the
        // table and this call.
        if Arc::strong_count(&lock) == 2 {
            locks.remove(key);
        }
        result
    }

    // -----------------------------------------------------------------------
    // Writes
    // -----------------------------------------------------------------------

    /// Validate a raw batch for `key` without touching storage.
    pub fn validate(&self, key: &TileKey, raws: &[Value]) -> Result<Vec<Event>, ValidationError> {
        self.validator.validate_batch(&key.space, &key.tile, raws)
    }

    /// Write `events` as one segment.
    ///
    /// Steps run in order: put the segment object, append to the manifest,
    /// then replace the index. A crash between steps leaves either an
    /// unreferenced object or a stale index, both harmless. Retrying a write
    /// whose manifest step already landed does not append it twice. An empty
    /// batch writes nothing.
    pub fn write_segment(&self, key: &TileKey, events: &[Event]) -> TileResult<Option<SegmentRef>> {
        let (Some(first), Some(last)) = (events.first(), events.last()) else {
            return Ok(None);
        };
        let bytes = encode_segment(events)?;

        let (segment, manifest_len) = self.with_tile_lock(key, || {
            let hash = self.objects.put(&bytes)?;
            let segment = SegmentRef {
                hash,
                from_event: first.event_id.clone(),
                to_event: last.event_id.clone(),
            };

            let mut manifest = self.catalog.read_manifest(key)?;
            if manifest.last() == Some(&segment) {
                debug!(tile = %key, segment = %hash, "segment already in manifest; repairing index");
            } else {
                manifest.append(segment.clone());
                self.catalog.write_manifest(key, &manifest)?;
            }

            let previous = self.catalog.read_index(key)?;
            let index = TileIndex::advanced(previous.as_ref(), segment.to_event.clone(), hash);
            self.catalog.write_index(key, &index)?;
            Ok((segment, manifest.len()))
        })?;

        info!(
            tile = %key,
            segment = %segment.hash,
            events = events.len(),
            bytes = bytes.len(),
            manifest_len,
            "segment flushed"
        );
        Ok(Some(segment))
    }

    /// Store a materialized snapshot and point the index at it.
    ///
    /// The snapshot goes into the shared object store and the tile's
    /// snapshot collection. The manifest is not touched.
    pub fn put_snapshot(&self, key: &TileKey, snapshot: &Snapshot) -> TileResult<ObjectHash> {
        let bytes = to_canonical_vec(snapshot)?;
        let hash = self.with_tile_lock(key, || {
            let index = self.catalog.read_index(key)?.ok_or_else(|| TileError::TileNotFound {
                space: key.space.clone(),
                tile: key.tile.clone(),
            })?;
            let hash = self.objects.put(&bytes)?;
            self.catalog.put_snapshot(key, &hash, &bytes)?;
            self.catalog
                .write_index(key, &index.with_snapshot(hash, snapshot.at_event.clone()))?;
            Ok(hash)
        })?;

        info!(tile = %key, snapshot = %hash, at_event = %snapshot.at_event, nodes = snapshot.nodes.len(), "snapshot committed");
        Ok(hash)
    }

    // -----------------------------------------------------------------------
    // Reads
    // -----------------------------------------------------------------------

    pub fn get_tip(&self, key: &TileKey) -> TileResult<Option<TileIndex>> {
        self.catalog.read_index(key)
    }

    /// Segments after the one ending at `after`, in append order.
    pub fn get_segments_since(&self, key: &TileKey, after: Option<&EventId>) -> TileResult<Vec<SegmentRef>> {
        Ok(self.catalog.read_manifest(key)?.segments_since(after))
    }

    /// Raw, hash-verified object bytes.
    pub fn get_object(&self, hash: &ObjectHash) -> TileResult<Vec<u8>> {
        Ok(self.objects.get(hash)?)
    }

    /// Fetch and decode one segment.
    pub fn read_segment(&self, hash: &ObjectHash) -> TileResult<Vec<Event>> {
        let bytes = self.get_object(hash)?;
        decode_segment(hash, &bytes)
    }

    /// Every event in segments after `after`, concatenated in manifest order.
    pub fn load_events_since(&self, key: &TileKey, after: Option<&EventId>) -> TileResult<Vec<Event>> {
        let mut events = Vec::new();
        for segment in self.get_segments_since(key, after)? {
            events.extend(self.read_segment(&segment.hash)?);
        }
        debug!(tile = %key, count = events.len(), "events loaded");
        Ok(events)
    }

    /// The snapshot the index currently points at.
    pub fn load_snapshot(&self, key: &TileKey) -> TileResult<Option<Snapshot>> {
        let Some(hash) = self.get_tip(key)?.and_then(|index| index.last_snapshot) else {
            return Ok(None);
        };
        let bytes = self.get_object(&hash)?;
        Ok(Some(serde_json::from_slice(&bytes)?))
    }

    pub fn list_snapshots(&self, key: &TileKey) -> TileResult<Vec<ObjectHash>> {
        self.catalog.list_snapshots(key)
    }

    pub fn list_tiles(&self, space: &SpaceId) -> TileResult<Vec<TileId>> {
        self.catalog.list_tiles(space)
    }
}
