use std::sync::Arc;

use serde_json::Value;
use tessel_canvas::{make_snapshot, BuildReport, ShadowCanvas, TileState};
use tessel_crypto::ContentHasher;
use tessel_tiles::{SegmentRef, TileError, TileKey, TileRuntime, TileStore};
use tessel_types::{Event, EventId, ObjectHash, SpaceId, TileId};
use tracing::{debug, info, warn};

use crate::api::{AppendResponse, SegmentsSince, TileTip};
use crate::config::EngineConfig;
use crate::error::{EngineError, EngineResult};

/// State of one tile as read back from storage.
#[derive(Clone, Debug)]
pub struct Materialized {
    pub state: TileState,
    pub report: BuildReport,
    /// Last event covered: the final segment's `to_event`, or the snapshot's
    /// event if no segments followed it.
    pub at_event: Option<EventId>,
}

/// Unified entry point: validated appends, reads, materialization, and
/// snapshot commits.
///
/// Must be created inside a tokio runtime; the flush actors run on it.
pub struct Engine {
    config: EngineConfig,
    store: Arc<TileStore>,
    runtime: TileRuntime,
}

impl Engine {
    pub fn open(config: EngineConfig) -> EngineResult<Self> {
        let store = if config.in_memory {
            TileStore::in_memory(&config.tiles)
        } else {
            TileStore::open(&config.data_dir, &config.tiles)?
        };
        info!(
            data_dir = %config.data_dir.display(),
            in_memory = config.in_memory,
            algorithm = %config.tiles.hash_algorithm,
            "engine opened"
        );
        Ok(Self::with_store(config, Arc::new(store)))
    }

    /// Engine with default settings and no disk state.
    pub fn in_memory() -> Self {
        let config = EngineConfig::in_memory();
        let store = Arc::new(TileStore::in_memory(&config.tiles));
        Self::with_store(config, store)
    }

    /// Engine over an already-built store, e.g. one with custom backends.
    pub fn with_store(config: EngineConfig, store: Arc<TileStore>) -> Self {
        let runtime = TileRuntime::start(Arc::clone(&store), config.tiles.clone());
        Self { config, store, runtime }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<TileStore> {
        &self.store
    }

    pub fn runtime(&self) -> &TileRuntime {
        &self.runtime
    }

    // ---- Logical operations ----

    pub fn get_tile_tip(&self, space: &SpaceId, tile: &TileId) -> EngineResult<Option<TileTip>> {
        let key = TileKey::new(space.clone(), tile.clone());
        Ok(self.store.get_tip(&key)?.map(TileTip::from))
    }

    /// Segments after the one ending at `after`. An unknown cursor returns
    /// every segment.
    pub fn get_segments_since(
        &self,
        space: &SpaceId,
        tile: &TileId,
        after: Option<&EventId>,
    ) -> EngineResult<SegmentsSince> {
        let key = TileKey::new(space.clone(), tile.clone());
        Ok(SegmentsSince {
            segments: self.store.get_segments_since(&key, after)?,
        })
    }

    /// Raw object bytes for an `"<algo>:<hex>"` address.
    pub fn get_object(&self, address: &str) -> EngineResult<Vec<u8>> {
        let hash = ObjectHash::parse(address)?;
        Ok(self.store.get_object(&hash)?)
    }

    /// Validate and buffer `events` for one tile.
    ///
    /// All-or-nothing: a single invalid event rejects the batch. Accepted
    /// events become durable on the next flush.
    pub async fn append_events(&self, space: &SpaceId, tile: &TileId, events: &[Value]) -> AppendResponse {
        let key = TileKey::new(space.clone(), tile.clone());
        match self.runtime.append(&key, events).await {
            Ok(count) => AppendResponse::accepted(count),
            Err(TileError::Validation(e)) => {
                info!(tile = %key, problems = e.problems().len(), "append rejected");
                AppendResponse::invalid(&e)
            }
            Err(e) => {
                warn!(tile = %key, error = %e, "append failed");
                AppendResponse::rejected(e)
            }
        }
    }

    // ---- Extended operations ----

    /// Write a tile's buffered events now.
    pub async fn flush(&self, space: &SpaceId, tile: &TileId) -> EngineResult<Option<SegmentRef>> {
        let key = TileKey::new(space.clone(), tile.clone());
        Ok(self.runtime.flush(&key).await?)
    }

    pub async fn flush_all(&self) -> EngineResult<Vec<SegmentRef>> {
        Ok(self.runtime.flush_all().await?)
    }

    /// Current durable state of a tile. Buffered events are not included.
    pub fn materialize(&self, space: &SpaceId, tile: &TileId) -> EngineResult<TileState> {
        Ok(self.materialize_with_report(space, tile)?.state)
    }

    /// Read path: index, then snapshot, then segments after the snapshot,
    /// folded by the canvas. A tile that was never flushed is empty.
    ///
    /// If a later segment holds an event that sorts at or before the
    /// snapshot's horizon, the snapshot is skipped and every segment is
    /// replayed, so the result never depends on when the snapshot was taken.
    pub fn materialize_with_report(&self, space: &SpaceId, tile: &TileId) -> EngineResult<Materialized> {
        let key = TileKey::new(space.clone(), tile.clone());
        let mut snapshot = self.store.load_snapshot(&key)?;
        let cursor = snapshot.as_ref().map(|s| s.at_event.clone());

        let mut segments = self.store.get_segments_since(&key, cursor.as_ref())?;
        let mut events = self.read_segments(&segments)?;
        if snapshot.as_ref().is_some_and(|s| !s.accepts(&events)) {
            debug!(tile = %key, snapshot_event = ?cursor, "late events precede snapshot; replaying tile");
            segments = self.store.get_segments_since(&key, None)?;
            events = self.read_segments(&segments)?;
            snapshot = None;
        }

        let (state, report) = ShadowCanvas::build_with_report(tile, snapshot.as_ref(), &events);
        let at_event = segments.last().map(|s| s.to_event.clone()).or(cursor);
        Ok(Materialized {
            state,
            report,
            at_event,
        })
    }

    fn read_segments(&self, segments: &[SegmentRef]) -> EngineResult<Vec<Event>> {
        let mut events = Vec::new();
        for segment in segments {
            events.extend(self.store.read_segment(&segment.hash)?);
        }
        Ok(events)
    }

    /// Materialize the tile and store the result as its current snapshot.
    ///
    /// Fails with a not-found error if the tile has never been flushed.
    pub fn commit_snapshot(&self, space: &SpaceId, tile: &TileId) -> EngineResult<ObjectHash> {
        let key = TileKey::new(space.clone(), tile.clone());
        let materialized = self.materialize_with_report(space, tile)?;
        let Some(at_event) = materialized.at_event else {
            return Err(TileError::TileNotFound {
                space: space.clone(),
                tile: tile.clone(),
            }
            .into());
        };
        let snapshot = make_snapshot(&materialized.state, space.clone(), at_event);
        Ok(self.store.put_snapshot(&key, &snapshot)?)
    }

    /// Content hash of the tile's canonical materialized state.
    ///
    /// Peers holding the same events report the same hash.
    pub fn state_hash(&self, space: &SpaceId, tile: &TileId) -> EngineResult<ObjectHash> {
        let state = self.materialize(space, tile)?;
        let hasher = ContentHasher::new(self.config.tiles.hash_algorithm);
        Ok(state.state_hash(&hasher)?)
    }

    /// Every tile of `space` that has been flushed at least once.
    pub fn list_tiles(&self, space: &SpaceId) -> EngineResult<Vec<TileId>> {
        Ok(self.store.list_tiles(space)?)
    }

    /// Flush everything and stop the runtime.
    pub async fn shutdown(&self) -> EngineResult<()> {
        self.runtime.shutdown().await.map_err(EngineError::from)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};

    use serde_json::json;
    use tessel_store::InMemoryObjectStore;
    use tessel_tiles::{InMemoryTileCatalog, Manifest, TileCatalog, TileIndex, TileResult};
    use tessel_types::{NodeId, Snapshot, Transform, ROOT_INVARIANTS};
    use tessel_validate::EventValidator;

    fn space() -> SpaceId {
        SpaceId::from("office")
    }

    fn tile() -> TileId {
        TileId::from("t_0_0")
    }

    fn raw(id: &str, ts: u64, operation: &str, authority: &str, payload: Value) -> Value {
        json!({
            "event_id": id,
            "timestamp": ts,
            "space_id": "office",
            "tile_id": "t_0_0",
            "layer_id": "base",
            "actor_id": "alice",
            "operation": operation,
            "payload": payload,
            "scope": {"realm": "team", "authority": authority, "boundary": "interior"},
            "preserves_invariants": ROOT_INVARIANTS,
        })
    }

    fn create(id: &str, ts: u64, node: &str) -> Value {
        raw(id, ts, "create_node", "source", json!({"node_id": node, "kind": "desk"}))
    }

    fn move_to(id: &str, ts: u64, node: &str, x: f64) -> Value {
        raw(
            id,
            ts,
            "update_transform",
            "derived",
            json!({"node_id": node, "transform": {"position": [x, 0.0, 0.0]}}),
        )
    }

    // ---- logical operations ----

    #[tokio::test]
    async fn two_flushes_materialize_to_latest_transform() {
        let engine = Engine::in_memory();

        let response = engine.append_events(&space(), &tile(), &[create("e1", 100, "n1")]).await;
        assert_eq!(response, AppendResponse::accepted(1));
        engine.flush(&space(), &tile()).await.unwrap().unwrap();

        let response = engine.append_events(&space(), &tile(), &[move_to("e2", 200, "n1", 3.0)]).await;
        assert!(response.ok);
        engine.flush(&space(), &tile()).await.unwrap().unwrap();

        let state = engine.materialize(&space(), &tile()).unwrap();
        assert_eq!(state.len(), 1);
        let n1 = state.node(&NodeId::from("n1")).unwrap();
        assert_eq!(n1.transform, Transform::at(3.0, 0.0, 0.0));

        let since = engine.get_segments_since(&space(), &tile(), None).unwrap();
        assert_eq!(since.segments.len(), 2);
        let tip = engine.get_tile_tip(&space(), &tile()).unwrap().unwrap();
        assert_eq!(tip.tip_event, EventId::from("e2"));
        assert_eq!(tip.tip_segment, since.segments[1].hash);
    }

    #[tokio::test]
    async fn invalid_batch_reports_problems_and_buffers_nothing() {
        let engine = Engine::in_memory();
        let mut bad = create("e2", 2, "n2");
        bad["scope"]["realm"] = json!("galaxy");

        let response = engine
            .append_events(&space(), &tile(), &[create("e1", 1, "n1"), bad])
            .await;
        assert!(!response.ok);
        assert_eq!(response.appended_count, 0);
        assert!(response.problems.iter().any(|p| p.starts_with("events[1].scope.realm")));
        assert!(engine.flush(&space(), &tile()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn source_event_with_numbers_is_a_boundary_rejection() {
        let engine = Engine::in_memory();
        let mut bad = move_to("e1", 1, "n1", 1.0);
        bad["scope"]["authority"] = json!("source");
        let response = engine.append_events(&space(), &tile(), &[bad]).await;
        assert!(!response.ok);
        assert!(response.error.unwrap().starts_with("boundary validation failed"));
    }

    #[tokio::test]
    async fn unknown_tile_has_no_tip_and_is_empty() {
        let engine = Engine::in_memory();
        assert!(engine.get_tile_tip(&space(), &tile()).unwrap().is_none());
        assert!(engine.get_segments_since(&space(), &tile(), None).unwrap().segments.is_empty());
        assert!(engine.materialize(&space(), &tile()).unwrap().is_empty());
    }

    #[tokio::test]
    async fn get_object_returns_segment_bytes() {
        let engine = Engine::in_memory();
        engine.append_events(&space(), &tile(), &[create("e1", 1, "n1")]).await;
        let segment = engine.flush(&space(), &tile()).await.unwrap().unwrap();

        let bytes = engine.get_object(&segment.hash.to_string()).unwrap();
        let text = String::from_utf8(bytes).unwrap();
        assert!(text.contains(r#""event_id":"e1""#));

        assert!(matches!(
            engine.get_object("md5:abcd"),
            Err(EngineError::InvalidAddress(_))
        ));
        let absent = format!("sha256:{}", "0".repeat(64));
        assert!(engine.get_object(&absent).unwrap_err().is_not_found());
    }

    // ---- snapshots ----

    #[tokio::test]
    async fn snapshot_then_more_events_matches_full_replay() {
        let engine = Engine::in_memory();
        engine
            .append_events(&space(), &tile(), &[create("e1", 1, "n1"), create("e2", 2, "n2")])
            .await;
        engine.flush(&space(), &tile()).await.unwrap();

        let hash = engine.commit_snapshot(&space(), &tile()).unwrap();
        let tip = engine.get_tile_tip(&space(), &tile()).unwrap().unwrap();
        assert_eq!(tip.last_snapshot, Some(hash));
        assert_eq!(tip.snapshot_event, Some(EventId::from("e2")));

        let snapshot: Snapshot = serde_json::from_slice(&engine.get_object(&hash.to_string()).unwrap()).unwrap();
        assert_eq!(snapshot.nodes.len(), 2);

        engine
            .append_events(&space(), &tile(), &[move_to("e3", 3, "n1", 7.0)])
            .await;
        engine.flush(&space(), &tile()).await.unwrap();

        let materialized = engine.materialize_with_report(&space(), &tile()).unwrap();
        // only the post-snapshot segment was folded
        assert_eq!(materialized.report.applied, 1);
        assert_eq!(materialized.at_event, Some(EventId::from("e3")));

        let replay = {
            let events = engine.store().load_events_since(&TileKey::new(space(), tile()), None).unwrap();
            ShadowCanvas::build(&tile(), None, &events)
        };
        assert_eq!(materialized.state, replay);
    }

    #[tokio::test]
    async fn late_event_before_snapshot_still_loses_to_newer_transform() {
        let a = Engine::in_memory();
        let b = Engine::in_memory();
        let (made, newer, late) = (create("e1", 1, "n1"), move_to("e3", 200, "n1", 2.0), move_to("e2", 100, "n1", 1.0));

        a.append_events(&space(), &tile(), &[made.clone(), newer.clone()]).await;
        a.flush(&space(), &tile()).await.unwrap();
        a.commit_snapshot(&space(), &tile()).unwrap();
        a.append_events(&space(), &tile(), &[late.clone()]).await;
        a.flush(&space(), &tile()).await.unwrap();

        b.append_events(&space(), &tile(), &[made, newer, late]).await;
        b.flush(&space(), &tile()).await.unwrap();

        let materialized = a.materialize_with_report(&space(), &tile()).unwrap();
        // the snapshot was bypassed and every event replayed
        assert_eq!(materialized.report.applied, 3);
        let n1 = materialized.state.node(&NodeId::from("n1")).unwrap();
        assert_eq!(n1.transform, Transform::at(2.0, 0.0, 0.0));
        assert_eq!(
            a.state_hash(&space(), &tile()).unwrap(),
            b.state_hash(&space(), &tile()).unwrap()
        );
    }

    #[tokio::test]
    async fn retried_flush_does_not_replay_events_past_a_snapshot() {
        let catalog = Arc::new(FlakyCatalog::default());
        let store = TileStore::new(
            Arc::new(InMemoryObjectStore::new()),
            catalog.clone(),
            EventValidator::default(),
        );
        let engine = Engine::with_store(EngineConfig::in_memory(), Arc::new(store));

        engine
            .append_events(&space(), &tile(), &[create("e1", 1, "n1"), create("e2", 2, "n2")])
            .await;
        engine.flush(&space(), &tile()).await.unwrap();
        let mut link = raw(
            "e3",
            3,
            "link_nodes",
            "source",
            json!({"node_id": "n1", "relation": "near", "target_node_id": "n2"}),
        );
        link["previous_events"] = json!(["e2"]);
        engine.append_events(&space(), &tile(), &[link]).await;

        catalog.broken.store(true, Ordering::SeqCst);
        assert!(engine.flush(&space(), &tile()).await.is_err());
        catalog.broken.store(false, Ordering::SeqCst);
        engine.flush(&space(), &tile()).await.unwrap().unwrap();

        let before = engine.materialize(&space(), &tile()).unwrap();
        engine.commit_snapshot(&space(), &tile()).unwrap();
        let after = engine.materialize_with_report(&space(), &tile()).unwrap();

        assert_eq!(engine.get_segments_since(&space(), &tile(), None).unwrap().segments.len(), 2);
        assert_eq!(after.report.applied, 0);
        assert_eq!(after.state.node(&NodeId::from("n1")).unwrap().links.len(), 1);
        assert_eq!(after.state, before);
    }

    #[tokio::test]
    async fn snapshot_of_unflushed_tile_is_not_found() {
        let engine = Engine::in_memory();
        assert!(engine.commit_snapshot(&space(), &tile()).unwrap_err().is_not_found());
    }

    #[tokio::test]
    async fn peers_converge_on_the_same_state_hash() {
        let a = Engine::in_memory();
        let b = Engine::in_memory();
        let events = [create("e1", 1, "n1"), move_to("e2", 2, "n1", 1.0), move_to("e3", 3, "n1", 2.0)];

        a.append_events(&space(), &tile(), &events).await;
        a.flush(&space(), &tile()).await.unwrap();

        // b receives the same events in a different order and flush split
        b.append_events(&space(), &tile(), &[events[2].clone(), events[0].clone()]).await;
        b.flush(&space(), &tile()).await.unwrap();
        b.append_events(&space(), &tile(), &[events[1].clone()]).await;
        b.flush(&space(), &tile()).await.unwrap();

        assert_eq!(
            a.state_hash(&space(), &tile()).unwrap(),
            b.state_hash(&space(), &tile()).unwrap()
        );
    }

    /// Catalog whose index writes fail while `broken` is set.
    #[derive(Default)]
    struct FlakyCatalog {
        inner: InMemoryTileCatalog,
        broken: AtomicBool,
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

    // ---- lifecycle ----

    #[tokio::test]
    async fn shutdown_persists_buffers_to_disk() {
        let dir = tempfile::tempdir().unwrap();
        let config = EngineConfig::with_data_dir(dir.path());
        {
            let engine = Engine::open(config.clone()).unwrap();
            let response = engine.append_events(&space(), &tile(), &[create("e1", 1, "n1")]).await;
            assert!(response.ok);
            engine.shutdown().await.unwrap();

            let late = engine.append_events(&space(), &tile(), &[create("e2", 2, "n2")]).await;
            assert!(!late.ok);
            assert!(late.problems.is_empty());
        }

        let reopened = Engine::open(config).unwrap();
        assert_eq!(reopened.list_tiles(&space()).unwrap(), vec![tile()]);
        let state = reopened.materialize(&space(), &tile()).unwrap();
        assert!(state.live_node(&NodeId::from("n1")).is_some());
        reopened.shutdown().await.unwrap();
    }
}
