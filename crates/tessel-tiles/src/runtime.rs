//! Buffered writes: one actor per tile plus a flush timer.
//!
//! Each `(space, tile)` gets a tokio task that owns its [`TileBuffer`] and
//! is the only writer for that tile. Callers talk to it over an unbounded
//! channel and get replies on `oneshot` channels. A single timer task sends
//! every actor a `FlushIfDue` message on each tick; it never touches a buffer
//! directly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Instant;

use serde_json::Value;
use tessel_types::Event;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::buffer::TileBuffer;
use crate::config::TileStoreConfig;
use crate::error::{TileError, TileResult};
use crate::layout::TileKey;
use crate::manifest::SegmentRef;
use crate::store::TileStore;

type Reply<T> = oneshot::Sender<T>;

enum TileCommand {
    Append {
        events: Vec<Event>,
        reply: Reply<usize>,
    },
    FlushIfDue,
    Flush {
        reply: Reply<TileResult<Option<SegmentRef>>>,
    },
    Pending {
        reply: Reply<usize>,
    },
    Shutdown {
        reply: Reply<TileResult<Option<SegmentRef>>>,
    },
}

struct ActorHandle {
    tx: mpsc::UnboundedSender<TileCommand>,
    join: JoinHandle<()>,
}

/// Tile actor state. Lives inside its task; nothing else can reach it.
struct TileActor {
    key: TileKey,
    store: Arc<TileStore>,
    config: Arc<TileStoreConfig>,
    buffer: TileBuffer,
}

impl TileActor {
    async fn run(mut self, mut rx: mpsc::UnboundedReceiver<TileCommand>) {
        debug!(tile = %self.key, "tile actor started");
        while let Some(command) = rx.recv().await {
            match command {
                TileCommand::Append { events, reply } => {
                    let count = events.len();
                    self.buffer.push(events);
                    if self.buffer.is_full(self.config.flush_threshold_bytes) {
                        if let Err(e) = self.flush().await {
                            warn!(tile = %self.key, error = %e, "threshold flush failed; events kept");
                        }
                    }
                    let _ = reply.send(count);
                }
                TileCommand::FlushIfDue => {
                    let due = self.buffer.is_due(
                        Instant::now(),
                        self.config.flush_threshold_bytes,
                        self.config.flush_interval(),
                    );
                    if due {
                        if let Err(e) = self.flush().await {
                            warn!(tile = %self.key, error = %e, "timed flush failed; events kept");
                        }
                    }
                }
                TileCommand::Flush { reply } => {
                    let _ = reply.send(self.flush().await);
                }
                TileCommand::Pending { reply } => {
                    let _ = reply.send(self.buffer.len());
                }
                TileCommand::Shutdown { reply } => {
                    let result = self.flush().await;
                    let stopped = result.is_ok();
                    if let Err(e) = &result {
                        warn!(
                            tile = %self.key,
                            pending = self.buffer.len(),
                            error = %e,
                            "final flush failed; events kept for retry"
                        );
                    }
                    let _ = reply.send(result);
                    if stopped {
                        break;
                    }
                }
            }
        }
        debug!(tile = %self.key, "tile actor stopped");
    }

    /// Write the whole buffer as one segment.
    ///
    /// The batch is cloned into the blocking task; the buffer only drops
    /// events once the store reports them durable.
    async fn flush(&mut self) -> TileResult<Option<SegmentRef>> {
        if self.buffer.is_empty() {
            return Ok(None);
        }
        let batch = self.buffer.events().to_vec();
        let count = batch.len();
        let store = Arc::clone(&self.store);
        let key = self.key.clone();

        let segment = tokio::task::spawn_blocking(move || store.write_segment(&key, &batch))
            .await
            .map_err(|e| TileError::Task(e.to_string()))??;

        self.buffer.drain_flushed(count);
        Ok(segment)
    }
}

/// Async front of a [`TileStore`]: validated appends land in per-tile
/// buffers and reach storage on size, timer, explicit flush, or shutdown.
pub struct TileRuntime {
    store: Arc<TileStore>,
    config: Arc<TileStoreConfig>,
    actors: Arc<Mutex<HashMap<TileKey, ActorHandle>>>,
    timer: Mutex<Option<JoinHandle<()>>>,
    closed: AtomicBool,
}

impl TileRuntime {
    /// Start the runtime and its timer. Must be called inside a tokio runtime.
    pub fn start(store: Arc<TileStore>, config: TileStoreConfig) -> Self {
        let config = Arc::new(config);
        let actors: Arc<Mutex<HashMap<TileKey, ActorHandle>>> = Arc::default();

        let timer = {
            let actors = Arc::clone(&actors);
            let period = config.scan_interval();
            tokio::spawn(async move {
                let mut ticks = tokio::time::interval(period);
                loop {
                    ticks.tick().await;
                    let actors = actors.lock().expect("actor table lock poisoned");
                    for handle in actors.values() {
                        let _ = handle.tx.send(TileCommand::FlushIfDue);
                    }
                }
            })
        };

        info!(
            threshold_bytes = config.flush_threshold_bytes,
            interval_ms = config.flush_interval_ms,
            scan_ms = config.scan_interval_ms,
            "tile runtime started"
        );
        Self {
            store,
            config,
            actors,
            timer: Mutex::new(Some(timer)),
            closed: AtomicBool::new(false),
        }
    }

    pub fn store(&self) -> &Arc<TileStore> {
        &self.store
    }

    pub fn config(&self) -> &TileStoreConfig {
        &self.config
    }

    fn ensure_open(&self) -> TileResult<()> {
        if self.closed.load(Ordering::Acquire) {
            return Err(TileError::Shutdown);
        }
        Ok(())
    }

    /// Sender for `key`'s actor, spawning it if needed.
    ///
    /// `closed` is checked under the table lock, the same lock `shutdown`
    /// sets it under, so no actor is spawned after shutdown drained the table.
    fn sender(&self, key: &TileKey) -> TileResult<mpsc::UnboundedSender<TileCommand>> {
        let mut actors = self.actors.lock().expect("actor table lock poisoned");
        if self.closed.load(Ordering::Acquire) {
            return Err(TileError::Shutdown);
        }
        let handle = actors.entry(key.clone()).or_insert_with(|| {
            let (tx, rx) = mpsc::unbounded_channel();
            let actor = TileActor {
                key: key.clone(),
                store: Arc::clone(&self.store),
                config: Arc::clone(&self.config),
                buffer: TileBuffer::new(),
            };
            ActorHandle {
                tx,
                join: tokio::spawn(actor.run(rx)),
            }
        });
        Ok(handle.tx.clone())
    }

    fn existing_sender(&self, key: &TileKey) -> Option<mpsc::UnboundedSender<TileCommand>> {
        let actors = self.actors.lock().expect("actor table lock poisoned");
        actors.get(key).map(|h| h.tx.clone())
    }

    async fn request<T>(
        tx: &mpsc::UnboundedSender<TileCommand>,
        command: impl FnOnce(Reply<T>) -> TileCommand,
    ) -> TileResult<T> {
        let (reply, rx) = oneshot::channel();
        tx.send(command(reply)).map_err(|_| TileError::Shutdown)?;
        rx.await.map_err(|_| TileError::Shutdown)
    }

    /// Validate raw events and buffer them for `key`.
    ///
    /// Returns the number of events accepted. A rejected batch leaves the
    /// buffer untouched. Accepted events are not durable until flushed.
    pub async fn append(&self, key: &TileKey, raws: &[Value]) -> TileResult<usize> {
        self.ensure_open()?;
        let events = self.store.validate(key, raws)?;
        self.enqueue(key, events).await
    }

    /// Validate and buffer typed events, e.g. ones built with `EventBuilder`.
    pub async fn append_events(&self, key: &TileKey, events: Vec<Event>) -> TileResult<usize> {
        self.ensure_open()?;
        self.store
            .validator()
            .validate_events(&key.space, &key.tile, &events)?;
        self.enqueue(key, events).await
    }

    async fn enqueue(&self, key: &TileKey, events: Vec<Event>) -> TileResult<usize> {
        if events.is_empty() {
            return Ok(0);
        }
        let tx = self.sender(key)?;
        let count = Self::request(&tx, |reply| TileCommand::Append { events, reply }).await?;
        debug!(tile = %key, count, "events buffered");
        Ok(count)
    }

    /// Flush `key` now. `Ok(None)` if nothing was buffered.
    pub async fn flush(&self, key: &TileKey) -> TileResult<Option<SegmentRef>> {
        match self.existing_sender(key) {
            Some(tx) => Self::request(&tx, |reply| TileCommand::Flush { reply }).await?,
            None => Ok(None),
        }
    }

    /// Flush every tile, returning the segments written.
    pub async fn flush_all(&self) -> TileResult<Vec<SegmentRef>> {
        let keys: Vec<TileKey> = {
            let actors = self.actors.lock().expect("actor table lock poisoned");
            actors.keys().cloned().collect()
        };
        let mut written = Vec::new();
        for key in keys {
            if let Some(segment) = self.flush(&key).await? {
                written.push(segment);
            }
        }
        Ok(written)
    }

    /// Events buffered for `key` and not yet flushed.
    pub async fn pending(&self, key: &TileKey) -> TileResult<usize> {
        match self.existing_sender(key) {
            Some(tx) => Self::request(&tx, |reply| TileCommand::Pending { reply }).await,
            None => Ok(0),
        }
    }

    /// Stop the timer, flush every buffer, and join every actor.
    ///
    /// Further appends fail with [`TileError::Shutdown`]. Every tile is
    /// attempted even if some flushes fail; the first failure is returned.
    /// A tile whose final flush failed keeps its actor and buffered events,
    /// so `flush` or another `shutdown` can retry it.
    pub async fn shutdown(&self) -> TileResult<()> {
        if let Some(timer) = self.timer.lock().expect("timer lock poisoned").take() {
            timer.abort();
        }

        let handles: Vec<(TileKey, ActorHandle)> = {
            let mut actors = self.actors.lock().expect("actor table lock poisoned");
            self.closed.store(true, Ordering::Release);
            actors.drain().collect()
        };

        let mut first_error = None;
        let mut kept = Vec::new();
        for (key, handle) in handles {
            let outcome = Self::request(&handle.tx, |reply| TileCommand::Shutdown { reply }).await;
            match outcome {
                Ok(Ok(_)) => {}
                Ok(Err(e)) => {
                    first_error.get_or_insert(e);
                    kept.push((key, handle));
                    continue;
                }
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
            drop(handle.tx);
            if let Err(e) = handle.join.await {
                warn!(tile = %key, error = %e, "tile actor did not stop cleanly");
            }
        }

        if kept.is_empty() {
            info!("tile runtime stopped");
        } else {
            warn!(tiles = kept.len(), "tile runtime stopped with unflushed tiles");
            self.actors
                .lock()
                .expect("actor table lock poisoned")
                .extend(kept);
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }
}

impl Drop for TileRuntime {
    fn drop(&mut self) {
        if let Ok(mut timer) = self.timer.lock() {
            if let Some(timer) = timer.take() {
                timer.abort();
            }
        }
    }
}
