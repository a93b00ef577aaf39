use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

use crate::error::TypeError;
use crate::id::{ActorId, EventId, LayerId, SpaceId, TileId};
use crate::operation::Operation;
use crate::scope::Scope;

/// Root invariant tags every event must declare it preserves.
pub const ROOT_INVARIANTS: [&str; 5] = [
    "adjacency",
    "exclusion",
    "consistency",
    "boundary_discipline",
    "authority_nonescalation",
];

/// Flat wire form of an event: the operation is a name plus a JSON payload.
///
/// This is the exact shape written into segments, one JSON object per line.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct EventRecord {
    pub event_id: EventId,
    pub timestamp: u64,
    pub space_id: SpaceId,
    pub tile_id: TileId,
    pub layer_id: LayerId,
    pub actor_id: ActorId,
    pub operation: String,
    #[serde(default)]
    pub payload: Value,
    pub scope: Scope,
    pub preserves_invariants: Vec<String>,
    #[serde(default)]
    pub previous_events: Vec<EventId>,
}

/// An immutable, uniquely identified fact in a tile's ledger.
///
/// Events are created by callers and never mutated; deletion is itself a new
/// event. `timestamp` is logical time used only for ordering.
#[derive(Clone, Debug, PartialEq)]
pub struct Event {
    pub event_id: EventId,
    pub timestamp: u64,
    pub space_id: SpaceId,
    pub tile_id: TileId,
    pub layer_id: LayerId,
    pub actor_id: ActorId,
    pub operation: Operation,
    pub scope: Scope,
    pub preserves_invariants: Vec<String>,
    pub previous_events: Vec<EventId>,
    /// Payload keys the typed operation does not model, kept verbatim so the
    /// stored fact matches the submitted one.
    pub extensions: Map<String, Value>,
}

/// Owned position of an event in application order.
///
/// Orders by `timestamp`, then `event_id`, the same as [`Event::order_key`].
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct OrderMark {
    pub timestamp: u64,
    pub event_id: EventId,
}

impl Event {
    /// Deterministic application order: `(timestamp, event_id)` ascending.
    pub fn order_key(&self) -> (u64, &EventId) {
        (self.timestamp, &self.event_id)
    }

    pub fn order_mark(&self) -> OrderMark {
        OrderMark {
            timestamp: self.timestamp,
            event_id: self.event_id.clone(),
        }
    }

    /// Returns `true` if this event sorts strictly after `mark`.
    pub fn is_after(&self, mark: &OrderMark) -> bool {
        self.order_key() > (mark.timestamp, &mark.event_id)
    }

    /// Returns `true` if this event has no DAG parents.
    pub fn is_root(&self) -> bool {
        self.previous_events.is_empty()
    }

    /// Convert into the flat wire record.
    pub fn to_record(&self) -> Result<EventRecord, TypeError> {
        let mut payload = self.operation.payload()?;
        if let Value::Object(fields) = &mut payload {
            for (key, value) in &self.extensions {
                fields.entry(key.clone()).or_insert_with(|| value.clone());
            }
        }
        Ok(EventRecord {
            event_id: self.event_id.clone(),
            timestamp: self.timestamp,
            space_id: self.space_id.clone(),
            tile_id: self.tile_id.clone(),
            layer_id: self.layer_id.clone(),
            actor_id: self.actor_id.clone(),
            operation: self.operation.name().to_string(),
            payload,
            scope: self.scope,
            preserves_invariants: self.preserves_invariants.clone(),
            previous_events: self.previous_events.clone(),
        })
    }
}

impl TryFrom<EventRecord> for Event {
    type Error = TypeError;

    fn try_from(record: EventRecord) -> Result<Self, Self::Error> {
        let (operation, extensions) = split_payload(&record.operation, record.payload)?;
        Ok(Self {
            event_id: record.event_id,
            timestamp: record.timestamp,
            space_id: record.space_id,
            tile_id: record.tile_id,
            layer_id: record.layer_id,
            actor_id: record.actor_id,
            operation,
            scope: record.scope,
            preserves_invariants: record.preserves_invariants,
            previous_events: record.previous_events,
            extensions,
        })
    }
}

/// Decode the typed operation and collect the payload keys it leaves out.
///
/// Forward-compatible operations carry their payload whole, so they never
/// have extensions.
fn split_payload(name: &str, payload: Value) -> Result<(Operation, Map<String, Value>), TypeError> {
    let raw = match &payload {
        Value::Object(fields) => fields.clone(),
        _ => return Ok((Operation::from_parts(name, payload)?, Map::new())),
    };
    let operation = Operation::from_parts(name, payload)?;
    if operation.is_forward_compatible() {
        return Ok((operation, Map::new()));
    }
    let modelled = operation.payload()?;
    let extensions = raw
        .into_iter()
        .filter(|(key, _)| modelled.get(key).is_none())
        .collect();
    Ok((operation, extensions))
}

impl Serialize for Event {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.to_record()
            .map_err(serde::ser::Error::custom)?
            .serialize(serializer)
    }
}

impl<'de> Deserialize<'de> for Event {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let record = EventRecord::deserialize(deserializer)?;
        Event::try_from(record).map_err(serde::de::Error::custom)
    }
}

/// Convenience builder for well-formed events.
///
/// Fills in the root invariants, a generated event id, and an authoritative
/// personal scope unless told otherwise.
#[derive(Clone, Debug)]
pub struct EventBuilder {
    space_id: SpaceId,
    tile_id: TileId,
    layer_id: LayerId,
    actor_id: ActorId,
    timestamp: u64,
    event_id: Option<EventId>,
    scope: Scope,
    previous_events: Vec<EventId>,
    extra_invariants: Vec<String>,
}

impl EventBuilder {
    pub fn new(space_id: impl Into<SpaceId>, tile_id: impl Into<TileId>) -> Self {
        Self {
            space_id: space_id.into(),
            tile_id: tile_id.into(),
            layer_id: LayerId::from("base"),
            actor_id: ActorId::from("system"),
            timestamp: 0,
            event_id: None,
            scope: Scope::source(),
            previous_events: Vec::new(),
            extra_invariants: Vec::new(),
        }
    }

    pub fn layer(mut self, layer_id: impl Into<LayerId>) -> Self {
        self.layer_id = layer_id.into();
        self
    }

    pub fn actor(mut self, actor_id: impl Into<ActorId>) -> Self {
        self.actor_id = actor_id.into();
        self
    }

    pub fn timestamp(mut self, timestamp: u64) -> Self {
        self.timestamp = timestamp;
        self
    }

    pub fn event_id(mut self, event_id: impl Into<EventId>) -> Self {
        self.event_id = Some(event_id.into());
        self
    }

    pub fn scope(mut self, scope: Scope) -> Self {
        self.scope = scope;
        self
    }

    /// Shorthand for a derived-authority scope.
    pub fn derived(self) -> Self {
        let scope = Scope {
            authority: crate::scope::Authority::Derived,
            ..self.scope
        };
        self.scope(scope)
    }

    pub fn previous(mut self, parents: impl IntoIterator<Item = EventId>) -> Self {
        self.previous_events.extend(parents);
        self
    }

    pub fn invariant(mut self, tag: impl Into<String>) -> Self {
        self.extra_invariants.push(tag.into());
        self
    }

    pub fn build(self, operation: Operation) -> Event {
        let mut preserves_invariants: Vec<String> =
            ROOT_INVARIANTS.iter().map(|s| s.to_string()).collect();
        preserves_invariants.extend(self.extra_invariants);

        Event {
            event_id: self.event_id.unwrap_or_else(EventId::generate),
            timestamp: self.timestamp,
            space_id: self.space_id,
            tile_id: self.tile_id,
            layer_id: self.layer_id,
            actor_id: self.actor_id,
            operation,
            scope: self.scope,
            preserves_invariants,
            previous_events: self.previous_events,
            extensions: Map::new(),
        }
    }
}
