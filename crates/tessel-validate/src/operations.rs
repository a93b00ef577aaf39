//! Operation-specific payload checks.
//!
//! These run only once the envelope is structurally sound, so `operation` is
//! known to be a non-empty string and `payload` is an object or absent.

use serde_json::{Map, Value};
use tessel_types::Operation;
use tracing::{debug, warn};

use crate::error::Problems;
use crate::fields::{self, type_name};

const PAYLOAD: &str = "payload";

/// Check the payload of the operation named in `env`.
///
/// `reject_unknown` turns unrecognized (non-`macro.*`) operations into a
/// problem instead of a log line.
pub fn check_operation(env: &Map<String, Value>, reject_unknown: bool, problems: &mut Problems) {
    let name = env.get("operation").and_then(Value::as_str).unwrap_or_default();
    let empty = Map::new();
    let payload = env.get(PAYLOAD).and_then(Value::as_object).unwrap_or(&empty);

    match name {
        Operation::CREATE_NODE => {
            node_id(payload, problems);
            fields::required_string(payload, PAYLOAD, "kind", problems);
            if let Some(transform) = payload.get("transform") {
                fields::transform(transform, "payload.transform", problems);
            }
            if payload.contains_key("properties") {
                fields::required_object(payload, PAYLOAD, "properties", problems);
            }
        }
        Operation::UPDATE_TRANSFORM => {
            node_id(payload, problems);
            if let Some(transform) = fields::required_present(payload, PAYLOAD, "transform", problems) {
                fields::transform(transform, "payload.transform", problems);
            }
        }
        Operation::SET_PROPERTIES => {
            node_id(payload, problems);
            fields::required_object(payload, PAYLOAD, "properties", problems);
        }
        Operation::LINK_NODES | Operation::UNLINK_NODES => {
            node_id(payload, problems);
            fields::required_string(payload, PAYLOAD, "relation", problems);
            fields::required_string(payload, PAYLOAD, "target_node_id", problems);
        }
        Operation::DELETE_NODE => node_id(payload, problems),
        Operation::MERGE => {
            let parents = env
                .get("previous_events")
                .and_then(Value::as_array)
                .map_or(0, Vec::len);
            if parents < 2 {
                problems.push(
                    "previous_events",
                    format!("merge requires at least 2 parent events, got {parents}"),
                );
            }
        }
        Operation::SET_GEOMETRY => present_field(payload, "geometry", problems),
        Operation::SET_MEDIA => present_field(payload, "media", problems),
        Operation::SET_DOCUMENT => present_field(payload, "document", problems),
        Operation::SET_TEXT => {
            node_id(payload, problems);
            match payload.get("text") {
                Some(Value::String(_)) => {}
                None | Some(Value::Null) => problems.push("payload.text", "is required"),
                Some(other) => problems.push(
                    "payload.text",
                    format!("expected string, got {}", type_name(other)),
                ),
            }
        }
        Operation::PHYSICS_STEP => physics_step(payload, problems),
        Operation::DERIVED_FEATURE => {
            fields::optional_string(payload, PAYLOAD, "node_id", problems);
            fields::required_string(payload, PAYLOAD, "feature", problems);
            fields::required_present(payload, PAYLOAD, "value", problems);
            if let Some(inputs) = payload.get("inputs") {
                match inputs {
                    Value::Array(items) => {
                        fields::string_items(items, "payload.inputs", problems);
                    }
                    other => problems.push(
                        "payload.inputs",
                        format!("expected array, got {}", type_name(other)),
                    ),
                }
            }
        }
        other if Operation::is_macro(other) => {
            debug!(operation = other, "accepting macro operation with envelope-only validation");
        }
        other if reject_unknown => {
            problems.push("operation", format!("unknown operation {other:?}"));
        }
        other => {
            warn!(operation = other, "accepting unknown operation with envelope-only validation");
        }
    }
}

fn node_id(payload: &Map<String, Value>, problems: &mut Problems) {
    fields::required_string(payload, PAYLOAD, "node_id", problems);
}

fn present_field(payload: &Map<String, Value>, key: &str, problems: &mut Problems) {
    node_id(payload, problems);
    fields::required_present(payload, PAYLOAD, key, problems);
}

fn physics_step(payload: &Map<String, Value>, problems: &mut Problems) {
    fields::required_u64(payload, PAYLOAD, "tick", problems);
    fields::required_f64(payload, PAYLOAD, "delta_time", problems);
    let Some(updates) = fields::required_array(payload, PAYLOAD, "updates", problems) else {
        return;
    };
    for (i, update) in updates.iter().enumerate() {
        let base = format!("payload.updates[{i}]");
        let Value::Object(update) = update else {
            problems.push(base, format!("expected object, got {}", type_name(update)));
            continue;
        };
        fields::required_string(update, &base, "node_id", problems);
        if let Some(transform) = fields::required_present(update, &base, "transform", problems) {
            fields::transform(transform, &format!("{base}.transform"), problems);
        }
    }
}
