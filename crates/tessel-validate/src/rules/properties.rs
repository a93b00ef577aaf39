use serde_json::Value;
use tessel_types::{Event, Operation};

use crate::error::Problems;
use crate::rules::BoundaryRule;

/// Property keys reserved for spatial measurements.
pub const SPATIAL_PROPERTY_KEYS: &[&str] = &[
    "position", "rotation", "scale", "x", "y", "z", "width", "height", "depth",
];

/// Source events must not smuggle numeric measurements through properties.
///
/// Applies to the properties of `create_node` and `set_properties`, and to
/// unmodelled payload keys of any operation. A value counts as numeric when
/// it is a number or an array containing one.
pub struct SpatialPropertyRule;

impl BoundaryRule for SpatialPropertyRule {
    fn name(&self) -> &str {
        "spatial_properties"
    }

    fn check(&self, event: &Event, problems: &mut Problems) {
        match &event.operation {
            Operation::CreateNode(p) => check_keys("payload.properties", &p.properties, problems),
            Operation::SetProperties(p) => check_keys("payload.properties", &p.properties, problems),
            _ => {}
        }
        check_keys("payload", &event.extensions, problems);
    }
}

fn check_keys<'a>(
    prefix: &str,
    entries: impl IntoIterator<Item = (&'a String, &'a Value)>,
    problems: &mut Problems,
) {
    for (key, value) in entries {
        if SPATIAL_PROPERTY_KEYS.contains(&key.as_str()) && is_numeric(value) {
            problems.push(
                format!("{prefix}.{key}"),
                "numeric spatial values require derived authority",
            );
        }
    }
}

fn is_numeric(value: &Value) -> bool {
    match value {
        Value::Number(_) => true,
        Value::Array(items) => items.iter().any(Value::is_number),
        _ => false,
    }
}
