//! Field-level shape checks shared by the envelope and operation passes.
//!
//! Every helper records a problem and returns `None` instead of stopping, so
//! callers can keep checking the remaining fields.

use serde_json::{Map, Value};

use crate::error::Problems;

pub(crate) fn join_path(base: &str, key: &str) -> String {
    if base.is_empty() {
        key.to_string()
    } else {
        format!("{base}.{key}")
    }
}

pub(crate) fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

/// A required, non-empty string.
pub(crate) fn required_string<'a>(
    map: &'a Map<String, Value>,
    base: &str,
    key: &str,
    problems: &mut Problems,
) -> Option<&'a str> {
    let path = join_path(base, key);
    match map.get(key) {
        None | Some(Value::Null) => {
            problems.push(path, "is required");
            None
        }
        Some(Value::String(s)) if s.trim().is_empty() => {
            problems.push(path, "must not be empty");
            None
        }
        Some(Value::String(s)) => Some(s),
        Some(other) => {
            problems.push(path, format!("expected string, got {}", type_name(other)));
            None
        }
    }
}

/// An optional string; `null` counts as absent.
pub(crate) fn optional_string<'a>(
    map: &'a Map<String, Value>,
    base: &str,
    key: &str,
    problems: &mut Problems,
) -> Option<&'a str> {
    match map.get(key) {
        None | Some(Value::Null) => None,
        Some(_) => required_string(map, base, key, problems),
    }
}

/// A required non-negative integer.
pub(crate) fn required_u64(
    map: &Map<String, Value>,
    base: &str,
    key: &str,
    problems: &mut Problems,
) -> Option<u64> {
    let path = join_path(base, key);
    match map.get(key) {
        None | Some(Value::Null) => {
            problems.push(path, "is required");
            None
        }
        Some(Value::Number(n)) => match n.as_u64() {
            Some(v) => Some(v),
            None => {
                problems.push(path, "must be a non-negative integer");
                None
            }
        },
        Some(other) => {
            problems.push(path, format!("expected integer, got {}", type_name(other)));
            None
        }
    }
}

/// A required finite number.
pub(crate) fn required_f64(
    map: &Map<String, Value>,
    base: &str,
    key: &str,
    problems: &mut Problems,
) -> Option<f64> {
    let path = join_path(base, key);
    match map.get(key) {
        None | Some(Value::Null) => {
            problems.push(path, "is required");
            None
        }
        Some(Value::Number(n)) => match n.as_f64() {
            Some(v) if v.is_finite() => Some(v),
            _ => {
                problems.push(path, "must be a finite number");
                None
            }
        },
        Some(other) => {
            problems.push(path, format!("expected number, got {}", type_name(other)));
            None
        }
    }
}

/// A required JSON object.
pub(crate) fn required_object<'a>(
    map: &'a Map<String, Value>,
    base: &str,
    key: &str,
    problems: &mut Problems,
) -> Option<&'a Map<String, Value>> {
    let path = join_path(base, key);
    match map.get(key) {
        None | Some(Value::Null) => {
            problems.push(path, "is required");
            None
        }
        Some(Value::Object(obj)) => Some(obj),
        Some(other) => {
            problems.push(path, format!("expected object, got {}", type_name(other)));
            None
        }
    }
}

/// A required JSON array.
pub(crate) fn required_array<'a>(
    map: &'a Map<String, Value>,
    base: &str,
    key: &str,
    problems: &mut Problems,
) -> Option<&'a Vec<Value>> {
    let path = join_path(base, key);
    match map.get(key) {
        None | Some(Value::Null) => {
            problems.push(path, "is required");
            None
        }
        Some(Value::Array(items)) => Some(items),
        Some(other) => {
            problems.push(path, format!("expected array, got {}", type_name(other)));
            None
        }
    }
}

/// A required value of any type other than `null`.
pub(crate) fn required_present<'a>(
    map: &'a Map<String, Value>,
    base: &str,
    key: &str,
    problems: &mut Problems,
) -> Option<&'a Value> {
    match map.get(key) {
        None | Some(Value::Null) => {
            problems.push(join_path(base, key), "is required");
            None
        }
        Some(v) => Some(v),
    }
}

/// Every element of `items` must be a non-empty string.
pub(crate) fn string_items<'a>(items: &'a [Value], path: &str, problems: &mut Problems) -> Vec<&'a str> {
    let mut out = Vec::with_capacity(items.len());
    for (i, item) in items.iter().enumerate() {
        match item {
            Value::String(s) if !s.trim().is_empty() => out.push(s.as_str()),
            Value::String(_) => problems.push(format!("{path}[{i}]"), "must not be empty"),
            other => problems.push(
                format!("{path}[{i}]"),
                format!("expected string, got {}", type_name(other)),
            ),
        }
    }
    out
}

/// A fixed-length array of finite numbers.
pub(crate) fn number_tuple(value: &Value, len: usize, path: &str, problems: &mut Problems) {
    match value {
        Value::Array(items) if items.len() == len => {
            for (i, item) in items.iter().enumerate() {
                if !item.as_f64().is_some_and(f64::is_finite) {
                    problems.push(format!("{path}[{i}]"), "must be a finite number");
                }
            }
        }
        Value::Array(items) => problems.push(
            path.to_string(),
            format!("expected {len} numbers, got {}", items.len()),
        ),
        other => problems.push(
            path.to_string(),
            format!("expected array of {len} numbers, got {}", type_name(other)),
        ),
    }
}

/// A transform object: optional `position[3]`, `rotation[4]`, `scale[3]`.
pub(crate) fn transform(value: &Value, path: &str, problems: &mut Problems) {
    let Value::Object(obj) = value else {
        problems.push(path.to_string(), format!("expected object, got {}", type_name(value)));
        return;
    };
    for (key, len) in [("position", 3), ("rotation", 4), ("scale", 3)] {
        if let Some(component) = obj.get(key) {
            number_tuple(component, len, &join_path(path, key), problems);
        }
    }
}

/// Identifiers that become directory names must be path-safe.
pub(crate) fn path_safe_id(value: &str, path: &str, problems: &mut Problems) {
    if value == "." || value == ".." {
        problems.push(path.to_string(), "must not be '.' or '..'");
        return;
    }
    if let Some(bad) = value
        .chars()
        .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '_' | '-' | '.' | ':')))
    {
        problems.push(path.to_string(), format!("contains disallowed character {bad:?}"));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn obj(v: Value) -> Map<String, Value> {
        match v {
            Value::Object(m) => m,
            _ => unreachable!(),
        }
    }

    #[test]
    fn required_string_reports_missing_empty_and_wrong_type() {
        let map = obj(json!({"a": "", "b": 5, "c": "ok"}));
        let mut problems = Problems::new();
        assert!(required_string(&map, "", "a", &mut problems).is_none());
        assert!(required_string(&map, "", "b", &mut problems).is_none());
        assert!(required_string(&map, "", "missing", &mut problems).is_none());
        assert_eq!(required_string(&map, "", "c", &mut problems), Some("ok"));
        assert_eq!(problems.len(), 3);
    }

    #[test]
    fn required_u64_rejects_negative_and_fractional() {
        let map = obj(json!({"neg": -1, "frac": 1.5, "ok": 7}));
        let mut problems = Problems::new();
        assert!(required_u64(&map, "", "neg", &mut problems).is_none());
        assert!(required_u64(&map, "", "frac", &mut problems).is_none());
        assert_eq!(required_u64(&map, "", "ok", &mut problems), Some(7));
        assert_eq!(problems.len(), 2);
    }

    #[test]
    fn transform_checks_every_component() {
        let mut problems = Problems::new();
        transform(
            &json!({"position": [0, 0], "rotation": [0, 0, 0, "w"], "scale": [1, 1, 1]}),
            "payload.transform",
            &mut problems,
        );
        let paths: Vec<_> = problems.iter().map(|p| p.path.clone()).collect();
        assert_eq!(
            paths,
            vec!["payload.transform.position", "payload.transform.rotation[3]"]
        );
    }

    #[test]
    fn path_safe_ids() {
        let mut problems = Problems::new();
        path_safe_id("tile_0-1:a.b", "tile_id", &mut problems);
        assert!(problems.is_empty());
        path_safe_id("..", "tile_id", &mut problems);
        path_safe_id("a/b", "tile_id", &mut problems);
        assert_eq!(problems.len(), 2);
    }
}
