//! Structural checks on the raw JSON envelope of one event.

use serde_json::{Map, Value};
use tessel_types::{Authority, Boundary, Policy, Realm, ROOT_INVARIANTS};

use crate::error::Problems;
use crate::fields::{self, join_path};

/// Check every envelope field of `raw`, collecting all problems.
///
/// Returns the envelope object when `raw` is an object at all, so the
/// operation pass can inspect `operation`, `payload` and `previous_events`.
pub fn check_envelope<'a>(raw: &'a Value, problems: &mut Problems) -> Option<&'a Map<String, Value>> {
    let Value::Object(env) = raw else {
        problems.push("", format!("event must be an object, got {}", fields::type_name(raw)));
        return None;
    };

    fields::required_string(env, "", "event_id", problems);
    fields::required_u64(env, "", "timestamp", problems);
    for key in ["space_id", "tile_id"] {
        if let Some(id) = fields::required_string(env, "", key, problems) {
            fields::path_safe_id(id, key, problems);
        }
    }
    fields::required_string(env, "", "layer_id", problems);
    fields::required_string(env, "", "actor_id", problems);
    fields::required_string(env, "", "operation", problems);

    match env.get("payload") {
        None | Some(Value::Null) | Some(Value::Object(_)) => {}
        Some(other) => problems.push(
            "payload",
            format!("expected object, got {}", fields::type_name(other)),
        ),
    }

    check_scope(env, problems);
    check_invariants(env, problems);

    if let Some(previous) = env.get("previous_events") {
        match previous {
            Value::Array(items) => {
                fields::string_items(items, "previous_events", problems);
            }
            other => problems.push(
                "previous_events",
                format!("expected array, got {}", fields::type_name(other)),
            ),
        }
    }

    Some(env)
}

fn check_scope(env: &Map<String, Value>, problems: &mut Problems) {
    let Some(scope) = fields::required_object(env, "", "scope", problems) else {
        return;
    };

    check_enum(scope, "realm", Realm::VARIANTS, |v| Realm::parse(v).is_some(), problems);
    check_enum(
        scope,
        "authority",
        Authority::VARIANTS,
        |v| Authority::parse(v).is_some(),
        problems,
    );
    check_enum(
        scope,
        "boundary",
        Boundary::VARIANTS,
        |v| Boundary::parse(v).is_some(),
        problems,
    );

    if let Some(policy) = fields::optional_string(scope, "scope", "policy", problems) {
        if Policy::parse(policy).is_none() {
            problems.push(
                "scope.policy",
                format!("{policy:?} is not one of {}", Policy::VARIANTS.join(", ")),
            );
        }
    }
}

fn check_enum(
    scope: &Map<String, Value>,
    key: &str,
    allowed: &[&str],
    parses: impl Fn(&str) -> bool,
    problems: &mut Problems,
) {
    if let Some(value) = fields::required_string(scope, "scope", key, problems) {
        if !parses(value) {
            problems.push(
                join_path("scope", key),
                format!("{value:?} is not one of {}", allowed.join(", ")),
            );
        }
    }
}

fn check_invariants(env: &Map<String, Value>, problems: &mut Problems) {
    let Some(items) = fields::required_array(env, "", "preserves_invariants", problems) else {
        return;
    };
    let declared = fields::string_items(items, "preserves_invariants", problems);
    for tag in ROOT_INVARIANTS {
        if !declared.contains(&tag) {
            problems.push("preserves_invariants", format!("missing root invariant {tag:?}"));
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "event_id": "e1",
            "timestamp": 100,
            "space_id": "office",
            "tile_id": "t_0_0",
            "layer_id": "base",
            "actor_id": "alice",
            "operation": "delete_node",
            "payload": {"node_id": "n1"},
            "scope": {"realm": "team", "authority": "source", "boundary": "interior"},
            "preserves_invariants": ROOT_INVARIANTS,
            "previous_events": []
        })
    }

    fn paths(raw: &Value) -> Vec<String> {
        let mut problems = Problems::new();
        check_envelope(raw, &mut problems);
        problems.iter().map(|p| p.path.clone()).collect()
    }

    #[test]
    fn valid_envelope_has_no_problems() {
        assert!(paths(&valid()).is_empty());
    }

    #[test]
    fn non_object_is_single_problem() {
        assert_eq!(paths(&json!([1, 2])), vec![String::new()]);
    }

    #[test]
    fn every_problem_is_collected() {
        let mut raw = valid();
        let env = raw.as_object_mut().unwrap();
        env.remove("event_id");
        env.insert("timestamp".into(), json!("soon"));
        env.insert("scope".into(), json!({"realm": "galaxy", "authority": "source"}));
        env.insert("preserves_invariants".into(), json!(["adjacency"]));

        let found = paths(&raw);
        assert!(found.contains(&"event_id".to_string()));
        assert!(found.contains(&"timestamp".to_string()));
        assert!(found.contains(&"scope.realm".to_string()));
        assert!(found.contains(&"scope.boundary".to_string()));
        // four root invariants missing
        assert_eq!(found.iter().filter(|p| *p == "preserves_invariants").count(), 4);
    }

    #[test]
    fn unsafe_tile_id_is_rejected() {
        let mut raw = valid();
        raw["tile_id"] = json!("../etc");
        assert_eq!(paths(&raw), vec!["tile_id".to_string()]);
    }

    #[test]
    fn optional_policy_is_checked_when_present() {
        let mut raw = valid();
        raw["scope"]["policy"] = json!("private");
        assert!(paths(&raw).is_empty());
        raw["scope"]["policy"] = json!("secret");
        assert_eq!(paths(&raw), vec!["scope.policy".to_string()]);
    }

    #[test]
    fn payload_and_previous_events_may_be_absent() {
        let mut raw = valid();
        let env = raw.as_object_mut().unwrap();
        env.remove("payload");
        env.remove("previous_events");
        assert!(paths(&raw).is_empty());
    }

    #[test]
    fn previous_events_must_be_strings() {
        let mut raw = valid();
        raw["previous_events"] = json!(["e0", 7]);
        assert_eq!(paths(&raw), vec!["previous_events[1]".to_string()]);
    }
}
