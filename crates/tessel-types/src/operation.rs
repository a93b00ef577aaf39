use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::TypeError;
use crate::id::{EventId, NodeId};
use crate::transform::Transform;

/// Namespace reserved for forward-compatible operations (`macro.*`).
pub const MACRO_PREFIX: &str = "macro.";

/// Payload of `create_node`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CreateNode {
    pub node_id: NodeId,
    pub kind: String,
    #[serde(default)]
    pub transform: Transform,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub properties: BTreeMap<String, Value>,
}

/// Payload of `update_transform`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct UpdateTransform {
    pub node_id: NodeId,
    pub transform: Transform,
}

/// Payload of `set_properties`. Keys not listed are left untouched.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SetProperties {
    pub node_id: NodeId,
    pub properties: BTreeMap<String, Value>,
}

/// Payload of `link_nodes` and `unlink_nodes`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkChange {
    pub node_id: NodeId,
    pub relation: String,
    pub target_node_id: NodeId,
}

/// Payload of `delete_node`.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeleteNode {
    pub node_id: NodeId,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SetGeometry {
    pub node_id: NodeId,
    pub geometry: Value,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SetMedia {
    pub node_id: NodeId,
    pub media: Value,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetText {
    pub node_id: NodeId,
    pub text: String,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SetDocument {
    pub node_id: NodeId,
    pub document: Value,
}

/// One node's transform inside a `physics_step`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TransformUpdate {
    pub node_id: NodeId,
    pub transform: Transform,
}

/// Payload of `physics_step`: solver output for one tick.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PhysicsStep {
    pub tick: u64,
    pub delta_time: f64,
    pub updates: Vec<TransformUpdate>,
}

/// Payload of `derived_feature`: a computed feature attached to the ledger.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DerivedFeature {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<NodeId>,
    pub feature: String,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub inputs: Vec<EventId>,
}

/// The operation an event performs.
///
/// Closed over every operation the engine understands, plus two catch-alls:
/// `Macro` for the reserved `macro.*` namespace and `Unrecognized` for any
/// other name. Both carry the raw payload so the event round-trips unchanged.
#[derive(Clone, Debug, PartialEq)]
pub enum Operation {
    CreateNode(CreateNode),
    UpdateTransform(UpdateTransform),
    SetProperties(SetProperties),
    LinkNodes(LinkChange),
    UnlinkNodes(LinkChange),
    DeleteNode(DeleteNode),
    /// DAG metadata only; parents live in `previous_events`.
    Merge,
    SetGeometry(SetGeometry),
    SetMedia(SetMedia),
    SetText(SetText),
    SetDocument(SetDocument),
    PhysicsStep(PhysicsStep),
    DerivedFeature(DerivedFeature),
    Macro { name: String, payload: Value },
    Unrecognized { name: String, payload: Value },
}

impl Operation {
    pub const CREATE_NODE: &'static str = "create_node";
    pub const UPDATE_TRANSFORM: &'static str = "update_transform";
    pub const SET_PROPERTIES: &'static str = "set_properties";
    pub const LINK_NODES: &'static str = "link_nodes";
    pub const UNLINK_NODES: &'static str = "unlink_nodes";
    pub const DELETE_NODE: &'static str = "delete_node";
    pub const MERGE: &'static str = "merge";
    pub const SET_GEOMETRY: &'static str = "set_geometry";
    pub const SET_MEDIA: &'static str = "set_media";
    pub const SET_TEXT: &'static str = "set_text";
    pub const SET_DOCUMENT: &'static str = "set_document";
    pub const PHYSICS_STEP: &'static str = "physics_step";
    pub const DERIVED_FEATURE: &'static str = "derived_feature";

    /// Every operation name with a typed payload.
    pub const KNOWN: &'static [&'static str] = &[
        Self::CREATE_NODE,
        Self::UPDATE_TRANSFORM,
        Self::SET_PROPERTIES,
        Self::LINK_NODES,
        Self::UNLINK_NODES,
        Self::DELETE_NODE,
        Self::MERGE,
        Self::SET_GEOMETRY,
        Self::SET_MEDIA,
        Self::SET_TEXT,
        Self::SET_DOCUMENT,
        Self::PHYSICS_STEP,
        Self::DERIVED_FEATURE,
    ];

    /// Returns `true` if `name` has a typed payload.
    pub fn is_known(name: &str) -> bool {
        Self::KNOWN.contains(&name)
    }

    /// Returns `true` if `name` is in the reserved `macro.*` namespace.
    pub fn is_macro(name: &str) -> bool {
        name.starts_with(MACRO_PREFIX)
    }

    /// The wire name of this operation.
    pub fn name(&self) -> &str {
        match self {
            Self::CreateNode(_) => Self::CREATE_NODE,
            Self::UpdateTransform(_) => Self::UPDATE_TRANSFORM,
            Self::SetProperties(_) => Self::SET_PROPERTIES,
            Self::LinkNodes(_) => Self::LINK_NODES,
            Self::UnlinkNodes(_) => Self::UNLINK_NODES,
            Self::DeleteNode(_) => Self::DELETE_NODE,
            Self::Merge => Self::MERGE,
            Self::SetGeometry(_) => Self::SET_GEOMETRY,
            Self::SetMedia(_) => Self::SET_MEDIA,
            Self::SetText(_) => Self::SET_TEXT,
            Self::SetDocument(_) => Self::SET_DOCUMENT,
            Self::PhysicsStep(_) => Self::PHYSICS_STEP,
            Self::DerivedFeature(_) => Self::DERIVED_FEATURE,
            Self::Macro { name, .. } | Self::Unrecognized { name, .. } => name.as_str(),
        }
    }

    /// Returns `true` for `Macro` and `Unrecognized`.
    pub fn is_forward_compatible(&self) -> bool {
        matches!(self, Self::Macro { .. } | Self::Unrecognized { .. })
    }

    /// The primary node this operation targets, if any.
    pub fn node_id(&self) -> Option<&NodeId> {
        match self {
            Self::CreateNode(p) => Some(&p.node_id),
            Self::UpdateTransform(p) => Some(&p.node_id),
            Self::SetProperties(p) => Some(&p.node_id),
            Self::LinkNodes(p) | Self::UnlinkNodes(p) => Some(&p.node_id),
            Self::DeleteNode(p) => Some(&p.node_id),
            Self::SetGeometry(p) => Some(&p.node_id),
            Self::SetMedia(p) => Some(&p.node_id),
            Self::SetText(p) => Some(&p.node_id),
            Self::SetDocument(p) => Some(&p.node_id),
            Self::DerivedFeature(p) => p.node_id.as_ref(),
            Self::Merge | Self::PhysicsStep(_) | Self::Macro { .. } | Self::Unrecognized { .. } => {
                None
            }
        }
    }

    /// Decode an operation from its wire name and JSON payload.
    ///
    /// Unknown names never fail: they become `Macro` or `Unrecognized`.
    pub fn from_parts(name: &str, payload: Value) -> Result<Self, TypeError> {
        fn decode<T: serde::de::DeserializeOwned>(name: &str, payload: Value) -> Result<T, TypeError> {
            serde_json::from_value(payload).map_err(|e| TypeError::InvalidPayload {
                operation: name.to_string(),
                reason: e.to_string(),
            })
        }

        let op = match name {
            Self::CREATE_NODE => Self::CreateNode(decode(name, payload)?),
            Self::UPDATE_TRANSFORM => Self::UpdateTransform(decode(name, payload)?),
            Self::SET_PROPERTIES => Self::SetProperties(decode(name, payload)?),
            Self::LINK_NODES => Self::LinkNodes(decode(name, payload)?),
            Self::UNLINK_NODES => Self::UnlinkNodes(decode(name, payload)?),
            Self::DELETE_NODE => Self::DeleteNode(decode(name, payload)?),
            Self::MERGE => Self::Merge,
            Self::SET_GEOMETRY => Self::SetGeometry(decode(name, payload)?),
            Self::SET_MEDIA => Self::SetMedia(decode(name, payload)?),
            Self::SET_TEXT => Self::SetText(decode(name, payload)?),
            Self::SET_DOCUMENT => Self::SetDocument(decode(name, payload)?),
            Self::PHYSICS_STEP => Self::PhysicsStep(decode(name, payload)?),
            Self::DERIVED_FEATURE => Self::DerivedFeature(decode(name, payload)?),
            other if Self::is_macro(other) => Self::Macro {
                name: other.to_string(),
                payload,
            },
            other => Self::Unrecognized {
                name: other.to_string(),
                payload,
            },
        };
        Ok(op)
    }

    /// Encode the payload half of this operation as JSON.
    pub fn payload(&self) -> Result<Value, TypeError> {
        fn encode<T: Serialize>(value: &T) -> Result<Value, TypeError> {
            serde_json::to_value(value).map_err(|e| TypeError::Serialization(e.to_string()))
        }

        match self {
            Self::CreateNode(p) => encode(p),
            Self::UpdateTransform(p) => encode(p),
            Self::SetProperties(p) => encode(p),
            Self::LinkNodes(p) | Self::UnlinkNodes(p) => encode(p),
            Self::DeleteNode(p) => encode(p),
            Self::Merge => Ok(Value::Object(serde_json::Map::new())),
            Self::SetGeometry(p) => encode(p),
            Self::SetMedia(p) => encode(p),
            Self::SetText(p) => encode(p),
            Self::SetDocument(p) => encode(p),
            Self::PhysicsStep(p) => encode(p),
            Self::DerivedFeature(p) => encode(p),
            Self::Macro { payload, .. } | Self::Unrecognized { payload, .. } => Ok(payload.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn create_node_decodes_with_defaults() {
        let op = Operation::from_parts("create_node", json!({"node_id": "n1", "kind": "wall"}))
            .unwrap();
        match op {
            Operation::CreateNode(p) => {
                assert_eq!(p.node_id, NodeId::from("n1"));
                assert!(p.transform.is_identity());
                assert!(p.properties.is_empty());
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn macro_namespace_is_preserved() {
        let payload = json!({"steps": [1, 2]});
        let op = Operation::from_parts("macro.extrude", payload.clone()).unwrap();
        assert!(op.is_forward_compatible());
        assert_eq!(op.name(), "macro.extrude");
        assert_eq!(op.payload().unwrap(), payload);
        assert!(matches!(op, Operation::Macro { .. }));
    }

    #[test]
    fn unknown_name_is_unrecognized_not_error() {
        let op = Operation::from_parts("teleport", json!({"x": 1})).unwrap();
        assert!(matches!(op, Operation::Unrecognized { ref name, .. } if name == "teleport"));
    }

    #[test]
    fn bad_payload_reports_operation() {
        let err = Operation::from_parts("delete_node", json!({})).unwrap_err();
        assert!(matches!(err, TypeError::InvalidPayload { ref operation, .. } if operation == "delete_node"));
    }

    #[test]
    fn merge_payload_is_empty_object() {
        assert_eq!(Operation::Merge.payload().unwrap(), json!({}));
        assert_eq!(Operation::from_parts("merge", json!({})).unwrap(), Operation::Merge);
    }

    #[test]
    fn node_id_accessor() {
        let op = Operation::LinkNodes(LinkChange {
            node_id: "a".into(),
            relation: "near".into(),
            target_node_id: "b".into(),
        });
        assert_eq!(op.node_id(), Some(&NodeId::from("a")));
        assert_eq!(Operation::Merge.node_id(), None);
    }

    #[test]
    fn known_names_roundtrip_through_name() {
        for name in Operation::KNOWN {
            assert!(Operation::is_known(name));
        }
        assert!(!Operation::is_known("macro.extrude"));
        assert!(Operation::is_macro("macro.extrude"));
    }
}
