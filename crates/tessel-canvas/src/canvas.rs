use std::cmp::Ordering;
use std::collections::HashSet;

use tessel_crypto::to_canonical_vec;
use tessel_types::{Event, Link, Node, NodeId, Operation, Snapshot, TileId};
use tracing::{debug, warn};

use crate::report::{BuildReport, CanvasWarning};
use crate::snapshot::state_from_snapshot;
use crate::state::TileState;

/// Deterministic materializer for tile state.
///
/// Pure and synchronous: no I/O, no shared state. Peers holding the same
/// set of events converge on identical state regardless of arrival order.
pub struct ShadowCanvas;

impl ShadowCanvas {
    /// Fold `events` over `snapshot` (or an empty tile).
    pub fn build(tile_id: &TileId, snapshot: Option<&Snapshot>, events: &[Event]) -> TileState {
        Self::build_with_report(tile_id, snapshot, events).0
    }

    /// Like [`build`](Self::build), also returning the conflicts found.
    ///
    /// Events are applied in [`ordered`](Self::ordered) order and each
    /// `event_id` is applied at most once: the first copy in that order wins.
    pub fn build_with_report(
        tile_id: &TileId,
        snapshot: Option<&Snapshot>,
        events: &[Event],
    ) -> (TileState, BuildReport) {
        let mut state = match snapshot {
            Some(snapshot) => {
                if &snapshot.tile_id != tile_id {
                    warn!(tile = %tile_id, snapshot_tile = %snapshot.tile_id, "snapshot belongs to another tile");
                }
                state_from_snapshot(snapshot)
            }
            None => TileState::new(tile_id.clone()),
        };

        let mut report = BuildReport::default();
        let mut seen = HashSet::new();
        for event in Self::ordered(events) {
            if !seen.insert(&event.event_id) {
                report.duplicates += 1;
                continue;
            }
            report.warnings.extend(Self::apply(&mut state, event));
            report.applied += 1;
        }

        debug!(
            tile = %tile_id,
            applied = report.applied,
            duplicates = report.duplicates,
            warnings = report.warnings.len(),
            nodes = state.len(),
            "tile materialized"
        );
        (state, report)
    }

    /// Events in application order: `(timestamp, event_id)`, then canonical
    /// encoding for copies that share both.
    pub fn ordered(events: &[Event]) -> Vec<&Event> {
        let mut sorted: Vec<&Event> = events.iter().collect();
        sorted.sort_by(|a, b| {
            a.order_key()
                .cmp(&b.order_key())
                .then_with(|| tie_break(a, b))
        });
        sorted
    }

    /// Apply one event in place. Skipped work is returned as warnings.
    pub fn apply(state: &mut TileState, event: &Event) -> Vec<CanvasWarning> {
        state.advance_horizon(event.order_mark());
        let mut warnings = Vec::new();
        match &event.operation {
            Operation::CreateNode(p) => {
                if state.nodes.contains_key(&p.node_id) {
                    warnings.push(CanvasWarning::DuplicateCreate {
                        event_id: event.event_id.clone(),
                        node_id: p.node_id.clone(),
                    });
                } else {
                    let node = Node::new(p.node_id.clone(), p.kind.clone(), p.transform, p.properties.clone());
                    state.nodes.insert(p.node_id.clone(), node);
                }
            }
            Operation::UpdateTransform(p) => {
                with_live(state, event, &p.node_id, &mut warnings, |n| n.transform = p.transform);
            }
            Operation::SetProperties(p) => {
                with_live(state, event, &p.node_id, &mut warnings, |n| {
                    n.properties
                        .extend(p.properties.iter().map(|(k, v)| (k.clone(), v.clone())));
                });
            }
            Operation::LinkNodes(p) => {
                with_live(state, event, &p.node_id, &mut warnings, |n| {
                    n.links.push(Link::new(p.relation.clone(), p.target_node_id.clone()));
                });
            }
            Operation::UnlinkNodes(p) => {
                with_live(state, event, &p.node_id, &mut warnings, |n| {
                    n.links
                        .retain(|l| !(l.relation == p.relation && l.target_node_id == p.target_node_id));
                });
            }
            Operation::DeleteNode(p) => match state.nodes.get_mut(&p.node_id) {
                Some(node) => node.deleted = true,
                None => warnings.push(CanvasWarning::MissingNode {
                    event_id: event.event_id.clone(),
                    operation: Operation::DELETE_NODE.to_string(),
                    node_id: p.node_id.clone(),
                }),
            },
            Operation::SetGeometry(p) => {
                with_live(state, event, &p.node_id, &mut warnings, |n| {
                    n.geometry = Some(p.geometry.clone());
                });
            }
            Operation::SetMedia(p) => {
                with_live(state, event, &p.node_id, &mut warnings, |n| n.media = Some(p.media.clone()));
            }
            Operation::SetText(p) => {
                with_live(state, event, &p.node_id, &mut warnings, |n| n.text = Some(p.text.clone()));
            }
            Operation::SetDocument(p) => {
                with_live(state, event, &p.node_id, &mut warnings, |n| {
                    n.document = Some(p.document.clone());
                });
            }
            Operation::PhysicsStep(p) => {
                for update in &p.updates {
                    with_live(state, event, &update.node_id, &mut warnings, |n| {
                        n.transform = update.transform;
                    });
                }
            }
            // Consumed by projection layers; no node state changes.
            Operation::Merge | Operation::DerivedFeature(_) => {}
            Operation::Macro { name, .. } => {
                debug!(tile = %state.tile_id, event = %event.event_id, operation = %name, "macro event ignored");
            }
            Operation::Unrecognized { name, .. } => {
                warnings.push(CanvasWarning::UnknownOperation {
                    event_id: event.event_id.clone(),
                    operation: name.clone(),
                });
            }
        }

        for warning in &warnings {
            warn!(tile = %state.tile_id, event = %event.event_id, "skipped: {warning}");
        }
        warnings
    }
}

/// Order two copies of the same `(timestamp, event_id)` by content.
fn tie_break(a: &Event, b: &Event) -> Ordering {
    if a == b {
        return Ordering::Equal;
    }
    let encode = |e: &Event| to_canonical_vec(e).unwrap_or_default();
    encode(a).cmp(&encode(b))
}

/// Run `f` on `node_id` if it exists and is not tombstoned.
fn with_live(
    state: &mut TileState,
    event: &Event,
    node_id: &NodeId,
    warnings: &mut Vec<CanvasWarning>,
    f: impl FnOnce(&mut Node),
) {
    let operation = event.operation.name().to_string();
    match state.nodes.get_mut(node_id) {
        Some(node) if node.is_live() => f(node),
        Some(_) => warnings.push(CanvasWarning::TombstonedNode {
            event_id: event.event_id.clone(),
            operation,
            node_id: node_id.clone(),
        }),
        None => warnings.push(CanvasWarning::MissingNode {
            event_id: event.event_id.clone(),
            operation,
            node_id: node_id.clone(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    use proptest::prelude::*;
    use serde_json::{json, Value};
    use tessel_types::{
        CreateNode, DeleteNode, DerivedFeature, EventBuilder, LinkChange, PhysicsStep, SetProperties,
        SetText, Transform, TransformUpdate, UpdateTransform,
    };

    use crate::snapshot::make_snapshot;

    fn tile() -> TileId {
        TileId::from("t_0_0")
    }

    fn event(id: &str, ts: u64, op: Operation) -> Event {
        EventBuilder::new("office", "t_0_0").event_id(id).timestamp(ts).build(op)
    }

    fn create(id: &str, ts: u64, node: &str, kind: &str) -> Event {
        event(
            id,
            ts,
            Operation::CreateNode(CreateNode {
                node_id: node.into(),
                kind: kind.into(),
                transform: Transform::identity(),
                properties: BTreeMap::new(),
            }),
        )
    }

    fn move_to(id: &str, ts: u64, node: &str, x: f64) -> Event {
        EventBuilder::new("office", "t_0_0")
            .event_id(id)
            .timestamp(ts)
            .derived()
            .build(Operation::UpdateTransform(UpdateTransform {
                node_id: node.into(),
                transform: Transform::at(x, 0.0, 0.0),
            }))
    }

    fn props(id: &str, ts: u64, node: &str, pairs: &[(&str, Value)]) -> Event {
        event(
            id,
            ts,
            Operation::SetProperties(SetProperties {
                node_id: node.into(),
                properties: pairs.iter().map(|(k, v)| (k.to_string(), v.clone())).collect(),
            }),
        )
    }

    fn link(id: &str, ts: u64, node: &str, relation: &str, target: &str) -> Event {
        event(
            id,
            ts,
            Operation::LinkNodes(LinkChange {
                node_id: node.into(),
                relation: relation.into(),
                target_node_id: target.into(),
            }),
        )
    }

    fn unlink(id: &str, ts: u64, node: &str, relation: &str, target: &str) -> Event {
        event(
            id,
            ts,
            Operation::UnlinkNodes(LinkChange {
                node_id: node.into(),
                relation: relation.into(),
                target_node_id: target.into(),
            }),
        )
    }

    fn delete(id: &str, ts: u64, node: &str) -> Event {
        event(id, ts, Operation::DeleteNode(DeleteNode { node_id: node.into() }))
    }

    fn node<'a>(state: &'a TileState, id: &str) -> &'a Node {
        state.node(&NodeId::from(id)).unwrap()
    }

    // -----------------------------------------------------------------------
    // ordering
    // -----------------------------------------------------------------------

    #[test]
    fn later_transform_wins() {
        let events = vec![create("e1", 100, "n1", "desk"), move_to("e2", 200, "n1", 4.0)];
        let state = ShadowCanvas::build(&tile(), None, &events);
        assert_eq!(state.len(), 1);
        assert_eq!(node(&state, "n1").transform, Transform::at(4.0, 0.0, 0.0));
    }

    #[test]
    fn arrival_order_does_not_matter() {
        let mut events = vec![
            create("e1", 100, "n1", "desk"),
            move_to("e2", 200, "n1", 1.0),
            move_to("e3", 300, "n1", 2.0),
        ];
        let forward = ShadowCanvas::build(&tile(), None, &events);
        events.reverse();
        let backward = ShadowCanvas::build(&tile(), None, &events);
        assert_eq!(forward, backward);
        assert_eq!(node(&forward, "n1").transform, Transform::at(2.0, 0.0, 0.0));
    }

    #[test]
    fn equal_timestamps_break_on_event_id() {
        let events = vec![move_to("b", 5, "n1", 2.0), move_to("a", 5, "n1", 1.0), create("0", 1, "n1", "desk")];
        let state = ShadowCanvas::build(&tile(), None, &events);
        // "b" sorts after "a", so it is applied last
        assert_eq!(node(&state, "n1").transform, Transform::at(2.0, 0.0, 0.0));
    }

    #[test]
    fn repeated_event_ids_apply_once() {
        let events = vec![
            create("e1", 1, "n1", "desk"),
            link("e2", 2, "n1", "near", "n2"),
            link("e2", 2, "n1", "near", "n2"),
        ];
        let (state, report) = ShadowCanvas::build_with_report(&tile(), None, &events);
        assert_eq!(node(&state, "n1").links.len(), 1);
        assert_eq!(report.applied, 2);
        assert_eq!(report.duplicates, 1);
        assert!(!report.has_warnings());
    }

    #[test]
    fn conflicting_copies_of_one_event_id_resolve_by_content() {
        let base = create("e1", 1, "n1", "desk");
        let one = move_to("dup", 5, "n1", 1.0);
        let two = move_to("dup", 5, "n1", 2.0);

        let a = ShadowCanvas::build(&tile(), None, &[base.clone(), one.clone(), two.clone()]);
        let b = ShadowCanvas::build(&tile(), None, &[base, two, one]);
        assert_eq!(a, b);
        assert_eq!(node(&a, "n1").transform, Transform::at(1.0, 0.0, 0.0));
    }

    // -----------------------------------------------------------------------
    // per-operation rules
    // -----------------------------------------------------------------------

    #[test]
    fn duplicate_create_keeps_first_under_order() {
        // listed first but applied second
        let events = vec![create("e2", 20, "n1", "chair"), create("e1", 10, "n1", "desk")];
        let (state, report) = ShadowCanvas::build_with_report(&tile(), None, &events);
        assert_eq!(node(&state, "n1").kind, "desk");
        assert_eq!(
            report.warnings,
            vec![CanvasWarning::DuplicateCreate {
                event_id: "e2".into(),
                node_id: "n1".into(),
            }]
        );
    }

    #[test]
    fn set_properties_merges_per_key() {
        let events = vec![
            create("e1", 1, "n1", "desk"),
            props("e2", 2, "n1", &[("color", json!("red")), ("label", json!("A"))]),
            props("e3", 3, "n1", &[("color", json!("blue"))]),
        ];
        let state = ShadowCanvas::build(&tile(), None, &events);
        let properties = &node(&state, "n1").properties;
        assert_eq!(properties["color"], json!("blue"));
        assert_eq!(properties["label"], json!("A"));
    }

    #[test]
    fn unlink_removes_every_matching_link_and_relink_works() {
        let events = vec![
            create("e1", 1, "n1", "desk"),
            link("e2", 2, "n1", "near", "n2"),
            link("e3", 3, "n1", "near", "n2"),
            link("e4", 4, "n1", "above", "n2"),
            unlink("e5", 5, "n1", "near", "n2"),
        ];
        let state = ShadowCanvas::build(&tile(), None, &events);
        assert_eq!(node(&state, "n1").links, vec![Link::new("above", "n2")]);

        let mut more = events.clone();
        more.push(link("e6", 6, "n1", "near", "n2"));
        let state = ShadowCanvas::build(&tile(), None, &more);
        assert_eq!(node(&state, "n1").links_to("near", &"n2".into()).count(), 1);
    }

    #[test]
    fn link_target_need_not_exist() {
        let events = vec![create("e1", 1, "n1", "desk"), link("e2", 2, "n1", "near", "elsewhere")];
        let (_, report) = ShadowCanvas::build_with_report(&tile(), None, &events);
        assert!(!report.has_warnings());
    }

    #[test]
    fn delete_tombstones_and_blocks_later_edits() {
        let events = vec![
            create("e1", 1, "n1", "desk"),
            delete("e2", 2, "n1"),
            delete("e3", 3, "n1"),
            move_to("e4", 4, "n1", 9.0),
        ];
        let (state, report) = ShadowCanvas::build_with_report(&tile(), None, &events);
        let n1 = node(&state, "n1");
        assert!(n1.deleted);
        assert_eq!(n1.transform, Transform::identity());
        assert_eq!(state.live_nodes().count(), 0);
        // the second delete is silent
        assert_eq!(report.warnings.len(), 1);
        assert!(matches!(
            &report.warnings[0],
            CanvasWarning::TombstonedNode { operation, .. } if operation == "update_transform"
        ));
    }

    #[test]
    fn recreate_after_delete_is_a_duplicate() {
        let events = vec![create("e1", 1, "n1", "desk"), delete("e2", 2, "n1"), create("e3", 3, "n1", "desk")];
        let (state, report) = ShadowCanvas::build_with_report(&tile(), None, &events);
        assert!(node(&state, "n1").deleted);
        assert!(matches!(report.warnings[0], CanvasWarning::DuplicateCreate { .. }));
    }

    #[test]
    fn edits_to_missing_nodes_warn() {
        let events = vec![delete("e1", 1, "ghost"), move_to("e2", 2, "ghost", 1.0)];
        let (state, report) = ShadowCanvas::build_with_report(&tile(), None, &events);
        assert!(state.is_empty());
        assert_eq!(report.warnings.len(), 2);
        assert!(report
            .warnings
            .iter()
            .all(|w| matches!(w, CanvasWarning::MissingNode { .. })));
    }

    #[test]
    fn payload_fields_replace() {
        let events = vec![
            create("e1", 1, "n1", "note"),
            event(
                "e2",
                2,
                Operation::SetText(SetText {
                    node_id: "n1".into(),
                    text: "draft".into(),
                }),
            ),
            event(
                "e3",
                3,
                Operation::SetText(SetText {
                    node_id: "n1".into(),
                    text: "final".into(),
                }),
            ),
        ];
        let state = ShadowCanvas::build(&tile(), None, &events);
        assert_eq!(node(&state, "n1").text.as_deref(), Some("final"));
    }

    #[test]
    fn physics_step_moves_live_nodes_only() {
        let step = EventBuilder::new("office", "t_0_0")
            .event_id("e3")
            .timestamp(3)
            .derived()
            .build(Operation::PhysicsStep(PhysicsStep {
                tick: 1,
                delta_time: 0.016,
                updates: vec![
                    TransformUpdate {
                        node_id: "n1".into(),
                        transform: Transform::at(1.0, 1.0, 1.0),
                    },
                    TransformUpdate {
                        node_id: "ghost".into(),
                        transform: Transform::at(2.0, 2.0, 2.0),
                    },
                ],
            }));
        let events = vec![create("e1", 1, "n1", "ball"), step];
        let (state, report) = ShadowCanvas::build_with_report(&tile(), None, &events);
        assert_eq!(node(&state, "n1").transform, Transform::at(1.0, 1.0, 1.0));
        assert_eq!(report.warnings.len(), 1);
        assert_eq!(report.warnings[0].event_id().as_str(), "e3");
    }

    #[test]
    fn metadata_operations_change_nothing() {
        let base = vec![create("e1", 1, "n1", "desk")];
        let mut with_meta = base.clone();
        with_meta.push(event("e2", 2, Operation::Merge));
        with_meta.push(
            EventBuilder::new("office", "t_0_0")
                .event_id("e3")
                .timestamp(3)
                .derived()
                .build(Operation::DerivedFeature(DerivedFeature {
                    node_id: Some("n1".into()),
                    feature: "area".into(),
                    value: json!(2.5),
                    inputs: vec![],
                })),
        );
        with_meta.push(event(
            "e4",
            4,
            Operation::Macro {
                name: "macro.layout".into(),
                payload: json!({}),
            },
        ));
        let (state, report) = ShadowCanvas::build_with_report(&tile(), None, &with_meta);
        assert_eq!(state, ShadowCanvas::build(&tile(), None, &base));
        assert!(!report.has_warnings());
    }

    #[test]
    fn unknown_operation_is_ignored_with_warning() {
        let events = vec![
            create("e1", 1, "n1", "desk"),
            event(
                "e2",
                2,
                Operation::Unrecognized {
                    name: "teleport".into(),
                    payload: json!({"node_id": "n1"}),
                },
            ),
        ];
        let (state, report) = ShadowCanvas::build_with_report(&tile(), None, &events);
        assert_eq!(state.len(), 1);
        assert_eq!(
            report.warnings,
            vec![CanvasWarning::UnknownOperation {
                event_id: "e2".into(),
                operation: "teleport".into(),
            }]
        );
    }

    // -----------------------------------------------------------------------
    // snapshots
    // -----------------------------------------------------------------------

    #[test]
    fn build_continues_from_snapshot() {
        let first = vec![create("e1", 1, "n1", "desk"), create("e2", 2, "n2", "chair")];
        let state = ShadowCanvas::build(&tile(), None, &first);
        let snapshot = make_snapshot(&state, "office", "e2");

        let rest = vec![move_to("e3", 3, "n1", 5.0), delete("e4", 4, "n2")];
        let resumed = ShadowCanvas::build(&tile(), Some(&snapshot), &rest);

        let mut all = first.clone();
        all.extend(rest);
        assert_eq!(resumed, ShadowCanvas::build(&tile(), None, &all));
    }

    // -----------------------------------------------------------------------
    // properties
    // -----------------------------------------------------------------------

    /// Small alphabet so conflicts are common.
    fn arb_events() -> impl Strategy<Value = Vec<Event>> {
        prop::collection::vec((0u8..7, 0usize..4, 0usize..4, 0u64..12, -3i32..4), 0..40).prop_map(|specs| {
            specs
                .into_iter()
                .enumerate()
                .map(|(i, (kind, n, m, ts, x))| {
                    let id = format!("e{i:03}");
                    let node = format!("n{n}");
                    let other = format!("n{m}");
                    match kind {
                        0 => create(&id, ts, &node, if x % 2 == 0 { "desk" } else { "chair" }),
                        1 => move_to(&id, ts, &node, f64::from(x)),
                        2 => props(&id, ts, &node, &[("label", json!(x))]),
                        3 => link(&id, ts, &node, "near", &other),
                        4 => unlink(&id, ts, &node, "near", &other),
                        5 => delete(&id, ts, &node),
                        _ => event(&id, ts, Operation::Merge),
                    }
                })
                .collect()
        })
    }

    proptest! {
        #[test]
        fn build_is_independent_of_input_order(
            (events, shuffled) in arb_events().prop_flat_map(|events| {
                let shuffled = Just(events.clone()).prop_shuffle();
                (Just(events), shuffled)
            })
        ) {
            let a = ShadowCanvas::build(&tile(), None, &events);
            let b = ShadowCanvas::build(&tile(), None, &shuffled);
            prop_assert_eq!(a.canonical_bytes().unwrap(), b.canonical_bytes().unwrap());
        }

        #[test]
        fn snapshot_round_trip_is_exact(events in arb_events()) {
            let state = ShadowCanvas::build(&tile(), None, &events);
            let snapshot = make_snapshot(&state, "office", "tip");
            prop_assert_eq!(&state_from_snapshot(&snapshot), &state);

            let json = serde_json::to_vec(&snapshot).unwrap();
            let decoded: Snapshot = serde_json::from_slice(&json).unwrap();
            prop_assert_eq!(state_from_snapshot(&decoded), state);
        }

        #[test]
        fn stored_snapshot_keeps_exact_coordinates(
            coords in prop::collection::vec(
                prop::num::f64::NORMAL | prop::num::f64::SUBNORMAL | prop::num::f64::ZERO,
                3..30,
            )
        ) {
            let mut state = TileState::new(tile());
            for (i, c) in coords.chunks_exact(3).enumerate() {
                let id = format!("n{i}");
                let transform = Transform {
                    position: [c[0], c[1], c[2]],
                    rotation: [c[2], c[0], c[1], 1.0],
                    scale: Transform::IDENTITY.scale,
                };
                state
                    .nodes
                    .insert(id.as_str().into(), Node::new(id.as_str(), "desk", transform, BTreeMap::new()));
            }

            let bytes = to_canonical_vec(&make_snapshot(&state, "office", "tip")).unwrap();
            let stored: Snapshot = serde_json::from_slice(&bytes).unwrap();
            prop_assert_eq!(state_from_snapshot(&stored), state);
        }
    }
}
