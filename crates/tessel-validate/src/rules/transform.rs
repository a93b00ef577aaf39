use tessel_types::{Event, Operation};

use crate::error::Problems;
use crate::rules::BoundaryRule;

/// `create_node` under source authority must sit at the identity transform.
///
/// Placement is expressed as symbolic relations; the numeric pose is a
/// derived projection. Each non-identity component is its own problem.
pub struct IdentityTransformRule;

impl BoundaryRule for IdentityTransformRule {
    fn name(&self) -> &str {
        "identity_transform"
    }

    fn check(&self, event: &Event, problems: &mut Problems) {
        let Operation::CreateNode(create) = &event.operation else {
            return;
        };
        let t = &create.transform;
        if !t.has_zero_position() {
            problems.push(
                "payload.transform.position",
                "source events must use a zero position",
            );
        }
        if !t.has_identity_rotation() {
            problems.push(
                "payload.transform.rotation",
                "source events must use the identity rotation",
            );
        }
        if !t.has_unit_scale() {
            problems.push(
                "payload.transform.scale",
                "source events must use a unit scale",
            );
        }
    }
}

/// Spatial mutation is always a derived projection.
///
/// `update_transform` and `physics_step` are rejected under source authority
/// whatever their values.
pub struct SpatialMutationRule;

impl BoundaryRule for SpatialMutationRule {
    fn name(&self) -> &str {
        "spatial_mutation"
    }

    fn check(&self, event: &Event, problems: &mut Problems) {
        if matches!(
            event.operation,
            Operation::UpdateTransform(_) | Operation::PhysicsStep(_)
        ) {
            problems.push(
                "scope.authority",
                format!(
                    "{} must carry derived authority; express source placement as relations",
                    event.operation.name()
                ),
            );
        }
    }
}
