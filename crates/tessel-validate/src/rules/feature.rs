use tessel_types::{Event, Operation};

use crate::error::Problems;
use crate::rules::BoundaryRule;

/// Computed features are derived by definition.
pub struct DerivedFeatureRule;

impl BoundaryRule for DerivedFeatureRule {
    fn name(&self) -> &str {
        "derived_feature"
    }

    fn check(&self, event: &Event, problems: &mut Problems) {
        if let Operation::DerivedFeature(feature) = &event.operation {
            problems.push(
                "scope.authority",
                format!("derived_feature {:?} must carry derived authority", feature.feature),
            );
        }
    }
}
