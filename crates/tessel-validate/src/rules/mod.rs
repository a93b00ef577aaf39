//! Source/derived boundary rules.
//!
//! Events with `authority: source` are ground truth and may carry only
//! symbolic or identity-valued spatial data. Each rule inspects one concern
//! and records problems; the [`BoundaryValidator`] runs them all so a caller
//! sees every violation in one round trip.

pub mod feature;
pub mod properties;
pub mod transform;

pub use feature::DerivedFeatureRule;
pub use properties::{SpatialPropertyRule, SPATIAL_PROPERTY_KEYS};
pub use transform::{IdentityTransformRule, SpatialMutationRule};

use tessel_types::Event;
use tracing::debug;

use crate::error::{Problems, ValidationError};

// ---------------------------------------------------------------------------
// BoundaryRule trait
// ---------------------------------------------------------------------------

/// One boundary check over a structurally valid event.
///
/// Object-safe and `Send + Sync` so rules can live in a
/// `Vec<Box<dyn BoundaryRule>>`.
pub trait BoundaryRule: Send + Sync {
    /// Short name used in logs, e.g. `"identity_transform"`.
    fn name(&self) -> &str;

    /// Record every violation in `event`.
    fn check(&self, event: &Event, problems: &mut Problems);
}

// ---------------------------------------------------------------------------
// BoundaryValidator
// ---------------------------------------------------------------------------

/// Runs every configured rule against `source` events.
///
/// Derived events are never checked: numeric data is exactly what they are
/// for.
pub struct BoundaryValidator {
    rules: Vec<Box<dyn BoundaryRule>>,
}

impl BoundaryValidator {
    /// A validator with no rules; every event passes.
    pub fn new() -> Self {
        Self { rules: Vec::new() }
    }

    /// The standard rule set:
    /// identity transform -> spatial mutation -> derived feature -> spatial properties
    pub fn with_default_rules() -> Self {
        let mut validator = Self::new();
        validator.add_rule(Box::new(IdentityTransformRule));
        validator.add_rule(Box::new(SpatialMutationRule));
        validator.add_rule(Box::new(DerivedFeatureRule));
        validator.add_rule(Box::new(SpatialPropertyRule));
        validator
    }

    pub fn add_rule(&mut self, rule: Box<dyn BoundaryRule>) {
        self.rules.push(rule);
    }

    pub fn rule_count(&self) -> usize {
        self.rules.len()
    }

    /// Collect problems from every rule without deciding.
    pub fn problems(&self, event: &Event) -> Problems {
        let mut problems = Problems::new();
        if event.scope.is_derived() {
            return problems;
        }
        for rule in &self.rules {
            let before = problems.len();
            rule.check(event, &mut problems);
            if problems.len() > before {
                debug!(
                    rule = rule.name(),
                    event_id = %event.event_id,
                    found = problems.len() - before,
                    "boundary rule violated"
                );
            }
        }
        problems
    }

    /// Fail with [`ValidationError::Boundary`] if any rule is violated.
    pub fn validate(&self, event: &Event) -> Result<(), ValidationError> {
        let problems = self.problems(event);
        if problems.is_empty() {
            Ok(())
        } else {
            Err(ValidationError::Boundary(problems.into_vec()))
        }
    }
}

impl Default for BoundaryValidator {
    fn default() -> Self {
        Self::with_default_rules()
    }
}
