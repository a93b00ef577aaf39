use serde_json::Value;
use tessel_types::{Event, SpaceId, TileId};
use tracing::debug;

use crate::config::ValidatorConfig;
use crate::envelope::check_envelope;
use crate::error::{Problem, Problems, ValidationError};
use crate::operations::check_operation;
use crate::rules::BoundaryValidator;

/// The gate every event passes before it may enter a tile's buffer.
///
/// Validation runs in two passes. The structural pass checks the envelope,
/// then the operation payload, collecting every problem. Only a structurally
/// valid event reaches the boundary pass. Nothing here performs I/O.
pub struct EventValidator {
    config: ValidatorConfig,
    boundary: BoundaryValidator,
}

impl EventValidator {
    /// A validator with the default boundary rules.
    pub fn new(config: ValidatorConfig) -> Self {
        Self::with_boundary(config, BoundaryValidator::with_default_rules())
    }

    /// A validator with a custom boundary rule set.
    pub fn with_boundary(config: ValidatorConfig, boundary: BoundaryValidator) -> Self {
        Self { config, boundary }
    }

    pub fn config(&self) -> &ValidatorConfig {
        &self.config
    }

    // -----------------------------------------------------------------------
    // Single events
    // -----------------------------------------------------------------------

    /// Validate one raw event, returning the decoded [`Event`].
    pub fn validate(&self, raw: &Value) -> Result<Event, ValidationError> {
        let event = self.validate_structure(raw)?;
        self.validate_boundary(&event)?;
        Ok(event)
    }

    /// Structural pass only: envelope, operation payload, decode.
    pub fn validate_structure(&self, raw: &Value) -> Result<Event, ValidationError> {
        self.structural(raw)
            .map_err(|problems| ValidationError::Structural(problems.into_vec()))
    }

    /// Boundary pass only. A no-op when `enforce_boundary` is off.
    pub fn validate_boundary(&self, event: &Event) -> Result<(), ValidationError> {
        if !self.config.enforce_boundary {
            return Ok(());
        }
        self.boundary.validate(event)
    }

    /// Validate an already-typed event, e.g. one produced by an
    /// [`EventBuilder`](tessel_types::EventBuilder).
    pub fn validate_event(&self, event: &Event) -> Result<(), ValidationError> {
        let raw = serde_json::to_value(event).map_err(|e| {
            ValidationError::Structural(vec![Problem::new("", format!("unencodable event: {e}"))])
        })?;
        self.validate(&raw).map(|_| ())
    }

    // -----------------------------------------------------------------------
    // Batches
    // -----------------------------------------------------------------------

    /// Validate a batch destined for `(space, tile)`.
    ///
    /// Problems from every event are aggregated under `events[i].` prefixes.
    /// Any structural problem fails the batch before boundary rules run.
    /// Events naming a different space or tile are structural problems.
    pub fn validate_batch(
        &self,
        space: &SpaceId,
        tile: &TileId,
        raws: &[Value],
    ) -> Result<Vec<Event>, ValidationError> {
        if raws.len() > self.config.max_batch_size {
            return Err(ValidationError::Structural(vec![Problem::new(
                "events",
                format!(
                    "batch of {} events exceeds the maximum of {}",
                    raws.len(),
                    self.config.max_batch_size
                ),
            )]));
        }

        let mut problems = Problems::new();
        let mut events = Vec::with_capacity(raws.len());
        for (i, raw) in raws.iter().enumerate() {
            let prefix = format!("events[{i}]");
            match self.structural(raw) {
                Ok(event) => {
                    let mut local = Problems::new();
                    if &event.space_id != space {
                        local.push(
                            "space_id",
                            format!("{} does not match append target {space}", event.space_id),
                        );
                    }
                    if &event.tile_id != tile {
                        local.push(
                            "tile_id",
                            format!("{} does not match append target {tile}", event.tile_id),
                        );
                    }
                    problems.absorb(&prefix, local);
                    events.push(event);
                }
                Err(found) => problems.absorb(&prefix, found),
            }
        }
        if !problems.is_empty() {
            return Err(ValidationError::Structural(problems.into_vec()));
        }

        if self.config.enforce_boundary {
            for (i, event) in events.iter().enumerate() {
                problems.absorb(&format!("events[{i}]"), self.boundary.problems(event));
            }
            if !problems.is_empty() {
                return Err(ValidationError::Boundary(problems.into_vec()));
            }
        }

        debug!(space = %space, tile = %tile, count = events.len(), "batch validated");
        Ok(events)
    }

    /// Validate typed events destined for `(space, tile)`.
    pub fn validate_events(
        &self,
        space: &SpaceId,
        tile: &TileId,
        events: &[Event],
    ) -> Result<(), ValidationError> {
        let raws = events
            .iter()
            .map(serde_json::to_value)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| {
                ValidationError::Structural(vec![Problem::new("events", format!("unencodable event: {e}"))])
            })?;
        self.validate_batch(space, tile, &raws).map(|_| ())
    }

    fn structural(&self, raw: &Value) -> Result<Event, Problems> {
        let mut problems = Problems::new();
        let Some(env) = check_envelope(raw, &mut problems) else {
            return Err(problems);
        };
        if !problems.is_empty() {
            return Err(problems);
        }

        check_operation(env, self.config.reject_unknown_operations, &mut problems);
        if !problems.is_empty() {
            return Err(problems);
        }

        serde_json::from_value::<Event>(raw.clone()).map_err(|e| {
            problems.push("", format!("could not decode event: {e}"));
            problems
        })
    }
}

impl Default for EventValidator {
    fn default() -> Self {
        Self::new(ValidatorConfig::default())
    }
}
