//! Event validation for Tessel.
//!
//! Nothing enters a tile's ledger without passing the [`EventValidator`].
//! Validation is exhaustive: every problem in an event (or a whole batch) is
//! collected into one [`ValidationError`] so callers can report them all in
//! one round trip.
//!
//! 1. **Envelope**: required fields, types, scope enums, root invariants,
//!    path-safe space and tile ids.
//! 2. **Operation**: payload shape of each known operation. `macro.*` and
//!    unrecognized operations are accepted with envelope-only validation.
//! 3. **Boundary**: `authority: source` events carry only symbolic or
//!    identity-valued spatial data (see [`rules`]).
//!
//! ```
//! use serde_json::json;
//! use tessel_validate::EventValidator;
//!
//! let raw = json!({
//!     "event_id": "e1", "timestamp": 1,
//!     "space_id": "office", "tile_id": "t_0_0",
//!     "layer_id": "base", "actor_id": "alice",
//!     "operation": "create_node",
//!     "payload": {"node_id": "n1", "kind": "desk"},
//!     "scope": {"realm": "team", "authority": "source", "boundary": "interior"},
//!     "preserves_invariants": tessel_types::ROOT_INVARIANTS,
//! });
//! assert!(EventValidator::default().validate(&raw).is_ok());
//! ```

pub mod config;
pub mod envelope;
pub mod error;
mod fields;
pub mod operations;
pub mod rules;
pub mod validator;

pub use config::ValidatorConfig;
pub use error::{ConfigError, Problem, Problems, ValidationError};
pub use rules::{BoundaryRule, BoundaryValidator};
pub use validator::EventValidator;
