//! The Tessel engine: one API over validation, tile storage, and the
//! shadow canvas.
//!
//! ```text
//! append_events ──▶ EventValidator ──▶ TileRuntime buffers ──▶ segments
//!                                                               │
//! materialize ◀── ShadowCanvas ◀── snapshot + segments since ◀──┘
//! ```
//!
//! # Logical Operations
//!
//! - [`Engine::get_tile_tip`]
//! - [`Engine::get_segments_since`]
//! - [`Engine::get_object`]
//! - [`Engine::append_events`]
//!
//! Transports wrap these; the response types in [`api`] serialize to the
//! JSON shapes peers exchange.

pub mod api;
pub mod config;
pub mod engine;
pub mod error;
pub mod telemetry;

pub use api::{AppendResponse, SegmentsSince, TileTip};
pub use config::EngineConfig;
pub use engine::{Engine, Materialized};
pub use error::{EngineError, EngineResult};
pub use telemetry::init_tracing;
