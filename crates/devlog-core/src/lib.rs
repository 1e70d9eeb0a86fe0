//! Core domain logic for the devlog activity reporter.
//!
//! This crate contains the fundamental types and logic for:
//! - Event normalization: strict decoding and validation of ingested events
//! - Project classification: bucketing per-day activity via regex rules
//! - Report rendering: JSON payloads and fixed-width markdown tables

pub mod classify;
pub mod event;
pub mod project;
pub mod report;

pub use classify::{Classification, DrillDown, DrillDownRow, classify, drill_down, unclassified};
pub use event::{Event, EventKind, ValidationError, normalize};
pub use project::{ConfigError, ProjectMatchers, ProjectsConfig};
pub use report::{OutputMode, StatsPayload, ceil_minutes, render_drill_down, render_summary};
