//! Event normalization and validation.
//!
//! Ingested bytes are decoded strictly (unknown fields reject the event) and
//! checked field by field in a fixed order, failing fast on the first
//! violation. Legacy `schema_version 1` terminal commands carry no interval;
//! their `end_ts` is defined to equal `start_ts` before the event reaches
//! the store.

use chrono::{DateTime, FixedOffset};
use serde::Deserialize;
use thiserror::Error;

/// Wire name of the browser focus-span event kind.
pub const BROWSER_ACTIVE_SPAN: &str = "browser_active_span";
/// Wire name of the terminal command event kind.
pub const TERMINAL_COMMAND: &str = "terminal_command";

/// Validation errors for ingested events.
///
/// The display messages are surfaced verbatim to submitting clients.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// The body was not valid JSON or contained unrecognized fields.
    #[error("invalid event body: {0}")]
    Malformed(#[from] serde_json::Error),

    /// A required field was missing or empty.
    #[error("{field} is required")]
    MissingField { field: &'static str },

    /// A required type-specific field was missing or empty.
    #[error("{field} is required for {kind}")]
    MissingKindField {
        field: &'static str,
        kind: &'static str,
    },

    /// A timestamp field did not parse as an offset-qualified date-time.
    #[error("{field} must be RFC 3339")]
    InvalidTimestamp { field: &'static str },

    /// The event type is not one of the known kinds.
    #[error("unknown type: {value}")]
    UnknownType { value: String },
}

/// A normalized activity event, ready for storage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Event {
    /// Free-text origin identifier (e.g. `chrome-extension`, `zsh-hook`).
    pub source: String,
    /// Caller-assigned unique identifier; the idempotency key.
    pub event_id: String,
    /// `1` for legacy single-instant events, `2` for interval events.
    pub schema_version: i64,
    /// When the activity started.
    pub start_ts: DateTime<FixedOffset>,
    /// When the activity ended. Never before validation-time defaulting;
    /// may still precede `start_ts` (clamped to zero downstream).
    pub end_ts: DateTime<FixedOffset>,
    /// The kind of activity with its type-specific fields.
    pub kind: EventKind,
}

/// The type of activity captured.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventKind {
    /// A browser tab held focus for an interval.
    BrowserActiveSpan { url: String, title: String },
    /// A command was executed in a terminal.
    TerminalCommand { cwd: String, command: String },
}

impl EventKind {
    /// Wire/storage name of this kind.
    #[must_use]
    pub const fn type_name(&self) -> &'static str {
        match self {
            Self::BrowserActiveSpan { .. } => BROWSER_ACTIVE_SPAN,
            Self::TerminalCommand { .. } => TERMINAL_COMMAND,
        }
    }
}

/// Raw wire shape. Absent fields decode as empty, mirroring how clients
/// omit fields that do not apply to their event kind.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct WireEvent {
    #[serde(rename = "type", default)]
    kind: String,
    #[serde(default)]
    source: String,
    #[serde(default)]
    event_id: String,
    #[serde(default)]
    schema_version: i64,
    #[serde(default)]
    start_ts: String,
    #[serde(default)]
    end_ts: String,
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    cwd: String,
    #[serde(default)]
    command: String,
}

/// Decodes and validates a raw event submission.
pub fn normalize(raw: &[u8]) -> Result<Event, ValidationError> {
    let wire: WireEvent = serde_json::from_slice(raw)?;
    validate(wire)
}

fn validate(wire: WireEvent) -> Result<Event, ValidationError> {
    if wire.kind.is_empty() {
        return Err(ValidationError::MissingField { field: "type" });
    }
    if wire.source.is_empty() {
        return Err(ValidationError::MissingField { field: "source" });
    }
    if wire.event_id.is_empty() {
        return Err(ValidationError::MissingField { field: "event_id" });
    }
    if wire.schema_version == 0 {
        return Err(ValidationError::MissingField {
            field: "schema_version",
        });
    }
    if wire.start_ts.is_empty() {
        return Err(ValidationError::MissingField { field: "start_ts" });
    }
    let start_ts = parse_timestamp(&wire.start_ts, "start_ts")?;

    // Legacy single-instant terminal events may omit end_ts entirely.
    let legacy_instant = wire.schema_version == 1 && wire.kind == TERMINAL_COMMAND;
    let end_ts = if wire.end_ts.is_empty() {
        if legacy_instant {
            start_ts
        } else {
            return Err(ValidationError::MissingField { field: "end_ts" });
        }
    } else {
        let parsed = parse_timestamp(&wire.end_ts, "end_ts")?;
        if legacy_instant { start_ts } else { parsed }
    };

    let kind = match wire.kind.as_str() {
        BROWSER_ACTIVE_SPAN => {
            if wire.url.is_empty() {
                return Err(ValidationError::MissingKindField {
                    field: "url",
                    kind: BROWSER_ACTIVE_SPAN,
                });
            }
            if wire.title.is_empty() {
                return Err(ValidationError::MissingKindField {
                    field: "title",
                    kind: BROWSER_ACTIVE_SPAN,
                });
            }
            EventKind::BrowserActiveSpan {
                url: wire.url,
                title: wire.title,
            }
        }
        TERMINAL_COMMAND => {
            if wire.cwd.is_empty() {
                return Err(ValidationError::MissingKindField {
                    field: "cwd",
                    kind: TERMINAL_COMMAND,
                });
            }
            if wire.command.is_empty() {
                return Err(ValidationError::MissingKindField {
                    field: "command",
                    kind: TERMINAL_COMMAND,
                });
            }
            EventKind::TerminalCommand {
                cwd: wire.cwd,
                command: wire.command,
            }
        }
        other => {
            return Err(ValidationError::UnknownType {
                value: other.to_string(),
            });
        }
    };

    Ok(Event {
        source: wire.source,
        event_id: wire.event_id,
        schema_version: wire.schema_version,
        start_ts,
        end_ts,
        kind,
    })
}

fn parse_timestamp(
    value: &str,
    field: &'static str,
) -> Result<DateTime<FixedOffset>, ValidationError> {
    DateTime::parse_from_rfc3339(value).map_err(|_| ValidationError::InvalidTimestamp { field })
}
