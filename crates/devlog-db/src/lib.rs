//! Storage layer for the devlog activity reporter.
//!
//! An append-only table of events keyed by the caller-supplied `event_id`,
//! persisted with `rusqlite`.
//!
//! # Thread Safety
//!
//! [`EventStore`] wraps a `rusqlite::Connection`, which is `Send` but not
//! `Sync`. For concurrent request handling, serialize access with a mutex;
//! the uniqueness constraint on `event_id` is the sole coordination point
//! and is enforced by SQLite itself, not by a read-then-write in this crate.
//!
//! # Schema
//!
//! Timestamps are stored as RFC 3339 TEXT, preserving the submitter's
//! offset. Each row carries the verbatim submitted payload and a
//! `schema_version` marker; version 1 rows (legacy single-instant terminal
//! events) are rewritten to version 2 by [`EventStore::migrate_legacy_events`],
//! which must run before any read-path query is served.

use std::collections::HashMap;
use std::path::Path;

use chrono::{DateTime, NaiveDate, SecondsFormat, Utc};
use devlog_core::event::{BROWSER_ACTIVE_SPAN, Event, EventKind, TERMINAL_COMMAND};
use rusqlite::{Connection, params};
use serde::{Deserialize, Serialize};

/// Storage errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// An error from the underlying database.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// An event with this `event_id` is already stored.
    #[error("event_id already exists")]
    DuplicateEvent { event_id: String },
    /// A stored timestamp failed to parse back.
    #[error("invalid stored timestamp {timestamp:?}: {source}")]
    TimestampParse {
        timestamp: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Which calendar a day boundary is evaluated against.
///
/// A deployment-level choice: the two observed deployments disagreed, so
/// the pipeline takes it as configuration instead of hard-coding either.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DayBoundary {
    /// Group by the UTC calendar day of the event's start.
    #[default]
    Utc,
    /// Group by the deployment host's local calendar day.
    Local,
}

impl DayBoundary {
    /// SQL expression extracting the grouping date from `start_ts`.
    const fn date_expr(self) -> &'static str {
        match self {
            Self::Utc => "date(start_ts)",
            Self::Local => "date(start_ts, 'localtime')",
        }
    }
}

/// Append-only event store.
///
/// See the [module documentation](self) for thread safety considerations.
pub struct EventStore {
    conn: Connection,
}

impl EventStore {
    /// Opens a store at the given path, creating the schema if necessary.
    pub fn open(path: &Path) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Opens an in-memory store.
    ///
    /// Useful for testing. The store is destroyed when the connection closes.
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        let store = Self { conn };
        store.init()?;
        Ok(store)
    }

    /// Initializes the schema. Idempotent.
    fn init(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(
            "
            CREATE TABLE IF NOT EXISTS events (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                event_id TEXT NOT NULL UNIQUE,
                type TEXT NOT NULL,
                source TEXT NOT NULL,
                schema_version INTEGER NOT NULL,
                start_ts TEXT NOT NULL,
                end_ts TEXT NOT NULL,
                url TEXT,
                title TEXT,
                cwd TEXT,
                command TEXT,
                payload TEXT NOT NULL,
                received_at TEXT NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_events_type_start ON events(type, start_ts);
            ",
        )?;
        Ok(())
    }

    /// Inserts one validated event with its verbatim payload.
    ///
    /// A second insert with the same `event_id` fails with
    /// [`StoreError::DuplicateEvent`] and leaves the original row untouched.
    pub fn insert(&self, event: &Event, payload: &str) -> Result<(), StoreError> {
        let received_at = Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true);
        let (url, title, cwd, command) = match &event.kind {
            EventKind::BrowserActiveSpan { url, title } => {
                (Some(url.as_str()), Some(title.as_str()), None, None)
            }
            EventKind::TerminalCommand { cwd, command } => {
                (None, None, Some(cwd.as_str()), Some(command.as_str()))
            }
        };

        let result = self.conn.execute(
            "
            INSERT INTO events (
                event_id, type, source, schema_version, start_ts, end_ts,
                url, title, cwd, command, payload, received_at
            ) VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
            ",
            params![
                event.event_id,
                event.kind.type_name(),
                event.source,
                event.schema_version,
                event.start_ts.to_rfc3339(),
                event.end_ts.to_rfc3339(),
                url,
                title,
                cwd,
                command,
                payload,
                received_at,
            ],
        );
        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateEvent {
                    event_id: event.event_id.clone(),
                })
            }
            Err(err) => Err(err.into()),
        }
    }

    /// Rewrites legacy `schema_version 1` rows to version 2 in one
    /// transaction: terminal rows get `end_ts := start_ts`, then every
    /// version-1 row is bumped. Idempotent; returns whether any row moved.
    pub fn migrate_legacy_events(&mut self) -> Result<bool, StoreError> {
        let tx = self.conn.transaction()?;

        let pending: i64 = tx.query_row(
            "SELECT COUNT(*) FROM events WHERE schema_version = 1",
            [],
            |row| row.get(0),
        )?;
        if pending == 0 {
            return Ok(false);
        }

        tx.execute(
            "UPDATE events SET end_ts = start_ts WHERE schema_version = 1 AND type = ?",
            [TERMINAL_COMMAND],
        )?;
        tx.execute("UPDATE events SET schema_version = 2 WHERE schema_version = 1", [])?;
        tx.commit()?;

        tracing::info!(rows = pending, "migrated legacy events to schema_version 2");
        Ok(true)
    }

    /// Seconds of terminal activity per working directory for one day.
    ///
    /// Each directory is treated as a single continuous span: earliest
    /// start to latest end across all commands that day, clamped at zero.
    pub fn terminal_durations_by_cwd(
        &self,
        day: NaiveDate,
        boundary: DayBoundary,
    ) -> Result<HashMap<String, i64>, StoreError> {
        let sql = format!(
            "
            SELECT cwd, MIN(start_ts), MAX(end_ts)
            FROM events
            WHERE type = ? AND {} = ?
            GROUP BY cwd
            ",
            boundary.date_expr(),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![TERMINAL_COMMAND, day.format("%Y-%m-%d").to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                ))
            },
        )?;

        let mut out = HashMap::new();
        for row in rows {
            let (cwd, min_start, max_end) = row?;
            let start = parse_stored_timestamp(&min_start)?;
            let end = parse_stored_timestamp(&max_end)?;
            out.insert(cwd, (end - start).num_seconds().max(0));
        }
        Ok(out)
    }

    /// Seconds of browser focus per title (URL when the title is blank)
    /// for one day.
    ///
    /// Unlike terminal activity, spans are summed per row so disjoint
    /// visits to the same page do not collapse into one interval.
    pub fn browser_durations_by_title(
        &self,
        day: NaiveDate,
        boundary: DayBoundary,
    ) -> Result<HashMap<String, i64>, StoreError> {
        let sql = format!(
            "
            SELECT title, url, start_ts, end_ts
            FROM events
            WHERE type = ? AND {} = ?
            ",
            boundary.date_expr(),
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let rows = stmt.query_map(
            params![BROWSER_ACTIVE_SPAN, day.format("%Y-%m-%d").to_string()],
            |row| {
                Ok((
                    row.get::<_, String>(0)?,
                    row.get::<_, String>(1)?,
                    row.get::<_, String>(2)?,
                    row.get::<_, String>(3)?,
                ))
            },
        )?;

        let mut out: HashMap<String, i64> = HashMap::new();
        for row in rows {
            let (title, url, start_raw, end_raw) = row?;
            let key = if title.trim().is_empty() { url } else { title };
            let start = parse_stored_timestamp(&start_raw)?;
            let end = parse_stored_timestamp(&end_raw)?;
            *out.entry(key).or_default() += (end - start).num_seconds().max(0);
        }
        Ok(out)
    }
}

fn parse_stored_timestamp(value: &str) -> Result<DateTime<Utc>, StoreError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|source| StoreError::TimestampParse {
            timestamp: value.to_string(),
            source,
        })
}
