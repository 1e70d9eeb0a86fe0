//! Deterministic report rendering.
//!
//! Two shapes: a structured JSON payload and fixed-column-width markdown
//! tables. Column padding and truncation are display-width aware so wide
//! (CJK) characters line up; both table styles share one cell helper pair.

use std::collections::{BTreeMap, HashMap};
use std::fmt::{self, Write as _};
use std::str::FromStr;

use serde::Serialize;
use unicode_width::{UnicodeWidthChar, UnicodeWidthStr};

use crate::classify::{ActivityKind, Classification, DrillDown, Overflow};

const NAME_WIDTH: usize = 60;
const TYPE_WIDTH: usize = 8;
const TIME_WIDTH: usize = 9;

/// Caller-requested output shape.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum OutputMode {
    Json,
    #[default]
    Md,
}

impl FromStr for OutputMode {
    type Err = UnknownOutputMode;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "json" => Ok(Self::Json),
            "md" => Ok(Self::Md),
            _ => Err(UnknownOutputMode(s.to_string())),
        }
    }
}

/// Error type for unrecognized output-mode tokens.
#[derive(Debug, Clone)]
pub struct UnknownOutputMode(String);

impl fmt::Display for UnknownOutputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown output mode: {}", self.0)
    }
}

impl std::error::Error for UnknownOutputMode {}

/// Structured stats payload: raw duration maps plus classification.
#[derive(Debug, Serialize)]
pub struct StatsPayload {
    pub terminal_command: BTreeMap<String, i64>,
    pub browser_active_span: BTreeMap<String, i64>,
    pub projects: BTreeMap<String, i64>,
    pub project_others: Overflow,
}

impl StatsPayload {
    #[must_use]
    pub fn new(
        terminal: &HashMap<String, i64>,
        browser: &HashMap<String, i64>,
        classification: Classification,
    ) -> Self {
        Self {
            terminal_command: terminal.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            browser_active_span: browser.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            projects: classification.totals,
            project_others: classification.overflow,
        }
    }
}

/// Whole minutes, rounding any positive remainder up. Zero stays zero.
#[must_use]
pub const fn ceil_minutes(seconds: i64) -> i64 {
    if seconds <= 0 { 0 } else { (seconds + 59) / 60 }
}

/// Renders the two-section summary table: sorted project totals, then the
/// sorted unmatched remainder with its per-kind detail.
#[must_use]
pub fn render_summary(classification: &Classification) -> String {
    let mut project_rows: Vec<(&str, i64)> = classification
        .totals
        .iter()
        .map(|(name, seconds)| (name.as_str(), *seconds))
        .collect();
    project_rows.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));

    let mut other_rows: Vec<(&str, ActivityKind, i64)> = classification
        .overflow
        .browser
        .iter()
        .map(|(name, seconds)| (name.as_str(), ActivityKind::Browser, *seconds))
        .chain(
            classification
                .overflow
                .terminal
                .iter()
                .map(|(name, seconds)| (name.as_str(), ActivityKind::Terminal, *seconds)),
        )
        .collect();
    other_rows.sort_by(|a, b| {
        b.2.cmp(&a.2)
            .then_with(|| a.0.cmp(b.0))
            .then_with(|| a.1.cmp(&b.1))
    });

    let mut out = String::new();
    out.push_str("# Project Summary\n\n");
    let _ = writeln!(
        out,
        "| {} | {} |",
        pad_right("Project", NAME_WIDTH),
        pad_left("Time(min)", TIME_WIDTH),
    );
    let _ = writeln!(out, "| {} | {} |", "-".repeat(NAME_WIDTH), "-".repeat(TIME_WIDTH));
    for (name, seconds) in project_rows {
        let _ = writeln!(
            out,
            "| {} | {} |",
            pad_right(name, NAME_WIDTH),
            pad_left(&ceil_minutes(seconds).to_string(), TIME_WIDTH),
        );
    }

    out.push_str("\n# Others List\n\n");
    push_detail_header(&mut out, "Others");
    for (name, kind, seconds) in other_rows {
        push_detail_row(&mut out, name, kind, seconds);
    }

    out
}

/// Renders one project's drill-down table with its total in the header.
#[must_use]
pub fn render_drill_down(drill_down: &DrillDown) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "# {} {}: Drill down\n",
        drill_down.name,
        ceil_minutes(drill_down.total_seconds),
    );
    push_detail_header(&mut out, "Title/CWD");
    for row in &drill_down.rows {
        push_detail_row(&mut out, &row.name, row.kind, row.seconds);
    }
    out
}

fn push_detail_header(out: &mut String, name_label: &str) {
    let _ = writeln!(
        out,
        "| {} | {} | {} |",
        pad_right(name_label, NAME_WIDTH),
        pad_right("Type", TYPE_WIDTH),
        pad_left("Time(min)", TIME_WIDTH),
    );
    let _ = writeln!(
        out,
        "| {} | {} | {} |",
        "-".repeat(NAME_WIDTH),
        "-".repeat(TYPE_WIDTH),
        "-".repeat(TIME_WIDTH),
    );
}

fn push_detail_row(out: &mut String, name: &str, kind: ActivityKind, seconds: i64) {
    let _ = writeln!(
        out,
        "| {} | {} | {} |",
        pad_right(name, NAME_WIDTH),
        pad_right(kind.as_str(), TYPE_WIDTH),
        pad_left(&ceil_minutes(seconds).to_string(), TIME_WIDTH),
    );
}

/// Truncates to at most `width` display columns, never splitting a wide
/// character across the boundary.
fn truncate_to_width(value: &str, width: usize) -> &str {
    let mut used = 0;
    let mut end = 0;
    for (idx, ch) in value.char_indices() {
        let w = UnicodeWidthChar::width(ch).unwrap_or(0);
        if used + w > width {
            break;
        }
        used += w;
        end = idx + ch.len_utf8();
    }
    &value[..end]
}

fn pad_right(value: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    let display = UnicodeWidthStr::width(value);
    if display >= width {
        return truncate_to_width(value, width).to_string();
    }
    let mut padded = String::with_capacity(value.len() + width - display);
    padded.push_str(value);
    padded.extend(std::iter::repeat_n(' ', width - display));
    padded
}

fn pad_left(value: &str, width: usize) -> String {
    if width == 0 {
        return String::new();
    }
    let display = UnicodeWidthStr::width(value);
    if display >= width {
        return truncate_to_width(value, width).to_string();
    }
    let mut padded = String::with_capacity(value.len() + width - display);
    padded.extend(std::iter::repeat_n(' ', width - display));
    padded.push_str(value);
    padded
}
