//! Bucketing of per-day duration maps into named projects.
//!
//! Inputs are the duration maps the store already aggregated; everything
//! here is a pure, in-memory computation.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use serde::Serialize;

use crate::project::{OTHER_BUCKET, ProjectMatchers};

/// Which duration map a raw key came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActivityKind {
    Browser,
    Terminal,
}

impl ActivityKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Browser => "browser",
            Self::Terminal => "terminal",
        }
    }
}

impl fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Raw keys that fell into the reserved bucket, kept for drill-down.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Overflow {
    pub browser: BTreeMap<String, i64>,
    pub terminal: BTreeMap<String, i64>,
}

/// Per-project totals plus the unmatched remainder.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Classification {
    /// Seconds per project name. Every configured project is present,
    /// zero-seeded, plus the reserved bucket.
    pub totals: BTreeMap<String, i64>,
    pub overflow: Overflow,
}

/// Assigns every aggregated key to a project bucket, first match wins.
pub fn classify(
    terminal: &HashMap<String, i64>,
    browser: &HashMap<String, i64>,
    matchers: &ProjectMatchers,
) -> Classification {
    let mut totals: BTreeMap<String, i64> = matchers
        .names()
        .map(|name| (name.to_string(), 0))
        .collect();
    totals.insert(OTHER_BUCKET.to_string(), 0);
    let mut overflow = Overflow::default();

    for (title, &seconds) in browser {
        let project = matchers.match_browser(title);
        *totals.entry(project.to_string()).or_default() += seconds;
        if project == OTHER_BUCKET {
            *overflow.browser.entry(title.clone()).or_default() += seconds;
        }
    }
    for (cwd, &seconds) in terminal {
        let project = matchers.match_terminal(cwd);
        *totals.entry(project.to_string()).or_default() += seconds;
        if project == OTHER_BUCKET {
            *overflow.terminal.entry(cwd.clone()).or_default() += seconds;
        }
    }

    Classification { totals, overflow }
}

/// The degenerate no-rules path: totals pass through unclassified, with a
/// synthetic reserved bucket equal to the grand total so the API shape
/// matches the classified path.
pub fn unclassified(
    terminal: &HashMap<String, i64>,
    browser: &HashMap<String, i64>,
) -> Classification {
    let grand_total = terminal.values().sum::<i64>() + browser.values().sum::<i64>();
    let mut totals = BTreeMap::new();
    totals.insert(OTHER_BUCKET.to_string(), grand_total);
    Classification {
        totals,
        overflow: Overflow {
            browser: browser.iter().map(|(k, v)| (k.clone(), *v)).collect(),
            terminal: terminal.iter().map(|(k, v)| (k.clone(), *v)).collect(),
        },
    }
}

/// One raw key assigned to the drilled-down project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrillDownRow {
    #[serde(rename = "title/cwd")]
    pub name: String,
    #[serde(rename = "type")]
    pub kind: ActivityKind,
    pub seconds: i64,
}

/// Detail view of all raw keys assigned to one project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DrillDown {
    pub name: String,
    #[serde(rename = "seconds")]
    pub total_seconds: i64,
    #[serde(rename = "list")]
    pub rows: Vec<DrillDownRow>,
}

/// Restricts classification to one named project (or the reserved bucket).
///
/// Returns `None` when `project_name` is neither configured nor the
/// reserved bucket. Rows are sorted by seconds descending, then name, then
/// kind. An existing project may still yield zero rows; whether that counts
/// as not-found is the caller's call.
pub fn drill_down(
    terminal: &HashMap<String, i64>,
    browser: &HashMap<String, i64>,
    matchers: &ProjectMatchers,
    project_name: &str,
) -> Option<DrillDown> {
    if !matchers.knows(project_name) {
        return None;
    }

    let mut rows = Vec::new();
    let mut total_seconds = 0;
    for (title, &seconds) in browser {
        if matchers.match_browser(title) == project_name {
            rows.push(DrillDownRow {
                name: title.clone(),
                kind: ActivityKind::Browser,
                seconds,
            });
            total_seconds += seconds;
        }
    }
    for (cwd, &seconds) in terminal {
        if matchers.match_terminal(cwd) == project_name {
            rows.push(DrillDownRow {
                name: cwd.clone(),
                kind: ActivityKind::Terminal,
                seconds,
            });
            total_seconds += seconds;
        }
    }

    rows.sort_by(|a, b| {
        b.seconds
            .cmp(&a.seconds)
            .then_with(|| a.name.cmp(&b.name))
            .then_with(|| a.kind.cmp(&b.kind))
    });

    Some(DrillDown {
        name: project_name.to_string(),
        total_seconds,
        rows,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::project::{ProjectConfig, ProjectsConfig};

    fn matchers(rules: &[(&str, &[&str], &[&str])]) -> ProjectMatchers {
        let config = ProjectsConfig {
            projects: rules
                .iter()
                .map(|(name, titles, cwds)| {
                    serde_json::from_value::<ProjectConfig>(serde_json::json!({
                        "name": name,
                        "match": {
                            "browser": {"title": titles},
                            "terminal": {"cwd": cwds},
                        },
                    }))
                    .expect("valid rule fixture")
                })
                .collect(),
        };
        ProjectMatchers::compile(&config).expect("patterns compile")
    }

    fn seconds_map(entries: &[(&str, i64)]) -> HashMap<String, i64> {
        entries
            .iter()
            .map(|(k, v)| ((*k).to_string(), *v))
            .collect()
    }

    #[test]
    fn assigns_matching_cwd_to_project() {
        let matchers = matchers(&[("Alpha", &[], &["^/home/alice/proj.*"])]);
        let terminal = seconds_map(&[("/home/alice/project/x", 120), ("/tmp", 30)]);
        let browser = HashMap::new();

        let result = classify(&terminal, &browser, &matchers);
        assert_eq!(result.totals["Alpha"], 120);
        assert_eq!(result.totals[OTHER_BUCKET], 30);
        assert_eq!(result.overflow.terminal["/tmp"], 30);
        assert!(result.overflow.browser.is_empty());
    }

    #[test]
    fn seeds_idle_projects_at_zero() {
        let matchers = matchers(&[("Alpha", &[], &["^/a"]), ("Idle", &[], &["^/never"])]);
        let result = classify(&seconds_map(&[("/a", 60)]), &HashMap::new(), &matchers);
        assert_eq!(result.totals["Idle"], 0);
        assert_eq!(result.totals[OTHER_BUCKET], 0);
    }

    #[test]
    fn browser_keys_only_test_title_patterns() {
        let matchers = matchers(&[("Docs", &["^Docs"], &[])]);
        let browser = seconds_map(&[("Docs - Home", 300), ("News", 60)]);
        let result = classify(&HashMap::new(), &browser, &matchers);
        assert_eq!(result.totals["Docs"], 300);
        assert_eq!(result.overflow.browser["News"], 60);
    }

    #[test]
    fn unclassified_reports_grand_total_under_other() {
        let terminal = seconds_map(&[("/a", 0)]);
        let browser = seconds_map(&[("Docs", 300)]);
        let result = unclassified(&terminal, &browser);
        assert_eq!(result.totals.len(), 1);
        assert_eq!(result.totals[OTHER_BUCKET], 300);
        assert_eq!(result.overflow.terminal["/a"], 0);
        assert_eq!(result.overflow.browser["Docs"], 300);
    }

    #[test]
    fn drill_down_unknown_project_is_none() {
        let matchers = matchers(&[("Alpha", &[], &["^/a"])]);
        let result = drill_down(&HashMap::new(), &HashMap::new(), &matchers, "Gamma");
        assert!(result.is_none());
    }

    #[test]
    fn drill_down_other_collects_unmatched_keys() {
        let matchers = matchers(&[("Alpha", &[], &["^/a"])]);
        let terminal = seconds_map(&[("/a/x", 100), ("/tmp", 40)]);
        let browser = seconds_map(&[("News", 60)]);

        let dd = drill_down(&terminal, &browser, &matchers, OTHER_BUCKET).expect("Other exists");
        assert_eq!(dd.total_seconds, 100);
        assert_eq!(dd.rows.len(), 2);
        assert_eq!(dd.rows[0].name, "News");
        assert_eq!(dd.rows[1].name, "/tmp");
    }

    #[test]
    fn drill_down_rows_sort_desc_seconds_then_name_then_kind() {
        let matchers = matchers(&[]);
        let terminal = seconds_map(&[("same", 50), ("zz", 50)]);
        let browser = seconds_map(&[("same", 50), ("top", 90)]);

        let dd = drill_down(&terminal, &browser, &matchers, OTHER_BUCKET).expect("Other exists");
        let order: Vec<(&str, ActivityKind)> = dd
            .rows
            .iter()
            .map(|row| (row.name.as_str(), row.kind))
            .collect();
        assert_eq!(
            order,
            vec![
                ("top", ActivityKind::Browser),
                ("same", ActivityKind::Browser),
                ("same", ActivityKind::Terminal),
                ("zz", ActivityKind::Terminal),
            ]
        );
    }

    #[test]
    fn drill_down_existing_project_may_be_empty() {
        let matchers = matchers(&[("Alpha", &[], &["^/a"])]);
        let dd = drill_down(&HashMap::new(), &HashMap::new(), &matchers, "Alpha")
            .expect("Alpha is configured");
        assert!(dd.rows.is_empty());
        assert_eq!(dd.total_seconds, 0);
    }

    #[test]
    fn drill_down_json_shape() {
        let matchers = matchers(&[]);
        let browser = seconds_map(&[("Docs", 300)]);
        let dd = drill_down(&HashMap::new(), &browser, &matchers, OTHER_BUCKET).unwrap();
        let json = serde_json::to_value(&dd).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "name": "Other",
                "seconds": 300,
                "list": [{"title/cwd": "Docs", "type": "browser", "seconds": 300}],
            })
        );
    }
}
