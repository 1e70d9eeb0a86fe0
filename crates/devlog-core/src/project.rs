//! Project rule configuration and compiled matchers.
//!
//! Rules arrive as an already-parsed structure (the YAML loader lives at the
//! boundary). Declared order is priority order: the first pattern match,
//! scanning rules then patterns within a rule, wins.

use regex::Regex;
use serde::Deserialize;
use thiserror::Error;

/// Reserved bucket name for activity no rule matched.
pub const OTHER_BUCKET: &str = "Other";

/// Errors raised while compiling project rules.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// A rule pattern failed to compile as a regular expression.
    #[error("invalid pattern {pattern:?} for project {project:?}: {source}")]
    Pattern {
        project: String,
        pattern: String,
        #[source]
        source: regex::Error,
    },
}

/// Parsed project rules, one entry per configured project.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectsConfig {
    #[serde(default)]
    pub projects: Vec<ProjectConfig>,
}

/// A single named rule.
#[derive(Debug, Clone, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default, rename = "match")]
    pub matchers: MatchConfig,
}

/// Pattern lists for one rule, split by event kind.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct MatchConfig {
    #[serde(default)]
    pub browser: BrowserMatch,
    #[serde(default)]
    pub terminal: TerminalMatch,
}

/// Patterns matched against browser titles.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct BrowserMatch {
    #[serde(default)]
    pub title: Vec<String>,
}

/// Patterns matched against terminal working directories.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TerminalMatch {
    #[serde(default)]
    pub cwd: Vec<String>,
}

#[derive(Debug)]
struct CompiledProject {
    name: String,
    browser_title: Vec<Regex>,
    terminal_cwd: Vec<Regex>,
}

/// Project rules with all patterns compiled, in declared priority order.
///
/// Compilation happens up front so a malformed pattern fails the whole
/// request before any classification work begins.
#[derive(Debug, Default)]
pub struct ProjectMatchers {
    projects: Vec<CompiledProject>,
}

impl ProjectMatchers {
    /// Compiles every pattern in the configuration.
    pub fn compile(config: &ProjectsConfig) -> Result<Self, ConfigError> {
        let mut projects = Vec::with_capacity(config.projects.len());
        for project in &config.projects {
            projects.push(CompiledProject {
                name: project.name.clone(),
                browser_title: compile_patterns(&project.name, &project.matchers.browser.title)?,
                terminal_cwd: compile_patterns(&project.name, &project.matchers.terminal.cwd)?,
            });
        }
        Ok(Self { projects })
    }

    /// Names of all configured projects, in declared order.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.projects.iter().map(|p| p.name.as_str())
    }

    /// Whether `name` is a configured project or the reserved bucket.
    pub fn knows(&self, name: &str) -> bool {
        name == OTHER_BUCKET || self.projects.iter().any(|p| p.name == name)
    }

    /// First project whose title patterns match, or the reserved bucket.
    pub fn match_browser(&self, title: &str) -> &str {
        self.projects
            .iter()
            .find(|p| p.browser_title.iter().any(|re| re.is_match(title)))
            .map_or(OTHER_BUCKET, |p| p.name.as_str())
    }

    /// First project whose cwd patterns match, or the reserved bucket.
    pub fn match_terminal(&self, cwd: &str) -> &str {
        self.projects
            .iter()
            .find(|p| p.terminal_cwd.iter().any(|re| re.is_match(cwd)))
            .map_or(OTHER_BUCKET, |p| p.name.as_str())
    }
}

fn compile_patterns(project: &str, patterns: &[String]) -> Result<Vec<Regex>, ConfigError> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|source| ConfigError::Pattern {
                project: project.to_string(),
                pattern: pattern.clone(),
                source,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(rules: &[(&str, &[&str], &[&str])]) -> ProjectsConfig {
        ProjectsConfig {
            projects: rules
                .iter()
                .map(|(name, titles, cwds)| ProjectConfig {
                    name: (*name).to_string(),
                    matchers: MatchConfig {
                        browser: BrowserMatch {
                            title: titles.iter().map(|s| (*s).to_string()).collect(),
                        },
                        terminal: TerminalMatch {
                            cwd: cwds.iter().map(|s| (*s).to_string()).collect(),
                        },
                    },
                })
                .collect(),
        }
    }

    #[test]
    fn first_match_wins_across_rule_order() {
        let matchers = ProjectMatchers::compile(&config(&[
            ("Alpha", &[], &["^/home/alice/proj.*"]),
            ("Beta", &[], &["^/home/alice/.*"]),
        ]))
        .expect("patterns compile");

        assert_eq!(matchers.match_terminal("/home/alice/project/x"), "Alpha");
        assert_eq!(matchers.match_terminal("/home/alice/notes"), "Beta");
        assert_eq!(matchers.match_terminal("/tmp"), OTHER_BUCKET);
    }

    #[test]
    fn browser_and_terminal_patterns_are_independent() {
        let matchers = ProjectMatchers::compile(&config(&[(
            "Docs",
            &["^Docs.*"],
            &["^/home/alice/docs"],
        )]))
        .expect("patterns compile");

        // A cwd never tests against title patterns, and vice versa.
        assert_eq!(matchers.match_terminal("Docs - Home"), OTHER_BUCKET);
        assert_eq!(matchers.match_browser("/home/alice/docs"), OTHER_BUCKET);
        assert_eq!(matchers.match_browser("Docs - Home"), "Docs");
    }

    #[test]
    fn malformed_pattern_fails_compilation() {
        let err = ProjectMatchers::compile(&config(&[("Broken", &["("], &[])])).unwrap_err();
        let ConfigError::Pattern {
            project, pattern, ..
        } = err;
        assert_eq!(project, "Broken");
        assert_eq!(pattern, "(");
    }

    #[test]
    fn knows_configured_projects_and_other() {
        let matchers =
            ProjectMatchers::compile(&config(&[("Alpha", &[], &[])])).expect("patterns compile");
        assert!(matchers.knows("Alpha"));
        assert!(matchers.knows(OTHER_BUCKET));
        assert!(!matchers.knows("Gamma"));
    }

    #[test]
    fn config_shape_defaults_missing_sections() {
        // The YAML loader lives at the boundary; the serde shape is
        // format-agnostic, so a JSON fixture exercises the same derives.
        let config: ProjectsConfig = serde_json::from_value(serde_json::json!({
            "projects": [
                {
                    "name": "Alpha",
                    "match": {
                        "browser": {"title": ["^Alpha.*"]},
                        "terminal": {"cwd": ["^/home/alice/alpha"]},
                    },
                },
                {
                    "name": "Beta",
                    "match": {"terminal": {"cwd": ["^/home/alice/beta"]}},
                },
                {"name": "Bare"},
            ],
        }))
        .expect("config deserializes");

        assert_eq!(config.projects.len(), 3);
        assert_eq!(config.projects[0].matchers.browser.title.len(), 1);
        assert!(config.projects[1].matchers.browser.title.is_empty());
        assert!(config.projects[2].matchers.terminal.cwd.is_empty());
    }
}
