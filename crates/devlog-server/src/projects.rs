//! YAML project-rules loading.
//!
//! Rules are re-read on every report request so edits take effect without a
//! restart. A missing file means no projects are configured; any other
//! failure is surfaced to the caller.

use std::path::{Path, PathBuf};

use devlog_core::ProjectsConfig;
use thiserror::Error;

/// Errors loading the project-rules file.
#[derive(Debug, Error)]
pub enum ProjectsError {
    /// The file exists but could not be read.
    #[error("failed to read project rules from {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// The file was read but is not valid rules YAML.
    #[error("failed to parse project rules from {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },
}

/// Loads the rules file, distinguishing "absent" from "broken".
pub fn load(path: &Path) -> Result<Option<ProjectsConfig>, ProjectsError> {
    let raw = match std::fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(source) => {
            return Err(ProjectsError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    let config = serde_yaml::from_str(&raw).map_err(|source| ProjectsError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(Some(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_file_means_no_projects() {
        let dir = tempfile::tempdir().unwrap();
        let result = load(&dir.path().join("projects.yaml")).unwrap();
        assert!(result.is_none());
    }

    #[test]
    fn parses_rules_yaml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.yaml");
        std::fs::write(
            &path,
            r#"
projects:
  - name: Alpha
    match:
      browser:
        title:
          - "^Alpha.*"
      terminal:
        cwd:
          - "^/home/alice/alpha"
  - name: Beta
    match:
      terminal:
        cwd:
          - "^/home/alice/beta"
"#,
        )
        .unwrap();

        let config = load(&path).unwrap().expect("file exists");
        assert_eq!(config.projects.len(), 2);
        assert_eq!(config.projects[0].name, "Alpha");
        assert_eq!(config.projects[1].matchers.terminal.cwd.len(), 1);
        assert!(config.projects[1].matchers.browser.title.is_empty());
    }

    #[test]
    fn malformed_yaml_is_a_parse_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("projects.yaml");
        std::fs::write(&path, "projects: [name: {").unwrap();

        let err = load(&path).unwrap_err();
        assert!(matches!(err, ProjectsError::Parse { .. }));
    }
}
