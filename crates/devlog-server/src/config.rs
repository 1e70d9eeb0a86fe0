//! Configuration loading and management.

use std::fmt;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use devlog_db::DayBoundary;
use figment::Figment;
use figment::providers::{Env, Format, Serialized, Toml};
use serde::{Deserialize, Serialize};

/// Daemon configuration.
#[derive(Clone, Serialize, Deserialize)]
pub struct Config {
    /// Address the HTTP listener binds to.
    pub listen_addr: SocketAddr,
    /// Path to the database file.
    pub database_path: PathBuf,
    /// Path to the YAML project-rules file. A missing file is the valid
    /// "no projects configured" state, not an error.
    pub projects_path: PathBuf,
    /// Which calendar the per-day queries group by.
    pub day_boundary: DayBoundary,
}

impl fmt::Debug for Config {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Config")
            .field("listen_addr", &self.listen_addr)
            .field("database_path", &self.database_path)
            .field("projects_path", &self.projects_path)
            .field("day_boundary", &self.day_boundary)
            .finish()
    }
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs_data_path().unwrap_or_else(|| PathBuf::from("."));
        let config_dir = dirs_config_path().unwrap_or_else(|| PathBuf::from("."));
        Self {
            listen_addr: SocketAddr::from(([127, 0, 0, 1], 8787)),
            database_path: data_dir.join("devlog.db"),
            projects_path: config_dir.join("projects.yaml"),
            day_boundary: DayBoundary::default(),
        }
    }
}

impl Config {
    /// Loads configuration from default locations.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load() -> Result<Self, figment::Error> {
        Self::load_from(None)
    }

    /// Loads configuration, optionally from a specific file.
    #[expect(
        clippy::result_large_err,
        reason = "figment::Error is large but only returned at startup"
    )]
    pub fn load_from(config_path: Option<&Path>) -> Result<Self, figment::Error> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        // Load from default config location
        if let Some(config_dir) = dirs_config_path() {
            figment = figment.merge(Toml::file(config_dir.join("config.toml")));
        }

        // Load from specified config file
        if let Some(path) = config_path {
            figment = figment.merge(Toml::file(path));
        }

        // Load from environment variables (DEVLOG_*)
        figment = figment.merge(Env::prefixed("DEVLOG_"));

        figment.extract()
    }
}

/// Returns the platform-specific config directory for devlog.
fn dirs_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("devlog"))
}

/// Returns the platform-specific data directory for devlog.
///
/// On Linux: `~/.local/share/devlog`
pub fn dirs_data_path() -> Option<PathBuf> {
    dirs::data_dir().map(|p| p.join("devlog"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write as _;

    #[test]
    fn test_dirs_data_path_returns_some() {
        assert!(dirs_data_path().is_some());
    }

    #[test]
    fn test_default_config_uses_data_dir_for_db() {
        let config = Config::default();
        let data_dir = dirs_data_path().unwrap();
        assert_eq!(config.database_path, data_dir.join("devlog.db"));
    }

    #[test]
    fn test_default_listen_addr_is_loopback() {
        let config = Config::default();
        assert_eq!(config.listen_addr.to_string(), "127.0.0.1:8787");
        assert_eq!(config.day_boundary, DayBoundary::Utc);
    }

    #[test]
    fn test_config_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(
            file,
            r#"
listen_addr = "0.0.0.0:9000"
database_path = "/var/lib/devlog/devlog.db"
day_boundary = "local"
"#
        )
        .unwrap();

        let config = Config::load_from(Some(&path)).unwrap();
        assert_eq!(config.listen_addr.to_string(), "0.0.0.0:9000");
        assert_eq!(
            config.database_path,
            PathBuf::from("/var/lib/devlog/devlog.db")
        );
        assert_eq!(config.day_boundary, DayBoundary::Local);
        // Unset fields keep their defaults.
        assert_eq!(
            config.projects_path,
            Config::default().projects_path
        );
    }
}
