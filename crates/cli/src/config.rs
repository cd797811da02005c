//! Command-line configuration and platform directories.
use std::env;
use std::path::PathBuf;

use story_store::StoreConfig;

const APP_NAME: &str = "storytap";

/// Where the library and the logs live, plus store naming conventions.
#[derive(Clone, Debug)]
pub struct CliConfig {
    pub library_dir: PathBuf,
    pub log_dir: PathBuf,
    pub store: StoreConfig,
}

impl Default for CliConfig {
    fn default() -> Self {
        Self {
            library_dir: default_library_dir(),
            log_dir: default_log_dir(),
            store: StoreConfig::default(),
        }
    }
}

impl CliConfig {
    /// Construct configuration from process environment variables.
    ///
    /// Environment variables:
    /// - `STORYTAP_LIBRARY_DIR` - Library root (default: platform data dir)
    /// - `STORYTAP_LOG_DIR` - Log directory (default: platform cache dir)
    /// - `STORYTAP_*` store variables, see [`StoreConfig::from_env`]
    pub fn from_env() -> Self {
        let mut config = Self {
            store: StoreConfig::from_env(),
            ..Self::default()
        };

        if let Some(dir) = env::var_os("STORYTAP_LIBRARY_DIR") {
            config.library_dir = PathBuf::from(dir);
        }
        if let Some(dir) = env::var_os("STORYTAP_LOG_DIR") {
            config.log_dir = PathBuf::from(dir);
        }

        config
    }

    /// Override the library root (e.g. from `--library`).
    pub fn with_library_dir(mut self, dir: Option<PathBuf>) -> Self {
        if let Some(dir) = dir {
            self.library_dir = dir;
        }
        self
    }
}

/// Platform data directory for the story library
///
/// - macOS: `~/Library/Application Support/storytap/stories`
/// - Linux: `~/.local/share/storytap/stories` (or `$XDG_DATA_HOME/storytap/stories`)
/// - Windows: `%APPDATA%\storytap\data\stories`
/// - Fallback: `./stories`
fn default_library_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.data_dir().join("stories"))
        .unwrap_or_else(|| PathBuf::from("./stories"))
}

/// Platform cache directory for logs
///
/// - macOS: `~/Library/Caches/storytap/logs`
/// - Linux: `~/.cache/storytap/logs` (or `$XDG_CACHE_HOME/storytap/logs`)
/// - Windows: `%LOCALAPPDATA%\storytap\cache\logs`
/// - Fallback: `/tmp/storytap/logs`
fn default_log_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", APP_NAME)
        .map(|dirs| dirs.cache_dir().join("logs"))
        .unwrap_or_else(|| env::temp_dir().join(APP_NAME).join("logs"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_are_app_scoped() {
        let config = CliConfig::default();
        assert!(config.library_dir.ends_with("stories"));
        assert!(config.log_dir.ends_with("logs"));
        assert_eq!(config.store, StoreConfig::default());
    }

    #[test]
    fn test_library_override() {
        let config = CliConfig::default().with_library_dir(Some(PathBuf::from("/srv/tales")));
        assert_eq!(config.library_dir, PathBuf::from("/srv/tales"));

        let unchanged = CliConfig::default().with_library_dir(None);
        assert_eq!(unchanged.library_dir, default_library_dir());
    }
}
