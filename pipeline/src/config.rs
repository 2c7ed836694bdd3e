//! User configuration for the `skillpack` CLI.
//!
//! Settings live in `config.toml` inside the platform configuration
//! directory. A missing file yields [`Config::default`]; a malformed one is
//! an error rather than a silent fallback.

use crate::archive::policy::ArchiveLimits;
use crate::dirs::BaseDirs;
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// File name of the configuration file.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// Environment variable naming the agent home whose `skills` directory is
/// the default install root.
pub const CODEX_HOME_ENV: &str = "CODEX_HOME";

const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Errors arising from loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The configuration file exists but could not be read.
    #[error("failed to read {}: {source}", .path.display())]
    Read {
        /// Configuration path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// The configuration file is not valid TOML for [`Config`].
    #[error("failed to parse {}: {source}", .path.display())]
    Parse {
        /// Configuration path.
        path: PathBuf,
        /// Underlying parse error.
        source: toml::de::Error,
    },

    /// The configuration could not be serialised.
    #[error("failed to serialise configuration: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// The configuration file could not be written.
    #[error("failed to write {}: {source}", .path.display())]
    Write {
        /// Configuration path.
        path: PathBuf,
        /// Underlying error.
        source: std::io::Error,
    },

    /// No platform configuration or data directory could be determined.
    #[error("could not determine the skillpack {kind} directory")]
    NoPlatformDir {
        /// Which directory was missing.
        kind: &'static str,
    },
}

/// CLI configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Config {
    /// Root of the local registry (package store plus release index).
    /// Defaults to `<data dir>/registry`.
    pub registry: Option<PathBuf>,
    /// Base URL to download archives from instead of the local store.
    pub download_base_url: Option<String>,
    /// Directory packages are installed under.
    pub install_dir: Option<PathBuf>,
    /// Timeout for HTTP downloads, in seconds.
    pub http_timeout_secs: u64,
    /// Archive safety policy ceilings; values may only tighten the
    /// defaults.
    pub limits: ArchiveLimits,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            registry: None,
            download_base_url: None,
            install_dir: None,
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            limits: ArchiveLimits::default(),
        }
    }
}

impl Config {
    /// Path of the configuration file for `dirs`.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoPlatformDir`] when no configuration
    /// directory is available.
    pub fn path(dirs: &dyn BaseDirs) -> Result<PathBuf, ConfigError> {
        dirs.config_dir()
            .map(|dir| dir.join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoPlatformDir { kind: "config" })
    }

    /// Load the configuration from the platform location.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the location is unknown or the file is
    /// unreadable or malformed.
    pub fn load(dirs: &dyn BaseDirs) -> Result<Self, ConfigError> {
        Self::load_from(&Self::path(dirs)?)
    }

    /// Load the configuration from `path`, defaulting when it is absent.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Read`] or [`ConfigError::Parse`].
    ///
    /// # Examples
    ///
    /// ```
    /// use skillpack::config::Config;
    ///
    /// let config = Config::load_from(std::path::Path::new("/nonexistent/config.toml"))
    ///     .expect("missing file yields defaults");
    /// assert_eq!(config.http_timeout_secs, 30);
    /// ```
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let text = match fs::read_to_string(path) {
            Ok(text) => text,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(Self::default()),
            Err(source) => {
                return Err(ConfigError::Read {
                    path: path.to_path_buf(),
                    source,
                });
            }
        };
        toml::from_str(&text).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Persist the configuration to the platform location.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if the location is unknown or the write fails.
    pub fn save(&self, dirs: &dyn BaseDirs) -> Result<PathBuf, ConfigError> {
        let path = Self::path(dirs)?;
        self.save_to(&path)?;
        Ok(path)
    }

    /// Persist the configuration to `path`, creating parent directories.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Serialize`] or [`ConfigError::Write`].
    pub fn save_to(&self, path: &Path) -> Result<(), ConfigError> {
        let text = toml::to_string_pretty(self)?;
        let write_error = |source| ConfigError::Write {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(write_error)?;
        }
        fs::write(path, text).map_err(write_error)
    }

    /// Root of the local registry.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::NoPlatformDir`] when no registry is configured
    /// and no data directory is available.
    pub fn registry_root(&self, dirs: &dyn BaseDirs) -> Result<PathBuf, ConfigError> {
        if let Some(registry) = &self.registry {
            return Ok(registry.clone());
        }
        dirs.data_dir()
            .map(|dir| dir.join("registry"))
            .ok_or(ConfigError::NoPlatformDir { kind: "data" })
    }

    /// Directory packages are installed under: the configured `install_dir`,
    /// else `$CODEX_HOME/skills`, else `./skills`.
    #[must_use]
    pub fn install_root(&self) -> PathBuf {
        if let Some(dir) = &self.install_dir {
            return dir.clone();
        }
        match std::env::var_os(CODEX_HOME_ENV) {
            Some(home) if !home.is_empty() => PathBuf::from(home).join("skills"),
            _ => PathBuf::from("skills"),
        }
    }

    /// HTTP download timeout.
    #[must_use]
    pub const fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dirs::MockBaseDirs;
    use rstest::rstest;

    fn dirs_at(root: &Path) -> MockBaseDirs {
        let config = root.join("config");
        let data = root.join("data");
        let mut dirs = MockBaseDirs::new();
        dirs.expect_config_dir().returning(move || Some(config.clone()));
        dirs.expect_data_dir().returning(move || Some(data.clone()));
        dirs
    }

    #[test]
    fn missing_file_yields_defaults() {
        let temp = tempfile::tempdir().expect("temp dir");
        let config = Config::load(&dirs_at(temp.path())).expect("load");
        assert_eq!(config, Config::default());
        assert_eq!(config.limits.max_files, 1000);
    }

    #[test]
    fn save_then_load_preserves_settings() {
        let temp = tempfile::tempdir().expect("temp dir");
        let dirs = dirs_at(temp.path());
        let config = Config {
            registry: Some(temp.path().join("reg")),
            http_timeout_secs: 5,
            ..Config::default()
        };

        let path = config.save(&dirs).expect("save");
        assert!(path.ends_with("config/config.toml"));
        assert_eq!(Config::load(&dirs).expect("load"), config);
    }

    #[test]
    fn partial_limits_fall_back_to_defaults() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, "[limits]\nmax_files = 10\n").expect("write");

        let config = Config::load_from(&path).expect("load");
        assert_eq!(config.limits.max_files, 10);
        assert_eq!(config.limits.max_path_depth, 16);
        assert_eq!(config.http_timeout_secs, 30);
    }

    #[rstest]
    #[case::files("max_files = 1000000", "limits.max_files may not exceed 1000")]
    #[case::total_bytes(
        "max_total_bytes = 100000000000",
        "limits.max_total_bytes may not exceed 52428800"
    )]
    #[case::path_len("max_path_len = 241", "limits.max_path_len may not exceed 240")]
    #[case::path_depth("max_path_depth = 1000", "limits.max_path_depth may not exceed 16")]
    fn limits_cannot_be_raised(#[case] line: &str, #[case] expected: &str) {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, format!("[limits]\n{line}\n")).expect("write");

        match Config::load_from(&path) {
            Err(ConfigError::Parse { source, .. }) => {
                assert!(source.to_string().contains(expected), "{source}");
            }
            other => panic!("expected a parse error, got {other:?}"),
        }
    }

    #[test]
    fn limits_at_their_ceilings_are_accepted() {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(
            &path,
            "[limits]\nmax_files = 1000\nmax_total_bytes = 52428800\nmax_path_len = 240\nmax_path_depth = 16\n",
        )
        .expect("write");
        assert_eq!(
            Config::load_from(&path).expect("load").limits,
            ArchiveLimits::default()
        );
    }

    #[rstest]
    #[case::unknown_key("colour = \"blue\"\n")]
    #[case::wrong_type("http_timeout_secs = \"soon\"\n")]
    fn malformed_file_is_an_error(#[case] contents: &str) {
        let temp = tempfile::tempdir().expect("temp dir");
        let path = temp.path().join(CONFIG_FILE_NAME);
        fs::write(&path, contents).expect("write");
        assert!(matches!(
            Config::load_from(&path),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn registry_defaults_under_data_dir() {
        let temp = tempfile::tempdir().expect("temp dir");
        let root = Config::default()
            .registry_root(&dirs_at(temp.path()))
            .expect("registry root");
        assert_eq!(root, temp.path().join("data").join("registry"));
    }

    #[test]
    fn missing_platform_dirs_are_reported() {
        let mut dirs = MockBaseDirs::new();
        dirs.expect_config_dir().returning(|| None);
        dirs.expect_data_dir().returning(|| None);
        assert!(matches!(
            Config::load(&dirs),
            Err(ConfigError::NoPlatformDir { kind: "config" })
        ));
        assert!(matches!(
            Config::default().registry_root(&dirs),
            Err(ConfigError::NoPlatformDir { kind: "data" })
        ));
    }

    #[rstest]
    #[case::codex_home(Some("/opt/agent"), PathBuf::from("/opt/agent/skills"))]
    #[case::blank_codex_home(Some(""), PathBuf::from("skills"))]
    #[case::no_codex_home(None, PathBuf::from("skills"))]
    fn install_root_follows_codex_home(#[case] home: Option<&str>, #[case] expected: PathBuf) {
        temp_env::with_var(CODEX_HOME_ENV, home, || {
            assert_eq!(Config::default().install_root(), expected);
        });
    }

    #[test]
    fn configured_install_dir_wins() {
        temp_env::with_var(CODEX_HOME_ENV, Some("/opt/agent"), || {
            let config = Config {
                install_dir: Some(PathBuf::from("/srv/skills")),
                ..Config::default()
            };
            assert_eq!(config.install_root(), PathBuf::from("/srv/skills"));
        });
    }
}
