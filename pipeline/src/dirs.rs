//! Directory resolution abstraction for platform-specific paths.
//!
//! The configuration loader and the CLI take a `&dyn BaseDirs` so tests can
//! point them at a temporary directory instead of the real home directory.

use directories_next::ProjectDirs;
use std::path::PathBuf;

/// Platform directories used by skillpack.
#[cfg_attr(test, mockall::automock)]
pub trait BaseDirs {
    /// Directory holding `config.toml`.
    fn config_dir(&self) -> Option<PathBuf>;

    /// Directory holding the default local registry.
    fn data_dir(&self) -> Option<PathBuf>;
}

/// [`BaseDirs`] backed by `directories-next`.
///
/// # Examples
///
/// ```no_run
/// use skillpack::dirs::{BaseDirs, SystemBaseDirs};
///
/// let config_dir = SystemBaseDirs.config_dir();
/// println!("{config_dir:?}");
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBaseDirs;

impl SystemBaseDirs {
    fn project() -> Option<ProjectDirs> {
        ProjectDirs::from("dev", "skillpack", "skillpack")
    }
}

impl BaseDirs for SystemBaseDirs {
    fn config_dir(&self) -> Option<PathBuf> {
        Self::project().map(|dirs| dirs.config_dir().to_path_buf())
    }

    fn data_dir(&self) -> Option<PathBuf> {
        Self::project().map(|dirs| dirs.data_dir().to_path_buf())
    }
}
