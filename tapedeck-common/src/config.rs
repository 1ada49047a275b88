//! Data directory resolution and well-known file paths
//!
//! All durable state (the songs file, its lock marker, the daemon record and
//! its lock marker, and the daemon log) lives in a single per-user data
//! directory. Resolution priority:
//! 1. Explicit path (command-line argument, highest priority)
//! 2. `TAPEDECK_DATA_DIR` environment variable
//! 3. OS-dependent default under the local data dir (e.g. `~/.local/share/tapedeck`)

use crate::{Error, Result};
use std::path::{Path, PathBuf};

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "TAPEDECK_DATA_DIR";

/// Well-known paths inside the tapedeck data directory
#[derive(Debug, Clone)]
pub struct Paths {
    root: PathBuf,
}

impl Paths {
    /// Resolve the data directory, following the priority order above
    pub fn resolve(cli_arg: Option<&Path>) -> Result<Self> {
        if let Some(path) = cli_arg {
            return Ok(Self { root: path.to_path_buf() });
        }

        if let Ok(path) = std::env::var(DATA_DIR_ENV) {
            return Ok(Self { root: PathBuf::from(path) });
        }

        let root = dirs::data_local_dir()
            .map(|d| d.join("tapedeck"))
            .ok_or_else(|| {
                Error::Internal("could not determine local data directory".to_string())
            })?;
        Ok(Self { root })
    }

    /// Build paths rooted at an explicit directory (used by tests)
    pub fn at(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Create the data directory if it does not exist yet
    pub fn ensure_exists(&self) -> Result<()> {
        std::fs::create_dir_all(&self.root)?;
        Ok(())
    }

    /// The data directory itself
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Durable songs collection (single JSON document)
    pub fn songs_file(&self) -> PathBuf {
        self.root.join("songs.json")
    }

    /// Directory-based lock marker guarding the songs file
    pub fn songs_lock(&self) -> PathBuf {
        self.root.join("songs.lock")
    }

    /// Daemon record sidecar file ({port, pid})
    pub fn daemon_record(&self) -> PathBuf {
        self.root.join("daemon.json")
    }

    /// Directory-based lock marker guarding daemon startup
    pub fn daemon_lock(&self) -> PathBuf {
        self.root.join("daemon.lock")
    }

    /// Log file the detached daemon's stdout/stderr are redirected to
    pub fn daemon_log(&self) -> PathBuf {
        self.root.join("daemon.log")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    fn explicit_arg_wins() {
        let paths = Paths::resolve(Some(Path::new("/tmp/td-test"))).unwrap();
        assert_eq!(paths.root(), Path::new("/tmp/td-test"));
        assert_eq!(paths.songs_file(), PathBuf::from("/tmp/td-test/songs.json"));
    }

    #[test]
    #[serial]
    fn env_var_beats_default() {
        std::env::set_var(DATA_DIR_ENV, "/tmp/td-env");
        let paths = Paths::resolve(None).unwrap();
        std::env::remove_var(DATA_DIR_ENV);
        assert_eq!(paths.root(), Path::new("/tmp/td-env"));
    }

    #[test]
    #[serial]
    fn default_is_under_local_data_dir() {
        std::env::remove_var(DATA_DIR_ENV);
        let paths = Paths::resolve(None).unwrap();
        assert!(paths.root().ends_with("tapedeck"));
    }
}
