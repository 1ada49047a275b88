//! Daemon record: the {port, pid} sidecar file locating the background process
//!
//! Written once when the daemon has bound its listening socket; deleted on
//! clean shutdown. The record is advisory only — its presence does not mean
//! the process behind it is alive or healthy. Callers must verify both
//! process liveness and a successful health request before trusting it.

use crate::config::Paths;
use crate::Result;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Persisted address of the running daemon
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct DaemonRecord {
    /// Loopback TCP port the daemon is listening on
    pub port: u16,
    /// Process id of the daemon
    pub pid: u32,
}

impl DaemonRecord {
    /// Base URL for control requests to this record's address
    pub fn base_url(&self) -> String {
        format!("http://127.0.0.1:{}", self.port)
    }

    /// Read the record, returning None when absent or unparseable
    ///
    /// A corrupt record is treated the same as a missing one: the daemon is
    /// "not running" and the supervisor will start a fresh instance.
    pub fn read(paths: &Paths) -> Option<Self> {
        let text = std::fs::read_to_string(paths.daemon_record()).ok()?;
        match serde_json::from_str(&text) {
            Ok(record) => Some(record),
            Err(e) => {
                debug!("Ignoring unparseable daemon record: {}", e);
                None
            }
        }
    }

    /// Persist the record
    pub fn write(&self, paths: &Paths) -> Result<()> {
        paths.ensure_exists()?;
        std::fs::write(paths.daemon_record(), serde_json::to_string(self)?)?;
        Ok(())
    }

    /// Remove the record; missing is not an error (idempotent cleanup)
    pub fn remove(paths: &Paths) -> Result<()> {
        match std::fs::remove_file(paths.daemon_record()) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}
