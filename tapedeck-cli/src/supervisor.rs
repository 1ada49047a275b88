//! Background process supervisor
//!
//! Ensures at most one live tapedeckd exists system-wide, transparently to
//! the commands that need it. A daemon record is trusted only if the recorded
//! pid is alive AND a health request to the recorded address succeeds; either
//! check failing means "not running" (an orphaned record, not an error).
//!
//! Launch is guarded by a dedicated lock (separate from the songs lock) so
//! racing CLI invocations start exactly one daemon; the losers wait,
//! re-resolve, and reuse the winner's instance.

use crate::client::DaemonClient;
use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;
use tapedeck_common::config::Paths;
use tapedeck_common::lock::DirLock;
use tapedeck_common::record::DaemonRecord;
use tapedeck_common::{Error, Result};
use tracing::{debug, info};

/// Environment variable overriding the daemon binary path
pub const DAEMON_BIN_ENV: &str = "TAPEDECKD_BIN";

/// Health polling cadence while waiting for a freshly launched daemon
const STARTUP_POLL_INTERVAL: Duration = Duration::from_millis(150);

/// Maximum health polls before giving up on a launch
const STARTUP_MAX_ATTEMPTS: u32 = 40;

/// Supervisor over the daemon record in one data directory
pub struct Supervisor {
    paths: Paths,
}

impl Supervisor {
    pub fn new(paths: Paths) -> Self {
        Self { paths }
    }

    /// Resolve a live, healthy daemon if one exists
    pub async fn resolve(&self) -> Option<DaemonRecord> {
        let record = DaemonRecord::read(&self.paths)?;
        if !pid_alive(record.pid) {
            debug!("Daemon record pid {} is dead; ignoring record", record.pid);
            return None;
        }
        let client = DaemonClient::new(&record).ok()?;
        match client.health().await {
            Ok(_) => Some(record),
            Err(e) => {
                debug!("Daemon record failed health check: {}", e);
                None
            }
        }
    }

    /// Resolve the daemon, launching one if none is running
    pub async fn ensure_running(&self) -> Result<DaemonRecord> {
        if let Some(record) = self.resolve().await {
            return Ok(record);
        }

        // Startup lock: DirLock acquisition polls with blocking sleeps, so
        // take it off the async runtime's worker threads
        let marker = self.paths.daemon_lock();
        let _lock = tokio::task::spawn_blocking(move || DirLock::acquire(&marker))
            .await
            .map_err(|e| Error::Internal(format!("lock task panicked: {e}")))??;

        // A concurrent invocation may have launched one while we waited
        if let Some(record) = self.resolve().await {
            debug!("Daemon started by a concurrent invocation; reusing it");
            return Ok(record);
        }

        // Clear any orphaned record so polling below can't see the old one
        DaemonRecord::remove(&self.paths)?;
        self.spawn_daemon()?;
        self.await_healthy().await
    }

    /// Spawn tapedeckd detached from this CLI's lifetime, stdio redirected to
    /// the daemon log
    fn spawn_daemon(&self) -> Result<()> {
        self.paths.ensure_exists()?;
        let log = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(self.paths.daemon_log())?;
        let log_err = log.try_clone()?;

        let bin = daemon_binary();
        let mut command = Command::new(&bin);
        command
            .arg("--data-dir")
            .arg(self.paths.root())
            .stdin(Stdio::null())
            .stdout(Stdio::from(log))
            .stderr(Stdio::from(log_err));

        // Own process group so the daemon outlives this CLI invocation and
        // ignores its terminal signals
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            command.process_group(0);
        }

        let child = command.spawn().map_err(|e| {
            Error::Internal(format!("failed to launch {}: {e}", bin.display()))
        })?;
        info!("Launched tapedeckd (pid {})", child.id());
        Ok(())
    }

    /// Poll the health endpoint until the new daemon is reachable
    async fn await_healthy(&self) -> Result<DaemonRecord> {
        for _ in 0..STARTUP_MAX_ATTEMPTS {
            tokio::time::sleep(STARTUP_POLL_INTERVAL).await;
            if let Some(record) = DaemonRecord::read(&self.paths) {
                let client = DaemonClient::new(&record)?;
                if client.health().await.is_ok() {
                    debug!("Daemon healthy on port {}", record.port);
                    return Ok(record);
                }
            }
        }
        Err(Error::DaemonStartTimeout(format!(
            "no healthy daemon after {} polls; see {}",
            STARTUP_MAX_ATTEMPTS,
            self.paths.daemon_log().display()
        )))
    }
}

/// Locate the tapedeckd binary: explicit override, then a sibling of the
/// current executable, then PATH
fn daemon_binary() -> PathBuf {
    if let Ok(bin) = std::env::var(DAEMON_BIN_ENV) {
        return PathBuf::from(bin);
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(dir) = exe.parent() {
            let sibling = dir.join("tapedeckd");
            if sibling.exists() {
                return sibling;
            }
        }
    }
    PathBuf::from("tapedeckd")
}

/// True if a process with this pid currently exists
#[cfg(unix)]
fn pid_alive(pid: u32) -> bool {
    // Signal 0 performs the existence check without delivering anything
    unsafe { libc::kill(pid as libc::pid_t, 0) == 0 }
}

#[cfg(not(unix))]
fn pid_alive(_pid: u32) -> bool {
    // No portable existence check; the health probe is the real gate
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn own_pid_is_alive() {
        assert!(pid_alive(std::process::id()));
    }

    #[tokio::test]
    async fn dead_pid_record_resolves_to_none() {
        let dir = TempDir::new().unwrap();
        let paths = Paths::at(dir.path());
        // Far above any default pid_max, so no live process can match
        DaemonRecord {
            port: 1,
            pid: 999_999_999,
        }
        .write(&paths)
        .unwrap();

        let supervisor = Supervisor::new(paths);
        assert!(supervisor.resolve().await.is_none());
    }

    #[tokio::test]
    async fn missing_record_resolves_to_none() {
        let dir = TempDir::new().unwrap();
        let supervisor = Supervisor::new(Paths::at(dir.path()));
        assert!(supervisor.resolve().await.is_none());
    }
}
