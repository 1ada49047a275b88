//! Inter-process mutual exclusion via directory-creation lock markers
//!
//! `create_dir` is atomic on every platform we care about: exactly one
//! contender observes success, everyone else gets `AlreadyExists` and polls.
//! A marker older than [`STALE_AFTER`] is assumed to belong to a holder that
//! crashed before releasing and is force-cleared by the next contender.
//!
//! Known tradeoff: the stale heuristic can break true mutual exclusion if a
//! legitimate holder is merely slow. Holders here do a read-modify-write of a
//! small JSON file, so 5 seconds is far beyond any healthy hold time.

use crate::{Error, Result};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::warn;

/// Poll interval while waiting for a contended lock
const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Marker age after which the holder is presumed dead
const STALE_AFTER: Duration = Duration::from_secs(5);

/// Upper bound on acquisition attempts before giving up with `LockTimeout`
const MAX_ATTEMPTS: u32 = 240;

/// An acquired directory lock; released (marker removed) on drop
#[derive(Debug)]
pub struct DirLock {
    marker: PathBuf,
}

impl DirLock {
    /// Acquire the lock at `marker`, polling and force-clearing stale markers
    pub fn acquire(marker: &Path) -> Result<Self> {
        for _ in 0..MAX_ATTEMPTS {
            match std::fs::create_dir(marker) {
                Ok(()) => {
                    return Ok(Self {
                        marker: marker.to_path_buf(),
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                    if marker_is_stale(marker) {
                        warn!(
                            "Force-clearing stale lock marker {} (holder presumed dead)",
                            marker.display()
                        );
                        // Racing contenders may clear it simultaneously; a
                        // NotFound here just means someone else won the clear.
                        if let Err(e) = std::fs::remove_dir(marker) {
                            if e.kind() != std::io::ErrorKind::NotFound {
                                return Err(e.into());
                            }
                        }
                        continue;
                    }
                    std::thread::sleep(POLL_INTERVAL);
                }
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    // Parent data directory missing; surface as-is
                    return Err(e.into());
                }
                Err(e) => return Err(e.into()),
            }
        }
        Err(Error::LockTimeout(format!(
            "could not acquire {} after {} attempts",
            marker.display(),
            MAX_ATTEMPTS
        )))
    }
}

impl Drop for DirLock {
    fn drop(&mut self) {
        if let Err(e) = std::fs::remove_dir(&self.marker) {
            // Stale takeover by a contender may have already removed it
            if e.kind() != std::io::ErrorKind::NotFound {
                warn!("Failed to release lock {}: {}", self.marker.display(), e);
            }
        }
    }
}

/// True if the marker exists and is older than the stale threshold
fn marker_is_stale(marker: &Path) -> bool {
    let Ok(meta) = std::fs::metadata(marker) else {
        // Vanished between create_dir and here; next attempt will settle it
        return false;
    };
    match meta.modified().ok().and_then(|m| m.elapsed().ok()) {
        Some(age) => age > STALE_AFTER,
        None => false,
    }
}
