//! Shared playback state
//!
//! One explicit state object owned by the daemon process and passed by
//! reference to request handlers; there are no ambient globals. The snapshot
//! lives only in daemon memory and resets to stopped on every daemon start.

use std::time::{Duration, Instant};
use tapedeck_common::api::{CurrentResponse, PlaybackStatus};
use tokio::sync::RwLock;

/// What is currently playing (or paused), if anything
#[derive(Debug, Clone)]
pub struct PlaybackSnapshot {
    pub status: PlaybackStatus,
    pub name: Option<String>,
    pub version: Option<usize>,
    pub code: Option<String>,
}

impl PlaybackSnapshot {
    fn stopped() -> Self {
        Self {
            status: PlaybackStatus::Stopped,
            name: None,
            version: None,
            code: None,
        }
    }
}

/// State shared by all request handlers and the inactivity watchdog
pub struct SharedState {
    playback: RwLock<PlaybackSnapshot>,
    last_activity: RwLock<Instant>,
}

impl SharedState {
    pub fn new() -> Self {
        Self {
            playback: RwLock::new(PlaybackSnapshot::stopped()),
            last_activity: RwLock::new(Instant::now()),
        }
    }

    /// Current snapshot, as reported by GET /current
    pub async fn snapshot(&self) -> PlaybackSnapshot {
        self.playback.read().await.clone()
    }

    /// Transition to playing with the given song identity
    pub async fn set_playing(&self, name: Option<String>, version: Option<usize>, code: String) {
        *self.playback.write().await = PlaybackSnapshot {
            status: PlaybackStatus::Playing,
            name,
            version,
            code: Some(code),
        };
    }

    /// Transition to stopped, clearing the song identity
    pub async fn set_stopped(&self) {
        *self.playback.write().await = PlaybackSnapshot::stopped();
    }

    /// Transition playing -> paused; any other state is left unchanged
    pub async fn set_paused(&self) -> PlaybackStatus {
        let mut playback = self.playback.write().await;
        if playback.status == PlaybackStatus::Playing {
            playback.status = PlaybackStatus::Paused;
        }
        playback.status
    }

    /// Reset the inactivity timer (every successful control request)
    pub async fn touch(&self) {
        *self.last_activity.write().await = Instant::now();
    }

    /// How long since the last successful control request
    pub async fn idle_for(&self) -> Duration {
        self.last_activity.read().await.elapsed()
    }
}

impl Default for SharedState {
    fn default() -> Self {
        Self::new()
    }
}

impl From<PlaybackSnapshot> for CurrentResponse {
    fn from(s: PlaybackSnapshot) -> Self {
        CurrentResponse {
            state: s.status,
            name: s.name,
            version: s.version,
            code: s.code,
        }
    }
}
