//! Inactivity watchdog
//!
//! A single timer bounds unattended resource usage (held audio device,
//! memory) from forgotten sessions. Every successful control request resets
//! the clock; once idle exceeds the configured duration the daemon cleanly
//! stops playback, deletes its record, and exits.

use crate::state::SharedState;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;

/// How often the idle clock is sampled
const CHECK_INTERVAL: Duration = Duration::from_secs(5);

/// Resolves once the daemon has been idle longer than `idle_timeout`
pub async fn idle_expired(state: Arc<SharedState>, idle_timeout: Duration) {
    loop {
        tokio::time::sleep(CHECK_INTERVAL.min(idle_timeout)).await;
        let idle = state.idle_for().await;
        if idle >= idle_timeout {
            info!(
                "Idle for {:.0}s (limit {:.0}s), shutting down",
                idle.as_secs_f64(),
                idle_timeout.as_secs_f64()
            );
            return;
        }
    }
}
