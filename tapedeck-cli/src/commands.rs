//! CLI command implementations
//!
//! Each command runs start-to-finish in one short-lived process: version
//! store first, then (when playback is involved) the supervisor and one or
//! more control requests. Storage and playback are deliberately decoupled
//! steps: an update that saves but fails to play reports "saved, not played"
//! instead of collapsing into a single error.

use crate::client::DaemonClient;
use crate::supervisor::Supervisor;
use std::time::Duration;
use tapedeck_common::config::Paths;
use tapedeck_common::store::SongStore;
use tapedeck_common::{Error, Result};
use tracing::warn;

/// `make <name> --code <text>`: create a song with version 1
pub fn make(store: &SongStore, name: &str, code: &str) -> Result<()> {
    store.create(name, code)?;
    println!("Created \"{name}\" (version 1)");
    Ok(())
}

/// `play <name> [--ver n]`: read code from the store and play it
pub async fn play(store: &SongStore, paths: &Paths, name: &str, ver: Option<usize>) -> Result<()> {
    let detail = store.detail(name, ver)?;
    let client = connect(paths).await?;
    let response = client.play(&detail.code, name, detail.version).await?;
    println!(
        "Playing \"{}\" version {} of {}",
        response.name, response.version, detail.total_versions
    );
    Ok(())
}

/// `stop`: silence the daemon; never launches one
pub async fn stop(paths: &Paths) -> Result<()> {
    let client = require_running(paths).await?;
    let response = client.stop().await?;
    println!("Playback {}", response.state);
    Ok(())
}

/// `pause`: pause the daemon; never launches one
pub async fn pause(paths: &Paths) -> Result<()> {
    let client = require_running(paths).await?;
    let response = client.pause().await?;
    println!("Playback {}", response.state);
    Ok(())
}

/// `current`: report the daemon's playback snapshot
pub async fn current(paths: &Paths) -> Result<()> {
    let supervisor = Supervisor::new(paths.clone());
    let Some(record) = supervisor.resolve().await else {
        println!("stopped (daemon not running)");
        return Ok(());
    };

    let snapshot = DaemonClient::new(&record)?.current().await?;
    match (&snapshot.name, snapshot.version) {
        (Some(name), Some(version)) => {
            println!("{} \"{}\" version {}", snapshot.state, name, version)
        }
        (Some(name), None) => println!("{} \"{}\"", snapshot.state, name),
        _ => println!("{}", snapshot.state),
    }
    if let Some(code) = snapshot.code {
        println!("{code}");
    }
    Ok(())
}

/// `update <name> --from <s> --to <s> [--index n]`: save a new version, then
/// try to make it audible
pub async fn update(
    store: &SongStore,
    paths: &Paths,
    name: &str,
    from: &str,
    to: &str,
    index: Option<usize>,
) -> Result<()> {
    let outcome = store.update(name, from, to, index)?;
    println!("Saved \"{name}\" version {}", outcome.version);

    // Saved state is final at this point; playback is best-effort on top
    match play_updated(paths, name, &outcome.code, outcome.version).await {
        Ok(()) => println!("Playing version {}", outcome.version),
        Err(e) => warn!("Saved version {} but not played: {}", outcome.version, e),
    }
    Ok(())
}

/// Validate then seamlessly evaluate freshly saved code
async fn play_updated(paths: &Paths, name: &str, code: &str, version: usize) -> Result<()> {
    let client = connect(paths).await?;
    let validation = client.validate(code).await?;
    if !validation.valid {
        let message = validation
            .error
            .unwrap_or_else(|| "invalid pattern".to_string());
        return Err(Error::EvaluationError(
            match (validation.line, validation.column) {
                (Some(line), Some(column)) => format!("{message} at {line}:{column}"),
                _ => message,
            },
        ));
    }
    client.evaluate(code, Some(name), Some(version)).await?;
    Ok(())
}

/// `detail <name> [--ver n]`: print one version of a song
pub fn detail(store: &SongStore, name: &str, ver: Option<usize>) -> Result<()> {
    let detail = store.detail(name, ver)?;
    println!(
        "\"{}\" version {} of {} (created {})",
        name,
        detail.version,
        detail.total_versions,
        detail.created_at.to_rfc3339()
    );
    println!("{}", detail.code);
    Ok(())
}

/// `version-change <version> [--name <name>]`: promote a historical version
/// and evaluate it
///
/// The name defaults to whatever is currently playing.
pub async fn version_change(
    store: &SongStore,
    paths: &Paths,
    version: usize,
    name: Option<String>,
) -> Result<()> {
    let name = match name {
        Some(name) => name,
        None => {
            let client = require_running(paths).await?;
            client.current().await?.name.ok_or_else(|| {
                Error::NoActiveSession("nothing is playing; supply --name".to_string())
            })?
        }
    };

    let promo = store.promote(&name, version)?;
    let client = connect(paths).await?;
    client
        .evaluate(&promo.code, Some(&name), Some(promo.new_version))
        .await?;
    println!(
        "\"{}\" version {} promoted to version {} and playing",
        name, promo.from_version, promo.new_version
    );
    Ok(())
}

/// One step of a `sequence` run: a historical version and the delay to hold
/// it before the next step
pub type SequenceStep = (usize, f64);

/// Parse the `--versions '[[version,delaySeconds],...]'` argument
pub fn parse_sequence_steps(raw: &str) -> Result<Vec<SequenceStep>> {
    let steps: Vec<SequenceStep> = serde_json::from_str(raw).map_err(|e| {
        Error::InvalidArgument(format!(
            "--versions must look like [[1,0],[2,4.5]]: {e}"
        ))
    })?;
    if steps.is_empty() {
        return Err(Error::InvalidArgument(
            "--versions must contain at least one [version,delay] step".to_string(),
        ));
    }
    for &(version, delay) in &steps {
        if version < 1 {
            return Err(Error::InvalidArgument(
                "sequence versions are 1-based".to_string(),
            ));
        }
        if !delay.is_finite() || delay < 0.0 {
            return Err(Error::InvalidArgument(format!(
                "invalid delay {delay} for version {version}"
            )));
        }
    }
    Ok(steps)
}

/// `sequence <name> --versions ...`: promote and evaluate each step in order
///
/// Every step appends a fresh promotion, so the daemon ends on the version
/// number created by the last step.
pub async fn sequence(store: &SongStore, paths: &Paths, name: &str, raw_steps: &str) -> Result<()> {
    let steps = parse_sequence_steps(raw_steps)?;
    let client = connect(paths).await?;

    for (version, delay) in steps {
        let promo = store.promote(name, version)?;
        client
            .evaluate(&promo.code, Some(name), Some(promo.new_version))
            .await?;
        println!(
            "Step: version {} -> version {} ({}s)",
            promo.from_version, promo.new_version, delay
        );
        if delay > 0.0 {
            tokio::time::sleep(Duration::from_secs_f64(delay)).await;
        }
    }
    Ok(())
}

/// `delete <name>`: remove a song and all its versions
pub fn delete(store: &SongStore, name: &str) -> Result<()> {
    store.delete(name)?;
    println!("Deleted \"{name}\"");
    Ok(())
}

/// `rename <old> <new>`: move a song to a new name
pub fn rename(store: &SongStore, old: &str, new: &str) -> Result<()> {
    store.rename(old, new)?;
    println!("Renamed \"{old}\" to \"{new}\"");
    Ok(())
}

/// `list`: all song names with their version counts
pub fn list(store: &SongStore) -> Result<()> {
    let names = store.list()?;
    if names.is_empty() {
        println!("No songs yet; try: tapedeck make <name> --code <pattern>");
        return Ok(());
    }
    for name in names {
        let detail = store.detail(&name, None)?;
        println!("{name} ({} versions)", detail.total_versions);
    }
    Ok(())
}

/// Ensure a daemon is running (launching lazily) and return a client for it
async fn connect(paths: &Paths) -> Result<DaemonClient> {
    let record = Supervisor::new(paths.clone()).ensure_running().await?;
    DaemonClient::new(&record)
}

/// Return a client only if a daemon is already running
async fn require_running(paths: &Paths) -> Result<DaemonClient> {
    let record = Supervisor::new(paths.clone())
        .resolve()
        .await
        .ok_or_else(|| Error::NoActiveSession("daemon is not running".to_string()))?;
    DaemonClient::new(&record)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use tapedeck_common::record::DaemonRecord;
    use tapedeckd::engine::NullEngine;
    use tapedeckd::{build_router, AppContext};
    use tempfile::TempDir;

    /// Serve the real daemon router on an ephemeral loopback port and point
    /// the data directory's record at it, so resolution finds a "running"
    /// daemon (this test process's pid is alive and /health answers)
    async fn serve_daemon(paths: &Paths) {
        let ctx = AppContext::new(Arc::new(NullEngine::new()));
        let app = build_router(ctx);
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        DaemonRecord {
            port,
            pid: std::process::id(),
        }
        .write(paths)
        .unwrap();
    }

    #[tokio::test]
    async fn sequence_ends_on_last_promotions_version() {
        let dir = TempDir::new().unwrap();
        let paths = Paths::at(dir.path());
        let store = SongStore::new(paths.clone());
        store.create("jam", "tone(1)").unwrap();
        store.update("jam", "tone(1)", "tone(2)", None).unwrap();
        serve_daemon(&paths).await;

        sequence(&store, &paths, "jam", "[[1,0],[2,0]]").await.unwrap();

        // Both promotions applied in order: v1 -> v3, then v2 -> v4
        let detail = store.detail("jam", None).unwrap();
        assert_eq!(detail.total_versions, 4);
        assert_eq!(detail.code, "tone(2)");

        // The daemon ends on the version created by the last promotion
        let record = DaemonRecord::read(&paths).unwrap();
        let current = DaemonClient::new(&record).unwrap().current().await.unwrap();
        assert_eq!(current.version, Some(4));
        assert_eq!(current.name.as_deref(), Some("jam"));
        assert_eq!(current.code.as_deref(), Some("tone(2)"));
    }

    #[test]
    fn sequence_steps_parse() {
        assert_eq!(
            parse_sequence_steps("[[1,0],[2,4.5]]").unwrap(),
            vec![(1, 0.0), (2, 4.5)]
        );
        assert_eq!(parse_sequence_steps("[[3,1]]").unwrap(), vec![(3, 1.0)]);
    }

    #[test]
    fn sequence_steps_reject_garbage() {
        assert!(matches!(
            parse_sequence_steps("[]"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_sequence_steps("[[0,1]]"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_sequence_steps("[[1,-2]]"),
            Err(Error::InvalidArgument(_))
        ));
        assert!(matches!(
            parse_sequence_steps("not json"),
            Err(Error::InvalidArgument(_))
        ));
    }
}
