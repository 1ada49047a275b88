//! tapedeckd - background playback daemon entry point
//!
//! Binds an ephemeral loopback port, writes the daemon record so CLI
//! invocations can find it, serves the control protocol, and exits (with
//! record cleanup) on signal or after the inactivity timeout.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use tapedeck_common::config::Paths;
use tapedeck_common::record::DaemonRecord;
use tokio::signal;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tapedeckd::engine::NullEngine;
use tapedeckd::{build_router, watchdog, AppContext};

/// Command-line arguments for tapedeckd
#[derive(Parser, Debug)]
#[command(name = "tapedeckd")]
#[command(about = "Background playback daemon for tapedeck")]
#[command(version)]
struct Args {
    /// Data directory holding the songs file, daemon record, and log
    #[arg(short, long)]
    data_dir: Option<PathBuf>,

    /// Seconds of inactivity before the daemon shuts itself down
    #[arg(long, default_value = "900", env = "TAPEDECKD_IDLE_SECS")]
    idle_timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tapedeckd=info,tower_http=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let args = Args::parse();
    info!("Starting tapedeckd v{}", env!("CARGO_PKG_VERSION"));

    let paths = Paths::resolve(args.data_dir.as_deref())
        .context("Failed to resolve data directory")?;
    paths.ensure_exists().context("Failed to create data directory")?;

    // Ephemeral port: the record written below is the only place the chosen
    // port is published
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .context("Failed to bind loopback listener")?;
    let port = listener.local_addr()?.port();

    let record = DaemonRecord {
        port,
        pid: std::process::id(),
    };
    record
        .write(&paths)
        .context("Failed to write daemon record")?;
    info!("Listening on 127.0.0.1:{} (pid {})", port, record.pid);

    let ctx = AppContext::new(Arc::new(NullEngine::new()));
    let state = ctx.state.clone();
    let engine = ctx.engine.clone();
    let app = build_router(ctx);

    let idle_timeout = Duration::from_secs(args.idle_timeout);
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_when(state, idle_timeout))
        .await
        .context("Server error")?;

    // Same cleanup on both exit paths: silence the engine, drop the record so
    // the next supervisor resolution sees "not running". Leave the record
    // alone if a replacement daemon already overwrote it.
    engine.stop();
    if DaemonRecord::read(&paths).map(|r| r.pid) == Some(record.pid) {
        DaemonRecord::remove(&paths).context("Failed to remove daemon record")?;
    }
    info!("Shutdown complete");
    Ok(())
}

/// Resolves on SIGINT/SIGTERM or after the inactivity timeout, whichever
/// comes first
async fn shutdown_when(
    state: Arc<tapedeckd::state::SharedState>,
    idle_timeout: Duration,
) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl+C"),
        _ = terminate => info!("Received terminate signal"),
        _ = watchdog::idle_expired(state, idle_timeout) => {}
    }
}
