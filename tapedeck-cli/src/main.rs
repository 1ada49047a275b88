//! tapedeck - versioned live-coding song manager
//!
//! Short-lived CLI process: every invocation handles exactly one command
//! start-to-finish. Durable state lives in the data directory; playback
//! state lives in the tapedeckd daemon, launched lazily when a command
//! needs it.

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tapedeck_common::config::Paths;
use tapedeck_common::store::SongStore;
use tapedeck_common::Result;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod client;
mod commands;
mod supervisor;

#[derive(Parser, Debug)]
#[command(name = "tapedeck")]
#[command(about = "Manage and play versioned live-coding songs")]
#[command(version)]
struct Cli {
    /// Data directory (defaults to the per-user data dir)
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Create a new song from pattern code
    Make {
        name: String,
        /// Pattern source text for version 1
        #[arg(long)]
        code: String,
    },
    /// Play a song (latest version unless --ver is given)
    Play {
        name: String,
        /// Version to play (1-based)
        #[arg(long)]
        ver: Option<usize>,
    },
    /// Stop playback
    Stop,
    /// Pause playback
    Pause,
    /// Show what is currently playing
    Current,
    /// Find-replace in the latest version and save the result as a new one
    Update {
        name: String,
        /// Text to search for in the latest version
        #[arg(long)]
        from: String,
        /// Replacement text
        #[arg(long)]
        to: String,
        /// Which match to replace when there is more than one (0-based)
        #[arg(long)]
        index: Option<usize>,
    },
    /// Show a song's code (latest version unless --ver is given)
    Detail {
        name: String,
        /// Version to show (1-based)
        #[arg(long)]
        ver: Option<usize>,
    },
    /// Promote a historical version to the front and play it
    VersionChange {
        /// Version to promote (1-based)
        version: usize,
        /// Song name; defaults to the currently playing song
        #[arg(long)]
        name: Option<String>,
    },
    /// Play a scripted series of versions with delays between steps
    Sequence {
        name: String,
        /// JSON steps, e.g. '[[1,0],[2,4.5]]' ([version, delaySeconds])
        #[arg(long)]
        versions: String,
    },
    /// Delete a song and all its versions
    Delete { name: String },
    /// Rename a song, keeping all versions
    Rename { old: String, new: String },
    /// List all songs
    List,
}

#[tokio::main]
async fn main() {
    // Initialize tracing; CLI output goes to stdout via println, diagnostics
    // to stderr via tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tapedeck=warn".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let cli = Cli::parse();
    if let Err(e) = run(cli).await {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<()> {
    let paths = Paths::resolve(cli.data_dir.as_deref())?;
    let store = SongStore::new(paths.clone());

    match cli.command {
        Command::Make { name, code } => commands::make(&store, &name, &code),
        Command::Play { name, ver } => commands::play(&store, &paths, &name, ver).await,
        Command::Stop => commands::stop(&paths).await,
        Command::Pause => commands::pause(&paths).await,
        Command::Current => commands::current(&paths).await,
        Command::Update {
            name,
            from,
            to,
            index,
        } => commands::update(&store, &paths, &name, &from, &to, index).await,
        Command::Detail { name, ver } => commands::detail(&store, &name, ver),
        Command::VersionChange { version, name } => {
            commands::version_change(&store, &paths, version, name).await
        }
        Command::Sequence { name, versions } => {
            commands::sequence(&store, &paths, &name, &versions).await
        }
        Command::Delete { name } => commands::delete(&store, &name),
        Command::Rename { old, new } => commands::rename(&store, &old, &new),
        Command::List => commands::list(&store),
    }
}
