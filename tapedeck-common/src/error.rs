//! Common error types for tapedeck
//!
//! Defines the shared error taxonomy using thiserror for clear error
//! propagation across the CLI, the daemon, and the version store.

use thiserror::Error;

/// Common result type for tapedeck operations
pub type Result<T> = std::result::Result<T, Error>;

/// Shared error taxonomy across the tapedeck binaries
#[derive(Error, Debug)]
pub enum Error {
    /// A song with the requested name already exists
    #[error("Song already exists: {0}")]
    AlreadyExists(String),

    /// Requested song (or other resource) not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Find-replace search string matched nothing in the latest version
    #[error("No match for \"{0}\" in latest version")]
    NoMatch(String),

    /// Find-replace search string matched more than once and no index was given
    #[error("{count} matches for \"{needle}\"; disambiguate with --index")]
    AmbiguousMatch { needle: String, count: usize },

    /// Find-replace match index is >= the number of matches
    #[error("Match index {index} out of range ({count} matches)")]
    IndexOutOfRange { index: usize, count: usize },

    /// Requested version number is < 1 or > the song's version count
    #[error("Version {version} out of range for \"{name}\" (1..={total})")]
    VersionOutOfRange {
        name: String,
        version: usize,
        total: usize,
    },

    /// Pattern code failed validation or execution in the engine
    #[error("Evaluation failed: {0}")]
    EvaluationError(String),

    /// Daemon never became healthy within the startup polling window
    #[error("Daemon did not become healthy in time: {0}")]
    DaemonStartTimeout(String),

    /// A control command required a running daemon and none is reachable
    #[error("No active session: {0}")]
    NoActiveSession(String),

    /// Lock marker could not be acquired even after stale takeover attempts
    #[error("Lock timeout: {0}")]
    LockTimeout(String),

    /// File I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Songs file or record (de)serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Control protocol transport or response shape errors
    #[error("HTTP error: {0}")]
    Http(String),

    /// Other errors
    #[error("Internal error: {0}")]
    Internal(String),
}
