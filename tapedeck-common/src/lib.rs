//! # tapedeck common library
//!
//! Shared code for the tapedeck CLI and the tapedeckd daemon:
//! - Error taxonomy
//! - Data directory resolution
//! - Version store (songs file + collection lock)
//! - Daemon record (port + pid sidecar file)
//! - Control protocol request/response types

pub mod api;
pub mod config;
pub mod error;
pub mod lock;
pub mod record;
pub mod store;

pub use error::{Error, Result};
