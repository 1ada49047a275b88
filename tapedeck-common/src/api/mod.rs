//! Control protocol types shared by the CLI client and the daemon server

pub mod types;

pub use types::*;
