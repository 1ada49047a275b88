//! HTTP API for the control protocol

pub mod handlers;
