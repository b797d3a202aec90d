//! Common error types for joybus-bridge.
//!
//! This module provides a centralized Error enum using thiserror,
//! with conversions from underlying error types used throughout the crate.

use thiserror::Error;

/// Main error type for joybus-bridge operations.
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors from tokio or std
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The serial device could not be opened
    #[error("Failed to open bridge on {port}: {source}")]
    Connection {
        port: String,
        #[source]
        source: tokio_serial::Error,
    },

    /// Wire protocol violations (oversized payloads, malformed replies)
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The bridge never returned a reply of the expected length
    #[error("Bridge unresponsive after {attempts} attempts")]
    Unresponsive { attempts: u32 },
}

/// Convenience type alias for Results using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
