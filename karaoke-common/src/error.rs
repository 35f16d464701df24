//! Common error types for the karaoke playback controller

use thiserror::Error;

/// Common result type for playback-control operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error types shared by both playback backends
#[derive(Error, Debug)]
pub enum Error {
    /// Player process could not be started (missing binary, permissions).
    /// Fatal: indicates a broken installation, never swallowed.
    #[error("Failed to spawn player: {0}")]
    Spawn(String),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// HTTP transport error talking to the player's control server
    #[error("Control server error: {0}")]
    Http(#[from] reqwest::Error),

    /// Malformed or incomplete status document from the control server
    #[error("Bad status document: {0}")]
    Status(String),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}
