//! Error types
//!
//! Two failure families are kept apart: operational misuse of the server
//! lifecycle (programmer errors, fail fast) and handler failures raised
//! inside one pipeline execution (caught at the per-request boundary and
//! never allowed to escape it).

use std::net::SocketAddr;
use thiserror::Error;

/// Server lifecycle and transport errors
#[derive(Debug, Error)]
pub enum ServerError {
    /// `listen()` was called while the server is already listening
    #[error("server is already listening on {0}")]
    AlreadyRunning(SocketAddr),

    /// `close()` or `restart()` was called while the server is not running
    #[error("server is not running")]
    NotRunning,

    /// The configured hostname:port pair did not resolve to a bindable address
    #[error("invalid bind address '{addr}': {reason}")]
    InvalidAddress { addr: String, reason: String },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

/// Failure raised by a middleware or the terminal route handler.
///
/// Opaque by design: the server converts it into a safe 500 response and
/// reports the detail to the logger, never to the client.
pub type HandlerError = Box<dyn std::error::Error + Send + Sync>;

/// Result type used throughout middleware and route handler code
pub type HandlerResult<T> = Result<T, HandlerError>;
