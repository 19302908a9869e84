//! Daemon error types.

use std::net::SocketAddr;
use std::path::PathBuf;

use dirlock_proto::ProtocolError;
use thiserror::Error;

use crate::transport::WireMode;

/// Errors that terminate one session's transport.
///
/// None of these produce a response; the handler transitions to closing,
/// which releases the session's locks.
#[derive(Error, Debug)]
pub enum TransportError {
    /// Underlying stream failure.
    #[error("stream error: {0}")]
    Io(#[from] std::io::Error),

    /// The peer's bytes did not decode as a protocol message.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// WebSocket-level failure.
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    /// A WebSocket message of the wrong type for the session's mode.
    #[error("{got} message on a {expected} session")]
    ModeMismatch { expected: WireMode, got: WireMode },

    /// A configured read or write deadline expired.
    #[error("i/o deadline expired")]
    DeadlineExpired,
}

/// Startup and accept-loop failures.
#[derive(Error, Debug)]
pub enum ServerError {
    #[error("cannot bind {addr}: {source}")]
    Bind {
        addr: SocketAddr,
        source: std::io::Error,
    },

    #[error("lock directory '{}' is unusable: {source}", .path.display())]
    LockDirectory {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("lock path '{}' is not a directory", .0.display())]
    NotADirectory(PathBuf),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}
