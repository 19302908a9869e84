//! Daemon configuration.

use std::fmt;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Which protocol the listener speaks.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportKind {
    /// Plain TCP with the binary codec.
    Tcp,
    /// WebSocket, one message per request or response, binary or text
    /// framing chosen by the client's first message.
    WebSocket,
}

impl fmt::Display for TransportKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TransportKind::Tcp => write!(f, "tcp"),
            TransportKind::WebSocket => write!(f, "ws"),
        }
    }
}

/// Per-I/O deadlines applied by session handlers.
///
/// Expiry of either deadline closes the session, which in turn releases
/// every lock the session holds.
#[derive(Debug, Clone, Copy, Default)]
pub struct Deadlines {
    /// Applied around each request read.
    pub read: Option<Duration>,
    /// Applied around each response write.
    pub write: Option<Duration>,
}

/// Everything the daemon root needs to start serving.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address the listener binds.
    pub listen: SocketAddr,
    /// Directory holding the `.lck` files; must already exist.
    pub directory: PathBuf,
    pub transport: TransportKind,
    pub deadlines: Deadlines,
}

impl ServerConfig {
    /// Plain TCP configuration with no deadlines.
    pub fn tcp(listen: SocketAddr, directory: impl Into<PathBuf>) -> Self {
        Self {
            listen,
            directory: directory.into(),
            transport: TransportKind::Tcp,
            deadlines: Deadlines::default(),
        }
    }

    /// WebSocket configuration with no deadlines.
    pub fn websocket(listen: SocketAddr, directory: impl Into<PathBuf>) -> Self {
        Self {
            transport: TransportKind::WebSocket,
            ..Self::tcp(listen, directory)
        }
    }
}
