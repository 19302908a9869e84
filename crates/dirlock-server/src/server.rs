//! The listener: accepts connections and spawns one session per
//! connection.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::{info, warn};

use crate::config::{ServerConfig, TransportKind};
use crate::error::ServerError;
use crate::manager::LockManager;
use crate::session::{self, SessionId};
use crate::transport::{TcpTransport, WsTransport};

/// The daemon root: bound listener, lock manager, session id allocator.
pub struct Server {
    listener: TcpListener,
    manager: Arc<LockManager>,
    config: ServerConfig,
    next_session: AtomicU64,
}

impl Server {
    /// Validates the lock directory and binds the listener.
    ///
    /// A missing directory or an unbindable address is a startup error;
    /// the binary turns either into a non-zero exit.
    pub async fn bind(config: ServerConfig) -> Result<Self, ServerError> {
        let metadata =
            std::fs::metadata(&config.directory).map_err(|source| ServerError::LockDirectory {
                path: config.directory.clone(),
                source,
            })?;
        if !metadata.is_dir() {
            return Err(ServerError::NotADirectory(config.directory.clone()));
        }

        let listener = TcpListener::bind(config.listen)
            .await
            .map_err(|source| ServerError::Bind {
                addr: config.listen,
                source,
            })?;
        let manager = Arc::new(LockManager::new(config.directory.clone()));

        Ok(Self {
            listener,
            manager,
            config,
            next_session: AtomicU64::new(1),
        })
    }

    /// Address the listener is actually bound to (useful with port 0).
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Lock manager shared by every session.
    pub fn manager(&self) -> &Arc<LockManager> {
        &self.manager
    }

    /// Accept loop; serves until the enclosing task is dropped or the
    /// listener fails.
    pub async fn serve(self) -> Result<(), ServerError> {
        info!(
            addr = %self.local_addr()?,
            transport = %self.config.transport,
            directory = %self.config.directory.display(),
            "dirlockd listening"
        );
        loop {
            let (stream, peer) = self.listener.accept().await?;
            let session = SessionId::new(self.next_session.fetch_add(1, Ordering::Relaxed));
            info!(%session, %peer, "client connected");

            let manager = Arc::clone(&self.manager);
            let deadlines = self.config.deadlines;
            match self.config.transport {
                TransportKind::Tcp => {
                    tokio::spawn(async move {
                        session::serve(manager, session, TcpTransport::new(stream), deadlines)
                            .await;
                        info!(%session, "client disconnected");
                    });
                }
                TransportKind::WebSocket => {
                    tokio::spawn(async move {
                        match tokio_tungstenite::accept_async(stream).await {
                            Ok(socket) => {
                                session::serve(manager, session, WsTransport::new(socket), deadlines)
                                    .await;
                                info!(%session, "client disconnected");
                            }
                            Err(err) => {
                                warn!(%session, error = %err, "websocket handshake failed");
                            }
                        }
                    });
                }
            }
        }
    }
}
