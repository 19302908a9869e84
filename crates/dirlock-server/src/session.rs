//! Per-connection session handling.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use dirlock_proto::{LockRequest, LockResponse};
use tracing::{debug, instrument};

use crate::config::Deadlines;
use crate::error::TransportError;
use crate::manager::LockManager;
use crate::transport::MessageTransport;

/// Identity of one client connection, the unit of lock ownership.
///
/// Two requests on the same connection share a session; two connections
/// are distinct sessions even when they come from the same remote
/// endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(u64);

impl SessionId {
    pub const fn new(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "session-{}", self.0)
    }
}

/// Serves one connection until the peer closes it or an error ends it.
///
/// The loop is strictly serial: read a request, process it, write the
/// response. Any decode error, write error, or deadline expiry moves the
/// session to closing. Closing releases every lock the session still
/// holds, exactly once, no matter how the loop ended.
#[instrument(skip_all, fields(session = %session))]
pub async fn serve<T: MessageTransport>(
    manager: Arc<LockManager>,
    session: SessionId,
    mut transport: T,
    deadlines: Deadlines,
) {
    match serve_loop(&manager, session, &mut transport, deadlines).await {
        Ok(()) => debug!("session closed by peer"),
        Err(err) => debug!(error = %err, "session terminated"),
    }
    manager.on_disconnect(session);
    if let Err(err) = transport.close().await {
        debug!(error = %err, "transport close failed");
    }
}

async fn serve_loop<T: MessageTransport>(
    manager: &LockManager,
    session: SessionId,
    transport: &mut T,
    deadlines: Deadlines,
) -> Result<(), TransportError> {
    loop {
        let request = match read_request(transport, deadlines.read).await? {
            Some(request) => request,
            None => return Ok(()),
        };
        let response = manager.process(session, request);
        write_response(transport, &response, deadlines.write).await?;
    }
}

async fn read_request<T: MessageTransport>(
    transport: &mut T,
    deadline: Option<Duration>,
) -> Result<Option<LockRequest>, TransportError> {
    match deadline {
        Some(limit) => tokio::time::timeout(limit, transport.read_request())
            .await
            .map_err(|_| TransportError::DeadlineExpired)?,
        None => transport.read_request().await,
    }
}

async fn write_response<T: MessageTransport>(
    transport: &mut T,
    response: &LockResponse,
    deadline: Option<Duration>,
) -> Result<(), TransportError> {
    match deadline {
        Some(limit) => tokio::time::timeout(limit, transport.write_response(response))
            .await
            .map_err(|_| TransportError::DeadlineExpired)?,
        None => transport.write_response(response).await,
    }
}
