//! Message transports: plain TCP with the binary codec, and WebSocket in
//! binary or text mode.

use std::fmt;
use std::future::Future;

use dirlock_proto::{binary, text, LockRequest, LockResponse};
use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::WebSocketStream;

use crate::error::TransportError;

/// One request/response wire connection.
///
/// `read_request` resolves to `None` on a clean end-of-stream; every error
/// is terminal for the session.
pub trait MessageTransport: Send {
    fn read_request(
        &mut self,
    ) -> impl Future<Output = Result<Option<LockRequest>, TransportError>> + Send;

    fn write_response(
        &mut self,
        response: &LockResponse,
    ) -> impl Future<Output = Result<(), TransportError>> + Send;

    fn close(&mut self) -> impl Future<Output = Result<(), TransportError>> + Send;
}

/// Binary-codec transport over a plain TCP stream.
///
/// The binary form is self-delimiting, so messages follow one another on
/// the stream with no outer framing.
pub struct TcpTransport {
    stream: BufStream<TcpStream>,
}

impl TcpTransport {
    pub fn new(stream: TcpStream) -> Self {
        Self {
            stream: BufStream::new(stream),
        }
    }
}

impl MessageTransport for TcpTransport {
    async fn read_request(&mut self) -> Result<Option<LockRequest>, TransportError> {
        Ok(binary::read_request_or_eof(&mut self.stream).await?)
    }

    async fn write_response(&mut self, response: &LockResponse) -> Result<(), TransportError> {
        let bytes = binary::encode_response(response);
        self.stream.write_all(&bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        self.stream.shutdown().await?;
        Ok(())
    }
}

/// Message framing mode of a WebSocket session.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WireMode {
    Binary,
    Text,
}

impl fmt::Display for WireMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WireMode::Binary => write!(f, "binary"),
            WireMode::Text => write!(f, "text"),
        }
    }
}

/// WebSocket transport, one protocol message per WebSocket message.
///
/// The client's first message selects the session's mode; a later message
/// of the other type is a protocol error that closes the session.
pub struct WsTransport {
    socket: WebSocketStream<TcpStream>,
    mode: Option<WireMode>,
}

impl WsTransport {
    pub fn new(socket: WebSocketStream<TcpStream>) -> Self {
        Self { socket, mode: None }
    }

    fn select_mode(&mut self, incoming: WireMode) -> Result<(), TransportError> {
        match self.mode {
            None => {
                self.mode = Some(incoming);
                Ok(())
            }
            Some(mode) if mode == incoming => Ok(()),
            Some(mode) => Err(TransportError::ModeMismatch {
                expected: mode,
                got: incoming,
            }),
        }
    }
}

impl MessageTransport for WsTransport {
    async fn read_request(&mut self) -> Result<Option<LockRequest>, TransportError> {
        loop {
            let message = match self.socket.next().await {
                None => return Ok(None),
                Some(message) => message?,
            };
            match message {
                Message::Binary(payload) => {
                    self.select_mode(WireMode::Binary)?;
                    let request = binary::read_request(&mut payload.as_slice()).await?;
                    return Ok(Some(request));
                }
                Message::Text(payload) => {
                    self.select_mode(WireMode::Text)?;
                    return Ok(Some(text::decode_request(&payload)?));
                }
                Message::Close(_) => return Ok(None),
                // tungstenite answers pings on its own
                Message::Ping(_) | Message::Pong(_) => continue,
                // raw frames never surface on a read
                Message::Frame(_) => continue,
            }
        }
    }

    async fn write_response(&mut self, response: &LockResponse) -> Result<(), TransportError> {
        let message = match self.mode {
            Some(WireMode::Text) => Message::Text(text::encode_response(response)?),
            // responses are only written after a request fixed the mode
            _ => Message::Binary(binary::encode_response(response)),
        };
        self.socket.send(message).await?;
        Ok(())
    }

    async fn close(&mut self) -> Result<(), TransportError> {
        let frame = CloseFrame {
            code: CloseCode::Normal,
            reason: "".into(),
        };
        match self.socket.close(Some(frame)).await {
            Ok(()) | Err(WsError::ConnectionClosed) | Err(WsError::AlreadyClosed) => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
