//! Minimal protocol clients for exercising a live daemon.

#![allow(dead_code)] // not every test binary uses every helper

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use dirlock_proto::{
    binary, text, LockCommand, LockCommandResult, LockRequest, LockResponse, ProtocolError,
};
use dirlock_server::{Server, ServerConfig, TransportKind};
use futures_util::{SinkExt, StreamExt};
use tokio::io::AsyncWriteExt;
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

/// Binds a daemon on an ephemeral port and serves it in the background.
pub async fn spawn_server(directory: &Path, transport: TransportKind) -> SocketAddr {
    let listen = "127.0.0.1:0".parse().unwrap();
    let config = match transport {
        TransportKind::Tcp => ServerConfig::tcp(listen, directory),
        TransportKind::WebSocket => ServerConfig::websocket(listen, directory),
    };
    let server = Server::bind(config).await.unwrap();
    let addr = server.local_addr().unwrap();
    tokio::spawn(server.serve());
    addr
}

/// One TCP session speaking the binary codec.
pub struct TcpClient {
    stream: TcpStream,
}

impl TcpClient {
    pub async fn connect(addr: SocketAddr) -> Self {
        Self {
            stream: TcpStream::connect(addr).await.unwrap(),
        }
    }

    /// Sends one command and waits for its response.
    pub async fn run(&mut self, command: LockCommand, name: &str) -> LockResponse {
        self.send(LockRequest::new(command, name)).await.unwrap()
    }

    /// Sends an arbitrary request, including malformed command bytes.
    pub async fn send(&mut self, request: LockRequest) -> Result<LockResponse, ProtocolError> {
        let bytes = binary::encode_request(&request);
        self.stream.write_all(&bytes).await?;
        binary::read_response(&mut self.stream).await
    }

    /// Drops the connection, ending the session server-side.
    pub async fn disconnect(mut self) {
        let _ = self.stream.shutdown().await;
    }
}

/// Reconnects and retries Acquire until the daemon grants it.
///
/// Disconnect cleanup runs on the server after the socket closes, so a
/// competing acquire can briefly lose the race; bounded retries make the
/// tests deterministic.
pub async fn acquire_until_success(addr: SocketAddr, name: &str) -> TcpClient {
    let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
    let mut client = TcpClient::connect(addr).await;
    loop {
        let response = client.run(LockCommand::Acquire, name).await;
        if response.result == LockCommandResult::Success {
            return client;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "lock {name} never became free: {response:?}"
        );
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
}

pub type WsClient = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub async fn ws_connect(addr: SocketAddr) -> WsClient {
    let (socket, _) = connect_async(format!("ws://{addr}/")).await.unwrap();
    socket
}

/// One command over an established WebSocket, binary framing.
pub async fn ws_run_binary(socket: &mut WsClient, command: LockCommand, name: &str) -> LockResponse {
    let request = LockRequest::new(command, name);
    socket
        .send(Message::Binary(binary::encode_request(&request)))
        .await
        .unwrap();
    match socket.next().await.unwrap().unwrap() {
        Message::Binary(payload) => binary::read_response(&mut payload.as_slice()).await.unwrap(),
        other => panic!("expected a binary response, got {other:?}"),
    }
}

/// One command over an established WebSocket, text framing.
pub async fn ws_run_text(socket: &mut WsClient, command: LockCommand, name: &str) -> LockResponse {
    let request = LockRequest::new(command, name);
    socket
        .send(Message::Text(text::encode_request(&request).unwrap()))
        .await
        .unwrap();
    match socket.next().await.unwrap().unwrap() {
        Message::Text(payload) => text::decode_response(&payload).unwrap(),
        other => panic!("expected a text response, got {other:?}"),
    }
}
