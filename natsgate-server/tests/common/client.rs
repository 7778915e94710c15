//! WebSocket test client for protocol testing
//!
//! Note: Some methods may appear unused because they're only used in specific
//! test files and clippy checks each test independently.

use std::net::SocketAddr;
use std::time::Duration;

use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// How long receives wait before failing a test
const RECV_TIMEOUT: Duration = Duration::from_secs(2);

/// What the server did next
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Received {
    Text(String),
    Close { code: u16, reason: String },
    /// The stream ended without a close frame
    Ended,
}

/// Low-level WebSocket connection
pub struct WsConnection {
    sink: SplitSink<WsStream, Message>,
    stream: SplitStream<WsStream>,
}

#[allow(dead_code)]
impl WsConnection {
    /// Connect to the gateway's websocket path
    pub async fn connect(addr: SocketAddr) -> Self {
        let url = format!("ws://{}/ws", addr);
        let (ws, _) = tokio_tungstenite::connect_async(&url)
            .await
            .expect("Failed to connect");
        let (sink, stream) = ws.split();
        Self { sink, stream }
    }

    /// Connect and log in, asserting the `ok` reply
    pub async fn login(addr: SocketAddr, token: &str) -> Self {
        let mut conn = Self::connect(addr).await;
        conn.send(&format!("login>:Bearer {token}")).await;
        assert_eq!(conn.recv_text().await, "ok");
        conn
    }

    /// Send raw text message
    pub async fn send(&mut self, msg: &str) {
        self.sink
            .send(Message::Text(msg.to_string().into()))
            .await
            .unwrap();
    }

    /// Send text, returning the error instead of panicking
    pub async fn try_send(&mut self, msg: &str) -> Result<(), String> {
        self.sink
            .send(Message::Text(msg.to_string().into()))
            .await
            .map_err(|e| e.to_string())
    }

    pub async fn send_binary(&mut self, data: &[u8]) {
        self.sink
            .send(Message::Binary(data.to_vec().into()))
            .await
            .unwrap();
    }

    /// Send a close frame
    pub async fn close(&mut self) {
        let _ = self.sink.send(Message::Close(None)).await;
    }

    /// Next text, close or end of stream
    pub async fn recv(&mut self) -> Received {
        let next = tokio::time::timeout(RECV_TIMEOUT, async {
            loop {
                match self.stream.next().await {
                    Some(Ok(Message::Text(text))) => return Received::Text(text.to_string()),
                    Some(Ok(Message::Close(frame))) => {
                        return match frame {
                            Some(frame) => Received::Close {
                                code: u16::from(frame.code),
                                reason: frame.reason.to_string(),
                            },
                            None => Received::Close {
                                code: 1005,
                                reason: String::new(),
                            },
                        };
                    }
                    Some(Ok(_)) => continue,
                    Some(Err(_)) | None => return Received::Ended,
                }
            }
        })
        .await;
        next.expect("timed out waiting for the server")
    }

    /// Receive a text message, panicking on anything else
    pub async fn recv_text(&mut self) -> String {
        match self.recv().await {
            Received::Text(text) => text,
            other => panic!("expected text, got {other:?}"),
        }
    }

    /// Receive a close frame, returning its code and reason
    pub async fn recv_close(&mut self) -> (u16, String) {
        match self.recv().await {
            Received::Close { code, reason } => (code, reason),
            other => panic!("expected close, got {other:?}"),
        }
    }

    /// Receive with timeout, returns None if nothing arrives
    pub async fn recv_timeout(&mut self, duration: Duration) -> Option<String> {
        tokio::time::timeout(duration, async {
            loop {
                match self.stream.next().await {
                    Some(Ok(Message::Text(text))) => return Some(text.to_string()),
                    Some(Ok(Message::Ping(_))) | Some(Ok(Message::Pong(_))) => continue,
                    _ => return None,
                }
            }
        })
        .await
        .ok()
        .flatten()
    }

    /// Assert no message received within duration
    pub async fn expect_no_message(&mut self, duration: Duration) {
        assert!(
            self.recv_timeout(duration).await.is_none(),
            "Expected no message but received one"
        );
    }
}
