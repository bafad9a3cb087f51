//! Shared helpers for relay integration tests.
//!
//! [`spawn_server`] runs a minimal scripted conversion server on a local
//! port. It speaks just enough Engine.IO/Socket.IO to complete the
//! handshake and then plays one script per accepted connection.

#![allow(dead_code)]

use std::net::SocketAddr;
use std::time::Duration;

use futures::{SinkExt, StreamExt};
use slidecast_relay::reconnect::ReconnectConfig;
use slidecast_relay::{Endpoint, RelayConfig};
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{accept_async, WebSocketStream};

pub const OPEN_PACKET: &str = r#"0{"sid":"fake-sid","upgrades":[],"pingInterval":25000,"pingTimeout":20000,"maxPayload":1000000}"#;

/// One scripted action after the namespace handshake.
#[derive(Debug, Clone)]
pub enum Step {
    /// Send a raw text frame.
    Send(String),
    /// Wait for the next text frame from the client and assert it.
    Expect(String),
    /// Close the WebSocket from the server side.
    Close,
}

pub fn send(frame: &str) -> Step {
    Step::Send(frame.to_string())
}

pub fn emit(event: &str) -> Step {
    Step::Send(format!(r#"42/test,["{event}"]"#))
}

/// Script for one accepted connection.
#[derive(Debug, Clone)]
pub struct Session {
    /// Complete the WebSocket upgrade. When false the TCP connection is
    /// dropped right after it is accepted.
    pub upgrade: bool,
    /// Engine.IO `open` packet sent first.
    pub open: String,
    /// Reply to the client's namespace `CONNECT`.
    pub ack: String,
    pub steps: Vec<Step>,
}

impl Session {
    pub fn accept(steps: Vec<Step>) -> Self {
        Self {
            upgrade: true,
            open: OPEN_PACKET.to_string(),
            ack: r#"40/test,{"sid":"ns-sid"}"#.to_string(),
            steps,
        }
    }

    pub fn reject(message: &str) -> Self {
        Self {
            ack: format!(r#"44/test,{{"message":"{message}"}}"#),
            ..Self::accept(Vec::new())
        }
    }

    /// Drop the connection before the WebSocket upgrade.
    pub fn hang_up() -> Self {
        Self {
            upgrade: false,
            ..Self::accept(Vec::new())
        }
    }

    /// Advertise a custom ping interval and timeout, in milliseconds.
    pub fn with_ping(mut self, interval_ms: u64, timeout_ms: u64) -> Self {
        self.open = format!(
            r#"0{{"sid":"fake-sid","upgrades":[],"pingInterval":{interval_ms},"pingTimeout":{timeout_ms},"maxPayload":1000000}}"#
        );
        self
    }
}

pub struct FakeServer {
    pub addr: SocketAddr,
    handle: JoinHandle<Vec<Vec<String>>>,
}

impl FakeServer {
    /// Wait for every session to finish and return, per session, the
    /// text frames the client sent after the handshake.
    pub async fn finish(self) -> Vec<Vec<String>> {
        tokio::time::timeout(Duration::from_secs(10), self.handle)
            .await
            .expect("fake server did not finish")
            .expect("fake server panicked")
    }
}

pub async fn spawn_server(sessions: Vec<Session>) -> FakeServer {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();

    let handle = tokio::spawn(async move {
        let mut transcripts = Vec::new();
        for session in sessions {
            let (stream, _) = listener.accept().await.unwrap();
            if !session.upgrade {
                drop(stream);
                transcripts.push(Vec::new());
                continue;
            }
            let ws = accept_async(stream).await.unwrap();
            transcripts.push(play(ws, session).await);
        }
        transcripts
    });

    FakeServer { addr, handle }
}

async fn play<S>(mut ws: WebSocketStream<S>, session: Session) -> Vec<String>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    ws.send(Message::Text(session.open)).await.unwrap();
    assert_eq!(next_text(&mut ws).await.as_deref(), Some("40/test,"));
    ws.send(Message::Text(session.ack)).await.unwrap();

    for step in session.steps {
        match step {
            Step::Send(frame) => ws.send(Message::Text(frame)).await.unwrap(),
            Step::Expect(frame) => {
                assert_eq!(next_text(&mut ws).await, Some(frame));
            }
            Step::Close => {
                let _ = ws.close(None).await;
                break;
            }
        }
    }

    let mut received = Vec::new();
    while let Some(text) = next_text(&mut ws).await {
        received.push(text);
    }
    received
}

/// Next text frame from the client; `None` once the connection ends.
async fn next_text<S>(ws: &mut WebSocketStream<S>) -> Option<String>
where
    S: tokio::io::AsyncRead + tokio::io::AsyncWrite + Unpin,
{
    while let Some(frame) = ws.next().await {
        match frame {
            Ok(Message::Text(text)) => return Some(text),
            Ok(Message::Close(_)) | Err(_) => return None,
            Ok(_) => {}
        }
    }
    None
}

/// Relay configuration pointing at a fake server, with fast retries.
pub fn config(addr: SocketAddr) -> RelayConfig {
    let endpoint = Endpoint::new("127.0.0.1", addr.port(), "/test").unwrap();
    let mut config = RelayConfig::new(endpoint);
    config.handshake_timeout = Duration::from_secs(2);
    config.reconnect = ReconnectConfig {
        initial_delay: Duration::from_millis(20),
        max_delay: Duration::from_millis(50),
        multiplier: 2.0,
        max_attempts: Some(20),
    };
    config
}
