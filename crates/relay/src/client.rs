//! WebSocket client for the conversion server's real-time endpoint.
//!
//! [`RelayClient`] holds the endpoint configuration. Call
//! [`RelayClient::connect`] to open the WebSocket, complete the
//! transport handshake and request the namespace, yielding a live
//! [`RelayConnection`].

use std::time::Duration;

use futures::{Sink, SinkExt, Stream, StreamExt};
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_tungstenite::{connect_async, MaybeTlsStream, WebSocketStream};

use crate::config::Endpoint;
use crate::error::RelayError;
use crate::packet::{parse_engine_packet, EnginePacket, OpenData, SocketPacket};

/// The WebSocket stream type produced by [`RelayClient::connect`].
pub type WsStream = WebSocketStream<MaybeTlsStream<tokio::net::TcpStream>>;

/// Transport parameters announced by the server in its `open` packet.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Handshake {
    /// Engine-level session id.
    pub sid: String,
    pub ping_interval: Duration,
    pub ping_timeout: Duration,
}

impl Handshake {
    /// Longest silence tolerated before the server is considered gone.
    pub fn ping_deadline(&self) -> Duration {
        self.ping_interval + self.ping_timeout
    }
}

impl From<OpenData> for Handshake {
    fn from(open: OpenData) -> Self {
        Self {
            sid: open.sid,
            ping_interval: Duration::from_millis(open.ping_interval),
            ping_timeout: Duration::from_millis(open.ping_timeout),
        }
    }
}

/// Connection settings for one server endpoint.
pub struct RelayClient {
    endpoint: Endpoint,
    handshake_timeout: Duration,
}

/// A live connection with the namespace `CONNECT` already sent.
#[derive(Debug)]
pub struct RelayConnection {
    pub handshake: Handshake,
    pub namespace: String,
    pub ws_stream: WsStream,
}

impl RelayClient {
    pub fn new(endpoint: Endpoint, handshake_timeout: Duration) -> Self {
        Self {
            endpoint,
            handshake_timeout,
        }
    }

    pub fn endpoint(&self) -> &Endpoint {
        &self.endpoint
    }

    /// Connect to the server and request the configured namespace.
    ///
    /// The namespace acknowledgement arrives later as a regular packet and
    /// is handled by the session loop.
    ///
    /// `handshake_timeout` bounds the TCP connect, the WebSocket upgrade
    /// and the wait for the `open` packet together.
    pub async fn connect(&self) -> Result<RelayConnection, RelayError> {
        let url = self.endpoint.ws_url();

        let opening = async {
            let (mut ws_stream, _response) = connect_async(url.as_str()).await.map_err(|e| {
                RelayError::Connection(format!("Failed to connect to {url}: {e}"))
            })?;
            let handshake = read_open(&mut ws_stream).await?;
            Ok::<_, RelayError>((ws_stream, handshake))
        };

        let (mut ws_stream, handshake) = tokio::time::timeout(self.handshake_timeout, opening)
            .await
            .map_err(|_| {
                RelayError::Connection(format!(
                    "Handshake with {url} did not complete within {:?}",
                    self.handshake_timeout
                ))
            })??;

        join_namespace(&mut ws_stream, &self.endpoint.namespace).await?;

        tracing::info!(
            url = %url,
            namespace = %self.endpoint.namespace,
            sid = %handshake.sid,
            "Connected to conversion server",
        );

        Ok(RelayConnection {
            handshake,
            namespace: self.endpoint.namespace.clone(),
            ws_stream,
        })
    }
}

/// Wait for the server's Engine.IO `open` packet.
pub async fn read_open<S>(ws: &mut S) -> Result<Handshake, RelayError>
where
    S: Stream<Item = Result<Message, tungstenite::Error>> + Unpin,
{
    while let Some(frame) = ws.next().await {
        match frame {
            Ok(Message::Text(text)) => {
                return match parse_engine_packet(&text) {
                    Ok(EnginePacket::Open(open)) => Ok(open.into()),
                    Ok(other) => Err(RelayError::Protocol(format!(
                        "Expected open packet, got {other:?}"
                    ))),
                    Err(e) => Err(RelayError::Protocol(format!("Bad open packet: {e}"))),
                };
            }
            Ok(Message::Close(frame)) => {
                return Err(RelayError::Connection(format!(
                    "Server closed during handshake: {frame:?}"
                )));
            }
            Ok(_) => {}
            Err(e) => return Err(RelayError::Connection(e.to_string())),
        }
    }
    Err(RelayError::Connection(
        "Stream ended during handshake".into(),
    ))
}

/// Send the Socket.IO `CONNECT` packet for `namespace`.
pub async fn join_namespace<S>(ws: &mut S, namespace: &str) -> Result<(), RelayError>
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let frame = EnginePacket::Message(SocketPacket::connect(namespace).encode()).encode();
    ws.send(Message::Text(frame))
        .await
        .map_err(|e| RelayError::Connection(format!("Failed to join {namespace}: {e}")))
}
