//! Session loop for one live connection.
//!
//! Reads frames from the WebSocket, answers transport pings, decodes
//! packets for the relay's namespace and dispatches named events to the
//! [`Subscriptions`] in arrival order.

use std::time::Duration;

use chrono::Utc;
use futures::{Sink, SinkExt, Stream, StreamExt};
use serde_json::Value;
use slidecast_core::names::{EVENT_CONNECT, EVENT_DISCONNECT};
use tokio::sync::broadcast;
use tokio_tungstenite::tungstenite::{self, Message};
use tokio_util::sync::CancellationToken;

use crate::events::RelayEvent;
use crate::packet::{
    parse_engine_packet, parse_socket_packet, EnginePacket, SocketPacket, SocketPacketKind,
};
use crate::subscriptions::Subscriptions;

/// Why a session ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEnd {
    /// The relay was shut down locally.
    Cancelled,
    /// The server left the namespace on purpose.
    ServerDisconnect,
    /// The server refused the namespace.
    Rejected(String),
    /// The transport closed or errored.
    TransportClosed,
    /// No packet arrived within the ping deadline.
    PingTimeout,
}

impl SessionEnd {
    /// Reason string handed to `disconnect` handlers.
    pub fn reason(&self) -> &str {
        match self {
            Self::Cancelled => "io client disconnect",
            Self::ServerDisconnect => "io server disconnect",
            Self::Rejected(_) => "connect error",
            Self::TransportClosed => "transport close",
            Self::PingTimeout => "ping timeout",
        }
    }

    /// Whether the relay should try to connect again after this end.
    pub fn should_reconnect(&self) -> bool {
        matches!(self, Self::TransportClosed | Self::PingTimeout)
    }
}

/// Per-session state the loop needs.
pub struct Session<'a> {
    pub namespace: &'a str,
    pub ping_deadline: Duration,
    pub subscriptions: &'a Subscriptions,
    pub event_tx: &'a broadcast::Sender<RelayEvent>,
}

/// Outcome of handling one frame.
enum Step {
    Continue,
    End(SessionEnd),
}

/// Run the session until it ends.
///
/// When the namespace had been joined, a local `disconnect` event is
/// dispatched with the end reason before returning.
pub async fn process_messages<S>(
    ws: &mut S,
    session: &Session<'_>,
    cancel: &CancellationToken,
) -> SessionEnd
where
    S: Stream<Item = Result<Message, tungstenite::Error>>
        + Sink<Message, Error = tungstenite::Error>
        + Unpin,
{
    let mut connected = false;

    let end = loop {
        let frame = tokio::select! {
            _ = cancel.cancelled() => break SessionEnd::Cancelled,
            frame = tokio::time::timeout(session.ping_deadline, ws.next()) => frame,
        };

        let step = match frame {
            Err(_elapsed) => {
                tracing::warn!(
                    namespace = session.namespace,
                    deadline_ms = session.ping_deadline.as_millis() as u64,
                    "No ping from server within deadline",
                );
                Step::End(SessionEnd::PingTimeout)
            }
            Ok(None) => {
                tracing::info!(namespace = session.namespace, "WebSocket stream exhausted");
                Step::End(SessionEnd::TransportClosed)
            }
            Ok(Some(Ok(Message::Text(text)))) => {
                handle_text(ws, &text, session, &mut connected).await
            }
            Ok(Some(Ok(Message::Binary(_)))) => {
                tracing::trace!("Ignoring binary frame");
                Step::Continue
            }
            Ok(Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_)))) => {
                // WebSocket-level control frames are answered by tungstenite.
                Step::Continue
            }
            Ok(Some(Ok(Message::Close(frame)))) => {
                tracing::info!(?frame, "Server closed WebSocket");
                Step::End(SessionEnd::TransportClosed)
            }
            Ok(Some(Err(e))) => {
                tracing::error!(error = %e, "WebSocket receive error");
                Step::End(SessionEnd::TransportClosed)
            }
        };

        if let Step::End(end) = step {
            break end;
        }
    };

    if connected {
        let reason = end.reason().to_string();
        session
            .subscriptions
            .dispatch(EVENT_DISCONNECT, &[Value::from(reason.as_str())]);
        let _ = session.event_tx.send(RelayEvent::Disconnected {
            namespace: session.namespace.to_string(),
            reason,
            at: Utc::now(),
        });
    }

    end
}

/// Handle one Engine.IO text frame.
async fn handle_text<S>(
    ws: &mut S,
    text: &str,
    session: &Session<'_>,
    connected: &mut bool,
) -> Step
where
    S: Sink<Message, Error = tungstenite::Error> + Unpin,
{
    let packet = match parse_engine_packet(text) {
        Ok(packet) => packet,
        Err(e) => {
            tracing::warn!(error = %e, raw_message = %text, "Failed to parse engine packet");
            return Step::Continue;
        }
    };

    match packet {
        EnginePacket::Ping(data) => {
            tracing::trace!("Ping from server");
            let pong = EnginePacket::Pong(data).encode();
            if let Err(e) = ws.send(Message::Text(pong)).await {
                tracing::error!(error = %e, "Failed to send pong");
                return Step::End(SessionEnd::TransportClosed);
            }
            Step::Continue
        }
        EnginePacket::Message(payload) => match parse_socket_packet(&payload) {
            Ok(packet) => handle_socket_packet(packet, session, connected),
            Err(e) => {
                tracing::warn!(error = %e, raw_message = %payload, "Failed to parse socket packet");
                Step::Continue
            }
        },
        EnginePacket::Close => {
            tracing::info!("Server closed the transport");
            Step::End(SessionEnd::TransportClosed)
        }
        EnginePacket::Open(_) => {
            tracing::debug!("Ignoring repeated open packet");
            Step::Continue
        }
        EnginePacket::Pong(_) | EnginePacket::Upgrade | EnginePacket::Noop => Step::Continue,
    }
}

fn handle_socket_packet(packet: SocketPacket, session: &Session<'_>, connected: &mut bool) -> Step {
    if packet.namespace != session.namespace {
        tracing::trace!(
            namespace = %packet.namespace,
            "Ignoring packet for another namespace",
        );
        return Step::Continue;
    }

    match packet.kind {
        SocketPacketKind::Connect => {
            *connected = true;
            let sid = packet
                .data
                .as_ref()
                .and_then(|d| d.get("sid"))
                .and_then(Value::as_str)
                .map(str::to_string);
            let args: Vec<Value> = packet.data.into_iter().collect();
            session.subscriptions.dispatch(EVENT_CONNECT, &args);
            let _ = session.event_tx.send(RelayEvent::Connected {
                namespace: session.namespace.to_string(),
                sid,
                at: Utc::now(),
            });
            Step::Continue
        }
        SocketPacketKind::Event => {
            let Some((name, args)) = packet.event() else {
                tracing::warn!(data = ?packet.data, "Event packet without a name");
                return Step::Continue;
            };
            if packet.id.is_some() {
                tracing::debug!(event = name, "Acknowledgements are not supported, skipping ack");
            }
            let handled = session.subscriptions.dispatch(name, args) > 0;
            tracing::debug!(event = name, handled, "Event received");
            let _ = session.event_tx.send(RelayEvent::Received {
                name: name.to_string(),
                args: args.to_vec(),
                handled,
                at: Utc::now(),
            });
            Step::Continue
        }
        SocketPacketKind::Disconnect => {
            tracing::info!(namespace = session.namespace, "Server disconnected the namespace");
            Step::End(SessionEnd::ServerDisconnect)
        }
        SocketPacketKind::ConnectError => {
            let message = packet
                .error_message()
                .unwrap_or_else(|| "unknown error".to_string());
            tracing::warn!(namespace = session.namespace, error = %message, "Namespace refused");
            Step::End(SessionEnd::Rejected(message))
        }
        SocketPacketKind::BinaryEvent | SocketPacketKind::BinaryAck => {
            tracing::warn!(
                attachments = packet.attachments,
                "Binary packets are not supported, ignoring",
            );
            Step::Continue
        }
        SocketPacketKind::Ack => {
            tracing::trace!(id = ?packet.id, "Ignoring ack");
            Step::Continue
        }
    }
}
