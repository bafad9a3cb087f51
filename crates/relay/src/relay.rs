//! The notification relay.
//!
//! [`NotificationRelay`] owns one connection to the conversion server
//! for its whole lifetime. Starting it resolves the status element,
//! builds the subscription table and spawns a single connection task
//! (connect -> process -> reconnect loop). All handlers run on that task.
//!
//! Observed events are also broadcast via a [`tokio::sync::broadcast`]
//! channel. Call [`NotificationRelay::subscribe`] to receive them.

use std::time::Duration;

use futures::SinkExt;
use slidecast_core::ElementRegistry;
use tokio::runtime::Handle;
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_util::sync::CancellationToken;

use crate::client::{RelayClient, RelayConnection, WsStream};
use crate::config::RelayConfig;
use crate::error::RelayError;
use crate::events::RelayEvent;
use crate::packet::{EnginePacket, SocketPacket};
use crate::processor::{process_messages, Session, SessionEnd};
use crate::reconnect::reconnect_loop;
use crate::subscriptions::Subscriptions;

/// Broadcast channel capacity for relay events.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// How long shutdown waits for the connection task to exit.
const SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

/// How long a clean goodbye to the server may take.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// A running relay. Dropping it cancels the connection task.
#[derive(Debug)]
pub struct NotificationRelay {
    namespace: String,
    event_tx: broadcast::Sender<RelayEvent>,
    cancel: CancellationToken,
    task_handle: Option<JoinHandle<()>>,
}

impl NotificationRelay {
    /// Start a relay that drives the standard conversion-status bindings.
    ///
    /// Fails with [`RelayError::MissingElement`] when `page` has no
    /// element with the configured id, and with [`RelayError::Runtime`]
    /// outside a Tokio runtime. The connection is attempted immediately.
    pub fn start(config: RelayConfig, page: &ElementRegistry) -> Result<Self, RelayError> {
        let status_slot = page.require(&config.status_element)?;
        tracing::debug!(element = status_slot.id(), "Status element resolved");
        Self::start_with(config, Subscriptions::conversion_status(status_slot))
    }

    /// Start a relay with caller-provided subscriptions.
    pub fn start_with(
        config: RelayConfig,
        subscriptions: Subscriptions,
    ) -> Result<Self, RelayError> {
        let runtime = Handle::try_current()
            .map_err(|e| RelayError::Runtime(format!("Relay needs a Tokio runtime: {e}")))?;

        let (event_tx, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let cancel = CancellationToken::new();
        let namespace = config.endpoint.namespace.clone();

        let task_tx = event_tx.clone();
        let task_cancel = cancel.clone();
        let task_handle = runtime.spawn(async move {
            tracing::info!(
                url = %config.endpoint.ws_url(),
                namespace = %config.endpoint.namespace,
                "Starting relay connection task",
            );
            let client = RelayClient::new(config.endpoint.clone(), config.handshake_timeout);
            run_connection_loop(&client, &config, &subscriptions, &task_tx, &task_cancel).await;
            tracing::info!("Relay connection task exited");
        });

        Ok(Self {
            namespace,
            event_tx,
            cancel,
            task_handle: Some(task_handle),
        })
    }

    /// Subscribe to events observed by the relay.
    pub fn subscribe(&self) -> broadcast::Receiver<RelayEvent> {
        self.event_tx.subscribe()
    }

    /// Whether the connection task is still alive.
    pub fn is_running(&self) -> bool {
        self.task_handle
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Leave the namespace, close the connection and wait for the task.
    pub async fn shutdown(mut self) {
        tracing::info!(namespace = %self.namespace, "Shutting down relay");
        self.cancel.cancel();

        if let Some(handle) = self.task_handle.take() {
            if tokio::time::timeout(SHUTDOWN_TIMEOUT, handle).await.is_err() {
                tracing::warn!("Relay connection task did not stop in time");
            }
        }

        tracing::info!("Relay shut down complete");
    }
}

impl Drop for NotificationRelay {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Core connection loop: connect -> process messages -> reconnect.
///
/// Runs until cancelled, until the server ends the namespace, or until
/// reconnection is disabled or exhausted.
async fn run_connection_loop(
    client: &RelayClient,
    config: &RelayConfig,
    subscriptions: &Subscriptions,
    event_tx: &broadcast::Sender<RelayEvent>,
    cancel: &CancellationToken,
) {
    let mut next = tokio::select! {
        _ = cancel.cancelled() => return,
        result = client.connect() => match result {
            Ok(conn) => Some(conn),
            Err(e) => {
                tracing::warn!(error = %e, "Connection failed");
                None
            }
        },
    };

    loop {
        let conn = match next.take() {
            Some(conn) => conn,
            None => {
                if !config.reconnection {
                    tracing::warn!("Reconnection disabled, relay stopping");
                    return;
                }
                match reconnect_loop(client, &config.reconnect, cancel).await {
                    Some(conn) => conn,
                    None => return,
                }
            }
        };

        let RelayConnection {
            handshake,
            namespace,
            mut ws_stream,
        } = conn;

        let session = Session {
            namespace: &namespace,
            ping_deadline: handshake.ping_deadline(),
            subscriptions,
            event_tx,
        };
        let end = process_messages(&mut ws_stream, &session, cancel).await;

        match end {
            SessionEnd::Cancelled => {
                say_goodbye(&mut ws_stream, &namespace).await;
                return;
            }
            ref end if !end.should_reconnect() => {
                tracing::warn!(reason = end.reason(), "Session ended by server, not reconnecting");
                return;
            }
            end => {
                tracing::info!(reason = end.reason(), "Connection lost");
            }
        }
    }
}

/// Best-effort namespace disconnect and WebSocket close.
async fn say_goodbye(ws: &mut WsStream, namespace: &str) {
    let frame = EnginePacket::Message(SocketPacket::disconnect(namespace).encode()).encode();
    let goodbye = async {
        ws.send(Message::Text(frame)).await?;
        ws.close(None).await
    };
    match tokio::time::timeout(CLOSE_TIMEOUT, goodbye).await {
        Ok(Ok(())) => tracing::debug!(namespace, "Left namespace and closed WebSocket"),
        Ok(Err(e)) => tracing::debug!(error = %e, "WebSocket close failed"),
        Err(_) => tracing::debug!("WebSocket close timed out"),
    }
}
