//! Lifecycle and notification events broadcast by the relay.
//!
//! These mirror what the relay observed on the wire so that other parts
//! of an application (or tests) can follow along without registering
//! handlers inside the connection task.

use chrono::{DateTime, Utc};
use serde::Serialize;

#[derive(Debug, Clone, Serialize)]
pub enum RelayEvent {
    /// The namespace handshake completed.
    Connected {
        namespace: String,
        /// Socket id assigned by the server, if it sent one.
        sid: Option<String>,
        at: DateTime<Utc>,
    },

    /// A named event arrived on the namespace.
    Received {
        name: String,
        args: Vec<serde_json::Value>,
        /// Whether any handler was registered for it.
        handled: bool,
        at: DateTime<Utc>,
    },

    /// A connected session ended.
    Disconnected {
        namespace: String,
        reason: String,
        at: DateTime<Utc>,
    },
}
