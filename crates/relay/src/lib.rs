//! Conversion-status notification relay.
//!
//! Connects to one namespace of a Socket.IO server over WebSocket,
//! listens for a fixed set of named events and forwards each one to a
//! status element update. Provides configuration, the packet codec,
//! the WebSocket client, the subscription table, the session loop,
//! reconnection with backoff, and the [`NotificationRelay`] that owns
//! the connection for its whole lifetime.

pub mod client;
pub mod config;
pub mod error;
pub mod events;
pub mod packet;
pub mod processor;
pub mod reconnect;
pub mod relay;
pub mod subscriptions;

pub use config::{Endpoint, RelayConfig};
pub use error::RelayError;
pub use events::RelayEvent;
pub use relay::NotificationRelay;
pub use subscriptions::Subscriptions;
