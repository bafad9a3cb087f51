//! Well-known event names and status texts.
//!
//! The event names are part of the wire contract with the conversion
//! server and must match what it emits byte for byte.

/// Emitted locally once the namespace handshake completes.
pub const EVENT_CONNECT: &str = "connect";

/// Emitted locally when a connected session ends, with the reason as the
/// only argument.
pub const EVENT_DISCONNECT: &str = "disconnect";

/// Server notification sent when a slide deck starts converting.
pub const EVENT_CONVERSION_STARTED: &str = "conversion_started";

/// Server notification sent once the MP3 has been written.
pub const EVENT_CONVERSION_COMPLETED: &str = "conversion_completed";

/// Namespace the conversion server emits its notifications on.
pub const DEFAULT_NAMESPACE: &str = "/test";

/// Identifier of the element whose text tracks the conversion.
pub const STATUS_ELEMENT_ID: &str = "conversion-status";

pub const STATUS_IN_PROGRESS: &str = "Conversion in progress...";

pub const STATUS_COMPLETED: &str = "Conversion completed!";
