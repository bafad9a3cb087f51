use slidecast_core::CoreError;

/// Errors raised while configuring or connecting the relay.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// A configuration value is missing or malformed.
    #[error("Invalid configuration: {0}")]
    Config(String),

    /// The target status element is not present on the page.
    #[error("Status element '{0}' not found")]
    MissingElement(String),

    /// Failed to establish the WebSocket connection.
    #[error("Connection error: {0}")]
    Connection(String),

    /// The server sent something the handshake did not expect.
    #[error("Protocol error: {0}")]
    Protocol(String),

    /// The relay was started outside a Tokio runtime.
    #[error("Runtime error: {0}")]
    Runtime(String),
}

impl From<CoreError> for RelayError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::ElementNotFound(id) => Self::MissingElement(id),
        }
    }
}
