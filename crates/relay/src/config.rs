use std::str::FromStr;
use std::time::Duration;

use slidecast_core::names::{DEFAULT_NAMESPACE, STATUS_ELEMENT_ID};

use crate::error::RelayError;
use crate::reconnect::ReconnectConfig;

/// Engine.IO protocol revision spoken by the client.
const ENGINE_IO_VERSION: u8 = 4;

/// Where the relay connects: the page's host and port plus a namespace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoint {
    pub host: String,
    pub port: u16,
    /// Namespace path, always starting with `/`.
    pub namespace: String,
    /// Use `wss://` instead of `ws://`.
    pub secure: bool,
}

impl Endpoint {
    /// Create an endpoint, validating the namespace path.
    pub fn new(
        host: impl Into<String>,
        port: u16,
        namespace: impl Into<String>,
    ) -> Result<Self, RelayError> {
        let host = host.into();
        let namespace = namespace.into();

        if host.trim().is_empty() {
            return Err(RelayError::Config("host must not be empty".into()));
        }
        if !namespace.starts_with('/') {
            return Err(RelayError::Config(format!(
                "namespace must start with '/', got '{namespace}'"
            )));
        }
        if namespace.contains(',') {
            return Err(RelayError::Config(format!(
                "namespace must not contain ',', got '{namespace}'"
            )));
        }

        Ok(Self {
            host,
            port,
            namespace,
            secure: false,
        })
    }

    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// WebSocket URL of the server's real-time endpoint.
    ///
    /// The namespace is not part of the URL; it is joined after the
    /// transport handshake.
    pub fn ws_url(&self) -> String {
        let scheme = if self.secure { "wss" } else { "ws" };
        format!(
            "{scheme}://{}:{}/socket.io/?EIO={ENGINE_IO_VERSION}&transport=websocket",
            self.authority_host(),
            self.port
        )
    }

    /// Host as it appears in a URL authority: IPv6 literals are bracketed.
    fn authority_host(&self) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("[{}]", self.host)
        } else {
            self.host.clone()
        }
    }
}

/// Relay configuration.
#[derive(Debug, Clone)]
pub struct RelayConfig {
    pub endpoint: Endpoint,
    /// Id of the element whose text tracks the conversion.
    pub status_element: String,
    /// Reconnect after the transport drops.
    pub reconnection: bool,
    pub reconnect: ReconnectConfig,
    /// Time limit for the TCP connect, WebSocket upgrade and `open` packet.
    pub handshake_timeout: Duration,
}

impl RelayConfig {
    pub fn new(endpoint: Endpoint) -> Self {
        Self {
            endpoint,
            status_element: STATUS_ELEMENT_ID.to_string(),
            reconnection: true,
            reconnect: ReconnectConfig::default(),
            handshake_timeout: Duration::from_secs(20),
        }
    }

    /// Load configuration from environment variables with defaults.
    ///
    /// | Env Var                        | Default             |
    /// |--------------------------------|---------------------|
    /// | `RELAY_HOST`                   | `localhost`         |
    /// | `RELAY_PORT`                   | `5000`              |
    /// | `RELAY_NAMESPACE`              | `/test`             |
    /// | `RELAY_SECURE`                 | `false`             |
    /// | `RELAY_RECONNECTION`           | `true`              |
    /// | `RELAY_RECONNECT_ATTEMPTS`     | unlimited           |
    /// | `RELAY_HANDSHAKE_TIMEOUT_SECS` | `20`                |
    /// | `RELAY_STATUS_ELEMENT`         | `conversion-status` |
    pub fn from_env() -> Result<Self, RelayError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) but reads values through
    /// `lookup`.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, RelayError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let host = lookup("RELAY_HOST").unwrap_or_else(|| "localhost".into());
        let port: u16 = parse_or(&lookup, "RELAY_PORT", 5000)?;
        let namespace = lookup("RELAY_NAMESPACE").unwrap_or_else(|| DEFAULT_NAMESPACE.into());
        let secure: bool = parse_or(&lookup, "RELAY_SECURE", false)?;

        let endpoint = Endpoint::new(host, port, namespace)?.with_secure(secure);
        let mut config = Self::new(endpoint);

        config.reconnection = parse_or(&lookup, "RELAY_RECONNECTION", true)?;
        config.reconnect.max_attempts = match lookup("RELAY_RECONNECT_ATTEMPTS") {
            Some(raw) => Some(parse_value("RELAY_RECONNECT_ATTEMPTS", &raw)?),
            None => None,
        };
        config.handshake_timeout =
            Duration::from_secs(parse_or(&lookup, "RELAY_HANDSHAKE_TIMEOUT_SECS", 20)?);

        if let Some(element) = lookup("RELAY_STATUS_ELEMENT") {
            if element.trim().is_empty() {
                return Err(RelayError::Config(
                    "RELAY_STATUS_ELEMENT must not be empty".into(),
                ));
            }
            config.status_element = element;
        }

        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, RelayError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
{
    match lookup(key) {
        Some(raw) => parse_value(key, &raw),
        None => Ok(default),
    }
}

fn parse_value<T: FromStr>(key: &str, raw: &str) -> Result<T, RelayError> {
    raw.trim()
        .parse()
        .map_err(|_| RelayError::Config(format!("{key} has an invalid value '{raw}'")))
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use assert_matches::assert_matches;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn ws_url_uses_host_and_port() {
        let endpoint = Endpoint::new("example.com", 8080, "/test").unwrap();
        assert_eq!(
            endpoint.ws_url(),
            "ws://example.com:8080/socket.io/?EIO=4&transport=websocket"
        );
    }

    #[test]
    fn secure_endpoint_uses_wss() {
        let endpoint = Endpoint::new("example.com", 443, "/test")
            .unwrap()
            .with_secure(true);
        assert!(endpoint.ws_url().starts_with("wss://example.com:443/"));
    }

    #[test]
    fn ipv6_host_is_bracketed() {
        let endpoint = Endpoint::new("::1", 5000, "/test").unwrap();
        assert_eq!(
            endpoint.ws_url(),
            "ws://[::1]:5000/socket.io/?EIO=4&transport=websocket"
        );

        let bracketed = Endpoint::new("[::1]", 5000, "/test").unwrap();
        assert_eq!(bracketed.ws_url(), endpoint.ws_url());
    }

    #[test]
    fn ipv6_url_is_a_valid_request() {
        use tokio_tungstenite::tungstenite::client::IntoClientRequest;

        let endpoint = Endpoint::new("::1", 5000, "/test").unwrap();
        assert!(endpoint.ws_url().into_client_request().is_ok());
    }

    #[test]
    fn namespace_must_be_absolute() {
        assert_matches!(
            Endpoint::new("localhost", 5000, "test"),
            Err(RelayError::Config(_))
        );
        assert_matches!(
            Endpoint::new("localhost", 5000, "/a,b"),
            Err(RelayError::Config(_))
        );
        assert_matches!(Endpoint::new("", 5000, "/test"), Err(RelayError::Config(_)));
    }

    #[test]
    fn defaults_when_nothing_is_set() {
        let config = RelayConfig::from_lookup(|_| None).unwrap();
        assert_eq!(config.endpoint.host, "localhost");
        assert_eq!(config.endpoint.port, 5000);
        assert_eq!(config.endpoint.namespace, "/test");
        assert!(!config.endpoint.secure);
        assert!(config.reconnection);
        assert_eq!(config.reconnect.max_attempts, None);
        assert_eq!(config.handshake_timeout, Duration::from_secs(20));
        assert_eq!(config.status_element, "conversion-status");
    }

    #[test]
    fn overrides_are_applied() {
        let config = RelayConfig::from_lookup(lookup_from(&[
            ("RELAY_HOST", "convert.internal"),
            ("RELAY_PORT", "8000"),
            ("RELAY_NAMESPACE", "/jobs"),
            ("RELAY_SECURE", "true"),
            ("RELAY_RECONNECTION", "false"),
            ("RELAY_RECONNECT_ATTEMPTS", "3"),
            ("RELAY_HANDSHAKE_TIMEOUT_SECS", "5"),
            ("RELAY_STATUS_ELEMENT", "job-status"),
        ]))
        .unwrap();

        assert_eq!(
            config.endpoint.ws_url(),
            "wss://convert.internal:8000/socket.io/?EIO=4&transport=websocket"
        );
        assert_eq!(config.endpoint.namespace, "/jobs");
        assert!(!config.reconnection);
        assert_eq!(config.reconnect.max_attempts, Some(3));
        assert_eq!(config.handshake_timeout, Duration::from_secs(5));
        assert_eq!(config.status_element, "job-status");
    }

    #[test]
    fn invalid_port_is_rejected() {
        let result = RelayConfig::from_lookup(lookup_from(&[("RELAY_PORT", "not-a-port")]));
        assert_matches!(result, Err(RelayError::Config(msg)) if msg.contains("RELAY_PORT"));
    }

    #[test]
    fn empty_status_element_is_rejected() {
        let result = RelayConfig::from_lookup(lookup_from(&[("RELAY_STATUS_ELEMENT", " ")]));
        assert_matches!(result, Err(RelayError::Config(_)));
    }
}
