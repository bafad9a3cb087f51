//! Exponential-backoff reconnection for the relay's WebSocket.
//!
//! When the transport drops, the relay calls [`reconnect_loop`] to keep
//! retrying with increasing delays until the connection is restored, the
//! attempt budget runs out, or the [`CancellationToken`] is triggered.

use std::time::Duration;

use tokio_util::sync::CancellationToken;

use crate::client::{RelayClient, RelayConnection};

/// Tunable parameters for the exponential-backoff strategy.
#[derive(Debug, Clone)]
pub struct ReconnectConfig {
    /// Delay before the first reconnection attempt.
    pub initial_delay: Duration,
    /// Upper bound on the delay between attempts.
    pub max_delay: Duration,
    /// Factor by which the delay grows after each failure.
    pub multiplier: f64,
    /// Give up after this many attempts; `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectConfig {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(1),
            max_delay: Duration::from_secs(5),
            multiplier: 2.0,
            max_attempts: None,
        }
    }
}

/// Calculate the next backoff delay from the current delay and config.
///
/// The result is clamped to [`ReconnectConfig::max_delay`].
pub fn next_delay(current: Duration, config: &ReconnectConfig) -> Duration {
    let next_ms = (current.as_millis() as f64 * config.multiplier) as u64;
    Duration::from_millis(next_ms).min(config.max_delay)
}

/// Attempt to reconnect with exponential backoff.
///
/// Waits before every attempt, including the first. Returns
/// `Some(connection)` once a connection succeeds, or `None` if `cancel`
/// fires or the attempt budget is exhausted.
pub async fn reconnect_loop(
    client: &RelayClient,
    config: &ReconnectConfig,
    cancel: &CancellationToken,
) -> Option<RelayConnection> {
    let mut delay = config.initial_delay;
    let mut attempt = 0u32;

    loop {
        if config.max_attempts.is_some_and(|max| attempt >= max) {
            tracing::warn!(attempts = attempt, "Giving up reconnecting");
            return None;
        }
        attempt += 1;

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reconnect cancelled");
                return None;
            }
            _ = tokio::time::sleep(delay) => {}
        }

        tracing::info!(
            attempt,
            delay_ms = delay.as_millis() as u64,
            url = %client.endpoint().ws_url(),
            "Reconnecting to conversion server",
        );

        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::info!("Reconnect cancelled");
                return None;
            }
            result = client.connect() => {
                match result {
                    Ok(conn) => {
                        tracing::info!(attempt, "Reconnected to conversion server");
                        return Some(conn);
                    }
                    Err(e) => {
                        tracing::warn!(error = %e, "Reconnect attempt {attempt} failed");
                    }
                }
            }
        }

        delay = next_delay(delay, config);
    }
}
