//! `slidecast-watch` -- follow a conversion from the terminal.
//!
//! Connects to the conversion server's notification namespace and
//! prints the conversion status every time it changes.
//!
//! # Environment variables
//!
//! | Variable                       | Required | Default             | Description                      |
//! |--------------------------------|----------|---------------------|----------------------------------|
//! | `RELAY_HOST`                   | no       | `localhost`         | Conversion server host           |
//! | `RELAY_PORT`                   | no       | `5000`              | Conversion server port           |
//! | `RELAY_NAMESPACE`              | no       | `/test`             | Notification namespace           |
//! | `RELAY_SECURE`                 | no       | `false`             | Use `wss://`                     |
//! | `RELAY_RECONNECTION`           | no       | `true`              | Reconnect after drops            |
//! | `RELAY_RECONNECT_ATTEMPTS`     | no       | unlimited           | Give up after this many retries  |
//! | `RELAY_HANDSHAKE_TIMEOUT_SECS` | no       | `20`                | Connect + handshake time limit   |
//! | `RELAY_STATUS_ELEMENT`         | no       | `conversion-status` | Status element id                |
//! | `WATCH_INITIAL_STATUS`         | no       | empty               | Text shown before any event      |

use anyhow::Context;
use slidecast_core::{ElementRegistry, StatusSlot};
use slidecast_relay::{NotificationRelay, RelayConfig};
use slidecast_watch::terminal;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "slidecast_watch=info,slidecast_relay=info".into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let config = RelayConfig::from_env().context("invalid relay configuration")?;
    let initial = std::env::var("WATCH_INITIAL_STATUS").unwrap_or_default();

    let mut page = ElementRegistry::new();
    let status = page.insert(StatusSlot::new(config.status_element.clone(), initial));

    tracing::info!(
        url = %config.endpoint.ws_url(),
        namespace = %config.endpoint.namespace,
        element = status.id(),
        "Starting slidecast-watch",
    );

    let relay = NotificationRelay::start(config, &page)?;
    let renderer = tokio::spawn(terminal::render(status.watch(), std::io::stdout()));

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    relay.shutdown().await;
    renderer.abort();
    Ok(())
}
