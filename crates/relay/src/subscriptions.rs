//! Event-name to handler bindings.
//!
//! [`Subscriptions`] is an explicit list of `(event name, handler)`
//! registrations. The relay owns it inside its single connection task,
//! so handlers are invoked one at a time, in arrival order, and never
//! concurrently with each other.

use std::collections::HashMap;
use std::sync::Arc;

use serde_json::Value;
use slidecast_core::names::{
    EVENT_CONNECT, EVENT_CONVERSION_COMPLETED, EVENT_CONVERSION_STARTED, EVENT_DISCONNECT,
};
use slidecast_core::{ConversionStatus, StatusSlot};

/// Callback invoked with the event arguments.
pub type Handler = Box<dyn Fn(&[Value]) + Send + Sync>;

/// Registered handlers, keyed by event name.
#[derive(Default)]
pub struct Subscriptions {
    handlers: HashMap<String, Vec<Handler>>,
}

impl Subscriptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// The standard conversion-status bindings.
    ///
    /// - `connect` and `disconnect` only emit a diagnostic trace.
    /// - `conversion_started` / `conversion_completed` overwrite the
    ///   status element with their fixed text.
    pub fn conversion_status(status_slot: Arc<StatusSlot>) -> Self {
        let mut subs = Self::new();

        subs.on(EVENT_CONNECT, |_| {
            tracing::info!("Connected to server");
        });

        subs.on(EVENT_DISCONNECT, |args| {
            let reason = args.first().and_then(Value::as_str).unwrap_or("unknown");
            tracing::info!(reason, "Disconnected from server");
        });

        for event in [EVENT_CONVERSION_STARTED, EVENT_CONVERSION_COMPLETED] {
            let Some(status) = ConversionStatus::from_event(event) else {
                continue;
            };
            let slot = Arc::clone(&status_slot);
            subs.on(event, move |_| {
                let changed = slot.show(status);
                tracing::debug!(
                    element = slot.id(),
                    status = status.text(),
                    changed,
                    "Status updated",
                );
            });
        }

        subs
    }

    /// Register `handler` for `event`. Handlers for the same event run in
    /// registration order.
    pub fn on<F>(&mut self, event: impl Into<String>, handler: F) -> &mut Self
    where
        F: Fn(&[Value]) + Send + Sync + 'static,
    {
        self.handlers
            .entry(event.into())
            .or_default()
            .push(Box::new(handler));
        self
    }

    /// Invoke every handler registered for `event`.
    ///
    /// Returns the number of handlers run; unknown names run none.
    pub fn dispatch(&self, event: &str, args: &[Value]) -> usize {
        let Some(handlers) = self.handlers.get(event) else {
            tracing::trace!(event, "No handler registered, ignoring");
            return 0;
        };
        for handler in handlers {
            handler(args);
        }
        handlers.len()
    }

}

impl std::fmt::Debug for Subscriptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut events: Vec<_> = self.handlers.keys().collect();
        events.sort();
        f.debug_struct("Subscriptions")
            .field("events", &events)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use slidecast_core::names::{STATUS_COMPLETED, STATUS_IN_PROGRESS};

    use super::*;

    fn status_bindings(initial: &str) -> (Subscriptions, Arc<StatusSlot>) {
        let slot = Arc::new(StatusSlot::new("conversion-status", initial));
        (Subscriptions::conversion_status(Arc::clone(&slot)), slot)
    }

    fn replay(subs: &Subscriptions, events: &[&str]) {
        for event in events {
            subs.dispatch(event, &[]);
        }
    }

    #[test]
    fn nothing_dispatched_keeps_initial_text() {
        let (_subs, slot) = status_bindings("Choose a .pptx file");
        assert_eq!(slot.text(), "Choose a .pptx file");
    }

    #[test]
    fn connect_does_not_touch_status() {
        let (subs, slot) = status_bindings("initial");
        assert_eq!(subs.dispatch("connect", &[]), 1);
        assert_eq!(slot.text(), "initial");
    }

    #[test]
    fn connect_then_started_shows_in_progress() {
        let (subs, slot) = status_bindings("");
        replay(&subs, &["connect", "conversion_started"]);
        assert_eq!(slot.text(), STATUS_IN_PROGRESS);
    }

    #[test]
    fn started_then_completed_shows_completed() {
        let (subs, slot) = status_bindings("");
        replay(&subs, &["connect", "conversion_started", "conversion_completed"]);
        assert_eq!(slot.text(), STATUS_COMPLETED);
    }

    #[test]
    fn repeated_started_is_idempotent() {
        let (subs, slot) = status_bindings("");
        replay(&subs, &["conversion_started"]);
        let rx = slot.watch();

        replay(&subs, &["conversion_started"]);
        assert_eq!(slot.text(), STATUS_IN_PROGRESS);
        assert!(!rx.has_changed().unwrap());
    }

    #[test]
    fn stale_started_after_completed_wins() {
        let (subs, slot) = status_bindings("");
        replay(&subs, &["conversion_completed", "conversion_started"]);
        assert_eq!(slot.text(), STATUS_IN_PROGRESS);
    }

    #[test]
    fn other_event_names_are_ignored() {
        let (subs, slot) = status_bindings("");
        replay(&subs, &["conversion_started"]);
        assert_eq!(subs.dispatch("conversion_failed", &[]), 0);
        assert_eq!(subs.dispatch("CONVERSION_COMPLETED", &[]), 0);
        assert_eq!(slot.text(), STATUS_IN_PROGRESS);
    }

    #[test]
    fn status_follows_latest_named_event() {
        let sequences: &[&[&str]] = &[
            &["conversion_started", "noise", "conversion_completed", "connect"],
            &["conversion_completed", "disconnect", "conversion_started", "other"],
            &["connect", "connect", "conversion_completed", "conversion_completed"],
        ];
        for events in sequences {
            let (subs, slot) = status_bindings("");
            replay(&subs, events);
            let expected = events
                .iter()
                .rev()
                .find_map(|e| ConversionStatus::from_event(e))
                .map(ConversionStatus::text)
                .unwrap_or("");
            assert_eq!(slot.text(), expected, "sequence {events:?}");
        }
    }

    #[test]
    fn handlers_run_in_registration_order() {
        let calls = Arc::new(AtomicUsize::new(0));
        let mut subs = Subscriptions::new();

        let first = Arc::clone(&calls);
        subs.on("tick", move |_| {
            assert_eq!(first.fetch_add(1, Ordering::SeqCst), 0);
        });
        let second = Arc::clone(&calls);
        subs.on("tick", move |_| {
            assert_eq!(second.fetch_add(1, Ordering::SeqCst), 1);
        });

        assert_eq!(subs.dispatch("tick", &[]), 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn handlers_receive_arguments() {
        let seen = Arc::new(std::sync::Mutex::new(None));
        let mut subs = Subscriptions::new();
        let sink = Arc::clone(&seen);
        subs.on("disconnect", move |args| {
            *sink.lock().unwrap() = args.first().cloned();
        });

        subs.dispatch("disconnect", &[Value::from("transport close")]);
        assert_eq!(
            seen.lock().unwrap().as_ref().and_then(Value::as_str),
            Some("transport close")
        );
    }
}
