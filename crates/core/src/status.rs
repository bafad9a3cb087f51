//! The conversion status element and its text mapping.
//!
//! [`StatusSlot`] is a single addressable text element. Every write
//! overwrites the previous text (last write wins); there is no history.
//! It is backed by a [`tokio::sync::watch`] channel so any number of
//! renderers can follow the current value without locking.

use tokio::sync::watch;

use crate::names::{
    EVENT_CONVERSION_COMPLETED, EVENT_CONVERSION_STARTED, STATUS_COMPLETED, STATUS_IN_PROGRESS,
};

/// A conversion state that has a display text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversionStatus {
    InProgress,
    Completed,
}

impl ConversionStatus {
    /// Map an inbound event name to the status it announces.
    ///
    /// Returns `None` for every name that should leave the display alone,
    /// including `connect`.
    pub fn from_event(name: &str) -> Option<Self> {
        match name {
            EVENT_CONVERSION_STARTED => Some(Self::InProgress),
            EVENT_CONVERSION_COMPLETED => Some(Self::Completed),
            _ => None,
        }
    }

    /// Fixed text shown for this status.
    pub fn text(self) -> &'static str {
        match self {
            Self::InProgress => STATUS_IN_PROGRESS,
            Self::Completed => STATUS_COMPLETED,
        }
    }
}

/// A single mutable status string identified by an element id.
pub struct StatusSlot {
    id: String,
    tx: watch::Sender<String>,
}

impl StatusSlot {
    /// Create an element with its pre-existing content.
    pub fn new(id: impl Into<String>, initial: impl Into<String>) -> Self {
        let (tx, _) = watch::channel(initial.into());
        Self { id: id.into(), tx }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    /// Current text of the element.
    pub fn text(&self) -> String {
        self.tx.borrow().clone()
    }

    /// Overwrite the element text.
    ///
    /// Returns `false` when the text already had this value, in which
    /// case watchers are not woken.
    pub fn set_text(&self, text: &str) -> bool {
        self.tx.send_if_modified(|current| {
            if current == text {
                false
            } else {
                text.clone_into(current);
                true
            }
        })
    }

    /// Apply a conversion status to the element.
    pub fn show(&self, status: ConversionStatus) -> bool {
        self.set_text(status.text())
    }

    /// Follow changes to the element text.
    pub fn watch(&self) -> watch::Receiver<String> {
        self.tx.subscribe()
    }
}

impl std::fmt::Debug for StatusSlot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusSlot")
            .field("id", &self.id)
            .field("text", &*self.tx.borrow())
            .finish()
    }
}
