//! Shared building blocks for the Slidecast conversion-status relay.
//!
//! - [`names`] — wire-contract event names and the fixed status texts.
//! - [`status`] — the status element ([`StatusSlot`]) and the mapping
//!   from conversion events to display text.
//! - [`page`] — the element registry the relay resolves its target from.

pub mod error;
pub mod names;
pub mod page;
pub mod status;

pub use error::CoreError;
pub use page::ElementRegistry;
pub use status::{ConversionStatus, StatusSlot};
