//! Registry of addressable status elements.
//!
//! The relay never looks elements up lazily: it resolves its target once
//! through [`ElementRegistry::require`] and holds the returned handle.

use std::collections::HashMap;
use std::sync::Arc;

use crate::error::CoreError;
use crate::status::StatusSlot;

#[derive(Debug, Default)]
pub struct ElementRegistry {
    elements: HashMap<String, Arc<StatusSlot>>,
}

impl ElementRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an element, replacing any element with the same id.
    ///
    /// Returns the shared handle so the caller can keep rendering it.
    pub fn insert(&mut self, slot: StatusSlot) -> Arc<StatusSlot> {
        let slot = Arc::new(slot);
        self.elements.insert(slot.id().to_string(), Arc::clone(&slot));
        slot
    }

    pub fn get(&self, id: &str) -> Option<Arc<StatusSlot>> {
        self.elements.get(id).cloned()
    }

    /// Look up an element that must exist.
    pub fn require(&self, id: &str) -> Result<Arc<StatusSlot>, CoreError> {
        self.get(id)
            .ok_or_else(|| CoreError::ElementNotFound(id.to_string()))
    }

    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }
}
