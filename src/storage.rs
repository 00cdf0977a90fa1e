//! Key-value storage abstraction
//!
//! Mirrors the subset of the Web Storage API the bridge needs. Handles take
//! `&self` like `web_sys::Storage` does; the page is single-threaded.

use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

use crate::error::Result;

/// Origin-scoped string key-value store
pub trait KeyValueStore {
    /// Read the raw value for `key`, `None` if absent
    fn get_item(&self, key: &str) -> Result<Option<String>>;

    /// Write `value` under `key`, replacing any prior value
    fn set_item(&self, key: &str, value: &str) -> Result<()>;

    /// Remove `key` (no-op if absent)
    fn remove_item(&self, key: &str) -> Result<()>;
}

/// In-memory store used natively and in tests
///
/// Clones share the same backing map, like two handles to `localStorage`.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    items: Rc<RefCell<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with a single entry
    pub fn with_item(key: &str, value: &str) -> Self {
        let store = Self::new();
        store
            .items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        store
    }

    pub fn len(&self) -> usize {
        self.items.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.borrow().is_empty()
    }
}

impl KeyValueStore for MemoryStore {
    fn get_item(&self, key: &str) -> Result<Option<String>> {
        Ok(self.items.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> Result<()> {
        self.items
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove_item(&self, key: &str) -> Result<()> {
        self.items.borrow_mut().remove(key);
        Ok(())
    }
}
