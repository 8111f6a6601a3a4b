use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;

/// Slot holding the raw bearer token of the current auth session.
pub const TOKEN_STORAGE_KEY: &str = "supabase_token";

/// Key/value storage scoped to a single running client.
pub trait TokenStore: Send + Sync {
    fn get_item(&self, key: &str) -> Option<String>;
    fn set_item(&self, key: &str, value: &str);
    fn remove_item(&self, key: &str);
}

/// In-memory storage that disappears with the process.
#[derive(Clone, Default)]
pub struct SessionStorage {
    items: Arc<RwLock<HashMap<String, String>>>,
}

impl SessionStorage {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&self) {
        self.items.write().clear();
    }

    pub fn len(&self) -> usize {
        self.items.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.read().is_empty()
    }
}

impl TokenStore for SessionStorage {
    fn get_item(&self, key: &str) -> Option<String> {
        self.items.read().get(key).cloned()
    }

    fn set_item(&self, key: &str, value: &str) {
        self.items.write().insert(key.to_owned(), value.to_owned());
    }

    fn remove_item(&self, key: &str) {
        self.items.write().remove(key);
    }
}
