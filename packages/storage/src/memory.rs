// ABOUTME: In-memory key/value backend
// ABOUTME: Used by tests and by callers that do not need settings to survive a restart

use std::collections::HashMap;

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::Value;
use tracing::trace;

use crate::{double_value, string_list_value, KeyValueStore, StorageResult};

#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: RwLock<HashMap<String, Value>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with native values
    pub fn with_entries<I, K>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, Value)>,
        K: Into<String>,
    {
        Self {
            entries: RwLock::new(entries.into_iter().map(|(k, v)| (k.into(), v)).collect()),
        }
    }

    /// Write a native value synchronously, bypassing the typed setters.
    /// Simulates another writer sharing the same backend.
    pub fn insert_native(&self, key: impl Into<String>, value: Value) {
        self.entries.write().insert(key.into(), value);
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.read().contains_key(key)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Stored keys in sorted order
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.entries.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn put(&self, key: &str, value: Value) {
        trace!("memory storage: {} = {}", key, value);
        self.entries.write().insert(key.to_string(), value);
    }
}

#[async_trait]
impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().get(key).cloned()
    }

    async fn set_string(&self, key: &str, value: String) -> StorageResult<()> {
        self.put(key, Value::String(value));
        Ok(())
    }

    async fn set_int(&self, key: &str, value: i64) -> StorageResult<()> {
        self.put(key, Value::from(value));
        Ok(())
    }

    async fn set_double(&self, key: &str, value: f64) -> StorageResult<()> {
        self.put(key, double_value(key, value)?);
        Ok(())
    }

    async fn set_bool(&self, key: &str, value: bool) -> StorageResult<()> {
        self.put(key, Value::Bool(value));
        Ok(())
    }

    async fn set_string_list(&self, key: &str, value: Vec<String>) -> StorageResult<()> {
        self.put(key, string_list_value(value));
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        trace!("memory storage: remove {}", key);
        self.entries.write().remove(key);
        Ok(())
    }
}
