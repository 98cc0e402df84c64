// ABOUTME: Key/value persistence contract consumed by the settings engine
// ABOUTME: Provides the KeyValueStore trait plus in-memory and JSON file backends

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

pub mod json_file;
pub mod memory;

// Re-export main types
pub use json_file::JsonFileStorage;
pub use memory::MemoryStorage;

/// Storage errors
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Invalid storage format: {0}")]
    InvalidFormat(String),
    #[error("Backend error: {0}")]
    Backend(String),
}

pub type StorageResult<T> = Result<T, StorageError>;

/// Main storage trait that all key/value backends must implement.
///
/// `get` is a synchronous read of the backend's current view; writes are
/// asynchronous and the new value must be visible to `get` once the returned
/// future completes.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Native value stored under `key`, `None` when absent
    fn get(&self, key: &str) -> Option<Value>;

    async fn set_string(&self, key: &str, value: String) -> StorageResult<()>;
    async fn set_int(&self, key: &str, value: i64) -> StorageResult<()>;
    async fn set_double(&self, key: &str, value: f64) -> StorageResult<()>;
    async fn set_bool(&self, key: &str, value: bool) -> StorageResult<()>;
    async fn set_string_list(&self, key: &str, value: Vec<String>) -> StorageResult<()>;
    async fn remove(&self, key: &str) -> StorageResult<()>;
}

/// JSON representation of a finite double; NaN and infinities have none
pub(crate) fn double_value(key: &str, value: f64) -> StorageResult<Value> {
    serde_json::Number::from_f64(value)
        .map(Value::Number)
        .ok_or_else(|| {
            StorageError::InvalidFormat(format!("{} is not a finite number: {}", key, value))
        })
}

pub(crate) fn string_list_value(value: Vec<String>) -> Value {
    Value::Array(value.into_iter().map(Value::String).collect())
}
