// ABOUTME: JSON file key/value backend
// ABOUTME: Keeps the whole store in memory and rewrites a single JSON object file on every write

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use serde_json::{Map, Value};
use tokio::sync::Mutex;
use tracing::{debug, error};

use crate::{double_value, string_list_value, KeyValueStore, StorageError, StorageResult};

pub struct JsonFileStorage {
    path: PathBuf,
    entries: RwLock<Map<String, Value>>,
    // Serializes file rewrites so the file always matches the latest map
    write_lock: Mutex<()>,
}

impl JsonFileStorage {
    /// Open the store at `path`. A missing or blank file is an empty store.
    pub async fn open(path: impl Into<PathBuf>) -> StorageResult<Self> {
        let path = path.into();

        let entries = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Map::new(),
            Ok(bytes) => match serde_json::from_slice::<Value>(&bytes)? {
                Value::Object(map) => map,
                _ => {
                    return Err(StorageError::InvalidFormat(format!(
                        "{} does not contain a JSON object",
                        path.display()
                    )))
                }
            },
            Err(e) if e.kind() == ErrorKind::NotFound => Map::new(),
            Err(e) => return Err(e.into()),
        };

        debug!(
            "Opened JSON settings store at {} ({} entries)",
            path.display(),
            entries.len()
        );

        Ok(Self {
            path,
            entries: RwLock::new(entries),
            write_lock: Mutex::new(()),
        })
    }

    /// Open the store at the configured default location
    pub async fn open_default() -> StorageResult<Self> {
        Self::open(cellar_config::settings_file()).await
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn apply(&self, key: &str, value: Option<Value>) -> StorageResult<()> {
        let _guard = self.write_lock.lock().await;

        let contents = {
            let mut entries = self.entries.write();
            match value {
                Some(value) => {
                    entries.insert(key.to_string(), value);
                }
                None => {
                    entries.remove(key);
                }
            }
            serde_json::to_vec_pretty(&*entries)?
        };

        self.persist(&contents).await.map_err(|e| {
            error!("Failed to write {}: {}", self.path.display(), e);
            e
        })
    }

    async fn persist(&self, contents: &[u8]) -> StorageResult<()> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }

        // Write-then-rename so a crash never leaves a truncated file behind
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, contents).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for JsonFileStorage {
    fn get(&self, key: &str) -> Option<Value> {
        self.entries.read().get(key).cloned()
    }

    async fn set_string(&self, key: &str, value: String) -> StorageResult<()> {
        self.apply(key, Some(Value::String(value))).await
    }

    async fn set_int(&self, key: &str, value: i64) -> StorageResult<()> {
        self.apply(key, Some(Value::from(value))).await
    }

    async fn set_double(&self, key: &str, value: f64) -> StorageResult<()> {
        let value = double_value(key, value)?;
        self.apply(key, Some(value)).await
    }

    async fn set_bool(&self, key: &str, value: bool) -> StorageResult<()> {
        self.apply(key, Some(Value::Bool(value))).await
    }

    async fn set_string_list(&self, key: &str, value: Vec<String>) -> StorageResult<()> {
        self.apply(key, Some(string_list_value(value))).await
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.apply(key, None).await
    }
}
