use std::collections::HashMap;
use std::fmt::Debug;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use thiserror::Error;

/// Store key for the message of the day.
pub const MOTD_KEY: &str = "motd";

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to access store file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("store file {path} is not valid JSON: {source}")]
    Corrupt {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("store write failed: {0}")]
    Write(String),
}

/// Durable string-to-string storage. Only the motd lives here today.
pub trait Store: Send + Sync + Debug {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Persist synchronously to stable storage before returning.
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;
}

/// JSON-object-in-a-file store with a write-through in-memory cache.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    cache: Mutex<HashMap<String, String>>,
}

impl FileStore {
    /// Open (or create as `{}`) the store file and load its contents.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();

        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)
                .map_err(|source| StoreError::Io { path: path.clone(), source })?;
        }

        if !path.exists() {
            fs::write(&path, "{}")
                .map_err(|source| StoreError::Io { path: path.clone(), source })?;
        }

        let contents = fs::read_to_string(&path)
            .map_err(|source| StoreError::Io { path: path.clone(), source })?;

        let data: HashMap<String, serde_json::Value> = serde_json::from_str(&contents)
            .map_err(|source| StoreError::Corrupt { path: path.clone(), source })?;

        let cache = data
            .into_iter()
            .map(|(k, v)| {
                let v = match v {
                    serde_json::Value::String(s) => s,
                    other => other.to_string(),
                };
                (k, v)
            })
            .collect();

        Ok(Self { path, cache: Mutex::new(cache) })
    }

    fn flush(&self, cache: &HashMap<String, String>) -> Result<(), StoreError> {
        let encoded = serde_json::to_string(cache).map_err(|e| StoreError::Write(e.to_string()))?;
        fs::write(&self.path, encoded)
            .map_err(|source| StoreError::Io { path: self.path.clone(), source })
    }
}

impl Store for FileStore {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        let cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        Ok(cache.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        let mut cache = self.cache.lock().unwrap_or_else(|e| e.into_inner());
        cache.insert(key.to_string(), value.to_string());
        self.flush(&cache)
    }
}
