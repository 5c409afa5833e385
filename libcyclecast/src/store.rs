//! Whole-document persistence for the content pool, posting state and credentials
//!
//! # Architecture
//!
//! - `DocumentStore` trait: get/set a whole document by key
//! - `FileStore`: the key is a filesystem path; writes go to a temporary
//!   sibling and are renamed into place
//! - `MemoryStore`: documents in a `HashMap`, for tests
//!
//! The typed helpers [`load_json`] and [`save_json`] sit on top of any store.
//!
//! # Example
//!
//! ```no_run
//! use libcyclecast::store::{load_json, save_json, FileStore};
//! use libcyclecast::PostingState;
//!
//! # fn example() -> libcyclecast::Result<()> {
//! let store = FileStore::new();
//! let mut state: PostingState = load_json(&store, "content/state.json")?.unwrap_or_default();
//! state.posted_indices.push(3);
//! save_json(&store, "content/state.json", &state, false)?;
//! # Ok(())
//! # }
//! ```

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

use crate::error::{Result, StoreError};

/// Backend for whole-document reads and writes
pub trait DocumentStore: Send + Sync {
    /// Read a document, `None` if it does not exist
    fn load(&self, key: &str) -> Result<Option<String>>;

    /// Replace a document
    fn save(&self, key: &str, contents: &str) -> Result<()>;

    /// Replace a document that holds secrets
    ///
    /// Backends that can restrict access to the stored document should
    /// override this. The default is a plain [`save`](Self::save).
    fn save_private(&self, key: &str, contents: &str) -> Result<()> {
        self.save(key, contents)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(self.load(key)?.is_some())
    }

    fn backend_name(&self) -> &str;
}

/// Load and deserialize a JSON document
pub fn load_json<T: DeserializeOwned>(store: &dyn DocumentStore, key: &str) -> Result<Option<T>> {
    match store.load(key)? {
        Some(raw) => {
            let value = serde_json::from_str(&raw).map_err(|e| StoreError::Json {
                key: key.to_string(),
                source: e,
            })?;
            Ok(Some(value))
        }
        None => Ok(None),
    }
}

/// Serialize a value as indented JSON and store it
pub fn save_json<T: Serialize>(
    store: &dyn DocumentStore,
    key: &str,
    value: &T,
    private: bool,
) -> Result<()> {
    let raw = serde_json::to_string_pretty(value).map_err(|e| StoreError::Json {
        key: key.to_string(),
        source: e,
    })?;

    if private {
        store.save_private(key, &raw)
    } else {
        store.save(key, &raw)
    }
}

/// File-backed store
///
/// Keys are paths. A missing file loads as `None`. Parent directories are
/// created on write, and private documents get mode 600 on Unix.
#[derive(Debug, Default, Clone)]
pub struct FileStore;

impl FileStore {
    pub fn new() -> Self {
        Self
    }

    fn temp_path(path: &Path) -> PathBuf {
        let mut name = path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        path.with_file_name(name)
    }

    fn write_atomic(&self, key: &str, contents: &str, private: bool) -> Result<()> {
        let path = Path::new(key);

        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(StoreError::Io)?;
            }
        }

        let tmp = Self::temp_path(path);
        std::fs::write(&tmp, contents).map_err(StoreError::Io)?;

        #[cfg(unix)]
        if private {
            use std::os::unix::fs::PermissionsExt;
            let perms = std::fs::Permissions::from_mode(0o600);
            std::fs::set_permissions(&tmp, perms).map_err(StoreError::Io)?;
        }
        #[cfg(not(unix))]
        let _ = private;

        std::fs::rename(&tmp, path).map_err(StoreError::Io)?;

        tracing::debug!("Wrote {} bytes to {:?}", contents.len(), path);
        Ok(())
    }
}

impl DocumentStore for FileStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        match std::fs::read_to_string(key) {
            Ok(raw) => Ok(Some(raw)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e).into()),
        }
    }

    fn save(&self, key: &str, contents: &str) -> Result<()> {
        self.write_atomic(key, contents, false)
    }

    fn save_private(&self, key: &str, contents: &str) -> Result<()> {
        self.write_atomic(key, contents, true)
    }

    fn exists(&self, key: &str) -> Result<bool> {
        Ok(Path::new(key).is_file())
    }

    fn backend_name(&self) -> &str {
        "file"
    }
}

/// In-memory store for tests
#[derive(Debug, Default)]
pub struct MemoryStore {
    documents: Mutex<HashMap<String, String>>,
    writes: Mutex<Vec<String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a document
    pub fn with_document(self, key: &str, contents: &str) -> Self {
        self.documents
            .lock()
            .unwrap()
            .insert(key.to_string(), contents.to_string());
        self
    }

    /// Current raw contents of a document
    pub fn get(&self, key: &str) -> Option<String> {
        self.documents.lock().unwrap().get(key).cloned()
    }

    /// Keys written so far, in write order
    pub fn writes(&self) -> Vec<String> {
        self.writes.lock().unwrap().clone()
    }
}

impl DocumentStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>> {
        Ok(self.get(key))
    }

    fn save(&self, key: &str, contents: &str) -> Result<()> {
        self.documents
            .lock()
            .unwrap()
            .insert(key.to_string(), contents.to_string());
        self.writes.lock().unwrap().push(key.to_string());
        Ok(())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
