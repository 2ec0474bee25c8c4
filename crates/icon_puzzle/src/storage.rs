use std::collections::HashMap;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("Storage is not available")]
    Unavailable,

    #[error("Storage I/O failed: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to serialize stored value: {0}")]
    Serialize(#[from] serde_json::Error),

    #[error("Storage backend error: {0}")]
    Backend(String),
}

/// A durable key-value slot. Last write wins.
pub trait ProgressStore: Send + Sync + 'static {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError>;
    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError>;
    fn remove(&mut self, key: &str) -> Result<(), StoreError>;
}

#[derive(Debug, Default, Clone)]
pub struct MemoryStore {
    entries: HashMap<String, String>,
}

impl MemoryStore {
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }
}

impl ProgressStore for MemoryStore {
    fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
        Ok(self.entries.get(key).cloned())
    }

    fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
        self.entries.insert(key.to_owned(), value.to_owned());
        Ok(())
    }

    fn remove(&mut self, key: &str) -> Result<(), StoreError> {
        self.entries.remove(key);
        Ok(())
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub use file_store::FileStore;

#[cfg(not(target_arch = "wasm32"))]
mod file_store {
    use std::fs;
    use std::io;
    use std::path::{Path, PathBuf};

    use super::{ProgressStore, StoreError};

    /// One JSON file per key inside `root`, replaced atomically on every save.
    #[derive(Debug, Clone)]
    pub struct FileStore {
        root: PathBuf,
    }

    impl FileStore {
        pub fn new(root: impl Into<PathBuf>) -> Self {
            Self { root: root.into() }
        }

        pub fn platform_default() -> Self {
            Self::new("saves")
        }

        fn path_for(&self, key: &str) -> PathBuf {
            self.root.join(format!("{key}.json"))
        }
    }

    impl ProgressStore for FileStore {
        fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
            match fs::read_to_string(self.path_for(key)) {
                Ok(text) => Ok(Some(text)),
                Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(None),
                Err(error) => Err(error.into()),
            }
        }

        fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
            write_atomic(&self.path_for(key), value)?;
            Ok(())
        }

        fn remove(&mut self, key: &str) -> Result<(), StoreError> {
            match fs::remove_file(self.path_for(key)) {
                Ok(()) => Ok(()),
                Err(error) if error.kind() == io::ErrorKind::NotFound => Ok(()),
                Err(error) => Err(error.into()),
            }
        }
    }

    fn write_atomic(path: &Path, text: &str) -> io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = path.with_extension("json.tmp");
        fs::write(&tmp_path, text)?;
        if let Err(error) = fs::rename(&tmp_path, path) {
            fs::remove_file(&tmp_path).ok();
            return Err(error);
        }
        Ok(())
    }
}

#[cfg(target_arch = "wasm32")]
pub use local_storage::LocalStorageStore;

#[cfg(target_arch = "wasm32")]
mod local_storage {
    use super::{ProgressStore, StoreError};

    /// The browser's `localStorage`, looked up on every call.
    #[derive(Debug, Default, Clone, Copy)]
    pub struct LocalStorageStore;

    impl LocalStorageStore {
        pub const fn platform_default() -> Self {
            Self
        }

        fn storage() -> Result<web_sys::Storage, StoreError> {
            let window = web_sys::window().ok_or(StoreError::Unavailable)?;
            window
                .local_storage()
                .map_err(|err| StoreError::Backend(format!("{err:?}")))?
                .ok_or(StoreError::Unavailable)
        }
    }

    impl ProgressStore for LocalStorageStore {
        fn load(&self, key: &str) -> Result<Option<String>, StoreError> {
            Self::storage()?
                .get_item(key)
                .map_err(|err| StoreError::Backend(format!("{err:?}")))
        }

        fn save(&mut self, key: &str, value: &str) -> Result<(), StoreError> {
            Self::storage()?
                .set_item(key, value)
                .map_err(|err| StoreError::Backend(format!("{err:?}")))
        }

        fn remove(&mut self, key: &str) -> Result<(), StoreError> {
            Self::storage()?
                .remove_item(key)
                .map_err(|err| StoreError::Backend(format!("{err:?}")))
        }
    }
}

/// The store the bit persists to on the current target.
#[cfg(not(target_arch = "wasm32"))]
pub type PlatformStore = FileStore;
#[cfg(target_arch = "wasm32")]
pub type PlatformStore = LocalStorageStore;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_store_round_trips() {
        let mut store = MemoryStore::default();
        assert!(matches!(store.load("k"), Ok(None)));
        assert!(store.save("k", "[1,2]").is_ok());
        assert_eq!(store.get("k"), Some("[1,2]"));
        assert!(store.remove("k").is_ok());
        assert_eq!(store.get("k"), None);
    }

    #[cfg(not(target_arch = "wasm32"))]
    #[test]
    fn file_store_round_trips() {
        let dir = tempfile::tempdir().expect("temp dir");
        let mut store = FileStore::new(dir.path().join("nested"));

        assert!(matches!(store.load("progress"), Ok(None)));
        store.save("progress", "[3]").expect("first save");
        store.save("progress", "[3,1]").expect("second save");
        assert_eq!(store.load("progress").ok().flatten().as_deref(), Some("[3,1]"));

        store.remove("progress").expect("remove");
        assert!(matches!(store.load("progress"), Ok(None)));
        store.remove("progress").expect("removing a missing key is fine");
    }
}
