use crate::error::{Result, SluiceError};
use async_trait::async_trait;
use dashmap::DashMap;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Opaque async key-value store the queue persists into.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()>;
    async fn remove(&self, key: &str) -> Result<()>;
}

/// In-process store, used in tests and when durability is not wanted.
#[derive(Default)]
pub struct MemoryStore {
    entries: DashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.get(key).map(|v| v.clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        self.entries.insert(key.to_string(), value);
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.remove(key);
        Ok(())
    }
}

/// Keys double as file names: ASCII alphanumerics, `_`, `-` and `.`, not
/// starting with a dot.
pub fn is_valid_key(key: &str) -> bool {
    !key.is_empty()
        && !key.starts_with('.')
        && key
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}

/// One file per key under a directory. Writes go to a temp file in the same
/// directory and are renamed into place, so a crash leaves either the old or
/// the new value.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn open(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> Result<PathBuf> {
        if !is_valid_key(key) {
            return Err(SluiceError::Store(format!("Invalid key: {:?}", key)));
        }
        Ok(self.dir.join(key))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(SluiceError::Store(format!(
                "Failed to read {}: {}",
                path.display(),
                e
            ))),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<()> {
        let path = self.path_for(key)?;
        let dir = self.dir.clone();

        let written = tokio::task::spawn_blocking(move || -> std::io::Result<()> {
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&value)?;
            tmp.as_file().sync_all()?;
            tmp.persist(&path).map_err(|e| e.error)?;
            Ok(())
        })
        .await
        .map_err(|e| SluiceError::Store(format!("Write task failed: {}", e)))?;

        written.map_err(|e| SluiceError::Store(format!("Failed to write {}: {}", key, e)))
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let path = self.path_for(key)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SluiceError::Store(format!(
                "Failed to remove {}: {}",
                path.display(),
                e
            ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_memory_store_roundtrip() {
        let store = MemoryStore::new();
        assert!(store.get("k").await.unwrap().is_none());

        store.set("k", b"v1".to_vec()).await.unwrap();
        store.set("k", b"v2".to_vec()).await.unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"v2".to_vec()));

        store.remove("k").await.unwrap();
        assert!(store.get("k").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_roundtrip() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path().join("state")).unwrap();

        assert!(store.get("offline_queue").await.unwrap().is_none());
        store
            .set("offline_queue", b"[1,2,3]".to_vec())
            .await
            .unwrap();
        assert_eq!(
            store.get("offline_queue").await.unwrap(),
            Some(b"[1,2,3]".to_vec())
        );
        assert!(tmp.path().join("state").join("offline_queue").exists());

        store.remove("offline_queue").await.unwrap();
        store.remove("offline_queue").await.unwrap();
        assert!(store.get("offline_queue").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_file_store_survives_reopen() {
        let tmp = TempDir::new().unwrap();
        {
            let store = FileStore::open(tmp.path()).unwrap();
            store.set("k", b"persisted".to_vec()).await.unwrap();
        }
        let store = FileStore::open(tmp.path()).unwrap();
        assert_eq!(store.get("k").await.unwrap(), Some(b"persisted".to_vec()));
    }

    #[tokio::test]
    async fn test_file_store_rejects_path_like_keys() {
        let tmp = TempDir::new().unwrap();
        let store = FileStore::open(tmp.path()).unwrap();

        for key in ["", "../escape", "a/b", ".hidden"] {
            let err = store.set(key, Vec::new()).await.unwrap_err();
            assert!(matches!(err, SluiceError::Store(_)), "key {:?}", key);
        }
    }
}
