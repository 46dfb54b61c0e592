//! Local filesystem object store
//!
//! Keys are `/`-separated paths relative to the store root.

use bytes::Bytes;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::{BenchError, Result};

/// Directory-backed object store
#[derive(Debug, Clone)]
pub struct LocalStore {
    root: PathBuf,
}

impl LocalStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, key: &str) -> PathBuf {
        self.root.join(key)
    }

    /// Read an object
    pub async fn get_object(&self, key: &str) -> Result<Bytes> {
        match tokio::fs::read(self.object_path(key)).await {
            Ok(data) => Ok(Bytes::from(data)),
            Err(e) if e.kind() == ErrorKind::NotFound => Err(BenchError::ObjectNotFound { key: key.into() }),
            Err(e) => Err(e.into()),
        }
    }

    /// Write an object, creating parent directories
    pub async fn put_object(&self, key: &str, data: Bytes) -> Result<()> {
        let path = self.object_path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, &data).await?;
        debug!("Put {} ({} bytes)", path.display(), data.len());
        Ok(())
    }

    /// List every object key under the root, sorted
    pub async fn list_objects(&self) -> Result<Vec<String>> {
        let mut keys = Vec::new();
        let mut pending = vec![self.root.clone()];

        while let Some(dir) = pending.pop() {
            let mut entries = match tokio::fs::read_dir(&dir).await {
                Ok(entries) => entries,
                Err(e) if e.kind() == ErrorKind::NotFound && dir == self.root => return Ok(keys),
                Err(e) => return Err(e.into()),
            };
            while let Some(entry) = entries.next_entry().await? {
                let path = entry.path();
                if entry.file_type().await?.is_dir() {
                    pending.push(path);
                } else if let Ok(rel) = path.strip_prefix(&self.root) {
                    let key: Vec<String> = rel
                        .components()
                        .map(|c| c.as_os_str().to_string_lossy().into_owned())
                        .collect();
                    keys.push(key.join("/"));
                }
            }
        }

        keys.sort();
        Ok(keys)
    }

    /// Check if an object exists
    pub async fn object_exists(&self, key: &str) -> Result<bool> {
        Ok(tokio::fs::try_exists(self.object_path(key)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_put_get_list() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());

        store.put_object("images/chunks/c0", Bytes::from_static(b"abc")).await.unwrap();
        store.put_object("meta.json", Bytes::from_static(b"{}")).await.unwrap();

        assert_eq!(store.get_object("images/chunks/c0").await.unwrap().as_ref(), b"abc");
        assert!(store.object_exists("meta.json").await.unwrap());
        assert!(!store.object_exists("missing").await.unwrap());
        assert_eq!(
            store.list_objects().await.unwrap(),
            vec!["images/chunks/c0".to_string(), "meta.json".to_string()]
        );
    }

    #[tokio::test]
    async fn test_missing_object() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::new(dir.path());
        let err = store.get_object("nope").await.unwrap_err();
        assert!(matches!(err, BenchError::ObjectNotFound { .. }));
    }

    #[tokio::test]
    async fn test_list_missing_root_is_empty() {
        let store = LocalStore::new("/no/such/store/root");
        assert!(store.list_objects().await.unwrap().is_empty());
    }
}
