//! Local filesystem storage backend
//!
//! Stores each JSON document as a pretty-printed file under a base
//! directory, with key path segments mapped to subdirectories. This is
//! the development backend; the cloud bucket backend mirrors the same
//! key layout.

use super::ObjectStore;
use crate::error::{AerinError, Result};
use anyhow::Context;
use async_trait::async_trait;
use serde_json::Value;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Filesystem-backed object store rooted at a base directory
pub struct FileSystemStorage {
    base_dir: PathBuf,
}

impl FileSystemStorage {
    /// Create a storage instance rooted at `base_dir`
    ///
    /// The directory itself is created lazily on first write.
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
        }
    }

    fn full_path(&self, key: &str) -> PathBuf {
        self.base_dir.join(key)
    }
}

#[async_trait]
impl ObjectStore for FileSystemStorage {
    async fn save(&self, key: &str, value: &Value) -> Result<()> {
        let path = self.full_path(key);
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .with_context(|| format!("Failed to create directory for {}", key))
                .map_err(|e| AerinError::Storage(e.to_string()))?;
        }

        let contents = serde_json::to_string_pretty(value)
            .map_err(|e| AerinError::Storage(e.to_string()))?;
        tokio::fs::write(&path, contents)
            .await
            .with_context(|| format!("Failed to write {}", key))
            .map_err(|e| AerinError::Storage(e.to_string()))?;
        Ok(())
    }

    async fn load(&self, key: &str) -> Result<Option<Value>> {
        let path = self.full_path(key);
        match tokio::fs::read_to_string(&path).await {
            Ok(contents) => {
                let value = serde_json::from_str(&contents)
                    .with_context(|| format!("Failed to parse {}", key))
                    .map_err(|e| AerinError::Storage(e.to_string()))?;
                Ok(Some(value))
            }
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AerinError::Storage(format!("Failed to read {}: {}", key, e)).into()),
        }
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let path = self.full_path(key);
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(AerinError::Storage(format!("Failed to delete {}: {}", key, e)).into()),
        }
    }

    async fn list(&self, prefix: &str) -> Result<Vec<String>> {
        let path = self.full_path(prefix);
        let mut dir = match tokio::fs::read_dir(&path).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => {
                return Err(
                    AerinError::Storage(format!("Failed to list {}: {}", prefix, e)).into(),
                )
            }
        };

        let mut names = Vec::new();
        while let Some(entry) = dir
            .next_entry()
            .await
            .map_err(|e| AerinError::Storage(e.to_string()))?
        {
            names.push(entry.file_name().to_string_lossy().to_string());
        }
        Ok(names)
    }

    async fn exists(&self, key: &str) -> bool {
        tokio::fs::try_exists(self.full_path(key))
            .await
            .unwrap_or(false)
    }
}

impl FileSystemStorage {
    /// Base directory this store is rooted at
    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }
}
