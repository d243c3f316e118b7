//! Object storage abstraction for conversation persistence
//!
//! Conversations and per-user indices are JSON documents addressed by
//! hierarchical keys. Two interchangeable backends satisfy the same
//! contract: a local file tree for development and a cloud bucket for
//! deployment. The backend is selected once at process start and cached
//! as a process-wide singleton.

use crate::config::{StorageConfig, BUCKET_NAME_ENV};
use crate::error::{AerinError, Result};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::{Arc, OnceLock};

pub mod bucket;
pub mod filesystem;

pub use bucket::BucketStorage;
pub use filesystem::FileSystemStorage;

/// Key-addressed JSON document store
///
/// Absence is never an error: `load` returns `None` for missing keys and
/// `delete` is idempotent. `list` returns immediate child names under a
/// prefix, which is how the per-user conversation directory is enumerated.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    /// Write a JSON document at `key`, creating intermediate path segments
    async fn save(&self, key: &str, value: &Value) -> Result<()>;

    /// Read the document at `key`, or `None` if absent
    async fn load(&self, key: &str) -> Result<Option<Value>>;

    /// Remove the document at `key`; succeeds if the key is already absent
    async fn delete(&self, key: &str) -> Result<()>;

    /// List immediate child names under `prefix`
    async fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Non-throwing existence probe
    async fn exists(&self, key: &str) -> bool;
}

static BACKEND: OnceLock<Arc<dyn ObjectStore>> = OnceLock::new();

/// Get the process-wide storage backend, building it on first use
///
/// Deployment mode (`AERIN_DEPLOYMENT=1`) selects the cloud bucket
/// backend and requires a bucket name; anything else selects the local
/// filesystem backend rooted at `storage.base_dir`. The selection is
/// made once and reused for the remainder of the process lifetime.
///
/// # Errors
///
/// Returns a `Config` error when deployment mode is active but no bucket
/// name is configured.
pub fn backend(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    if let Some(existing) = BACKEND.get() {
        return Ok(existing.clone());
    }
    let built = build_backend(config)?;
    Ok(BACKEND.get_or_init(|| built).clone())
}

/// Build a storage backend from configuration without caching it
///
/// Used by `backend` and directly by tests that need isolated instances.
pub fn build_backend(config: &StorageConfig) -> Result<Arc<dyn ObjectStore>> {
    if StorageConfig::deployment_mode() {
        let bucket_name = config.resolved_bucket_name().ok_or_else(|| {
            AerinError::Config(format!(
                "{} is required in deployment mode; create a bucket and set the variable",
                BUCKET_NAME_ENV
            ))
        })?;
        tracing::info!("Using cloud bucket storage (bucket: {})", bucket_name);
        Ok(Arc::new(BucketStorage::new(
            bucket_name,
            config.sidecar_endpoint.clone(),
        )))
    } else {
        tracing::info!("Using local filesystem storage at {}", config.base_dir);
        Ok(Arc::new(FileSystemStorage::new(&config.base_dir)))
    }
}
