//! In-memory config store.

use crate::error::{StoreError, StoreResult};
use crate::format::ConfigFormat;
use crate::store::ConfigStore;
use async_trait::async_trait;
use catalogsync_types::Config;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;

/// Keeps configs in memory, keyed by path.
///
/// Writes still go through format detection, so an unsupported extension
/// fails the same way it would on disk.
#[derive(Debug, Default)]
pub struct MemoryConfigStore {
    files: RwLock<HashMap<PathBuf, Config>>,
}

impl MemoryConfigStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seeds the store with a config at `path`.
    pub async fn insert(&self, path: impl Into<PathBuf>, config: Config) {
        self.files.write().await.insert(path.into(), config);
    }

    /// Returns the stored config, if any, without validation.
    pub async fn get(&self, path: &Path) -> Option<Config> {
        self.files.read().await.get(path).cloned()
    }

    /// Paths written so far.
    pub async fn paths(&self) -> Vec<PathBuf> {
        let mut paths: Vec<_> = self.files.read().await.keys().cloned().collect();
        paths.sort();
        paths
    }
}

#[async_trait]
impl ConfigStore for MemoryConfigStore {
    async fn read(&self, path: &Path) -> StoreResult<Config> {
        ConfigFormat::from_path(path)?;
        self.files
            .read()
            .await
            .get(path)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(path.to_path_buf()))
    }

    async fn write(&self, path: &Path, config: &Config) -> StoreResult<()> {
        ConfigFormat::from_path(path)?;
        self.files
            .write()
            .await
            .insert(path.to_path_buf(), config.clone());
        Ok(())
    }
}
