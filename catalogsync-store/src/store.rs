//! Config store abstraction.

use crate::error::StoreResult;
use async_trait::async_trait;
use catalogsync_types::Config;
use std::path::Path;

/// Reads and writes declarative catalogs.
///
/// Implementations must round-trip losslessly: `write(p, c)` followed by
/// `read(p)` yields a config equal to `c`.
#[async_trait]
pub trait ConfigStore: Send + Sync {
    /// Reads and validates the config at `path`.
    async fn read(&self, path: &Path) -> StoreResult<Config>;

    /// Persists `config` at `path`, replacing any existing content.
    async fn write(&self, path: &Path, config: &Config) -> StoreResult<()>;
}
