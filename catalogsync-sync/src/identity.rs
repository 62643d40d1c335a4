//! Per-run product identity resolution.
//!
//! Prices reference products by key; the provider only knows ids. The map
//! is filled while products are synced or fetched and consulted when prices
//! are. It lives for one run of one provider and is never shared.

use crate::error::{SyncError, SyncResult};
use std::collections::BTreeMap;

/// Maps product keys to provider-assigned ids.
#[derive(Debug, Clone, Default)]
pub struct IdentityMap {
    ids: BTreeMap<String, String>,
}

impl IdentityMap {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `key -> id`. A later record for the same key wins.
    pub fn record(&mut self, key: impl Into<String>, id: impl Into<String>) {
        self.ids.insert(key.into(), id.into());
    }

    /// Resolves a product key to its id.
    pub fn resolve(&self, key: &str) -> SyncResult<&str> {
        self.ids
            .get(key)
            .map(String::as_str)
            .ok_or_else(|| SyncError::IdentityResolution {
                key: key.to_string(),
                available: self.keys(),
            })
    }

    /// Reverse lookup: the key recorded for a product id.
    ///
    /// When several keys point at the same id the lexicographically smallest
    /// one is returned.
    pub fn key_for(&self, id: &str) -> Option<&str> {
        self.ids
            .iter()
            .find(|(_, v)| v.as_str() == id)
            .map(|(k, _)| k.as_str())
    }

    /// Known keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        self.ids.keys().cloned().collect()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.ids.contains_key(key)
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }
}
