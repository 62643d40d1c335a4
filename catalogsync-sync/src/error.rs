//! Error types for the sync layer.

use catalogsync_store::StoreError;
use catalogsync_types::ValidationError;
use thiserror::Error;

/// Result type for sync operations.
pub type SyncResult<T> = Result<T, SyncError>;

/// Errors that can occur while pulling from or pushing to a provider.
#[derive(Debug, Error)]
pub enum SyncError {
    /// Missing or unusable configuration (no providers, no secret key).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Schema validation of a config document failed.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// A price references a product key that no synced product carries.
    #[error(
        "product with key '{key}' not found. Available product keys: {}",
        list_or_none(.available)
    )]
    IdentityResolution { key: String, available: Vec<String> },

    /// A price declares neither a product id nor a product key.
    #[error(
        "no product id or key specified for price '{price}': either productId or productKey must be provided"
    )]
    MissingProductReference { price: String },

    /// A price breaks an invariant the provider would reject.
    #[error("invalid price '{name}': {reason}")]
    InvalidPrice { name: String, reason: String },

    /// The provider answered with an error body.
    #[error("{kind}/{code}: {message}")]
    Provider {
        kind: String,
        code: String,
        message: String,
    },

    /// Network error.
    #[error("network error: {0}")]
    Network(String),

    /// Serialization error.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Config persistence failed.
    #[error(transparent)]
    Store(StoreError),
}

fn list_or_none(keys: &[String]) -> String {
    if keys.is_empty() {
        "none".to_string()
    } else {
        keys.join(", ")
    }
}

impl From<StoreError> for SyncError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Validation(v) => Self::Validation(v),
            other => Self::Store(other),
        }
    }
}
