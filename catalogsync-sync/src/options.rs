//! Provider and run options.

use catalogsync_store::ConfigFormat;
use catalogsync_types::ProviderKind;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Options for one configured provider, tagged by provider.
///
/// Serialized as `{ "provider": "stripe", "options": { ... } }`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "provider", content = "options", rename_all = "lowercase")]
pub enum ProviderOptions {
    Stripe(StripeOptions),
}

impl ProviderOptions {
    pub fn kind(&self) -> ProviderKind {
        match self {
            Self::Stripe(_) => ProviderKind::Stripe,
        }
    }
}

/// Stripe connection settings.
#[derive(Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StripeOptions {
    /// Secret API key (`sk_...`).
    pub secret_key: String,
    /// Base URL for the Stripe API (e.g. `https://api.stripe.com`).
    pub api_base_url: String,
    /// Pinned `Stripe-Version` header, if any.
    pub api_version: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
    /// Pause after each product or price batch, in milliseconds.
    ///
    /// Stripe's list endpoints are eventually consistent; objects written
    /// moments ago may not be listed yet.
    pub settle_delay_ms: u64,
}

impl StripeOptions {
    pub fn new(secret_key: impl Into<String>) -> Self {
        Self {
            secret_key: secret_key.into(),
            ..Self::default()
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl Default for StripeOptions {
    fn default() -> Self {
        Self {
            secret_key: String::new(),
            api_base_url: "https://api.stripe.com".to_string(),
            api_version: None,
            timeout_secs: 60,
            settle_delay_ms: 500,
        }
    }
}

impl fmt::Debug for StripeOptions {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StripeOptions")
            .field("secret_key", &"<redacted>")
            .field("api_base_url", &self.api_base_url)
            .field("api_version", &self.api_version)
            .field("timeout_secs", &self.timeout_secs)
            .field("settle_delay_ms", &self.settle_delay_ms)
            .finish()
    }
}

/// Options for a push run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncOptions {
    /// Persist the returned config when it differs from the input.
    pub write_back: bool,
    /// Treat metadata-only updates as a config change.
    pub count_metadata_updates: bool,
}

/// Options for a pull run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PullOptions {
    /// Where to persist the pulled config; nothing is written when absent.
    pub config_path: Option<PathBuf>,
    pub format: ConfigFormat,
}
