use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The billing provider a declared entity belongs to.
///
/// This is a closed set: supporting a new provider means adding a variant
/// here and a matching reconciler in `catalogsync-sync`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    Stripe,
}

impl ProviderKind {
    /// Every known provider, in declaration order.
    pub const ALL: &'static [ProviderKind] = &[ProviderKind::Stripe];

    /// The tag used in config files.
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Stripe => "stripe",
        }
    }

    /// Comma-separated list of known tags, for error messages.
    pub fn known_tags() -> String {
        Self::ALL
            .iter()
            .map(|p| p.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ProviderKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.as_str() == s)
            .ok_or_else(|| format!("unknown provider '{s}', expected one of: {}", Self::known_tags()))
    }
}
