//! Typed metadata bags.
//!
//! Declared entities carry free-form metadata whose values may be strings,
//! numbers, booleans or string lists. Providers usually only accept string
//! values, so every variant knows how to render itself as a stamp string.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// Metadata key holding the last sync error for an entity.
pub const SYNC_ERROR_KEY: &str = "syncError";

/// Metadata key flagging an entity whose last sync failed (`"true"`).
pub const SYNC_FAILED_KEY: &str = "syncFailed";

/// An entity's metadata, ordered by key for stable serialization.
pub type Metadata = BTreeMap<String, MetadataValue>;

/// A single metadata value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MetadataValue {
    Bool(bool),
    Integer(i64),
    Float(f64),
    Text(String),
    List(Vec<String>),
}

impl MetadataValue {
    /// Returns the inner string for `Text` values.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }

    /// Renders the value the way it is stamped into a provider's
    /// string-only metadata. Lists are JSON-encoded.
    pub fn to_stamp(&self) -> String {
        match self {
            Self::Bool(b) => b.to_string(),
            Self::Integer(n) => n.to_string(),
            Self::Float(n) => n.to_string(),
            Self::Text(s) => s.clone(),
            Self::List(items) => {
                serde_json::to_string(items).unwrap_or_else(|_| String::from("[]"))
            }
        }
    }
}

impl fmt::Display for MetadataValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_stamp())
    }
}

impl From<&str> for MetadataValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<String> for MetadataValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<bool> for MetadataValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for MetadataValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<Vec<String>> for MetadataValue {
    fn from(value: Vec<String>) -> Self {
        Self::List(value)
    }
}

/// Records a sync failure on a metadata bag.
pub(crate) fn mark_failed(metadata: &mut Metadata, error: &str) {
    metadata.insert(SYNC_ERROR_KEY.to_string(), MetadataValue::from(error));
    metadata.insert(SYNC_FAILED_KEY.to_string(), MetadataValue::from("true"));
}

/// Removes a previous failure annotation.
pub(crate) fn clear_failure(metadata: &mut Metadata) {
    metadata.remove(SYNC_ERROR_KEY);
    metadata.remove(SYNC_FAILED_KEY);
}

pub(crate) fn is_failed(metadata: &Metadata) -> bool {
    matches!(metadata.get(SYNC_FAILED_KEY), Some(MetadataValue::Text(s)) if s == "true")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stamp_rendering() {
        assert_eq!(MetadataValue::Bool(true).to_stamp(), "true");
        assert_eq!(MetadataValue::Integer(3).to_stamp(), "3");
        assert_eq!(MetadataValue::Float(1.5).to_stamp(), "1.5");
        assert_eq!(MetadataValue::from("x").to_stamp(), "x");
        assert_eq!(
            MetadataValue::List(vec!["a".into(), "b".into()]).to_stamp(),
            r#"["a","b"]"#
        );
    }

    #[test]
    fn untagged_json_decoding() {
        let v: MetadataValue = serde_json::from_str("true").unwrap();
        assert_eq!(v, MetadataValue::Bool(true));
        let v: MetadataValue = serde_json::from_str("\"true\"").unwrap();
        assert_eq!(v, MetadataValue::from("true"));
        let v: MetadataValue = serde_json::from_str("42").unwrap();
        assert_eq!(v, MetadataValue::Integer(42));
        let v: MetadataValue = serde_json::from_str("2.5").unwrap();
        assert_eq!(v, MetadataValue::Float(2.5));
        let v: MetadataValue = serde_json::from_str(r#"["a"]"#).unwrap();
        assert_eq!(v, MetadataValue::List(vec!["a".into()]));
    }

    #[test]
    fn failure_annotation() {
        let mut m = Metadata::new();
        assert!(!is_failed(&m));
        mark_failed(&mut m, "boom");
        assert!(is_failed(&m));
        assert_eq!(m.get(SYNC_ERROR_KEY).and_then(|v| v.as_str()), Some("boom"));
        clear_failure(&mut m);
        assert!(m.is_empty());
    }
}
