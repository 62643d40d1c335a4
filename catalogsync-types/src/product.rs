use crate::metadata::{self, Metadata};
use crate::ProviderKind;
use serde::{Deserialize, Serialize};

/// A declared product.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Product {
    pub provider: ProviderKind,
    /// Stable, human-chosen identity. Derived from `name` when absent.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<String>,
    #[serde(default)]
    pub highlight: bool,
    #[serde(default, skip_serializing_if = "Metadata::is_empty")]
    pub metadata: Metadata,
    /// Provider-assigned id, absent until the first successful sync.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
}

impl Product {
    pub fn new(provider: ProviderKind, name: impl Into<String>) -> Self {
        Self {
            provider,
            key: None,
            name: name.into(),
            description: None,
            features: Vec::new(),
            highlight: false,
            metadata: Metadata::new(),
            id: None,
        }
    }

    pub fn with_key(mut self, key: impl Into<String>) -> Self {
        self.key = Some(key.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_features(mut self, features: Vec<String>) -> Self {
        self.features = features;
        self
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    /// Returns the key, deriving and storing it from the name if absent.
    pub fn ensure_key(&mut self) -> &str {
        if self.key.as_deref().is_none_or(str::is_empty) {
            self.key = Some(derive_key(&self.name));
        }
        self.key.as_deref().unwrap_or_default()
    }

    /// The declared key, or the one that would be derived from the name.
    pub fn effective_key(&self) -> String {
        match self.key.as_deref() {
            Some(k) if !k.is_empty() => k.to_string(),
            _ => derive_key(&self.name),
        }
    }

    pub fn mark_failed(&mut self, error: &str) {
        metadata::mark_failed(&mut self.metadata, error);
    }

    pub fn clear_failure(&mut self) {
        metadata::clear_failure(&mut self.metadata);
    }

    pub fn is_failed(&self) -> bool {
        metadata::is_failed(&self.metadata)
    }
}

/// Derives a key from a display name: lowercased, with every run of
/// whitespace replaced by a single underscore.
pub fn derive_key(name: &str) -> String {
    let mut key = String::with_capacity(name.len());
    let mut in_space = false;
    for c in name.chars() {
        if c.is_whitespace() {
            if !in_space {
                key.push('_');
            }
            in_space = true;
        } else {
            key.extend(c.to_lowercase());
            in_space = false;
        }
    }
    key
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn derive_key_collapses_whitespace() {
        assert_eq!(derive_key("Basic Plan"), "basic_plan");
        assert_eq!(derive_key("Pro \t  Plan"), "pro_plan");
        assert_eq!(derive_key(" Edge "), "_edge_");
        assert_eq!(derive_key("ALREADY_keyed"), "already_keyed");
    }

    #[test]
    fn ensure_key_keeps_existing() {
        let mut p = Product::new(ProviderKind::Stripe, "Basic Plan").with_key("basic");
        assert_eq!(p.ensure_key(), "basic");
    }

    #[test]
    fn ensure_key_derives_from_name() {
        let mut p = Product::new(ProviderKind::Stripe, "Basic Plan");
        assert_eq!(p.ensure_key(), "basic_plan");
        assert_eq!(p.key.as_deref(), Some("basic_plan"));
    }

    #[test]
    fn empty_key_is_replaced() {
        let mut p = Product::new(ProviderKind::Stripe, "Team").with_key("");
        assert_eq!(p.ensure_key(), "team");
    }
}
