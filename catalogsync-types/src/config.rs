use crate::{Price, Product, ProviderKind};
use serde::{Deserialize, Serialize};

/// A declarative catalog: ordered products and prices.
///
/// No uniqueness is enforced here. Keys only need to be unique within one
/// provider's namespace, and that is what reconcilers match on.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub products: Vec<Product>,
    #[serde(default)]
    pub prices: Vec<Price>,
}

impl Config {
    pub fn new(products: Vec<Product>, prices: Vec<Price>) -> Self {
        Self { products, prices }
    }

    pub fn is_empty(&self) -> bool {
        self.products.is_empty() && self.prices.is_empty()
    }

    /// Providers referenced by any entity, deduplicated, in first-seen order.
    pub fn providers(&self) -> Vec<ProviderKind> {
        let mut seen = Vec::new();
        let tags = self
            .products
            .iter()
            .map(|p| p.provider)
            .chain(self.prices.iter().map(|p| p.provider));
        for tag in tags {
            if !seen.contains(&tag) {
                seen.push(tag);
            }
        }
        seen
    }

    /// Entities annotated with a sync failure.
    pub fn failed_count(&self) -> usize {
        self.products.iter().filter(|p| p.is_failed()).count()
            + self.prices.iter().filter(|p| p.is_failed()).count()
    }
}
