//! Provider abstraction.
//!
//! Every billing provider is driven through [`CatalogProvider`]. The
//! orchestrators never look past this trait, so adding a provider means a
//! new [`ProviderKind`] variant and one implementation.

use crate::error::SyncResult;
use crate::options::ProviderOptions;
use crate::stripe::StripeProvider;
use async_trait::async_trait;
use catalogsync_types::{Config, Price, Product, ProviderKind};
use serde::Serialize;
use std::fmt;

/// Reconciles declared entities with one provider's remote catalog.
///
/// Implementations keep per-run state (the product identity map), which is
/// why every operation takes `&mut self`. A run starts at
/// [`sync_products`](Self::sync_products) or
/// [`fetch_products`](Self::fetch_products); both discard whatever an
/// earlier run resolved.
#[async_trait]
pub trait CatalogProvider: Send {
    fn kind(&self) -> ProviderKind;

    /// Lists the provider's active products as declared entities.
    async fn fetch_products(&mut self) -> SyncResult<Vec<Product>>;

    /// Lists the provider's active prices as declared entities.
    async fn fetch_prices(&mut self) -> SyncResult<Vec<Price>>;

    /// Pushes the products tagged with this provider.
    ///
    /// Entities for other providers are returned untouched, in place. A
    /// per-entity failure is recorded on that entity; only a failure to list
    /// the remote catalog fails the whole batch.
    async fn sync_products(&mut self, products: Vec<Product>) -> SyncResult<SyncBatch<Product>>;

    /// Pushes the prices tagged with this provider.
    ///
    /// Must run after [`sync_products`](Self::sync_products) in the same run
    /// so product keys resolve.
    async fn sync_prices(&mut self, prices: Vec<Price>) -> SyncResult<SyncBatch<Price>>;

    /// Reports what a push of `config` would do, without writing anything.
    async fn plan(&mut self, config: &Config) -> SyncResult<Vec<PlannedChange>>;
}

/// Builds one provider per options entry.
pub fn build_providers(options: &[ProviderOptions]) -> SyncResult<Vec<Box<dyn CatalogProvider>>> {
    options
        .iter()
        .map(|opts| match opts {
            ProviderOptions::Stripe(stripe) => {
                StripeProvider::from_options(stripe).map(|p| Box::new(p) as Box<dyn CatalogProvider>)
            }
        })
        .collect()
}

/// Which kind of entity an outcome or plan entry refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntityKind {
    Product,
    Price,
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Product => f.write_str("product"),
            Self::Price => f.write_str("price"),
        }
    }
}

/// What happened to one entity during a push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OutcomeState {
    Created { id: String },
    /// A matched product was updated in place.
    Updated { id: String },
    /// A matched price had equal immutable attributes; only its metadata
    /// and active flag were written.
    MetadataUpdated { id: String },
    /// A matched price differed; a new version replaced `previous_id`.
    VersionReplaced { id: String, previous_id: String },
    Failed { error: String },
}

impl OutcomeState {
    pub fn id(&self) -> Option<&str> {
        match self {
            Self::Created { id }
            | Self::Updated { id }
            | Self::MetadataUpdated { id }
            | Self::VersionReplaced { id, .. } => Some(id),
            Self::Failed { .. } => None,
        }
    }

    pub fn is_failed(&self) -> bool {
        matches!(self, Self::Failed { .. })
    }
}

/// Per-entity result of a push.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct EntityOutcome {
    pub kind: EntityKind,
    pub provider: ProviderKind,
    pub key: String,
    pub name: String,
    #[serde(flatten)]
    pub state: OutcomeState,
}

/// Entities returned by a reconciler batch, with outcomes for the ones it
/// processed.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncBatch<T> {
    /// Same length and order as the input.
    pub items: Vec<T>,
    pub outcomes: Vec<EntityOutcome>,
}

impl<T> SyncBatch<T> {
    /// A batch in which nothing was processed.
    pub fn untouched(items: Vec<T>) -> Self {
        Self {
            items,
            outcomes: Vec::new(),
        }
    }
}

/// What a push would do to one declared entity.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PlanAction {
    Create,
    Update { id: String },
    UpdateMetadata { id: String },
    Replace { id: String, differences: Vec<String> },
    Unresolved { reason: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedChange {
    pub kind: EntityKind,
    pub provider: ProviderKind,
    pub key: String,
    pub name: String,
    #[serde(flatten)]
    pub action: PlanAction,
}

impl fmt::Display for PlannedChange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let subject = format!("{} {} '{}' ({})", self.provider, self.kind, self.name, self.key);
        match &self.action {
            PlanAction::Create => write!(f, "create   {subject}"),
            PlanAction::Update { id } => write!(f, "update   {subject} -> {id}"),
            PlanAction::UpdateMetadata { id } => write!(f, "metadata {subject} -> {id}"),
            PlanAction::Replace { id, differences } => write!(
                f,
                "replace  {subject} -> {id} (changed: {})",
                differences.join(", ")
            ),
            PlanAction::Unresolved { reason } => write!(f, "skip     {subject}: {reason}"),
        }
    }
}
