//! Stripe reconciler.
//!
//! Products are matched on their `key` stamp and updated in place. Prices
//! are immutable on Stripe, so a matched price whose amount, currency or
//! schedule differ is replaced: a new version is created under the same key
//! and the old one is deactivated with a `replaced_by` stamp.

use super::api::{
    Identified, ListParams, Page, PriceUpdateParams, ProductParams, RemotePrice, RemoteProduct,
    StripeApi,
};
use super::client::StripeClient;
use super::mapping::{self, KEY, REPLACED_BY};
use crate::error::{SyncError, SyncResult};
use crate::identity::IdentityMap;
use crate::options::StripeOptions;
use crate::provider::{
    CatalogProvider, EntityKind, EntityOutcome, OutcomeState, PlanAction, PlannedChange,
    SyncBatch,
};
use async_trait::async_trait;
use catalogsync_types::{Config, Price, Product, ProviderKind};
use chrono::Utc;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, error, info, info_span, Instrument};
use uuid::Uuid;

/// Walks every page of a cursor-paginated listing.
///
/// Stops when Stripe reports no further pages, or on an empty page.
pub(crate) async fn collect_pages<T, F, Fut>(active: Option<bool>, mut list: F) -> SyncResult<Vec<T>>
where
    T: Identified,
    F: FnMut(ListParams) -> Fut,
    Fut: Future<Output = SyncResult<Page<T>>>,
{
    let mut items = Vec::new();
    let mut params = ListParams::first_page(active);
    loop {
        let page = list(params.clone()).await?;
        let cursor = page.data.last().map(|item| item.id().to_string());
        items.extend(page.data);

        match cursor {
            Some(id) if page.has_more => params.starting_after = Some(id),
            _ => break,
        }
    }
    Ok(items)
}

/// Index of the remote price a declared key matches.
///
/// Superseded versions are never matched. Active versions win over inactive
/// ones, then the most recently created.
fn find_price(existing: &[RemotePrice], key: &str) -> Option<usize> {
    existing
        .iter()
        .enumerate()
        .filter(|(_, p)| {
            p.metadata.get(KEY).map(String::as_str) == Some(key)
                && !p.metadata.contains_key(REPLACED_BY)
        })
        .max_by_key(|(_, p)| (p.active, p.created))
        .map(|(i, _)| i)
}

fn find_product(existing: &[RemoteProduct], key: &str) -> Option<usize> {
    existing
        .iter()
        .position(|p| p.metadata.get(KEY).map(String::as_str) == Some(key))
}

/// Rejects prices Stripe would refuse, before any request is sent.
fn check_price(price: &Price) -> SyncResult<()> {
    let violations = price.violations();
    if violations.is_empty() {
        return Ok(());
    }
    Err(SyncError::InvalidPrice {
        name: price.name.clone(),
        reason: violations
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join("; "),
    })
}

/// Reconciles declared products and prices with a Stripe account.
pub struct StripeProvider {
    api: Arc<dyn StripeApi>,
    settle_delay: Duration,
    identity: IdentityMap,
    // Set once `fetch_products` has filled `identity` from the full listing.
    identity_fetched: bool,
}

impl StripeProvider {
    pub fn new(api: Arc<dyn StripeApi>, settle_delay: Duration) -> Self {
        Self {
            api,
            settle_delay,
            identity: IdentityMap::new(),
            identity_fetched: false,
        }
    }

    /// Builds a provider backed by the HTTP client.
    pub fn from_options(options: &StripeOptions) -> SyncResult<Self> {
        let settle_delay = options.settle_delay();
        let client = StripeClient::new(options.clone())?;
        Ok(Self::new(Arc::new(client), settle_delay))
    }

    /// Product keys resolved so far in this run.
    pub fn identity(&self) -> &IdentityMap {
        &self.identity
    }

    /// Drops the identity map left by an earlier run.
    fn start_run(&mut self) {
        self.identity = IdentityMap::new();
        self.identity_fetched = false;
    }

    async fn list_products(&self, active: Option<bool>) -> SyncResult<Vec<RemoteProduct>> {
        let api = &self.api;
        collect_pages(active, |params| api.list_products(params)).await
    }

    async fn list_prices(&self, active: Option<bool>) -> SyncResult<Vec<RemotePrice>> {
        let api = &self.api;
        collect_pages(active, |params| api.list_prices(params)).await
    }

    async fn settle(&self, processed: usize) {
        if processed > 0 && !self.settle_delay.is_zero() {
            debug!("Waiting {:?} for Stripe to settle", self.settle_delay);
            tokio::time::sleep(self.settle_delay).await;
        }
    }

    /// Resolves the product id a price belongs to.
    fn resolve_product(&self, price: &Price) -> SyncResult<String> {
        if let Some(id) = price.product_id.as_deref().filter(|id| !id.is_empty()) {
            return Ok(id.to_string());
        }
        match price.product_key.as_deref().filter(|k| !k.is_empty()) {
            Some(key) => self.identity.resolve(key).map(str::to_string),
            None => Err(SyncError::MissingProductReference {
                price: price.name.clone(),
            }),
        }
    }

    async fn sync_product(
        &mut self,
        mut product: Product,
        key: &str,
        existing: &mut Vec<RemoteProduct>,
    ) -> SyncResult<(Product, OutcomeState)> {
        let params = mapping::product_params(&product, key);

        let (remote, state) = match find_product(existing, key) {
            Some(idx) => {
                let id = existing[idx].id.clone();
                debug!("Found existing product with key {} ({})", key, id);
                let params = ProductParams {
                    active: Some(true),
                    ..params
                };
                let updated = self.api.update_product(&id, params).await?;
                info!("Updated product: {} (ID: {})", updated.name, updated.id);
                existing[idx] = updated.clone();
                let state = OutcomeState::Updated {
                    id: updated.id.clone(),
                };
                (updated, state)
            }
            None => {
                let created = self.api.create_product(params).await?;
                info!("Created product: {} (ID: {})", created.name, created.id);
                existing.push(created.clone());
                let state = OutcomeState::Created {
                    id: created.id.clone(),
                };
                (created, state)
            }
        };

        self.identity.record(key, &remote.id);
        product.id = Some(remote.id);
        Ok((product, state))
    }

    async fn sync_price(
        &mut self,
        mut price: Price,
        key: &str,
        existing: &mut Vec<RemotePrice>,
    ) -> SyncResult<(Price, OutcomeState)> {
        let product_id = self.resolve_product(&price)?;
        check_price(&price)?;

        let create = mapping::price_create_params(&price, key, &product_id, Utc::now());

        let Some(idx) = find_price(existing, key) else {
            let created = self.api.create_price(create).await?;
            info!("Created price: {} (ID: {})", price.name, created.id);
            existing.push(created.clone());
            price.id = Some(created.id.clone());
            return Ok((price, OutcomeState::Created { id: created.id }));
        };

        let current = existing[idx].clone();
        let differences = mapping::price_differences(&price, &current);

        if differences.is_empty() {
            debug!("Price {} unchanged, updating metadata only", current.id);
            let updated = self
                .api
                .update_price(
                    &current.id,
                    PriceUpdateParams {
                        active: Some(price.active),
                        metadata: Some(mapping::price_stamp(&price, key)),
                    },
                )
                .await?;
            info!("Updated price metadata: {} (ID: {})", price.name, updated.id);
            existing[idx] = updated.clone();
            price.id = Some(updated.id.clone());
            return Ok((price, OutcomeState::MetadataUpdated { id: updated.id }));
        }

        debug!(
            "Price {} differs in: {}",
            current.id,
            differences.join(", ")
        );
        let created = self.api.create_price(create).await?;

        let mut superseded = current.metadata.clone();
        superseded.insert(REPLACED_BY.to_string(), created.id.clone());
        let deactivated = self
            .api
            .update_price(
                &current.id,
                PriceUpdateParams {
                    active: Some(false),
                    metadata: Some(superseded),
                },
            )
            .await?;
        info!(
            "Replaced price: {} ({} -> {})",
            price.name, current.id, created.id
        );

        existing[idx] = deactivated;
        existing.push(created.clone());
        price.id = Some(created.id.clone());
        Ok((
            price,
            OutcomeState::VersionReplaced {
                id: created.id,
                previous_id: current.id,
            },
        ))
    }

    fn outcome(kind: EntityKind, key: &str, name: &str, state: OutcomeState) -> EntityOutcome {
        EntityOutcome {
            kind,
            provider: ProviderKind::Stripe,
            key: key.to_string(),
            name: name.to_string(),
            state,
        }
    }
}

#[async_trait]
impl CatalogProvider for StripeProvider {
    fn kind(&self) -> ProviderKind {
        ProviderKind::Stripe
    }

    async fn fetch_products(&mut self) -> SyncResult<Vec<Product>> {
        self.start_run();
        let remote = self.list_products(Some(true)).await?;
        info!("Fetched {} products from Stripe", remote.len());

        let products: Vec<Product> = remote
            .into_iter()
            .map(|rp| {
                let product = mapping::product_from_remote(rp);
                if let (Some(key), Some(id)) = (&product.key, &product.id) {
                    self.identity.record(key, id);
                }
                product
            })
            .collect();
        self.identity_fetched = true;
        Ok(products)
    }

    async fn fetch_prices(&mut self) -> SyncResult<Vec<Price>> {
        if !self.identity_fetched {
            self.fetch_products().await?;
        }
        let remote = self.list_prices(Some(true)).await?;
        info!("Fetched {} prices from Stripe", remote.len());

        Ok(remote
            .into_iter()
            .map(|rp| mapping::price_from_remote(rp, &self.identity))
            .collect())
    }

    async fn sync_products(&mut self, products: Vec<Product>) -> SyncResult<SyncBatch<Product>> {
        self.start_run();
        let targeted = products.iter().filter(|p| p.provider == self.kind()).count();
        if targeted == 0 {
            return Ok(SyncBatch::untouched(products));
        }

        info!("Syncing {} products to Stripe", targeted);
        let mut existing = self.list_products(None).await?;
        debug!("Found {} existing products in Stripe", existing.len());

        let mut items = Vec::with_capacity(products.len());
        let mut outcomes = Vec::with_capacity(targeted);

        for mut product in products {
            if product.provider != self.kind() {
                items.push(product);
                continue;
            }

            let key = product.ensure_key().to_string();
            product.clear_failure();
            let original = product.clone();

            let span = info_span!("product", txn = %Uuid::now_v7(), key = %key);
            let result = self
                .sync_product(product, &key, &mut existing)
                .instrument(span)
                .await;

            match result {
                Ok((synced, state)) => {
                    outcomes.push(Self::outcome(EntityKind::Product, &key, &synced.name, state));
                    items.push(synced);
                }
                Err(e) => {
                    error!("Failed to sync product {}: {}", original.name, e);
                    let mut failed = original;
                    failed.mark_failed(&e.to_string());
                    outcomes.push(Self::outcome(
                        EntityKind::Product,
                        &key,
                        &failed.name,
                        OutcomeState::Failed {
                            error: e.to_string(),
                        },
                    ));
                    items.push(failed);
                }
            }
        }

        self.settle(targeted).await;
        Ok(SyncBatch { items, outcomes })
    }

    async fn sync_prices(&mut self, prices: Vec<Price>) -> SyncResult<SyncBatch<Price>> {
        let targeted = prices.iter().filter(|p| p.provider == self.kind()).count();
        if targeted == 0 {
            return Ok(SyncBatch::untouched(prices));
        }

        info!("Syncing {} prices to Stripe", targeted);
        let mut existing = self.list_prices(None).await?;
        debug!("Found {} existing prices in Stripe", existing.len());

        let mut items = Vec::with_capacity(prices.len());
        let mut outcomes = Vec::with_capacity(targeted);

        for mut price in prices {
            if price.provider != self.kind() {
                items.push(price);
                continue;
            }

            let key = price.ensure_key().to_string();
            price.clear_failure();
            let original = price.clone();

            let span = info_span!("price", txn = %Uuid::now_v7(), key = %key);
            let result = self
                .sync_price(price, &key, &mut existing)
                .instrument(span)
                .await;

            match result {
                Ok((synced, state)) => {
                    outcomes.push(Self::outcome(EntityKind::Price, &key, &synced.name, state));
                    items.push(synced);
                }
                Err(e) => {
                    error!("Failed to sync price {}: {}", original.name, e);
                    let mut failed = original;
                    failed.mark_failed(&e.to_string());
                    outcomes.push(Self::outcome(
                        EntityKind::Price,
                        &key,
                        &failed.name,
                        OutcomeState::Failed {
                            error: e.to_string(),
                        },
                    ));
                    items.push(failed);
                }
            }
        }

        self.settle(targeted).await;
        Ok(SyncBatch { items, outcomes })
    }

    async fn plan(&mut self, config: &Config) -> SyncResult<Vec<PlannedChange>> {
        let mut changes = Vec::new();
        let change = |kind, key: &str, name: &str, action| PlannedChange {
            kind,
            provider: ProviderKind::Stripe,
            key: key.to_string(),
            name: name.to_string(),
            action,
        };

        // Keys of products this push would sync, mapped to their id or the
        // placeholder used before creation.
        let mut planned = IdentityMap::new();

        let products: Vec<&Product> = config
            .products
            .iter()
            .filter(|p| p.provider == ProviderKind::Stripe)
            .collect();
        if !products.is_empty() {
            let existing = self.list_products(None).await?;
            for product in products {
                let key = product.effective_key();
                let action = match find_product(&existing, &key) {
                    Some(idx) => PlanAction::Update {
                        id: existing[idx].id.clone(),
                    },
                    None => PlanAction::Create,
                };
                planned.record(&key, action_id(&action));
                changes.push(change(EntityKind::Product, &key, &product.name, action));
            }
        }

        let prices: Vec<&Price> = config
            .prices
            .iter()
            .filter(|p| p.provider == ProviderKind::Stripe)
            .collect();
        if !prices.is_empty() {
            let existing = self.list_prices(None).await?;
            for price in prices {
                // A price without a key gets a fresh one on push, so it can
                // never match.
                let key = price.key.clone().filter(|k| !k.is_empty());
                let display_key = key.clone().unwrap_or_else(|| "<generated>".to_string());

                let unresolved = match (&price.product_id, &price.product_key) {
                    (Some(id), _) if !id.is_empty() => None,
                    (_, Some(pk)) if planned.contains(pk) => None,
                    (_, Some(pk)) => Some(
                        SyncError::IdentityResolution {
                            key: pk.clone(),
                            available: planned.keys(),
                        }
                        .to_string(),
                    ),
                    _ => Some(
                        SyncError::MissingProductReference {
                            price: price.name.clone(),
                        }
                        .to_string(),
                    ),
                };
                let action = match (unresolved, check_price(price), key) {
                    (Some(reason), _, _) => PlanAction::Unresolved { reason },
                    (None, Err(e), _) => PlanAction::Unresolved {
                        reason: e.to_string(),
                    },
                    (None, Ok(()), None) => PlanAction::Create,
                    (None, Ok(()), Some(key)) => match find_price(&existing, &key) {
                        None => PlanAction::Create,
                        Some(idx) => {
                            let current = &existing[idx];
                            let differences = mapping::price_differences(price, current);
                            if differences.is_empty() {
                                PlanAction::UpdateMetadata {
                                    id: current.id.clone(),
                                }
                            } else {
                                PlanAction::Replace {
                                    id: current.id.clone(),
                                    differences: differences
                                        .into_iter()
                                        .map(String::from)
                                        .collect(),
                                }
                            }
                        }
                    },
                };
                changes.push(change(EntityKind::Price, &display_key, &price.name, action));
            }
        }

        Ok(changes)
    }
}

fn action_id(action: &PlanAction) -> String {
    match action {
        PlanAction::Update { id } | PlanAction::UpdateMetadata { id } => id.clone(),
        PlanAction::Replace { id, .. } => id.clone(),
        PlanAction::Create | PlanAction::Unresolved { .. } => "<new>".to_string(),
    }
}
