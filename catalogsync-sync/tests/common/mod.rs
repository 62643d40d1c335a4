#![allow(dead_code)]

use async_trait::async_trait;
use catalogsync_sync::stripe::{
    Identified, ListParams, Page, PriceCreateParams, PriceUpdateParams, ProductParams,
    RemotePrice, RemoteProduct, RemoteRecurring, StripeApi,
};
use catalogsync_sync::{CatalogProvider, StripeProvider, SyncError, SyncResult};
use catalogsync_types::{BillingScheme, TaxBehavior, UsageType};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// A recorded API call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Call {
    ListProducts(ListParams),
    CreateProduct(String),
    UpdateProduct(String),
    ListPrices(ListParams),
    CreatePrice(String),
    UpdatePrice(String),
}

impl Call {
    pub fn is_write(&self) -> bool {
        !matches!(self, Call::ListProducts(_) | Call::ListPrices(_))
    }
}

#[derive(Default)]
struct State {
    products: Vec<RemoteProduct>,
    prices: Vec<RemotePrice>,
    clock: i64,
    calls: Vec<Call>,
    fail_names: HashSet<String>,
    fail_listing: bool,
}

/// In-memory Stripe account with Stripe-like paging and metadata merging.
pub struct FakeStripe {
    state: Mutex<State>,
    page_size: usize,
}

impl Default for FakeStripe {
    fn default() -> Self {
        Self {
            state: Mutex::new(State::default()),
            page_size: 100,
        }
    }
}

fn rejected(name: &str) -> SyncError {
    SyncError::Provider {
        kind: "invalid_request_error".into(),
        code: "parameter_invalid".into(),
        message: format!("rejected '{name}'"),
    }
}

fn missing(id: &str) -> SyncError {
    SyncError::Provider {
        kind: "invalid_request_error".into(),
        code: "resource_missing".into(),
        message: format!("No such object: '{id}'"),
    }
}

fn page<T: Identified + Clone>(
    items: &[T],
    params: &ListParams,
    page_size: usize,
    active: impl Fn(&T) -> bool,
) -> Page<T> {
    let visible: Vec<&T> = items
        .iter()
        .filter(|i| params.active.is_none_or(|want| active(i) == want))
        .collect();
    let start = match &params.starting_after {
        Some(cursor) => visible
            .iter()
            .position(|i| i.id() == cursor.as_str())
            .map_or(visible.len(), |p| p + 1),
        None => 0,
    };
    let size = page_size.min(params.limit as usize);
    let end = (start + size).min(visible.len());
    Page {
        data: visible[start..end].iter().map(|i| (*i).clone()).collect(),
        has_more: end < visible.len(),
    }
}

impl FakeStripe {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    pub fn with_page_size(page_size: usize) -> Arc<Self> {
        Arc::new(Self {
            page_size,
            ..Self::default()
        })
    }

    fn tick(state: &mut State) -> i64 {
        state.clock += 1;
        1_700_000_000 + state.clock
    }

    pub fn seed_product(&self, id: &str, name: &str, metadata: &[(&str, &str)]) {
        let mut state = self.state.lock().unwrap();
        let created = Self::tick(&mut state);
        state.products.push(RemoteProduct {
            id: id.into(),
            name: name.into(),
            description: None,
            active: true,
            created,
            metadata: metadata
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
        });
    }

    pub fn seed_price(&self, price: RemotePrice) {
        self.state.lock().unwrap().prices.push(price);
    }

    pub fn fail_on(&self, name: &str) {
        self.state.lock().unwrap().fail_names.insert(name.to_string());
    }

    pub fn fail_listing(&self) {
        self.state.lock().unwrap().fail_listing = true;
    }

    pub fn set_product_active(&self, id: &str, active: bool) {
        let mut state = self.state.lock().unwrap();
        if let Some(p) = state.products.iter_mut().find(|p| p.id == id) {
            p.active = active;
        }
    }

    pub fn products(&self) -> Vec<RemoteProduct> {
        self.state.lock().unwrap().products.clone()
    }

    pub fn prices(&self) -> Vec<RemotePrice> {
        self.state.lock().unwrap().prices.clone()
    }

    pub fn price(&self, id: &str) -> RemotePrice {
        self.prices()
            .into_iter()
            .find(|p| p.id == id)
            .unwrap_or_else(|| panic!("no price {id}"))
    }

    pub fn calls(&self) -> Vec<Call> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn writes(&self) -> Vec<Call> {
        self.calls().into_iter().filter(Call::is_write).collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().unwrap().calls.clear();
    }
}

#[async_trait]
impl StripeApi for FakeStripe {
    async fn list_products(&self, params: ListParams) -> SyncResult<Page<RemoteProduct>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListProducts(params.clone()));
        if state.fail_listing {
            return Err(SyncError::Network("connection reset".into()));
        }
        Ok(page(&state.products, &params, self.page_size, |p| p.active))
    }

    async fn create_product(&self, params: ProductParams) -> SyncResult<RemoteProduct> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreateProduct(params.name.clone()));
        if state.fail_names.contains(&params.name) {
            return Err(rejected(&params.name));
        }
        let created = Self::tick(&mut state);
        let product = RemoteProduct {
            id: format!("prod_{}", state.products.len() + 1),
            name: params.name,
            description: params.description,
            active: params.active.unwrap_or(true),
            created,
            metadata: params.metadata,
        };
        state.products.push(product.clone());
        Ok(product)
    }

    async fn update_product(&self, id: &str, params: ProductParams) -> SyncResult<RemoteProduct> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::UpdateProduct(id.to_string()));
        if state.fail_names.contains(&params.name) {
            return Err(rejected(&params.name));
        }
        let product = state
            .products
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| missing(id))?;
        product.name = params.name;
        product.description = params.description;
        if let Some(active) = params.active {
            product.active = active;
        }
        product.metadata.extend(params.metadata);
        Ok(product.clone())
    }

    async fn list_prices(&self, params: ListParams) -> SyncResult<Page<RemotePrice>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::ListPrices(params.clone()));
        if state.fail_listing {
            return Err(SyncError::Network("connection reset".into()));
        }
        Ok(page(&state.prices, &params, self.page_size, |p| p.active))
    }

    async fn create_price(&self, params: PriceCreateParams) -> SyncResult<RemotePrice> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(Call::CreatePrice(params.nickname.clone()));
        if state.fail_names.contains(&params.nickname) {
            return Err(rejected(&params.nickname));
        }
        if !state.products.iter().any(|p| p.id == params.product) {
            return Err(missing(&params.product));
        }
        let created = Self::tick(&mut state);
        let price = RemotePrice {
            id: format!("price_{}", state.prices.len() + 1),
            product: params.product,
            nickname: Some(params.nickname),
            unit_amount: Some(params.unit_amount),
            currency: params.currency,
            active: params.active,
            created,
            recurring: params.recurring.map(|r| RemoteRecurring {
                interval: r.interval,
                interval_count: r.interval_count,
                trial_period_days: r.trial_period_days,
                usage_type: Some(r.usage_type.unwrap_or(UsageType::Licensed)),
                aggregate_usage: r.aggregate_usage,
            }),
            tax_behavior: Some(params.tax_behavior.unwrap_or(TaxBehavior::Unspecified)),
            billing_scheme: Some(params.billing_scheme.unwrap_or(BillingScheme::PerUnit)),
            metadata: params.metadata,
        };
        state.prices.push(price.clone());
        Ok(price)
    }

    async fn update_price(&self, id: &str, params: PriceUpdateParams) -> SyncResult<RemotePrice> {
        let mut guard = self.state.lock().unwrap();
        let state = &mut *guard;
        state.calls.push(Call::UpdatePrice(id.to_string()));
        let price = state
            .prices
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| missing(id))?;
        if let Some(name) = price.nickname.as_deref() {
            if state.fail_names.contains(name) {
                return Err(rejected(name));
            }
        }
        if let Some(active) = params.active {
            price.active = active;
        }
        if let Some(metadata) = params.metadata {
            price.metadata.extend(metadata);
        }
        Ok(price.clone())
    }
}

/// A provider over `api` with no settle delay.
pub fn provider(api: &Arc<FakeStripe>) -> StripeProvider {
    StripeProvider::new(api.clone(), Duration::ZERO)
}

pub fn providers(api: &Arc<FakeStripe>) -> Vec<Box<dyn CatalogProvider>> {
    vec![Box::new(provider(api))]
}
