//! Stripe wire types and the transport seam.

use crate::error::SyncResult;
use async_trait::async_trait;
use catalogsync_types::{AggregateUsage, BillingScheme, Interval, TaxBehavior, UsageType};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Stripe's maximum page size for list endpoints.
pub const PAGE_SIZE: u8 = 100;

/// Stripe metadata: string keys to string values.
pub type StripeMetadata = BTreeMap<String, String>;

/// The subset of the Stripe API the reconciler needs.
///
/// [`StripeClient`](super::StripeClient) implements it over HTTP; tests can
/// substitute an in-memory fake.
#[async_trait]
pub trait StripeApi: Send + Sync {
    async fn list_products(&self, params: ListParams) -> SyncResult<Page<RemoteProduct>>;
    async fn create_product(&self, params: ProductParams) -> SyncResult<RemoteProduct>;
    async fn update_product(&self, id: &str, params: ProductParams) -> SyncResult<RemoteProduct>;
    async fn list_prices(&self, params: ListParams) -> SyncResult<Page<RemotePrice>>;
    async fn create_price(&self, params: PriceCreateParams) -> SyncResult<RemotePrice>;
    async fn update_price(&self, id: &str, params: PriceUpdateParams) -> SyncResult<RemotePrice>;
}

/// Cursor-paginated list request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListParams {
    pub limit: u8,
    /// Id of the last object of the previous page.
    pub starting_after: Option<String>,
    /// `Some(true)` restricts the listing to active objects.
    pub active: Option<bool>,
}

impl ListParams {
    pub fn first_page(active: Option<bool>) -> Self {
        Self {
            limit: PAGE_SIZE,
            starting_after: None,
            active,
        }
    }

    pub(crate) fn to_query(&self) -> Vec<(&'static str, String)> {
        let mut query = vec![("limit", self.limit.to_string())];
        if let Some(cursor) = &self.starting_after {
            query.push(("starting_after", cursor.clone()));
        }
        if let Some(active) = self.active {
            query.push(("active", active.to_string()));
        }
        query
    }
}

/// One page of a list response.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Page<T> {
    pub data: Vec<T>,
    #[serde(default)]
    pub has_more: bool,
}

/// Anything listed by id, for cursor pagination.
pub trait Identified {
    fn id(&self) -> &str;
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteProduct {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub active: bool,
    /// Unix seconds.
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub metadata: StripeMetadata,
}

impl Identified for RemoteProduct {
    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemoteRecurring {
    pub interval: Interval,
    #[serde(default = "default_count")]
    pub interval_count: u32,
    #[serde(default)]
    pub trial_period_days: Option<u32>,
    #[serde(default)]
    pub usage_type: Option<UsageType>,
    #[serde(default)]
    pub aggregate_usage: Option<AggregateUsage>,
}

fn default_count() -> u32 {
    1
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RemotePrice {
    pub id: String,
    /// Owning product id.
    pub product: String,
    #[serde(default)]
    pub nickname: Option<String>,
    /// Absent for tiered prices.
    #[serde(default)]
    pub unit_amount: Option<u64>,
    pub currency: String,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub created: i64,
    #[serde(default)]
    pub recurring: Option<RemoteRecurring>,
    #[serde(default)]
    pub tax_behavior: Option<TaxBehavior>,
    #[serde(default)]
    pub billing_scheme: Option<BillingScheme>,
    #[serde(default)]
    pub metadata: StripeMetadata,
}

impl Identified for RemotePrice {
    fn id(&self) -> &str {
        &self.id
    }
}

/// Body for product create and update.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProductParams {
    pub name: String,
    pub description: Option<String>,
    pub metadata: StripeMetadata,
    pub active: Option<bool>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecurringParams {
    pub interval: Interval,
    pub interval_count: u32,
    pub trial_period_days: Option<u32>,
    pub usage_type: Option<UsageType>,
    pub aggregate_usage: Option<AggregateUsage>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceCreateParams {
    pub product: String,
    pub nickname: String,
    pub unit_amount: u64,
    /// Lower-case ISO code.
    pub currency: String,
    pub active: bool,
    pub recurring: Option<RecurringParams>,
    pub tax_behavior: Option<TaxBehavior>,
    pub billing_scheme: Option<BillingScheme>,
    pub metadata: StripeMetadata,
}

/// Prices are immutable on Stripe apart from these fields.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct PriceUpdateParams {
    pub active: Option<bool>,
    pub metadata: Option<StripeMetadata>,
}

/// Form-encoded body pairs, using Stripe's `parent[child]` nesting.
pub(crate) type Form = Vec<(String, String)>;

fn push(form: &mut Form, key: impl Into<String>, value: impl ToString) {
    form.push((key.into(), value.to_string()));
}

fn push_metadata(form: &mut Form, metadata: &StripeMetadata) {
    for (k, v) in metadata {
        push(form, format!("metadata[{k}]"), v);
    }
}

impl ProductParams {
    pub(crate) fn to_form(&self) -> Form {
        let mut form = Form::new();
        push(&mut form, "name", &self.name);
        if let Some(description) = &self.description {
            push(&mut form, "description", description);
        }
        if let Some(active) = self.active {
            push(&mut form, "active", active);
        }
        push_metadata(&mut form, &self.metadata);
        form
    }
}

impl PriceCreateParams {
    pub(crate) fn to_form(&self) -> Form {
        let mut form = Form::new();
        push(&mut form, "product", &self.product);
        push(&mut form, "nickname", &self.nickname);
        push(&mut form, "unit_amount", self.unit_amount);
        push(&mut form, "currency", &self.currency);
        push(&mut form, "active", self.active);
        if let Some(r) = &self.recurring {
            push(&mut form, "recurring[interval]", r.interval);
            push(&mut form, "recurring[interval_count]", r.interval_count);
            if let Some(days) = r.trial_period_days {
                push(&mut form, "recurring[trial_period_days]", days);
            }
            if let Some(usage) = r.usage_type {
                push(&mut form, "recurring[usage_type]", usage);
            }
            if let Some(aggregate) = r.aggregate_usage {
                push(&mut form, "recurring[aggregate_usage]", aggregate);
            }
        }
        if let Some(tax) = self.tax_behavior {
            push(&mut form, "tax_behavior", tax);
        }
        if let Some(scheme) = self.billing_scheme {
            push(&mut form, "billing_scheme", scheme);
        }
        push_metadata(&mut form, &self.metadata);
        form
    }
}

impl PriceUpdateParams {
    pub(crate) fn to_form(&self) -> Form {
        let mut form = Form::new();
        if let Some(active) = self.active {
            push(&mut form, "active", active);
        }
        if let Some(metadata) = &self.metadata {
            push_metadata(&mut form, metadata);
        }
        form
    }
}
