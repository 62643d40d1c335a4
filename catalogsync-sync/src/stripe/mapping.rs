//! Conversions between declared entities and Stripe objects.

use super::api::{
    PriceCreateParams, ProductParams, RecurringParams, RemotePrice, RemoteProduct, StripeMetadata,
};
use crate::identity::IdentityMap;
use catalogsync_types::{
    derive_key, Metadata, MetadataValue, Price, PriceType, Product, ProviderKind, Recurring,
};
use chrono::{DateTime, Utc};

/// Stable identity stamp on products and prices.
pub const KEY: &str = "key";
/// JSON-encoded feature list on products.
pub const FEATURES: &str = "features";
/// `"true"`/`"false"` highlight flag on products.
pub const HIGHLIGHT: &str = "highlight";
/// Declared name of a price; Stripe prices have no name field.
pub const ORIGINAL_NAME: &str = "original_name";
/// Creation time of a price version (RFC 3339).
pub const CREATED_AT: &str = "created_at";
/// Id of the price version that superseded this one.
pub const REPLACED_BY: &str = "replaced_by";
/// Remote creation timestamp, exposed on fetch and never pushed.
pub const STRIPE_CREATED: &str = "stripeCreated";

const PRODUCT_RESERVED: &[&str] = &[KEY, FEATURES, HIGHLIGHT];
const PRICE_RESERVED: &[&str] = &[KEY, ORIGINAL_NAME];

/// Renders user metadata as Stripe string values.
fn stamp(metadata: &Metadata) -> StripeMetadata {
    metadata
        .iter()
        .filter(|(k, _)| k.as_str() != STRIPE_CREATED)
        .map(|(k, v)| (k.clone(), v.to_stamp()))
        .collect()
}

/// Strips reserved stamps and exposes the creation time.
fn unstamp(metadata: &StripeMetadata, reserved: &[&str], created: i64) -> Metadata {
    let mut out: Metadata = metadata
        .iter()
        .filter(|(k, _)| !reserved.contains(&k.as_str()))
        .map(|(k, v)| (k.clone(), MetadataValue::from(v.as_str())))
        .collect();
    out.insert(STRIPE_CREATED.to_string(), MetadataValue::from(created.to_string()));
    out
}

/// Product body, stamped with key, features and highlight.
pub fn product_params(product: &Product, key: &str) -> ProductParams {
    let mut metadata = stamp(&product.metadata);
    metadata.insert(KEY.to_string(), key.to_string());
    metadata.insert(
        FEATURES.to_string(),
        serde_json::to_string(&product.features).unwrap_or_else(|_| "[]".to_string()),
    );
    metadata.insert(HIGHLIGHT.to_string(), product.highlight.to_string());

    ProductParams {
        name: product.name.clone(),
        description: product.description.clone(),
        metadata,
        active: None,
    }
}

/// Metadata written to an existing price: user metadata plus the key.
pub fn price_stamp(price: &Price, key: &str) -> StripeMetadata {
    let mut metadata = stamp(&price.metadata);
    metadata.insert(KEY.to_string(), key.to_string());
    metadata
}

/// The recurring block that takes effect; a one-time price ignores any
/// block it declares.
pub fn effective_recurring(price: &Price) -> Option<&Recurring> {
    match price.price_type {
        PriceType::Recurring => price.recurring.as_ref(),
        PriceType::OneTime => None,
    }
}

/// Body for a new price version.
pub fn price_create_params(
    price: &Price,
    key: &str,
    product_id: &str,
    now: DateTime<Utc>,
) -> PriceCreateParams {
    let mut metadata = price_stamp(price, key);
    metadata.insert(ORIGINAL_NAME.to_string(), price.name.clone());
    metadata.insert(CREATED_AT.to_string(), now.to_rfc3339());

    PriceCreateParams {
        product: product_id.to_string(),
        nickname: price.display_nickname().to_string(),
        unit_amount: price.unit_amount,
        currency: price.currency.to_lowercase(),
        active: price.active,
        recurring: effective_recurring(price).map(|r| RecurringParams {
            interval: r.interval,
            interval_count: r.interval_count,
            trial_period_days: r.trial_period_days,
            usage_type: r.usage_type,
            aggregate_usage: r.aggregate_usage,
        }),
        tax_behavior: price.tax_behavior,
        billing_scheme: price.billing_scheme,
        metadata,
    }
}

/// Names of the immutable attributes on which `remote` differs from the
/// declared price. Empty means the remote version can be kept.
///
/// Recurring attributes are only compared for recurring prices, and
/// optional attributes only when declared.
pub fn price_differences(declared: &Price, remote: &RemotePrice) -> Vec<&'static str> {
    let mut diffs = Vec::new();

    if remote.unit_amount != Some(declared.unit_amount) {
        diffs.push("unit_amount");
    }
    if !remote.currency.eq_ignore_ascii_case(&declared.currency) {
        diffs.push("currency");
    }

    if let Some(want) = effective_recurring(declared) {
        match &remote.recurring {
            None => diffs.push("recurring"),
            Some(have) => {
                if have.interval != want.interval {
                    diffs.push("interval");
                }
                if have.interval_count != want.interval_count {
                    diffs.push("interval_count");
                }
                if want.trial_period_days.is_some()
                    && have.trial_period_days != want.trial_period_days
                {
                    diffs.push("trial_period_days");
                }
                if want.usage_type.is_some() && have.usage_type != want.usage_type {
                    diffs.push("usage_type");
                }
                if want.aggregate_usage.is_some() && have.aggregate_usage != want.aggregate_usage {
                    diffs.push("aggregate_usage");
                }
            }
        }
    }

    if declared.billing_scheme.is_some() && remote.billing_scheme != declared.billing_scheme {
        diffs.push("billing_scheme");
    }
    if declared.tax_behavior.is_some() && remote.tax_behavior != declared.tax_behavior {
        diffs.push("tax_behavior");
    }
    diffs
}

/// Converts a listed product into a declared one.
///
/// The key falls back to one derived from the name for products created
/// outside catalogsync.
pub fn product_from_remote(remote: RemoteProduct) -> Product {
    let key = remote
        .metadata
        .get(KEY)
        .filter(|k| !k.is_empty())
        .cloned()
        .unwrap_or_else(|| derive_key(&remote.name));

    let parsed_features = remote
        .metadata
        .get(FEATURES)
        .and_then(|raw| serde_json::from_str::<Vec<String>>(raw).ok());
    let highlight = remote.metadata.get(HIGHLIGHT).is_some_and(|v| v == "true");

    let mut metadata = unstamp(&remote.metadata, PRODUCT_RESERVED, remote.created);
    // An unparseable feature stamp is kept as plain metadata.
    if parsed_features.is_none() {
        if let Some(raw) = remote.metadata.get(FEATURES) {
            metadata.insert(FEATURES.to_string(), MetadataValue::from(raw.as_str()));
        }
    }

    Product {
        provider: ProviderKind::Stripe,
        key: Some(key),
        name: remote.name,
        description: remote.description.filter(|d| !d.is_empty()),
        features: parsed_features.unwrap_or_default(),
        highlight,
        metadata,
        id: Some(remote.id),
    }
}

/// Converts a listed price into a declared one, resolving the owning
/// product's key through `identity`.
pub fn price_from_remote(remote: RemotePrice, identity: &IdentityMap) -> Price {
    let name = remote
        .metadata
        .get(ORIGINAL_NAME)
        .cloned()
        .or_else(|| remote.nickname.clone())
        .unwrap_or_else(|| remote.id.clone());

    let recurring = remote.recurring.map(|r| Recurring {
        interval: r.interval,
        interval_count: r.interval_count,
        trial_period_days: r.trial_period_days,
        usage_type: r.usage_type,
        aggregate_usage: r.aggregate_usage,
    });

    Price {
        provider: ProviderKind::Stripe,
        key: remote.metadata.get(KEY).cloned(),
        name,
        nickname: remote.nickname,
        unit_amount: remote.unit_amount.unwrap_or_default(),
        currency: remote.currency.to_uppercase(),
        price_type: if recurring.is_some() {
            PriceType::Recurring
        } else {
            PriceType::OneTime
        },
        recurring,
        active: remote.active,
        product_key: identity.key_for(&remote.product).map(str::to_string),
        product_id: Some(remote.product),
        tax_behavior: remote.tax_behavior,
        billing_scheme: remote.billing_scheme,
        metadata: unstamp(&remote.metadata, PRICE_RESERVED, remote.created),
        id: Some(remote.id),
    }
}
