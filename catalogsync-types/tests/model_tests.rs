use catalogsync_types::{
    derive_key, Config, Interval, MetadataValue, Price, Product, ProviderKind, Recurring,
    SYNC_ERROR_KEY, SYNC_FAILED_KEY,
};
use proptest::prelude::*;
use std::str::FromStr;

// ── ProviderKind ────────────────────────────────────────────────

#[test]
fn provider_tag_parse_and_display() {
    assert_eq!(ProviderKind::from_str("stripe").unwrap(), ProviderKind::Stripe);
    assert_eq!(ProviderKind::Stripe.to_string(), "stripe");
    assert!(ProviderKind::from_str("Stripe").is_err());
}

#[test]
fn provider_serde_tag() {
    let json = serde_json::to_string(&ProviderKind::Stripe).unwrap();
    assert_eq!(json, "\"stripe\"");
}

// ── Config helpers ──────────────────────────────────────────────

#[test]
fn config_providers_deduplicated() {
    let config = Config::new(
        vec![
            Product::new(ProviderKind::Stripe, "A"),
            Product::new(ProviderKind::Stripe, "B"),
        ],
        vec![Price::one_time(ProviderKind::Stripe, "P", 100, "usd")],
    );
    assert_eq!(config.providers(), vec![ProviderKind::Stripe]);
    assert!(Config::default().providers().is_empty());
}

#[test]
fn failed_entities_are_counted() {
    let mut product = Product::new(ProviderKind::Stripe, "A");
    product.mark_failed("api_error/rate_limit: slow down");
    let config = Config::new(
        vec![product.clone(), Product::new(ProviderKind::Stripe, "B")],
        vec![],
    );
    assert_eq!(config.failed_count(), 1);
    assert_eq!(
        product.metadata.get(SYNC_FAILED_KEY),
        Some(&MetadataValue::from("true"))
    );
    assert!(product.metadata.contains_key(SYNC_ERROR_KEY));

    product.clear_failure();
    assert!(!product.is_failed());
}

// ── Serialization shape ─────────────────────────────────────────

#[test]
fn price_serializes_camel_case_with_type_field() {
    let price = Price::recurring(
        ProviderKind::Stripe,
        "Basic Monthly",
        999,
        "usd",
        Recurring::new(Interval::Month),
    )
    .with_product_key("basic");
    let value = serde_json::to_value(&price).unwrap();
    assert_eq!(value["type"], "recurring");
    assert_eq!(value["unitAmount"], 999);
    assert_eq!(value["productKey"], "basic");
    assert_eq!(value["recurring"]["intervalCount"], 1);
    // active defaults to true and is omitted
    assert!(value.get("active").is_none());
}

// ── Properties ──────────────────────────────────────────────────

proptest! {
    /// Derived keys never contain whitespace or uppercase letters.
    #[test]
    fn derived_key_is_normalized(name in "[A-Za-z0-9 \t]{0,40}") {
        let key = derive_key(&name);
        prop_assert!(!key.chars().any(char::is_whitespace));
        prop_assert!(!key.chars().any(|c| c.is_ascii_uppercase()));
        prop_assert!(!key.contains("__"));
    }

    /// Derivation is deterministic.
    #[test]
    fn derived_key_is_stable(name in "[A-Za-z ]{1,30}") {
        prop_assert_eq!(derive_key(&name), derive_key(&name));
    }

    /// Re-deriving a derived key changes nothing.
    #[test]
    fn derived_key_is_idempotent(name in "[A-Za-z0-9 ]{0,30}") {
        let once = derive_key(&name);
        prop_assert_eq!(derive_key(&once), once.clone());
    }
}
