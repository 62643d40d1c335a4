use catalogsync_sync::stripe::{ListParams, PriceUpdateParams, ProductParams, StripeApi};
use catalogsync_sync::{
    CatalogProvider, StripeClient, StripeOptions, StripeProvider, SyncError, SyncOptions,
};
use catalogsync_types::{Interval, Price, Product, ProviderKind, Recurring};
use serde_json::json;
use wiremock::matchers::{
    body_string_contains, header, method, path, query_param, query_param_is_missing,
};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn mock_options(server: &MockServer) -> StripeOptions {
    StripeOptions {
        secret_key: "sk_test_123".to_string(),
        api_base_url: server.uri(),
        settle_delay_ms: 0,
        ..Default::default()
    }
}

fn product_json(id: &str, name: &str, key: &str) -> serde_json::Value {
    json!({
        "id": id,
        "object": "product",
        "name": name,
        "description": null,
        "active": true,
        "created": 1_700_000_000,
        "metadata": { "key": key, "features": "[]", "highlight": "false" }
    })
}

fn price_json(id: &str, product: &str, key: &str, amount: u64) -> serde_json::Value {
    json!({
        "id": id,
        "object": "price",
        "product": product,
        "nickname": "Basic Monthly",
        "unit_amount": amount,
        "currency": "usd",
        "active": true,
        "created": 1_700_000_100,
        "type": "recurring",
        "billing_scheme": "per_unit",
        "tax_behavior": "unspecified",
        "recurring": {
            "interval": "month",
            "interval_count": 1,
            "trial_period_days": null,
            "usage_type": "licensed",
            "aggregate_usage": null
        },
        "metadata": { "key": key, "original_name": "Basic Monthly" }
    })
}

// ── Options ─────────────────────────────────────────────────────

#[test]
fn stripe_options_default() {
    let options = StripeOptions::default();
    assert!(options.secret_key.is_empty());
    assert_eq!(options.api_base_url, "https://api.stripe.com");
    assert_eq!(options.timeout_secs, 60);
    assert_eq!(options.settle_delay_ms, 500);
    assert!(options.api_version.is_none());
}

#[test]
fn stripe_options_debug_redacts_secret() {
    let debug = format!("{:?}", StripeOptions::new("sk_live_secret"));
    assert!(debug.contains("api_base_url"));
    assert!(!debug.contains("sk_live_secret"));
}

#[test]
fn stripe_options_serde_defaults() {
    let options: StripeOptions = serde_json::from_str(r#"{"secret_key": "sk_test_1"}"#).unwrap();
    assert_eq!(options.secret_key, "sk_test_1");
    assert_eq!(options.api_base_url, "https://api.stripe.com");
    assert_eq!(options.settle_delay_ms, 500);
}

#[test]
fn provider_options_are_tagged() {
    let raw = json!({ "provider": "stripe", "options": { "secret_key": "sk_test_1" } });
    let options: catalogsync_sync::ProviderOptions = serde_json::from_value(raw).unwrap();
    assert_eq!(options.kind(), ProviderKind::Stripe);
}

#[test]
fn client_requires_secret_key() {
    let err = StripeClient::new(StripeOptions::default()).err().unwrap();
    assert!(matches!(err, SyncError::Configuration(_)));
}

// ── Requests ────────────────────────────────────────────────────

#[tokio::test]
async fn list_products_sends_auth_and_paging() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .and(header("authorization", "Bearer sk_test_123"))
        .and(query_param("limit", "100"))
        .and(query_param("active", "true"))
        .and(query_param("starting_after", "prod_9"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "object": "list",
            "data": [product_json("prod_10", "Basic Plan", "basic")],
            "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = StripeClient::new(mock_options(&server)).unwrap();
    let mut params = ListParams::first_page(Some(true));
    params.starting_after = Some("prod_9".into());
    let page = client.list_products(params).await.unwrap();

    assert_eq!(page.data.len(), 1);
    assert_eq!(page.data[0].id, "prod_10");
    assert_eq!(page.data[0].metadata["key"], "basic");
    assert!(!page.has_more);
}

#[tokio::test]
async fn api_version_header_is_sent_when_pinned() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/prices"))
        .and(header("stripe-version", "2024-06-20"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({ "data": [], "has_more": false })),
        )
        .expect(1)
        .mount(&server)
        .await;

    let options = StripeOptions {
        api_version: Some("2024-06-20".into()),
        ..mock_options(&server)
    };
    let page = StripeClient::new(options)
        .unwrap()
        .list_prices(ListParams::first_page(None))
        .await
        .unwrap();
    assert!(page.data.is_empty());
}

#[tokio::test]
async fn create_product_is_form_encoded() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/products"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("name=Basic+Plan"))
        .and(body_string_contains("metadata%5Bkey%5D=basic"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(product_json("prod_1", "Basic Plan", "basic")),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = StripeClient::new(mock_options(&server)).unwrap();
    let params = ProductParams {
        name: "Basic Plan".into(),
        metadata: [("key".to_string(), "basic".to_string())].into(),
        ..Default::default()
    };
    let product = client.create_product(params).await.unwrap();
    assert_eq!(product.id, "prod_1");
}

#[tokio::test]
async fn update_price_posts_to_object_path() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/prices/price_1"))
        .and(body_string_contains("active=false"))
        .and(body_string_contains("metadata%5Breplaced_by%5D=price_2"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(price_json("price_1", "prod_1", "basic", 999)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = StripeClient::new(mock_options(&server)).unwrap();
    let params = PriceUpdateParams {
        active: Some(false),
        metadata: Some([("replaced_by".to_string(), "price_2".to_string())].into()),
    };
    client.update_price("price_1", params).await.unwrap();
}

// ── Errors ──────────────────────────────────────────────────────

#[tokio::test]
async fn stripe_error_body_maps_to_provider_error() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/v1/prices"))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "error": {
                "type": "invalid_request_error",
                "code": "parameter_missing",
                "message": "Missing required param: currency."
            }
        })))
        .mount(&server)
        .await;

    let client = StripeClient::new(mock_options(&server)).unwrap();
    let api: &dyn StripeApi = &client;
    let err = api
        .create_price(catalogsync_sync::stripe::PriceCreateParams {
            product: "prod_1".into(),
            nickname: "Basic".into(),
            unit_amount: 100,
            currency: String::new(),
            active: true,
            recurring: None,
            tax_behavior: None,
            billing_scheme: None,
            metadata: Default::default(),
        })
        .await
        .unwrap_err();

    assert_eq!(
        err.to_string(),
        "invalid_request_error/parameter_missing: Missing required param: currency."
    );
}

#[tokio::test]
async fn error_without_code_uses_placeholders() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "error": { "message": "Invalid API Key provided" }
        })))
        .mount(&server)
        .await;

    let err = StripeClient::new(mock_options(&server))
        .unwrap()
        .list_products(ListParams::first_page(None))
        .await
        .unwrap_err();

    match err {
        SyncError::Provider { kind, code, message } => {
            assert_eq!(kind, "unknown_type");
            assert_eq!(code, "unknown_code");
            assert_eq!(message, "Invalid API Key provided");
        }
        other => panic!("expected provider error, got {other:?}"),
    }
}

#[tokio::test]
async fn non_json_failure_is_network_error() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .respond_with(ResponseTemplate::new(502).set_body_string("bad gateway"))
        .mount(&server)
        .await;

    let err = StripeClient::new(mock_options(&server))
        .unwrap()
        .list_products(ListParams::first_page(None))
        .await
        .unwrap_err();
    assert!(matches!(err, SyncError::Network(ref m) if m.contains("502")));
}

// ── Provider over HTTP ──────────────────────────────────────────

#[tokio::test]
async fn fetch_follows_cursor_across_pages() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .and(query_param_is_missing("starting_after"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [product_json("prod_a", "Basic Plan", "basic")],
            "has_more": true
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .and(query_param("starting_after", "prod_a"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [product_json("prod_b", "Pro Plan", "pro")],
            "has_more": false
        })))
        .expect(1)
        .mount(&server)
        .await;

    let mut provider = StripeProvider::from_options(&mock_options(&server)).unwrap();
    let products = provider.fetch_products().await.unwrap();

    let keys: Vec<_> = products.iter().filter_map(|p| p.key.as_deref()).collect();
    assert_eq!(keys, vec!["basic", "pro"]);
    assert_eq!(provider.identity().resolve("pro").unwrap(), "prod_b");
}

#[tokio::test]
async fn push_over_http_updates_matching_price_metadata() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/v1/products"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [product_json("prod_1", "Basic Plan", "basic")],
            "has_more": false
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/products/prod_1"))
        .and(body_string_contains("active=true"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(product_json("prod_1", "Basic Plan", "basic")),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/v1/prices"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [price_json("price_1", "prod_1", "basic_monthly", 999)],
            "has_more": false
        })))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/prices/price_1"))
        .and(body_string_contains("metadata%5Bkey%5D=basic_monthly"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(price_json("price_1", "prod_1", "basic_monthly", 999)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/v1/prices"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let config = catalogsync_types::Config::new(
        vec![Product::new(ProviderKind::Stripe, "Basic Plan").with_key("basic")],
        vec![
            Price::recurring(
                ProviderKind::Stripe,
                "Basic Monthly",
                999,
                "usd",
                Recurring::new(Interval::Month),
            )
            .with_key("basic_monthly")
            .with_product_key("basic"),
        ],
    );
    let mut providers: Vec<Box<dyn CatalogProvider>> =
        vec![Box::new(StripeProvider::from_options(&mock_options(&server)).unwrap())];

    let outcome = catalogsync_sync::sync_providers(&config, &mut providers, &SyncOptions::default())
        .await
        .unwrap();

    assert_eq!(outcome.config.products[0].id.as_deref(), Some("prod_1"));
    assert_eq!(outcome.config.prices[0].id.as_deref(), Some("price_1"));
    assert!(outcome.config_updated);
}
