//! Stripe REST client.
//!
//! Uses the v1 API with form-encoded bodies and bearer authentication.

use super::api::{
    ListParams, Page, PriceCreateParams, PriceUpdateParams, ProductParams, RemotePrice,
    RemoteProduct, StripeApi,
};
use crate::error::{SyncError, SyncResult};
use crate::options::StripeOptions;
use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::debug;

/// Stripe error envelope: `{"error": {"type", "code", "message"}}`.
#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(rename = "type")]
    kind: Option<String>,
    code: Option<String>,
    message: Option<String>,
}

/// HTTP implementation of [`StripeApi`].
pub struct StripeClient {
    options: StripeOptions,
    client: Client,
}

impl StripeClient {
    pub fn new(options: StripeOptions) -> SyncResult<Self> {
        if options.secret_key.trim().is_empty() {
            return Err(SyncError::Configuration(
                "Stripe secret key is not set".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(options.timeout())
            .build()
            .map_err(|e| SyncError::Network(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { options, client })
    }

    fn url(&self, path: &str) -> String {
        format!(
            "{}/v1/{}",
            self.options.api_base_url.trim_end_matches('/'),
            path
        )
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        let request = request.bearer_auth(&self.options.secret_key);
        match &self.options.api_version {
            Some(version) => request.header("Stripe-Version", version),
            None => request,
        }
    }

    async fn get<T: DeserializeOwned>(&self, path: &str, params: &ListParams) -> SyncResult<T> {
        debug!("GET /v1/{} {:?}", path, params);
        let response = self
            .authorize(self.client.get(self.url(path)))
            .query(&params.to_query())
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("list {path} failed: {e}")))?;
        decode(response, path).await
    }

    async fn post<T: DeserializeOwned>(
        &self,
        path: &str,
        form: &[(String, String)],
    ) -> SyncResult<T> {
        debug!("POST /v1/{}", path);
        let response = self
            .authorize(self.client.post(self.url(path)))
            .form(form)
            .send()
            .await
            .map_err(|e| SyncError::Network(format!("request to {path} failed: {e}")))?;
        decode(response, path).await
    }
}

/// Decodes a success body, or maps Stripe's error envelope.
async fn decode<T: DeserializeOwned>(response: Response, path: &str) -> SyncResult<T> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(match serde_json::from_str::<ErrorEnvelope>(&body) {
            Ok(envelope) => SyncError::Provider {
                kind: envelope.error.kind.unwrap_or_else(|| "unknown_type".into()),
                code: envelope.error.code.unwrap_or_else(|| "unknown_code".into()),
                message: envelope
                    .error
                    .message
                    .unwrap_or_else(|| format!("HTTP {status}")),
            },
            Err(_) => SyncError::Network(format!("{path} failed with HTTP {status}: {body}")),
        });
    }

    response
        .json::<T>()
        .await
        .map_err(|e| SyncError::Network(format!("failed to parse {path} response: {e}")))
}

#[async_trait]
impl StripeApi for StripeClient {
    async fn list_products(&self, params: ListParams) -> SyncResult<Page<RemoteProduct>> {
        self.get("products", &params).await
    }

    async fn create_product(&self, params: ProductParams) -> SyncResult<RemoteProduct> {
        self.post("products", &params.to_form()).await
    }

    async fn update_product(&self, id: &str, params: ProductParams) -> SyncResult<RemoteProduct> {
        self.post(&format!("products/{id}"), &params.to_form()).await
    }

    async fn list_prices(&self, params: ListParams) -> SyncResult<Page<RemotePrice>> {
        self.get("prices", &params).await
    }

    async fn create_price(&self, params: PriceCreateParams) -> SyncResult<RemotePrice> {
        self.post("prices", &params.to_form()).await
    }

    async fn update_price(&self, id: &str, params: PriceUpdateParams) -> SyncResult<RemotePrice> {
        self.post(&format!("prices/{id}"), &params.to_form()).await
    }
}
