//! Stripe provider.

mod api;
mod client;
mod mapping;
mod reconciler;

pub use api::{
    Identified, ListParams, Page, PriceCreateParams, PriceUpdateParams, ProductParams,
    RecurringParams, RemotePrice, RemoteProduct, RemoteRecurring, StripeApi, StripeMetadata,
    PAGE_SIZE,
};
pub use client::StripeClient;
pub use mapping::{
    price_differences, CREATED_AT, FEATURES, HIGHLIGHT, KEY, ORIGINAL_NAME, REPLACED_BY,
    STRIPE_CREATED,
};
pub use reconciler::StripeProvider;
