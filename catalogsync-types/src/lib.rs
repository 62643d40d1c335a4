//! Catalog entity model for catalogsync.
//!
//! This crate defines the declarative shape of a commerce catalog:
//! - [`Product`] and [`Price`]: declared entities, tagged with the provider
//!   they belong to
//! - [`MetadataValue`]: the typed value stored in an entity's metadata bag
//! - [`Config`]: the ordered product and price lists read from a config file
//! - [`validate`]: schema validation of raw input into a [`Config`]
//!
//! Nothing here performs I/O. Persistence lives in `catalogsync-store` and
//! reconciliation against a billing provider lives in `catalogsync-sync`.

mod config;
mod metadata;
mod price;
mod product;
mod provider;
mod validate;

pub use config::Config;
pub use metadata::{Metadata, MetadataValue, SYNC_ERROR_KEY, SYNC_FAILED_KEY};
pub use price::{
    AggregateUsage, BillingScheme, Interval, Price, PriceType, PriceViolation, Recurring,
    TaxBehavior, UsageType,
};
pub use product::{derive_key, Product};
pub use provider::ProviderKind;
pub use validate::{validate, ValidationError, ValidationIssue};
