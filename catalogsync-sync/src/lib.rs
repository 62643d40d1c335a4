//! Catalog reconciliation for catalogsync.
//!
//! This crate pushes declared products and prices to billing providers and
//! pulls remote catalogs back into declarative form:
//! - [`CatalogProvider`]: the per-provider reconciler contract
//! - [`IdentityMap`]: per-run product key to id resolution
//! - [`stripe`]: the Stripe transport and reconciler
//! - [`sync_providers`], [`push`], [`pull_from_providers`], [`plan_providers`]:
//!   orchestration across providers

pub mod error;
pub mod identity;
pub mod options;
pub mod orchestrator;
pub mod provider;
pub mod stripe;

pub use error::{SyncError, SyncResult};
pub use identity::IdentityMap;
pub use options::{ProviderOptions, PullOptions, StripeOptions, SyncOptions};
pub use orchestrator::{
    plan_providers, pull_from_providers, push, sync_providers, PullOutcome, SyncOutcome,
    SyncReport,
};
pub use provider::{
    build_providers, CatalogProvider, EntityKind, EntityOutcome, OutcomeState, PlanAction,
    PlannedChange, SyncBatch,
};
pub use stripe::{StripeClient, StripeProvider};
