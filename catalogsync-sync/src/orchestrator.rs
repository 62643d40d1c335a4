//! Push and pull orchestration across providers.
//!
//! Providers run one after another. Products go before prices for each
//! provider, so a price's product key resolves against the products synced
//! earlier in the same run.

use crate::error::{SyncError, SyncResult};
use crate::options::{PullOptions, SyncOptions};
use crate::provider::{CatalogProvider, EntityKind, EntityOutcome, OutcomeState, PlannedChange};
use catalogsync_store::{with_format_extension, ConfigStore};
use catalogsync_types::{validate, Config};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Result of a push.
#[derive(Debug, Clone, PartialEq)]
pub struct SyncOutcome {
    /// The input config with ids filled in and failures annotated, in the
    /// declared order.
    pub config: Config,
    /// Whether `config` differs from the input.
    pub config_updated: bool,
    pub report: SyncReport,
}

/// Per-entity outcomes of a push, in processing order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SyncReport {
    pub outcomes: Vec<EntityOutcome>,
}

impl SyncReport {
    pub fn created(&self) -> impl Iterator<Item = &EntityOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.state, OutcomeState::Created { .. }))
    }

    pub fn replaced(&self) -> impl Iterator<Item = &EntityOutcome> {
        self.outcomes
            .iter()
            .filter(|o| matches!(o.state, OutcomeState::VersionReplaced { .. }))
    }

    pub fn failed(&self) -> impl Iterator<Item = &EntityOutcome> {
        self.outcomes.iter().filter(|o| o.state.is_failed())
    }

    pub fn count(&self, kind: EntityKind) -> usize {
        self.outcomes.iter().filter(|o| o.kind == kind).count()
    }

    pub fn has_failures(&self) -> bool {
        self.failed().next().is_some()
    }

    fn has_in_place_updates(&self) -> bool {
        self.outcomes.iter().any(|o| {
            matches!(
                o.state,
                OutcomeState::Updated { .. } | OutcomeState::MetadataUpdated { .. }
            )
        })
    }
}

/// Result of a pull.
#[derive(Debug, Clone, PartialEq)]
pub struct PullOutcome {
    pub config: Config,
    /// Where the config was written, if it was.
    pub config_path: Option<PathBuf>,
}

fn require_providers(providers: &[Box<dyn CatalogProvider>]) -> SyncResult<()> {
    if providers.is_empty() {
        return Err(SyncError::Configuration(
            "no providers configured".to_string(),
        ));
    }
    Ok(())
}

/// Pushes `config` through every provider.
///
/// Each provider only touches entities tagged with its kind. Per-entity
/// failures are annotated on the returned config; a provider that cannot
/// list its catalog aborts the run and `config` is left as it was.
pub async fn sync_providers(
    config: &Config,
    providers: &mut [Box<dyn CatalogProvider>],
    options: &SyncOptions,
) -> SyncResult<SyncOutcome> {
    require_providers(providers)?;
    info!(
        "Syncing {} products and {} prices across {} provider(s)",
        config.products.len(),
        config.prices.len(),
        providers.len()
    );

    let mut products = config.products.clone();
    let mut prices = config.prices.clone();
    let mut report = SyncReport::default();

    for provider in providers.iter_mut() {
        debug!("Syncing provider {}", provider.kind());
        let batch = provider.sync_products(products).await?;
        products = batch.items;
        report.outcomes.extend(batch.outcomes);

        let batch = provider.sync_prices(prices).await?;
        prices = batch.items;
        report.outcomes.extend(batch.outcomes);
    }

    let synced = Config::new(products, prices);
    let mut config_updated = serde_json::to_value(config)? != serde_json::to_value(&synced)?;
    if options.count_metadata_updates && report.has_in_place_updates() {
        config_updated = true;
    }

    let failed = report.failed().count();
    if failed > 0 {
        warn!("{} entities failed to sync", failed);
    }
    info!(
        "Sync complete: {} outcomes, config {}",
        report.outcomes.len(),
        if config_updated { "updated" } else { "unchanged" }
    );

    Ok(SyncOutcome {
        config: synced,
        config_updated,
        report,
    })
}

/// Reads `config_path`, pushes it, and writes the result back when it
/// changed and `options.write_back` is set.
pub async fn push(
    config_path: &Path,
    providers: &mut [Box<dyn CatalogProvider>],
    store: &dyn ConfigStore,
    options: &SyncOptions,
) -> SyncResult<SyncOutcome> {
    let config = store.read(config_path).await?;
    let outcome = sync_providers(&config, providers, options).await?;

    if outcome.config_updated && options.write_back {
        store.write(config_path, &outcome.config).await?;
        info!("Wrote updated configuration to {}", config_path.display());
    }
    Ok(outcome)
}

/// Pulls every provider's active catalog into one config.
///
/// The result is validated before it is returned, and persisted when
/// `options.config_path` is set.
pub async fn pull_from_providers(
    providers: &mut [Box<dyn CatalogProvider>],
    options: &PullOptions,
    store: &dyn ConfigStore,
) -> SyncResult<PullOutcome> {
    require_providers(providers)?;

    let mut products = Vec::new();
    let mut prices = Vec::new();
    for provider in providers.iter_mut() {
        info!("Pulling from {}", provider.kind());
        products.extend(provider.fetch_products().await?);
        prices.extend(provider.fetch_prices().await?);
    }

    let config = validate(&serde_json::to_value(Config::new(products, prices))?)?;
    info!(
        "Pulled {} products and {} prices",
        config.products.len(),
        config.prices.len()
    );

    let config_path = match &options.config_path {
        Some(path) => {
            let path = with_format_extension(path, options.format);
            store.write(&path, &config).await?;
            Some(path)
        }
        None => None,
    };

    Ok(PullOutcome {
        config,
        config_path,
    })
}

/// Collects every provider's plan for `config`.
pub async fn plan_providers(
    config: &Config,
    providers: &mut [Box<dyn CatalogProvider>],
) -> SyncResult<Vec<PlannedChange>> {
    require_providers(providers)?;
    let mut changes = Vec::new();
    for provider in providers.iter_mut() {
        changes.extend(provider.plan(config).await?);
    }
    Ok(changes)
}
