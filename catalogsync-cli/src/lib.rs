//! Command-line front end for catalogsync.
//!
//! Argument parsing, provider setup and report rendering live here so they
//! can be tested; `main.rs` only wires logging and the runtime.

use anyhow::{bail, Context, Result};
use catalogsync_store::{ConfigFormat, ConfigStore, FileConfigStore};
use catalogsync_sync::{
    build_providers, plan_providers, pull_from_providers, push, CatalogProvider, EntityKind,
    OutcomeState, ProviderOptions, PullOptions, StripeOptions, SyncOptions, SyncOutcome,
};
use catalogsync_types::ProviderKind;
use clap::{Args, Parser, Subcommand};
use std::fmt::Write as _;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable holding the Stripe secret key.
pub const STRIPE_KEY_VAR: &str = "STRIPE_SECRET_KEY";

#[derive(Parser, Debug)]
#[command(name = "catalogsync")]
#[command(about = "Sync declarative product catalogs with billing providers")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose debug logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Load environment variables from this file instead of `.env`
    #[arg(long, global = true, value_name = "FILE")]
    pub env: Option<PathBuf>,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Push a config file to the providers it declares
    Sync(SyncArgs),
    /// Pull provider catalogs into a config file
    Pull(PullArgs),
    /// Show what a sync would change, without writing
    Plan(PlanArgs),
    /// Validate a config file without contacting any provider
    Validate(ValidateArgs),
}

#[derive(Args, Debug)]
pub struct ProviderArgs {
    /// Providers to use
    #[arg(long = "provider", value_delimiter = ',', default_value = "stripe")]
    pub providers: Vec<ProviderKind>,

    /// Stripe secret key (defaults to $STRIPE_SECRET_KEY)
    #[arg(long, value_name = "KEY")]
    pub stripe_key: Option<String>,

    /// Override the Stripe API base URL
    #[arg(long, value_name = "URL")]
    pub stripe_api_base: Option<String>,
}

#[derive(Args, Debug)]
pub struct SyncArgs {
    /// Config file (.yml, .yaml, .json or .ts)
    pub config: PathBuf,

    /// Write ids and failure annotations back to the config file
    #[arg(short, long)]
    pub write_back: bool,

    /// Count metadata-only updates as config changes
    #[arg(long)]
    pub count_metadata_updates: bool,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

#[derive(Args, Debug)]
pub struct PullArgs {
    /// Where to write the pulled config
    pub output: PathBuf,

    /// Output format; the extension of `output` is adjusted to match
    #[arg(short, long, default_value = "yaml")]
    pub format: ConfigFormat,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

#[derive(Args, Debug)]
pub struct PlanArgs {
    pub config: PathBuf,

    #[command(flatten)]
    pub provider: ProviderArgs,
}

#[derive(Args, Debug)]
pub struct ValidateArgs {
    pub config: PathBuf,
}

/// Loads `path`, or `.env` in the working directory when none is given.
///
/// A missing default `.env` is not an error; a missing explicit file is.
pub fn load_env(path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => {
            dotenvy::from_path(path)
                .with_context(|| format!("failed to load environment from {}", path.display()))?;
            debug!("Loaded environment from {}", path.display());
        }
        None => {
            if let Ok(path) = dotenvy::dotenv() {
                debug!("Loaded environment from {}", path.display());
            }
        }
    }
    Ok(())
}

/// Builds provider options from flags, falling back to the environment.
pub fn provider_options(args: &ProviderArgs) -> Result<Vec<ProviderOptions>> {
    if args.providers.is_empty() {
        bail!("no providers selected");
    }

    let mut options = Vec::new();
    for kind in &args.providers {
        match kind {
            ProviderKind::Stripe => {
                let secret_key = match &args.stripe_key {
                    Some(key) => key.clone(),
                    None => std::env::var(STRIPE_KEY_VAR).with_context(|| {
                        format!("Stripe secret key not set: pass --stripe-key or set {STRIPE_KEY_VAR}")
                    })?,
                };
                let mut stripe = StripeOptions::new(secret_key);
                if let Some(base) = &args.stripe_api_base {
                    stripe.api_base_url = base.clone();
                }
                options.push(ProviderOptions::Stripe(stripe));
            }
        }
    }
    Ok(options)
}

fn providers(args: &ProviderArgs) -> Result<Vec<Box<dyn CatalogProvider>>> {
    Ok(build_providers(&provider_options(args)?)?)
}

/// Runs a parsed command, writing human-readable output to stdout.
pub async fn run(cli: Cli) -> Result<()> {
    load_env(cli.env.as_deref())?;
    let store = FileConfigStore::new();

    match cli.command {
        Command::Validate(args) => {
            let config = store
                .read(&args.config)
                .await
                .with_context(|| format!("invalid configuration: {}", args.config.display()))?;
            println!(
                "Configuration is valid: {} products, {} prices",
                config.products.len(),
                config.prices.len()
            );
        }

        Command::Sync(args) => {
            let mut providers = providers(&args.provider)?;
            let options = SyncOptions {
                write_back: args.write_back,
                count_metadata_updates: args.count_metadata_updates,
            };
            info!("Syncing {}", args.config.display());
            let outcome = push(&args.config, &mut providers, &store, &options)
                .await
                .context("sync failed")?;

            print!("{}", render_summary(&outcome));
            if outcome.config_updated && !args.write_back {
                println!("Run with --write-back to save ids to {}", args.config.display());
            }
            if outcome.report.has_failures() {
                warn!("Some entities failed to sync; they are listed above");
            }
        }

        Command::Pull(args) => {
            let mut providers = providers(&args.provider)?;
            let options = PullOptions {
                config_path: Some(args.output.clone()),
                format: args.format,
            };
            let outcome = pull_from_providers(&mut providers, &options, &store)
                .await
                .context("pull failed")?;
            println!(
                "Pulled {} products and {} prices into {}",
                outcome.config.products.len(),
                outcome.config.prices.len(),
                outcome
                    .config_path
                    .as_deref()
                    .unwrap_or(args.output.as_path())
                    .display()
            );
        }

        Command::Plan(args) => {
            let mut providers = providers(&args.provider)?;
            let config = store
                .read(&args.config)
                .await
                .with_context(|| format!("invalid configuration: {}", args.config.display()))?;
            let changes = plan_providers(&config, &mut providers)
                .await
                .context("plan failed")?;
            if changes.is_empty() {
                println!("Nothing to sync");
            }
            for change in changes {
                println!("{change}");
            }
        }
    }
    Ok(())
}

/// Renders a push report for the terminal.
pub fn render_summary(outcome: &SyncOutcome) -> String {
    let mut out = String::new();
    let report = &outcome.report;

    for kind in [EntityKind::Product, EntityKind::Price] {
        let mut created = 0;
        let mut updated = 0;
        let mut replaced = 0;
        let mut failed = 0;
        for o in report.outcomes.iter().filter(|o| o.kind == kind) {
            match o.state {
                OutcomeState::Created { .. } => created += 1,
                OutcomeState::Updated { .. } | OutcomeState::MetadataUpdated { .. } => {
                    updated += 1
                }
                OutcomeState::VersionReplaced { .. } => replaced += 1,
                OutcomeState::Failed { .. } => failed += 1,
            }
        }
        let label = match kind {
            EntityKind::Product => "Products",
            EntityKind::Price => "Prices",
        };
        let _ = write!(out, "{label:<9} {created} created, {updated} updated");
        if kind == EntityKind::Price {
            let _ = write!(out, ", {replaced} replaced");
        }
        let _ = writeln!(out, ", {failed} failed");
    }

    for o in report.failed() {
        if let OutcomeState::Failed { error } = &o.state {
            let _ = writeln!(out, "  ! {} '{}' ({}): {}", o.kind, o.name, o.key, error);
        }
    }

    let _ = writeln!(
        out,
        "Config {}",
        if outcome.config_updated {
            "updated"
        } else {
            "unchanged"
        }
    );
    out
}
