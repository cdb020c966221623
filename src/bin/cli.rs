//! hubsync CLI
//!
//! Local entry point for article sync and hub catalog refresh.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use hubsync::{
    error::Result,
    models::Config,
    pipeline,
    progress::{CancelToken, Progress},
    services::ArticleFetcher,
    storage::LocalStore,
};

/// hubsync - incremental article catalog sync
#[derive(Parser, Debug)]
#[command(name = "hubsync", version, about = "Incremental article sync and hub catalog engine")]
struct Cli {
    /// Path to storage directory containing config and catalog files
    #[arg(short, long, default_value = "storage")]
    storage_dir: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Sync articles from the configured hubs
    Sync {
        /// Hub ids to sync (default: configured hubs, else enabled catalog hubs)
        #[arg(long = "hub")]
        hubs: Vec<String>,
    },

    /// Refresh the hub catalog: discover, enrich, reconcile
    Refresh {
        /// Cap the number of hubs to discover (forces a safe merge)
        #[arg(long)]
        limit: Option<usize>,

        /// Skip the enrichment stage
        #[arg(long)]
        no_enrich: bool,
    },

    /// Validate configuration files
    Validate,

    /// Show current catalog info
    Info,
}

/// Initialize logging based on verbosity flag.
fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn progress_logger() -> Progress {
    Progress::new(|message, current, total| match (current, total) {
        (Some(current), Some(total)) => log::info!("[{current}/{total}] {message}"),
        _ => log::info!("{message}"),
    })
}

/// Main entry point for the CLI application.
#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    log::info!("hubsync starting...");

    let config_path = cli.storage_dir.join("config.toml");
    let mut config = Config::load_or_default(&config_path);
    let store = LocalStore::open(&cli.storage_dir).await?;

    match cli.command {
        Command::Sync { hubs } => {
            config.validate()?;

            let mut hub_ids = if hubs.is_empty() {
                pipeline::configured_hub_ids(&config)
            } else {
                hubs
            };
            if hub_ids.is_empty() {
                // Fall back to the enabled hubs of the stored catalog.
                hub_ids = store
                    .load_hubs()
                    .await?
                    .into_iter()
                    .filter(|hub| hub.enabled)
                    .map(|hub| hub.id)
                    .collect();
            }
            if hub_ids.is_empty() {
                log::error!("No hubs to sync. Configure [sync].hubs or run 'refresh' first.");
                return Err(hubsync::error::AppError::config("No hubs to sync"));
            }

            log::info!("Syncing {} hubs...", hub_ids.len());
            let fetcher = ArticleFetcher::new(&config)?;
            let report = pipeline::run_sync_for(
                &config,
                &hub_ids,
                &fetcher,
                &store,
                progress_logger(),
                CancelToken::new(),
            )
            .await;
            store.persist().await?;

            log::info!(
                "Sync complete: {} added, {} updated, {} errors",
                report.added.len(),
                report.updated.len(),
                report.error_count
            );
            for (link, changes) in &report.updated_fields {
                for (field, change) in changes {
                    log::debug!("{link}: {field}: {change}");
                }
            }
        }

        Command::Refresh { limit, no_enrich } => {
            config.validate()?;
            if limit.is_some() {
                config.discovery.limit = limit;
            }
            if no_enrich {
                config.enrich.enabled = false;
            }

            let previous = store.load_hubs().await?;
            log::info!(
                "Refreshing hub catalog ({} hubs known)...",
                previous.len()
            );

            let (hubs, stats) = pipeline::run_refresh(
                &config,
                &previous,
                progress_logger(),
                CancelToken::new(),
            )
            .await?;
            store.save_hubs(&hubs).await?;

            log::info!(
                "Catalog refreshed: {} added, {} updated, {} deleted ({} total)",
                stats.added,
                stats.updated,
                stats.deleted,
                hubs.len()
            );
        }

        Command::Validate => {
            log::info!("Validating configuration...");

            if let Err(e) = config.validate() {
                log::error!("Config validation failed: {}", e);
                return Err(e);
            }
            log::info!("All validations passed!");
        }

        Command::Info => {
            log::info!("Storage directory: {}", cli.storage_dir.display());
            log::info!("Stored articles: {}", store.article_count().await);

            let hubs = store.load_hubs().await?;
            let enabled = hubs.iter().filter(|hub| hub.enabled).count();
            log::info!("Hub catalog: {} hubs ({} enabled)", hubs.len(), enabled);

            if let Some(last) = hubs.iter().filter_map(|hub| hub.last_fetch_at).max() {
                log::info!("Last catalog refresh: {}", last.to_rfc3339());
            } else {
                log::info!("Hub catalog never refreshed.");
            }
        }
    }

    log::info!("Done!");

    Ok(())
}
