// src/pipeline/refresh.rs

//! Hub catalog refresh pipeline: discover, enrich, reconcile.

use std::sync::Arc;

use chrono::Utc;

use crate::error::Result;
use crate::models::{Config, Hub, ReconcileStats};
use crate::pipeline::reconcile::{full_merge, safe_merge};
use crate::progress::{CancelToken, Progress};
use crate::services::{HubDetailFetcher, HubDetailSource, HubDiscovery, HubEnricher};
use crate::utils::http::create_async_client;

/// Whether a merge may delete catalog entries.
///
/// Only a discovery that ran without a limit and covered the whole index is
/// allowed to; anything partial takes the safe policy so a transient
/// failure can never shrink the catalog.
pub fn is_full_refresh(limit: Option<usize>, complete: bool) -> bool {
    limit.is_none() && complete
}

/// Refresh the hub catalog against the remote index.
///
/// Returns the merged catalog and the merge stats. A cancelled refresh
/// returns the previous catalog untouched with zero stats.
pub async fn run_refresh(
    config: &Config,
    previous: &[Hub],
    progress: Progress,
    cancel: CancelToken,
) -> Result<(Vec<Hub>, ReconcileStats)> {
    let client = create_async_client(&config.source.user_agent, config.source.timeout_secs)?;

    let discovery = HubDiscovery::new(
        &client,
        &config.source,
        &config.selectors.hub_index,
        config.discovery.limit,
    )
    .with_progress(progress.clone())
    .with_cancel(cancel.clone());

    let outcome = discovery.fetch_all().await;
    if cancel.is_cancelled() {
        return Ok((previous.to_vec(), ReconcileStats::default()));
    }

    let mut fresh = outcome.hubs;
    if config.enrich.enabled && !fresh.is_empty() {
        progress.emit("Starting hub enrichment...");
        let details: Arc<dyn HubDetailSource> = Arc::new(HubDetailFetcher::new(config)?);
        fresh = HubEnricher::new(config.enrich.concurrency)
            .with_progress(progress.clone())
            .with_cancel(cancel.clone())
            .enrich(fresh, details)
            .await;
    }
    if cancel.is_cancelled() {
        return Ok((previous.to_vec(), ReconcileStats::default()));
    }

    progress.emit("Merging hubs with existing list...");
    let now = Utc::now();
    let (merged, stats) = if is_full_refresh(config.discovery.limit, outcome.complete) {
        full_merge(previous, &fresh, now)
    } else {
        safe_merge(previous, &fresh, now)
    };

    progress.emit(&format!(
        "Merge complete. Added: {}, Updated: {}, Deleted: {}.",
        stats.added, stats.updated, stats.deleted
    ));

    Ok((merged, stats))
}
