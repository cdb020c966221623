// src/pipeline/sync.rs

//! Article sync pipeline entry point.

use crate::models::{Config, SyncReport};
use crate::progress::{CancelToken, Progress};
use crate::services::{PageSource, SyncEngine};
use crate::storage::ArticleStore;

/// Resolve the hub list from configuration and run the sync engine.
///
/// Config entries without an id are skipped before any fetch. All failures
/// end up in the report's `error_count`; this never returns an error.
pub async fn run_sync(
    config: &Config,
    pages: &dyn PageSource,
    store: &dyn ArticleStore,
    progress: Progress,
    cancel: CancelToken,
) -> SyncReport {
    let hub_ids = configured_hub_ids(config);
    run_sync_for(config, &hub_ids, pages, store, progress, cancel).await
}

/// Run the sync engine over an explicit hub list.
pub async fn run_sync_for(
    config: &Config,
    hub_ids: &[String],
    pages: &dyn PageSource,
    store: &dyn ArticleStore,
    progress: Progress,
    cancel: CancelToken,
) -> SyncReport {
    SyncEngine::new(config, pages, store)
        .with_progress(progress)
        .with_cancel(cancel)
        .run(hub_ids)
        .await
}

/// Hub ids from configuration, skipping entries without an id.
pub fn configured_hub_ids(config: &Config) -> Vec<String> {
    config
        .sync
        .hubs
        .iter()
        .filter_map(|entry| match entry.id() {
            Some(id) => Some(id.to_string()),
            None => {
                log::warn!("Skipping sync hub entry without an id");
                None
            }
        })
        .collect()
}
