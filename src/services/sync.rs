// src/services/sync.rs

//! Incremental article sync engine.
//!
//! Crawls each configured hub page by page (the source yields newest first),
//! upserting through the storage trait and stopping once the crawl has both
//! reached already-known territory and confirmed no gap of new items exists
//! above the cutoff.

use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Config, SyncReport};
use crate::pipeline::diff::diff_articles;
use crate::progress::{CancelToken, Progress};
use crate::services::PageSource;
use crate::storage::ArticleStore;

/// What to do with one listed item, as decided by the scan state.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemAction {
    /// Item is inside the window; look it up and upsert.
    Process,
    /// Item is below the cutoff but the boundary is not confirmed yet;
    /// skip it and keep scanning.
    Skip,
    /// Boundary confirmed; terminate the hub crawl without processing
    /// this or any remaining item.
    Stop,
}

/// Stop-condition state machine for one hub crawl.
///
/// The crawl terminates at a below-cutoff item only when an existing item
/// has already been seen and no new item was found after it. Until then,
/// below-cutoff items are skipped, so out-of-order or backfilled items
/// cannot end the crawl early.
#[derive(Debug, Default)]
pub struct ScanState {
    seen_existing: bool,
    found_new_inside_window: bool,
    stopped: bool,
}

impl ScanState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Decide the action for an item with the given publication time.
    pub fn observe(
        &mut self,
        cutoff: Option<DateTime<Utc>>,
        published_at: DateTime<Utc>,
    ) -> ItemAction {
        match cutoff {
            Some(cutoff) if published_at < cutoff => {
                if self.seen_existing && !self.found_new_inside_window {
                    self.stopped = true;
                    ItemAction::Stop
                } else {
                    ItemAction::Skip
                }
            }
            _ => ItemAction::Process,
        }
    }

    /// Record that an unseen item was inserted.
    pub fn record_new(&mut self) {
        if self.seen_existing {
            self.found_new_inside_window = true;
        }
    }

    /// Record that an already-stored item was encountered.
    pub fn record_existing(&mut self) {
        self.seen_existing = true;
    }

    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

/// Engine driving the per-hub crawl over a [`PageSource`] and an
/// [`ArticleStore`].
pub struct SyncEngine<'a> {
    config: &'a Config,
    pages: &'a dyn PageSource,
    store: &'a dyn ArticleStore,
    progress: Progress,
    cancel: CancelToken,
}

impl<'a> SyncEngine<'a> {
    pub fn new(config: &'a Config, pages: &'a dyn PageSource, store: &'a dyn ArticleStore) -> Self {
        Self {
            config,
            pages,
            store,
            progress: Progress::none(),
            cancel: CancelToken::new(),
        }
    }

    pub fn with_progress(mut self, progress: Progress) -> Self {
        self.progress = progress;
        self
    }

    pub fn with_cancel(mut self, cancel: CancelToken) -> Self {
        self.cancel = cancel;
        self
    }

    /// Run the sync across the given hubs.
    ///
    /// Never fails past this entry point: per-hub errors are captured in
    /// the report's `error_count` and the remaining hubs still run.
    pub async fn run(&self, hub_ids: &[String]) -> SyncReport {
        let mut report = SyncReport::default();
        let cutoff = self.effective_cutoff(&mut report).await;

        for hub_id in hub_ids {
            if self.cancel.is_cancelled() {
                self.progress.emit("Cancelled by user.");
                break;
            }
            self.progress.emit(&format!("Processing hub '{hub_id}'..."));
            self.sync_hub(hub_id, cutoff, &mut report).await;
        }

        report
    }

    /// Resolve the cutoff for this run.
    ///
    /// On an empty store the configured cutoff bounds the initial crawl
    /// as-is. Once the store has articles, the freshness window (when
    /// configured) raises the floor to `now - window_days`, so already-seen
    /// items older than the window are no longer re-enriched.
    async fn effective_cutoff(&self, report: &mut SyncReport) -> Option<DateTime<Utc>> {
        let configured = self.config.sync.cutoff();

        let last = match self.store.last_published_at().await {
            Ok(last) => last,
            Err(e) => {
                log::warn!("Failed to read last article date: {e}");
                report.error_count += 1;
                return configured;
            }
        };

        match (last, self.config.sync.window_days) {
            (Some(_), Some(days)) => {
                let floor = Utc::now() - chrono::Duration::days(i64::from(days));
                Some(configured.map_or(floor, |c| c.max(floor)))
            }
            _ => configured,
        }
    }

    /// Crawl one hub to its boundary, writing through to storage.
    async fn sync_hub(
        &self,
        hub_id: &str,
        cutoff: Option<DateTime<Utc>>,
        report: &mut SyncReport,
    ) {
        let delay = Duration::from_millis(self.config.source.request_delay_ms);
        let mut state = ScanState::new();
        let mut page = 1u32;

        loop {
            if self.cancel.is_cancelled() {
                self.progress.emit("Cancelled by user.");
                return;
            }

            self.progress
                .emit(&format!("Hub '{hub_id}': scanning page {page}..."));

            let items = match self.pages.fetch_page(hub_id, page).await {
                Ok(items) => items,
                Err(e) => {
                    log::warn!("Failed to fetch page {page} of hub '{hub_id}': {e}");
                    report.error_count += 1;
                    return;
                }
            };

            if items.is_empty() {
                // Listing exhausted.
                return;
            }

            for item in items {
                match state.observe(cutoff, item.published_at) {
                    ItemAction::Stop => return,
                    ItemAction::Skip => continue,
                    ItemAction::Process => {}
                }

                if let Err(e) = self.upsert(hub_id, item, &mut state, report).await {
                    log::warn!("Storage failure on hub '{hub_id}': {e}");
                    report.error_count += 1;
                    return;
                }
            }

            page += 1;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }
    }

    async fn upsert(
        &self,
        hub_id: &str,
        item: crate::models::Article,
        state: &mut ScanState,
        report: &mut SyncReport,
    ) -> Result<()> {
        match self.store.article_by_guid(&item.guid).await? {
            None => {
                self.store.add_article(&item).await?;
                report.added.push(item.link.clone());
                state.record_new();
            }
            Some(existing) => {
                state.record_existing();

                let (updates, changes) = diff_articles(&existing, &item);
                if !updates.is_empty() {
                    if !self.store.update_article(&existing.guid, &updates).await? {
                        log::warn!(
                            "Article {} vanished from storage mid-sync on hub '{hub_id}'",
                            existing.guid
                        );
                    }
                    report.updated.push(item.link.clone());
                    report.updated_fields.insert(item.link.clone(), changes);
                }
            }
        }
        Ok(())
    }
}
