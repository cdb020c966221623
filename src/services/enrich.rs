//! Hub enrichment service.
//!
//! Fetches each discovered hub's first (and, when paginated, last) listing
//! page to compute a precise article count and last-activity timestamp,
//! with a bounded number of fetches in flight.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use futures::future;
use reqwest::Client;
use scraper::{Html, Selector};
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use crate::error::{AppError, Result};
use crate::models::{Config, Hub, ListingSelectors, SourceConfig};
use crate::progress::{CancelToken, Progress};
use crate::services::hubs::parse_last_page_number;
use crate::utils::http::get_text_optional;

/// Enrichment data for one hub.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct HubDetail {
    pub article_count: Option<u64>,
    pub last_article_at: Option<DateTime<Utc>>,
}

/// Detail-page fetch for one hub.
#[async_trait]
pub trait HubDetailSource: Send + Sync {
    async fn fetch_detail(&self, hub: &Hub) -> Result<HubDetail>;
}

/// HTTP implementation of [`HubDetailSource`].
pub struct HubDetailFetcher {
    client: Client,
    source: SourceConfig,
    listing: ListingSelectors,
    pagination_selector: String,
}

impl HubDetailFetcher {
    pub fn new(config: &Config) -> Result<Self> {
        let client = crate::utils::http::create_async_client(
            &config.source.user_agent,
            config.enrich.timeout_secs,
        )?;
        Ok(Self {
            client,
            source: config.source.clone(),
            listing: config.selectors.listing.clone(),
            pagination_selector: config.selectors.hub_index.pagination_page.clone(),
        })
    }
}

#[async_trait]
impl HubDetailSource for HubDetailFetcher {
    async fn fetch_detail(&self, hub: &Hub) -> Result<HubDetail> {
        let first_url = self.source.hub_listing_url(&hub.id, 1);
        let Some(body) = get_text_optional(&self.client, &first_url).await? else {
            return Err(AppError::crawl(&hub.id, "hub listing not found"));
        };

        let stats = parse_listing_stats(&body, &self.listing, &self.pagination_selector)?;
        let mut detail = HubDetail {
            article_count: Some(stats.first_page_count as u64),
            last_article_at: stats.last_article_at,
        };

        if let Some(last_page) = stats.last_page.filter(|p| *p > 1) {
            // Full pages carry a first-page worth of items each; the last
            // page is counted exactly.
            let last_url = self.source.hub_listing_url(&hub.id, last_page);
            match get_text_optional(&self.client, &last_url).await {
                Ok(Some(last_body)) => {
                    let last_stats =
                        parse_listing_stats(&last_body, &self.listing, &self.pagination_selector)?;
                    detail.article_count = Some(
                        stats.first_page_count as u64 * (u64::from(last_page) - 1)
                            + last_stats.first_page_count as u64,
                    );
                }
                Ok(None) | Err(_) => {
                    log::warn!("Failed to fetch last page for hub '{}'", hub.id);
                    detail.article_count = None;
                }
            }
        }

        Ok(detail)
    }
}

struct ListingStats {
    first_page_count: usize,
    last_page: Option<u32>,
    last_article_at: Option<DateTime<Utc>>,
}

/// Extract item count, pagination extent, and newest item timestamp from a
/// listing page, dropping the parsed document before any further await.
fn parse_listing_stats(
    html: &str,
    listing: &ListingSelectors,
    pagination_selector: &str,
) -> Result<ListingStats> {
    let last_page = parse_last_page_number(html, pagination_selector)?;

    let document = Html::parse_document(html);
    let item_sel = parse_selector(&listing.item)?;
    let time_sel = parse_selector(&listing.published_time)?;

    let first_page_count = document.select(&item_sel).count();
    let last_article_at = document
        .select(&time_sel)
        .next()
        .and_then(|el| el.value().attr("datetime"))
        .and_then(|raw| DateTime::parse_from_rfc3339(raw).ok())
        .map(|dt| dt.with_timezone(&Utc));

    Ok(ListingStats {
        first_page_count,
        last_page,
        last_article_at,
    })
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

/// Bounded-concurrency scheduler over a [`HubDetailSource`].
pub struct HubEnricher {
    concurrency: usize,
    progress: Progress,
    cancel: CancelToken,
}

impl HubEnricher {
    pub fn new(concurrency: usize) -> Self {
        Self {
            concurrency: concurrency.max(1),
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

    /// Enrich every hub in place, at most `concurrency` fetches in flight.
    ///
    /// Tasks are independent: one hub's failure leaves its record
    /// un-enriched and the rest proceed. Results are written back by index,
    /// never in completion order. Cancellation stops launching new tasks;
    /// in-flight tasks finish.
    pub async fn enrich(&self, hubs: Vec<Hub>, source: Arc<dyn HubDetailSource>) -> Vec<Hub> {
        let total = hubs.len();
        let semaphore = Arc::new(Semaphore::new(self.concurrency));
        let completed = Arc::new(AtomicUsize::new(0));

        let mut handles: Vec<(usize, JoinHandle<Hub>)> = Vec::with_capacity(total);
        for (i, hub) in hubs.iter().cloned().enumerate() {
            if self.cancel.is_cancelled() {
                self.progress.emit("Cancelled by user.");
                break;
            }

            let semaphore = Arc::clone(&semaphore);
            let source = Arc::clone(&source);
            let completed = Arc::clone(&completed);
            let progress = self.progress.clone();

            handles.push((
                i,
                tokio::spawn(async move {
                    // Permit acquired before any network call.
                    let _permit = semaphore
                        .acquire_owned()
                        .await
                        .expect("semaphore never closed");

                    let result = source.fetch_detail(&hub).await;
                    let done = completed.fetch_add(1, Ordering::SeqCst) + 1;

                    match result {
                        Ok(detail) => {
                            progress.step(
                                &format!("Enriched hub '{}'", hub.name),
                                done,
                                total,
                            );
                            let mut hub = hub;
                            hub.article_count = detail.article_count;
                            hub.last_article_at = detail.last_article_at;
                            hub
                        }
                        Err(e) => {
                            log::warn!("Failed to enrich hub '{}': {e}", hub.id);
                            progress.step(
                                &format!("Failed to enrich hub '{}': {e}", hub.id),
                                done,
                                total,
                            );
                            hub
                        }
                    }
                }),
            ));
        }

        let joined = future::join_all(
            handles
                .into_iter()
                .map(|(i, handle)| async move { (i, handle.await) }),
        )
        .await;

        let mut enriched = hubs;
        for (i, result) in joined {
            match result {
                Ok(hub) => enriched[i] = hub,
                Err(e) => log::warn!("Enrichment task for index {i} aborted: {e}"),
            }
        }
        enriched
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    use crate::models::SelectorConfig;

    const LISTING_HTML: &str = r#"
        <html><body>
        <article class="tm-articles-list__item">
          <span class="tm-article-datetime-published">
            <time datetime="2024-05-02T09:30:00Z">then</time>
          </span>
        </article>
        <article class="tm-articles-list__item"></article>
        <article class="tm-articles-list__item"></article>
        <div class="tm-pagination">
          <a class="tm-pagination__page">1</a>
          <a class="tm-pagination__page">7</a>
        </div>
        </body></html>
    "#;

    #[test]
    fn listing_stats_extract_count_pages_and_timestamp() {
        let selectors = SelectorConfig::default();
        let stats = parse_listing_stats(
            LISTING_HTML,
            &selectors.listing,
            &selectors.hub_index.pagination_page,
        )
        .unwrap();
        assert_eq!(stats.first_page_count, 3);
        assert_eq!(stats.last_page, Some(7));
        assert_eq!(
            stats.last_article_at.unwrap().to_rfc3339(),
            "2024-05-02T09:30:00+00:00"
        );
    }

    /// Detail source that tracks how many fetches run at once.
    struct InstrumentedSource {
        in_flight: AtomicUsize,
        max_in_flight: AtomicUsize,
        fail_id: Option<String>,
    }

    impl InstrumentedSource {
        fn new(fail_id: Option<&str>) -> Self {
            Self {
                in_flight: AtomicUsize::new(0),
                max_in_flight: AtomicUsize::new(0),
                fail_id: fail_id.map(str::to_string),
            }
        }
    }

    #[async_trait]
    impl HubDetailSource for InstrumentedSource {
        async fn fetch_detail(&self, hub: &Hub) -> Result<HubDetail> {
            let current = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_in_flight.fetch_max(current, Ordering::SeqCst);

            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);

            if self.fail_id.as_deref() == Some(hub.id.as_str()) {
                return Err(AppError::crawl(&hub.id, "detail fetch failed"));
            }
            Ok(HubDetail {
                article_count: Some(hub.id.len() as u64 * 100),
                last_article_at: Some("2024-05-02T09:30:00Z".parse().unwrap()),
            })
        }
    }

    fn hubs(n: usize) -> Vec<Hub> {
        (0..n)
            .map(|i| Hub::summary(format!("hub{i}"), format!("Hub {i}"), None, None))
            .collect()
    }

    #[tokio::test]
    async fn never_exceeds_the_concurrency_limit() {
        let source = Arc::new(InstrumentedSource::new(None));
        let enricher = HubEnricher::new(2);

        let enriched = enricher.enrich(hubs(10), source.clone()).await;

        assert_eq!(enriched.len(), 10);
        assert!(enriched.iter().all(|h| h.article_count.is_some()));
        assert!(source.max_in_flight.load(Ordering::SeqCst) <= 2);
    }

    #[tokio::test]
    async fn one_failure_never_aborts_the_others() {
        let source = Arc::new(InstrumentedSource::new(Some("hub3")));
        let enricher = HubEnricher::new(4);

        let enriched = enricher.enrich(hubs(10), source.clone()).await;

        assert_eq!(enriched.len(), 10);
        // The failed hub comes back unchanged.
        assert!(enriched[3].article_count.is_none());
        let ok = enriched.iter().filter(|h| h.article_count.is_some()).count();
        assert_eq!(ok, 9);
    }

    #[tokio::test]
    async fn results_keep_origin_order() {
        let source = Arc::new(InstrumentedSource::new(None));
        let enricher = HubEnricher::new(8);

        let input = hubs(10);
        let ids: Vec<String> = input.iter().map(|h| h.id.clone()).collect();
        let enriched = enricher.enrich(input, source.clone()).await;

        let out_ids: Vec<String> = enriched.iter().map(|h| h.id.clone()).collect();
        assert_eq!(out_ids, ids);
    }

    #[tokio::test]
    async fn cancellation_stops_launching_tasks() {
        let source = Arc::new(InstrumentedSource::new(None));
        let cancel = CancelToken::new();
        cancel.cancel();
        let enricher = HubEnricher::new(2).with_cancel(cancel);

        let input = hubs(5);
        let enriched = enricher.enrich(input.clone(), source.clone()).await;

        // Nothing launched, everything unchanged.
        assert_eq!(enriched, input);
        assert_eq!(source.max_in_flight.load(Ordering::SeqCst), 0);
    }
}
