//! Hub index discovery service.
//!
//! Enumerates the remote hub index page by page, parsing each page into hub
//! summary records (id, name, rating, subscriber count).

use std::sync::OnceLock;

use regex::Regex;
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};

use crate::error::{AppError, Result};
use crate::models::{Hub, HubIndexSelectors, SourceConfig};
use crate::progress::{CancelToken, Progress};
use crate::utils::http::get_text;

/// What discovery produced and whether it covered the whole index.
///
/// `complete` is true only when every index page was fetched without error,
/// limit, or cancellation; the merge policy selection depends on it.
#[derive(Debug, Default)]
pub struct DiscoveryOutcome {
    pub hubs: Vec<Hub>,
    pub complete: bool,
}

/// Service for discovering hubs from the remote index.
pub struct HubDiscovery<'a> {
    client: &'a Client,
    source: &'a SourceConfig,
    selectors: &'a HubIndexSelectors,
    limit: Option<usize>,
    progress: Progress,
    cancel: CancelToken,
}

impl<'a> HubDiscovery<'a> {
    pub fn new(
        client: &'a Client,
        source: &'a SourceConfig,
        selectors: &'a HubIndexSelectors,
        limit: Option<usize>,
    ) -> Self {
        Self {
            client,
            source,
            selectors,
            limit,
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

    /// Enumerate the hub index.
    ///
    /// Phase 1 (skipped under a limit) reads the total page count from the
    /// index's pagination control; phase 2 fetches pages sequentially. A
    /// page failure aborts discovery and returns everything accumulated so
    /// far with `complete == false`. No retries.
    pub async fn fetch_all(&self) -> DiscoveryOutcome {
        let mut outcome = DiscoveryOutcome::default();
        let delay = std::time::Duration::from_millis(self.source.request_delay_ms);

        let total_pages = if self.limit.is_none() {
            self.progress.emit("Determining number of pages...");
            match self.fetch_total_pages().await {
                Ok(total) => total,
                Err(e) => {
                    log::error!("Failed to determine hub index page count: {e}");
                    self.progress.emit("Error determining total pages. Stopping.");
                    return outcome;
                }
            }
        } else {
            None
        };

        let mut page = 1u32;
        loop {
            if self.cancel.is_cancelled() {
                self.progress.emit("Cancelled by user.");
                return outcome;
            }

            if let Some(total) = total_pages {
                if page > total {
                    break;
                }
                self.progress.step(
                    &format!("Fetching hubs from page {page} of {total}..."),
                    page as usize,
                    total as usize,
                );
            } else {
                self.progress
                    .emit(&format!("Fetching hubs from page {page}..."));
            }

            let body = match get_text(self.client, &self.source.hub_index_url(page)).await {
                Ok(body) => body,
                Err(e) => {
                    log::error!("Failed to fetch hubs page {page}: {e}");
                    self.progress
                        .emit(&format!("Error fetching page {page}. Stopping."));
                    return outcome;
                }
            };

            let hubs_on_page = match parse_hub_rows(&body, self.selectors) {
                Ok(hubs) => hubs,
                Err(e) => {
                    log::error!("Failed to parse hubs page {page}: {e}");
                    return outcome;
                }
            };
            if hubs_on_page.is_empty() {
                break;
            }
            outcome.hubs.extend(hubs_on_page);

            if let Some(limit) = self.limit {
                if outcome.hubs.len() >= limit {
                    outcome.hubs.truncate(limit);
                    self.progress
                        .emit(&format!("Hub limit ({limit}) reached."));
                    return outcome;
                }
            }

            page += 1;
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
        }

        outcome.complete = true;
        self.progress
            .emit(&format!("Fetched a total of {} hubs.", outcome.hubs.len()));
        outcome
    }

    async fn fetch_total_pages(&self) -> Result<Option<u32>> {
        let body = get_text(self.client, &self.source.hub_index_url(1)).await?;
        parse_last_page_number(&body, &self.selectors.pagination_page)
    }
}

/// Read the highest page number out of a pagination control, ignoring
/// prev/next arrows and other non-numeric links.
pub(crate) fn parse_last_page_number(html: &str, pagination_selector: &str) -> Result<Option<u32>> {
    let document = Html::parse_document(html);
    let page_sel = parse_selector(pagination_selector)?;

    let mut last = None;
    for link in document.select(&page_sel) {
        if let Ok(n) = collect_text(&link).parse::<u32>() {
            last = Some(last.map_or(n, |prev: u32| prev.max(n)));
        }
    }
    Ok(last)
}

/// Parse one index page into hub summaries. Malformed rows are skipped with
/// a log line.
pub(crate) fn parse_hub_rows(html: &str, selectors: &HubIndexSelectors) -> Result<Vec<Hub>> {
    let document = Html::parse_document(html);

    let item_sel = parse_selector(&selectors.item)?;
    let title_sel = parse_selector(&selectors.title_link)?;
    let rating_sel = parse_selector(&selectors.rating)?;
    let subscribers_sel = parse_selector(&selectors.subscribers)?;

    let mut hubs = Vec::new();
    for row in document.select(&item_sel) {
        let Some(title_elem) = row.select(&title_sel).next() else {
            continue;
        };
        let Some(href) = title_elem.value().attr("href") else {
            log::warn!("Skipping hub row without an href");
            continue;
        };
        let Some(id) = hub_id_from_href(href) else {
            log::warn!("Skipping hub row with unrecognized href {href:?}");
            continue;
        };

        let name = collect_text(&title_elem);
        let rating = row
            .select(&rating_sel)
            .next()
            .and_then(|el| collect_text(&el).parse::<f64>().ok());
        let subscribers = row
            .select(&subscribers_sel)
            .next()
            .and_then(|el| parse_subscribers(&collect_text(&el)));

        hubs.push(Hub::summary(id, name, rating, subscribers));
    }
    Ok(hubs)
}

/// Extract the hub id from its index href. Falls back to path segments for
/// company-blog style URLs.
fn hub_id_from_href(href: &str) -> Option<String> {
    static ID_PATTERN: OnceLock<Regex> = OnceLock::new();
    let pattern = ID_PATTERN
        .get_or_init(|| Regex::new(r"/(?:hub|hubs)/([^/]+)/").expect("pattern is valid"));

    if let Some(caps) = pattern.captures(href) {
        return Some(caps[1].to_string());
    }

    let parts: Vec<&str> = href.trim_matches('/').split('/').collect();
    match parts.as_slice() {
        [] | [""] => None,
        parts if parts.len() > 2 => Some(parts[parts.len() - 2].to_string()),
        parts => Some(parts[parts.len() - 1].to_string()),
    }
}

/// Parse a subscriber counter, handling the "12k" suffix form.
fn parse_subscribers(text: &str) -> Option<u64> {
    let s = text.trim().to_lowercase();
    if s.is_empty() {
        return None;
    }
    if let Some(prefix) = s.strip_suffix('k') {
        return prefix.trim().parse::<f64>().ok().map(|n| (n * 1000.0) as u64);
    }
    s.parse().ok()
}

fn collect_text(el: &ElementRef) -> String {
    el.text().collect::<String>().trim().to_string()
}

fn parse_selector(s: &str) -> Result<Selector> {
    Selector::parse(s).map_err(|e| AppError::selector(s, format!("{e:?}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::SelectorConfig;

    const INDEX_HTML: &str = r#"
        <html><body>
        <div class="tm-hub">
          <a class="tm-hub__title" href="/ru/hubs/rust/"><span>Rust</span></a>
          <div class="tm-hub__rating">4.5</div>
          <div class="tm-hub__subscribers">12k</div>
        </div>
        <div class="tm-hub">
          <a class="tm-hub__title" href="/ru/company/selectel/blog/"><span>Selectel blog</span></a>
          <div class="tm-hub__rating">3.1</div>
          <div class="tm-hub__subscribers">840</div>
        </div>
        <div class="tm-hub">
          <a class="tm-hub__title"><span>No href, skipped</span></a>
        </div>
        <div class="tm-pagination">
          <a class="tm-pagination__page" href="/ru/hubs/">1</a>
          <a class="tm-pagination__page" href="/ru/hubs/page2/">2</a>
          <a class="tm-pagination__page" href="/ru/hubs/page50/">50</a>
          <a class="tm-pagination__page" href="/ru/hubs/page2/">Next</a>
        </div>
        </body></html>
    "#;

    #[test]
    fn parses_hub_rows_with_fallback_ids() {
        let selectors = SelectorConfig::default().hub_index;
        let hubs = parse_hub_rows(INDEX_HTML, &selectors).unwrap();
        assert_eq!(hubs.len(), 2);

        assert_eq!(hubs[0].id, "rust");
        assert_eq!(hubs[0].name, "Rust");
        assert_eq!(hubs[0].rating, Some(4.5));
        assert_eq!(hubs[0].subscribers, Some(12000));
        assert!(hubs[0].article_count.is_none());

        // Company-blog URL: id comes from the second-to-last path segment.
        assert_eq!(hubs[1].id, "selectel");
        assert_eq!(hubs[1].subscribers, Some(840));
    }

    #[test]
    fn last_page_number_ignores_non_numeric_links() {
        let selectors = SelectorConfig::default().hub_index;
        let last = parse_last_page_number(INDEX_HTML, &selectors.pagination_page).unwrap();
        assert_eq!(last, Some(50));

        let none = parse_last_page_number("<html></html>", &selectors.pagination_page).unwrap();
        assert_eq!(none, None);
    }

    #[test]
    fn subscriber_counts_understand_k_suffix() {
        assert_eq!(parse_subscribers("12k"), Some(12000));
        assert_eq!(parse_subscribers("1.5K"), Some(1500));
        assert_eq!(parse_subscribers("340"), Some(340));
        assert_eq!(parse_subscribers(""), None);
        assert_eq!(parse_subscribers("lots"), None);
    }
}
