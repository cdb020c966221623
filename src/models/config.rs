//! Application configuration structures.

use std::fs;
use std::path::Path;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};

/// Root application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Remote source endpoint and HTTP behavior
    #[serde(default)]
    pub source: SourceConfig,

    /// Article sync settings
    #[serde(default)]
    pub sync: SyncConfig,

    /// Hub enrichment settings
    #[serde(default)]
    pub enrich: EnrichConfig,

    /// Hub discovery settings
    #[serde(default)]
    pub discovery: DiscoveryConfig,

    /// CSS selectors for the remote markup
    #[serde(default)]
    pub selectors: SelectorConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// Load configuration or return default if loading fails.
    pub fn load_or_default(path: impl AsRef<Path>) -> Self {
        Self::load(&path).unwrap_or_else(|e| {
            log::warn!(
                "Config load failed from {:?}: {}. Using defaults.",
                path.as_ref(),
                e
            );
            Self::default()
        })
    }

    /// Validate configuration values for basic sanity.
    pub fn validate(&self) -> Result<()> {
        if self.source.user_agent.trim().is_empty() {
            return Err(AppError::validation("source.user_agent is empty"));
        }
        if self.source.timeout_secs == 0 {
            return Err(AppError::validation("source.timeout_secs must be > 0"));
        }
        url::Url::parse(&self.source.base_url)
            .map_err(|e| AppError::validation(format!("source.base_url is invalid: {e}")))?;
        if self.enrich.concurrency == 0 {
            return Err(AppError::validation("enrich.concurrency must be > 0"));
        }
        if self.enrich.timeout_secs == 0 {
            return Err(AppError::validation("enrich.timeout_secs must be > 0"));
        }
        Ok(())
    }
}

/// Remote source endpoint and HTTP client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Label recorded on fetched articles
    #[serde(default = "defaults::source_name")]
    pub name: String,

    /// Base URL of the remote source
    #[serde(default = "defaults::base_url")]
    pub base_url: String,

    /// User-Agent header for HTTP requests
    #[serde(default = "defaults::user_agent")]
    pub user_agent: String,

    /// Request timeout in seconds
    #[serde(default = "defaults::timeout")]
    pub timeout_secs: u64,

    /// Delay between listing page requests in milliseconds
    #[serde(default = "defaults::request_delay")]
    pub request_delay_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            name: defaults::source_name(),
            base_url: defaults::base_url(),
            user_agent: defaults::user_agent(),
            timeout_secs: defaults::timeout(),
            request_delay_ms: defaults::request_delay(),
        }
    }
}

impl SourceConfig {
    /// URL of one page of the hub index.
    pub fn hub_index_url(&self, page: u32) -> String {
        let base = self.base_url.trim_end_matches('/');
        if page <= 1 {
            format!("{base}/ru/hubs/")
        } else {
            format!("{base}/ru/hubs/page{page}/")
        }
    }

    /// URL of one page of a hub's article listing.
    pub fn hub_listing_url(&self, hub_id: &str, page: u32) -> String {
        let base = self.base_url.trim_end_matches('/');
        if page <= 1 {
            format!("{base}/ru/hubs/{hub_id}/articles/")
        } else {
            format!("{base}/ru/hubs/{hub_id}/articles/page{page}/")
        }
    }
}

/// A hub entry in the sync list. Accepts both a bare id string and a table.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum HubEntry {
    Id(String),
    Table {
        #[serde(default)]
        id: Option<String>,
    },
}

impl HubEntry {
    /// The hub id, if the entry carries one. Entries without an id are
    /// skipped before any fetch.
    pub fn id(&self) -> Option<&str> {
        match self {
            HubEntry::Id(id) if !id.is_empty() => Some(id),
            HubEntry::Id(_) => None,
            HubEntry::Table { id } => id.as_deref().filter(|s| !s.is_empty()),
        }
    }
}

/// Article sync settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyncConfig {
    /// Hubs to crawl. When empty, the enabled hubs of the stored catalog
    /// are used instead.
    #[serde(default)]
    pub hubs: Vec<HubEntry>,

    /// Absolute floor (`YYYY-MM-DD`) below which items are not inserted.
    /// Bounds the very first crawl of a hub.
    #[serde(default)]
    pub cutoff_date: Option<String>,

    /// Freshness window in days. On runs against a non-empty store, items
    /// older than this window are no longer re-enriched.
    #[serde(default = "defaults::window_days")]
    pub window_days: Option<u32>,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            hubs: Vec::new(),
            cutoff_date: None,
            window_days: defaults::window_days(),
        }
    }
}

impl SyncConfig {
    /// Parse the configured cutoff date. Invalid values are ignored with a
    /// warning, matching a missing cutoff.
    pub fn cutoff(&self) -> Option<DateTime<Utc>> {
        let raw = self.cutoff_date.as_deref()?;
        match NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
            Ok(date) => Some(
                date.and_hms_opt(0, 0, 0)
                    .expect("midnight is always valid")
                    .and_utc(),
            ),
            Err(e) => {
                log::warn!("Ignoring invalid sync.cutoff_date {raw:?}: {e}");
                None
            }
        }
    }
}

/// Hub enrichment settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EnrichConfig {
    /// Whether discovered hubs are enriched before the merge
    #[serde(default = "defaults::enrich_enabled")]
    pub enabled: bool,

    /// Maximum in-flight detail fetches
    #[serde(default = "defaults::concurrency")]
    pub concurrency: usize,

    /// Detail fetch timeout in seconds
    #[serde(default = "defaults::enrich_timeout")]
    pub timeout_secs: u64,
}

impl Default for EnrichConfig {
    fn default() -> Self {
        Self {
            enabled: defaults::enrich_enabled(),
            concurrency: defaults::concurrency(),
            timeout_secs: defaults::enrich_timeout(),
        }
    }
}

/// Hub discovery settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    /// Cap on the number of hubs to discover. Debug/testing aid; a limited
    /// discovery is always merged with the safe policy.
    #[serde(default)]
    pub limit: Option<usize>,
}

/// CSS selectors for the remote markup.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SelectorConfig {
    #[serde(default)]
    pub listing: ListingSelectors,

    #[serde(default)]
    pub hub_index: HubIndexSelectors,
}

/// Selectors for one article row on a hub listing page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ListingSelectors {
    #[serde(default = "defaults::listing_item")]
    pub item: String,

    #[serde(default = "defaults::listing_title_link")]
    pub title_link: String,

    #[serde(default = "defaults::listing_published_time")]
    pub published_time: String,

    #[serde(default = "defaults::listing_rating")]
    pub rating: String,

    #[serde(default = "defaults::listing_views")]
    pub views: String,

    #[serde(default = "defaults::listing_comments")]
    pub comments: String,

    #[serde(default = "defaults::listing_tag")]
    pub tag: String,
}

impl Default for ListingSelectors {
    fn default() -> Self {
        Self {
            item: defaults::listing_item(),
            title_link: defaults::listing_title_link(),
            published_time: defaults::listing_published_time(),
            rating: defaults::listing_rating(),
            views: defaults::listing_views(),
            comments: defaults::listing_comments(),
            tag: defaults::listing_tag(),
        }
    }
}

/// Selectors for one hub row on the hub index, plus the pagination control
/// shared by index and listing pages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubIndexSelectors {
    #[serde(default = "defaults::hub_item")]
    pub item: String,

    #[serde(default = "defaults::hub_title_link")]
    pub title_link: String,

    #[serde(default = "defaults::hub_rating")]
    pub rating: String,

    #[serde(default = "defaults::hub_subscribers")]
    pub subscribers: String,

    #[serde(default = "defaults::pagination_page")]
    pub pagination_page: String,
}

impl Default for HubIndexSelectors {
    fn default() -> Self {
        Self {
            item: defaults::hub_item(),
            title_link: defaults::hub_title_link(),
            rating: defaults::hub_rating(),
            subscribers: defaults::hub_subscribers(),
            pagination_page: defaults::pagination_page(),
        }
    }
}

mod defaults {
    // Source defaults
    pub fn source_name() -> String {
        "habr".into()
    }
    pub fn base_url() -> String {
        "https://habr.com".into()
    }
    pub fn user_agent() -> String {
        "Mozilla/5.0 (compatible; hubsync/0.1)".into()
    }
    pub fn timeout() -> u64 {
        10
    }
    pub fn request_delay() -> u64 {
        300
    }

    // Sync defaults
    pub fn window_days() -> Option<u32> {
        Some(30)
    }

    // Enrichment defaults
    pub fn enrich_enabled() -> bool {
        true
    }
    pub fn concurrency() -> usize {
        10
    }
    pub fn enrich_timeout() -> u64 {
        20
    }

    // Listing selectors
    pub fn listing_item() -> String {
        "article.tm-articles-list__item".into()
    }
    pub fn listing_title_link() -> String {
        "a.tm-title__link".into()
    }
    pub fn listing_published_time() -> String {
        ".tm-article-datetime-published time".into()
    }
    pub fn listing_rating() -> String {
        ".tm-votes-lever__score-counter".into()
    }
    pub fn listing_views() -> String {
        ".tm-icon-counter__value".into()
    }
    pub fn listing_comments() -> String {
        ".tm-article-comments-counter-link__value".into()
    }
    pub fn listing_tag() -> String {
        ".tm-publication-hub__link".into()
    }

    // Hub index selectors
    pub fn hub_item() -> String {
        "div.tm-hub".into()
    }
    pub fn hub_title_link() -> String {
        "a.tm-hub__title".into()
    }
    pub fn hub_rating() -> String {
        ".tm-hub__rating".into()
    }
    pub fn hub_subscribers() -> String {
        ".tm-hub__subscribers".into()
    }
    pub fn pagination_page() -> String {
        "a.tm-pagination__page".into()
    }
}
