// src/services/articles.rs

//! Article listing fetcher.
//!
//! Fetches one page of a hub's article listing and parses it into article
//! records using the configured CSS selectors.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use scraper::{ElementRef, Html, Selector};
use serde_json::Value;
use url::Url;

use crate::error::{AppError, Result};
use crate::models::{Article, Config, ExtraData, ListingSelectors, SourceConfig};
use crate::utils::http::get_text_optional;
use crate::utils::{canonical_link, guid_for, resolve_url};

/// One page of a hub's article listing.
///
/// A missing page (the page past the last one) is an empty success;
/// transport and decode failures are errors. Implementations do no rate
/// limiting; callers delay between pages.
#[async_trait]
pub trait PageSource: Send + Sync {
    async fn fetch_page(&self, hub_id: &str, page: u32) -> Result<Vec<Article>>;
}

/// HTTP implementation of [`PageSource`].
pub struct ArticleFetcher {
    client: Client,
    source: SourceConfig,
    selectors: ListingSelectors,
}

impl ArticleFetcher {
    /// Create a new fetcher with the given configuration.
    pub fn new(config: &Config) -> Result<Self> {
        let client = crate::utils::http::create_async_client(
            &config.source.user_agent,
            config.source.timeout_secs,
        )?;
        Ok(Self {
            client,
            source: config.source.clone(),
            selectors: config.selectors.listing.clone(),
        })
    }
}

#[async_trait]
impl PageSource for ArticleFetcher {
    async fn fetch_page(&self, hub_id: &str, page: u32) -> Result<Vec<Article>> {
        let url = self.source.hub_listing_url(hub_id, page);
        let Some(body) = get_text_optional(&self.client, &url).await? else {
            return Ok(Vec::new());
        };
        parse_listing(&body, hub_id, &self.source, &self.selectors)
    }
}

/// Parse one listing page into article records.
///
/// Rows missing a resolvable link or a publish timestamp are dropped with a
/// log line; they never fail the page.
pub(crate) fn parse_listing(
    html: &str,
    hub_id: &str,
    source: &SourceConfig,
    selectors: &ListingSelectors,
) -> Result<Vec<Article>> {
    let document = Html::parse_document(html);
    let row_selectors = RowSelectors::parse(selectors)?;
    let item_sel = parse_selector(&selectors.item)?;

    let base_url = Url::parse(&source.base_url)?;
    let mut articles = Vec::new();

    for row in document.select(&item_sel) {
        match parse_listing_row(&row, hub_id, source, &base_url, &row_selectors) {
            Some(article) => articles.push(article),
            None => log::debug!("Dropping malformed listing row on hub '{hub_id}'"),
        }
    }

    Ok(articles)
}

/// Parsed per-row selectors.
struct RowSelectors {
    title: Selector,
    time: Selector,
    rating: Selector,
    views: Selector,
    comments: Selector,
    tag: Selector,
}

impl RowSelectors {
    fn parse(selectors: &ListingSelectors) -> Result<Self> {
        Ok(Self {
            title: parse_selector(&selectors.title_link)?,
            time: parse_selector(&selectors.published_time)?,
            rating: parse_selector(&selectors.rating)?,
            views: parse_selector(&selectors.views)?,
            comments: parse_selector(&selectors.comments)?,
            tag: parse_selector(&selectors.tag)?,
        })
    }
}

fn parse_listing_row(
    row: &ElementRef,
    hub_id: &str,
    source: &SourceConfig,
    base_url: &Url,
    selectors: &RowSelectors,
) -> Option<Article> {
    let title_elem = row.select(&selectors.title).next()?;
    let time_elem = row.select(&selectors.time).next()?;

    let href = title_elem.value().attr("href")?;
    let link = canonical_link(&resolve_url(base_url, href)).ok()?;
    let guid = guid_for(&link);

    let published_at = parse_published(time_elem.value().attr("datetime")?)?;
    let title = collect_text(&title_elem);

    let mut extra = ExtraData::new();
    extra.insert(
        "rating".to_string(),
        select_text(row, &selectors.rating)
            .and_then(|t| parse_rating(&t))
            .map_or(Value::Null, Value::from),
    );
    extra.insert(
        "views".to_string(),
        select_text(row, &selectors.views).map_or(Value::Null, Value::from),
    );
    extra.insert(
        "comments".to_string(),
        Value::from(
            select_text(row, &selectors.comments)
                .and_then(|t| t.trim().parse::<i64>().ok())
                .unwrap_or(0),
        ),
    );
    extra.insert("hub_id".to_string(), Value::from(hub_id));
    extra.insert(
        "tags".to_string(),
        Value::Array(
            row.select(&selectors.tag)
                .map(|el| Value::from(collect_text(&el)))
                .collect(),
        ),
    );

    Some(Article {
        guid,
        link,
        title,
        published_at,
        source: source.name.clone(),
        extra,
        body_md: None,
        comments: Vec::new(),
        read: false,
        interesting: false,
    })
}

fn parse_published(raw: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Parse a rating counter, tolerating the source's minus sign and embedded
/// spacing ("−12", "+4", "1 024").
fn parse_rating(text: &str) -> Option<i64> {
    let cleaned: String = text
        .trim()
        .replace('\u{2212}', "-")
        .replace('+', "")
        .chars()
        .filter(|c| !c.is_whitespace() && *c != '\u{a0}')
        .collect();
    cleaned.parse().ok()
}

fn select_text(row: &ElementRef, selector: &Selector) -> Option<String> {
    row.select(selector)
        .next()
        .map(|el| collect_text(&el))
        .filter(|t| !t.is_empty())
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

    const LISTING_HTML: &str = r#"
        <html><body>
        <article class="tm-articles-list__item">
          <a class="tm-title__link" href="/ru/articles/100/?utm_source=feed">First article</a>
          <span class="tm-article-datetime-published">
            <time datetime="2024-05-02T09:30:00.000Z">then</time>
          </span>
          <span class="tm-votes-lever__score-counter">&#8722;3</span>
          <span class="tm-icon-counter__value">12K</span>
          <span class="tm-article-comments-counter-link__value">7</span>
          <a class="tm-publication-hub__link">rust</a>
          <a class="tm-publication-hub__link">systems</a>
        </article>
        <article class="tm-articles-list__item">
          <a class="tm-title__link" href="https://example.com/ru/articles/101">Second article</a>
          <span class="tm-article-datetime-published">
            <time datetime="2024-05-01T08:00:00Z">then</time>
          </span>
        </article>
        <article class="tm-articles-list__item">
          <a class="tm-title__link" href="/ru/articles/102/">No timestamp, dropped</a>
        </article>
        </body></html>
    "#;

    fn test_source() -> SourceConfig {
        SourceConfig {
            base_url: "https://example.com".to_string(),
            ..SourceConfig::default()
        }
    }

    #[test]
    fn parses_rows_and_drops_malformed_ones() {
        let selectors = SelectorConfig::default().listing;
        let articles = parse_listing(LISTING_HTML, "rust", &test_source(), &selectors).unwrap();
        assert_eq!(articles.len(), 2);

        let first = &articles[0];
        assert_eq!(first.link, "https://example.com/ru/articles/100/");
        assert_eq!(first.guid, "https://example.com/ru/articles/100/");
        assert_eq!(first.title, "First article");
        assert_eq!(first.published_at.to_rfc3339(), "2024-05-02T09:30:00+00:00");
        assert_eq!(first.extra.get("rating"), Some(&Value::from(-3)));
        assert_eq!(first.extra.get("views"), Some(&Value::from("12K")));
        assert_eq!(first.extra.get("comments"), Some(&Value::from(7)));
        assert_eq!(first.extra.get("hub_id"), Some(&Value::from("rust")));
        assert_eq!(
            first.extra.get("tags"),
            Some(&Value::from(vec!["rust", "systems"]))
        );
    }

    #[test]
    fn guid_gets_trailing_slash_even_when_href_has_none() {
        let selectors = SelectorConfig::default().listing;
        let articles = parse_listing(LISTING_HTML, "rust", &test_source(), &selectors).unwrap();
        let second = &articles[1];
        assert_eq!(second.link, "https://example.com/ru/articles/101");
        assert_eq!(second.guid, "https://example.com/ru/articles/101/");
        // Missing counters degrade, never fail the row.
        assert_eq!(second.extra.get("rating"), Some(&Value::Null));
        assert_eq!(second.extra.get("comments"), Some(&Value::from(0)));
    }

    #[test]
    fn rating_parser_handles_source_quirks() {
        assert_eq!(parse_rating("−12"), Some(-12));
        assert_eq!(parse_rating("+4"), Some(4));
        assert_eq!(parse_rating("1\u{a0}024"), Some(1024));
        assert_eq!(parse_rating("n/a"), None);
    }

    #[test]
    fn invalid_selector_is_an_error() {
        let mut selectors = SelectorConfig::default().listing;
        selectors.item = "[[invalid".to_string();
        assert!(parse_listing("<html></html>", "rust", &test_source(), &selectors).is_err());
    }
}
