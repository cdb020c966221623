//! Local filesystem storage implementation.
//!
//! Keeps the article catalog in memory behind an async lock and persists it
//! as JSON with atomic write-temp-then-rename, for development and embedding.
//!
//! ## Storage Layout
//!
//! ```text
//! {root}/
//! ├── config.toml      # Engine configuration
//! ├── articles.json    # Article catalog
//! └── hubs.json        # Hub catalog
//! ```

use std::collections::HashMap;
use std::path::PathBuf;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Serialize, de::DeserializeOwned};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::models::{Article, ArticleUpdate, Hub};
use crate::storage::ArticleStore;

const ARTICLES_FILE: &str = "articles.json";
const HUBS_FILE: &str = "hubs.json";

/// Local JSON-file storage backend.
pub struct LocalStore {
    root_dir: Option<PathBuf>,
    articles: RwLock<HashMap<String, Article>>,
}

impl LocalStore {
    /// Open a store rooted at the given directory, loading any existing
    /// article catalog.
    pub async fn open(root_dir: impl Into<PathBuf>) -> Result<Self> {
        let store = Self {
            root_dir: Some(root_dir.into()),
            articles: RwLock::new(HashMap::new()),
        };

        if let Some(existing) = store.read_json::<Vec<Article>>(ARTICLES_FILE).await? {
            let mut map = store.articles.write().await;
            for article in existing {
                map.insert(article.guid.clone(), article);
            }
        }

        Ok(store)
    }

    /// An ephemeral store with no backing directory. `persist` is a no-op.
    pub fn in_memory() -> Self {
        Self {
            root_dir: None,
            articles: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored articles.
    pub async fn article_count(&self) -> usize {
        self.articles.read().await.len()
    }

    /// All stored articles, newest first.
    pub async fn articles_by_date(&self) -> Vec<Article> {
        let mut articles: Vec<Article> = self.articles.read().await.values().cloned().collect();
        articles.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        articles
    }

    /// Update reader state on one article. Returns `false` when the guid is
    /// unknown. The sync engine never touches these fields.
    pub async fn set_status(
        &self,
        guid: &str,
        read: Option<bool>,
        interesting: Option<bool>,
    ) -> Result<bool> {
        let mut map = self.articles.write().await;
        let Some(article) = map.get_mut(guid) else {
            return Ok(false);
        };
        if let Some(read) = read {
            article.read = read;
        }
        if let Some(interesting) = interesting {
            article.interesting = interesting;
        }
        Ok(true)
    }

    /// Write the article catalog to disk. No-op for in-memory stores.
    pub async fn persist(&self) -> Result<()> {
        if self.root_dir.is_none() {
            return Ok(());
        }
        let articles = self.articles_by_date().await;
        self.write_json(ARTICLES_FILE, &articles).await
    }

    /// Load the hub catalog, or an empty list when none was saved yet.
    pub async fn load_hubs(&self) -> Result<Vec<Hub>> {
        Ok(self.read_json(HUBS_FILE).await?.unwrap_or_default())
    }

    /// Save the hub catalog.
    pub async fn save_hubs(&self, hubs: &[Hub]) -> Result<()> {
        self.write_json(HUBS_FILE, hubs).await
    }

    fn path(&self, key: &str) -> Result<PathBuf> {
        self.root_dir
            .as_ref()
            .map(|root| root.join(key))
            .ok_or_else(|| AppError::storage("store has no backing directory"))
    }

    /// Write bytes atomically (write to temp, then rename).
    async fn write_bytes(&self, key: &str, bytes: &[u8]) -> Result<()> {
        let path = self.path(key)?;
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }

        let tmp = path.with_extension("tmp");
        let mut file = tokio::fs::File::create(&tmp).await?;
        file.write_all(bytes).await?;
        file.flush().await?;
        drop(file);

        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }

    async fn write_json<T: Serialize + ?Sized>(&self, key: &str, value: &T) -> Result<()> {
        let bytes = serde_json::to_vec_pretty(value)?;
        self.write_bytes(key, &bytes).await
    }

    /// Read JSON data, returning `None` if the file doesn't exist.
    async fn read_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let path = self.path(key)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(serde_json::from_slice(&bytes)?)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(AppError::Io(e)),
        }
    }
}

#[async_trait]
impl ArticleStore for LocalStore {
    async fn article_by_guid(&self, guid: &str) -> Result<Option<Article>> {
        Ok(self.articles.read().await.get(guid).cloned())
    }

    async fn add_article(&self, article: &Article) -> Result<()> {
        let mut map = self.articles.write().await;
        if map.contains_key(&article.guid) {
            return Err(AppError::storage(format!(
                "duplicate guid: {}",
                article.guid
            )));
        }
        map.insert(article.guid.clone(), article.clone());
        Ok(())
    }

    async fn update_article(&self, guid: &str, updates: &ArticleUpdate) -> Result<bool> {
        let mut map = self.articles.write().await;
        let Some(article) = map.get_mut(guid) else {
            return Ok(false);
        };
        if let Some(title) = &updates.title {
            article.title = title.clone();
        }
        if let Some(extra) = &updates.extra {
            article.extra = extra.clone();
        }
        Ok(true)
    }

    async fn last_published_at(&self) -> Result<Option<DateTime<Utc>>> {
        Ok(self
            .articles
            .read()
            .await
            .values()
            .map(|a| a.published_at)
            .max())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtraData;

    fn sample_article(guid: &str, published: &str) -> Article {
        Article {
            guid: guid.to_string(),
            link: guid.trim_end_matches('/').to_string(),
            title: "Title".to_string(),
            published_at: published.parse().unwrap(),
            source: "habr".to_string(),
            extra: ExtraData::new(),
            body_md: None,
            comments: Vec::new(),
            read: false,
            interesting: false,
        }
    }

    #[tokio::test]
    async fn add_then_lookup_by_guid() {
        let store = LocalStore::in_memory();
        let article = sample_article("https://example.com/a/1/", "2024-05-01T10:00:00Z");
        store.add_article(&article).await.unwrap();

        let found = store
            .article_by_guid("https://example.com/a/1/")
            .await
            .unwrap();
        assert_eq!(found, Some(article));
        assert!(
            store
                .article_by_guid("https://example.com/a/2/")
                .await
                .unwrap()
                .is_none()
        );
    }

    #[tokio::test]
    async fn add_rejects_duplicate_guid() {
        let store = LocalStore::in_memory();
        let article = sample_article("https://example.com/a/1/", "2024-05-01T10:00:00Z");
        store.add_article(&article).await.unwrap();
        assert!(store.add_article(&article).await.is_err());
    }

    #[tokio::test]
    async fn update_applies_only_given_fields() {
        let store = LocalStore::in_memory();
        let article = sample_article("https://example.com/a/1/", "2024-05-01T10:00:00Z");
        store.add_article(&article).await.unwrap();

        let updates = ArticleUpdate {
            title: Some("New title".to_string()),
            extra: None,
        };
        assert!(
            store
                .update_article("https://example.com/a/1/", &updates)
                .await
                .unwrap()
        );

        let stored = store
            .article_by_guid("https://example.com/a/1/")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.title, "New title");
        assert_eq!(stored.published_at, article.published_at);

        // Unknown guid reports not-found instead of erroring.
        assert!(
            !store
                .update_article("https://example.com/missing/", &updates)
                .await
                .unwrap()
        );
    }

    #[tokio::test]
    async fn last_published_is_max_over_catalog() {
        let store = LocalStore::in_memory();
        assert_eq!(store.last_published_at().await.unwrap(), None);

        store
            .add_article(&sample_article(
                "https://example.com/a/1/",
                "2024-05-01T10:00:00Z",
            ))
            .await
            .unwrap();
        store
            .add_article(&sample_article(
                "https://example.com/a/2/",
                "2024-06-01T10:00:00Z",
            ))
            .await
            .unwrap();

        let last = store.last_published_at().await.unwrap().unwrap();
        assert_eq!(last.to_rfc3339(), "2024-06-01T10:00:00+00:00");
    }

    #[tokio::test]
    async fn persist_and_reopen_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        {
            let store = LocalStore::open(dir.path()).await.unwrap();
            store
                .add_article(&sample_article(
                    "https://example.com/a/1/",
                    "2024-05-01T10:00:00Z",
                ))
                .await
                .unwrap();
            store.set_status("https://example.com/a/1/", Some(true), None)
                .await
                .unwrap();
            store.persist().await.unwrap();
        }

        let reopened = LocalStore::open(dir.path()).await.unwrap();
        assert_eq!(reopened.article_count().await, 1);
        let stored = reopened
            .article_by_guid("https://example.com/a/1/")
            .await
            .unwrap()
            .unwrap();
        assert!(stored.read);
    }

    #[tokio::test]
    async fn hub_catalog_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let store = LocalStore::open(dir.path()).await.unwrap();
        assert!(store.load_hubs().await.unwrap().is_empty());

        let hubs = vec![Hub::summary("rust", "Rust", Some(4.5), Some(12000))];
        store.save_hubs(&hubs).await.unwrap();
        assert_eq!(store.load_hubs().await.unwrap(), hubs);
    }
}
