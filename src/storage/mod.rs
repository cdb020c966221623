//! Storage abstractions for article persistence.
//!
//! The sync engine writes through this trait as it crawls: lookups by guid,
//! inserts for unseen articles, and field-level updates computed by the
//! diff. Whole-record overwrites are deliberately not part of the surface.

pub mod local;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::{Article, ArticleUpdate};

// Re-export for convenience
pub use local::LocalStore;

/// Trait for article storage backends.
#[async_trait]
pub trait ArticleStore: Send + Sync {
    /// Look up an article by its identity key.
    async fn article_by_guid(&self, guid: &str) -> Result<Option<Article>>;

    /// Insert a new article. The guid must not already be present.
    async fn add_article(&self, article: &Article) -> Result<()>;

    /// Apply a field-level update set to a stored article.
    ///
    /// Returns `false` when no article with that guid exists.
    async fn update_article(&self, guid: &str, updates: &ArticleUpdate) -> Result<bool>;

    /// Publication time of the newest stored article, if any.
    ///
    /// Used to decide whether a configured cutoff still bounds an initial
    /// crawl or the freshness window applies instead.
    async fn last_published_at(&self) -> Result<Option<DateTime<Utc>>>;
}
