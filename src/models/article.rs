//! Article data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Open string-keyed metadata attached to an article (rating, views,
/// comment count, hub id, tags).
pub type ExtraData = Map<String, Value>;

/// A content item fetched from a hub listing page.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Article {
    /// Identity key derived from the canonical link. Immutable once assigned.
    pub guid: String,

    /// Full URL to the article (query and fragment stripped)
    pub link: String,

    /// Article title
    pub title: String,

    /// Publication timestamp, UTC
    pub published_at: DateTime<Utc>,

    /// Label of the source the article came from
    pub source: String,

    /// Open metadata map
    #[serde(default)]
    pub extra: ExtraData,

    /// Normalized Markdown body, when fetched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub body_md: Option<String>,

    /// Ordered comment records, when fetched
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub comments: Vec<Value>,

    /// Reader state: the article has been read
    #[serde(default)]
    pub read: bool,

    /// Reader state: the article is marked interesting
    #[serde(default)]
    pub interesting: bool,
}

/// Field-level update set produced by the diff.
///
/// Stored articles are mutated only through this set; whole-record
/// overwrites would clobber fields absent from a given page render.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ArticleUpdate {
    /// New title, when the observed title is non-empty and differs
    pub title: Option<String>,

    /// Fully merged metadata map, when any key changed
    pub extra: Option<ExtraData>,
}

impl ArticleUpdate {
    pub fn is_empty(&self) -> bool {
        self.title.is_none() && self.extra.is_none()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn update_is_empty_by_default() {
        assert!(ArticleUpdate::default().is_empty());
        let update = ArticleUpdate {
            title: Some("t".into()),
            extra: None,
        };
        assert!(!update.is_empty());
    }

    #[test]
    fn article_roundtrips_through_json() {
        let mut extra = ExtraData::new();
        extra.insert("rating".into(), 12.into());
        let article = Article {
            guid: "https://example.com/articles/1/".into(),
            link: "https://example.com/articles/1".into(),
            title: "Title".into(),
            published_at: "2024-05-01T10:00:00Z".parse().unwrap(),
            source: "habr".into(),
            extra,
            body_md: None,
            comments: Vec::new(),
            read: false,
            interesting: false,
        };

        let json = serde_json::to_string(&article).unwrap();
        let back: Article = serde_json::from_str(&json).unwrap();
        assert_eq!(back, article);
    }
}
