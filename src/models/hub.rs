//! Hub catalog data structures.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A hub: a named sub-catalog of articles on the remote source.
///
/// Discovered from the remote hub index, enriched in place with precise
/// counts, and merged against the previously stored catalog. The `enabled`
/// flag is operator-owned and never written by the engine.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Hub {
    /// Stable identifier, externally assigned, unique within the catalog
    pub id: String,

    /// Display name
    pub name: String,

    /// Whether the hub is selected for article sync
    #[serde(default = "default_enabled")]
    pub enabled: bool,

    /// Hub rating as reported by the index page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rating: Option<f64>,

    /// Subscriber count as reported by the index page
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subscribers: Option<u64>,

    /// Total article count, unknown until enrichment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub article_count: Option<u64>,

    /// Publication time of the hub's newest article, unknown until enrichment
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_article_at: Option<DateTime<Utc>>,

    /// When this record was last touched by a catalog refresh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_fetch_at: Option<DateTime<Utc>>,
}

fn default_enabled() -> bool {
    true
}

impl Hub {
    /// A bare hub summary as produced by discovery, before enrichment.
    pub fn summary(
        id: impl Into<String>,
        name: impl Into<String>,
        rating: Option<f64>,
        subscribers: Option<u64>,
    ) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            enabled: true,
            rating,
            subscribers,
            article_count: None,
            last_article_at: None,
            last_fetch_at: None,
        }
    }
}
