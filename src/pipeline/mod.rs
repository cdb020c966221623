//! Pipeline entry points and pure computation stages.
//!
//! - `run_sync`: crawl configured hubs into the article store
//! - `run_refresh`: discover, enrich, and reconcile the hub catalog

pub mod diff;
pub mod reconcile;
pub mod refresh;
pub mod sync;

pub use diff::diff_articles;
pub use reconcile::{full_merge, safe_merge};
pub use refresh::run_refresh;
pub use sync::{configured_hub_ids, run_sync, run_sync_for};
