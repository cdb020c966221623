// src/services/mod.rs

//! Network-facing services: listing fetch, hub discovery, hub enrichment,
//! and the sync engine that drives them.

pub mod articles;
pub mod enrich;
pub mod hubs;
pub mod sync;

pub use articles::{ArticleFetcher, PageSource};
pub use enrich::{HubDetail, HubDetailFetcher, HubDetailSource, HubEnricher};
pub use hubs::{DiscoveryOutcome, HubDiscovery};
pub use sync::{ItemAction, ScanState, SyncEngine};
