// src/models/mod.rs

//! Domain models for the sync engine.
//!
//! This module contains all data structures used throughout the application,
//! organized by their primary purpose.

mod article;
mod config;
mod hub;
mod report;

// Re-export all public types
pub use article::{Article, ArticleUpdate, ExtraData};
pub use config::{
    Config, DiscoveryConfig, EnrichConfig, HubEntry, HubIndexSelectors, ListingSelectors,
    SelectorConfig, SourceConfig, SyncConfig,
};
pub use hub::Hub;
pub use report::{ChangeLog, ReconcileStats, SyncReport};
