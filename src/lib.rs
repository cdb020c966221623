// src/lib.rs

//! hubsync library
//!
//! Incremental article sync from a paginated remote source, plus discovery,
//! enrichment, and reconciliation of the hub catalog the articles belong to.

pub mod error;
pub mod models;
pub mod pipeline;
pub mod progress;
pub mod services;
pub mod storage;
pub mod utils;
