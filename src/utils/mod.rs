//! Utility functions and helpers.

pub mod http;
pub mod url;

pub use url::{canonical_link, guid_for, resolve_url};
