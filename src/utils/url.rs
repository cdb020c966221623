// src/utils/url.rs

//! URL canonicalization and identity derivation.

use url::Url;

use crate::error::Result;

/// Canonicalize an article link: scheme + host + path only, query and
/// fragment stripped.
pub fn canonical_link(raw: &str) -> Result<String> {
    let mut url = Url::parse(raw)?;
    url.set_query(None);
    url.set_fragment(None);
    Ok(url.to_string())
}

/// Derive the identity key for a canonical link.
///
/// The guid is the canonical link with the trailing slash normalized, so
/// that every rendering of the same article maps to one key.
pub fn guid_for(canonical: &str) -> String {
    if canonical.ends_with('/') {
        canonical.to_string()
    } else {
        format!("{canonical}/")
    }
}

/// Resolve a potentially relative href against a base URL.
pub fn resolve_url(base: &Url, href: &str) -> String {
    base.join(href)
        .map(|u| u.to_string())
        .unwrap_or_else(|_| href.to_string())
}
