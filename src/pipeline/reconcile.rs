//! Hub catalog reconciliation.
//!
//! Merges a freshly discovered (and possibly enriched) hub list into the
//! previously stored catalog. Two policies, keyed by hub id:
//!
//! - **safe**: update-or-append only; hubs missing from the fresh list are
//!   left untouched. Used when discovery was limited or incomplete.
//! - **full**: additionally drops ids absent from the fresh list. Used only
//!   when discovery covered the entire remote catalog.

use std::collections::{HashMap, HashSet};

use chrono::{DateTime, Utc};

use crate::models::{Hub, ReconcileStats};

/// Non-destructive merge. The result never has fewer entries than
/// `previous`.
pub fn safe_merge(previous: &[Hub], fresh: &[Hub], now: DateTime<Utc>) -> (Vec<Hub>, ReconcileStats) {
    let mut stats = ReconcileStats::default();
    let mut result = previous.to_vec();
    let mut by_id: HashMap<String, usize> = result
        .iter()
        .enumerate()
        .map(|(i, hub)| (hub.id.clone(), i))
        .collect();

    for observed in fresh {
        match by_id.get(&observed.id) {
            Some(&i) => {
                apply_update(&mut result[i], observed, now);
                stats.updated += 1;
            }
            None => {
                by_id.insert(observed.id.clone(), result.len());
                result.push(as_new(observed, now));
                stats.added += 1;
            }
        }
    }

    (result, stats)
}

/// Destructive merge: ids present before but absent from the fresh list are
/// counted as deleted and omitted from the result.
pub fn full_merge(previous: &[Hub], fresh: &[Hub], now: DateTime<Utc>) -> (Vec<Hub>, ReconcileStats) {
    let mut stats = ReconcileStats::default();
    let previous_by_id: HashMap<&str, &Hub> =
        previous.iter().map(|hub| (hub.id.as_str(), hub)).collect();
    let fresh_ids: HashSet<&str> = fresh.iter().map(|hub| hub.id.as_str()).collect();

    stats.deleted = previous
        .iter()
        .filter(|hub| !fresh_ids.contains(hub.id.as_str()))
        .count();

    let mut result = Vec::with_capacity(fresh.len());
    for observed in fresh {
        match previous_by_id.get(observed.id.as_str()) {
            Some(existing) => {
                let mut merged = (*existing).clone();
                apply_update(&mut merged, observed, now);
                result.push(merged);
                stats.updated += 1;
            }
            None => {
                result.push(as_new(observed, now));
                stats.added += 1;
            }
        }
    }

    (result, stats)
}

/// Update a stored hub in place from a fresh observation.
///
/// Index stats overwrite unconditionally; enrichment results only when
/// present; the stored name survives an empty fresh name; `enabled` is
/// operator-owned and untouched.
fn apply_update(existing: &mut Hub, observed: &Hub, now: DateTime<Utc>) {
    existing.rating = observed.rating;
    existing.subscribers = observed.subscribers;
    if observed.article_count.is_some() {
        existing.article_count = observed.article_count;
    }
    if observed.last_article_at.is_some() {
        existing.last_article_at = observed.last_article_at;
    }
    if existing.name.is_empty() && !observed.name.is_empty() {
        existing.name = observed.name.clone();
    }
    existing.last_fetch_at = Some(now);
}

fn as_new(observed: &Hub, now: DateTime<Utc>) -> Hub {
    let mut hub = observed.clone();
    hub.enabled = true;
    hub.last_fetch_at = Some(now);
    hub
}
