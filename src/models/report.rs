//! Run reports returned to the caller.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Human-readable "old -> new" descriptions keyed by field name
/// (`title`, `extra.<key>`). Reporting only, never applied to storage.
pub type ChangeLog = BTreeMap<String, String>;

/// Summary of one sync run across all configured hubs.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SyncReport {
    /// Links of newly inserted articles
    pub added: Vec<String>,

    /// Links of articles whose stored fields changed
    pub updated: Vec<String>,

    /// Per-link change descriptions for the updated articles
    pub updated_fields: HashMap<String, ChangeLog>,

    /// Count of per-hub fatal errors (failed page fetches)
    pub error_count: usize,
}

impl SyncReport {
    pub fn has_changes(&self) -> bool {
        !self.added.is_empty() || !self.updated.is_empty()
    }
}

/// Counts produced by a hub catalog merge.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReconcileStats {
    pub added: usize,
    pub updated: usize,
    pub deleted: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_report_has_no_changes() {
        let report = SyncReport::default();
        assert!(!report.has_changes());
        assert_eq!(report.error_count, 0);
    }
}
