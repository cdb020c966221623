//! Field-level diff between a stored article and a freshly observed one.
//!
//! Produces the minimal update set applied through the storage trait plus a
//! human-readable change log for reporting. Metadata follows a
//! monotonic-enrichment policy: values only get more complete over time and
//! are never cleared by an absent or empty observation.

use serde_json::Value;

use crate::models::{Article, ArticleUpdate, ChangeLog};

/// Compute the update set and change log for one observed article.
pub fn diff_articles(existing: &Article, observed: &Article) -> (ArticleUpdate, ChangeLog) {
    let mut updates = ArticleUpdate::default();
    let mut changes = ChangeLog::new();

    // Title is updated only when the observed one is non-empty and differs.
    if !observed.title.is_empty() && observed.title != existing.title {
        changes.insert(
            "title".to_string(),
            format!("{} -> {}", existing.title, observed.title),
        );
        updates.title = Some(observed.title.clone());
    }

    let mut merged = existing.extra.clone();
    let mut extra_changed = false;

    for (key, new_val) in &observed.extra {
        if is_empty_value(new_val) {
            continue;
        }
        let old_val = existing.extra.get(key);
        if old_val != Some(new_val) {
            changes.insert(
                format!("extra.{key}"),
                format!("{} -> {}", format_value(old_val), format_value(Some(new_val))),
            );
            merged.insert(key.clone(), new_val.clone());
            extra_changed = true;
        }
    }

    if extra_changed {
        updates.extra = Some(merged);
    }

    (updates, changes)
}

fn is_empty_value(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.is_empty(),
        Value::Array(a) => a.is_empty(),
        _ => false,
    }
}

fn format_value(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => "none".to_string(),
        Some(Value::String(s)) => s.clone(),
        Some(v) => v.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ExtraData;

    fn article(title: &str, extra: ExtraData) -> Article {
        Article {
            guid: "https://example.com/a/1/".to_string(),
            link: "https://example.com/a/1".to_string(),
            title: title.to_string(),
            published_at: "2024-05-01T10:00:00Z".parse().unwrap(),
            source: "habr".to_string(),
            extra,
            body_md: None,
            comments: Vec::new(),
            read: false,
            interesting: false,
        }
    }

    fn extra(pairs: &[(&str, Value)]) -> ExtraData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn no_changes_yields_empty_update() {
        let a = article("Title", extra(&[("rating", 10.into())]));
        let (updates, changes) = diff_articles(&a, &a.clone());
        assert!(updates.is_empty());
        assert!(changes.is_empty());
    }

    #[test]
    fn title_and_extra_changes_are_reported() {
        let existing = article("A", extra(&[("rating", 10.into())]));
        let observed = article("B", extra(&[("rating", 15.into())]));

        let (updates, changes) = diff_articles(&existing, &observed);
        assert_eq!(updates.title.as_deref(), Some("B"));
        assert_eq!(
            updates.extra.as_ref().unwrap().get("rating"),
            Some(&Value::from(15))
        );
        assert_eq!(changes.get("title").unwrap(), "A -> B");
        assert_eq!(changes.get("extra.rating").unwrap(), "10 -> 15");
    }

    #[test]
    fn empty_observation_never_regresses() {
        let existing = article("A", extra(&[("rating", 10.into())]));
        let observed = article("", extra(&[("rating", Value::Null)]));

        let (updates, changes) = diff_articles(&existing, &observed);
        assert!(updates.is_empty());
        assert!(changes.is_empty());
    }

    #[test]
    fn empty_string_and_empty_list_do_not_clear() {
        let existing = article(
            "A",
            extra(&[("views", "12K".into()), ("tags", Value::from(vec!["x"]))]),
        );
        let observed = article(
            "A",
            extra(&[
                ("views", "".into()),
                ("tags", Value::Array(Vec::new())),
            ]),
        );

        let (updates, _) = diff_articles(&existing, &observed);
        assert!(updates.is_empty());
    }

    #[test]
    fn new_keys_are_added_to_the_merged_map() {
        let existing = article("A", extra(&[("rating", 10.into())]));
        let observed = article("A", extra(&[("comments", 3.into())]));

        let (updates, changes) = diff_articles(&existing, &observed);
        let merged = updates.extra.unwrap();
        // Merged map keeps the stored key and gains the observed one.
        assert_eq!(merged.get("rating"), Some(&Value::from(10)));
        assert_eq!(merged.get("comments"), Some(&Value::from(3)));
        assert_eq!(changes.get("extra.comments").unwrap(), "none -> 3");
    }
}
