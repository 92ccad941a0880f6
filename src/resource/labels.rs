//! Label Builder
//!
//! Prometheus label names must match `[a-zA-Z0-9_]+`; Azure tag names are
//! free-form, so they are lower-cased, prefixed and sanitized before use.

use std::collections::{BTreeMap, HashMap};

/// Label name to value, sorted by name
pub type LabelSet = BTreeMap<String, String>;

const TAG_LABEL_PREFIX: &str = "tag_";

fn is_label_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Replace every run of characters outside `[a-zA-Z0-9_]` with a single `_`
pub fn sanitize_label_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    let mut in_invalid_run = false;

    for c in name.chars() {
        if is_label_char(c) {
            out.push(c);
            in_invalid_run = false;
        } else if !in_invalid_run {
            out.push('_');
            in_invalid_run = true;
        }
    }

    out
}

/// Label name for an Azure tag, e.g. `Cost-Center` -> `tag_cost_center`
pub fn tag_label_name(tag_name: &str) -> String {
    sanitize_label_name(&format!("{}{}", TAG_LABEL_PREFIX, tag_name.to_lowercase()))
}

/// Labels for the tag-info gauge: `base` plus `resource_type` and one
/// `tag_*` label per tag.
///
/// Tags are applied in name order, so when two tag names sanitize to the same
/// label the lexicographically last one wins. `base` is left untouched.
pub fn build_tag_labels(
    tags: &HashMap<String, String>,
    resource_type: &str,
    base: &LabelSet,
) -> LabelSet {
    let mut labels = base.clone();
    labels.insert("resource_type".to_string(), resource_type.to_string());

    let sorted: BTreeMap<&String, &String> = tags.iter().collect();
    for (name, value) in sorted {
        labels.insert(tag_label_name(name), value.clone());
    }

    labels
}
