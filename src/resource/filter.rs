//! Resource Lister
//!
//! Azure cannot filter the resources list by type and by tag in the same
//! request, so the type filter is sent upstream and tags are matched here.

use super::{ResourceDescriptor, ResourceSource};
use crate::error::Result;
use std::collections::HashMap;

/// Every `(name, value)` of `filter` must be present on `tags` with exactly
/// that value. A missing tag is a mismatch; an empty filter matches anything.
pub fn matches_tags(filter: &HashMap<String, String>, tags: &HashMap<String, String>) -> bool {
    filter
        .iter()
        .all(|(name, value)| tags.get(name).is_some_and(|v| v == value))
}

/// List resources of `resource_type` carrying every tag in `tag_filter`
pub async fn list_resources(
    source: &dyn ResourceSource,
    resource_type: &str,
    tag_filter: &HashMap<String, String>,
) -> Result<Vec<ResourceDescriptor>> {
    let listed = source.list(resource_type).await?;
    let total = listed.len();

    let kept: Vec<ResourceDescriptor> = listed
        .into_iter()
        .filter(|r| matches_tags(tag_filter, &r.tags))
        .collect();

    tracing::debug!(
        "Listed {} resources of type {}, {} match tag filter",
        total,
        resource_type,
        kept.len()
    );

    Ok(kept)
}
