//! Resource ID parsing
//!
//! Azure ids follow a fixed grammar:
//! `/subscriptions/<s>/resourceGroups/<g>/providers/<ns>/<type>/<name>[/<sub-type>/<sub>]`.
//! Fields are taken by position, not by segment name.

use super::labels::LabelSet;
use crate::error::{Error, Result};

const RESOURCE_GROUP_POSITION: usize = 4;
const RESOURCE_NAME_POSITION: usize = 8;
const SUB_RESOURCE_NAME_POSITION: usize = 10;

/// Structural fields of a resource id
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceIdParts {
    pub resource_group: String,
    pub resource_name: String,
    pub sub_resource_name: Option<String>,
}

impl ResourceIdParts {
    /// Base label set: `resource_group`, `resource_name`, `sub_resource_name`
    pub fn labels(&self) -> LabelSet {
        let mut labels = LabelSet::new();
        labels.insert("resource_group".to_string(), self.resource_group.clone());
        labels.insert("resource_name".to_string(), self.resource_name.clone());
        if let Some(sub) = &self.sub_resource_name {
            labels.insert("sub_resource_name".to_string(), sub.clone());
        }
        labels
    }
}

/// Parse a resource id into its structural fields.
///
/// A segment at position 10 is a sub-resource name unless the segment right
/// after the resource name is `providers` (an extension resource such as an
/// availability status).
pub fn parse_resource_id(resource_id: &str) -> Result<ResourceIdParts> {
    let segments: Vec<&str> = resource_id.split('/').collect();

    if segments.len() < RESOURCE_NAME_POSITION + 1 {
        return Err(Error::Parse(resource_id.to_string()));
    }

    let sub_resource_name = if segments.len() > SUB_RESOURCE_NAME_POSITION
        && segments[RESOURCE_NAME_POSITION + 1] != "providers"
    {
        Some(segments[SUB_RESOURCE_NAME_POSITION].to_string())
    } else {
        None
    };

    Ok(ResourceIdParts {
        resource_group: segments[RESOURCE_GROUP_POSITION].to_string(),
        resource_name: segments[RESOURCE_NAME_POSITION].to_string(),
        sub_resource_name,
    })
}
