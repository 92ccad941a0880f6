//! Health Correlator
//!
//! Joins listed resources with one bulk availability snapshot. A resource's
//! status id is its own id plus [`AVAILABILITY_STATUS_ID_SUFFIX`]; ids are
//! compared case-insensitively.

use super::{HealthRecord, ResourceDescriptor};
use std::collections::HashMap;

/// Common suffix of every availability status id
pub const AVAILABILITY_STATUS_ID_SUFFIX: &str =
    "/providers/Microsoft.ResourceHealth/availabilityStatuses/current";

/// Snapshot indexed by lower-cased status id
pub struct HealthIndex<'a> {
    by_id: HashMap<String, &'a HealthRecord>,
}

impl<'a> HealthIndex<'a> {
    /// Index `records`; the first record wins when ids collide
    pub fn new(records: &'a [HealthRecord]) -> Self {
        let mut by_id = HashMap::with_capacity(records.len());
        for record in records {
            by_id.entry(record.id.to_lowercase()).or_insert(record);
        }
        Self { by_id }
    }

    /// Status reported for `resource`, if any
    pub fn lookup(&self, resource: &ResourceDescriptor) -> Option<&'a HealthRecord> {
        let status_id = format!("{}{}", resource.id, AVAILABILITY_STATUS_ID_SUFFIX).to_lowercase();
        self.by_id.get(&status_id).copied()
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

/// Pair each resource with its status. Resources without one are dropped.
pub fn correlate(
    resources: Vec<ResourceDescriptor>,
    index: &HealthIndex<'_>,
) -> Vec<(ResourceDescriptor, HealthRecord)> {
    resources
        .into_iter()
        .filter_map(|resource| match index.lookup(&resource) {
            Some(record) => Some((resource, record.clone())),
            None => {
                tracing::debug!("No availability status for {}", resource.id);
                None
            }
        })
        .collect()
}
