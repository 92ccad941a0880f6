//! Resource abstraction layer
//!
//! Typed snapshots of Azure inventory items and their health, plus the pure
//! functions that turn them into labeled samples.
//!
//! # Architecture
//!
//! - [`id`] - Positional parsing of hierarchical resource identifiers
//! - [`labels`] - Label name sanitization and tag label sets
//! - [`filter`] - Client-side tag filtering over a [`ResourceSource`]
//! - [`correlate`] - Joins resources with a bulk health snapshot
//!
//! The two upstream APIs are reached through the [`ResourceSource`] and
//! [`HealthSource`] traits, so the collector can be exercised without Azure.

pub mod correlate;
pub mod filter;
pub mod id;
pub mod labels;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use std::collections::HashMap;

pub use correlate::{correlate, HealthIndex, AVAILABILITY_STATUS_ID_SUFFIX};
pub use filter::{list_resources, matches_tags};
pub use id::{parse_resource_id, ResourceIdParts};
pub use labels::{build_tag_labels, sanitize_label_name, tag_label_name, LabelSet};

/// Snapshot of one Azure resource, as returned by the resources list API
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ResourceDescriptor {
    pub id: String,
    #[serde(rename = "type")]
    pub resource_type: String,
    /// Tag names keep their original case
    #[serde(default, deserialize_with = "null_as_empty")]
    pub tags: HashMap<String, String>,
}

impl ResourceDescriptor {
    pub fn new(id: &str, resource_type: &str) -> Self {
        Self {
            id: id.to_string(),
            resource_type: resource_type.to_string(),
            tags: HashMap::new(),
        }
    }

    pub fn with_tag(mut self, name: &str, value: &str) -> Self {
        self.tags.insert(name.to_string(), value.to_string());
        self
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> std::result::Result<HashMap<String, String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<HashMap<String, String>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Resource Health availability classification
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum AvailabilityState {
    Available,
    Unavailable,
    Degraded,
    #[default]
    Unknown,
    /// A state string this exporter does not know about
    Other(String),
}

impl AvailabilityState {
    /// Exact, case-sensitive match of the API's wire value
    pub fn parse(value: &str) -> Self {
        match value {
            "Available" => Self::Available,
            "Unavailable" => Self::Unavailable,
            "Degraded" => Self::Degraded,
            "Unknown" => Self::Unknown,
            other => Self::Other(other.to_string()),
        }
    }

    /// `0.0` only for `Unavailable`, the one state that reliably means down.
    pub fn up_value(&self) -> f64 {
        match self {
            Self::Unavailable => 0.0,
            _ => 1.0,
        }
    }
}

impl<'de> Deserialize<'de> for AvailabilityState {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value = Option::<String>::deserialize(deserializer)?;
        Ok(value.as_deref().map(Self::parse).unwrap_or_default())
    }
}

/// Snapshot of one availability status
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HealthRecord {
    /// Resource id followed by [`AVAILABILITY_STATUS_ID_SUFFIX`]
    pub id: String,
    pub state: AvailabilityState,
}

impl HealthRecord {
    pub fn new(id: &str, state: AvailabilityState) -> Self {
        Self {
            id: id.to_string(),
            state,
        }
    }

    /// Build the record Resource Health would report for `resource_id`
    pub fn for_resource(resource_id: &str, state: AvailabilityState) -> Self {
        Self::new(
            &format!("{}{}", resource_id, AVAILABILITY_STATUS_ID_SUFFIX),
            state,
        )
    }
}

impl<'de> Deserialize<'de> for HealthRecord {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Properties {
            #[serde(default)]
            availability_state: AvailabilityState,
        }

        #[derive(Deserialize)]
        struct Raw {
            id: String,
            #[serde(default)]
            properties: Option<Properties>,
        }

        let raw = Raw::deserialize(deserializer)?;
        Ok(Self {
            id: raw.id,
            state: raw
                .properties
                .map(|p| p.availability_state)
                .unwrap_or_default(),
        })
    }
}

/// Inventory collaborator: lists resources of one type, filtered server-side
#[async_trait]
pub trait ResourceSource: Send + Sync {
    /// All resources of `resource_type`, across every page.
    /// Any page failure fails the whole listing.
    async fn list(&self, resource_type: &str) -> Result<Vec<ResourceDescriptor>>;
}

/// Health collaborator: one bulk snapshot of the subscription's statuses
#[async_trait]
pub trait HealthSource: Send + Sync {
    /// Subscription the statuses belong to
    fn subscription_id(&self) -> &str;

    /// Every availability status of the subscription
    async fn list_all(&self) -> Result<Vec<HealthRecord>>;

    /// Raw remaining-quota header from the last call, if the API sent one
    fn last_ratelimit_remaining(&self) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_up_value_only_zero_for_unavailable() {
        assert_eq!(AvailabilityState::Unavailable.up_value(), 0.0);
        assert_eq!(AvailabilityState::Available.up_value(), 1.0);
        assert_eq!(AvailabilityState::Degraded.up_value(), 1.0);
        assert_eq!(AvailabilityState::Unknown.up_value(), 1.0);
        assert_eq!(
            AvailabilityState::Other("Maintenance".to_string()).up_value(),
            1.0
        );
    }

    #[test]
    fn test_parse_is_case_sensitive() {
        assert_eq!(
            AvailabilityState::parse("unavailable"),
            AvailabilityState::Other("unavailable".to_string())
        );
        assert_eq!(AvailabilityState::parse("unavailable").up_value(), 1.0);
    }

    #[test]
    fn test_resource_deserializes_null_tags() {
        let resource: ResourceDescriptor = serde_json::from_value(json!({
            "id": "/subscriptions/S/resourceGroups/rg/providers/Microsoft.Web/sites/app",
            "name": "app",
            "type": "Microsoft.Web/sites",
            "tags": null
        }))
        .unwrap();

        assert_eq!(resource.resource_type, "Microsoft.Web/sites");
        assert!(resource.tags.is_empty());
    }

    #[test]
    fn test_resource_keeps_tag_case() {
        let resource: ResourceDescriptor = serde_json::from_value(json!({
            "id": "/subscriptions/S/resourceGroups/rg/providers/Microsoft.Web/sites/app",
            "type": "Microsoft.Web/sites",
            "tags": {"Env": "Prod"}
        }))
        .unwrap();

        assert_eq!(resource.tags.get("Env").map(String::as_str), Some("Prod"));
    }

    #[test]
    fn test_health_record_deserializes_state() {
        let record: HealthRecord = serde_json::from_value(json!({
            "id": "/subscriptions/S/resourceGroups/rg/providers/Microsoft.Web/sites/app/providers/Microsoft.ResourceHealth/availabilityStatuses/current",
            "name": "current",
            "properties": {"availabilityState": "Unavailable", "summary": "down"}
        }))
        .unwrap();

        assert_eq!(record.state, AvailabilityState::Unavailable);
    }

    #[test]
    fn test_health_record_without_properties_is_unknown() {
        let record: HealthRecord = serde_json::from_value(json!({"id": "x"})).unwrap();
        assert_eq!(record.state, AvailabilityState::Unknown);
    }
}
