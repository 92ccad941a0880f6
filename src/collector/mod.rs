//! Resource Health collector
//!
//! One scrape runs one independent cycle:
//!
//! 1. `Fetching` - the subscription's availability snapshot, then every
//!    configured `(resource type, tag filter)` listing, in configuration order
//! 2. `Correlating` - join each listing with the snapshot; a resource listed
//!    by more than one configuration is kept once
//! 3. `Emitting` - turn correlated pairs into gauges
//!
//! All upstream calls happen before the first gauge is emitted, so a failing
//! call yields a single invalid-metric signal and nothing else.

pub mod exposition;
pub mod sink;

use crate::config::Config;
use crate::error::Result;
use crate::resource::{
    build_tag_labels, correlate, list_resources, parse_resource_id, HealthIndex, HealthRecord,
    HealthSource, LabelSet, ResourceDescriptor, ResourceSource,
};
use sink::{MetricSink, Sample, Scrape};
use std::collections::HashSet;
use std::sync::Arc;

pub const AVAILABILITY_UP_METRIC: &str = "azure_resource_health_availability_up";
const AVAILABILITY_UP_HELP: &str = "Resource health availability that relies on signals from different Azure services to assess whether a resource is healthy";

pub const TAG_INFO_METRIC: &str = "azure_tag_info";
const TAG_INFO_HELP: &str = "Tags of the Azure resource";

pub const RATELIMIT_REMAINING_METRIC: &str = "azure_resource_health_ratelimit_remaining_requests";
const RATELIMIT_REMAINING_HELP: &str =
    "Remaining subscription resource requests reported by the Resource Health API";

/// Phase of a collection cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleState {
    Fetching,
    Correlating,
    Emitting,
    Done,
    Failed,
}

/// Collects Resource Health metrics on demand
pub struct Collector {
    config: Arc<Config>,
    resources: Arc<dyn ResourceSource>,
    health: Arc<dyn HealthSource>,
}

impl Collector {
    pub fn new(
        config: Arc<Config>,
        resources: Arc<dyn ResourceSource>,
        health: Arc<dyn HealthSource>,
    ) -> Self {
        Self {
            config,
            resources,
            health,
        }
    }

    /// Run one cycle into a fresh buffer
    pub async fn scrape(&self) -> Result<Vec<Sample>> {
        let mut scrape = Scrape::new();
        self.collect(&mut scrape).await;
        scrape.into_result()
    }

    /// Run one cycle into `sink`, returning the terminal state
    pub async fn collect(&self, sink: &mut dyn MetricSink) -> CycleState {
        let mut state = CycleState::Fetching;
        tracing::debug!("Collection cycle: {:?}", state);

        let (snapshot, listings) = match self.fetch().await {
            Ok(fetched) => fetched,
            Err(err) => {
                tracing::error!("Collection cycle failed: {}", err);
                sink.invalid(err);
                return CycleState::Failed;
            }
        };

        transition(&mut state, CycleState::Correlating);
        let index = HealthIndex::new(&snapshot);
        let mut seen = HashSet::new();
        let correlated: Vec<(ResourceDescriptor, HealthRecord)> = listings
            .into_iter()
            .flat_map(|listing| correlate(listing, &index))
            .filter(|(resource, _)| {
                let first = seen.insert(resource.id.to_lowercase());
                if !first {
                    tracing::debug!("Resource {} already collected", resource.id);
                }
                first
            })
            .collect();

        transition(&mut state, CycleState::Emitting);
        let mut emitted = 0;
        for (resource, record) in &correlated {
            if self.emit_resource(sink, resource, record) {
                emitted += 1;
            }
        }
        self.emit_ratelimit(sink);

        transition(&mut state, CycleState::Done);
        tracing::info!(
            "Collected {} resources ({} statuses in snapshot)",
            emitted,
            index.len()
        );
        state
    }

    async fn fetch(&self) -> Result<(Vec<HealthRecord>, Vec<Vec<ResourceDescriptor>>)> {
        let snapshot = self.health.list_all().await?;
        tracing::debug!("Fetched {} availability statuses", snapshot.len());

        let mut listings = Vec::new();
        for (resource_type, tag_filter) in self.config.tracked_types() {
            listings.push(list_resources(self.resources.as_ref(), resource_type, tag_filter).await?);
        }

        Ok((snapshot, listings))
    }

    /// Emit the availability gauge (and tag info) for one resource.
    /// Returns false when the resource id cannot be parsed.
    fn emit_resource(
        &self,
        sink: &mut dyn MetricSink,
        resource: &ResourceDescriptor,
        record: &HealthRecord,
    ) -> bool {
        let parts = match parse_resource_id(&resource.id) {
            Ok(parts) => parts,
            Err(err) => {
                tracing::warn!("Skipping resource: {}", err);
                return false;
            }
        };

        let mut labels = parts.labels();
        labels.insert(
            "subscription_id".to_string(),
            self.health.subscription_id().to_string(),
        );
        labels.insert("resource_type".to_string(), resource.resource_type.clone());

        let tag_labels = self
            .config
            .expose_azure_tag_info
            .then(|| build_tag_labels(&resource.tags, &resource.resource_type, &labels));

        sink.gauge(Sample {
            name: AVAILABILITY_UP_METRIC,
            help: AVAILABILITY_UP_HELP,
            labels,
            value: record.state.up_value(),
        });

        if let Some(labels) = tag_labels {
            sink.gauge(Sample {
                name: TAG_INFO_METRIC,
                help: TAG_INFO_HELP,
                labels,
                value: 1.0,
            });
        }

        true
    }

    fn emit_ratelimit(&self, sink: &mut dyn MetricSink) {
        let Some(raw) = self.health.last_ratelimit_remaining() else {
            tracing::debug!("No rate limit header reported");
            return;
        };

        match raw.trim().parse::<f64>() {
            Ok(remaining) => {
                let mut labels = LabelSet::new();
                labels.insert(
                    "subscription_id".to_string(),
                    self.health.subscription_id().to_string(),
                );
                sink.gauge(Sample {
                    name: RATELIMIT_REMAINING_METRIC,
                    help: RATELIMIT_REMAINING_HELP,
                    labels,
                    value: remaining,
                });
            }
            Err(_) => tracing::debug!("Unparsable rate limit header: {:?}", raw),
        }
    }
}

fn transition(state: &mut CycleState, next: CycleState) {
    tracing::debug!("Collection cycle: {:?} -> {:?}", state, next);
    *state = next;
}
