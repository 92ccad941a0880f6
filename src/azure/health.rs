//! Azure Resource Health API
//!
//! Fetches every availability status of the subscription in one paged
//! listing and remembers the remaining read quota Azure reported with it.

use super::client::AzureClient;
use crate::error::Result;
use crate::resource::{HealthRecord, HealthSource};
use async_trait::async_trait;
use std::sync::Mutex;

const API_VERSION: &str = "2017-07-01";

/// Resource Health client
pub struct ResourceHealthClient {
    client: AzureClient,
    last_ratelimit_remaining: Mutex<Option<String>>,
}

impl ResourceHealthClient {
    pub fn new(client: AzureClient) -> Self {
        Self {
            client,
            last_ratelimit_remaining: Mutex::new(None),
        }
    }
}

#[async_trait]
impl HealthSource for ResourceHealthClient {
    fn subscription_id(&self) -> &str {
        &self.client.subscription_id
    }

    async fn list_all(&self) -> Result<Vec<HealthRecord>> {
        let url = self.client.subscription_url(
            "providers/Microsoft.ResourceHealth/availabilityStatuses",
            API_VERSION,
            None,
        )?;

        let listing = self.client.list_all::<HealthRecord>(&url).await?;

        *self
            .last_ratelimit_remaining
            .lock()
            .unwrap_or_else(|e| e.into_inner()) = listing.ratelimit_remaining;

        Ok(listing.items)
    }

    fn last_ratelimit_remaining(&self) -> Option<String> {
        self.last_ratelimit_remaining
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}
