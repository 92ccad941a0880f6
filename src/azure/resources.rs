//! Azure Resources API
//!
//! Lists the subscription's resources of one type. Azure cannot combine type
//! and tag filters in one request, so only the type is filtered here.

use super::client::AzureClient;
use crate::error::Result;
use crate::resource::{ResourceDescriptor, ResourceSource};
use async_trait::async_trait;

const API_VERSION: &str = "2019-05-01";

/// Resource inventory client
#[derive(Clone)]
pub struct ResourcesClient {
    client: AzureClient,
}

impl ResourcesClient {
    pub fn new(client: AzureClient) -> Self {
        Self { client }
    }
}

/// `$filter` expression selecting one resource type
pub fn resource_type_filter(resource_type: &str) -> String {
    format!("resourceType eq '{}'", resource_type.replace('\'', "''"))
}

#[async_trait]
impl ResourceSource for ResourcesClient {
    async fn list(&self, resource_type: &str) -> Result<Vec<ResourceDescriptor>> {
        let filter = resource_type_filter(resource_type);
        let url = self
            .client
            .subscription_url("resources", API_VERSION, Some(&filter))?;

        let listing = self.client.list_all::<ResourceDescriptor>(&url).await?;
        tracing::debug!(
            "Listed {} resources of type {}",
            listing.items.len(),
            resource_type
        );

        Ok(listing.items)
    }
}
