//! Azure Client
//!
//! Subscription-scoped Azure Resource Manager client combining authentication,
//! HTTP and `nextLink` paging.

use super::auth::AzureCredentials;
use super::http::{ApiResponse, ApiStatusError, AzureHttpClient};
use crate::error::{Error, Result};
use anyhow::Context;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use url::Url;

/// Public Azure Resource Manager endpoint
pub const MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";

/// Main Azure client
#[derive(Debug, Clone)]
pub struct AzureClient {
    pub credentials: AzureCredentials,
    pub http: AzureHttpClient,
    pub subscription_id: String,
    endpoint: String,
}

/// One page of an ARM list operation; items are decoded one by one
#[derive(Deserialize)]
struct Page {
    #[serde(default)]
    value: Vec<serde_json::Value>,
    #[serde(rename = "nextLink", default)]
    next_link: Option<String>,
}

/// All items of a paged listing
#[derive(Debug)]
pub struct Listing<T> {
    pub items: Vec<T>,
    /// Rate-limit header of the last page
    pub ratelimit_remaining: Option<String>,
}

impl AzureClient {
    /// Session for `subscription_id`; an empty subscription id is rejected
    pub fn new(subscription_id: &str, credentials: AzureCredentials) -> Result<Self> {
        if subscription_id.trim().is_empty() {
            return Err(Error::Session("Invalid subscription ID".to_string()));
        }

        let http = AzureHttpClient::new().map_err(|e| Error::Session(format!("{:#}", e)))?;

        Ok(Self {
            credentials,
            http,
            subscription_id: subscription_id.to_string(),
            endpoint: MANAGEMENT_ENDPOINT.to_string(),
        })
    }

    /// Session from `AZURE_SUBSCRIPTION_ID` and the client credential variables
    pub fn from_environment() -> Result<Self> {
        let subscription_id = std::env::var("AZURE_SUBSCRIPTION_ID").unwrap_or_default();
        if subscription_id.trim().is_empty() {
            return Err(Error::Session("Invalid subscription ID".to_string()));
        }

        let credentials = AzureCredentials::from_environment()?;
        Self::new(&subscription_id, credentials)
    }

    /// Point the client at another Resource Manager endpoint
    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.trim_end_matches('/').to_string();
        self
    }

    /// Make an authenticated GET request.
    ///
    /// A 401 drops the cached token, so the next request authenticates again.
    pub async fn get(&self, url: &str) -> anyhow::Result<ApiResponse> {
        let token = self.credentials.get_token().await?;
        let result = self.http.get(url, &token).await;

        if let Err(err) = &result {
            if ApiStatusError::is_unauthorized(err) && self.credentials.invalidate().await {
                tracing::warn!("Access token rejected, it will be renewed on the next request");
            }
        }

        result
    }

    /// Build a subscription-scoped URL with `api-version` and optional `$filter`
    pub fn subscription_url(
        &self,
        path: &str,
        api_version: &str,
        filter: Option<&str>,
    ) -> anyhow::Result<String> {
        let raw = format!(
            "{}/subscriptions/{}/{}",
            self.endpoint,
            self.subscription_id,
            path.trim_start_matches('/')
        );
        let mut url = Url::parse(&raw).with_context(|| format!("Invalid URL: {}", raw))?;

        {
            let mut query = url.query_pairs_mut();
            query.append_pair("api-version", api_version);
            if let Some(filter) = filter {
                query.append_pair("$filter", filter);
            }
        }

        Ok(url.to_string())
    }

    /// Fetch every page starting at `url`, following `nextLink`.
    ///
    /// Any failing page fails the whole listing; pages already fetched are dropped.
    /// Items that do not decode as `T` are skipped with a warning.
    pub async fn list_all<T: DeserializeOwned>(&self, url: &str) -> anyhow::Result<Listing<T>> {
        let mut items = Vec::new();
        let mut next = Some(url.to_string());
        let mut ratelimit_remaining = None;
        let mut pages = 0;

        while let Some(page_url) = next {
            let response = self.get(&page_url).await?;
            let page: Page =
                serde_json::from_value(response.body).context("Unexpected page format")?;

            items.extend(page.value.into_iter().filter_map(decode_item));
            ratelimit_remaining = response.ratelimit_remaining;
            next = page.next_link.filter(|link| !link.is_empty());
            pages += 1;
        }

        tracing::debug!("Fetched {} items in {} pages", items.len(), pages);

        Ok(Listing {
            items,
            ratelimit_remaining,
        })
    }
}

fn decode_item<T: DeserializeOwned>(item: serde_json::Value) -> Option<T> {
    let id = item
        .get("id")
        .and_then(|id| id.as_str())
        .unwrap_or("<no id>")
        .to_string();

    match serde_json::from_value(item) {
        Ok(decoded) => Some(decoded),
        Err(err) => {
            tracing::warn!("Skipping malformed item {}: {}", id, err);
            None
        }
    }
}
