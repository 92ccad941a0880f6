//! Azure API interaction module
//!
//! REST clients for the two upstream APIs the collector depends on.
//!
//! # Module Structure
//!
//! - [`auth`] - Access tokens (client secret, username/password, managed identity) with caching
//! - [`http`] - HTTP utilities for REST API calls
//! - [`client`] - Subscription-scoped client with `nextLink` paging
//! - [`resources`] - Resource inventory, implements [`ResourceSource`](crate::resource::ResourceSource)
//! - [`health`] - Availability statuses, implements [`HealthSource`](crate::resource::HealthSource)
//!
//! # Example
//!
//! ```ignore
//! use azure_health_exporter::azure::{AzureClient, ResourceHealthClient};
//! use azure_health_exporter::resource::HealthSource;
//!
//! async fn example() -> azure_health_exporter::Result<()> {
//!     let client = AzureClient::from_environment()?;
//!     let statuses = ResourceHealthClient::new(client).list_all().await?;
//!     Ok(())
//! }
//! ```

pub mod auth;
pub mod client;
pub mod health;
pub mod http;
pub mod resources;

pub use auth::AzureCredentials;
pub use client::AzureClient;
pub use health::ResourceHealthClient;
pub use resources::ResourcesClient;
