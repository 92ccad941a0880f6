//! Prometheus exporter for Azure Resource Health
//!
//! Correlates the subscription's resource inventory with Resource Health
//! availability statuses and exposes one `up` gauge per tracked resource.

pub mod azure;
pub mod collector;
pub mod config;
pub mod error;
pub mod resource;
pub mod server;

pub use error::{Error, Result};

/// Version injected at compile time via EXPORTER_VERSION env var (set by CI/CD),
/// or the crate version for local builds.
pub const VERSION: &str = match option_env!("EXPORTER_VERSION") {
    Some(v) => v,
    None => env!("CARGO_PKG_VERSION"),
};
