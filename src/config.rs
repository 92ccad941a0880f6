//! Configuration Management
//!
//! The exporter configuration is a YAML file read once at startup and shared
//! read-only with the collector.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::Path;

/// One group of tracked resource types sharing a tag filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ResourceConfiguration {
    /// Azure resource types, e.g. `Microsoft.Web/sites`
    #[serde(default)]
    pub resource_types: Vec<String>,
    /// Tags a resource must carry (exact name and value); empty matches all
    #[serde(default)]
    pub resource_tags: HashMap<String, String>,
}

/// Exporter configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub resource_configurations: Vec<ResourceConfiguration>,
    /// Also export `azure_tag_info` for every correlated resource
    #[serde(default)]
    pub expose_azure_tag_info: bool,
}

impl Config {
    /// Load configuration from `path`.
    ///
    /// A missing file is not an error: the default (empty) configuration is used.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.is_file() {
            tracing::info!("Config file {:?} does not exist, using default values", path);
            return Ok(Self::default());
        }

        tracing::info!("Loading config file {:?}", path);
        let content = std::fs::read_to_string(path)
            .map_err(|e| Error::Config(format!("failed to read {:?}: {}", path, e)))?;

        Self::from_yaml(&content)
    }

    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Self =
            serde_yaml::from_str(content).map_err(|e| Error::Config(e.to_string()))?;

        tracing::info!(
            "Config loaded: {} resource configurations, tag info {}",
            config.resource_configurations.len(),
            if config.expose_azure_tag_info { "enabled" } else { "disabled" }
        );
        Ok(config)
    }

    /// `(resource type, tag filter)` pairs in configuration order
    pub fn tracked_types(&self) -> impl Iterator<Item = (&str, &HashMap<String, String>)> {
        self.resource_configurations.iter().flat_map(|rc| {
            rc.resource_types
                .iter()
                .map(move |t| (t.as_str(), &rc.resource_tags))
        })
    }
}
