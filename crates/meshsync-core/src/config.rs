//! Configuration for meshsync.
//!
//! Constants live in unit structs grouped by concern. Runtime settings
//! (status mapping, default zone, provider credentials) are read from JSON
//! files supplied by the operator.

use crate::error::{MeshError, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use std::time::Duration;

/// Application-level constants.
pub struct AppConfig;

impl AppConfig {
    pub const USER_AGENT: &'static str = "meshsync/0.3";
}

/// Network-related configuration for provider adapters.
pub struct NetworkConfig;

impl NetworkConfig {
    pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(15);
    pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
    /// Spatial reference id of every geometry sent to a provider (WGS 84).
    pub const WGS84_SRID: u32 = 4326;
}

/// Fixed values applied while migrating legacy records.
pub struct MigrationDefaults;

impl MigrationDefaults {
    /// Legacy status code of nodes that were never confirmed by their owner.
    pub const UNCONFIRMED_STATUS: &'static str = "u";
    /// Legacy status codes that mark a node as a public hotspot.
    pub const HOTSPOT_STATUSES: &'static [&'static str] = &["h", "ah"];
    /// Key of the fallback entry in a status mapping.
    pub const DEFAULT_MAPPING_KEY: &'static str = "default";
    /// Length of the random credential generated for migrated users.
    pub const CREDENTIAL_LENGTH: usize = 16;
    pub const INTERFACE_NAME_MAX_CHARS: usize = 10;
    pub const USERNAME_MAX_CHARS: usize = 150;
    /// Access level given to links hidden in the legacy dataset.
    pub const HIDDEN_LINK_ACCESS_LEVEL: i64 = 3;
    pub const DEVICE_TYPE: &'static str = "radio";
}

/// Runtime settings of a migration run.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// Legacy status code → canonical status slug. Must contain a `default` entry.
    ///
    /// `None` keeps the store's default status on every node.
    pub status_mapping: Option<BTreeMap<String, String>>,
    /// Zone assigned to nodes outside every zone polygon, or chosen as the
    /// "use default" answer. Without one those nodes are discarded.
    pub default_zone: Option<i64>,
}

impl MigrationConfig {
    /// Load migration settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        load_json(path.as_ref())
    }
}

fn default_verify_ssl() -> bool {
    true
}

/// Settings of one synchronizer adapter.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdapterConfig {
    /// Registry name of the provider, e.g. `citysdk_mobility`.
    pub provider: String,
    /// Whether TLS certificates of the provider are verified.
    #[serde(default = "default_verify_ssl")]
    pub verify_ssl: bool,
    /// Provider-specific keys (endpoint, credentials, target collection).
    #[serde(default)]
    pub settings: BTreeMap<String, String>,
}

impl AdapterConfig {
    /// Create an adapter config with certificate verification enabled.
    pub fn new(provider: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            verify_ssl: true,
            settings: BTreeMap::new(),
        }
    }

    /// Builder-style setter for a provider key.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.settings.insert(key.into(), value.into());
        self
    }

    /// Load adapter settings from a JSON file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let config: AdapterConfig = load_json(path.as_ref())?;
        if config.provider.trim().is_empty() {
            return Err(MeshError::config(format!(
                "Adapter config {} has an empty provider",
                path.as_ref().display()
            )));
        }
        Ok(config)
    }

    /// Keys from `required` that are absent or blank.
    pub fn missing_keys<'a>(&self, required: &[&'a str]) -> Vec<&'a str> {
        required
            .iter()
            .copied()
            .filter(|key| {
                self.settings
                    .get(*key)
                    .map(|v| v.trim().is_empty())
                    .unwrap_or(true)
            })
            .collect()
    }

    /// Value of a required key.
    pub fn require(&self, key: &str) -> Result<&str> {
        match self.settings.get(key) {
            Some(value) if !value.trim().is_empty() => Ok(value.as_str()),
            _ => Err(MeshError::config(format!(
                "{}: missing required setting '{}'",
                self.provider, key
            ))),
        }
    }
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content =
        std::fs::read_to_string(path).map_err(|e| MeshError::io_with_path(e, path))?;

    serde_json::from_str(&content).map_err(|e| {
        MeshError::config(format!("Failed to parse {}: {}", path.display(), e))
    })
}
