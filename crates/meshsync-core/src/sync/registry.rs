//! Adapter construction by provider name.

use super::{CitySdkMobility, Synchronizer};
use crate::config::AdapterConfig;
use crate::error::{MeshError, Result};
use std::collections::BTreeMap;
use tracing::debug;

/// Builds an adapter from its settings.
pub type SynchronizerFactory = fn(AdapterConfig) -> Result<Box<dyn Synchronizer>>;

/// Known providers, keyed by the name used in [`AdapterConfig::provider`].
pub struct SynchronizerRegistry {
    factories: BTreeMap<String, SynchronizerFactory>,
}

impl SynchronizerRegistry {
    /// A registry without any provider.
    pub fn empty() -> Self {
        Self {
            factories: BTreeMap::new(),
        }
    }

    /// Register (or replace) a provider.
    pub fn register(&mut self, provider: impl Into<String>, factory: SynchronizerFactory) {
        self.factories.insert(provider.into(), factory);
    }

    /// Registered provider names, sorted.
    pub fn providers(&self) -> Vec<&str> {
        self.factories.keys().map(String::as_str).collect()
    }

    /// Construct the adapter named by `config.provider`.
    pub fn build(&self, config: AdapterConfig) -> Result<Box<dyn Synchronizer>> {
        let factory = self.factories.get(&config.provider).ok_or_else(|| {
            MeshError::config(format!(
                "Unknown provider '{}' (known: {})",
                config.provider,
                self.providers().join(", ")
            ))
        })?;
        debug!("Building synchronizer for {}", config.provider);
        factory(config)
    }
}

impl Default for SynchronizerRegistry {
    fn default() -> Self {
        let mut registry = Self::empty();
        registry.register(CitySdkMobility::PROVIDER, |config| {
            Ok(Box::new(CitySdkMobility::new(config)?))
        });
        registry
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_registry_knows_citysdk() {
        let registry = SynchronizerRegistry::default();
        assert_eq!(registry.providers(), vec!["citysdk_mobility"]);
    }

    #[test]
    fn test_unknown_provider_is_configuration_error() {
        let registry = SynchronizerRegistry::default();
        let err = registry
            .build(AdapterConfig::new("openlabor"))
            .err()
            .unwrap();
        assert!(err.is_configuration());
    }

    #[test]
    fn test_build_validates_settings() {
        let registry = SynchronizerRegistry::default();
        let err = registry
            .build(AdapterConfig::new(CitySdkMobility::PROVIDER))
            .err()
            .unwrap();
        assert!(err.is_configuration());
    }
}
