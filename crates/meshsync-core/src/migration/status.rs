//! Legacy status code → canonical status.

use crate::config::MigrationDefaults;
use crate::error::{MeshError, Result};
use crate::store::Status;
use std::collections::BTreeMap;
use tracing::debug;

/// A status mapping checked against the store's statuses.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMapper {
    /// Legacy code → canonical status id. The default entry is kept apart.
    mapping: BTreeMap<String, i64>,
    default_status: i64,
}

impl StatusMapper {
    /// Validate `mapping` against the canonical statuses.
    ///
    /// Every target slug must name an existing status and the mapping must
    /// have a `default` entry. Without a mapping every code resolves to the
    /// store's default status.
    pub fn validate(
        mapping: Option<&BTreeMap<String, String>>,
        statuses: &[Status],
    ) -> Result<Self> {
        let Some(mapping) = mapping else {
            let default = statuses
                .iter()
                .find(|s| s.is_default)
                .or_else(|| statuses.first())
                .ok_or_else(|| {
                    MeshError::config("The canonical store has no status to assign to nodes")
                })?;
            debug!("No status mapping given, every node gets '{}'", default.slug);
            return Ok(Self {
                mapping: BTreeMap::new(),
                default_status: default.id,
            });
        };

        let lookup = |slug: &str| -> Result<i64> {
            statuses
                .iter()
                .find(|s| s.slug == slug)
                .map(|s| s.id)
                .ok_or_else(|| {
                    MeshError::config(format!(
                        "Status mapping refers to unknown status '{}'",
                        slug
                    ))
                })
        };

        let mut resolved = BTreeMap::new();
        let mut default_status = None;
        for (code, slug) in mapping {
            let id = lookup(slug)?;
            if code == MigrationDefaults::DEFAULT_MAPPING_KEY {
                default_status = Some(id);
            } else {
                resolved.insert(code.clone(), id);
            }
        }

        let default_status = default_status.ok_or_else(|| {
            MeshError::config(format!(
                "Status mapping has no '{}' entry",
                MigrationDefaults::DEFAULT_MAPPING_KEY
            ))
        })?;

        Ok(Self {
            mapping: resolved,
            default_status,
        })
    }

    /// Canonical status id for a legacy code, or the default one.
    pub fn resolve(&self, legacy_code: &str) -> i64 {
        self.mapping
            .get(legacy_code)
            .copied()
            .unwrap_or(self.default_status)
    }
}
