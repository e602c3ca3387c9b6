//! Read-only access to the legacy dataset.
//!
//! The migration pulls one record kind at a time, right before the phase
//! that consumes it. A row that cannot be read is handed over as a
//! [`RejectedRow`] next to the readable records, so the phase can report it
//! and carry on. Two sources are provided:
//! - [`SqliteLegacySource`]: a SQLite export of the legacy database, opened read-only
//! - [`LegacyDataset`]: an in-memory snapshot, also loadable from a JSON dump

mod records;
mod sqlite;

pub use records::{LegacyContact, LegacyDevice, LegacyInterface, LegacyLink, LegacyNode};
pub use sqlite::SqliteLegacySource;

use crate::error::{MeshError, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A legacy row that could not be turned into a record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectedRow {
    /// Legacy id, when the id column itself was readable.
    pub id: Option<i64>,
    /// Position of the row in the table scan, starting at 1.
    pub position: usize,
    pub reason: String,
}

impl RejectedRow {
    /// Report key, e.g. `node #12`, or `node row 3` without a readable id.
    pub fn key(&self, kind: &str) -> String {
        match self.id {
            Some(id) => format!("{} #{}", kind, id),
            None => format!("{} row {}", kind, self.position),
        }
    }
}

/// The records of one kind, plus the rows that could not be read.
#[derive(Debug, Clone, PartialEq)]
pub struct LegacyBatch<T> {
    pub records: Vec<T>,
    pub rejected: Vec<RejectedRow>,
}

impl<T> LegacyBatch<T> {
    /// Rows seen, readable or not.
    pub fn len(&self) -> usize {
        self.records.len() + self.rejected.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T> Default for LegacyBatch<T> {
    fn default() -> Self {
        Self {
            records: Vec::new(),
            rejected: Vec::new(),
        }
    }
}

impl<T> From<Vec<T>> for LegacyBatch<T> {
    fn from(records: Vec<T>) -> Self {
        Self {
            records,
            rejected: Vec::new(),
        }
    }
}

/// A source of legacy records.
///
/// An `Err` means the whole kind is unreadable (missing table, broken
/// database). Single bad rows go to [`LegacyBatch::rejected`].
pub trait LegacySource {
    fn nodes(&self) -> Result<LegacyBatch<LegacyNode>>;
    fn devices(&self) -> Result<LegacyBatch<LegacyDevice>>;
    fn interfaces(&self) -> Result<LegacyBatch<LegacyInterface>>;
    fn links(&self) -> Result<LegacyBatch<LegacyLink>>;
    fn contacts(&self) -> Result<LegacyBatch<LegacyContact>>;
}

/// An in-memory legacy snapshot.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LegacyDataset {
    pub nodes: Vec<LegacyNode>,
    pub devices: Vec<LegacyDevice>,
    pub interfaces: Vec<LegacyInterface>,
    pub links: Vec<LegacyLink>,
    pub contacts: Vec<LegacyContact>,
}

impl LegacyDataset {
    /// Load a snapshot from a JSON dump with one array per record kind.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| MeshError::io_with_path(e, path))?;
        serde_json::from_str(&content).map_err(|e| MeshError::Json {
            message: format!("Failed to parse legacy dump {}: {}", path.display(), e),
            source: Some(e),
        })
    }
}

impl LegacySource for LegacyDataset {
    fn nodes(&self) -> Result<LegacyBatch<LegacyNode>> {
        Ok(self.nodes.clone().into())
    }

    fn devices(&self) -> Result<LegacyBatch<LegacyDevice>> {
        Ok(self.devices.clone().into())
    }

    fn interfaces(&self) -> Result<LegacyBatch<LegacyInterface>> {
        Ok(self.interfaces.clone().into())
    }

    fn links(&self) -> Result<LegacyBatch<LegacyLink>> {
        Ok(self.links.clone().into())
    }

    fn contacts(&self) -> Result<LegacyBatch<LegacyContact>> {
        Ok(self.contacts.clone().into())
    }
}
