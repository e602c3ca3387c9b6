//! Synchronization of local nodes with external providers.
//!
//! Each provider is one type implementing [`Synchronizer`]. Adapters are
//! built by name through the [`SynchronizerRegistry`] and driven by the
//! [`Reconciler`], which decides between create and update from the stored
//! [`ExternalRecordMapping`](crate::store::ExternalRecordMapping).

mod citysdk;
mod reconciler;
mod registry;
mod session;
mod traits;

pub use citysdk::CitySdkMobility;
pub use reconciler::{CallReport, Reconciler, SyncAction, SyncReport};
pub use registry::SynchronizerRegistry;
pub use session::{SessionCache, SyncSession};
pub use traits::Synchronizer;

use crate::geometry::GeoPoint;
use crate::store::AttributeMap;
use serde::{Deserialize, Serialize};

/// The view of a node an adapter works with.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncNode {
    pub id: i64,
    pub name: String,
    pub slug: String,
    pub geometry: GeoPoint,
    /// Canonical status slug.
    pub status: String,
    pub description: Option<String>,
    pub address: Option<String>,
    pub elevation: Option<f64>,
    /// Full name of the owning user.
    pub owner: Option<String>,
    pub data: AttributeMap,
    /// Provider-side id recorded for this node, if it was created remotely.
    pub external_id: Option<String>,
}

/// Whether an envelope creates a remote record or updates one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConvertMode {
    Create,
    Update,
}

impl ConvertMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ConvertMode::Create => "create",
            ConvertMode::Update => "update",
        }
    }
}

/// Result of one remote call.
///
/// Provider-side failures are values, not errors: a rejected call leaves
/// local state untouched and the caller moves on to the next node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    Applied,
    Rejected {
        status: Option<u16>,
        message: String,
    },
}

impl SyncOutcome {
    pub fn is_success(&self) -> bool {
        matches!(self, SyncOutcome::Applied)
    }
}
