//! Meshsync Core - legacy node migration and provider synchronization for
//! community mesh networks.
//!
//! Two pipelines share this crate:
//!
//! - [`migration`]: a one-time, operator-driven run that copies a legacy
//!   node dataset (users, nodes, devices, interfaces, links, contacts) into
//!   the [`CanonicalStore`], isolating bad records and rolling back the whole
//!   run on failure, interruption or rejection.
//! - [`sync`]: adapters that create, update and delete node records on
//!   external providers, one call at a time, each with its own session.
//!
//! # Example
//!
//! ```rust,no_run
//! use meshsync_core::{
//!     CanonicalStore, LegacyDataset, MigrationConfig, MigrationPipeline, ScriptedDecisions,
//! };
//!
//! fn main() -> meshsync_core::Result<()> {
//!     let store = CanonicalStore::open("canonical.sqlite")?;
//!     let legacy = LegacyDataset::from_json_file("legacy.json")?;
//!     let config = MigrationConfig::load("migration.json")?;
//!
//!     // Keep the result without asking.
//!     let mut decisions = ScriptedDecisions::new(["y"]);
//!     let outcome = MigrationPipeline::new(&store, config).run(&legacy, &mut decisions)?;
//!     println!("{}", outcome.report);
//!     Ok(())
//! }
//! ```

pub mod cancel;
pub mod config;
pub mod decision;
pub mod error;
pub mod geometry;
pub mod legacy;
pub mod migration;
pub mod store;
pub mod sync;

// Re-export commonly used types
pub use cancel::CancellationToken;
pub use config::{AdapterConfig, MigrationConfig};
pub use decision::{DecisionProvider, Question, ScriptedDecisions};
pub use error::{MeshError, Result};
pub use geometry::{GeoPoint, Polygon};
pub use legacy::{LegacyBatch, LegacyDataset, LegacySource, RejectedRow, SqliteLegacySource};
pub use migration::{
    MigrationOutcome, MigrationPipeline, MigrationReport, Phase, RollbackReason, RunDisposition,
};
pub use store::{CanonicalStore, EntityKind, EntityRef};
pub use sync::{
    CitySdkMobility, ConvertMode, Reconciler, SyncNode, SyncOutcome, SyncReport, Synchronizer,
    SynchronizerRegistry,
};
