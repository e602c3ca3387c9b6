//! One-time migration of a legacy dataset into the canonical store.
//!
//! A run goes through users, nodes, devices, interfaces (with their
//! wireless associations and addresses), links and contacts, in that order.
//! A record that fails is reported and skipped; the phase goes on. Every
//! committed entity is written to a [`RollbackJournal`] so the whole run can
//! be undone when it fails, is interrupted, or is rejected by the operator.

mod journal;
mod pipeline;
mod report;
mod spatial;
mod status;
mod users;

pub use journal::{
    RollbackFailure, RollbackJournal, RollbackManager, RollbackReport, ROLLBACK_ORDER,
};
pub use pipeline::{MigrationOutcome, MigrationPipeline, RollbackReason, RunDisposition};
pub use report::{MigrationReport, Phase, PhaseReport, RecordFailure};
pub use spatial::{SpatialLayerResolver, ZoneAssignment};
pub use status::StatusMapper;
pub use users::{slugify, CandidateIdentity, GeneratedCredential, UserResolver};
