//! Run-scoped record of committed entities, and the rollback that undoes them.

use crate::error::MeshError;
use crate::store::{CanonicalStore, EntityKind, EntityRef};
use std::collections::BTreeMap;
use tracing::{error, info, warn};

/// Kinds in the order a rollback deletes them. Dependents come first.
pub const ROLLBACK_ORDER: [EntityKind; 9] = [
    EntityKind::Link,
    EntityKind::Vap,
    EntityKind::Ip,
    EntityKind::Interface,
    EntityKind::Device,
    EntityKind::RoutingProtocol,
    EntityKind::Node,
    EntityKind::Contact,
    EntityKind::User,
];

/// Entities committed by one migration run, per kind, in commit order.
///
/// A journal belongs to exactly one run. It is consumed by
/// [`RollbackManager::rollback`].
#[derive(Debug, Default)]
pub struct RollbackJournal {
    entries: BTreeMap<EntityKind, Vec<i64>>,
}

impl RollbackJournal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, kind: EntityKind, id: i64) {
        self.entries.entry(kind).or_default().push(id);
    }

    /// Ids committed for `kind`, oldest first.
    pub fn entries(&self, kind: EntityKind) -> &[i64] {
        self.entries.get(&kind).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A delete that failed during rollback.
#[derive(Debug)]
pub struct RollbackFailure {
    pub entity: EntityRef,
    pub error: MeshError,
}

/// Outcome of a rollback.
#[derive(Debug, Default)]
pub struct RollbackReport {
    pub deleted: BTreeMap<EntityKind, usize>,
    pub failures: Vec<RollbackFailure>,
}

impl RollbackReport {
    pub fn total_deleted(&self) -> usize {
        self.deleted.values().sum()
    }

    /// Whether every journaled entity is gone.
    pub fn is_complete(&self) -> bool {
        self.failures.is_empty()
    }
}

pub struct RollbackManager;

impl RollbackManager {
    /// Delete everything in `journal`, kind by kind in [`ROLLBACK_ORDER`],
    /// newest first within a kind.
    ///
    /// Deletion is best effort: a failed delete is logged and recorded, and
    /// the remaining entities are still deleted.
    pub fn rollback(store: &CanonicalStore, journal: RollbackJournal) -> RollbackReport {
        let mut report = RollbackReport::default();
        info!("Rolling back {} entities", journal.len());

        for kind in ROLLBACK_ORDER {
            for &id in journal.entries(kind).iter().rev() {
                let entity = EntityRef::new(kind, id);
                match store.delete(entity) {
                    Ok(()) => *report.deleted.entry(kind).or_default() += 1,
                    Err(e) => {
                        warn!("Could not delete {} during rollback: {}", entity, e);
                        report.failures.push(RollbackFailure { entity, error: e });
                    }
                }
            }
        }

        if report.is_complete() {
            info!("Rollback complete, {} entities deleted", report.total_deleted());
        } else {
            error!(
                "Rollback finished with {} failures, {} entities deleted",
                report.failures.len(),
                report.total_deleted()
            );
        }
        report
    }
}
