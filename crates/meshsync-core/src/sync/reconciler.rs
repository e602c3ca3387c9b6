//! Pushes local nodes through an adapter and keeps the id mappings current.

use super::{SyncOutcome, Synchronizer};
use crate::error::{MeshError, Result};
use crate::store::{CanonicalStore, ExternalRecordMapping};
use tracing::{info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncAction {
    Add,
    Change,
    Delete,
}

/// One adapter call and its result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallReport {
    pub action: SyncAction,
    /// Local node id, for add and change.
    pub node_id: Option<i64>,
    /// Node slug, or the external id for deletes.
    pub target: String,
    pub outcome: SyncOutcome,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub calls: Vec<CallReport>,
}

impl SyncReport {
    pub fn succeeded(&self) -> usize {
        self.calls.iter().filter(|c| c.outcome.is_success()).count()
    }

    pub fn failed(&self) -> usize {
        self.calls.len() - self.succeeded()
    }
}

/// Drives one adapter over a set of nodes.
///
/// Calls are issued one at a time. A call the provider rejects is reported
/// and the batch goes on; configuration and authentication errors stop it.
pub struct Reconciler<'a> {
    store: &'a CanonicalStore,
    adapter: &'a dyn Synchronizer,
}

impl<'a> Reconciler<'a> {
    pub fn new(store: &'a CanonicalStore, adapter: &'a dyn Synchronizer) -> Self {
        Self { store, adapter }
    }

    /// Create or update the remote record of every node in `node_ids`.
    pub async fn sync_nodes(&self, node_ids: &[i64]) -> Result<SyncReport> {
        let mut report = SyncReport::default();
        for &node_id in node_ids {
            report.calls.push(self.sync_node(node_id).await?);
        }
        info!(
            provider = self.adapter.provider(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            "Synchronization finished"
        );
        Ok(report)
    }

    /// Create the remote record of one node, or update it when a mapping exists.
    pub async fn sync_node(&self, node_id: i64) -> Result<CallReport> {
        let provider = self.adapter.provider();

        let node = match self.store.sync_node(provider, node_id) {
            Ok(node) => node,
            Err(e) if e.is_record_level() => {
                warn!(node_id, "Node cannot be synchronized: {}", e);
                return Ok(CallReport {
                    action: SyncAction::Add,
                    node_id: Some(node_id),
                    target: format!("node #{}", node_id),
                    outcome: rejected_locally(e),
                });
            }
            Err(e) => return Err(e),
        };

        let (action, result) = if node.external_id.is_some() {
            (SyncAction::Change, self.adapter.change(&node).await)
        } else {
            (SyncAction::Add, self.adapter.add(&node).await)
        };

        let outcome = match result {
            Ok(outcome) => outcome,
            Err(e) if e.is_configuration() => return Err(e),
            Err(e) => {
                warn!(node = %node.slug, "Node cannot be synchronized: {}", e);
                rejected_locally(e)
            }
        };

        if action == SyncAction::Add && outcome.is_success() {
            self.store.record_external_id(&ExternalRecordMapping {
                provider: provider.to_string(),
                node_id,
                external_id: node.slug.clone(),
            })?;
        }

        Ok(CallReport {
            action,
            node_id: Some(node_id),
            target: node.slug,
            outcome,
        })
    }

    /// Delete remote records and forget their mappings.
    pub async fn delete_records(&self, external_ids: &[String]) -> Result<SyncReport> {
        let provider = self.adapter.provider();
        let mut report = SyncReport::default();

        for external_id in external_ids {
            let outcome = self.adapter.delete(external_id).await?;
            if outcome.is_success() {
                self.store.remove_external_id(provider, external_id)?;
            }
            report.calls.push(CallReport {
                action: SyncAction::Delete,
                node_id: None,
                target: external_id.clone(),
                outcome,
            });
        }
        Ok(report)
    }
}

fn rejected_locally(error: MeshError) -> SyncOutcome {
    SyncOutcome::Rejected {
        status: None,
        message: error.to_string(),
    }
}
