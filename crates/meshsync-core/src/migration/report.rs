//! Per-phase counts and failures of a migration run.

use crate::error::MeshError;
use std::fmt;
use tracing::{info, warn};

/// Migration phases, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Phase {
    Users,
    Nodes,
    Devices,
    Interfaces,
    Vaps,
    Ipv4,
    Ipv6,
    Links,
    Contacts,
}

impl Phase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Phase::Users => "users",
            Phase::Nodes => "nodes",
            Phase::Devices => "devices",
            Phase::Interfaces => "interfaces",
            Phase::Vaps => "wireless associations",
            Phase::Ipv4 => "ipv4 addresses",
            Phase::Ipv6 => "ipv6 addresses",
            Phase::Links => "links",
            Phase::Contacts => "contacts",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A record that could not be migrated.
#[derive(Debug)]
pub struct RecordFailure {
    /// Identifying key of the legacy record, e.g. `node #12` or an email.
    pub key: String,
    pub error: MeshError,
}

/// Counts for one phase.
///
/// `retrieved` counts legacy records considered by the phase. Each of them
/// ends up saved, skipped (left out on purpose) or failed.
#[derive(Debug)]
pub struct PhaseReport {
    pub phase: Phase,
    pub retrieved: usize,
    pub saved: usize,
    pub skipped: usize,
    pub failures: Vec<RecordFailure>,
}

impl PhaseReport {
    pub fn new(phase: Phase) -> Self {
        Self {
            phase,
            retrieved: 0,
            saved: 0,
            skipped: 0,
            failures: Vec::new(),
        }
    }

    pub fn failed(&self) -> usize {
        self.failures.len()
    }

    pub(crate) fn record_saved(&mut self) {
        self.retrieved += 1;
        self.saved += 1;
    }

    pub(crate) fn record_skipped(&mut self) {
        self.retrieved += 1;
        self.skipped += 1;
    }

    pub(crate) fn record_failure(&mut self, key: impl Into<String>, error: MeshError) {
        let key = key.into();
        warn!(phase = %self.phase, key = %key, "Record not migrated: {}", error);
        self.retrieved += 1;
        self.failures.push(RecordFailure { key, error });
    }

    pub(crate) fn log_summary(&self) {
        info!(
            phase = %self.phase,
            retrieved = self.retrieved,
            saved = self.saved,
            skipped = self.skipped,
            failed = self.failed(),
            "Phase complete"
        );
    }
}

impl fmt::Display for PhaseReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}: {} retrieved, {} saved, {} skipped, {} failed",
            self.phase,
            self.retrieved,
            self.saved,
            self.skipped,
            self.failed()
        )
    }
}

/// Reports of every phase that ran.
#[derive(Debug, Default)]
pub struct MigrationReport {
    pub phases: Vec<PhaseReport>,
}

impl MigrationReport {
    pub fn phase(&self, phase: Phase) -> Option<&PhaseReport> {
        self.phases.iter().find(|p| p.phase == phase)
    }

    pub fn total_saved(&self) -> usize {
        self.phases.iter().map(|p| p.saved).sum()
    }

    pub fn total_failed(&self) -> usize {
        self.phases.iter().map(PhaseReport::failed).sum()
    }

    pub(crate) fn push(&mut self, report: PhaseReport) {
        report.log_summary();
        self.phases.push(report);
    }
}

impl fmt::Display for MigrationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for report in &self.phases {
            writeln!(f, "{}", report)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_counts_add_up() {
        let mut report = PhaseReport::new(Phase::Nodes);
        report.record_saved();
        report.record_skipped();
        report.record_failure("node #3", MeshError::validation("lat", "out of range"));

        assert_eq!(report.retrieved, 3);
        assert_eq!(report.saved + report.skipped + report.failed(), report.retrieved);
        assert_eq!(
            report.to_string(),
            "nodes: 3 retrieved, 1 saved, 1 skipped, 1 failed"
        );
    }
}
