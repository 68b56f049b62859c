// recovery.rs - Reuse artifacts left on disk by an interrupted invocation

use crate::jobs::{ComparisonUnit, JobState};

/// Planned units split by whether their artifact already exists.
///
/// Every unit stays in `units` (the ingestion list); only the pending ones
/// are handed to a scheduler.
#[derive(Debug, Clone, Default)]
pub struct Reconciliation {
    pub units: Vec<ComparisonUnit>,
}

impl Reconciliation {
    /// Units that still need their jobs executed
    pub fn to_run(&self) -> impl Iterator<Item = &ComparisonUnit> {
        self.units.iter().filter(|u| u.state == JobState::Pending)
    }

    pub fn pending_count(&self) -> usize {
        self.to_run().count()
    }

    pub fn satisfied_count(&self) -> usize {
        self.units
            .iter()
            .filter(|u| u.state == JobState::Satisfied)
            .count()
    }
}

/// Classifies planned units as already produced or still to run.
///
/// File presence is the only completion signal: a truncated artifact from a
/// killed job is indistinguishable from a finished one.
#[derive(Debug, Clone, Copy)]
pub struct RecoveryReconciler {
    enabled: bool,
}

impl RecoveryReconciler {
    pub fn new(enabled: bool) -> Self {
        Self { enabled }
    }

    pub fn reconcile(&self, units: Vec<ComparisonUnit>) -> Reconciliation {
        let units = units
            .into_iter()
            .map(|mut unit| {
                unit.state = if self.enabled && unit.artifact.is_file() {
                    JobState::Satisfied
                } else {
                    JobState::Pending
                };
                unit
            })
            .collect();
        Reconciliation { units }
    }
}
