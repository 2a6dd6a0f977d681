//! # Progress Aggregation
//!
//! Reduces a set of repository statuses into disjoint progress buckets.

use crate::state_machine::MigrationStatus;
use serde::{Deserialize, Serialize};

/// Bucketed repository counts plus completion percentage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProgressSummary {
    pub total: usize,
    pub pending: usize,
    pub queued: usize,
    pub in_progress: usize,
    pub completed: usize,
    pub failed: usize,
    pub skipped: usize,
    /// Statuses outside the six buckets (rolled back, remediation required)
    pub other: usize,
    pub percent_complete: f64,
}

impl ProgressSummary {
    pub fn is_finished(&self) -> bool {
        self.total > 0 && self.pending + self.queued + self.in_progress == 0
    }
}

/// Aggregate statuses into progress buckets. An empty input is 0% complete.
pub fn calculate_progress<I>(statuses: I) -> ProgressSummary
where
    I: IntoIterator<Item = MigrationStatus>,
{
    use MigrationStatus::*;

    let mut summary = ProgressSummary::default();

    for status in statuses {
        summary.total += 1;
        match status {
            Pending => summary.pending += 1,
            DryRunQueued | QueuedForMigration => summary.queued += 1,
            DryRunInProgress | MigratingContent | ArchiveGenerating | PreMigration
            | PostMigration => summary.in_progress += 1,
            DryRunComplete | MigrationComplete | Complete => summary.completed += 1,
            DryRunFailed | MigrationFailed => summary.failed += 1,
            WontMigrate => summary.skipped += 1,
            RolledBack | RemediationRequired => summary.other += 1,
        }
    }

    if summary.total > 0 {
        summary.percent_complete = summary.completed as f64 / summary.total as f64 * 100.0;
    }

    summary
}
