use super::errors::{business_rule_violation, transition_not_allowed, GuardResult};
use super::events::MigrationIntent;
use super::states::MigrationStatus;

/// Whether a repository in `status` may be queued.
///
/// Idle and failed repositories may be queued either way. A completed dry run unlocks
/// exactly one production attempt and cannot be re-queued as another dry run.
pub fn can_queue_for_migration(status: MigrationStatus, dry_run: bool) -> bool {
    use MigrationStatus::*;

    match status {
        Pending | DryRunFailed | MigrationFailed | RolledBack => true,
        DryRunComplete => !dry_run,
        _ => false,
    }
}

/// Whether a repository in `status` may be cancelled back to pending.
///
/// `PostMigration` is not cancellable even though it is an in-progress phase.
pub fn is_cancellable(status: MigrationStatus) -> bool {
    use MigrationStatus::*;

    matches!(
        status,
        DryRunQueued
            | DryRunInProgress
            | QueuedForMigration
            | MigratingContent
            | ArchiveGenerating
            | PreMigration
    )
}

/// Whether a repository in `status` is reset by a failure retry.
pub fn is_retryable(status: MigrationStatus) -> bool {
    status.is_failed()
}

/// Transition table for repository statuses
#[derive(Debug)]
pub struct TransitionGuard;

impl TransitionGuard {
    /// Resolve the status a repository moves to when `intent` is applied, or reject it.
    pub fn next_status(
        from: MigrationStatus,
        intent: MigrationIntent,
    ) -> GuardResult<MigrationStatus> {
        let next = match intent {
            MigrationIntent::DryRun if can_queue_for_migration(from, true) => {
                MigrationStatus::DryRunQueued
            }
            MigrationIntent::Production if can_queue_for_migration(from, false) => {
                MigrationStatus::QueuedForMigration
            }
            MigrationIntent::Cancel if is_cancellable(from) => MigrationStatus::Pending,
            MigrationIntent::Retry if is_retryable(from) => MigrationStatus::Pending,
            _ => return Err(transition_not_allowed(from, intent)),
        };

        Ok(next)
    }

    /// Check an operator-forced status write. Any target is allowed except a no-op.
    pub fn check_forced(from: MigrationStatus, to: MigrationStatus) -> GuardResult<()> {
        if from == to {
            return Err(business_rule_violation(format!(
                "Repository is already in status {to}"
            )));
        }
        Ok(())
    }
}

/// Queue priority for batch-driven queuing: pilot batches run first.
pub fn queue_priority(is_pilot_batch: bool) -> i32 {
    if is_pilot_batch {
        1
    } else {
        0
    }
}
