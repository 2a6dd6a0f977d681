use serde::{Deserialize, Serialize};
use std::fmt;

/// Repository migration status.
///
/// Covers the full lifecycle from discovery through dry run, production migration
/// and the terminal outcomes. Persisted as the snake_case name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum MigrationStatus {
    /// Discovered and idle
    #[default]
    Pending,
    DryRunQueued,
    DryRunInProgress,
    DryRunComplete,
    DryRunFailed,
    QueuedForMigration,
    PreMigration,
    ArchiveGenerating,
    MigratingContent,
    PostMigration,
    MigrationComplete,
    /// Migrated and verified
    Complete,
    MigrationFailed,
    RolledBack,
    /// Excluded from migration by an operator
    WontMigrate,
    RemediationRequired,
}

impl MigrationStatus {
    /// Every status, in lifecycle order.
    pub const ALL: [MigrationStatus; 16] = [
        Self::Pending,
        Self::DryRunQueued,
        Self::DryRunInProgress,
        Self::DryRunComplete,
        Self::DryRunFailed,
        Self::QueuedForMigration,
        Self::PreMigration,
        Self::ArchiveGenerating,
        Self::MigratingContent,
        Self::PostMigration,
        Self::MigrationComplete,
        Self::Complete,
        Self::MigrationFailed,
        Self::RolledBack,
        Self::WontMigrate,
        Self::RemediationRequired,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::DryRunQueued => "dry_run_queued",
            Self::DryRunInProgress => "dry_run_in_progress",
            Self::DryRunComplete => "dry_run_complete",
            Self::DryRunFailed => "dry_run_failed",
            Self::QueuedForMigration => "queued_for_migration",
            Self::PreMigration => "pre_migration",
            Self::ArchiveGenerating => "archive_generating",
            Self::MigratingContent => "migrating_content",
            Self::PostMigration => "post_migration",
            Self::MigrationComplete => "migration_complete",
            Self::Complete => "complete",
            Self::MigrationFailed => "migration_failed",
            Self::RolledBack => "rolled_back",
            Self::WontMigrate => "wont_migrate",
            Self::RemediationRequired => "remediation_required",
        }
    }

    /// Check if this is a terminal state (no further transitions expected)
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::WontMigrate)
    }

    /// Check if this is a failure state that may be retried
    pub fn is_failed(&self) -> bool {
        matches!(self, Self::DryRunFailed | Self::MigrationFailed)
    }

    /// Check if the repository is waiting in a queue
    pub fn is_queued(&self) -> bool {
        matches!(self, Self::DryRunQueued | Self::QueuedForMigration)
    }

    /// Check if a migration or dry run is actively executing
    pub fn is_active(&self) -> bool {
        matches!(
            self,
            Self::DryRunInProgress
                | Self::MigratingContent
                | Self::ArchiveGenerating
                | Self::PreMigration
                | Self::PostMigration
        )
    }

    /// Check if content has been moved to the destination
    pub fn is_migrated(&self) -> bool {
        matches!(self, Self::MigrationComplete | Self::Complete)
    }
}

impl fmt::Display for MigrationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for MigrationStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|status| status.as_str() == s)
            .ok_or_else(|| format!("Invalid migration status: {s}"))
    }
}
