use serde::{Deserialize, Serialize};
use std::fmt;

/// Operator intents that can move a repository between statuses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MigrationIntent {
    /// Queue a non-destructive rehearsal
    DryRun,
    /// Queue the data-moving migration
    Production,
    /// Return a queued or not-yet-finished repository to pending
    Cancel,
    /// Reset a failed repository to pending
    Retry,
}

impl MigrationIntent {
    /// Get a string representation of the intent for logging
    pub fn intent_type(&self) -> &'static str {
        match self {
            Self::DryRun => "dry_run",
            Self::Production => "production",
            Self::Cancel => "cancel",
            Self::Retry => "retry",
        }
    }

    /// Queue intent for the given dry-run flag.
    pub fn queue(dry_run: bool) -> Self {
        if dry_run {
            Self::DryRun
        } else {
            Self::Production
        }
    }

    pub fn is_queue(&self) -> bool {
        matches!(self, Self::DryRun | Self::Production)
    }
}

impl fmt::Display for MigrationIntent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.intent_type())
    }
}
