//! # Batch Model
//!
//! A named group of repositories migrated together.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchStatus {
    #[default]
    Pending,
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
    Failed,
}

impl BatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Scheduled => "scheduled",
            Self::InProgress => "in_progress",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
            Self::Failed => "failed",
        }
    }
}

impl fmt::Display for BatchStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "scheduled" => Ok(Self::Scheduled),
            "in_progress" => Ok(Self::InProgress),
            "completed" => Ok(Self::Completed),
            "cancelled" => Ok(Self::Cancelled),
            "failed" => Ok(Self::Failed),
            _ => Err(format!("Invalid batch status: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum BatchType {
    #[default]
    Custom,
    /// Low-risk repositories used to validate the process; queued at higher priority
    Pilot,
}

impl BatchType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Custom => "custom",
            Self::Pilot => "pilot",
        }
    }
}

impl fmt::Display for BatchType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BatchType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "custom" => Ok(Self::Custom),
            "pilot" => Ok(Self::Pilot),
            _ => Err(format!("Invalid batch type: {s} (expected custom or pilot)")),
        }
    }
}

/// Destination-side migration API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MigrationApi {
    #[serde(rename = "GEI")]
    Gei,
    #[serde(rename = "ELM")]
    Elm,
}

impl MigrationApi {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Gei => "GEI",
            Self::Elm => "ELM",
        }
    }
}

impl fmt::Display for MigrationApi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MigrationApi {
    type Err = String;

    /// Case-insensitive; anything outside the closed set is rejected.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "GEI" => Ok(Self::Gei),
            "ELM" => Ok(Self::Elm),
            _ => Err(format!(
                "Invalid migration API '{s}' (expected GEI or ELM)"
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Batch {
    pub id: i64,
    pub name: String,
    pub description: Option<String>,
    pub batch_type: BatchType,
    pub status: BatchStatus,
    pub destination_org: Option<String>,
    pub migration_api: Option<MigrationApi>,
    pub scheduled_at: Option<DateTime<Utc>>,
    pub started_at: Option<DateTime<Utc>>,
    pub dry_run_started_at: Option<DateTime<Utc>>,
    pub last_dry_run_at: Option<DateTime<Utc>>,
    pub last_migration_attempt_at: Option<DateTime<Utc>>,
    /// Denormalized member count
    pub repository_count: i64,
    pub created_at: DateTime<Utc>,
}

impl Batch {
    pub fn is_pilot(&self) -> bool {
        self.batch_type == BatchType::Pilot
    }

    /// Stamp the start timestamps for a dry run or production start.
    pub fn mark_started(&mut self, dry_run: bool, now: DateTime<Utc>) {
        self.status = BatchStatus::InProgress;
        if dry_run {
            self.dry_run_started_at = Some(now);
            self.last_dry_run_at = Some(now);
        } else {
            self.started_at = Some(now);
            self.last_migration_attempt_at = Some(now);
        }
    }

    /// `'name' (id N)` for user-facing messages
    pub fn label(&self) -> String {
        format!("'{}' (id {})", self.name, self.id)
    }
}

/// Fields for a batch row the store has not assigned an id to yet
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewBatch {
    pub name: String,
    pub description: Option<String>,
    pub batch_type: BatchType,
    pub destination_org: Option<String>,
    pub migration_api: Option<MigrationApi>,
}

impl NewBatch {
    pub fn into_batch(self, id: i64, created_at: DateTime<Utc>) -> Batch {
        Batch {
            id,
            name: self.name,
            description: self.description,
            batch_type: self.batch_type,
            status: BatchStatus::Pending,
            destination_org: self.destination_org,
            migration_api: self.migration_api,
            scheduled_at: None,
            started_at: None,
            dry_run_started_at: None,
            last_dry_run_at: None,
            last_migration_attempt_at: None,
            repository_count: 0,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_migration_api_normalizes_case() {
        assert_eq!("gei".parse::<MigrationApi>(), Ok(MigrationApi::Gei));
        assert_eq!(" Elm ".parse::<MigrationApi>(), Ok(MigrationApi::Elm));
        assert!("SVN".parse::<MigrationApi>().is_err());
        assert!("".parse::<MigrationApi>().is_err());
    }

    #[test]
    fn test_migration_api_serde_is_uppercase() {
        assert_eq!(serde_json::to_string(&MigrationApi::Gei).unwrap(), "\"GEI\"");
    }

    #[test]
    fn test_mark_started_stamps_matching_pair() {
        let now = Utc::now();
        let new = NewBatch {
            name: "wave-1".to_string(),
            description: None,
            batch_type: BatchType::Custom,
            destination_org: None,
            migration_api: None,
        };

        let mut dry = new.clone().into_batch(1, now);
        dry.mark_started(true, now);
        assert_eq!(dry.status, BatchStatus::InProgress);
        assert_eq!(dry.dry_run_started_at, Some(now));
        assert_eq!(dry.last_dry_run_at, Some(now));
        assert!(dry.started_at.is_none());

        let mut prod = new.into_batch(2, now);
        prod.mark_started(false, now);
        assert_eq!(prod.started_at, Some(now));
        assert_eq!(prod.last_migration_attempt_at, Some(now));
        assert!(prod.dry_run_started_at.is_none());
    }

    #[test]
    fn test_batch_status_round_trip() {
        assert_eq!("in_progress".parse::<BatchStatus>(), Ok(BatchStatus::InProgress));
        assert_eq!(BatchStatus::Cancelled.to_string(), "cancelled");
        assert!("done".parse::<BatchStatus>().is_err());
    }
}
