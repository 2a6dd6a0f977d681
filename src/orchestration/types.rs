//! # Orchestration Types
//!
//! Typed parameters for every operation in the catalogue, the tagged request enum
//! front-ends deserialize tool calls into, and the structured results.

use crate::constants::operations;
use crate::error::{MigratorError, Result};
use crate::models::{Batch, BatchStatus, BatchType, DependencyEdge};
use crate::planning::PilotCandidate;
use crate::progress::ProgressSummary;
use crate::state_machine::MigrationStatus;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

fn default_dry_run() -> bool {
    true
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FindPilotCandidatesParams {
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalyzeRepositoriesParams {
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub status: Option<MigrationStatus>,
    #[serde(default)]
    pub limit: Option<usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryParams {
    pub repository: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ComplexityBreakdownParams {
    #[serde(default)]
    pub organization: Option<String>,
}

/// Progress of one batch or one repository. Exactly one must be given.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MigrationProgressParams {
    #[serde(default)]
    pub batch_id: Option<i64>,
    #[serde(default)]
    pub repository: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ListBatchesParams {
    #[serde(default)]
    pub status: Option<BatchStatus>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanWavesParams {
    #[serde(default)]
    pub organization: Option<String>,
    #[serde(default)]
    pub wave_size: Option<usize>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CreateBatchParams {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub batch_type: Option<BatchType>,
    #[serde(default)]
    pub repositories: Vec<String>,
    #[serde(default)]
    pub destination_org: Option<String>,
    /// `GEI` or `ELM`, any case
    #[serde(default)]
    pub migration_api: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ConfigureBatchParams {
    pub batch_id: i64,
    #[serde(default)]
    pub destination_org: Option<String>,
    #[serde(default)]
    pub migration_api: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScheduleBatchParams {
    pub batch_id: i64,
    /// RFC 3339 timestamp or bare `YYYY-MM-DD`; absent means now
    #[serde(default)]
    pub scheduled_at: Option<String>,
}

/// Target of a start or cancel: a whole batch or a single repository
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StartMigrationParams {
    #[serde(default)]
    pub batch_id: Option<i64>,
    #[serde(default)]
    pub repository: Option<String>,
    #[serde(default = "default_dry_run")]
    pub dry_run: bool,
}

impl Default for StartMigrationParams {
    fn default() -> Self {
        Self {
            batch_id: None,
            repository: None,
            dry_run: default_dry_run(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CancelMigrationParams {
    #[serde(default)]
    pub batch_id: Option<i64>,
    #[serde(default)]
    pub repository: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryBatchFailuresParams {
    pub batch_id: i64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UpdateRepositoryStatusParams {
    pub repository: String,
    pub status: MigrationStatus,
    #[serde(default)]
    pub reason: Option<String>,
}

/// One typed request per catalogue entry.
///
/// Serialized as `{"operation": "<name>", "arguments": {...}}`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "operation", content = "arguments", rename_all = "snake_case")]
pub enum OperationRequest {
    FindPilotCandidates(FindPilotCandidatesParams),
    AnalyzeRepositories(AnalyzeRepositoriesParams),
    CheckDependencies(RepositoryParams),
    GetComplexityBreakdown(ComplexityBreakdownParams),
    GetMigrationStatus(RepositoryParams),
    GetMigrationProgress(MigrationProgressParams),
    ListBatches(ListBatchesParams),
    PlanWaves(PlanWavesParams),
    CreateBatch(CreateBatchParams),
    ConfigureBatch(ConfigureBatchParams),
    ScheduleBatch(ScheduleBatchParams),
    StartMigration(StartMigrationParams),
    CancelMigration(CancelMigrationParams),
    RetryBatchFailures(RetryBatchFailuresParams),
    UpdateRepositoryStatus(UpdateRepositoryStatusParams),
}

impl OperationRequest {
    /// Build a request from a tool-call name and its JSON argument object. A null
    /// argument bag is treated as empty.
    pub fn from_tool_call(operation: &str, arguments: Value) -> Result<Self> {
        let arguments = match arguments {
            Value::Null => Value::Object(Default::default()),
            other => other,
        };
        serde_json::from_value(serde_json::json!({
            "operation": operation,
            "arguments": arguments,
        }))
        .map_err(|err| {
            MigratorError::validation(format!("Invalid arguments for '{operation}': {err}"))
        })
    }

    pub fn operation_name(&self) -> &'static str {
        use operations::*;

        match self {
            Self::FindPilotCandidates(_) => FIND_PILOT_CANDIDATES,
            Self::AnalyzeRepositories(_) => ANALYZE_REPOSITORIES,
            Self::CheckDependencies(_) => CHECK_DEPENDENCIES,
            Self::GetComplexityBreakdown(_) => GET_COMPLEXITY_BREAKDOWN,
            Self::GetMigrationStatus(_) => GET_MIGRATION_STATUS,
            Self::GetMigrationProgress(_) => GET_MIGRATION_PROGRESS,
            Self::ListBatches(_) => LIST_BATCHES,
            Self::PlanWaves(_) => PLAN_WAVES,
            Self::CreateBatch(_) => CREATE_BATCH,
            Self::ConfigureBatch(_) => CONFIGURE_BATCH,
            Self::ScheduleBatch(_) => SCHEDULE_BATCH,
            Self::StartMigration(_) => START_MIGRATION,
            Self::CancelMigration(_) => CANCEL_MIGRATION,
            Self::RetryBatchFailures(_) => RETRY_BATCH_FAILURES,
            Self::UpdateRepositoryStatus(_) => UPDATE_REPOSITORY_STATUS,
        }
    }

    /// Whether `operation` names an operation served by this crate
    pub fn is_known(operation: &str) -> bool {
        use operations::*;

        matches!(
            operation,
            FIND_PILOT_CANDIDATES
                | ANALYZE_REPOSITORIES
                | CHECK_DEPENDENCIES
                | GET_COMPLEXITY_BREAKDOWN
                | GET_MIGRATION_STATUS
                | GET_MIGRATION_PROGRESS
                | LIST_BATCHES
                | PLAN_WAVES
                | CREATE_BATCH
                | CONFIGURE_BATCH
                | SCHEDULE_BATCH
                | START_MIGRATION
                | CANCEL_MIGRATION
                | RETRY_BATCH_FAILURES
                | UPDATE_REPOSITORY_STATUS
        )
    }
}

/// Suggested next operation with default arguments
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FollowUp {
    pub operation: String,
    pub arguments: Value,
}

impl FollowUp {
    pub fn new(operation: &str, arguments: Value) -> Self {
        Self {
            operation: operation.to_string(),
            arguments,
        }
    }
}

/// Result envelope returned to every caller
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OperationResponse {
    pub operation: String,
    pub payload: Value,
    pub summary: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub suggestions: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub follow_up: Option<FollowUp>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PilotCandidates {
    pub organization: Option<String>,
    pub candidates: Vec<PilotCandidate>,
    /// Eligible repositories before the limit was applied
    pub eligible: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositorySummary {
    pub full_name: String,
    pub status: MigrationStatus,
    pub complexity_score: Option<i64>,
    pub batch_id: Option<i64>,
    pub has_blockers: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryAnalysis {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub archived: usize,
    pub forks: usize,
    pub with_blockers: usize,
    pub average_complexity: Option<f64>,
    /// Bounded listing in store order
    pub repositories: Vec<RepositorySummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyReport {
    pub repository: String,
    pub local: Vec<DependencyEdge>,
    pub external: Vec<DependencyEdge>,
    /// Tracked repositories that depend on this one
    pub dependents: Vec<String>,
    /// Local dependencies that have not finished migrating
    pub unmigrated_local: Vec<String>,
}

impl DependencyReport {
    pub fn is_ready(&self) -> bool {
        self.unmigrated_local.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValidationCounts {
    pub blocking_files: usize,
    pub oversized_commits: usize,
    pub oversized_repository: usize,
    pub long_refs: usize,
    pub large_file_warnings: usize,
    pub unvalidated: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComplexityBreakdown {
    pub organization: Option<String>,
    pub total: usize,
    /// Keyed by rating name; every rating is present
    pub by_rating: BTreeMap<String, usize>,
    pub unscored: usize,
    pub validation: ValidationCounts,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RepositoryStatusReport {
    pub repository: String,
    pub status: MigrationStatus,
    pub batch_id: Option<i64>,
    pub priority: i32,
    pub can_queue_dry_run: bool,
    pub can_queue_production: bool,
    pub cancellable: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgressReport {
    pub batch_id: Option<i64>,
    pub batch_name: Option<String>,
    pub batch_status: Option<BatchStatus>,
    pub repository: Option<String>,
    pub progress: ProgressSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFailure {
    pub repository: String,
    pub error: String,
}

/// Per-repository outcome of start, cancel and retry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FanOutResult {
    pub batch: Option<Batch>,
    pub repository: Option<String>,
    pub dry_run: Option<bool>,
    pub succeeded: Vec<String>,
    pub skipped: Vec<String>,
    pub failed: Vec<ItemFailure>,
}

impl FanOutResult {
    pub fn for_batch(batch: Batch) -> Self {
        Self {
            batch: Some(batch),
            ..Self::default()
        }
    }

    pub fn for_repository(repository: impl Into<String>) -> Self {
        Self {
            repository: Some(repository.into()),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub repository: String,
    pub previous_status: MigrationStatus,
    pub status: MigrationStatus,
    pub reason: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_tool_call_parses_into_typed_request() {
        let request = OperationRequest::from_tool_call(
            "start_migration",
            json!({ "batch_id": 4 }),
        )
        .unwrap();

        assert_eq!(
            request,
            OperationRequest::StartMigration(StartMigrationParams {
                batch_id: Some(4),
                repository: None,
                dry_run: true,
            })
        );
        assert_eq!(request.operation_name(), "start_migration");
    }

    #[test]
    fn test_null_arguments_are_an_empty_bag() {
        let request = OperationRequest::from_tool_call("list_batches", Value::Null).unwrap();
        assert_eq!(request, OperationRequest::ListBatches(ListBatchesParams::default()));
    }

    #[test]
    fn test_missing_required_argument_is_a_validation_error() {
        let err = OperationRequest::from_tool_call("configure_batch", json!({})).unwrap_err();
        assert!(matches!(err, MigratorError::Validation(_)));
        assert!(err.to_string().contains("configure_batch"));
    }

    #[test]
    fn test_every_variant_name_is_known() {
        let requests = [
            OperationRequest::FindPilotCandidates(Default::default()),
            OperationRequest::ListBatches(Default::default()),
            OperationRequest::RetryBatchFailures(RetryBatchFailuresParams { batch_id: 1 }),
            OperationRequest::UpdateRepositoryStatus(UpdateRepositoryStatusParams {
                repository: "acme/api".to_string(),
                status: MigrationStatus::Pending,
                reason: None,
            }),
        ];
        for request in requests {
            assert!(OperationRequest::is_known(request.operation_name()));
        }
        assert!(!OperationRequest::is_known("drop_everything"));
        assert!(!OperationRequest::is_known("start_discovery"));
    }

    #[test]
    fn test_request_serializes_adjacently_tagged() {
        let request = OperationRequest::RetryBatchFailures(RetryBatchFailuresParams { batch_id: 9 });
        assert_eq!(
            serde_json::to_value(&request).unwrap(),
            json!({ "operation": "retry_batch_failures", "arguments": { "batch_id": 9 } })
        );
    }
}
