//! # Migration Orchestration
//!
//! The batch lifecycle controller and its front door.
//!
//! ```text
//! caller -> execute(name, args, ctx) -> AuthorizationGate -> OperationRequest
//!        -> MigrationOrchestrator -> MigrationStore
//!        <- OperationResponse { payload, summary, suggestions, follow_up }
//! ```
//!
//! Typed callers can skip the dispatcher and call the gated methods on
//! [`MigrationOrchestrator`] directly.

pub mod dispatcher;
pub mod orchestrator;
pub mod queries;
pub mod types;

pub use orchestrator::MigrationOrchestrator;
pub use types::{
    AnalyzeRepositoriesParams, CancelMigrationParams, ComplexityBreakdown,
    ComplexityBreakdownParams, ConfigureBatchParams, CreateBatchParams, DependencyReport,
    FanOutResult, FindPilotCandidatesParams, FollowUp, ItemFailure, ListBatchesParams,
    MigrationProgressParams, OperationRequest, OperationResponse, PilotCandidates,
    PlanWavesParams, ProgressReport, RepositoryAnalysis, RepositoryParams,
    RepositoryStatusReport, RepositorySummary, RetryBatchFailuresParams, ScheduleBatchParams,
    StartMigrationParams, StatusUpdate, UpdateRepositoryStatusParams, ValidationCounts,
};
