//! # System Constants
//!
//! Operation names and the default operational bounds of the migration orchestrator.

use crate::state_machine::MigrationStatus;

/// Names of the operations exposed to callers (human API and tool-call dispatchers)
pub mod operations {
    // Read-only queries
    pub const FIND_PILOT_CANDIDATES: &str = "find_pilot_candidates";
    pub const ANALYZE_REPOSITORIES: &str = "analyze_repositories";
    pub const CHECK_DEPENDENCIES: &str = "check_dependencies";
    pub const GET_COMPLEXITY_BREAKDOWN: &str = "get_complexity_breakdown";
    pub const GET_MIGRATION_STATUS: &str = "get_migration_status";
    pub const GET_MIGRATION_PROGRESS: &str = "get_migration_progress";
    pub const LIST_BATCHES: &str = "list_batches";

    // Self-service planning
    pub const PLAN_WAVES: &str = "plan_waves";
    pub const CREATE_BATCH: &str = "create_batch";
    pub const CONFIGURE_BATCH: &str = "configure_batch";
    pub const SCHEDULE_BATCH: &str = "schedule_batch";

    // Admin mutations
    pub const START_MIGRATION: &str = "start_migration";
    pub const CANCEL_MIGRATION: &str = "cancel_migration";
    pub const RETRY_BATCH_FAILURES: &str = "retry_batch_failures";
    pub const UPDATE_REPOSITORY_STATUS: &str = "update_repository_status";

    // Admin operations served outside the orchestration core but gated here
    pub const START_DISCOVERY: &str = "start_discovery";
    pub const UPDATE_TEAM_MAPPING: &str = "update_team_mapping";
    pub const UPDATE_USER_MAPPING: &str = "update_user_mapping";
    pub const SEND_MANNEQUIN_INVITATIONS: &str = "send_mannequin_invitations";
}

/// Operational bounds
pub mod system {
    pub const DEFAULT_WAVE_SIZE: usize = 10;
    pub const MAX_WAVE_SIZE: usize = 100;

    /// Safety bound on planner passes, independent of input size
    pub const MAX_PLANNING_PASSES: usize = 100;

    pub const DEFAULT_PILOT_LIMIT: usize = 10;
    pub const MAX_PILOT_LIMIT: usize = 50;

    /// Listing bound for `analyze_repositories`
    pub const DEFAULT_ANALYSIS_LIMIT: usize = 25;
    pub const MAX_ANALYSIS_LIMIT: usize = 200;

    /// Attempts at flipping a batch to cancelled while other writers race it
    pub const BATCH_STATUS_CAS_ATTEMPTS: usize = 5;

    /// Concurrent dependency lookups while planning waves
    pub const DEPENDENCY_FETCH_CONCURRENCY: usize = 8;

    pub const LICENSE_CACHE_TTL_SECONDS: u64 = 300;
    pub const LICENSE_CACHE_ERROR_TTL_SECONDS: u64 = 60;
    pub const LICENSE_CHECK_TIMEOUT_MS: u64 = 5_000;

    pub const SESSION_IDLE_TIMEOUT_SECONDS: u64 = 3_600;
    pub const CLI_PROBE_TIMEOUT_MS: u64 = 10_000;

    pub const SUPPORTED_MIGRATION_APIS: &[&str] = &["GEI", "ELM"];
}

/// Pilot scoring weights
pub mod scoring {
    pub const LOCAL_DEPENDENCY_WEIGHT: i64 = 10;
    pub const ARCHIVED_WEIGHT: i64 = 5;
    pub const FORK_WEIGHT: i64 = 5;

    // Complexity rating upper bounds (inclusive)
    pub const SIMPLE_MAX: i64 = 5;
    pub const MEDIUM_MAX: i64 = 10;
    pub const COMPLEX_MAX: i64 = 17;
}

/// Status groupings used by queries and batch operations
pub mod status_groups {
    use super::MigrationStatus;

    pub const PLANNABLE_STATES: &[MigrationStatus] = &[MigrationStatus::Pending];
}
