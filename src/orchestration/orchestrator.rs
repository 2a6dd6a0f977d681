//! # Migration Orchestrator
//!
//! The stateful controller over batches and repositories. Every public operation
//! is gated by the [`AuthorizationGate`] first, then reads current state from the
//! [`MigrationStore`], applies planner and state-machine decisions and writes back.
//!
//! Batch-wide fan-out (start, cancel, retry) processes members in store listing
//! order. Each member is an independent compare-and-set write, guarded by the batch
//! status it was started under; a failure on one member is logged and counted and
//! never aborts the rest of the batch. Batch status changes are compare-and-set as
//! well: of two racing starts only one claims the batch, and a cancel flips the
//! batch before resetting members so a start in flight stops queuing.

use super::types::*;
use crate::auth::{AuthorizationContext, AuthorizationGate};
use crate::config::OrchestrationConfig;
use crate::constants::{operations, status_groups, system};
use crate::error::{MigratorError, Result};
use crate::logging::{log_batch_operation, log_migration_operation};
use crate::models::{Batch, BatchStatus, MigrationApi, NewBatch, Repository};
use crate::planning::{bounded_limit, rank_pilot_candidates, WavePlan, WavePlanner};
use crate::state_machine::{queue_priority, MigrationIntent, MigrationStatus, TransitionGuard};
use crate::store::{MemberWrite, MigrationStore, RepositoryFilter};
use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use futures::stream::{self, StreamExt, TryStreamExt};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shared orchestration service. Cheap to clone.
#[derive(Clone)]
pub struct MigrationOrchestrator {
    pub(crate) store: Arc<dyn MigrationStore>,
    pub(crate) gate: AuthorizationGate,
    pub(crate) config: OrchestrationConfig,
}

impl std::fmt::Debug for MigrationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MigrationOrchestrator")
            .field("store", &"dyn MigrationStore")
            .field("config", &self.config)
            .finish()
    }
}

impl MigrationOrchestrator {
    pub fn new(store: Arc<dyn MigrationStore>, config: OrchestrationConfig) -> Self {
        Self {
            store,
            gate: AuthorizationGate::new(),
            config,
        }
    }

    pub fn with_defaults(store: Arc<dyn MigrationStore>) -> Self {
        Self::new(store, OrchestrationConfig::default())
    }

    pub fn config(&self) -> &OrchestrationConfig {
        &self.config
    }

    pub fn store(&self) -> &Arc<dyn MigrationStore> {
        &self.store
    }

    pub(crate) async fn load_batch(&self, batch_id: i64) -> Result<Batch> {
        self.store
            .get_batch(batch_id)
            .await?
            .ok_or_else(|| MigratorError::batch_not_found(batch_id))
    }

    pub(crate) async fn load_repository(&self, full_name: &str) -> Result<Repository> {
        self.store
            .get_repository(full_name)
            .await?
            .ok_or_else(|| MigratorError::repository_not_found(full_name))
    }

    // =========================================================================
    // Planning
    // =========================================================================

    pub async fn find_pilot_candidates(
        &self,
        context: Option<&AuthorizationContext>,
        params: FindPilotCandidatesParams,
    ) -> Result<PilotCandidates> {
        self.gate
            .authorize(operations::FIND_PILOT_CANDIDATES, context)?;
        self.run_find_pilot_candidates(params).await
    }

    pub(crate) async fn run_find_pilot_candidates(
        &self,
        params: FindPilotCandidatesParams,
    ) -> Result<PilotCandidates> {
        let limit = bounded_limit(
            params.limit,
            self.config.default_pilot_limit,
            self.config.max_pilot_limit,
        );
        let filter = RepositoryFilter {
            unbatched_only: true,
            ..RepositoryFilter::with_statuses(&[MigrationStatus::Pending])
        }
        .in_organization(params.organization.clone());

        let repositories = self.store.list_repositories(&filter).await?;
        let eligible = repositories.iter().filter(|r| !r.has_blockers()).count();
        let candidates = rank_pilot_candidates(&repositories, limit);

        debug!(
            organization = ?params.organization,
            eligible = eligible,
            returned = candidates.len(),
            "Pilot candidates ranked"
        );

        Ok(PilotCandidates {
            organization: params.organization,
            candidates,
            eligible,
        })
    }

    pub async fn plan_waves(
        &self,
        context: Option<&AuthorizationContext>,
        params: PlanWavesParams,
    ) -> Result<WavePlan> {
        self.gate.authorize(operations::PLAN_WAVES, context)?;
        self.run_plan_waves(params).await
    }

    pub(crate) async fn run_plan_waves(&self, params: PlanWavesParams) -> Result<WavePlan> {
        let filter = RepositoryFilter::with_statuses(status_groups::PLANNABLE_STATES)
            .in_organization(params.organization.clone());
        let repositories = self.store.list_repositories(&filter).await?;
        let names: Vec<String> = repositories.into_iter().map(|r| r.full_name).collect();

        let store = &self.store;
        let edges: Vec<(String, Vec<String>)> = stream::iter(names.iter())
            .map(|name| async move {
                let dependencies = store
                    .get_dependencies(name)
                    .await?
                    .into_iter()
                    .filter(|edge| edge.is_local)
                    .map(|edge| edge.dependency)
                    .collect::<Vec<_>>();
                Ok::<_, MigratorError>((name.clone(), dependencies))
            })
            .buffered(system::DEPENDENCY_FETCH_CONCURRENCY)
            .try_collect()
            .await?;
        let local_dependencies: HashMap<String, Vec<String>> = edges.into_iter().collect();

        let planner = WavePlanner::from_config(params.wave_size, &self.config);
        let plan = planner.plan(&names, &local_dependencies);

        info!(
            organization = ?params.organization,
            repositories = plan.total_repositories,
            waves = plan.waves.len(),
            forced_waves = plan.forced_waves,
            "Migration waves planned"
        );
        Ok(plan)
    }

    // =========================================================================
    // Batch configuration
    // =========================================================================

    pub async fn create_batch(
        &self,
        context: Option<&AuthorizationContext>,
        params: CreateBatchParams,
    ) -> Result<Batch> {
        self.gate.authorize(operations::CREATE_BATCH, context)?;
        self.run_create_batch(params).await
    }

    pub(crate) async fn run_create_batch(&self, params: CreateBatchParams) -> Result<Batch> {
        let name = params.name.trim();
        if name.is_empty() {
            return Err(MigratorError::validation("Batch name must not be empty"));
        }

        let mut seen = HashSet::new();
        let requested: Vec<String> = params
            .repositories
            .iter()
            .map(|repo| repo.trim().to_string())
            .filter(|repo| !repo.is_empty() && seen.insert(repo.clone()))
            .collect();
        if requested.is_empty() {
            return Err(MigratorError::validation(format!(
                "Batch '{name}' needs at least one repository"
            )));
        }

        let migration_api = params
            .migration_api
            .as_deref()
            .map(parse_migration_api)
            .transpose()?;

        let resolved = self.store.get_repositories_by_names(&requested).await?;
        if resolved.len() != requested.len() {
            let found: HashSet<&str> = resolved.iter().map(|r| r.full_name.as_str()).collect();
            let missing: Vec<&str> = requested
                .iter()
                .map(String::as_str)
                .filter(|name| !found.contains(name))
                .collect();
            return Err(MigratorError::NotFound {
                entity: "Repository",
                identifier: missing.join(", "),
            });
        }

        let moved: Vec<&str> = resolved
            .iter()
            .filter(|repo| repo.batch_id.is_some())
            .map(|repo| repo.full_name.as_str())
            .collect();
        if !moved.is_empty() {
            warn!(
                batch_name = %name,
                repositories = ?moved,
                "Repositories already in another batch will be moved"
            );
        }

        let batch = self
            .store
            .create_batch(
                NewBatch {
                    name: name.to_string(),
                    description: params.description,
                    batch_type: params.batch_type.unwrap_or_default(),
                    destination_org: normalize_org(params.destination_org),
                    migration_api,
                },
                &requested,
            )
            .await?;

        log_batch_operation(
            operations::CREATE_BATCH,
            batch.id,
            &batch.name,
            batch.status.as_str(),
            batch.repository_count as usize,
            0,
            0,
        );
        Ok(batch)
    }

    pub async fn configure_batch(
        &self,
        context: Option<&AuthorizationContext>,
        params: ConfigureBatchParams,
    ) -> Result<Batch> {
        self.gate.authorize(operations::CONFIGURE_BATCH, context)?;
        self.run_configure_batch(params).await
    }

    pub(crate) async fn run_configure_batch(&self, params: ConfigureBatchParams) -> Result<Batch> {
        if params.destination_org.is_none() && params.migration_api.is_none() {
            return Err(MigratorError::validation(
                "Provide destination_org and/or migration_api to configure a batch",
            ));
        }

        // Validate everything before touching the row.
        let migration_api = params
            .migration_api
            .as_deref()
            .map(parse_migration_api)
            .transpose()?;
        let destination_org = match params.destination_org {
            Some(org) => Some(normalize_org(Some(org)).ok_or_else(|| {
                MigratorError::validation("destination_org must not be empty")
            })?),
            None => None,
        };

        let mut batch = self.load_batch(params.batch_id).await?;
        if let Some(api) = migration_api {
            batch.migration_api = Some(api);
        }
        if let Some(org) = destination_org {
            batch.destination_org = Some(org);
        }
        self.store.update_batch(&batch).await?;

        info!(
            batch_id = batch.id,
            destination_org = ?batch.destination_org,
            migration_api = ?batch.migration_api,
            "Batch configured"
        );
        Ok(batch)
    }

    pub async fn schedule_batch(
        &self,
        context: Option<&AuthorizationContext>,
        params: ScheduleBatchParams,
    ) -> Result<Batch> {
        self.gate.authorize(operations::SCHEDULE_BATCH, context)?;
        self.run_schedule_batch(params).await
    }

    pub(crate) async fn run_schedule_batch(&self, params: ScheduleBatchParams) -> Result<Batch> {
        let scheduled_at = match params.scheduled_at.as_deref() {
            Some(raw) => parse_schedule_time(raw)?,
            None => Utc::now(),
        };

        let mut batch = self.load_batch(params.batch_id).await?;
        if batch.status == BatchStatus::InProgress {
            return Err(MigratorError::InvalidTransition(format!(
                "Batch {} is already in progress and cannot be rescheduled",
                batch.label()
            )));
        }

        let expected = batch.status;
        batch.scheduled_at = Some(scheduled_at);
        batch.status = BatchStatus::Scheduled;
        if !self.store.transition_batch_status(&batch, expected).await? {
            return Err(changed_concurrently(&batch));
        }

        info!(
            batch_id = batch.id,
            scheduled_at = %scheduled_at.to_rfc3339(),
            "Batch scheduled"
        );
        Ok(batch)
    }

    // =========================================================================
    // Execution control
    // =========================================================================

    pub async fn start_migration(
        &self,
        context: Option<&AuthorizationContext>,
        params: StartMigrationParams,
    ) -> Result<FanOutResult> {
        self.gate.authorize(operations::START_MIGRATION, context)?;
        self.run_start_migration(params).await
    }

    pub(crate) async fn run_start_migration(
        &self,
        params: StartMigrationParams,
    ) -> Result<FanOutResult> {
        match target(params.batch_id, params.repository, operations::START_MIGRATION)? {
            Target::Batch(batch_id) => self.start_batch(batch_id, params.dry_run).await,
            Target::Repository(name) => self.start_repository(&name, params.dry_run).await,
        }
    }

    async fn start_batch(&self, batch_id: i64, dry_run: bool) -> Result<FanOutResult> {
        let mut batch = self.load_batch(batch_id).await?;
        if batch.status == BatchStatus::InProgress {
            return Err(MigratorError::InvalidTransition(format!(
                "Batch {} is already in progress",
                batch.label()
            )));
        }

        let members = self.store.list_batch_repositories(batch_id).await?;
        if members.is_empty() {
            return Err(MigratorError::validation(format!(
                "Batch {} has no repositories",
                batch.label()
            )));
        }

        let expected = batch.status;
        batch.mark_started(dry_run, Utc::now());
        if !self.store.transition_batch_status(&batch, expected).await? {
            return Err(changed_concurrently(&batch));
        }

        let intent = MigrationIntent::queue(dry_run);
        let priority = queue_priority(batch.is_pilot());
        let mut result = FanOutResult {
            dry_run: Some(dry_run),
            ..FanOutResult::for_batch(batch)
        };

        let mut members = members.into_iter();
        while let Some(repo) = members.next() {
            let Ok(next) = TransitionGuard::next_status(repo.status, intent) else {
                debug!(
                    repository = %repo.full_name,
                    status = %repo.status,
                    intent = %intent,
                    "Repository not queueable; skipping"
                );
                result.skipped.push(repo.full_name);
                continue;
            };
            let guard = BatchStatus::InProgress;
            if !self
                .apply_member_transition(&mut result, guard, repo, next, Some(priority))
                .await
            {
                self.stop_fan_out(&mut result, members.by_ref()).await?;
                break;
            }
        }

        self.log_fan_out(operations::START_MIGRATION, &result);
        Ok(result)
    }

    async fn start_repository(&self, full_name: &str, dry_run: bool) -> Result<FanOutResult> {
        let repo = self.load_repository(full_name).await?;
        let intent = MigrationIntent::queue(dry_run);
        let next = TransitionGuard::next_status(repo.status, intent).map_err(|_| {
            MigratorError::InvalidTransition(format!(
                "Repository {} cannot be queued for {} from status {}",
                repo.full_name, intent, repo.status
            ))
        })?;

        self.transition_single(&repo, next).await?;
        log_migration_operation(
            operations::START_MIGRATION,
            &repo.full_name,
            repo.batch_id,
            next.as_str(),
            Some(if dry_run { "dry run" } else { "production" }),
        );

        Ok(FanOutResult {
            dry_run: Some(dry_run),
            succeeded: vec![repo.full_name.clone()],
            ..FanOutResult::for_repository(repo.full_name)
        })
    }

    pub async fn cancel_migration(
        &self,
        context: Option<&AuthorizationContext>,
        params: CancelMigrationParams,
    ) -> Result<FanOutResult> {
        self.gate.authorize(operations::CANCEL_MIGRATION, context)?;
        self.run_cancel_migration(params).await
    }

    pub(crate) async fn run_cancel_migration(
        &self,
        params: CancelMigrationParams,
    ) -> Result<FanOutResult> {
        match target(params.batch_id, params.repository, operations::CANCEL_MIGRATION)? {
            Target::Batch(batch_id) => self.cancel_batch(batch_id).await,
            Target::Repository(name) => self.cancel_repository(&name).await,
        }
    }

    async fn cancel_batch(&self, batch_id: i64) -> Result<FanOutResult> {
        // The batch is cancelled even when nothing was cancellable. Flipping it first
        // stops a start that is still queuing members.
        let batch = self.mark_batch_cancelled(batch_id).await?;
        let members = self.store.list_batch_repositories(batch_id).await?;
        let mut result = FanOutResult::for_batch(batch);

        let mut members = members.into_iter();
        while let Some(repo) = members.next() {
            let Ok(next) = TransitionGuard::next_status(repo.status, MigrationIntent::Cancel)
            else {
                result.skipped.push(repo.full_name);
                continue;
            };
            if !self
                .apply_member_transition(&mut result, BatchStatus::Cancelled, repo, next, None)
                .await
            {
                self.stop_fan_out(&mut result, members.by_ref()).await?;
                break;
            }
        }

        self.log_fan_out(operations::CANCEL_MIGRATION, &result);
        Ok(result)
    }

    async fn mark_batch_cancelled(&self, batch_id: i64) -> Result<Batch> {
        for _ in 0..system::BATCH_STATUS_CAS_ATTEMPTS {
            let mut batch = self.load_batch(batch_id).await?;
            if batch.status == BatchStatus::Cancelled {
                return Ok(batch);
            }
            let expected = batch.status;
            batch.status = BatchStatus::Cancelled;
            if self.store.transition_batch_status(&batch, expected).await? {
                return Ok(batch);
            }
        }

        let batch = self.load_batch(batch_id).await?;
        Err(changed_concurrently(&batch))
    }

    async fn cancel_repository(&self, full_name: &str) -> Result<FanOutResult> {
        let repo = self.load_repository(full_name).await?;
        let next =
            TransitionGuard::next_status(repo.status, MigrationIntent::Cancel).map_err(|_| {
                MigratorError::InvalidTransition(format!(
                    "Repository {} cannot be cancelled from status {}",
                    repo.full_name, repo.status
                ))
            })?;

        self.transition_single(&repo, next).await?;
        log_migration_operation(
            operations::CANCEL_MIGRATION,
            &repo.full_name,
            repo.batch_id,
            next.as_str(),
            None,
        );

        Ok(FanOutResult {
            succeeded: vec![repo.full_name.clone()],
            ..FanOutResult::for_repository(repo.full_name)
        })
    }

    pub async fn retry_batch_failures(
        &self,
        context: Option<&AuthorizationContext>,
        params: RetryBatchFailuresParams,
    ) -> Result<FanOutResult> {
        self.gate
            .authorize(operations::RETRY_BATCH_FAILURES, context)?;
        self.run_retry_batch_failures(params).await
    }

    pub(crate) async fn run_retry_batch_failures(
        &self,
        params: RetryBatchFailuresParams,
    ) -> Result<FanOutResult> {
        let batch = self.load_batch(params.batch_id).await?;
        let members = self.store.list_batch_repositories(batch.id).await?;
        let guard = batch.status;
        let mut result = FanOutResult::for_batch(batch);

        let mut members = members.into_iter();
        while let Some(repo) = members.next() {
            let Ok(next) = TransitionGuard::next_status(repo.status, MigrationIntent::Retry)
            else {
                result.skipped.push(repo.full_name);
                continue;
            };
            if !self
                .apply_member_transition(&mut result, guard, repo, next, None)
                .await
            {
                self.stop_fan_out(&mut result, members.by_ref()).await?;
                break;
            }
        }

        // A failed batch becomes pending again once its failures are reset.
        if let Some(batch) = result.batch.as_mut() {
            if batch.status == BatchStatus::Failed && !result.succeeded.is_empty() {
                batch.status = BatchStatus::Pending;
                if !self
                    .store
                    .transition_batch_status(batch, BatchStatus::Failed)
                    .await?
                {
                    result.batch = self.store.get_batch(params.batch_id).await?;
                }
            }
        }

        self.log_fan_out(operations::RETRY_BATCH_FAILURES, &result);
        Ok(result)
    }

    pub async fn update_repository_status(
        &self,
        context: Option<&AuthorizationContext>,
        params: UpdateRepositoryStatusParams,
    ) -> Result<StatusUpdate> {
        self.gate
            .authorize(operations::UPDATE_REPOSITORY_STATUS, context)?;
        self.run_update_repository_status(params).await
    }

    pub(crate) async fn run_update_repository_status(
        &self,
        params: UpdateRepositoryStatusParams,
    ) -> Result<StatusUpdate> {
        let repo = self.load_repository(&params.repository).await?;
        TransitionGuard::check_forced(repo.status, params.status).map_err(|err| {
            MigratorError::InvalidTransition(format!("{}: {err}", repo.full_name))
        })?;

        self.transition_single(&repo, params.status).await?;
        warn!(
            repository = %repo.full_name,
            from = %repo.status,
            to = %params.status,
            reason = ?params.reason,
            audit = true,
            "Repository status forced"
        );

        Ok(StatusUpdate {
            repository: repo.full_name,
            previous_status: repo.status,
            status: params.status,
            reason: params.reason,
        })
    }

    // =========================================================================
    // Helpers
    // =========================================================================

    /// Compare-and-set one member during fan-out and record the outcome. Returns
    /// false once the batch has left `batch_status`; no further member may be written.
    async fn apply_member_transition(
        &self,
        result: &mut FanOutResult,
        batch_status: BatchStatus,
        repo: Repository,
        next: MigrationStatus,
        priority: Option<i32>,
    ) -> bool {
        let Some(batch_id) = result.batch.as_ref().map(|batch| batch.id) else {
            return false;
        };

        match self
            .store
            .transition_batch_member(
                batch_id,
                batch_status,
                &repo.full_name,
                repo.status,
                next,
                priority,
            )
            .await
        {
            Ok(MemberWrite::Written) => {
                result.succeeded.push(repo.full_name);
                true
            }
            Ok(MemberWrite::StatusChanged) => {
                debug!(
                    repository = %repo.full_name,
                    expected = %repo.status,
                    "Status changed concurrently; skipping"
                );
                result.skipped.push(repo.full_name);
                true
            }
            Ok(MemberWrite::BatchChanged) => {
                result.skipped.push(repo.full_name);
                false
            }
            Err(err) => {
                warn!(
                    repository = %repo.full_name,
                    target_status = %next,
                    error = %err,
                    "Repository update failed; continuing with remaining repositories"
                );
                result.failed.push(ItemFailure {
                    repository: repo.full_name,
                    error: err.to_string(),
                });
                true
            }
        }
    }

    /// Another writer moved the batch on; count the rest as skipped and report the
    /// batch as it now stands.
    async fn stop_fan_out(
        &self,
        result: &mut FanOutResult,
        remaining: impl Iterator<Item = Repository>,
    ) -> Result<()> {
        let remaining: Vec<String> = remaining.map(|repo| repo.full_name).collect();
        if let Some(batch) = result.batch.as_ref() {
            info!(
                batch_id = batch.id,
                expected_status = %batch.status,
                not_processed = remaining.len(),
                "Batch status changed concurrently; stopping fan-out"
            );
        }
        result.skipped.extend(remaining);
        if let Some(batch_id) = result.batch.as_ref().map(|batch| batch.id) {
            result.batch = self.store.get_batch(batch_id).await?;
        }
        Ok(())
    }

    /// Compare-and-set a single repository outside the batch path.
    async fn transition_single(&self, repo: &Repository, next: MigrationStatus) -> Result<()> {
        let written = self
            .store
            .transition_repository_status(&repo.full_name, repo.status, next, None)
            .await?;
        if !written {
            return Err(MigratorError::InvalidTransition(format!(
                "Repository {} changed status while the request was processed; retry the operation",
                repo.full_name
            )));
        }
        Ok(())
    }

    fn log_fan_out(&self, operation: &str, result: &FanOutResult) {
        if let Some(batch) = &result.batch {
            log_batch_operation(
                operation,
                batch.id,
                &batch.name,
                batch.status.as_str(),
                result.succeeded.len(),
                result.skipped.len(),
                result.failed.len(),
            );
        }
    }
}

enum Target {
    Batch(i64),
    Repository(String),
}

fn target(batch_id: Option<i64>, repository: Option<String>, operation: &str) -> Result<Target> {
    let repository = repository
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty());
    match (batch_id, repository) {
        (Some(batch_id), None) => Ok(Target::Batch(batch_id)),
        (None, Some(name)) => Ok(Target::Repository(name)),
        (Some(_), Some(_)) => Err(MigratorError::validation(format!(
            "{operation} takes either batch_id or repository, not both"
        ))),
        (None, None) => Err(MigratorError::validation(format!(
            "{operation} requires batch_id or repository"
        ))),
    }
}

fn changed_concurrently(batch: &Batch) -> MigratorError {
    MigratorError::InvalidTransition(format!(
        "Batch {} changed status while the request was processed; reload it and retry",
        batch.label()
    ))
}

fn parse_migration_api(raw: &str) -> Result<MigrationApi> {
    raw.parse::<MigrationApi>().map_err(|err| {
        MigratorError::validation(format!(
            "{err}; supported: {}",
            system::SUPPORTED_MIGRATION_APIS.join(", ")
        ))
    })
}

fn normalize_org(org: Option<String>) -> Option<String> {
    org.map(|org| org.trim().to_string())
        .filter(|org| !org.is_empty())
}

/// RFC 3339, `YYYY-MM-DD HH:MM:SS` / `YYYY-MM-DDTHH:MM:SS` (UTC), or a bare date
/// (midnight UTC).
pub(crate) fn parse_schedule_time(raw: &str) -> Result<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(raw) {
        return Ok(timestamp.with_timezone(&Utc));
    }
    for format in ["%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M:%S"] {
        if let Ok(naive) = NaiveDateTime::parse_from_str(raw, format) {
            return Ok(naive.and_utc());
        }
    }
    if let Ok(date) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        if let Some(midnight) = date.and_hms_opt(0, 0, 0) {
            return Ok(midnight.and_utc());
        }
    }
    Err(MigratorError::validation(format!(
        "Invalid schedule time '{raw}' (expected RFC 3339 timestamp or YYYY-MM-DD)"
    )))
}
