//! # Operation Dispatcher
//!
//! Entry point for tool-call front-ends: gates the raw operation name, parses the
//! argument bag into an [`OperationRequest`], runs it and wraps the typed result in
//! an [`OperationResponse`] with a summary, suggestions and a follow-up hint.

use super::orchestrator::MigrationOrchestrator;
use super::types::*;
use crate::auth::{operation_tier, AuthorizationContext, SessionRegistry};
use crate::constants::operations;
use crate::error::{MigratorError, Result};
use crate::logging::log_error;
use crate::models::{Batch, BatchType};
use crate::planning::WavePlan;
use crate::state_machine::MigrationStatus;
use serde::Serialize;
use serde_json::{json, Value};
use tracing::debug;
use uuid::Uuid;

impl MigrationOrchestrator {
    /// Run a tool call by name. Unknown names are gated at Admin before being
    /// rejected, so callers without admin rights learn nothing about the catalogue.
    pub async fn execute(
        &self,
        operation: &str,
        arguments: Value,
        context: Option<&AuthorizationContext>,
    ) -> Result<OperationResponse> {
        self.gate.authorize(operation, context)?;

        if !OperationRequest::is_known(operation) {
            return Err(MigratorError::validation(format!(
                "Unknown operation '{operation}'"
            )));
        }

        let request = OperationRequest::from_tool_call(operation, arguments)?;
        self.dispatch(request).await
    }

    /// Run an already-typed request.
    pub async fn execute_request(
        &self,
        request: OperationRequest,
        context: Option<&AuthorizationContext>,
    ) -> Result<OperationResponse> {
        self.gate.authorize(request.operation_name(), context)?;
        self.dispatch(request).await
    }

    /// Run a tool call on behalf of a registered session. `None` runs without a
    /// context; an unknown or expired session id is denied.
    pub async fn execute_for_session(
        &self,
        sessions: &SessionRegistry,
        session_id: Option<Uuid>,
        operation: &str,
        arguments: Value,
    ) -> Result<OperationResponse> {
        let context = match session_id {
            Some(id) => {
                let context = sessions.get(&id).ok_or_else(|| MigratorError::Unauthorized {
                    operation: operation.to_string(),
                    required_tier: operation_tier(operation),
                })?;
                sessions.touch(&id);
                Some(context)
            }
            None => None,
        };
        self.execute(operation, arguments, context.as_ref()).await
    }

    async fn dispatch(&self, request: OperationRequest) -> Result<OperationResponse> {
        let operation = request.operation_name();
        debug!(operation = %operation, "Dispatching operation");

        // Caller mistakes are returned as-is; everything else is an operator concern.
        self.route(operation, request).await.inspect_err(|err| {
            if !err.is_client_error() {
                log_error(operation, "request", err);
            }
        })
    }

    async fn route(
        &self,
        operation: &'static str,
        request: OperationRequest,
    ) -> Result<OperationResponse> {
        let response = match request {
            OperationRequest::FindPilotCandidates(params) => {
                let result = self.run_find_pilot_candidates(params).await?;
                respond_pilot_candidates(operation, &result)?
            }
            OperationRequest::AnalyzeRepositories(params) => {
                let result = self.run_analyze_repositories(params).await?;
                respond(
                    operation,
                    &result,
                    format!(
                        "{} repositories analyzed: {} archived, {} forks, {} with blocking validation issues",
                        result.total, result.archived, result.forks, result.with_blockers
                    ),
                )?
                .with_follow_up(FollowUp::new(
                    operations::FIND_PILOT_CANDIDATES,
                    json!({}),
                ))
            }
            OperationRequest::CheckDependencies(params) => {
                let result = self.run_check_dependencies(params).await?;
                respond_dependencies(operation, &result)?
            }
            OperationRequest::GetComplexityBreakdown(params) => {
                let result = self.run_get_complexity_breakdown(params).await?;
                let ratings = result
                    .by_rating
                    .iter()
                    .map(|(rating, count)| format!("{count} {rating}"))
                    .collect::<Vec<_>>()
                    .join(", ");
                respond(
                    operation,
                    &result,
                    format!("{} repositories: {ratings}, {} unscored", result.total, result.unscored),
                )?
            }
            OperationRequest::GetMigrationStatus(params) => {
                let result = self.run_get_migration_status(params).await?;
                respond_status(operation, &result)?
            }
            OperationRequest::GetMigrationProgress(params) => {
                let result = self.run_get_migration_progress(params).await?;
                let subject = match (&result.repository, &result.batch_name) {
                    (Some(repository), _) => repository.clone(),
                    (None, Some(name)) => format!("Batch '{name}'"),
                    (None, None) => "Selection".to_string(),
                };
                let p = &result.progress;
                respond(
                    operation,
                    &result,
                    format!(
                        "{subject}: {:.1}% complete ({} completed, {} queued, {} in progress, {} failed, {} pending of {})",
                        p.percent_complete, p.completed, p.queued, p.in_progress, p.failed, p.pending, p.total
                    ),
                )?
                .with_suggestions(if p.failed > 0 {
                    vec![format!(
                        "{} repositories failed; retry_batch_failures resets them to pending",
                        p.failed
                    )]
                } else {
                    Vec::new()
                })
            }
            OperationRequest::ListBatches(params) => {
                let result = self.run_list_batches(params).await?;
                respond(operation, &result, format!("{} batches", result.len()))?
            }
            OperationRequest::PlanWaves(params) => {
                let result = self.run_plan_waves(params).await?;
                respond_wave_plan(operation, &result)?
            }
            OperationRequest::CreateBatch(params) => {
                let batch = self.run_create_batch(params).await?;
                respond_batch_created(operation, &batch)?
            }
            OperationRequest::ConfigureBatch(params) => {
                let batch = self.run_configure_batch(params).await?;
                respond(
                    operation,
                    &batch,
                    format!(
                        "Batch {} configured: destination {}, API {}",
                        batch.label(),
                        batch.destination_org.as_deref().unwrap_or("unset"),
                        batch.migration_api.map(|api| api.as_str()).unwrap_or("unset")
                    ),
                )?
                .with_follow_up(FollowUp::new(
                    operations::SCHEDULE_BATCH,
                    json!({ "batch_id": batch.id }),
                ))
            }
            OperationRequest::ScheduleBatch(params) => {
                let batch = self.run_schedule_batch(params).await?;
                let when = batch
                    .scheduled_at
                    .map(|at| at.to_rfc3339())
                    .unwrap_or_default();
                respond(
                    operation,
                    &batch,
                    format!("Batch {} scheduled for {when}", batch.label()),
                )?
                .with_follow_up(FollowUp::new(
                    operations::START_MIGRATION,
                    json!({ "batch_id": batch.id, "dry_run": true }),
                ))
            }
            OperationRequest::StartMigration(params) => {
                let result = self.run_start_migration(params).await?;
                respond_fan_out(operation, &result, "queued")?
            }
            OperationRequest::CancelMigration(params) => {
                let result = self.run_cancel_migration(params).await?;
                respond_fan_out(operation, &result, "cancelled")?
            }
            OperationRequest::RetryBatchFailures(params) => {
                let result = self.run_retry_batch_failures(params).await?;
                respond_fan_out(operation, &result, "reset to pending")?
            }
            OperationRequest::UpdateRepositoryStatus(params) => {
                let result = self.run_update_repository_status(params).await?;
                respond(
                    operation,
                    &result,
                    format!(
                        "{} moved from {} to {}",
                        result.repository, result.previous_status, result.status
                    ),
                )?
                .with_follow_up(FollowUp::new(
                    operations::GET_MIGRATION_STATUS,
                    json!({ "repository": result.repository }),
                ))
            }
        };

        Ok(response)
    }
}

impl OperationResponse {
    fn with_suggestions(mut self, suggestions: Vec<String>) -> Self {
        self.suggestions.extend(suggestions);
        self
    }

    fn with_follow_up(mut self, follow_up: FollowUp) -> Self {
        self.follow_up = Some(follow_up);
        self
    }
}

fn respond<T: Serialize>(operation: &str, payload: &T, summary: String) -> Result<OperationResponse> {
    Ok(OperationResponse {
        operation: operation.to_string(),
        payload: serde_json::to_value(payload)
            .map_err(|err| MigratorError::Internal(format!("Failed to encode {operation} result: {err}")))?,
        summary,
        suggestions: Vec::new(),
        follow_up: None,
    })
}

fn respond_pilot_candidates(operation: &str, result: &PilotCandidates) -> Result<OperationResponse> {
    if result.candidates.is_empty() {
        return Ok(respond(
            operation,
            result,
            "No pilot candidates: no pending, unbatched repositories without blocking issues".to_string(),
        )?
        .with_suggestions(vec![
            "Run analyze_repositories to see where repositories stand".to_string(),
        ]));
    }

    let names: Vec<&str> = result
        .candidates
        .iter()
        .map(|c| c.full_name.as_str())
        .collect();
    let response = respond(
        operation,
        result,
        format!(
            "{} pilot candidates (of {} eligible), lowest risk first: {}",
            names.len(),
            result.eligible,
            names.join(", ")
        ),
    )?;

    Ok(response
        .with_suggestions(vec![
            "Pilot batches are queued ahead of other batches".to_string(),
            "Run a dry run before any production migration".to_string(),
        ])
        .with_follow_up(FollowUp::new(
            operations::CREATE_BATCH,
            json!({
                "name": "Pilot",
                "batch_type": BatchType::Pilot,
                "repositories": names,
            }),
        )))
}

fn respond_dependencies(operation: &str, result: &DependencyReport) -> Result<OperationResponse> {
    let readiness = if result.is_ready() {
        "all local dependencies are migrated or untracked".to_string()
    } else {
        format!("waiting on {}", result.unmigrated_local.join(", "))
    };
    let response = respond(
        operation,
        result,
        format!(
            "{}: {} local and {} external dependencies, {} dependents; {readiness}",
            result.repository,
            result.local.len(),
            result.external.len(),
            result.dependents.len()
        ),
    )?;

    Ok(if result.is_ready() {
        response
    } else {
        response
            .with_suggestions(vec![
                "Plan waves so dependencies migrate first".to_string(),
            ])
            .with_follow_up(FollowUp::new(operations::PLAN_WAVES, json!({})))
    })
}

fn respond_status(operation: &str, result: &RepositoryStatusReport) -> Result<OperationResponse> {
    let mut suggestions = Vec::new();
    if result.can_queue_dry_run {
        suggestions.push("Ready for a dry run".to_string());
    } else if result.can_queue_production {
        suggestions.push("Dry run complete; ready for production migration".to_string());
    }
    if result.cancellable {
        suggestions.push("Can be cancelled back to pending".to_string());
    }

    let follow_up = if result.can_queue_dry_run || result.can_queue_production {
        Some(FollowUp::new(
            operations::START_MIGRATION,
            json!({
                "repository": result.repository,
                "dry_run": result.status != MigrationStatus::DryRunComplete,
            }),
        ))
    } else {
        None
    };

    let mut response = respond(
        operation,
        result,
        format!(
            "{} is {}{}",
            result.repository,
            result.status,
            result
                .batch_id
                .map(|id| format!(" (batch {id})"))
                .unwrap_or_default()
        ),
    )?
    .with_suggestions(suggestions);
    response.follow_up = follow_up;
    Ok(response)
}

fn respond_wave_plan(operation: &str, plan: &WavePlan) -> Result<OperationResponse> {
    let mut response = respond(
        operation,
        plan,
        format!(
            "{} repositories planned into {} waves of up to {}",
            plan.total_repositories,
            plan.waves.len(),
            plan.wave_size
        ),
    )?;

    if plan.has_forced_waves() {
        response.suggestions.push(format!(
            "{} waves were formed without dependency ordering because of dependency cycles; review them before migrating",
            plan.forced_waves
        ));
    }
    if let Some(first) = plan.waves.first() {
        response.follow_up = Some(FollowUp::new(
            operations::CREATE_BATCH,
            json!({
                "name": format!("Wave {}", first.number),
                "repositories": first.repositories,
            }),
        ));
    }
    Ok(response)
}

fn respond_batch_created(operation: &str, batch: &Batch) -> Result<OperationResponse> {
    let mut suggestions = Vec::new();
    let follow_up = if batch.migration_api.is_none() || batch.destination_org.is_none() {
        suggestions.push("Set the destination organization and migration API".to_string());
        FollowUp::new(
            operations::CONFIGURE_BATCH,
            json!({ "batch_id": batch.id, "migration_api": "GEI" }),
        )
    } else {
        FollowUp::new(operations::SCHEDULE_BATCH, json!({ "batch_id": batch.id }))
    };

    Ok(respond(
        operation,
        batch,
        format!(
            "Created {} batch {} with {} repositories",
            batch.batch_type,
            batch.label(),
            batch.repository_count
        ),
    )?
    .with_suggestions(suggestions)
    .with_follow_up(follow_up))
}

fn respond_fan_out(operation: &str, result: &FanOutResult, verb: &str) -> Result<OperationResponse> {
    let subject = match (&result.batch, &result.repository) {
        (Some(batch), _) => format!("Batch {}", batch.label()),
        (None, Some(repository)) => repository.clone(),
        (None, None) => "Selection".to_string(),
    };
    let mode = match result.dry_run {
        Some(true) => " (dry run)",
        Some(false) => " (production)",
        None => "",
    };
    let summary = format!(
        "{subject}{mode}: {} {verb}, {} skipped, {} failed",
        result.succeeded.len(),
        result.skipped.len(),
        result.failed.len()
    );

    let mut response = respond(operation, result, summary)?;
    if !result.failed.is_empty() {
        response.suggestions.push(format!(
            "Updates failed for {}; run the operation again to retry them",
            result
                .failed
                .iter()
                .map(|f| f.repository.as_str())
                .collect::<Vec<_>>()
                .join(", ")
        ));
    }
    if operation == operations::START_MIGRATION && !result.skipped.is_empty() {
        response
            .suggestions
            .push("Skipped repositories were not in a queueable status".to_string());
    }

    response.follow_up = match (&result.batch, &result.repository) {
        (Some(batch), _) => Some(FollowUp::new(
            operations::GET_MIGRATION_PROGRESS,
            json!({ "batch_id": batch.id }),
        )),
        (None, Some(repository)) => Some(FollowUp::new(
            operations::GET_MIGRATION_STATUS,
            json!({ "repository": repository }),
        )),
        (None, None) => None,
    };
    Ok(response)
}
