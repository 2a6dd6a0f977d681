//! Read-only operations. All are bound to the `Any` tier.

use super::orchestrator::MigrationOrchestrator;
use super::types::*;
use crate::auth::AuthorizationContext;
use crate::constants::{operations, system};
use crate::error::{MigratorError, Result};
use crate::models::{Batch, ComplexityRating};
use crate::planning::bounded_limit;
use crate::progress::calculate_progress;
use crate::state_machine::{can_queue_for_migration, is_cancellable};
use crate::store::RepositoryFilter;
use std::collections::BTreeMap;

impl MigrationOrchestrator {
    pub async fn analyze_repositories(
        &self,
        context: Option<&AuthorizationContext>,
        params: AnalyzeRepositoriesParams,
    ) -> Result<RepositoryAnalysis> {
        self.gate
            .authorize(operations::ANALYZE_REPOSITORIES, context)?;
        self.run_analyze_repositories(params).await
    }

    pub(crate) async fn run_analyze_repositories(
        &self,
        params: AnalyzeRepositoriesParams,
    ) -> Result<RepositoryAnalysis> {
        let limit = bounded_limit(
            params.limit,
            system::DEFAULT_ANALYSIS_LIMIT,
            system::MAX_ANALYSIS_LIMIT,
        );
        let filter = RepositoryFilter {
            statuses: params.status.into_iter().collect(),
            ..RepositoryFilter::default()
        }
        .in_organization(params.organization);
        let repositories = self.store.list_repositories(&filter).await?;

        let mut by_status: BTreeMap<String, usize> = BTreeMap::new();
        let mut scores = Vec::new();
        for repo in &repositories {
            *by_status.entry(repo.status.to_string()).or_default() += 1;
            scores.extend(repo.complexity_score);
        }
        let average_complexity = (!scores.is_empty())
            .then(|| scores.iter().sum::<i64>() as f64 / scores.len() as f64);

        Ok(RepositoryAnalysis {
            total: repositories.len(),
            by_status,
            archived: repositories.iter().filter(|r| r.is_archived).count(),
            forks: repositories.iter().filter(|r| r.is_fork).count(),
            with_blockers: repositories.iter().filter(|r| r.has_blockers()).count(),
            average_complexity,
            repositories: repositories
                .iter()
                .take(limit)
                .map(|repo| RepositorySummary {
                    full_name: repo.full_name.clone(),
                    status: repo.status,
                    complexity_score: repo.complexity_score,
                    batch_id: repo.batch_id,
                    has_blockers: repo.has_blockers(),
                })
                .collect(),
        })
    }

    pub async fn check_dependencies(
        &self,
        context: Option<&AuthorizationContext>,
        params: RepositoryParams,
    ) -> Result<DependencyReport> {
        self.gate.authorize(operations::CHECK_DEPENDENCIES, context)?;
        self.run_check_dependencies(params).await
    }

    pub(crate) async fn run_check_dependencies(
        &self,
        params: RepositoryParams,
    ) -> Result<DependencyReport> {
        let repo = self.load_repository(params.repository.trim()).await?;

        let (local, external): (Vec<_>, Vec<_>) = self
            .store
            .get_dependencies(&repo.full_name)
            .await?
            .into_iter()
            .partition(|edge| edge.is_local);
        let dependents = self
            .store
            .get_dependents(&repo.full_name)
            .await?
            .into_iter()
            .map(|edge| edge.repository)
            .collect();

        let local_names: Vec<String> = local.iter().map(|edge| edge.dependency.clone()).collect();
        let unmigrated_local = self
            .store
            .get_repositories_by_names(&local_names)
            .await?
            .into_iter()
            .filter(|dep| !dep.status.is_migrated())
            .map(|dep| dep.full_name)
            .collect();

        Ok(DependencyReport {
            repository: repo.full_name,
            local,
            external,
            dependents,
            unmigrated_local,
        })
    }

    pub async fn get_complexity_breakdown(
        &self,
        context: Option<&AuthorizationContext>,
        params: ComplexityBreakdownParams,
    ) -> Result<ComplexityBreakdown> {
        self.gate
            .authorize(operations::GET_COMPLEXITY_BREAKDOWN, context)?;
        self.run_get_complexity_breakdown(params).await
    }

    pub(crate) async fn run_get_complexity_breakdown(
        &self,
        params: ComplexityBreakdownParams,
    ) -> Result<ComplexityBreakdown> {
        let filter = RepositoryFilter::default().in_organization(params.organization.clone());
        let repositories = self.store.list_repositories(&filter).await?;

        let mut by_rating: BTreeMap<String, usize> = ComplexityRating::ALL
            .iter()
            .map(|rating| (rating.to_string(), 0))
            .collect();
        let mut unscored = 0;
        let mut validation = ValidationCounts::default();

        for repo in &repositories {
            match repo.complexity_score {
                Some(_) => *by_rating.entry(repo.complexity_rating().to_string()).or_default() += 1,
                None => unscored += 1,
            }
            match &repo.validation {
                Some(flags) => {
                    validation.blocking_files += usize::from(flags.has_blocking_files);
                    validation.oversized_commits += usize::from(flags.has_oversized_commits);
                    validation.oversized_repository += usize::from(flags.has_oversized_repository);
                    validation.long_refs += usize::from(flags.has_long_refs);
                    validation.large_file_warnings += usize::from(flags.has_large_file_warnings);
                }
                None => validation.unvalidated += 1,
            }
        }

        Ok(ComplexityBreakdown {
            organization: params.organization,
            total: repositories.len(),
            by_rating,
            unscored,
            validation,
        })
    }

    pub async fn get_migration_status(
        &self,
        context: Option<&AuthorizationContext>,
        params: RepositoryParams,
    ) -> Result<RepositoryStatusReport> {
        self.gate
            .authorize(operations::GET_MIGRATION_STATUS, context)?;
        self.run_get_migration_status(params).await
    }

    pub(crate) async fn run_get_migration_status(
        &self,
        params: RepositoryParams,
    ) -> Result<RepositoryStatusReport> {
        let repo = self.load_repository(params.repository.trim()).await?;
        Ok(RepositoryStatusReport {
            can_queue_dry_run: can_queue_for_migration(repo.status, true),
            can_queue_production: can_queue_for_migration(repo.status, false),
            cancellable: is_cancellable(repo.status),
            repository: repo.full_name,
            status: repo.status,
            batch_id: repo.batch_id,
            priority: repo.priority,
        })
    }

    pub async fn get_migration_progress(
        &self,
        context: Option<&AuthorizationContext>,
        params: MigrationProgressParams,
    ) -> Result<ProgressReport> {
        self.gate
            .authorize(operations::GET_MIGRATION_PROGRESS, context)?;
        self.run_get_migration_progress(params).await
    }

    pub(crate) async fn run_get_migration_progress(
        &self,
        params: MigrationProgressParams,
    ) -> Result<ProgressReport> {
        let repository = params
            .repository
            .map(|name| name.trim().to_string())
            .filter(|name| !name.is_empty());

        match (params.batch_id, repository) {
            (Some(batch_id), None) => {
                let batch = self.load_batch(batch_id).await?;
                let members = self.store.list_batch_repositories(batch_id).await?;
                Ok(ProgressReport {
                    batch_id: Some(batch.id),
                    batch_name: Some(batch.name),
                    batch_status: Some(batch.status),
                    repository: None,
                    progress: calculate_progress(members.iter().map(|repo| repo.status)),
                })
            }
            (None, Some(name)) => {
                let repo = self.load_repository(&name).await?;
                Ok(ProgressReport {
                    batch_id: repo.batch_id,
                    batch_name: None,
                    batch_status: None,
                    repository: Some(repo.full_name),
                    progress: calculate_progress([repo.status]),
                })
            }
            _ => Err(MigratorError::validation(
                "get_migration_progress requires exactly one of batch_id or repository",
            )),
        }
    }

    pub async fn list_batches(
        &self,
        context: Option<&AuthorizationContext>,
        params: ListBatchesParams,
    ) -> Result<Vec<Batch>> {
        self.gate.authorize(operations::LIST_BATCHES, context)?;
        self.run_list_batches(params).await
    }

    pub(crate) async fn run_list_batches(&self, params: ListBatchesParams) -> Result<Vec<Batch>> {
        let batches = self.store.list_batches().await?;
        Ok(match params.status {
            Some(status) => batches.into_iter().filter(|b| b.status == status).collect(),
            None => batches,
        })
    }
}
