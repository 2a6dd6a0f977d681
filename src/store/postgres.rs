//! # PostgreSQL Store
//!
//! `sqlx` implementation of [`MigrationStore`]. Listing order is `full_name` ascending.
//! Status transitions are a single conditional `UPDATE`, so two racing callers can
//! never both move the same repository (or batch) out of the same status. Batch
//! member writes share-lock the batch row, so a batch status change waits for an
//! in-flight member write and every later member write sees the new status.

use super::{MemberWrite, MigrationStore, RepositoryFilter, StoreError, StoreResult};
use crate::config::DatabaseConfig;
use crate::models::{Batch, BatchStatus, DependencyEdge, NewBatch, Repository, ValidationFlags};
use crate::state_machine::MigrationStatus;
use async_trait::async_trait;
use sqlx::postgres::{PgPoolOptions, PgRow};
use sqlx::{PgPool, Postgres, QueryBuilder, Row};
use std::str::FromStr;
use tracing::{debug, info};

const SCHEMA: &str = include_str!("../../migrations/20260101000000_migration_core_schema.sql");

const REPOSITORY_COLUMNS: &str = r#"
    r.full_name, r.status, r.is_archived, r.is_fork, r.complexity_score, r.validated,
    r.has_blocking_files, r.has_oversized_commits, r.has_oversized_repository,
    r.has_long_refs, r.has_large_file_warnings, r.batch_id, r.priority, r.size_bytes,
    r.updated_at,
    (SELECT COUNT(*) FROM migration_repository_dependencies d
      WHERE d.repository_full_name = r.full_name AND d.is_local) AS local_dependency_count
"#;

const BATCH_COLUMNS: &str = r#"
    id, name, description, batch_type, status, destination_org, migration_api,
    scheduled_at, started_at, dry_run_started_at, last_dry_run_at,
    last_migration_attempt_at, repository_count, created_at
"#;

/// Postgres-backed [`MigrationStore`]
#[derive(Debug, Clone)]
pub struct PgMigrationStore {
    pool: PgPool,
}

impl PgMigrationStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Connect using the database section of the configuration.
    pub async fn connect(config: &DatabaseConfig) -> StoreResult<Self> {
        let url = config.url.as_deref().ok_or_else(|| {
            StoreError::Database("database.url is not configured".to_string())
        })?;

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .connect(url)
            .await?;

        info!(
            max_connections = config.max_connections,
            "Connected migration store to PostgreSQL"
        );
        Ok(Self::new(pool))
    }

    /// Apply the embedded schema. Idempotent.
    pub async fn run_migrations(&self) -> StoreResult<()> {
        sqlx::raw_sql(SCHEMA).execute(&self.pool).await?;
        debug!("Migration core schema applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

async fn refresh_batch_counts<'e, E>(executor: E, batch_ids: &[i64]) -> StoreResult<()>
where
    E: sqlx::Executor<'e, Database = Postgres>,
{
    if batch_ids.is_empty() {
        return Ok(());
    }
    sqlx::query(
        r#"
        UPDATE migration_batches b
        SET repository_count = (
            SELECT COUNT(*) FROM migration_repositories r WHERE r.batch_id = b.id
        )
        WHERE b.id = ANY($1)
        "#,
    )
    .bind(batch_ids)
    .execute(executor)
    .await?;
    Ok(())
}

fn parse_column<T: FromStr<Err = String>>(row: &PgRow, column: &str, entity: &str) -> StoreResult<T> {
    let raw: String = row.try_get(column)?;
    raw.parse().map_err(|reason| StoreError::CorruptRow {
        entity: entity.to_string(),
        reason,
    })
}

fn repository_from_row(row: &PgRow) -> StoreResult<Repository> {
    let full_name: String = row.try_get("full_name")?;
    let status = parse_column::<MigrationStatus>(row, "status", &full_name)?;
    let validated: bool = row.try_get("validated")?;

    let validation = if validated {
        Some(ValidationFlags {
            has_blocking_files: row.try_get("has_blocking_files")?,
            has_oversized_commits: row.try_get("has_oversized_commits")?,
            has_oversized_repository: row.try_get("has_oversized_repository")?,
            has_long_refs: row.try_get("has_long_refs")?,
            has_large_file_warnings: row.try_get("has_large_file_warnings")?,
        })
    } else {
        None
    };

    Ok(Repository {
        status,
        is_archived: row.try_get("is_archived")?,
        is_fork: row.try_get("is_fork")?,
        complexity_score: row.try_get("complexity_score")?,
        validation,
        local_dependency_count: row.try_get("local_dependency_count")?,
        batch_id: row.try_get("batch_id")?,
        priority: row.try_get("priority")?,
        size_bytes: row.try_get("size_bytes")?,
        updated_at: row.try_get("updated_at")?,
        full_name,
    })
}

fn batch_from_row(row: &PgRow) -> StoreResult<Batch> {
    let id: i64 = row.try_get("id")?;
    let entity = format!("batch {id}");
    let migration_api: Option<String> = row.try_get("migration_api")?;

    Ok(Batch {
        id,
        name: row.try_get("name")?,
        description: row.try_get("description")?,
        batch_type: parse_column(row, "batch_type", &entity)?,
        status: parse_column(row, "status", &entity)?,
        destination_org: row.try_get("destination_org")?,
        migration_api: migration_api
            .map(|api| api.parse())
            .transpose()
            .map_err(|reason| StoreError::CorruptRow {
                entity: entity.clone(),
                reason,
            })?,
        scheduled_at: row.try_get("scheduled_at")?,
        started_at: row.try_get("started_at")?,
        dry_run_started_at: row.try_get("dry_run_started_at")?,
        last_dry_run_at: row.try_get("last_dry_run_at")?,
        last_migration_attempt_at: row.try_get("last_migration_attempt_at")?,
        repository_count: row.try_get("repository_count")?,
        created_at: row.try_get("created_at")?,
    })
}

fn edge_from_row(row: &PgRow) -> StoreResult<DependencyEdge> {
    Ok(DependencyEdge {
        repository: row.try_get("repository_full_name")?,
        dependency: row.try_get("dependency_full_name")?,
        dependency_type: row.try_get("dependency_type")?,
        is_local: row.try_get("is_local")?,
    })
}

fn map_write_error(err: sqlx::Error, repository: &Repository) -> StoreError {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_foreign_key_violation() {
            if let Some(batch_id) = repository.batch_id {
                return StoreError::BatchNotFound(batch_id);
            }
        }
    }
    StoreError::WriteFailed {
        entity: repository.full_name.clone(),
        reason: err.to_string(),
    }
}

#[async_trait]
impl MigrationStore for PgMigrationStore {
    async fn get_repository(&self, full_name: &str) -> StoreResult<Option<Repository>> {
        let sql = format!(
            "SELECT {REPOSITORY_COLUMNS} FROM migration_repositories r WHERE r.full_name = $1"
        );
        let row = sqlx::query(&sql)
            .bind(full_name)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(repository_from_row).transpose()
    }

    async fn get_repositories_by_names(&self, names: &[String]) -> StoreResult<Vec<Repository>> {
        if names.is_empty() {
            return Ok(Vec::new());
        }
        let sql = format!(
            "SELECT {REPOSITORY_COLUMNS} FROM migration_repositories r \
             WHERE r.full_name = ANY($1) ORDER BY r.full_name"
        );
        let rows = sqlx::query(&sql).bind(names).fetch_all(&self.pool).await?;
        rows.iter().map(repository_from_row).collect()
    }

    async fn list_repositories(&self, filter: &RepositoryFilter) -> StoreResult<Vec<Repository>> {
        let mut query: QueryBuilder<Postgres> = QueryBuilder::new(format!(
            "SELECT {REPOSITORY_COLUMNS} FROM migration_repositories r WHERE TRUE"
        ));

        if let Some(org) = &filter.organization {
            query
                .push(" AND LOWER(SPLIT_PART(r.full_name, '/', 1)) = LOWER(")
                .push_bind(org.clone())
                .push(")");
        }
        if !filter.statuses.is_empty() {
            let statuses: Vec<String> = filter
                .statuses
                .iter()
                .map(|s| s.as_str().to_string())
                .collect();
            query.push(" AND r.status = ANY(").push_bind(statuses).push(")");
        }
        if let Some(batch_id) = filter.batch_id {
            query.push(" AND r.batch_id = ").push_bind(batch_id);
        }
        if filter.unbatched_only {
            query.push(" AND r.batch_id IS NULL");
        }
        query.push(" ORDER BY r.full_name");
        if let Some(limit) = filter.limit {
            query.push(" LIMIT ").push_bind(limit as i64);
        }

        let rows = query.build().fetch_all(&self.pool).await?;
        rows.iter().map(repository_from_row).collect()
    }

    async fn update_repository(&self, repository: &Repository) -> StoreResult<()> {
        let previous_batch: Option<Option<i64>> =
            sqlx::query_scalar("SELECT batch_id FROM migration_repositories WHERE full_name = $1")
                .bind(&repository.full_name)
                .fetch_optional(&self.pool)
                .await?;
        let Some(previous_batch) = previous_batch else {
            return Err(StoreError::RepositoryNotFound(repository.full_name.clone()));
        };

        let validation = repository.validation.unwrap_or_default();
        sqlx::query(
            r#"
            UPDATE migration_repositories SET
                status = $2, is_archived = $3, is_fork = $4, complexity_score = $5,
                validated = $6, has_blocking_files = $7, has_oversized_commits = $8,
                has_oversized_repository = $9, has_long_refs = $10,
                has_large_file_warnings = $11, batch_id = $12, priority = $13,
                size_bytes = $14, updated_at = NOW()
            WHERE full_name = $1
            "#,
        )
        .bind(&repository.full_name)
        .bind(repository.status.as_str())
        .bind(repository.is_archived)
        .bind(repository.is_fork)
        .bind(repository.complexity_score)
        .bind(repository.validation.is_some())
        .bind(validation.has_blocking_files)
        .bind(validation.has_oversized_commits)
        .bind(validation.has_oversized_repository)
        .bind(validation.has_long_refs)
        .bind(validation.has_large_file_warnings)
        .bind(repository.batch_id)
        .bind(repository.priority)
        .bind(repository.size_bytes)
        .execute(&self.pool)
        .await
        .map_err(|e| map_write_error(e, repository))?;

        if previous_batch != repository.batch_id {
            let touched: Vec<i64> = previous_batch.into_iter().chain(repository.batch_id).collect();
            refresh_batch_counts(&self.pool, &touched).await?;
        }
        Ok(())
    }

    async fn transition_repository_status(
        &self,
        full_name: &str,
        expected: MigrationStatus,
        to: MigrationStatus,
        priority: Option<i32>,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE migration_repositories
            SET status = $3, priority = COALESCE($4, priority), updated_at = NOW()
            WHERE full_name = $1 AND status = $2
            "#,
        )
        .bind(full_name)
        .bind(expected.as_str())
        .bind(to.as_str())
        .bind(priority)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::WriteFailed {
            entity: full_name.to_string(),
            reason: e.to_string(),
        })?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }

        let exists: bool = sqlx::query_scalar(
            "SELECT EXISTS (SELECT 1 FROM migration_repositories WHERE full_name = $1)",
        )
        .bind(full_name)
        .fetch_one(&self.pool)
        .await?;

        if exists {
            Ok(false)
        } else {
            Err(StoreError::RepositoryNotFound(full_name.to_string()))
        }
    }

    async fn get_batch(&self, batch_id: i64) -> StoreResult<Option<Batch>> {
        let sql = format!("SELECT {BATCH_COLUMNS} FROM migration_batches WHERE id = $1");
        let row = sqlx::query(&sql)
            .bind(batch_id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(batch_from_row).transpose()
    }

    async fn create_batch(&self, batch: NewBatch, repositories: &[String]) -> StoreResult<Batch> {
        let mut tx = self.pool.begin().await?;

        let batch_id: i64 = sqlx::query_scalar(
            "INSERT INTO migration_batches (name, description, batch_type, destination_org, migration_api) \
             VALUES ($1, $2, $3, $4, $5) RETURNING id",
        )
        .bind(&batch.name)
        .bind(&batch.description)
        .bind(batch.batch_type.as_str())
        .bind(&batch.destination_org)
        .bind(batch.migration_api.map(|api| api.as_str()))
        .fetch_one(&mut *tx)
        .await?;

        let mut touched: Vec<i64> = sqlx::query_scalar(
            "SELECT DISTINCT batch_id FROM migration_repositories \
             WHERE full_name = ANY($1) AND batch_id IS NOT NULL",
        )
        .bind(repositories)
        .fetch_all(&mut *tx)
        .await?;
        touched.push(batch_id);

        let linked = sqlx::query(
            "UPDATE migration_repositories SET batch_id = $1, updated_at = NOW() \
             WHERE full_name = ANY($2)",
        )
        .bind(batch_id)
        .bind(repositories)
        .execute(&mut *tx)
        .await
        .map_err(|e| StoreError::WriteFailed {
            entity: format!("batch '{}'", batch.name),
            reason: e.to_string(),
        })?;
        if (linked.rows_affected() as usize) < repositories.len() {
            // Dropping the transaction rolls the batch row back.
            return Err(StoreError::WriteFailed {
                entity: format!("batch '{}'", batch.name),
                reason: format!(
                    "linked {} of {} repositories",
                    linked.rows_affected(),
                    repositories.len()
                ),
            });
        }

        refresh_batch_counts(&mut *tx, &touched).await?;

        let sql = format!("SELECT {BATCH_COLUMNS} FROM migration_batches WHERE id = $1");
        let row = sqlx::query(&sql).bind(batch_id).fetch_one(&mut *tx).await?;
        let created = batch_from_row(&row)?;

        tx.commit().await?;
        Ok(created)
    }

    async fn update_batch(&self, batch: &Batch) -> StoreResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE migration_batches SET
                name = $2, description = $3, batch_type = $4,
                destination_org = $5, migration_api = $6
            WHERE id = $1
            "#,
        )
        .bind(batch.id)
        .bind(&batch.name)
        .bind(&batch.description)
        .bind(batch.batch_type.as_str())
        .bind(&batch.destination_org)
        .bind(batch.migration_api.map(|api| api.as_str()))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::BatchNotFound(batch.id));
        }
        Ok(())
    }

    async fn transition_batch_status(
        &self,
        batch: &Batch,
        expected: BatchStatus,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            UPDATE migration_batches SET
                status = $3, scheduled_at = $4, started_at = $5, dry_run_started_at = $6,
                last_dry_run_at = $7, last_migration_attempt_at = $8
            WHERE id = $1 AND status = $2
            "#,
        )
        .bind(batch.id)
        .bind(expected.as_str())
        .bind(batch.status.as_str())
        .bind(batch.scheduled_at)
        .bind(batch.started_at)
        .bind(batch.dry_run_started_at)
        .bind(batch.last_dry_run_at)
        .bind(batch.last_migration_attempt_at)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 1 {
            return Ok(true);
        }
        match self.get_batch(batch.id).await? {
            Some(_) => Ok(false),
            None => Err(StoreError::BatchNotFound(batch.id)),
        }
    }

    async fn list_batches(&self) -> StoreResult<Vec<Batch>> {
        let sql = format!("SELECT {BATCH_COLUMNS} FROM migration_batches ORDER BY id");
        let rows = sqlx::query(&sql).fetch_all(&self.pool).await?;
        rows.iter().map(batch_from_row).collect()
    }

    async fn list_batch_repositories(&self, batch_id: i64) -> StoreResult<Vec<Repository>> {
        if self.get_batch(batch_id).await?.is_none() {
            return Err(StoreError::BatchNotFound(batch_id));
        }
        self.list_repositories(&RepositoryFilter {
            batch_id: Some(batch_id),
            ..RepositoryFilter::default()
        })
        .await
    }

    async fn transition_batch_member(
        &self,
        batch_id: i64,
        batch_status: BatchStatus,
        full_name: &str,
        expected: MigrationStatus,
        to: MigrationStatus,
        priority: Option<i32>,
    ) -> StoreResult<MemberWrite> {
        let result = sqlx::query(
            r#"
            UPDATE migration_repositories r
            SET status = $5, priority = COALESCE($6, r.priority), updated_at = NOW()
            WHERE r.full_name = $3 AND r.status = $4 AND r.batch_id = $1
              AND EXISTS (
                SELECT 1 FROM migration_batches b
                WHERE b.id = $1 AND b.status = $2
                FOR SHARE
              )
            "#,
        )
        .bind(batch_id)
        .bind(batch_status.as_str())
        .bind(full_name)
        .bind(expected.as_str())
        .bind(to.as_str())
        .bind(priority)
        .execute(&self.pool)
        .await
        .map_err(|e| StoreError::WriteFailed {
            entity: full_name.to_string(),
            reason: e.to_string(),
        })?;

        if result.rows_affected() == 1 {
            return Ok(MemberWrite::Written);
        }

        let current = self
            .get_batch(batch_id)
            .await?
            .ok_or(StoreError::BatchNotFound(batch_id))?;
        if current.status != batch_status {
            return Ok(MemberWrite::BatchChanged);
        }
        match self.get_repository(full_name).await? {
            Some(_) => Ok(MemberWrite::StatusChanged),
            None => Err(StoreError::RepositoryNotFound(full_name.to_string())),
        }
    }

    async fn get_dependencies(&self, full_name: &str) -> StoreResult<Vec<DependencyEdge>> {
        let rows = sqlx::query(
            "SELECT repository_full_name, dependency_full_name, dependency_type, is_local \
             FROM migration_repository_dependencies WHERE repository_full_name = $1 ORDER BY id",
        )
        .bind(full_name)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(edge_from_row).collect()
    }

    async fn get_dependents(&self, full_name: &str) -> StoreResult<Vec<DependencyEdge>> {
        let rows = sqlx::query(
            "SELECT repository_full_name, dependency_full_name, dependency_type, is_local \
             FROM migration_repository_dependencies \
             WHERE dependency_full_name = $1 AND is_local ORDER BY id",
        )
        .bind(full_name)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(edge_from_row).collect()
    }
}
