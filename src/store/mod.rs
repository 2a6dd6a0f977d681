//! # Durable Store Seam
//!
//! The orchestrator reads and writes all state through [`MigrationStore`]. Single-row
//! updates are atomic; batch-wide loops are not wrapped in a cross-repository
//! transaction. [`MigrationStore::transition_repository_status`] is a compare-and-set
//! so a transition re-checks the current status at write time. Batch status is
//! compare-and-set as well, and fan-out member writes are additionally guarded by
//! the batch status so no member is written once the batch has moved on.

pub mod memory;
#[cfg(feature = "postgres")]
pub mod postgres;

use crate::models::{Batch, BatchStatus, DependencyEdge, NewBatch, Repository};
use crate::state_machine::MigrationStatus;
use async_trait::async_trait;
use thiserror::Error;

pub use memory::InMemoryMigrationStore;
#[cfg(feature = "postgres")]
pub use postgres::PgMigrationStore;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum StoreError {
    #[error("Repository not found: {0}")]
    RepositoryNotFound(String),

    #[error("Batch not found: {0}")]
    BatchNotFound(i64),

    #[error("Write failed for {entity}: {reason}")]
    WriteFailed { entity: String, reason: String },

    #[error("Database error: {0}")]
    Database(String),

    #[error("Corrupt row for {entity}: {reason}")]
    CorruptRow { entity: String, reason: String },
}

#[cfg(feature = "postgres")]
impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        StoreError::Database(err.to_string())
    }
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Outcome of [`MigrationStore::transition_batch_member`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberWrite {
    Written,
    /// The repository changed status or left the batch first
    StatusChanged,
    /// The batch changed status first; no further members may be written
    BatchChanged,
}

/// Predicate set for repository listings. Empty fields do not filter.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RepositoryFilter {
    pub organization: Option<String>,
    pub statuses: Vec<MigrationStatus>,
    pub batch_id: Option<i64>,
    /// Only repositories without a batch
    pub unbatched_only: bool,
    pub limit: Option<usize>,
}

impl RepositoryFilter {
    pub fn with_statuses(statuses: &[MigrationStatus]) -> Self {
        Self {
            statuses: statuses.to_vec(),
            ..Self::default()
        }
    }

    pub fn in_organization(mut self, organization: Option<String>) -> Self {
        self.organization = organization;
        self
    }

    pub fn matches(&self, repository: &Repository) -> bool {
        if let Some(org) = &self.organization {
            if !repository.organization().eq_ignore_ascii_case(org) {
                return false;
            }
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&repository.status) {
            return false;
        }
        if let Some(batch_id) = self.batch_id {
            if repository.batch_id != Some(batch_id) {
                return false;
            }
        }
        if self.unbatched_only && repository.batch_id.is_some() {
            return false;
        }
        true
    }
}

/// Durable state consumed by the orchestrator
#[async_trait]
pub trait MigrationStore: Send + Sync {
    async fn get_repository(&self, full_name: &str) -> StoreResult<Option<Repository>>;

    /// Resolve names; unknown names are simply absent from the result.
    async fn get_repositories_by_names(&self, names: &[String]) -> StoreResult<Vec<Repository>>;

    async fn list_repositories(&self, filter: &RepositoryFilter) -> StoreResult<Vec<Repository>>;

    /// Overwrite a repository row.
    async fn update_repository(&self, repository: &Repository) -> StoreResult<()>;

    /// Write `to` (and `priority`, if given) only if the current status is still
    /// `expected`. Returns whether the write happened.
    async fn transition_repository_status(
        &self,
        full_name: &str,
        expected: MigrationStatus,
        to: MigrationStatus,
        priority: Option<i32>,
    ) -> StoreResult<bool>;

    async fn get_batch(&self, batch_id: i64) -> StoreResult<Option<Batch>>;

    /// Insert a batch and point every named repository at it in one atomic step.
    /// Member counts of batches the repositories leave are refreshed. Nothing is
    /// written if any part fails.
    async fn create_batch(&self, batch: NewBatch, repositories: &[String]) -> StoreResult<Batch>;

    /// Overwrite the descriptive fields of a batch (name, description, type,
    /// destination, migration API). Status, lifecycle timestamps and the member
    /// count are left alone.
    async fn update_batch(&self, batch: &Batch) -> StoreResult<()>;

    /// Write `batch.status` and its lifecycle timestamps only if the stored status
    /// is still `expected`. Returns whether the write happened.
    async fn transition_batch_status(&self, batch: &Batch, expected: BatchStatus)
        -> StoreResult<bool>;

    async fn list_batches(&self) -> StoreResult<Vec<Batch>>;

    /// Members of a batch in listing order.
    async fn list_batch_repositories(&self, batch_id: i64) -> StoreResult<Vec<Repository>>;

    /// Compare-and-set one member of a batch fan-out. The write happens only while the
    /// batch still has `batch_status`, the repository still belongs to the batch and
    /// its status is still `expected`, all checked atomically with the write.
    #[allow(clippy::too_many_arguments)]
    async fn transition_batch_member(
        &self,
        batch_id: i64,
        batch_status: BatchStatus,
        full_name: &str,
        expected: MigrationStatus,
        to: MigrationStatus,
        priority: Option<i32>,
    ) -> StoreResult<MemberWrite>;

    /// Local and external edges out of a repository.
    async fn get_dependencies(&self, full_name: &str) -> StoreResult<Vec<DependencyEdge>>;

    /// Local edges pointing at a repository.
    async fn get_dependents(&self, full_name: &str) -> StoreResult<Vec<DependencyEdge>>;
}
