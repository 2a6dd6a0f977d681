use async_trait::async_trait;
use migrator_core::models::{Batch, BatchStatus, DependencyEdge, NewBatch, Repository};
use migrator_core::state_machine::MigrationStatus;
use migrator_core::store::{
    InMemoryMigrationStore, MemberWrite, MigrationStore, RepositoryFilter, StoreResult,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::time::sleep;

/// In-memory store that sleeps before repository writes and member listings, so
/// concurrent callers interleave at the points where real database latency sits.
pub struct DelayedStore {
    inner: Arc<InMemoryMigrationStore>,
    write_delay: Duration,
    list_delay: Duration,
}

impl DelayedStore {
    pub fn new(inner: Arc<InMemoryMigrationStore>) -> Self {
        Self {
            inner,
            write_delay: Duration::from_millis(20),
            list_delay: Duration::from_millis(10),
        }
    }
}

#[async_trait]
impl MigrationStore for DelayedStore {
    async fn get_repository(&self, full_name: &str) -> StoreResult<Option<Repository>> {
        self.inner.get_repository(full_name).await
    }

    async fn get_repositories_by_names(&self, names: &[String]) -> StoreResult<Vec<Repository>> {
        self.inner.get_repositories_by_names(names).await
    }

    async fn list_repositories(&self, filter: &RepositoryFilter) -> StoreResult<Vec<Repository>> {
        self.inner.list_repositories(filter).await
    }

    async fn update_repository(&self, repository: &Repository) -> StoreResult<()> {
        sleep(self.write_delay).await;
        self.inner.update_repository(repository).await
    }

    async fn transition_repository_status(
        &self,
        full_name: &str,
        expected: MigrationStatus,
        to: MigrationStatus,
        priority: Option<i32>,
    ) -> StoreResult<bool> {
        sleep(self.write_delay).await;
        self.inner
            .transition_repository_status(full_name, expected, to, priority)
            .await
    }

    async fn get_batch(&self, batch_id: i64) -> StoreResult<Option<Batch>> {
        self.inner.get_batch(batch_id).await
    }

    async fn create_batch(&self, batch: NewBatch, repositories: &[String]) -> StoreResult<Batch> {
        self.inner.create_batch(batch, repositories).await
    }

    async fn update_batch(&self, batch: &Batch) -> StoreResult<()> {
        self.inner.update_batch(batch).await
    }

    async fn transition_batch_status(
        &self,
        batch: &Batch,
        expected: BatchStatus,
    ) -> StoreResult<bool> {
        self.inner.transition_batch_status(batch, expected).await
    }

    async fn list_batches(&self) -> StoreResult<Vec<Batch>> {
        self.inner.list_batches().await
    }

    async fn list_batch_repositories(&self, batch_id: i64) -> StoreResult<Vec<Repository>> {
        sleep(self.list_delay).await;
        self.inner.list_batch_repositories(batch_id).await
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
        sleep(self.write_delay).await;
        self.inner
            .transition_batch_member(batch_id, batch_status, full_name, expected, to, priority)
            .await
    }

    async fn get_dependencies(&self, full_name: &str) -> StoreResult<Vec<DependencyEdge>> {
        self.inner.get_dependencies(full_name).await
    }

    async fn get_dependents(&self, full_name: &str) -> StoreResult<Vec<DependencyEdge>> {
        self.inner.get_dependents(full_name).await
    }
}
