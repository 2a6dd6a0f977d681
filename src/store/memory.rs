//! In-process store for tests and embedded deployments.
//!
//! Listing order is insertion order. Every operation takes the lock once and never
//! holds it across an await.

use super::{MemberWrite, MigrationStore, RepositoryFilter, StoreError, StoreResult};
use crate::models::{Batch, BatchStatus, DependencyEdge, NewBatch, Repository};
use crate::state_machine::MigrationStatus;
use async_trait::async_trait;
use chrono::Utc;
use parking_lot::RwLock;
use std::collections::{BTreeMap, HashMap, HashSet};

#[derive(Debug, Default)]
struct MemoryState {
    repositories: HashMap<String, Repository>,
    order: Vec<String>,
    batches: BTreeMap<i64, Batch>,
    next_batch_id: i64,
    edges: Vec<DependencyEdge>,
    failing_writes: HashSet<String>,
}

impl MemoryState {
    fn hydrate(&self, repository: &Repository) -> Repository {
        let mut repository = repository.clone();
        repository.local_dependency_count = self
            .edges
            .iter()
            .filter(|edge| edge.is_local && edge.repository == repository.full_name)
            .count() as i64;
        repository
    }

    fn listed(&self) -> impl Iterator<Item = &Repository> {
        self.order
            .iter()
            .filter_map(|name| self.repositories.get(name))
    }

    fn check_writable(&self, full_name: &str) -> StoreResult<()> {
        if self.failing_writes.contains(full_name) {
            return Err(StoreError::WriteFailed {
                entity: full_name.to_string(),
                reason: "injected write failure".to_string(),
            });
        }
        Ok(())
    }

    fn refresh_batch_count(&mut self, batch_id: i64) {
        let count = self
            .repositories
            .values()
            .filter(|repo| repo.batch_id == Some(batch_id))
            .count() as i64;
        if let Some(batch) = self.batches.get_mut(&batch_id) {
            batch.repository_count = count;
        }
    }
}

/// `parking_lot::RwLock`-guarded in-memory [`MigrationStore`]
#[derive(Debug, Default)]
pub struct InMemoryMigrationStore {
    state: RwLock<MemoryState>,
}

impl InMemoryMigrationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or replace a repository. New names are appended to the listing order.
    pub fn insert_repository(&self, repository: Repository) {
        let mut state = self.state.write();
        if !state.repositories.contains_key(&repository.full_name) {
            state.order.push(repository.full_name.clone());
        }
        state
            .repositories
            .insert(repository.full_name.clone(), repository);
    }

    pub fn insert_dependency(&self, edge: DependencyEdge) {
        self.state.write().edges.push(edge);
    }

    /// Make every subsequent write to `full_name` fail, to exercise partial-failure
    /// handling in batch fan-out.
    pub fn fail_writes_for(&self, full_name: impl Into<String>) {
        self.state.write().failing_writes.insert(full_name.into());
    }
}

#[async_trait]
impl MigrationStore for InMemoryMigrationStore {
    async fn get_repository(&self, full_name: &str) -> StoreResult<Option<Repository>> {
        let state = self.state.read();
        Ok(state
            .repositories
            .get(full_name)
            .map(|repo| state.hydrate(repo)))
    }

    async fn get_repositories_by_names(&self, names: &[String]) -> StoreResult<Vec<Repository>> {
        let state = self.state.read();
        let mut seen = HashSet::new();
        Ok(names
            .iter()
            .filter(|name| seen.insert(name.as_str()))
            .filter_map(|name| state.repositories.get(name))
            .map(|repo| state.hydrate(repo))
            .collect())
    }

    async fn list_repositories(&self, filter: &RepositoryFilter) -> StoreResult<Vec<Repository>> {
        let state = self.state.read();
        let matching = state
            .listed()
            .filter(|repo| filter.matches(repo))
            .map(|repo| state.hydrate(repo));

        Ok(match filter.limit {
            Some(limit) => matching.take(limit).collect(),
            None => matching.collect(),
        })
    }

    async fn update_repository(&self, repository: &Repository) -> StoreResult<()> {
        let mut state = self.state.write();
        state.check_writable(&repository.full_name)?;

        if let Some(batch_id) = repository.batch_id {
            if !state.batches.contains_key(&batch_id) {
                return Err(StoreError::BatchNotFound(batch_id));
            }
        }

        let previous_batch = match state.repositories.get_mut(&repository.full_name) {
            Some(existing) => {
                let previous = existing.batch_id;
                *existing = repository.clone();
                existing.updated_at = Utc::now();
                previous
            }
            None => {
                return Err(StoreError::RepositoryNotFound(
                    repository.full_name.clone(),
                ))
            }
        };

        if previous_batch != repository.batch_id {
            for batch_id in previous_batch.into_iter().chain(repository.batch_id) {
                state.refresh_batch_count(batch_id);
            }
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
        let mut state = self.state.write();
        state.check_writable(full_name)?;

        let repository = state
            .repositories
            .get_mut(full_name)
            .ok_or_else(|| StoreError::RepositoryNotFound(full_name.to_string()))?;

        if repository.status != expected {
            return Ok(false);
        }

        repository.status = to;
        if let Some(priority) = priority {
            repository.priority = priority;
        }
        repository.updated_at = Utc::now();
        Ok(true)
    }

    async fn get_batch(&self, batch_id: i64) -> StoreResult<Option<Batch>> {
        Ok(self.state.read().batches.get(&batch_id).cloned())
    }

    async fn create_batch(&self, batch: NewBatch, repositories: &[String]) -> StoreResult<Batch> {
        let mut state = self.state.write();
        for name in repositories {
            state.check_writable(name)?;
            if !state.repositories.contains_key(name) {
                return Err(StoreError::RepositoryNotFound(name.clone()));
            }
        }

        state.next_batch_id += 1;
        let batch = batch.into_batch(state.next_batch_id, Utc::now());
        let batch_id = batch.id;
        state.batches.insert(batch_id, batch);

        let mut touched_batches = HashSet::from([batch_id]);
        for name in repositories {
            if let Some(repo) = state.repositories.get_mut(name) {
                if let Some(previous) = repo.batch_id.replace(batch_id) {
                    touched_batches.insert(previous);
                }
                repo.updated_at = Utc::now();
            }
        }
        for id in touched_batches {
            state.refresh_batch_count(id);
        }

        state
            .batches
            .get(&batch_id)
            .cloned()
            .ok_or(StoreError::BatchNotFound(batch_id))
    }

    async fn update_batch(&self, batch: &Batch) -> StoreResult<()> {
        let mut state = self.state.write();
        let existing = state
            .batches
            .get_mut(&batch.id)
            .ok_or(StoreError::BatchNotFound(batch.id))?;

        existing.name = batch.name.clone();
        existing.description = batch.description.clone();
        existing.batch_type = batch.batch_type;
        existing.destination_org = batch.destination_org.clone();
        existing.migration_api = batch.migration_api;
        Ok(())
    }

    async fn transition_batch_status(
        &self,
        batch: &Batch,
        expected: BatchStatus,
    ) -> StoreResult<bool> {
        let mut state = self.state.write();
        let existing = state
            .batches
            .get_mut(&batch.id)
            .ok_or(StoreError::BatchNotFound(batch.id))?;

        if existing.status != expected {
            return Ok(false);
        }

        existing.status = batch.status;
        existing.scheduled_at = batch.scheduled_at;
        existing.started_at = batch.started_at;
        existing.dry_run_started_at = batch.dry_run_started_at;
        existing.last_dry_run_at = batch.last_dry_run_at;
        existing.last_migration_attempt_at = batch.last_migration_attempt_at;
        Ok(true)
    }

    async fn list_batches(&self) -> StoreResult<Vec<Batch>> {
        Ok(self.state.read().batches.values().cloned().collect())
    }

    async fn list_batch_repositories(&self, batch_id: i64) -> StoreResult<Vec<Repository>> {
        let state = self.state.read();
        if !state.batches.contains_key(&batch_id) {
            return Err(StoreError::BatchNotFound(batch_id));
        }
        Ok(state
            .listed()
            .filter(|repo| repo.batch_id == Some(batch_id))
            .map(|repo| state.hydrate(repo))
            .collect())
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
        let mut state = self.state.write();
        let current_batch_status = state
            .batches
            .get(&batch_id)
            .map(|batch| batch.status)
            .ok_or(StoreError::BatchNotFound(batch_id))?;
        if current_batch_status != batch_status {
            return Ok(MemberWrite::BatchChanged);
        }
        state.check_writable(full_name)?;

        let repository = state
            .repositories
            .get_mut(full_name)
            .ok_or_else(|| StoreError::RepositoryNotFound(full_name.to_string()))?;
        if repository.batch_id != Some(batch_id) || repository.status != expected {
            return Ok(MemberWrite::StatusChanged);
        }

        repository.status = to;
        if let Some(priority) = priority {
            repository.priority = priority;
        }
        repository.updated_at = Utc::now();
        Ok(MemberWrite::Written)
    }

    async fn get_dependencies(&self, full_name: &str) -> StoreResult<Vec<DependencyEdge>> {
        Ok(self
            .state
            .read()
            .edges
            .iter()
            .filter(|edge| edge.repository == full_name)
            .cloned()
            .collect())
    }

    async fn get_dependents(&self, full_name: &str) -> StoreResult<Vec<DependencyEdge>> {
        Ok(self
            .state
            .read()
            .edges
            .iter()
            .filter(|edge| edge.is_local && edge.dependency == full_name)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::BatchType;

    fn new_batch(name: &str) -> NewBatch {
        NewBatch {
            name: name.to_string(),
            description: None,
            batch_type: BatchType::Custom,
            destination_org: None,
            migration_api: None,
        }
    }

    #[tokio::test]
    async fn test_listing_preserves_insertion_order() {
        let store = InMemoryMigrationStore::new();
        for name in ["acme/zeta", "acme/alpha", "acme/mid"] {
            store.insert_repository(Repository::new(name));
        }

        let names: Vec<String> = store
            .list_repositories(&RepositoryFilter::default())
            .await
            .unwrap()
            .into_iter()
            .map(|r| r.full_name)
            .collect();
        assert_eq!(names, vec!["acme/zeta", "acme/alpha", "acme/mid"]);
    }

    #[tokio::test]
    async fn test_local_dependency_count_is_derived() {
        let store = InMemoryMigrationStore::new();
        store.insert_repository(Repository::new("acme/app"));
        store.insert_dependency(DependencyEdge::local("acme/app", "acme/lib", "submodule"));
        store.insert_dependency(DependencyEdge::external("acme/app", "serde", "package"));

        let repo = store.get_repository("acme/app").await.unwrap().unwrap();
        assert_eq!(repo.local_dependency_count, 1);

        let dependents = store.get_dependents("acme/lib").await.unwrap();
        assert_eq!(dependents.len(), 1);
        assert_eq!(dependents[0].repository, "acme/app");
    }

    #[tokio::test]
    async fn test_transition_is_compare_and_set() {
        let store = InMemoryMigrationStore::new();
        store.insert_repository(Repository::new("acme/api"));

        let first = store
            .transition_repository_status(
                "acme/api",
                MigrationStatus::Pending,
                MigrationStatus::DryRunQueued,
                Some(1),
            )
            .await
            .unwrap();
        let second = store
            .transition_repository_status(
                "acme/api",
                MigrationStatus::Pending,
                MigrationStatus::DryRunQueued,
                Some(1),
            )
            .await
            .unwrap();

        assert!(first);
        assert!(!second);
        let repo = store.get_repository("acme/api").await.unwrap().unwrap();
        assert_eq!(repo.status, MigrationStatus::DryRunQueued);
        assert_eq!(repo.priority, 1);
    }

    #[tokio::test]
    async fn test_batch_creation_moves_repositories_between_batches() {
        let store = InMemoryMigrationStore::new();
        store.insert_repository(Repository::new("acme/api"));
        store.insert_repository(Repository::new("acme/web"));
        let names = vec!["acme/api".to_string(), "acme/web".to_string()];

        let first = store.create_batch(new_batch("first"), &names).await.unwrap();
        assert_eq!(first.repository_count, 2);
        let second = store
            .create_batch(new_batch("second"), &names[..1])
            .await
            .unwrap();
        assert_eq!(second.repository_count, 1);

        let first = store.get_batch(first.id).await.unwrap().unwrap();
        assert_eq!(first.repository_count, 1);
    }

    #[tokio::test]
    async fn test_batch_creation_is_all_or_nothing() {
        let store = InMemoryMigrationStore::new();
        store.insert_repository(Repository::new("acme/api"));
        store.insert_repository(Repository::new("acme/flaky"));
        store.fail_writes_for("acme/flaky");
        let names = vec!["acme/api".to_string(), "acme/flaky".to_string()];

        let result = store.create_batch(new_batch("doomed"), &names).await;
        assert!(matches!(result, Err(StoreError::WriteFailed { .. })));
        assert!(store.list_batches().await.unwrap().is_empty());
        let api = store.get_repository("acme/api").await.unwrap().unwrap();
        assert_eq!(api.batch_id, None);
    }

    #[tokio::test]
    async fn test_update_batch_keeps_status_and_member_count() {
        let store = InMemoryMigrationStore::new();
        store.insert_repository(Repository::new("acme/api"));
        let batch = store
            .create_batch(new_batch("b"), &["acme/api".to_string()])
            .await
            .unwrap();

        let mut stale = batch.clone();
        stale.repository_count = 0;
        stale.status = BatchStatus::Cancelled;
        stale.destination_org = Some("new-org".to_string());
        store.update_batch(&stale).await.unwrap();

        let stored = store.get_batch(batch.id).await.unwrap().unwrap();
        assert_eq!(stored.repository_count, 1);
        assert_eq!(stored.status, BatchStatus::Pending);
        assert_eq!(stored.destination_org.as_deref(), Some("new-org"));
    }

    #[tokio::test]
    async fn test_batch_status_is_compare_and_set() {
        let store = InMemoryMigrationStore::new();
        let mut batch = store.create_batch(new_batch("b"), &[]).await.unwrap();
        batch.mark_started(true, Utc::now());

        assert!(store
            .transition_batch_status(&batch, BatchStatus::Pending)
            .await
            .unwrap());
        assert!(!store
            .transition_batch_status(&batch, BatchStatus::Pending)
            .await
            .unwrap());

        let stored = store.get_batch(batch.id).await.unwrap().unwrap();
        assert_eq!(stored.status, BatchStatus::InProgress);
        assert!(stored.dry_run_started_at.is_some());
    }

    #[tokio::test]
    async fn test_member_write_is_guarded_by_batch_status() {
        let store = InMemoryMigrationStore::new();
        store.insert_repository(Repository::new("acme/api"));
        store.insert_repository(Repository::new("acme/stray"));
        let mut batch = store
            .create_batch(new_batch("b"), &["acme/api".to_string()])
            .await
            .unwrap();
        let batch_id = batch.id;

        let queue = |name: &'static str, status| {
            let store = &store;
            async move {
                store
                    .transition_batch_member(
                        batch_id,
                        status,
                        name,
                        MigrationStatus::Pending,
                        MigrationStatus::DryRunQueued,
                        None,
                    )
                    .await
                    .unwrap()
            }
        };

        assert_eq!(queue("acme/api", BatchStatus::InProgress).await, MemberWrite::BatchChanged);
        assert_eq!(queue("acme/stray", BatchStatus::Pending).await, MemberWrite::StatusChanged);
        assert_eq!(queue("acme/api", BatchStatus::Pending).await, MemberWrite::Written);
        assert_eq!(queue("acme/api", BatchStatus::Pending).await, MemberWrite::StatusChanged);

        batch.status = BatchStatus::Cancelled;
        store
            .transition_batch_status(&batch, BatchStatus::Pending)
            .await
            .unwrap();
        assert_eq!(queue("acme/api", BatchStatus::Pending).await, MemberWrite::BatchChanged);
    }

    #[tokio::test]
    async fn test_update_rejects_dangling_batch_reference() {
        let store = InMemoryMigrationStore::new();
        store.insert_repository(Repository::new("acme/api"));

        let mut repo = store.get_repository("acme/api").await.unwrap().unwrap();
        repo.batch_id = Some(99);
        assert_eq!(
            store.update_repository(&repo).await,
            Err(StoreError::BatchNotFound(99))
        );
    }

    #[tokio::test]
    async fn test_injected_write_failure() {
        let store = InMemoryMigrationStore::new();
        store.insert_repository(Repository::new("acme/flaky"));
        store.fail_writes_for("acme/flaky");

        let result = store
            .transition_repository_status(
                "acme/flaky",
                MigrationStatus::Pending,
                MigrationStatus::DryRunQueued,
                None,
            )
            .await;
        assert!(matches!(result, Err(StoreError::WriteFailed { .. })));
    }
}
