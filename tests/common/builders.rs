use migrator_core::auth::{AuthorizationContext, Permissions};
use migrator_core::models::{BatchType, DependencyEdge, Repository};
use migrator_core::orchestration::{CreateBatchParams, MigrationOrchestrator};
use migrator_core::state_machine::MigrationStatus;
use migrator_core::store::InMemoryMigrationStore;
use std::sync::Arc;

use super::stores::DelayedStore;

/// Orchestrator over a fresh in-memory store, with the store handle kept for seeding.
pub struct TestHarness {
    pub store: Arc<InMemoryMigrationStore>,
    pub orchestrator: MigrationOrchestrator,
}

impl TestHarness {
    pub fn new() -> Self {
        let store = Arc::new(InMemoryMigrationStore::new());
        let orchestrator = MigrationOrchestrator::with_defaults(store.clone());
        Self { store, orchestrator }
    }

    /// Like [`TestHarness::new`], but the orchestrator sees store latency on writes
    /// and member listings. Seeding through `store` is immediate.
    pub fn with_latency() -> Self {
        let store = Arc::new(InMemoryMigrationStore::new());
        let orchestrator = MigrationOrchestrator::with_defaults(Arc::new(DelayedStore::new(
            store.clone(),
        )));
        Self { store, orchestrator }
    }

    pub fn seed(&self, full_name: &str, status: MigrationStatus) -> &Self {
        self.store
            .insert_repository(Repository::new(full_name).with_status(status));
        self
    }

    pub fn seed_repository(&self, repository: Repository) -> &Self {
        self.store.insert_repository(repository);
        self
    }

    pub fn depends_on(&self, repository: &str, dependency: &str) -> &Self {
        self.store
            .insert_dependency(DependencyEdge::local(repository, dependency, "submodule"));
        self
    }

    /// Create a batch over already-seeded repositories without an auth context.
    pub async fn batch(&self, name: &str, batch_type: BatchType, repositories: &[&str]) -> i64 {
        self.orchestrator
            .create_batch(
                None,
                CreateBatchParams {
                    name: name.to_string(),
                    batch_type: Some(batch_type),
                    repositories: repositories.iter().map(|r| r.to_string()).collect(),
                    ..CreateBatchParams::default()
                },
            )
            .await
            .expect("batch creation")
            .id
    }

    pub async fn status_of(&self, full_name: &str) -> MigrationStatus {
        use migrator_core::store::MigrationStore;

        self.store
            .get_repository(full_name)
            .await
            .expect("store read")
            .expect("repository exists")
            .status
    }
}

pub fn context(permissions: Permissions) -> AuthorizationContext {
    AuthorizationContext::new(42, "octocat", "custom", permissions)
}

pub fn admin() -> AuthorizationContext {
    AuthorizationContext::new(1, "admin", "admin", Permissions::admin())
}

pub fn self_service() -> AuthorizationContext {
    AuthorizationContext::new(2, "developer", "self_service", Permissions::self_service())
}

pub fn read_only() -> AuthorizationContext {
    AuthorizationContext::new(3, "viewer", "read_only", Permissions::read_only())
}
