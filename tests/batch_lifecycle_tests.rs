mod common;

use common::*;
use migrator_core::error::MigratorError;
use migrator_core::models::{BatchStatus, BatchType, MigrationApi};
use migrator_core::orchestration::*;
use migrator_core::state_machine::MigrationStatus::{self, *};
use migrator_core::store::MigrationStore;

#[tokio::test]
async fn test_batch_progress_buckets() {
    let harness = TestHarness::new();
    let statuses = [
        Pending,
        Pending,
        DryRunQueued,
        DryRunInProgress,
        Complete,
        Complete,
        Complete,
        MigrationFailed,
        WontMigrate,
    ];
    let names: Vec<String> = (0..statuses.len()).map(|i| format!("acme/repo-{i}")).collect();
    for (name, status) in names.iter().zip(statuses) {
        harness.seed(name, status);
    }
    let refs: Vec<&str> = names.iter().map(String::as_str).collect();
    let batch_id = harness.batch("wave-1", BatchType::Custom, &refs).await;

    let report = harness
        .orchestrator
        .get_migration_progress(
            None,
            MigrationProgressParams {
                batch_id: Some(batch_id),
                repository: None,
            },
        )
        .await
        .unwrap();

    let p = report.progress;
    assert_eq!(p.total, 9);
    assert_eq!(p.pending, 2);
    assert_eq!(p.queued, 1);
    assert_eq!(p.in_progress, 1);
    assert_eq!(p.completed, 3);
    assert_eq!(p.failed, 1);
    assert_eq!(p.skipped, 1);
    assert!((p.percent_complete - 33.333).abs() < 0.01);
    assert_eq!(report.batch_name.as_deref(), Some("wave-1"));
}

#[tokio::test]
async fn test_dry_run_start_queues_idle_and_skips_busy() {
    let harness = TestHarness::new();
    harness
        .seed("acme/busy", DryRunInProgress)
        .seed("acme/idle", Pending);
    let batch_id = harness
        .batch("dry-run", BatchType::Custom, &["acme/busy", "acme/idle"])
        .await;

    let result = harness
        .orchestrator
        .start_migration(
            Some(&admin()),
            StartMigrationParams {
                batch_id: Some(batch_id),
                ..StartMigrationParams::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(result.dry_run, Some(true));
    assert_eq!(result.succeeded, vec!["acme/idle"]);
    assert_eq!(result.skipped, vec!["acme/busy"]);
    assert!(result.failed.is_empty());
    assert_eq!(harness.status_of("acme/idle").await, DryRunQueued);
    assert_eq!(harness.status_of("acme/busy").await, DryRunInProgress);

    let batch = harness.store.get_batch(batch_id).await.unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::InProgress);
    assert!(batch.dry_run_started_at.is_some());
    assert!(batch.last_dry_run_at.is_some());
    assert!(batch.started_at.is_none());
}

#[tokio::test]
async fn test_start_rejects_batch_already_in_progress() {
    let harness = TestHarness::new();
    harness.seed("acme/api", Pending);
    let batch_id = harness.batch("b", BatchType::Custom, &["acme/api"]).await;
    let params = StartMigrationParams {
        batch_id: Some(batch_id),
        ..StartMigrationParams::default()
    };

    harness
        .orchestrator
        .start_migration(None, params.clone())
        .await
        .unwrap();
    let err = harness
        .orchestrator
        .start_migration(None, params)
        .await
        .unwrap_err();

    assert!(matches!(err, MigratorError::InvalidTransition(_)));
    assert!(err.to_string().contains("already in progress"));
}

#[tokio::test]
async fn test_production_start_after_dry_run_sets_pilot_priority() {
    let harness = TestHarness::new();
    harness
        .seed("acme/rehearsed", DryRunComplete)
        .seed("acme/fresh", Pending)
        .seed("acme/done", Complete);
    let batch_id = harness
        .batch(
            "pilot",
            BatchType::Pilot,
            &["acme/rehearsed", "acme/fresh", "acme/done"],
        )
        .await;

    let result = harness
        .orchestrator
        .start_migration(
            None,
            StartMigrationParams {
                batch_id: Some(batch_id),
                repository: None,
                dry_run: false,
            },
        )
        .await
        .unwrap();

    assert_eq!(result.succeeded, vec!["acme/rehearsed", "acme/fresh"]);
    assert_eq!(result.skipped, vec!["acme/done"]);

    let rehearsed = harness
        .store
        .get_repository("acme/rehearsed")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(rehearsed.status, QueuedForMigration);
    assert_eq!(rehearsed.priority, 1);

    let batch = harness.store.get_batch(batch_id).await.unwrap().unwrap();
    assert!(batch.started_at.is_some());
    assert!(batch.last_migration_attempt_at.is_some());
}

#[tokio::test]
async fn test_completed_dry_run_cannot_be_dry_run_again() {
    let harness = TestHarness::new();
    harness.seed("acme/rehearsed", DryRunComplete);

    let err = harness
        .orchestrator
        .start_migration(
            None,
            StartMigrationParams {
                repository: Some("acme/rehearsed".to_string()),
                ..StartMigrationParams::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, MigratorError::InvalidTransition(_)));
    assert!(err.to_string().contains("acme/rehearsed"));
}

#[tokio::test]
async fn test_single_repository_start_bypasses_batch() {
    let harness = TestHarness::new();
    harness.seed("acme/solo", MigrationFailed);

    let result = harness
        .orchestrator
        .start_migration(
            None,
            StartMigrationParams {
                repository: Some("acme/solo".to_string()),
                ..StartMigrationParams::default()
            },
        )
        .await
        .unwrap();

    assert!(result.batch.is_none());
    assert_eq!(result.succeeded, vec!["acme/solo"]);
    assert_eq!(harness.status_of("acme/solo").await, DryRunQueued);
}

#[tokio::test]
async fn test_start_of_empty_batch_is_rejected() {
    let harness = TestHarness::new();
    harness.seed("acme/api", Pending);
    let batch_id = harness.batch("b", BatchType::Custom, &["acme/api"]).await;
    harness.batch("other", BatchType::Custom, &["acme/api"]).await;

    let err = harness
        .orchestrator
        .start_migration(
            None,
            StartMigrationParams {
                batch_id: Some(batch_id),
                ..StartMigrationParams::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MigratorError::Validation(_)));
    assert!(err.to_string().contains("has no repositories"));
}

#[tokio::test]
async fn test_partial_write_failure_does_not_abort_batch() {
    let harness = TestHarness::new();
    harness
        .seed("acme/a", Pending)
        .seed("acme/flaky", Pending)
        .seed("acme/c", Pending);
    let batch_id = harness
        .batch("b", BatchType::Custom, &["acme/a", "acme/flaky", "acme/c"])
        .await;
    harness.store.fail_writes_for("acme/flaky");

    let result = harness
        .orchestrator
        .start_migration(
            None,
            StartMigrationParams {
                batch_id: Some(batch_id),
                ..StartMigrationParams::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(result.succeeded, vec!["acme/a", "acme/c"]);
    assert_eq!(result.failed.len(), 1);
    assert_eq!(result.failed[0].repository, "acme/flaky");
    assert_eq!(harness.status_of("acme/c").await, DryRunQueued);
}

#[tokio::test]
async fn test_cancel_resets_cancellable_and_marks_batch_cancelled() {
    let harness = TestHarness::new();
    harness
        .seed("acme/queued", DryRunQueued)
        .seed("acme/archiving", ArchiveGenerating)
        .seed("acme/post", PostMigration)
        .seed("acme/done", Complete);
    let batch_id = harness
        .batch(
            "b",
            BatchType::Custom,
            &["acme/queued", "acme/archiving", "acme/post", "acme/done"],
        )
        .await;

    let result = harness
        .orchestrator
        .cancel_migration(
            Some(&admin()),
            CancelMigrationParams {
                batch_id: Some(batch_id),
                repository: None,
            },
        )
        .await
        .unwrap();

    assert_eq!(result.succeeded, vec!["acme/queued", "acme/archiving"]);
    assert_eq!(result.skipped, vec!["acme/post", "acme/done"]);
    assert_eq!(harness.status_of("acme/queued").await, Pending);
    assert_eq!(harness.status_of("acme/post").await, PostMigration);

    let batch = harness.store.get_batch(batch_id).await.unwrap().unwrap();
    assert_eq!(batch.status, BatchStatus::Cancelled);
}

#[tokio::test]
async fn test_cancel_of_idle_batch_is_a_successful_no_op() {
    let harness = TestHarness::new();
    harness.seed("acme/idle", Pending);
    let batch_id = harness.batch("b", BatchType::Custom, &["acme/idle"]).await;

    let result = harness
        .orchestrator
        .cancel_migration(
            None,
            CancelMigrationParams {
                batch_id: Some(batch_id),
                repository: None,
            },
        )
        .await
        .unwrap();

    assert!(result.succeeded.is_empty());
    assert_eq!(result.batch.unwrap().status, BatchStatus::Cancelled);
}

#[tokio::test]
async fn test_cancel_single_repository_outside_cancellable_set() {
    let harness = TestHarness::new();
    harness.seed("acme/post", PostMigration);

    let err = harness
        .orchestrator
        .cancel_migration(
            None,
            CancelMigrationParams {
                batch_id: None,
                repository: Some("acme/post".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MigratorError::InvalidTransition(_)));
}

#[tokio::test]
async fn test_retry_resets_only_failures() {
    let harness = TestHarness::new();
    harness
        .seed("acme/dry-failed", DryRunFailed)
        .seed("acme/failed", MigrationFailed)
        .seed("acme/done", Complete)
        .seed("acme/rolled", RolledBack);
    let batch_id = harness
        .batch(
            "b",
            BatchType::Custom,
            &["acme/dry-failed", "acme/failed", "acme/done", "acme/rolled"],
        )
        .await;

    let result = harness
        .orchestrator
        .retry_batch_failures(None, RetryBatchFailuresParams { batch_id })
        .await
        .unwrap();

    assert_eq!(result.succeeded, vec!["acme/dry-failed", "acme/failed"]);
    assert_eq!(harness.status_of("acme/failed").await, Pending);
    assert_eq!(harness.status_of("acme/done").await, Complete);
    assert_eq!(harness.status_of("acme/rolled").await, RolledBack);
}

#[tokio::test]
async fn test_create_requires_every_repository_to_resolve() {
    let harness = TestHarness::new();
    harness.seed("acme/api", Pending);

    let err = harness
        .orchestrator
        .create_batch(
            None,
            CreateBatchParams {
                name: "partial".to_string(),
                repositories: vec!["acme/api".to_string(), "acme/ghost".to_string()],
                ..CreateBatchParams::default()
            },
        )
        .await
        .unwrap_err();

    assert!(matches!(err, MigratorError::NotFound { .. }));
    assert!(err.to_string().contains("acme/ghost"));
    assert!(harness.store.list_batches().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_create_validates_name_and_members() {
    let harness = TestHarness::new();
    harness.seed("acme/api", Pending);

    for params in [
        CreateBatchParams {
            name: "  ".to_string(),
            repositories: vec!["acme/api".to_string()],
            ..CreateBatchParams::default()
        },
        CreateBatchParams {
            name: "empty".to_string(),
            ..CreateBatchParams::default()
        },
        CreateBatchParams {
            name: "bad-api".to_string(),
            repositories: vec!["acme/api".to_string()],
            migration_api: Some("svn".to_string()),
            ..CreateBatchParams::default()
        },
    ] {
        let err = harness.orchestrator.create_batch(None, params).await.unwrap_err();
        assert!(matches!(err, MigratorError::Validation(_)), "{err}");
    }
}

#[tokio::test]
async fn test_create_links_members_and_counts_them() {
    let harness = TestHarness::new();
    harness.seed("acme/api", Pending).seed("acme/web", Pending);

    let batch = harness
        .orchestrator
        .create_batch(
            Some(&self_service()),
            CreateBatchParams {
                name: "web".to_string(),
                repositories: vec![
                    "acme/api".to_string(),
                    "acme/web".to_string(),
                    "acme/api".to_string(),
                ],
                migration_api: Some("elm".to_string()),
                ..CreateBatchParams::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(batch.repository_count, 2);
    assert_eq!(batch.migration_api, Some(MigrationApi::Elm));
    let members = harness.store.list_batch_repositories(batch.id).await.unwrap();
    assert_eq!(members.len(), 2);
}

#[tokio::test]
async fn test_configure_normalizes_api_and_rejects_unknown() {
    let harness = TestHarness::new();
    harness.seed("acme/api", Pending);
    let batch_id = harness.batch("b", BatchType::Custom, &["acme/api"]).await;

    let batch = harness
        .orchestrator
        .configure_batch(
            None,
            ConfigureBatchParams {
                batch_id,
                destination_org: None,
                migration_api: Some("gei".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(batch.migration_api, Some(MigrationApi::Gei));
    assert_eq!(
        serde_json::to_value(batch.migration_api).unwrap(),
        serde_json::json!("GEI")
    );

    let err = harness
        .orchestrator
        .configure_batch(
            None,
            ConfigureBatchParams {
                batch_id,
                destination_org: Some("new-org".to_string()),
                migration_api: Some("SVN".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MigratorError::Validation(_)));

    let unchanged = harness.store.get_batch(batch_id).await.unwrap().unwrap();
    assert_eq!(unchanged.migration_api, Some(MigrationApi::Gei));
    assert_eq!(unchanged.destination_org, None);
}

#[tokio::test]
async fn test_schedule_parses_dates_and_defaults_to_now() {
    let harness = TestHarness::new();
    harness.seed("acme/api", Pending);
    let batch_id = harness.batch("b", BatchType::Custom, &["acme/api"]).await;

    let batch = harness
        .orchestrator
        .schedule_batch(
            None,
            ScheduleBatchParams {
                batch_id,
                scheduled_at: Some("2026-11-02".to_string()),
            },
        )
        .await
        .unwrap();
    assert_eq!(batch.status, BatchStatus::Scheduled);
    assert_eq!(
        batch.scheduled_at.unwrap().to_rfc3339(),
        "2026-11-02T00:00:00+00:00"
    );

    let before = chrono::Utc::now();
    let batch = harness
        .orchestrator
        .schedule_batch(
            None,
            ScheduleBatchParams {
                batch_id,
                scheduled_at: None,
            },
        )
        .await
        .unwrap();
    assert!(batch.scheduled_at.unwrap() >= before);

    let err = harness
        .orchestrator
        .schedule_batch(
            None,
            ScheduleBatchParams {
                batch_id,
                scheduled_at: Some("soon".to_string()),
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, MigratorError::Validation(_)));
}

#[tokio::test]
async fn test_unknown_batch_is_not_found() {
    let harness = TestHarness::new();
    let err = harness
        .orchestrator
        .retry_batch_failures(None, RetryBatchFailuresParams { batch_id: 404 })
        .await
        .unwrap_err();

    assert_eq!(err, MigratorError::batch_not_found(404));
    assert!(err.is_client_error());
}

#[tokio::test]
async fn test_forced_status_update_is_admin_only() {
    let harness = TestHarness::new();
    harness.seed("acme/stuck", DryRunComplete);
    let params = UpdateRepositoryStatusParams {
        repository: "acme/stuck".to_string(),
        status: MigrationStatus::Pending,
        reason: Some("re-run dry run after fixes".to_string()),
    };

    let err = harness
        .orchestrator
        .update_repository_status(Some(&self_service()), params.clone())
        .await
        .unwrap_err();
    assert!(matches!(err, MigratorError::Unauthorized { .. }));

    let update = harness
        .orchestrator
        .update_repository_status(Some(&admin()), params)
        .await
        .unwrap();
    assert_eq!(update.previous_status, DryRunComplete);
    assert_eq!(harness.status_of("acme/stuck").await, Pending);
}

#[tokio::test]
async fn test_self_service_can_create_but_not_start() {
    let harness = TestHarness::new();
    harness.seed("acme/api", Pending);
    let caller = context(migrator_core::Permissions {
        can_read: true,
        can_migrate_own: true,
        can_migrate_all: false,
        can_manage_settings: false,
    });

    let batch = harness
        .orchestrator
        .create_batch(
            Some(&caller),
            CreateBatchParams {
                name: "mine".to_string(),
                repositories: vec!["acme/api".to_string()],
                ..CreateBatchParams::default()
            },
        )
        .await
        .unwrap();

    let err = harness
        .orchestrator
        .start_migration(
            Some(&caller),
            StartMigrationParams {
                batch_id: Some(batch.id),
                ..StartMigrationParams::default()
            },
        )
        .await
        .unwrap_err();
    assert_eq!(
        err.to_string(),
        "Operation 'start_migration' requires admin access"
    );
    assert_eq!(harness.status_of("acme/api").await, Pending);
}

#[tokio::test]
async fn test_read_only_caller_is_limited_to_queries() {
    let harness = TestHarness::new();
    harness.seed("acme/api", Pending);
    let caller = read_only();

    assert!(harness
        .orchestrator
        .list_batches(Some(&caller), ListBatchesParams::default())
        .await
        .is_ok());
    assert!(matches!(
        harness
            .orchestrator
            .plan_waves(Some(&caller), PlanWavesParams::default())
            .await,
        Err(MigratorError::Unauthorized { .. })
    ));
}

#[tokio::test]
async fn test_failed_batch_creation_leaves_no_batch_behind() {
    let harness = TestHarness::new();
    harness.seed("acme/api", Pending).seed("acme/flaky", Pending);
    harness.store.fail_writes_for("acme/flaky");

    let err = harness
        .orchestrator
        .create_batch(
            None,
            CreateBatchParams {
                name: "half".to_string(),
                repositories: vec!["acme/api".to_string(), "acme/flaky".to_string()],
                ..CreateBatchParams::default()
            },
        )
        .await
        .unwrap_err();
    assert!(!err.is_client_error());

    assert!(harness.store.list_batches().await.unwrap().is_empty());
    let api = harness.store.get_repository("acme/api").await.unwrap().unwrap();
    assert_eq!(api.batch_id, None);
}
