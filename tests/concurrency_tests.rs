//! Racing callers against a store with write latency. Time is paused, so every
//! interleaving below is the same on each run.

mod common;

use anyhow::Result;
use common::*;
use migrator_core::error::MigratorError;
use migrator_core::models::{BatchStatus, BatchType};
use migrator_core::orchestration::*;
use migrator_core::state_machine::MigrationStatus::*;
use migrator_core::store::MigrationStore;
use std::time::Duration;

const MEMBERS: [&str; 5] = ["acme/a", "acme/b", "acme/c", "acme/d", "acme/e"];

async fn five_member_batch(harness: &TestHarness) -> i64 {
    for name in MEMBERS {
        harness.seed(name, Pending);
    }
    harness.batch("race", BatchType::Custom, &MEMBERS).await
}

fn start(batch_id: i64) -> StartMigrationParams {
    StartMigrationParams {
        batch_id: Some(batch_id),
        repository: None,
        dry_run: true,
    }
}

#[tokio::test(start_paused = true)]
async fn test_concurrent_batch_starts_admit_exactly_one() -> Result<()> {
    let harness = TestHarness::with_latency();
    let batch_id = five_member_batch(&harness).await;

    let (first, second) = tokio::join!(
        harness.orchestrator.start_migration(None, start(batch_id)),
        harness.orchestrator.start_migration(None, start(batch_id)),
    );

    let (winner, loser) = match (first, second) {
        (Ok(winner), Err(loser)) | (Err(loser), Ok(winner)) => (winner, loser),
        (first, second) => anyhow::bail!("expected one winner, got {first:?} and {second:?}"),
    };
    assert!(matches!(loser, MigratorError::InvalidTransition(_)));
    assert_eq!(winner.succeeded.len(), MEMBERS.len());
    assert!(winner.failed.is_empty());

    for name in MEMBERS {
        assert_eq!(harness.status_of(name).await, DryRunQueued);
    }
    let batch = harness.store.get_batch(batch_id).await?.expect("batch exists");
    assert_eq!(batch.status, BatchStatus::InProgress);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cancel_during_start_stops_queuing() -> Result<()> {
    let harness = TestHarness::with_latency();
    let batch_id = five_member_batch(&harness).await;

    let (started, cancelled) = tokio::join!(
        harness.orchestrator.start_migration(None, start(batch_id)),
        async {
            tokio::time::sleep(Duration::from_millis(45)).await;
            harness
                .orchestrator
                .cancel_migration(
                    None,
                    CancelMigrationParams {
                        batch_id: Some(batch_id),
                        repository: None,
                    },
                )
                .await
        },
    );
    let started = started?;
    let cancelled = cancelled?;

    // The start claimed the batch, queued some members and then stopped.
    assert!(!started.succeeded.is_empty());
    assert!(started.succeeded.len() < MEMBERS.len());
    assert_eq!(
        started.succeeded.len() + started.skipped.len(),
        MEMBERS.len()
    );
    assert_eq!(
        started.batch.as_ref().map(|batch| batch.status),
        Some(BatchStatus::Cancelled)
    );

    // Whatever the start queued, the cancel reset.
    assert_eq!(cancelled.succeeded, started.succeeded);
    for name in MEMBERS {
        assert_eq!(harness.status_of(name).await, Pending, "{name}");
    }
    let batch = harness.store.get_batch(batch_id).await?.expect("batch exists");
    assert_eq!(batch.status, BatchStatus::Cancelled);
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_cancel_before_start_claims_batch_rejects_start() -> Result<()> {
    let harness = TestHarness::with_latency();
    let batch_id = five_member_batch(&harness).await;

    // The start reads the batch, then waits on the member listing while the
    // cancel flips it.
    let (started, cancelled) = tokio::join!(
        harness.orchestrator.start_migration(None, start(batch_id)),
        harness.orchestrator.cancel_migration(
            None,
            CancelMigrationParams {
                batch_id: Some(batch_id),
                repository: None,
            },
        ),
    );

    let err = started.expect_err("start must lose to the cancel");
    assert!(matches!(err, MigratorError::InvalidTransition(_)));
    assert!(cancelled?.succeeded.is_empty());
    for name in MEMBERS {
        assert_eq!(harness.status_of(name).await, Pending);
    }
    Ok(())
}

#[tokio::test(start_paused = true)]
async fn test_racing_repository_starts_queue_once() -> Result<()> {
    let harness = TestHarness::with_latency();
    harness.seed("acme/api", Pending);
    let single = || StartMigrationParams {
        batch_id: None,
        repository: Some("acme/api".to_string()),
        dry_run: true,
    };

    let (first, second) = tokio::join!(
        harness.orchestrator.start_migration(None, single()),
        harness.orchestrator.start_migration(None, single()),
    );

    let outcomes = [first, second];
    assert_eq!(outcomes.iter().filter(|outcome| outcome.is_ok()).count(), 1);
    assert!(outcomes
        .iter()
        .any(|outcome| matches!(outcome, Err(MigratorError::InvalidTransition(_)))));
    assert_eq!(harness.status_of("acme/api").await, DryRunQueued);
    Ok(())
}
