//! # Tracing Module
//!
//! Environment-aware console logging using the tracing ecosystem, plus the
//! structured operation records emitted by the orchestrator.
//!
//! ## Configuration
//!
//! ```bash
//! # Environment (drives the default level): development | test | production
//! export MIGRATOR_ENV=production
//!
//! # Explicit level or full filter directive
//! export RUST_LOG=migrator_core=debug
//!
//! # JSON lines instead of human-readable output
//! export MIGRATOR_LOG_FORMAT=json
//! ```

use chrono::Utc;
use std::io::IsTerminal;
use std::sync::OnceLock;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

static TRACING_INITIALIZED: OnceLock<()> = OnceLock::new();

/// Initialize console tracing. Safe to call more than once and never panics when
/// another global subscriber is already installed.
pub fn init_tracing() {
    TRACING_INITIALIZED.get_or_init(|| {
        let environment = get_environment();
        let filter = build_filter(&environment);
        let json = use_json_format();

        let console_layer = if json {
            fmt::layer()
                .json()
                .with_target(true)
                .with_current_span(false)
                .with_filter(filter)
                .boxed()
        } else {
            fmt::layer()
                .with_target(true)
                .with_thread_ids(true)
                .with_level(true)
                .with_ansi(IsTerminal::is_terminal(&std::io::stdout()))
                .with_filter(filter)
                .boxed()
        };

        if tracing_subscriber::registry()
            .with(console_layer)
            .try_init()
            .is_err()
        {
            tracing::debug!(
                "Global tracing subscriber already initialized - continuing with existing subscriber"
            );
        } else {
            tracing::info!(
                environment = %environment,
                json = json,
                "Console logging initialized"
            );
        }
    });
}

/// Current environment from `MIGRATOR_ENV`, defaulting to development
fn get_environment() -> String {
    std::env::var("MIGRATOR_ENV").unwrap_or_else(|_| "development".to_string())
}

/// Default level for an environment when `RUST_LOG` is not set
fn get_log_level(environment: &str) -> &'static str {
    match environment {
        "production" => "info",
        _ => "debug",
    }
}

fn build_filter(environment: &str) -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(get_log_level(environment)))
}

fn use_json_format() -> bool {
    std::env::var("MIGRATOR_LOG_FORMAT")
        .map(|format| format.eq_ignore_ascii_case("json"))
        .unwrap_or(false)
}

/// Log structured data for an operation on a single repository
pub fn log_migration_operation(
    operation: &str,
    repository: &str,
    batch_id: Option<i64>,
    status: &str,
    details: Option<&str>,
) {
    tracing::info!(
        operation = %operation,
        repository = %repository,
        batch_id = batch_id,
        status = %status,
        details = details,
        timestamp = %Utc::now().to_rfc3339(),
        "📦 MIGRATION_OPERATION"
    );
}

/// Log structured data for a batch-wide operation and its fan-out counts
pub fn log_batch_operation(
    operation: &str,
    batch_id: i64,
    batch_name: &str,
    status: &str,
    succeeded: usize,
    skipped: usize,
    failed: usize,
) {
    tracing::info!(
        operation = %operation,
        batch_id = batch_id,
        batch_name = %batch_name,
        status = %status,
        succeeded = succeeded,
        skipped = skipped,
        failed = failed,
        timestamp = %Utc::now().to_rfc3339(),
        "🗂️ BATCH_OPERATION"
    );
}

/// Log an error with the operation and entity it was scoped to
pub fn log_error(operation: &str, entity: &str, error: &dyn std::error::Error) {
    tracing::error!(
        operation = %operation,
        entity = %entity,
        error = %error,
        timestamp = %Utc::now().to_rfc3339(),
        "❌ OPERATION_ERROR"
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_level_by_environment() {
        assert_eq!(get_log_level("production"), "info");
        assert_eq!(get_log_level("development"), "debug");
        assert_eq!(get_log_level("test"), "debug");
        assert_eq!(get_log_level("staging"), "debug");
    }

    #[test]
    fn test_init_tracing_is_idempotent() {
        init_tracing();
        init_tracing();
        log_migration_operation("start_migration", "acme/api", Some(1), "dry_run_queued", None);
        log_batch_operation("cancel_migration", 1, "pilot", "cancelled", 2, 1, 0);
    }
}
