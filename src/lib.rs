#![allow(clippy::doc_markdown)] // Allow technical terms like PostgreSQL, SQLx in docs
#![allow(clippy::missing_errors_doc)] // Allow public functions without # Errors sections
#![allow(clippy::must_use_candidate)] // Allow methods without must_use when context is clear

//! # Migrator Core
//!
//! Orchestration engine for bulk source-control repository migrations.
//!
//! ## Overview
//!
//! Operators enqueue large repository sets; the engine sequences them so that no
//! repository migrates before the local dependencies it needs, tracks every
//! repository through the dry-run / production lifecycle, and exposes
//! authorization-gated controls for starting, cancelling and retrying work per
//! repository or per batch. Content transfer itself happens elsewhere; this crate
//! decides what may run and records it in the durable store.
//!
//! ## Module Organization
//!
//! - [`state_machine`] - Repository statuses and transition guards (pure)
//! - [`progress`] - Progress aggregation over status sets (pure)
//! - [`auth`] - Authorization gate, permissions and the session registry
//! - [`planning`] - Dependency-aware wave planner and pilot scoring (pure)
//! - [`orchestration`] - Batch lifecycle controller and tool-call dispatcher
//! - [`store`] - Durable store seam with in-memory and PostgreSQL implementations
//! - [`license`] - Seat-check cache in front of the identity provider
//! - [`cli_probe`] - Sanitized CLI availability probe
//! - [`config`] - Layered configuration
//! - [`error`] - Structured error handling
//! - [`logging`] - Tracing initialization and structured operation records
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use migrator_core::orchestration::MigrationOrchestrator;
//! use migrator_core::store::InMemoryMigrationStore;
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! # async fn example() -> migrator_core::Result<()> {
//! migrator_core::logging::init_tracing();
//!
//! let store = Arc::new(InMemoryMigrationStore::new());
//! let orchestrator = MigrationOrchestrator::with_defaults(store);
//!
//! let response = orchestrator
//!     .execute("find_pilot_candidates", json!({ "limit": 5 }), None)
//!     .await?;
//! println!("{}", response.summary);
//! # Ok(())
//! # }
//! ```
//!
//! ## Testing
//!
//! ```bash
//! cargo test --lib    # Unit tests
//! cargo test          # Unit, integration and property tests
//! ```

pub mod auth;
pub mod cli_probe;
pub mod config;
pub mod constants;
pub mod error;
pub mod license;
pub mod logging;
pub mod models;
pub mod orchestration;
pub mod planning;
pub mod progress;
pub mod state_machine;
pub mod store;

pub use auth::{AuthorizationContext, AuthorizationGate, Permissions, SessionRegistry, Tier};
pub use config::{ConfigManager, MigratorConfig};
pub use error::{MigratorError, Result};
pub use models::{Batch, BatchStatus, BatchType, DependencyEdge, MigrationApi, Repository};
pub use orchestration::{MigrationOrchestrator, OperationRequest, OperationResponse};
pub use planning::{WavePlan, WavePlanner};
pub use progress::{calculate_progress, ProgressSummary};
pub use state_machine::{can_queue_for_migration, is_cancellable, MigrationStatus};
pub use store::{InMemoryMigrationStore, MigrationStore};
