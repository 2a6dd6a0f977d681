//! Data model: repositories, dependency edges and batches.

pub mod batch;
pub mod repository;

pub use batch::{Batch, BatchStatus, BatchType, MigrationApi, NewBatch};
pub use repository::{ComplexityRating, DependencyEdge, Repository, ValidationFlags};
