//! # Repository Model
//!
//! A tracked source repository and its dependency edges.

use crate::constants::scoring;
use crate::state_machine::MigrationStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Pre-migration validation findings for a repository
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationFlags {
    pub has_blocking_files: bool,
    pub has_oversized_commits: bool,
    pub has_oversized_repository: bool,
    pub has_long_refs: bool,
    /// Warning only; never blocks migration
    pub has_large_file_warnings: bool,
}

impl ValidationFlags {
    /// Whether any finding would block migration
    pub fn has_blockers(&self) -> bool {
        self.has_blocking_files
            || self.has_oversized_commits
            || self.has_oversized_repository
            || self.has_long_refs
    }
}

/// A repository tracked by the migrator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Repository {
    /// `organization/name`
    pub full_name: String,
    pub status: MigrationStatus,
    pub is_archived: bool,
    pub is_fork: bool,
    pub complexity_score: Option<i64>,
    pub validation: Option<ValidationFlags>,
    /// Derived from local dependency edges by the store
    pub local_dependency_count: i64,
    pub batch_id: Option<i64>,
    /// Higher runs first
    pub priority: i32,
    pub size_bytes: Option<i64>,
    pub updated_at: DateTime<Utc>,
}

impl Repository {
    /// New pending repository with no findings.
    pub fn new(full_name: impl Into<String>) -> Self {
        Self {
            full_name: full_name.into(),
            status: MigrationStatus::Pending,
            is_archived: false,
            is_fork: false,
            complexity_score: None,
            validation: None,
            local_dependency_count: 0,
            batch_id: None,
            priority: 0,
            size_bytes: None,
            updated_at: Utc::now(),
        }
    }

    pub fn with_status(mut self, status: MigrationStatus) -> Self {
        self.status = status;
        self
    }

    pub fn with_complexity(mut self, score: i64) -> Self {
        self.complexity_score = Some(score);
        self
    }

    pub fn organization(&self) -> &str {
        self.full_name
            .split_once('/')
            .map(|(org, _)| org)
            .unwrap_or(&self.full_name)
    }

    pub fn has_blockers(&self) -> bool {
        self.validation.is_some_and(|v| v.has_blockers())
    }

    pub fn complexity_rating(&self) -> ComplexityRating {
        ComplexityRating::from_score(self.complexity_score.unwrap_or(0))
    }
}

/// Bucketed complexity score
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ComplexityRating {
    Simple,
    Medium,
    Complex,
    VeryComplex,
}

impl ComplexityRating {
    pub const ALL: [ComplexityRating; 4] = [
        Self::Simple,
        Self::Medium,
        Self::Complex,
        Self::VeryComplex,
    ];

    pub fn from_score(score: i64) -> Self {
        if score <= scoring::SIMPLE_MAX {
            Self::Simple
        } else if score <= scoring::MEDIUM_MAX {
            Self::Medium
        } else if score <= scoring::COMPLEX_MAX {
            Self::Complex
        } else {
            Self::VeryComplex
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Simple => "simple",
            Self::Medium => "medium",
            Self::Complex => "complex",
            Self::VeryComplex => "very_complex",
        }
    }
}

impl fmt::Display for ComplexityRating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Directed dependency edge from a repository to something it needs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct DependencyEdge {
    pub repository: String,
    pub dependency: String,
    /// e.g. `submodule`, `workflow`, `package`
    pub dependency_type: String,
    /// Points at another tracked repository (as opposed to an external package)
    pub is_local: bool,
}

impl DependencyEdge {
    pub fn local(
        repository: impl Into<String>,
        dependency: impl Into<String>,
        dependency_type: impl Into<String>,
    ) -> Self {
        Self {
            repository: repository.into(),
            dependency: dependency.into(),
            dependency_type: dependency_type.into(),
            is_local: true,
        }
    }

    pub fn external(
        repository: impl Into<String>,
        dependency: impl Into<String>,
        dependency_type: impl Into<String>,
    ) -> Self {
        Self {
            is_local: false,
            ..Self::local(repository, dependency, dependency_type)
        }
    }
}
