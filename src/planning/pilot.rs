//! # Pilot Candidate Scoring
//!
//! Lower scores are safer pilots: few local dependencies, not archived, not a fork,
//! low complexity.

use crate::constants::scoring;
use crate::models::{ComplexityRating, Repository};
use crate::state_machine::MigrationStatus;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PilotCandidate {
    pub full_name: String,
    pub score: i64,
    pub complexity_score: Option<i64>,
    pub complexity_rating: ComplexityRating,
    pub local_dependency_count: i64,
    pub is_archived: bool,
    pub is_fork: bool,
    pub size_bytes: Option<i64>,
}

impl From<&Repository> for PilotCandidate {
    fn from(repository: &Repository) -> Self {
        Self {
            full_name: repository.full_name.clone(),
            score: pilot_score(repository),
            complexity_score: repository.complexity_score,
            complexity_rating: repository.complexity_rating(),
            local_dependency_count: repository.local_dependency_count,
            is_archived: repository.is_archived,
            is_fork: repository.is_fork,
            size_bytes: repository.size_bytes,
        }
    }
}

/// `10 x local dependencies + 5 x archived + 5 x fork + complexity`
pub fn pilot_score(repository: &Repository) -> i64 {
    scoring::LOCAL_DEPENDENCY_WEIGHT * repository.local_dependency_count
        + if repository.is_archived { scoring::ARCHIVED_WEIGHT } else { 0 }
        + if repository.is_fork { scoring::FORK_WEIGHT } else { 0 }
        + repository.complexity_score.unwrap_or(0)
}

/// Pending, not in a batch, and free of blocking validation findings
pub fn is_pilot_eligible(repository: &Repository) -> bool {
    repository.status == MigrationStatus::Pending
        && repository.batch_id.is_none()
        && !repository.has_blockers()
}

/// Lowest-scoring eligible repositories, ties kept in listing order.
pub fn rank_pilot_candidates<'a, I>(repositories: I, limit: usize) -> Vec<PilotCandidate>
where
    I: IntoIterator<Item = &'a Repository>,
{
    let mut candidates: Vec<PilotCandidate> = repositories
        .into_iter()
        .filter(|repo| is_pilot_eligible(repo))
        .map(PilotCandidate::from)
        .collect();

    candidates.sort_by_key(|candidate| candidate.score);
    candidates.truncate(limit);
    candidates
}
