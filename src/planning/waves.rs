//! # Dependency-Aware Wave Planner
//!
//! Partitions a repository set into ordered waves so that a repository lands in a
//! later wave than every local dependency that is part of the same input.
//!
//! Each pass scans the remaining repositories in input order and greedily admits
//! those whose in-set dependencies were placed by an earlier pass. Dependencies
//! outside the input are treated as satisfied. A pass that admits nothing means a
//! cycle among the remaining repositories; the planner then force-admits the next
//! `wave_size` repositories in input order so planning always terminates.
//!
//! ```rust
//! use migrator_core::planning::WavePlanner;
//! use std::collections::HashMap;
//!
//! let repositories = vec!["acme/app".to_string(), "acme/lib".to_string()];
//! let dependencies = HashMap::from([(
//!     "acme/app".to_string(),
//!     vec!["acme/lib".to_string()],
//! )]);
//!
//! let plan = WavePlanner::new(10).plan(&repositories, &dependencies);
//! assert_eq!(plan.waves.len(), 2);
//! assert_eq!(plan.waves[0].repositories, vec!["acme/lib"]);
//! assert_eq!(plan.waves[1].repositories, vec!["acme/app"]);
//! ```

use crate::config::OrchestrationConfig;
use crate::constants::system;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use tracing::{debug, warn};

/// One group of repositories that can migrate together
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Wave {
    /// 1-based position in the plan
    pub number: usize,
    pub repositories: Vec<String>,
    /// Admitted without checking dependencies (cycle break or pass bound)
    pub forced: bool,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WavePlan {
    pub waves: Vec<Wave>,
    pub wave_size: usize,
    pub total_repositories: usize,
    pub forced_waves: usize,
}

impl WavePlan {
    /// Wave number of a repository, if it was part of the plan
    pub fn wave_of(&self, full_name: &str) -> Option<usize> {
        self.waves
            .iter()
            .find(|wave| wave.repositories.iter().any(|name| name == full_name))
            .map(|wave| wave.number)
    }

    /// All repositories in plan order
    pub fn ordered_repositories(&self) -> impl Iterator<Item = &String> {
        self.waves.iter().flat_map(|wave| wave.repositories.iter())
    }

    pub fn has_forced_waves(&self) -> bool {
        self.forced_waves > 0
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WavePlanner {
    wave_size: usize,
    max_passes: usize,
}

impl Default for WavePlanner {
    fn default() -> Self {
        Self::new(system::DEFAULT_WAVE_SIZE)
    }
}

impl WavePlanner {
    /// Planner with the built-in bounds. Zero selects the default wave size; larger
    /// values are capped.
    pub fn new(wave_size: usize) -> Self {
        Self {
            wave_size: super::bounded_limit(
                Some(wave_size),
                system::DEFAULT_WAVE_SIZE,
                system::MAX_WAVE_SIZE,
            ),
            max_passes: system::MAX_PLANNING_PASSES,
        }
    }

    /// Planner bounded by configuration
    pub fn from_config(requested: Option<usize>, config: &OrchestrationConfig) -> Self {
        Self {
            wave_size: super::bounded_limit(
                requested,
                config.default_wave_size,
                config.max_wave_size,
            ),
            max_passes: config.max_planning_passes.max(1),
        }
    }

    pub fn wave_size(&self) -> usize {
        self.wave_size
    }

    /// Plan waves over `repositories` (in listing order). `local_dependencies` maps a
    /// repository to the repositories it depends on; entries for names outside the
    /// input are ignored, as are self-edges and duplicate input names.
    pub fn plan(
        &self,
        repositories: &[String],
        local_dependencies: &HashMap<String, Vec<String>>,
    ) -> WavePlan {
        let mut seen = HashSet::new();
        let mut remaining: Vec<&str> = repositories
            .iter()
            .map(String::as_str)
            .filter(|name| seen.insert(*name))
            .collect();
        let candidates = seen;
        let total_repositories = remaining.len();

        let mut placed: HashSet<&str> = HashSet::with_capacity(total_repositories);
        let mut waves: Vec<Wave> = Vec::new();
        let mut passes = 0;

        while !remaining.is_empty() && passes < self.max_passes {
            passes += 1;

            let mut admitted: Vec<&str> = Vec::with_capacity(self.wave_size);
            for name in &remaining {
                if admitted.len() >= self.wave_size {
                    break;
                }
                let ready = local_dependencies.get(*name).map_or(true, |deps| {
                    deps.iter().all(|dep| {
                        dep == name
                            || !candidates.contains(dep.as_str())
                            || placed.contains(dep.as_str())
                    })
                });
                if ready {
                    admitted.push(*name);
                }
            }

            let forced = admitted.is_empty();
            if forced {
                admitted = remaining.iter().take(self.wave_size).copied().collect();
                warn!(
                    wave = waves.len() + 1,
                    repositories = admitted.len(),
                    remaining = remaining.len(),
                    "Dependency cycle detected; force-admitting repositories in listing order"
                );
            }

            let admitted_set: HashSet<&str> = admitted.iter().copied().collect();
            remaining.retain(|name| !admitted_set.contains(name));
            placed.extend(admitted.iter().copied());
            waves.push(Wave {
                number: waves.len() + 1,
                repositories: admitted.into_iter().map(str::to_string).collect(),
                forced,
            });
        }

        if !remaining.is_empty() {
            warn!(
                passes = passes,
                remaining = remaining.len(),
                "Planning pass bound reached; appending remaining repositories in listing order"
            );
            for chunk in remaining.chunks(self.wave_size) {
                waves.push(Wave {
                    number: waves.len() + 1,
                    repositories: chunk.iter().map(|name| name.to_string()).collect(),
                    forced: true,
                });
            }
        }

        let forced_waves = waves.iter().filter(|wave| wave.forced).count();
        debug!(
            total_repositories = total_repositories,
            waves = waves.len(),
            forced_waves = forced_waves,
            wave_size = self.wave_size,
            "Wave plan computed"
        );

        WavePlan {
            waves,
            wave_size: self.wave_size,
            total_repositories,
            forced_waves,
        }
    }
}
