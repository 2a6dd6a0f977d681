//! # Migration Planning
//!
//! Pure planning logic with no store access: dependency-aware wave layering and
//! pilot candidate scoring.

pub mod pilot;
pub mod waves;

pub use pilot::{is_pilot_eligible, pilot_score, rank_pilot_candidates, PilotCandidate};
pub use waves::{Wave, WavePlan, WavePlanner};

/// Resolve a caller-supplied bound: missing or zero means `default`, anything above
/// `max` is clamped.
pub fn bounded_limit(requested: Option<usize>, default: usize, max: usize) -> usize {
    match requested {
        None | Some(0) => default.min(max),
        Some(n) => n.min(max),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bounded_limit() {
        assert_eq!(bounded_limit(None, 10, 100), 10);
        assert_eq!(bounded_limit(Some(0), 10, 100), 10);
        assert_eq!(bounded_limit(Some(25), 10, 100), 25);
        assert_eq!(bounded_limit(Some(500), 10, 100), 100);
    }
}
