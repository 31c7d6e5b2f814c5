//! Heuristic compile score (0–100).
//!
//! Coverage of requested blocks and filters sets the base; constraint
//! violations and truncation subtract fixed penalties. The weights are
//! policy, configurable under `[scoring]`, not a stable contract.

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "snake_case")]
pub struct ScoringPolicy {
    pub violation_penalty: u8,
    pub truncation_penalty: u8,
    /// Lowest score ever reported.
    pub floor: u8,
}

impl Default for ScoringPolicy {
    fn default() -> Self {
        Self {
            violation_penalty: 15,
            truncation_penalty: 10,
            floor: 0,
        }
    }
}

impl ScoringPolicy {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.floor > 100 {
            return Err(AppError::Config("scoring.floor must be <= 100".into()));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ScoreInputs {
    /// Blocks and filters whose text reached the prompt.
    pub applied: usize,
    /// Blocks and filters dropped as unknown or empty.
    pub dropped: usize,
    pub violations: usize,
    pub truncated: bool,
}

pub fn score(inputs: &ScoreInputs, policy: &ScoringPolicy) -> u8 {
    let requested = inputs.applied + inputs.dropped;
    let coverage = if requested == 0 {
        100.0
    } else {
        100.0 * inputs.applied as f64 / requested as f64
    };

    let mut value = coverage.round() as i64;
    value -= inputs.violations as i64 * policy.violation_penalty as i64;
    if inputs.truncated {
        value -= policy.truncation_penalty as i64;
    }
    value.clamp(policy.floor as i64, 100) as u8
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_coverage_is_perfect() {
        let inputs = ScoreInputs { applied: 3, ..ScoreInputs::default() };
        assert_eq!(score(&inputs, &ScoringPolicy::default()), 100);
    }

    #[test]
    fn test_nothing_requested_is_perfect() {
        assert_eq!(score(&ScoreInputs::default(), &ScoringPolicy::default()), 100);
    }

    #[test]
    fn test_dropped_keys_reduce_coverage() {
        let inputs = ScoreInputs { applied: 2, dropped: 1, ..ScoreInputs::default() };
        assert_eq!(score(&inputs, &ScoringPolicy::default()), 67);
    }

    #[test]
    fn test_penalties_and_floor() {
        let inputs = ScoreInputs { applied: 1, dropped: 0, violations: 2, truncated: true };
        assert_eq!(score(&inputs, &ScoringPolicy::default()), 60);

        let harsh = ScoringPolicy { violation_penalty: 60, truncation_penalty: 0, floor: 5 };
        assert_eq!(score(&inputs, &harsh), 5);
    }
}
