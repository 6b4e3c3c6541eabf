// src/engine/history.rs

use serde::Serialize;

use crate::models::attempt::Attempt;

/// Aggregate view over every attempt a user made at one quiz. Derived, never stored.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct AttemptHistory {
    pub total_attempts: u32,
    pub best_score: Option<u8>,

    /// True if any attempt passed, even if later attempts scored lower.
    pub passed: bool,
}

impl AttemptHistory {
    pub fn evaluate(attempts: &[Attempt]) -> Self {
        attempts
            .iter()
            .fold(AttemptHistory::default(), |acc, attempt| AttemptHistory {
                total_attempts: acc.total_attempts + 1,
                best_score: Some(acc.best_score.map_or(attempt.score, |b| b.max(attempt.score))),
                passed: acc.passed || attempt.passed,
            })
    }

    pub fn can_start_new_attempt(&self, max_attempts: u32) -> bool {
        self.total_attempts < max_attempts
    }

    pub fn attempts_remaining(&self, max_attempts: u32) -> u32 {
        max_attempts.saturating_sub(self.total_attempts)
    }
}
