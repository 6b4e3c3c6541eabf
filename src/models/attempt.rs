// src/models/attempt.rs

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::{answer::AnswerValue, question::QuestionId, quiz::AssessmentKind};

/// One completed run through a quiz or final test by one user.
/// Created on submit and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attempt {
    pub id: Uuid,
    pub kind: AssessmentKind,
    pub quiz_id: i64,
    pub user_id: i64,
    pub attempt_number: u32,
    pub started_at: DateTime<Utc>,
    pub completed_at: DateTime<Utc>,
    pub answers: HashMap<QuestionId, AnswerValue>,

    /// Percentage 0-100.
    pub score: u8,
    pub earned_points: u32,
    pub total_points: u32,
    pub passed: bool,
    pub time_spent_seconds: u64,
}

/// Grading outcome of a single question within a submitted attempt.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuestionOutcome {
    pub question_id: QuestionId,

    /// `None` when the question awaits manual review.
    pub correct: Option<bool>,
    pub points_awarded: u32,
    pub points_possible: u32,
    pub pending_review: bool,
}

/// Finalized result of a session: the attempt record plus the per-question breakdown.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AttemptResult {
    pub attempt: Attempt,
    pub questions: Vec<QuestionOutcome>,
    pub auto_submitted: bool,
}

impl AttemptResult {
    pub fn pending_review_count(&self) -> usize {
        self.questions.iter().filter(|q| q.pending_review).count()
    }
}
