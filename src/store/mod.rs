// src/store/mod.rs

pub mod memory;
pub mod postgres;

use async_trait::async_trait;

use crate::models::{
    attempt::Attempt,
    quiz::{AssessmentKind, Quiz, QuizId},
};

pub use memory::InMemoryStore;
pub use postgres::PgStore;

/// Failure reported by a store adapter.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Item not found: {0}")]
    NotFound(String),

    /// Unique constraint hit, e.g. the same attempt number persisted twice.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("An unexpected error occurred: {0}")]
    Unexpected(String),
}

pub type StoreResult<T> = Result<T, StoreError>;

/// Data access for assessments and their attempts.
///
/// Lesson quizzes and final tests share one shape but are kept apart: a quiz id and a
/// final-test id with the same number are different assessments.
#[async_trait]
pub trait AssessmentStore: Send + Sync {
    async fn fetch_quiz(&self, quiz_id: QuizId) -> StoreResult<Quiz>;

    /// Every completed attempt by `user_id` at this quiz, oldest first.
    async fn fetch_prior_attempts(&self, user_id: i64, quiz_id: QuizId)
    -> StoreResult<Vec<Attempt>>;

    /// Called once per submitted session.
    async fn persist_attempt(&self, attempt: &Attempt) -> StoreResult<Attempt>;

    async fn fetch_final_test(&self, test_id: QuizId) -> StoreResult<Quiz>;

    async fn fetch_final_test_attempts(
        &self,
        user_id: i64,
        test_id: QuizId,
    ) -> StoreResult<Vec<Attempt>>;

    async fn persist_final_test_attempt(&self, attempt: &Attempt) -> StoreResult<Attempt>;

    /// Stores a new assessment and returns it with its assigned id.
    async fn save_assessment(&self, quiz: Quiz) -> StoreResult<Quiz>;
}

/// Scope-dispatching helpers so callers can treat both assessment kinds uniformly.
impl dyn AssessmentStore {
    pub async fn fetch_assessment(&self, kind: AssessmentKind, id: QuizId) -> StoreResult<Quiz> {
        match kind {
            AssessmentKind::Quiz => self.fetch_quiz(id).await,
            AssessmentKind::FinalTest => self.fetch_final_test(id).await,
        }
    }

    pub async fn fetch_attempts(
        &self,
        kind: AssessmentKind,
        user_id: i64,
        id: QuizId,
    ) -> StoreResult<Vec<Attempt>> {
        match kind {
            AssessmentKind::Quiz => self.fetch_prior_attempts(user_id, id).await,
            AssessmentKind::FinalTest => self.fetch_final_test_attempts(user_id, id).await,
        }
    }

    pub async fn persist(&self, attempt: &Attempt) -> StoreResult<Attempt> {
        match attempt.kind {
            AssessmentKind::Quiz => self.persist_attempt(attempt).await,
            AssessmentKind::FinalTest => self.persist_final_test_attempt(attempt).await,
        }
    }
}
