// src/store/postgres.rs

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, prelude::FromRow, types::Json};
use uuid::Uuid;

use crate::{
    models::{
        answer::AnswerValue,
        attempt::Attempt,
        question::{Question, QuestionId},
        quiz::{AssessmentKind, Quiz, QuizId},
    },
    store::{AssessmentStore, StoreError, StoreResult},
};

/// Represents the 'assessments' table. Questions, including answer keys, live in a JSONB column.
#[derive(Debug, FromRow)]
struct AssessmentRow {
    id: i64,
    kind: String,
    title: String,
    description: Option<String>,
    time_limit_minutes: Option<i32>,
    passing_score: i16,
    max_attempts: i32,
    shuffle_questions: bool,
    show_results_after_submit: bool,
    questions: Json<Vec<Question>>,
}

/// Represents the 'attempts' table.
#[derive(Debug, FromRow)]
struct AttemptRow {
    id: Uuid,
    kind: String,
    assessment_id: i64,
    user_id: i64,
    attempt_number: i32,
    started_at: DateTime<Utc>,
    completed_at: DateTime<Utc>,
    answers: Json<HashMap<QuestionId, AnswerValue>>,
    score: i16,
    earned_points: i32,
    total_points: i32,
    passed: bool,
    time_spent_seconds: i64,
}

fn parse_kind(raw: &str) -> StoreResult<AssessmentKind> {
    AssessmentKind::parse(raw)
        .ok_or_else(|| StoreError::Unexpected(format!("unknown assessment kind '{}'", raw)))
}

fn out_of_range(column: &str) -> StoreError {
    StoreError::Unexpected(format!("column '{}' out of range", column))
}

impl TryFrom<AssessmentRow> for Quiz {
    type Error = StoreError;

    fn try_from(row: AssessmentRow) -> Result<Self, Self::Error> {
        Ok(Quiz {
            id: row.id,
            kind: parse_kind(&row.kind)?,
            title: row.title,
            description: row.description,
            time_limit_minutes: row
                .time_limit_minutes
                .map(|m| u32::try_from(m).map_err(|_| out_of_range("time_limit_minutes")))
                .transpose()?,
            passing_score: u8::try_from(row.passing_score)
                .map_err(|_| out_of_range("passing_score"))?,
            max_attempts: u32::try_from(row.max_attempts)
                .map_err(|_| out_of_range("max_attempts"))?,
            shuffle_questions: row.shuffle_questions,
            show_results_after_submit: row.show_results_after_submit,
            questions: row.questions.0,
        })
    }
}

impl TryFrom<AttemptRow> for Attempt {
    type Error = StoreError;

    fn try_from(row: AttemptRow) -> Result<Self, Self::Error> {
        Ok(Attempt {
            id: row.id,
            kind: parse_kind(&row.kind)?,
            quiz_id: row.assessment_id,
            user_id: row.user_id,
            attempt_number: u32::try_from(row.attempt_number)
                .map_err(|_| out_of_range("attempt_number"))?,
            started_at: row.started_at,
            completed_at: row.completed_at,
            answers: row.answers.0,
            score: u8::try_from(row.score).map_err(|_| out_of_range("score"))?,
            earned_points: u32::try_from(row.earned_points)
                .map_err(|_| out_of_range("earned_points"))?,
            total_points: u32::try_from(row.total_points)
                .map_err(|_| out_of_range("total_points"))?,
            passed: row.passed,
            time_spent_seconds: u64::try_from(row.time_spent_seconds)
                .map_err(|_| out_of_range("time_spent_seconds"))?,
        })
    }
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => StoreError::NotFound(err.to_string()),
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                StoreError::Conflict(db.message().to_string())
            }
            _ => StoreError::Unexpected(err.to_string()),
        }
    }
}

/// Postgres-backed store. Schema lives in `migrations/`.
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        PgStore { pool }
    }

    async fn fetch(&self, kind: AssessmentKind, id: QuizId) -> StoreResult<Quiz> {
        let row = sqlx::query_as::<_, AssessmentRow>(
            r#"
            SELECT
                id, kind, title, description, time_limit_minutes, passing_score,
                max_attempts, shuffle_questions, show_results_after_submit, questions
            FROM assessments
            WHERE id = $1 AND kind = $2
            "#,
        )
        .bind(id)
        .bind(kind.as_str())
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch {} {}: {:?}", kind.as_str(), id, e);
            StoreError::from(e)
        })?
        .ok_or_else(|| StoreError::NotFound(format!("{} {}", kind.as_str(), id)))?;

        Quiz::try_from(row)
    }

    async fn attempts_for(
        &self,
        kind: AssessmentKind,
        user_id: i64,
        id: QuizId,
    ) -> StoreResult<Vec<Attempt>> {
        let rows = sqlx::query_as::<_, AttemptRow>(
            r#"
            SELECT
                id, kind, assessment_id, user_id, attempt_number, started_at, completed_at,
                answers, score, earned_points, total_points, passed, time_spent_seconds
            FROM attempts
            WHERE kind = $1 AND user_id = $2 AND assessment_id = $3
            ORDER BY attempt_number ASC
            "#,
        )
        .bind(kind.as_str())
        .bind(user_id)
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to fetch attempts: {:?}", e);
            StoreError::from(e)
        })?;

        rows.into_iter().map(Attempt::try_from).collect()
    }

    async fn insert_attempt(&self, attempt: &Attempt) -> StoreResult<Attempt> {
        let to_i32 = |v: u32, col: &str| i32::try_from(v).map_err(|_| out_of_range(col));
        let time_spent_seconds = i64::try_from(attempt.time_spent_seconds)
            .map_err(|_| out_of_range("time_spent_seconds"))?;

        // The unique (kind, assessment_id, user_id, attempt_number) constraint rejects a
        // second attempt started from the same history, e.g. in another browser tab.
        let row = sqlx::query_as::<_, AttemptRow>(
            r#"
            INSERT INTO attempts (
                id, kind, assessment_id, user_id, attempt_number, started_at, completed_at,
                answers, score, earned_points, total_points, passed, time_spent_seconds
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
            RETURNING
                id, kind, assessment_id, user_id, attempt_number, started_at, completed_at,
                answers, score, earned_points, total_points, passed, time_spent_seconds
            "#,
        )
        .bind(attempt.id)
        .bind(attempt.kind.as_str())
        .bind(attempt.quiz_id)
        .bind(attempt.user_id)
        .bind(to_i32(attempt.attempt_number, "attempt_number")?)
        .bind(attempt.started_at)
        .bind(attempt.completed_at)
        .bind(Json(&attempt.answers))
        .bind(i16::from(attempt.score))
        .bind(to_i32(attempt.earned_points, "earned_points")?)
        .bind(to_i32(attempt.total_points, "total_points")?)
        .bind(attempt.passed)
        .bind(time_spent_seconds)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to insert attempt {}: {:?}", attempt.id, e);
            StoreError::from(e)
        })?;

        Attempt::try_from(row)
    }
}

#[async_trait]
impl AssessmentStore for PgStore {
    async fn fetch_quiz(&self, quiz_id: QuizId) -> StoreResult<Quiz> {
        self.fetch(AssessmentKind::Quiz, quiz_id).await
    }

    async fn fetch_prior_attempts(
        &self,
        user_id: i64,
        quiz_id: QuizId,
    ) -> StoreResult<Vec<Attempt>> {
        self.attempts_for(AssessmentKind::Quiz, user_id, quiz_id)
            .await
    }

    async fn persist_attempt(&self, attempt: &Attempt) -> StoreResult<Attempt> {
        self.insert_attempt(attempt).await
    }

    async fn fetch_final_test(&self, test_id: QuizId) -> StoreResult<Quiz> {
        self.fetch(AssessmentKind::FinalTest, test_id).await
    }

    async fn fetch_final_test_attempts(
        &self,
        user_id: i64,
        test_id: QuizId,
    ) -> StoreResult<Vec<Attempt>> {
        self.attempts_for(AssessmentKind::FinalTest, user_id, test_id)
            .await
    }

    async fn persist_final_test_attempt(&self, attempt: &Attempt) -> StoreResult<Attempt> {
        self.insert_attempt(attempt).await
    }

    async fn save_assessment(&self, quiz: Quiz) -> StoreResult<Quiz> {
        let row = sqlx::query_as::<_, AssessmentRow>(
            r#"
            INSERT INTO assessments (
                kind, title, description, time_limit_minutes, passing_score,
                max_attempts, shuffle_questions, show_results_after_submit, questions
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING
                id, kind, title, description, time_limit_minutes, passing_score,
                max_attempts, shuffle_questions, show_results_after_submit, questions
            "#,
        )
        .bind(quiz.kind.as_str())
        .bind(&quiz.title)
        .bind(&quiz.description)
        .bind(
            quiz.time_limit_minutes
                .map(|m| i32::try_from(m).map_err(|_| out_of_range("time_limit_minutes")))
                .transpose()?,
        )
        .bind(i16::from(quiz.passing_score))
        .bind(i32::try_from(quiz.max_attempts).map_err(|_| out_of_range("max_attempts"))?)
        .bind(quiz.shuffle_questions)
        .bind(quiz.show_results_after_submit)
        .bind(Json(&quiz.questions))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to save assessment: {:?}", e);
            StoreError::from(e)
        })?;

        Quiz::try_from(row)
    }
}
