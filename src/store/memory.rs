// src/store/memory.rs

use std::{
    collections::HashMap,
    sync::atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::{
    models::{
        attempt::Attempt,
        quiz::{AssessmentKind, Quiz, QuizId},
    },
    store::{AssessmentStore, StoreError, StoreResult},
};

#[derive(Default)]
struct Inner {
    assessments: HashMap<(AssessmentKind, QuizId), Quiz>,
    attempts: Vec<Attempt>,
    next_id: QuizId,
}

/// Process-local store. Used when no `DATABASE_URL` is configured, and by the tests.
#[derive(Default)]
pub struct InMemoryStore {
    inner: RwLock<Inner>,
    reject_writes: AtomicBool,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Makes every attempt write fail with `StoreError::Unexpected`, emulating an
    /// unreachable backend.
    pub fn set_reject_writes(&self, reject: bool) {
        self.reject_writes.store(reject, Ordering::SeqCst);
    }

    pub async fn attempt_count(&self) -> usize {
        self.inner.read().await.attempts.len()
    }

    async fn fetch(&self, kind: AssessmentKind, id: QuizId) -> StoreResult<Quiz> {
        self.inner
            .read()
            .await
            .assessments
            .get(&(kind, id))
            .cloned()
            .ok_or_else(|| StoreError::NotFound(format!("{} {}", kind.as_str(), id)))
    }

    async fn attempts_for(
        &self,
        kind: AssessmentKind,
        user_id: i64,
        id: QuizId,
    ) -> StoreResult<Vec<Attempt>> {
        let inner = self.inner.read().await;
        let mut attempts: Vec<Attempt> = inner
            .attempts
            .iter()
            .filter(|a| a.kind == kind && a.user_id == user_id && a.quiz_id == id)
            .cloned()
            .collect();
        attempts.sort_by_key(|a| a.attempt_number);
        Ok(attempts)
    }

    async fn insert_attempt(&self, attempt: &Attempt) -> StoreResult<Attempt> {
        if self.reject_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Unexpected("store is rejecting writes".to_string()));
        }

        let mut inner = self.inner.write().await;
        let duplicate = inner.attempts.iter().any(|a| {
            a.id == attempt.id
                || (a.kind == attempt.kind
                    && a.quiz_id == attempt.quiz_id
                    && a.user_id == attempt.user_id
                    && a.attempt_number == attempt.attempt_number)
        });
        if duplicate {
            return Err(StoreError::Conflict(format!(
                "attempt {} already recorded for user {}",
                attempt.attempt_number, attempt.user_id
            )));
        }

        inner.attempts.push(attempt.clone());
        Ok(attempt.clone())
    }
}

#[async_trait]
impl AssessmentStore for InMemoryStore {
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

    async fn save_assessment(&self, mut quiz: Quiz) -> StoreResult<Quiz> {
        let mut inner = self.inner.write().await;
        inner.next_id += 1;
        quiz.id = inner.next_id;
        inner.assessments.insert((quiz.kind, quiz.id), quiz.clone());
        Ok(quiz)
    }
}
