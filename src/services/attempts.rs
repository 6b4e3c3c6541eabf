// src/services/attempts.rs

use std::{collections::HashMap, sync::Arc, time::Duration};

use chrono::{DateTime, Utc};
use rand::{SeedableRng, rngs::StdRng};
use serde::{Deserialize, Serialize};
use tokio::{sync::Mutex, task::JoinHandle};
use uuid::Uuid;

use crate::{
    config::{SUBMITTED_RETENTION, TIMER_TICK},
    engine::{
        AttemptError, AttemptHistory, AttemptSession, Grader, LearnerContext, SessionState,
        SessionTick, SubmitCause,
    },
    models::{
        answer::AnswerValue,
        attempt::{Attempt, QuestionOutcome},
        question::{PublicQuestion, QuestionId},
        quiz::{AssessmentKind, Quiz, QuizId},
    },
    store::{AssessmentStore, StoreError},
    utils::clock::{Clock, SystemClock},
};

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("{} {} not found", .kind.as_str(), .id)]
    AssessmentNotFound { kind: AssessmentKind, id: QuizId },

    #[error("Session {0} not found")]
    SessionNotFound(Uuid),

    #[error(transparent)]
    Attempt(#[from] AttemptError),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Whether a submitted attempt reached the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "error", rename_all = "snake_case")]
pub enum Persistence {
    NotSubmitted,
    Pending,
    Saved,
    /// The write failed. The graded result stays available; nothing retries it.
    Failed(String),
}

#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Navigation {
    Next,
    Previous,
    GoTo { index: usize },
}

/// Graded outcome as reported back to the learner.
#[derive(Debug, Clone, Serialize)]
pub struct SubmissionView {
    pub attempt_id: Uuid,
    pub attempt_number: u32,
    pub score: u8,
    pub earned_points: u32,
    pub total_points: u32,
    pub passed: bool,
    pub passing_score: u8,
    pub time_spent_seconds: u64,
    pub auto_submitted: bool,
    pub pending_review: usize,
    pub persistence: Persistence,

    /// Withheld when the assessment hides results after submission.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub questions: Option<Vec<QuestionOutcome>>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub session_id: Uuid,
    pub kind: AssessmentKind,
    pub assessment_id: QuizId,
    pub title: String,
    pub state: SessionState,
    pub attempt_number: u32,
    pub question_count: usize,
    pub current_index: usize,
    pub current_question: Option<PublicQuestion>,
    pub answers: HashMap<QuestionId, AnswerValue>,
    pub answered_count: usize,
    pub started_at: Option<DateTime<Utc>>,
    pub deadline: Option<DateTime<Utc>>,
    pub remaining_seconds: Option<u64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub submission: Option<SubmissionView>,
}

#[derive(Debug, Clone, Serialize)]
pub struct HistoryView {
    pub kind: AssessmentKind,
    pub assessment_id: QuizId,
    pub total_attempts: u32,
    pub best_score: Option<u8>,
    pub passed: bool,
    pub max_attempts: u32,
    pub attempts_remaining: u32,
    pub can_start: bool,
}

struct LiveSession {
    session: AttemptSession,
    persistence: Persistence,
    timer_task: Option<JoinHandle<()>>,
}

impl LiveSession {
    fn submission(&self) -> Option<SubmissionView> {
        let quiz = self.session.quiz();
        self.session.result().map(|r| SubmissionView {
            attempt_id: r.attempt.id,
            attempt_number: r.attempt.attempt_number,
            score: r.attempt.score,
            earned_points: r.attempt.earned_points,
            total_points: r.attempt.total_points,
            passed: r.attempt.passed,
            passing_score: quiz.passing_score,
            time_spent_seconds: r.attempt.time_spent_seconds,
            auto_submitted: r.auto_submitted,
            pending_review: r.pending_review_count(),
            persistence: self.persistence.clone(),
            questions: quiz
                .show_results_after_submit
                .then(|| r.questions.clone()),
        })
    }

    fn view(&self) -> SessionView {
        let s = &self.session;
        let quiz = s.quiz();
        SessionView {
            session_id: s.id(),
            kind: quiz.kind,
            assessment_id: quiz.id,
            title: quiz.title.clone(),
            state: s.state(),
            attempt_number: s.attempt_number(),
            question_count: s.question_count(),
            current_index: s.current_index(),
            current_question: s.current_question().map(PublicQuestion::from),
            answers: s.answers().clone(),
            answered_count: s.answered_count(),
            started_at: s.started_at(),
            deadline: s.deadline(),
            remaining_seconds: s.remaining_seconds(),
            submission: self.submission(),
        }
    }
}

/// Runs attempt sessions on behalf of the HTTP layer.
///
/// In-progress sessions live in memory only. Abandoning one (or restarting the
/// process) drops it without writing anything to the store. Submitted sessions
/// stay readable for the retention window after their save settles, then are evicted.
#[derive(Clone)]
pub struct AttemptService {
    store: Arc<dyn AssessmentStore>,
    clock: Arc<dyn Clock>,
    grader: Arc<Grader>,
    sessions: Arc<Mutex<HashMap<Uuid, LiveSession>>>,
    tick_interval: Duration,
    retention: Duration,
}

impl AttemptService {
    pub fn new(store: Arc<dyn AssessmentStore>) -> Self {
        Self::with_clock(store, Arc::new(SystemClock))
    }

    pub fn with_clock(store: Arc<dyn AssessmentStore>, clock: Arc<dyn Clock>) -> Self {
        AttemptService {
            store,
            clock,
            grader: Arc::new(Grader::default()),
            sessions: Arc::new(Mutex::new(HashMap::new())),
            tick_interval: TIMER_TICK,
            retention: SUBMITTED_RETENTION,
        }
    }

    pub fn with_grader(mut self, grader: Grader) -> Self {
        self.grader = Arc::new(grader);
        self
    }

    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = retention;
        self
    }

    /// Number of sessions currently held in memory.
    pub async fn live_sessions(&self) -> usize {
        self.sessions.lock().await.len()
    }

    pub fn store(&self) -> &Arc<dyn AssessmentStore> {
        &self.store
    }

    async fn load_assessment(
        &self,
        kind: AssessmentKind,
        id: QuizId,
    ) -> Result<Quiz, ServiceError> {
        self.store
            .fetch_assessment(kind, id)
            .await
            .map_err(|e| match e {
                StoreError::NotFound(_) => ServiceError::AssessmentNotFound { kind, id },
                other => ServiceError::Store(other),
            })
    }

    /// Starts a new attempt, or fails with `MaxAttemptsExceeded` carrying the
    /// learner's history.
    pub async fn start(
        &self,
        kind: AssessmentKind,
        id: QuizId,
        learner: LearnerContext,
    ) -> Result<SessionView, ServiceError> {
        let quiz = self.load_assessment(kind, id).await?;
        let attempts = self
            .store
            .fetch_attempts(kind, learner.user_id, id)
            .await?;
        let history = AttemptHistory::evaluate(&attempts);

        let mut session =
            AttemptSession::with_grader(learner, Arc::new(quiz), self.grader.clone());
        {
            let mut rng = StdRng::from_entropy();
            if let Err(e) = session.start(&history, self.clock.now(), &mut rng) {
                tracing::info!(
                    "User {} cannot start {} {}: {}",
                    learner.user_id,
                    kind.as_str(),
                    id,
                    e
                );
                return Err(e.into());
            }
        }

        let session_id = session.id();
        let timer_task = session.is_timed().then(|| self.spawn_timer(session_id));
        let live = LiveSession {
            session,
            persistence: Persistence::NotSubmitted,
            timer_task,
        };
        let view = live.view();

        self.sessions.lock().await.insert(session_id, live);
        tracing::info!(
            "User {} started {} {} (attempt {}, session {})",
            learner.user_id,
            kind.as_str(),
            id,
            view.attempt_number,
            session_id
        );

        Ok(view)
    }

    pub async fn view(
        &self,
        session_id: Uuid,
        learner: LearnerContext,
    ) -> Result<SessionView, ServiceError> {
        let sessions = self.sessions.lock().await;
        sessions
            .get(&session_id)
            .filter(|live| live.session.learner() == learner)
            .map(LiveSession::view)
            .ok_or(ServiceError::SessionNotFound(session_id))
    }

    pub async fn record_answer(
        &self,
        session_id: Uuid,
        learner: LearnerContext,
        question_id: QuestionId,
        value: AnswerValue,
    ) -> Result<SessionView, ServiceError> {
        let mut sessions = self.sessions.lock().await;
        let live = owned_mut(&mut sessions, session_id, learner)?;
        live.session.record_answer(question_id, value)?;
        Ok(live.view())
    }

    pub async fn navigate(
        &self,
        session_id: Uuid,
        learner: LearnerContext,
        nav: Navigation,
    ) -> Result<SessionView, ServiceError> {
        let mut sessions = self.sessions.lock().await;
        let live = owned_mut(&mut sessions, session_id, learner)?;
        match nav {
            Navigation::Next => live.session.next(),
            Navigation::Previous => live.session.previous(),
            Navigation::GoTo { index } => live.session.go_to_question(index),
        };
        Ok(live.view())
    }

    /// Submits the session. A repeated call returns the first result and writes nothing,
    /// until the session is evicted.
    pub async fn submit(
        &self,
        session_id: Uuid,
        learner: LearnerContext,
    ) -> Result<SubmissionView, ServiceError> {
        let attempt = {
            let mut sessions = self.sessions.lock().await;
            let live = owned_mut(&mut sessions, session_id, learner)?;

            if live.session.state() == SessionState::Submitted {
                return live
                    .submission()
                    .ok_or(ServiceError::SessionNotFound(session_id));
            }

            let attempt = live
                .session
                .submit(self.clock.now(), SubmitCause::Manual)?
                .attempt
                .clone();
            if let Some(task) = live.timer_task.take() {
                task.abort();
            }
            live.persistence = Persistence::Pending;
            attempt
        };

        self.persist(session_id, attempt).await;

        let sessions = self.sessions.lock().await;
        sessions
            .get(&session_id)
            .and_then(LiveSession::submission)
            .ok_or(ServiceError::SessionNotFound(session_id))
    }

    /// Drops an unfinished (or finished) session. Nothing is persisted.
    pub async fn abandon(
        &self,
        session_id: Uuid,
        learner: LearnerContext,
    ) -> Result<(), ServiceError> {
        let mut sessions = self.sessions.lock().await;
        owned_mut(&mut sessions, session_id, learner)?;

        if let Some(mut live) = sessions.remove(&session_id) {
            if let Some(task) = live.timer_task.take() {
                task.abort();
            }
            if live.session.state() == SessionState::InProgress {
                tracing::info!(
                    "Session {} abandoned by user {} with {} answers; nothing saved",
                    session_id,
                    learner.user_id,
                    live.session.answered_count()
                );
            }
        }
        Ok(())
    }

    pub async fn history(
        &self,
        kind: AssessmentKind,
        id: QuizId,
        learner: LearnerContext,
    ) -> Result<HistoryView, ServiceError> {
        let quiz = self.load_assessment(kind, id).await?;
        let attempts = self
            .store
            .fetch_attempts(kind, learner.user_id, id)
            .await?;
        let history = AttemptHistory::evaluate(&attempts);

        Ok(HistoryView {
            kind,
            assessment_id: id,
            total_attempts: history.total_attempts,
            best_score: history.best_score,
            passed: history.passed,
            max_attempts: quiz.max_attempts,
            attempts_remaining: history.attempts_remaining(quiz.max_attempts),
            can_start: history.can_start_new_attempt(quiz.max_attempts),
        })
    }

    fn spawn_timer(&self, session_id: Uuid) -> JoinHandle<()> {
        let service = self.clone();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(service.tick_interval);
            // The first tick completes immediately.
            interval.tick().await;
            loop {
                interval.tick().await;
                if !service.tick_session(session_id).await {
                    break;
                }
            }
        })
    }

    /// Returns false once the timer has nothing left to do.
    async fn tick_session(&self, session_id: Uuid) -> bool {
        let attempt = {
            let mut sessions = self.sessions.lock().await;
            let Some(live) = sessions.get_mut(&session_id) else {
                return false;
            };

            match live.session.tick(self.clock.now()) {
                SessionTick::Running(remaining) => {
                    tracing::trace!("Session {}: {}s remaining", session_id, remaining);
                    return true;
                }
                SessionTick::Idle => return false,
                SessionTick::AutoSubmitted => {
                    // This task is the timer; detach instead of aborting itself.
                    live.timer_task = None;
                    live.persistence = Persistence::Pending;
                    match live.session.result() {
                        Some(result) => result.attempt.clone(),
                        None => return false,
                    }
                }
            }
        };

        tracing::info!(
            "Session {} auto-submitted on time expiry (score {})",
            session_id,
            attempt.score
        );
        self.persist(session_id, attempt).await;
        false
    }

    async fn persist(&self, session_id: Uuid, attempt: Attempt) -> Persistence {
        let outcome = match self.store.persist(&attempt).await {
            Ok(saved) => {
                tracing::info!(
                    "Attempt {} saved for user {} (score {}, passed {})",
                    saved.id,
                    saved.user_id,
                    saved.score,
                    saved.passed
                );
                Persistence::Saved
            }
            Err(e) => {
                tracing::warn!("Failed to save attempt {}: {}", attempt.id, e);
                Persistence::Failed(e.to_string())
            }
        };

        if let Some(live) = self.sessions.lock().await.get_mut(&session_id) {
            live.persistence = outcome.clone();
            self.schedule_eviction(session_id);
        }
        outcome
    }

    fn schedule_eviction(&self, session_id: Uuid) {
        let sessions = self.sessions.clone();
        let retention = self.retention;
        tokio::spawn(async move {
            tokio::time::sleep(retention).await;
            let mut sessions = sessions.lock().await;
            let submitted = sessions
                .get(&session_id)
                .is_some_and(|live| live.session.state() == SessionState::Submitted);
            if submitted {
                sessions.remove(&session_id);
                tracing::debug!("Session {} evicted", session_id);
            }
        });
    }
}

fn owned_mut(
    sessions: &mut HashMap<Uuid, LiveSession>,
    session_id: Uuid,
    learner: LearnerContext,
) -> Result<&mut LiveSession, ServiceError> {
    sessions
        .get_mut(&session_id)
        .filter(|live| live.session.learner() == learner)
        .ok_or(ServiceError::SessionNotFound(session_id))
}
