// src/engine/session.rs

use std::{collections::HashMap, sync::Arc};

use chrono::{DateTime, Duration, Utc};
use rand::{Rng, seq::SliceRandom};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    engine::{
        AttemptError,
        grader::Grader,
        history::AttemptHistory,
        timer::{AttemptTimer, Tick},
    },
    models::{
        answer::AnswerValue,
        attempt::{Attempt, AttemptResult, QuestionOutcome},
        question::{Question, QuestionId},
        quiz::Quiz,
    },
};

/// The user taking an attempt. Passed in explicitly rather than read from global state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct LearnerContext {
    pub user_id: i64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionState {
    NotStarted,
    InProgress,
    Submitted,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitCause {
    Manual,
    /// The countdown reached zero.
    Expired,
}

/// Outcome of driving a session's timer by one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionTick {
    Running(u64),
    /// This tick expired the timer and submitted the session.
    AutoSubmitted,
    /// Untimed, not in progress, or already expired.
    Idle,
}

/// One learner's run through one quiz: `NotStarted -> InProgress -> Submitted`.
#[derive(Debug)]
pub struct AttemptSession {
    id: Uuid,
    learner: LearnerContext,
    quiz: Arc<Quiz>,
    grader: Arc<Grader>,
    state: SessionState,

    /// Presentation order as indices into `quiz.questions`.
    order: Vec<usize>,
    current: usize,
    answers: HashMap<QuestionId, AnswerValue>,
    attempt_number: u32,
    started_at: Option<DateTime<Utc>>,
    deadline: Option<DateTime<Utc>>,
    timer: Option<AttemptTimer>,
    result: Option<AttemptResult>,
}

impl AttemptSession {
    pub fn new(learner: LearnerContext, quiz: Arc<Quiz>) -> Self {
        Self::with_grader(learner, quiz, Arc::new(Grader::default()))
    }

    pub fn with_grader(learner: LearnerContext, quiz: Arc<Quiz>, grader: Arc<Grader>) -> Self {
        let order = (0..quiz.questions.len()).collect();
        AttemptSession {
            id: Uuid::new_v4(),
            learner,
            quiz,
            grader,
            state: SessionState::NotStarted,
            order,
            current: 0,
            answers: HashMap::new(),
            attempt_number: 0,
            started_at: None,
            deadline: None,
            timer: None,
            result: None,
        }
    }

    /// Begins the attempt.
    ///
    /// `history` must cover every prior attempt of this learner at this quiz; the attempt
    /// cap is checked against it before anything else.
    pub fn start<R: Rng + ?Sized>(
        &mut self,
        history: &AttemptHistory,
        now: DateTime<Utc>,
        rng: &mut R,
    ) -> Result<(), AttemptError> {
        if self.state != SessionState::NotStarted {
            return Err(AttemptError::AlreadyStarted);
        }
        if !history.can_start_new_attempt(self.quiz.max_attempts) {
            return Err(AttemptError::MaxAttemptsExceeded {
                max_attempts: self.quiz.max_attempts,
                history: *history,
            });
        }
        if self.quiz.questions.is_empty() {
            return Err(AttemptError::NoQuestions);
        }

        if self.quiz.shuffle_questions {
            self.order.shuffle(rng);
        }

        let limit = self.quiz.time_limit_seconds();
        self.started_at = Some(now);
        self.deadline = limit.map(|secs| now + Duration::seconds(secs as i64));
        self.timer = limit.map(AttemptTimer::new);
        self.current = 0;
        self.answers.clear();
        self.attempt_number = history.total_attempts + 1;
        self.state = SessionState::InProgress;
        Ok(())
    }

    /// Stores the answer for a question, replacing any earlier one.
    pub fn record_answer(
        &mut self,
        question_id: QuestionId,
        value: AnswerValue,
    ) -> Result<(), AttemptError> {
        if self.state != SessionState::InProgress {
            return Err(AttemptError::NotInProgress(self.state));
        }
        if self.quiz.question(question_id).is_none() {
            return Err(AttemptError::UnknownQuestion(question_id));
        }

        self.answers.insert(question_id, value);
        Ok(())
    }

    /// Moves to `index` in presentation order, clamped to the valid range.
    pub fn go_to_question(&mut self, index: usize) -> usize {
        self.current = index.min(self.order.len().saturating_sub(1));
        self.current
    }

    pub fn next(&mut self) -> usize {
        self.go_to_question(self.current.saturating_add(1))
    }

    pub fn previous(&mut self) -> usize {
        self.go_to_question(self.current.saturating_sub(1))
    }

    /// Grades every question and finalizes the attempt.
    ///
    /// Calling it again after the first submission returns the same result.
    pub fn submit(
        &mut self,
        now: DateTime<Utc>,
        cause: SubmitCause,
    ) -> Result<&AttemptResult, AttemptError> {
        match self.state {
            SessionState::NotStarted => return Err(AttemptError::NotInProgress(self.state)),
            SessionState::Submitted => {}
            SessionState::InProgress => {
                let result = self.finalize(now, cause);
                if let Some(timer) = self.timer.as_mut() {
                    timer.cancel();
                }
                self.result = Some(result);
                self.state = SessionState::Submitted;
            }
        }

        self.result
            .as_ref()
            .ok_or(AttemptError::NotInProgress(self.state))
    }

    /// Advances the countdown by one second, auto-submitting when it reaches zero.
    pub fn tick(&mut self, now: DateTime<Utc>) -> SessionTick {
        if self.state != SessionState::InProgress {
            return SessionTick::Idle;
        }
        let Some(timer) = self.timer.as_mut() else {
            return SessionTick::Idle;
        };

        match timer.tick() {
            Tick::Running(remaining) => SessionTick::Running(remaining),
            Tick::Expired => match self.submit(now, SubmitCause::Expired) {
                Ok(_) => SessionTick::AutoSubmitted,
                Err(_) => SessionTick::Idle,
            },
            Tick::Stopped => SessionTick::Idle,
        }
    }

    fn finalize(&self, now: DateTime<Utc>, cause: SubmitCause) -> AttemptResult {
        let quiz = &self.quiz;

        let questions: Vec<QuestionOutcome> = quiz
            .questions
            .iter()
            .map(|q| {
                let grade = self.grader.grade(q, self.answers.get(&q.id));
                QuestionOutcome {
                    question_id: q.id,
                    correct: grade.correct,
                    points_awarded: grade.points_awarded,
                    points_possible: q.points,
                    pending_review: grade.is_pending_review(),
                }
            })
            .collect();

        let (earned_points, total_points) =
            questions.iter().fold((0u32, 0u32), |(earned, total), o| {
                (
                    earned.saturating_add(o.points_awarded),
                    total.saturating_add(o.points_possible),
                )
            });
        let score = score_percentage(earned_points, total_points);

        let started_at = self.started_at.unwrap_or(now);
        let time_spent_seconds = match (cause, quiz.time_limit_seconds()) {
            (SubmitCause::Expired, Some(limit)) => limit,
            _ => (now - started_at).num_seconds().max(0) as u64,
        };

        AttemptResult {
            attempt: Attempt {
                id: self.id,
                kind: quiz.kind,
                quiz_id: quiz.id,
                user_id: self.learner.user_id,
                attempt_number: self.attempt_number,
                started_at,
                completed_at: now,
                answers: self.answers.clone(),
                score,
                earned_points,
                total_points,
                passed: score >= quiz.passing_score,
                time_spent_seconds,
            },
            questions,
            auto_submitted: cause == SubmitCause::Expired,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn learner(&self) -> LearnerContext {
        self.learner
    }

    pub fn quiz(&self) -> &Quiz {
        &self.quiz
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn attempt_number(&self) -> u32 {
        self.attempt_number
    }

    pub fn started_at(&self) -> Option<DateTime<Utc>> {
        self.started_at
    }

    pub fn deadline(&self) -> Option<DateTime<Utc>> {
        self.deadline
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn question_count(&self) -> usize {
        self.order.len()
    }

    pub fn current_question(&self) -> Option<&Question> {
        self.order
            .get(self.current)
            .and_then(|&i| self.quiz.questions.get(i))
    }

    /// Questions in the order this session presents them.
    pub fn presented_questions(&self) -> impl Iterator<Item = &Question> + '_ {
        self.order.iter().filter_map(|&i| self.quiz.questions.get(i))
    }

    pub fn answers(&self) -> &HashMap<QuestionId, AnswerValue> {
        &self.answers
    }

    pub fn answered_count(&self) -> usize {
        self.answers.len()
    }

    /// `None` for untimed sessions.
    pub fn remaining_seconds(&self) -> Option<u64> {
        self.timer.as_ref().map(AttemptTimer::remaining_seconds)
    }

    pub fn is_timed(&self) -> bool {
        self.timer.is_some()
    }

    pub fn result(&self) -> Option<&AttemptResult> {
        self.result.as_ref()
    }
}

/// `round(100 * earned / total)`, or 0 when nothing can be earned.
pub fn score_percentage(earned_points: u32, total_points: u32) -> u8 {
    if total_points == 0 {
        return 0;
    }
    let pct = (f64::from(earned_points) * 100.0 / f64::from(total_points)).round();
    pct.clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use rand::{SeedableRng, rngs::StdRng};

    use super::*;
    use crate::models::{question::QuestionKind, quiz::AssessmentKind};

    fn mc(id: i64, correct: usize) -> Question {
        Question {
            id,
            points: 5,
            prompt: format!("Question {}", id),
            media: None,
            kind: QuestionKind::MultipleChoice {
                options: vec!["A".into(), "B".into(), "C".into()],
                correct_answer: correct,
            },
        }
    }

    fn quiz(questions: Vec<Question>) -> Arc<Quiz> {
        Arc::new(Quiz {
            id: 10,
            kind: AssessmentKind::Quiz,
            title: "Timber frames".to_string(),
            description: None,
            time_limit_minutes: Some(1),
            passing_score: 60,
            max_attempts: 2,
            shuffle_questions: false,
            show_results_after_submit: true,
            questions,
        })
    }

    fn started(quiz: Arc<Quiz>) -> AttemptSession {
        let mut s = AttemptSession::new(LearnerContext { user_id: 7 }, quiz);
        let mut rng = StdRng::seed_from_u64(1);
        s.start(&AttemptHistory::default(), Utc::now(), &mut rng)
            .unwrap();
        s
    }

    #[test]
    fn test_score_percentage() {
        assert_eq!(score_percentage(0, 0), 0);
        assert_eq!(score_percentage(5, 10), 50);
        assert_eq!(score_percentage(1, 3), 33);
        assert_eq!(score_percentage(2, 3), 67);
        assert_eq!(score_percentage(1, 8), 13);
        assert_eq!(score_percentage(10, 10), 100);
    }

    #[test]
    fn test_start_sets_up_session() {
        let s = started(quiz(vec![mc(1, 0), mc(2, 1)]));
        assert_eq!(s.state(), SessionState::InProgress);
        assert_eq!(s.attempt_number(), 1);
        assert_eq!(s.remaining_seconds(), Some(60));
        assert_eq!(s.current_question().map(|q| q.id), Some(1));
        assert!(s.deadline().unwrap() > s.started_at().unwrap());
    }

    #[test]
    fn test_start_twice_fails() {
        let mut s = started(quiz(vec![mc(1, 0)]));
        let mut rng = StdRng::seed_from_u64(2);
        let err = s
            .start(&AttemptHistory::default(), Utc::now(), &mut rng)
            .unwrap_err();
        assert!(matches!(err, AttemptError::AlreadyStarted));
    }

    #[test]
    fn test_start_empty_quiz_fails() {
        let mut s = AttemptSession::new(LearnerContext { user_id: 1 }, quiz(vec![]));
        let mut rng = StdRng::seed_from_u64(3);
        let err = s
            .start(&AttemptHistory::default(), Utc::now(), &mut rng)
            .unwrap_err();
        assert!(matches!(err, AttemptError::NoQuestions));
        assert_eq!(s.state(), SessionState::NotStarted);
    }

    #[test]
    fn test_start_blocked_by_attempt_cap() {
        let mut s = AttemptSession::new(LearnerContext { user_id: 1 }, quiz(vec![mc(1, 0)]));
        let history = AttemptHistory {
            total_attempts: 2,
            best_score: Some(45),
            passed: false,
        };
        let mut rng = StdRng::seed_from_u64(4);
        match s.start(&history, Utc::now(), &mut rng) {
            Err(AttemptError::MaxAttemptsExceeded {
                max_attempts,
                history,
            }) => {
                assert_eq!(max_attempts, 2);
                assert_eq!(history.best_score, Some(45));
            }
            other => panic!("expected MaxAttemptsExceeded, got {:?}", other),
        }
        assert_eq!(s.state(), SessionState::NotStarted);
    }

    #[test]
    fn test_shuffle_keeps_stored_order() {
        let questions: Vec<Question> = (1..=20).map(|i| mc(i, 0)).collect();
        let mut q = (*quiz(questions)).clone();
        q.shuffle_questions = true;
        let q = Arc::new(q);

        let s = started(q.clone());
        let presented: Vec<i64> = s.presented_questions().map(|q| q.id).collect();
        let stored: Vec<i64> = q.questions.iter().map(|q| q.id).collect();

        let mut sorted = presented.clone();
        sorted.sort();
        assert_eq!(sorted, stored);
        assert_eq!(s.quiz().questions[0].id, 1);
    }

    #[test]
    fn test_navigation_clamps() {
        let mut s = started(quiz(vec![mc(1, 0), mc(2, 0), mc(3, 0)]));
        assert_eq!(s.previous(), 0);
        assert_eq!(s.next(), 1);
        assert_eq!(s.next(), 2);
        assert_eq!(s.next(), 2);
        assert_eq!(s.go_to_question(99), 2);
        assert_eq!(s.go_to_question(0), 0);
    }

    #[test]
    fn test_record_answer_overwrites() {
        let mut s = started(quiz(vec![mc(1, 2)]));
        s.record_answer(1, AnswerValue::Index(0)).unwrap();
        s.record_answer(1, AnswerValue::Index(2)).unwrap();
        assert_eq!(s.answered_count(), 1);

        let result = s.submit(Utc::now(), SubmitCause::Manual).unwrap();
        assert_eq!(result.attempt.score, 100);
    }

    #[test]
    fn test_record_answer_rejects_unknown_question() {
        let mut s = started(quiz(vec![mc(1, 0)]));
        let err = s.record_answer(99, AnswerValue::Index(0)).unwrap_err();
        assert!(matches!(err, AttemptError::UnknownQuestion(99)));
    }

    #[test]
    fn test_record_answer_after_submit_fails() {
        let mut s = started(quiz(vec![mc(1, 0)]));
        s.submit(Utc::now(), SubmitCause::Manual).unwrap();
        let err = s.record_answer(1, AnswerValue::Index(0)).unwrap_err();
        assert!(matches!(
            err,
            AttemptError::NotInProgress(SessionState::Submitted)
        ));
    }

    #[test]
    fn test_submit_before_start_fails() {
        let mut s = AttemptSession::new(LearnerContext { user_id: 1 }, quiz(vec![mc(1, 0)]));
        assert!(s.submit(Utc::now(), SubmitCause::Manual).is_err());
    }

    #[test]
    fn test_submit_grades_unanswered_questions() {
        let mut s = started(quiz(vec![mc(1, 0), mc(2, 1)]));
        s.record_answer(1, AnswerValue::Index(0)).unwrap();

        let result = s.submit(Utc::now(), SubmitCause::Manual).unwrap();
        assert_eq!(result.questions.len(), 2);
        assert_eq!(result.attempt.earned_points, 5);
        assert_eq!(result.attempt.total_points, 10);
        assert_eq!(result.attempt.score, 50);
        assert!(!result.attempt.passed);
    }

    #[test]
    fn test_submit_is_idempotent() {
        let mut s = started(quiz(vec![mc(1, 0), mc(2, 1)]));
        s.record_answer(1, AnswerValue::Index(0)).unwrap();
        s.record_answer(2, AnswerValue::Index(1)).unwrap();

        let first = s.submit(Utc::now(), SubmitCause::Manual).unwrap().clone();
        let later = Utc::now() + Duration::seconds(30);
        let second = s.submit(later, SubmitCause::Manual).unwrap().clone();
        assert_eq!(first, second);
        assert_eq!(second.attempt.earned_points, 10);
    }

    #[test]
    fn test_submit_saturates_oversized_points() {
        let mut first = mc(1, 0);
        first.points = u32::MAX;
        let mut second = mc(2, 1);
        second.points = u32::MAX;
        let mut s = started(quiz(vec![first, second]));
        s.record_answer(1, AnswerValue::Index(0)).unwrap();
        s.record_answer(2, AnswerValue::Index(1)).unwrap();

        let result = s.submit(Utc::now(), SubmitCause::Manual).unwrap();
        assert_eq!(result.attempt.total_points, u32::MAX);
        assert_eq!(result.attempt.earned_points, u32::MAX);
        assert_eq!(result.attempt.score, 100);
    }

    #[test]
    fn test_select_all_partial_selection_scores_zero() {
        let q = Question {
            id: 1,
            points: 4,
            prompt: "Which are roof styles?".to_string(),
            media: None,
            kind: QuestionKind::SelectAllThatApply {
                options: vec!["Hip".into(), "Column".into(), "Gable".into()],
                correct_answers: BTreeSet::from([0, 2]),
            },
        };
        let mut s = started(quiz(vec![q]));
        s.record_answer(1, AnswerValue::IndexSet(BTreeSet::from([0])))
            .unwrap();
        let result = s.submit(Utc::now(), SubmitCause::Manual).unwrap();
        assert_eq!(result.questions[0].correct, Some(false));
        assert_eq!(result.attempt.score, 0);
    }

    #[test]
    fn test_timer_expiry_auto_submits_once() {
        let mut s = started(quiz(vec![mc(1, 0)]));
        let now = Utc::now();
        for _ in 0..59 {
            assert!(matches!(s.tick(now), SessionTick::Running(_)));
        }
        assert_eq!(s.tick(now), SessionTick::AutoSubmitted);
        assert_eq!(s.state(), SessionState::Submitted);
        assert_eq!(s.tick(now), SessionTick::Idle);

        let result = s.result().unwrap();
        assert!(result.auto_submitted);
        assert_eq!(result.attempt.time_spent_seconds, 60);
    }

    #[test]
    fn test_manual_submit_stops_timer() {
        let mut s = started(quiz(vec![mc(1, 0)]));
        s.tick(Utc::now());
        s.submit(Utc::now(), SubmitCause::Manual).unwrap();
        assert_eq!(s.tick(Utc::now()), SessionTick::Idle);
        assert!(!s.result().unwrap().auto_submitted);
    }

    #[test]
    fn test_untimed_session_never_ticks() {
        let mut q = (*quiz(vec![mc(1, 0)])).clone();
        q.time_limit_minutes = None;
        let mut s = started(Arc::new(q));
        assert_eq!(s.remaining_seconds(), None);
        assert_eq!(s.deadline(), None);
        assert_eq!(s.tick(Utc::now()), SessionTick::Idle);
    }

    #[test]
    fn test_time_spent_uses_clock() {
        let mut s = AttemptSession::new(LearnerContext { user_id: 3 }, quiz(vec![mc(1, 0)]));
        let start = Utc::now();
        let mut rng = StdRng::seed_from_u64(5);
        s.start(&AttemptHistory::default(), start, &mut rng).unwrap();
        let result = s
            .submit(start + Duration::seconds(42), SubmitCause::Manual)
            .unwrap();
        assert_eq!(result.attempt.time_spent_seconds, 42);
        assert_eq!(result.attempt.user_id, 3);
    }
}
