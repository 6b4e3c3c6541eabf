// src/engine/mod.rs
//
// Pure attempt logic: grading, the session state machine, the countdown and the
// attempt-history policy. Nothing in here performs I/O.

pub mod grader;
pub mod history;
pub mod session;
pub mod timer;

use crate::models::question::QuestionId;

pub use grader::{Grade, Grader, GradingStrategy};
pub use history::AttemptHistory;
pub use session::{AttemptSession, LearnerContext, SessionState, SessionTick, SubmitCause};
pub use timer::{AttemptTimer, Tick};

/// Errors raised by the attempt state machine.
#[derive(Debug, thiserror::Error)]
pub enum AttemptError {
    /// The learner used up every allowed attempt. Not fatal: the caller shows the
    /// best prior score instead of a new attempt.
    #[error("Maximum attempts reached ({max_attempts})")]
    MaxAttemptsExceeded {
        max_attempts: u32,
        history: AttemptHistory,
    },

    #[error("Assessment has no questions")]
    NoQuestions,

    #[error("Attempt already started")]
    AlreadyStarted,

    #[error("Attempt is not in progress (state: {0:?})")]
    NotInProgress(SessionState),

    #[error("Question {0} is not part of this assessment")]
    UnknownQuestion(QuestionId),
}
