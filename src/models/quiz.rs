// src/models/quiz.rs

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::models::question::{MAX_QUESTION_POINTS, PublicQuestion, Question};

/// Upper bound on the points a whole assessment can be worth.
pub const MAX_TOTAL_POINTS: u32 = 10 * MAX_QUESTION_POINTS;

pub type QuizId = i64;

/// Scope of an assessment. Final tests reuse the quiz structure and grading rules
/// but are stored and counted separately (program/course level instead of lesson level).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssessmentKind {
    Quiz,
    FinalTest,
}

impl AssessmentKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            AssessmentKind::Quiz => "quiz",
            AssessmentKind::FinalTest => "final_test",
        }
    }

    pub fn parse(raw: &str) -> Option<Self> {
        match raw {
            "quiz" => Some(AssessmentKind::Quiz),
            "final_test" => Some(AssessmentKind::FinalTest),
            _ => None,
        }
    }
}

/// A lesson quiz or a final test, including its answer key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub id: QuizId,
    pub kind: AssessmentKind,
    pub title: String,
    pub description: Option<String>,

    /// `None` means the attempt is untimed.
    pub time_limit_minutes: Option<u32>,

    /// Minimum percentage (0-100) for an attempt to pass.
    pub passing_score: u8,

    /// At least 1.
    pub max_attempts: u32,

    pub shuffle_questions: bool,
    pub show_results_after_submit: bool,

    /// Questions in their authored order.
    pub questions: Vec<Question>,
}

impl Quiz {
    pub fn time_limit_seconds(&self) -> Option<u64> {
        self.time_limit_minutes.map(|m| u64::from(m) * 60)
    }

    pub fn total_points(&self) -> u32 {
        self.questions
            .iter()
            .fold(0u32, |total, q| total.saturating_add(q.points))
    }

    pub fn question(&self, id: i64) -> Option<&Question> {
        self.questions.iter().find(|q| q.id == id)
    }
}

/// Quiz as presented to learners before they start (no answer key).
#[derive(Debug, Serialize)]
pub struct PublicQuiz {
    pub id: QuizId,
    pub kind: AssessmentKind,
    pub title: String,
    pub description: Option<String>,
    pub time_limit_minutes: Option<u32>,
    pub passing_score: u8,
    pub max_attempts: u32,
    pub question_count: usize,
    pub total_points: u32,
    pub questions: Vec<PublicQuestion>,
}

impl From<&Quiz> for PublicQuiz {
    fn from(quiz: &Quiz) -> Self {
        PublicQuiz {
            id: quiz.id,
            kind: quiz.kind,
            title: quiz.title.clone(),
            description: quiz.description.clone(),
            time_limit_minutes: quiz.time_limit_minutes,
            passing_score: quiz.passing_score,
            max_attempts: quiz.max_attempts,
            question_count: quiz.questions.len(),
            total_points: quiz.total_points(),
            questions: quiz.questions.iter().map(PublicQuestion::from).collect(),
        }
    }
}

/// DTO for authoring a quiz or a final test.
#[derive(Debug, Deserialize, Validate)]
pub struct CreateAssessmentRequest {
    #[validate(length(min = 1, max = 200))]
    pub title: String,
    #[validate(length(max = 2000))]
    pub description: Option<String>,
    #[validate(range(min = 1, max = 1440))]
    pub time_limit_minutes: Option<u32>,
    #[validate(range(max = 100))]
    pub passing_score: u8,
    #[validate(range(min = 1))]
    pub max_attempts: u32,
    #[serde(default)]
    pub shuffle_questions: bool,
    #[serde(default = "default_show_results")]
    pub show_results_after_submit: bool,
    #[validate(length(min = 1, max = 200), custom(function = validate_questions))]
    pub questions: Vec<Question>,
}

fn default_show_results() -> bool {
    true
}

fn validate_questions(questions: &[Question]) -> Result<(), validator::ValidationError> {
    let mut ids = HashSet::new();
    let mut total_points: u64 = 0;
    for q in questions {
        if !ids.insert(q.id) {
            return Err(validator::ValidationError::new("duplicate_question_id"));
        }
        q.check().map_err(validator::ValidationError::new)?;
        total_points += u64::from(q.points);
    }
    if total_points > u64::from(MAX_TOTAL_POINTS) {
        return Err(validator::ValidationError::new("total_points_out_of_range"));
    }
    Ok(())
}

impl CreateAssessmentRequest {
    /// Builds the stored quiz. The id is assigned by the store.
    pub fn into_quiz(self, kind: AssessmentKind) -> Quiz {
        Quiz {
            id: 0,
            kind,
            title: self.title,
            description: self.description,
            time_limit_minutes: self.time_limit_minutes,
            passing_score: self.passing_score,
            max_attempts: self.max_attempts,
            shuffle_questions: self.shuffle_questions,
            show_results_after_submit: self.show_results_after_submit,
            questions: self.questions,
        }
    }
}
