// src/engine/grader.rs

use std::collections::HashMap;

use serde::Serialize;

use crate::models::{
    answer::AnswerValue,
    question::{Question, QuestionKind, QuestionType},
};

/// Result of grading one answered question.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Grade {
    /// `None` when the answer cannot be auto-graded and waits for manual review.
    pub correct: Option<bool>,
    pub points_awarded: u32,
}

impl Grade {
    pub fn correct(points: u32) -> Self {
        Grade {
            correct: Some(true),
            points_awarded: points,
        }
    }

    pub fn incorrect() -> Self {
        Grade {
            correct: Some(false),
            points_awarded: 0,
        }
    }

    pub fn pending_review() -> Self {
        Grade {
            correct: None,
            points_awarded: 0,
        }
    }

    fn from_bool(correct: bool, points: u32) -> Self {
        if correct {
            Grade::correct(points)
        } else {
            Grade::incorrect()
        }
    }

    pub fn is_pending_review(&self) -> bool {
        self.correct.is_none()
    }
}

/// A grading rule for one question type.
///
/// Implementations must be pure: the same question and answer always yield the same grade.
/// `answer` is `None` when the learner left the question unanswered.
pub trait GradingStrategy: Send + Sync {
    fn grade(&self, question: &Question, answer: Option<&AnswerValue>) -> Grade;
}

/// Exact-match rules for the closed question types
/// (multiple-choice, select-all-that-apply, true-false, chronological-order).
#[derive(Debug, Default, Clone, Copy)]
pub struct ExactMatch;

impl GradingStrategy for ExactMatch {
    fn grade(&self, question: &Question, answer: Option<&AnswerValue>) -> Grade {
        let correct = match (&question.kind, answer) {
            (QuestionKind::MultipleChoice { correct_answer, .. }, Some(AnswerValue::Index(i))) => {
                i == correct_answer
            }
            (
                QuestionKind::SelectAllThatApply {
                    correct_answers, ..
                },
                Some(AnswerValue::IndexSet(selected)),
            ) => selected == correct_answers,
            (QuestionKind::TrueFalse { correct_answer }, Some(AnswerValue::Bool(b))) => {
                b == correct_answer
            }
            (
                QuestionKind::ChronologicalOrder { correct_order, .. },
                Some(AnswerValue::Order(order)),
            ) => order == correct_order,
            _ => false,
        };

        Grade::from_bool(correct, question.points)
    }
}

/// How a short-answer reference is compared with the learner's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextMatch {
    /// The first word of the reference appears anywhere in the answer, ignoring case.
    /// Loose: "Tang dynasty" accepts "not tang" as correct.
    FirstToken,
    /// Whole answer equals the reference, ignoring case and surrounding whitespace.
    Exact,
}

#[derive(Debug, Clone, Copy)]
pub struct ShortAnswerMatch {
    pub mode: TextMatch,
}

impl ShortAnswerMatch {
    pub fn first_token() -> Self {
        ShortAnswerMatch {
            mode: TextMatch::FirstToken,
        }
    }

    pub fn exact() -> Self {
        ShortAnswerMatch {
            mode: TextMatch::Exact,
        }
    }
}

impl GradingStrategy for ShortAnswerMatch {
    fn grade(&self, question: &Question, answer: Option<&AnswerValue>) -> Grade {
        let (QuestionKind::ShortAnswer { correct_answer }, Some(AnswerValue::Text(text))) =
            (&question.kind, answer)
        else {
            return Grade::incorrect();
        };

        if text.trim().is_empty() {
            return Grade::incorrect();
        }

        let correct = match self.mode {
            TextMatch::FirstToken => match correct_answer.split_whitespace().next() {
                Some(token) => text.to_lowercase().contains(&token.to_lowercase()),
                None => false,
            },
            TextMatch::Exact => text.trim().to_lowercase() == correct_answer.trim().to_lowercase(),
        };

        Grade::from_bool(correct, question.points)
    }
}

/// Never auto-grades. Used for long-form answers, or short answers when an
/// instructor prefers to review them by hand.
#[derive(Debug, Default, Clone, Copy)]
pub struct ManualReview;

impl GradingStrategy for ManualReview {
    fn grade(&self, _question: &Question, answer: Option<&AnswerValue>) -> Grade {
        match answer {
            Some(a) if !a.is_blank() => Grade::pending_review(),
            // Nothing to review.
            _ => Grade::incorrect(),
        }
    }
}

/// Dispatches each question to the strategy registered for its type.
pub struct Grader {
    strategies: HashMap<QuestionType, Box<dyn GradingStrategy>>,
}

impl Default for Grader {
    fn default() -> Self {
        let mut strategies: HashMap<QuestionType, Box<dyn GradingStrategy>> = HashMap::new();
        strategies.insert(QuestionType::MultipleChoice, Box::new(ExactMatch));
        strategies.insert(QuestionType::SelectAllThatApply, Box::new(ExactMatch));
        strategies.insert(QuestionType::TrueFalse, Box::new(ExactMatch));
        strategies.insert(QuestionType::ChronologicalOrder, Box::new(ExactMatch));
        strategies.insert(QuestionType::ShortAnswer, Box::new(ShortAnswerMatch::first_token()));
        strategies.insert(QuestionType::LongFormAnswer, Box::new(ManualReview));
        Grader { strategies }
    }
}

impl Grader {
    /// Replaces the strategy used for one question type.
    pub fn with_strategy(
        mut self,
        question_type: QuestionType,
        strategy: impl GradingStrategy + 'static,
    ) -> Self {
        self.strategies.insert(question_type, Box::new(strategy));
        self
    }

    pub fn grade(&self, question: &Question, answer: Option<&AnswerValue>) -> Grade {
        match self.strategies.get(&question.question_type()) {
            Some(strategy) => strategy.grade(question, answer),
            None => Grade::incorrect(),
        }
    }
}

impl std::fmt::Debug for Grader {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let mut types: Vec<_> = self.strategies.keys().collect();
        types.sort();
        f.debug_struct("Grader").field("types", &types).finish()
    }
}

/// Grades a question with the default rules.
pub fn grade(question: &Question, answer: Option<&AnswerValue>) -> Grade {
    Grader::default().grade(question, answer)
}
