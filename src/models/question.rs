// src/models/question.rs

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

pub type QuestionId = i64;

/// Upper bound on the points a single question can be worth.
pub const MAX_QUESTION_POINTS: u32 = 10_000;

/// A single question inside a quiz or final test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub id: QuestionId,

    /// Points awarded for a correct answer. Always positive.
    pub points: u32,

    /// The text shown to the learner.
    pub prompt: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media: Option<Media>,

    /// Answer format and answer key.
    /// Serialized inline with a `type` tag, e.g. `{"type": "true-false", ...}`.
    #[serde(flatten)]
    pub kind: QuestionKind,
}

/// Optional image or audio clip attached to a question prompt.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Media {
    pub kind: MediaKind,
    pub url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Image,
    Audio,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum QuestionKind {
    MultipleChoice {
        options: Vec<String>,
        correct_answer: usize,
    },
    SelectAllThatApply {
        options: Vec<String>,
        correct_answers: BTreeSet<usize>,
    },
    TrueFalse {
        correct_answer: bool,
    },
    ShortAnswer {
        /// Reference answer. Matching is delegated to the grading strategy.
        correct_answer: String,
    },
    LongFormAnswer {
        sample_answer: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        word_limit: Option<u32>,
    },
    ChronologicalOrder {
        items: Vec<String>,
        correct_order: Vec<usize>,
    },
}

/// Discriminant of [`QuestionKind`], used to key grading strategies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum QuestionType {
    MultipleChoice,
    SelectAllThatApply,
    TrueFalse,
    ShortAnswer,
    LongFormAnswer,
    ChronologicalOrder,
}

impl QuestionKind {
    pub fn question_type(&self) -> QuestionType {
        match self {
            QuestionKind::MultipleChoice { .. } => QuestionType::MultipleChoice,
            QuestionKind::SelectAllThatApply { .. } => QuestionType::SelectAllThatApply,
            QuestionKind::TrueFalse { .. } => QuestionType::TrueFalse,
            QuestionKind::ShortAnswer { .. } => QuestionType::ShortAnswer,
            QuestionKind::LongFormAnswer { .. } => QuestionType::LongFormAnswer,
            QuestionKind::ChronologicalOrder { .. } => QuestionType::ChronologicalOrder,
        }
    }
}

impl Question {
    pub fn question_type(&self) -> QuestionType {
        self.kind.question_type()
    }

    /// Checks the structural invariants of a question.
    /// Returns a short machine-readable code describing the first violation.
    pub fn check(&self) -> Result<(), &'static str> {
        if self.points == 0 {
            return Err("points_must_be_positive");
        }
        if self.points > MAX_QUESTION_POINTS {
            return Err("points_out_of_range");
        }
        if self.prompt.trim().is_empty() {
            return Err("prompt_cannot_be_empty");
        }

        match &self.kind {
            QuestionKind::MultipleChoice {
                options,
                correct_answer,
            } => {
                if options.len() < 2 {
                    return Err("needs_at_least_two_options");
                }
                if *correct_answer >= options.len() {
                    return Err("correct_answer_out_of_range");
                }
            }
            QuestionKind::SelectAllThatApply {
                options,
                correct_answers,
            } => {
                if options.len() < 2 {
                    return Err("needs_at_least_two_options");
                }
                if correct_answers.is_empty() {
                    return Err("correct_answers_cannot_be_empty");
                }
                if correct_answers.iter().any(|i| *i >= options.len()) {
                    return Err("correct_answer_out_of_range");
                }
            }
            QuestionKind::TrueFalse { .. } => {}
            QuestionKind::ShortAnswer { correct_answer } => {
                if correct_answer.trim().is_empty() {
                    return Err("reference_answer_cannot_be_empty");
                }
            }
            QuestionKind::LongFormAnswer { word_limit, .. } => {
                if *word_limit == Some(0) {
                    return Err("word_limit_must_be_positive");
                }
            }
            QuestionKind::ChronologicalOrder {
                items,
                correct_order,
            } => {
                if items.len() < 2 {
                    return Err("needs_at_least_two_items");
                }
                let mut seen: Vec<usize> = correct_order.clone();
                seen.sort_unstable();
                if seen != (0..items.len()).collect::<Vec<_>>() {
                    return Err("correct_order_must_be_a_permutation");
                }
            }
        }

        Ok(())
    }
}

/// Question as shown to a learner while taking an attempt: the answer key is stripped.
#[derive(Debug, Clone, Serialize)]
pub struct PublicQuestion {
    pub id: QuestionId,
    #[serde(rename = "type")]
    pub question_type: QuestionType,
    pub points: u32,
    pub prompt: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub media: Option<Media>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub word_limit: Option<u32>,
}

impl From<&Question> for PublicQuestion {
    fn from(q: &Question) -> Self {
        let (options, items, word_limit) = match &q.kind {
            QuestionKind::MultipleChoice { options, .. }
            | QuestionKind::SelectAllThatApply { options, .. } => {
                (Some(options.clone()), None, None)
            }
            QuestionKind::ChronologicalOrder { items, .. } => (None, Some(items.clone()), None),
            QuestionKind::LongFormAnswer { word_limit, .. } => (None, None, *word_limit),
            QuestionKind::TrueFalse { .. } | QuestionKind::ShortAnswer { .. } => {
                (None, None, None)
            }
        };

        PublicQuestion {
            id: q.id,
            question_type: q.question_type(),
            points: q.points,
            prompt: q.prompt.clone(),
            media: q.media.clone(),
            options,
            items,
            word_limit,
        }
    }
}
