// src/models/answer.rs

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

/// A learner's answer to one question.
///
/// The variant is chosen by the client according to the question type; mismatches are
/// not rejected on record and simply grade as incorrect.
///
/// Wire form: `{"kind": "index", "value": 2}`, `{"kind": "index-set", "value": [0, 2]}`, ...
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "kebab-case")]
pub enum AnswerValue {
    /// Selected option (multiple-choice).
    Index(usize),
    /// Selected options (select-all-that-apply).
    IndexSet(BTreeSet<usize>),
    /// True/false.
    Bool(bool),
    /// Free text (short-answer, long-form-answer).
    Text(String),
    /// Item indices in the learner's chosen order (chronological-order).
    Order(Vec<usize>),
}

impl AnswerValue {
    /// Whether the answer carries no content at all (e.g. blank text, empty selection).
    pub fn is_blank(&self) -> bool {
        match self {
            AnswerValue::Text(t) => t.trim().is_empty(),
            AnswerValue::IndexSet(s) => s.is_empty(),
            AnswerValue::Order(o) => o.is_empty(),
            AnswerValue::Index(_) | AnswerValue::Bool(_) => false,
        }
    }
}
