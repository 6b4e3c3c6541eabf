// tests/common/mod.rs

#![allow(dead_code)]

use std::collections::BTreeSet;

use lms_assessment::models::{
    question::{Question, QuestionKind},
    quiz::{AssessmentKind, Quiz},
};

pub fn multiple_choice(id: i64, points: u32, correct: usize) -> Question {
    Question {
        id,
        points,
        prompt: format!("Question {}", id),
        media: None,
        kind: QuestionKind::MultipleChoice {
            options: vec!["A".into(), "B".into(), "C".into()],
            correct_answer: correct,
        },
    }
}

pub fn select_all(id: i64, points: u32, correct: &[usize]) -> Question {
    Question {
        id,
        points,
        prompt: format!("Select all {}", id),
        media: None,
        kind: QuestionKind::SelectAllThatApply {
            options: vec!["A".into(), "B".into(), "C".into(), "D".into()],
            correct_answers: correct.iter().copied().collect::<BTreeSet<_>>(),
        },
    }
}

pub fn long_form(id: i64, points: u32) -> Question {
    Question {
        id,
        points,
        prompt: "Describe the role of the dougong bracket set.".to_string(),
        media: None,
        kind: QuestionKind::LongFormAnswer {
            sample_answer: "It transfers roof load to the columns.".to_string(),
            word_limit: Some(300),
        },
    }
}

pub fn quiz(kind: AssessmentKind, max_attempts: u32, questions: Vec<Question>) -> Quiz {
    Quiz {
        id: 0,
        kind,
        title: "Timber architecture".to_string(),
        description: Some("Lesson 3 check".to_string()),
        time_limit_minutes: None,
        passing_score: 60,
        max_attempts,
        shuffle_questions: false,
        show_results_after_submit: true,
        questions,
    }
}
