// src/services/grading.rs

use std::collections::HashMap;

use crate::models::{question::normalize_label, result::ResultStatus};

/// One answer-key row: the correct label and what it is worth.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AnswerKey {
    pub question_id: i64,
    pub correct_option: String,
    pub marks: i64,
}

/// Outcome of scoring one answer set.
#[derive(Debug, Clone, PartialEq)]
pub struct Grade {
    /// Number of questions answered correctly.
    pub score: i64,
    pub marks_obtained: i64,
    pub total_marks: i64,
    pub total_questions: usize,
    pub percentage: f64,
    pub status: ResultStatus,
}

/// Scores `answers` against `key`.
///
/// Unanswered questions and answers to questions outside the key earn
/// nothing. Labels are compared after trimming and upper-casing. There is
/// no partial credit and no negative marking.
pub fn grade(key: &[AnswerKey], answers: &HashMap<i64, String>, pass_marks: i64) -> Grade {
    let mut score = 0;
    let mut marks_obtained = 0;
    let mut total_marks = 0;

    for entry in key {
        total_marks += entry.marks;

        let Some(selected) = answers.get(&entry.question_id) else {
            continue;
        };

        if normalize_label(selected) == normalize_label(&entry.correct_option) {
            score += 1;
            marks_obtained += entry.marks;
        }
    }

    let percentage = if total_marks > 0 {
        marks_obtained as f64 / total_marks as f64 * 100.0
    } else {
        0.0
    };

    let status = if marks_obtained >= pass_marks {
        ResultStatus::Pass
    } else {
        ResultStatus::Fail
    };

    Grade {
        score,
        marks_obtained,
        total_marks,
        total_questions: key.len(),
        percentage,
        status,
    }
}
