// src/grading/policy.rs

use crate::{
    config::PASSING_SCORE_PERCENTAGE,
    models::exam_result::{ExamStatus, Grade},
};

/// Maps a percentage score to a letter grade.
///
/// A: 90+, B: 80+, C: 70+, D: 60+, F below that.
pub fn letter_grade(score: f64) -> Grade {
    if score >= 90.0 {
        Grade::A
    } else if score >= 80.0 {
        Grade::B
    } else if score >= 70.0 {
        Grade::C
    } else if score >= PASSING_SCORE_PERCENTAGE {
        Grade::D
    } else {
        Grade::F
    }
}

/// An exam is passed at or above `PASSING_SCORE_PERCENTAGE`.
pub fn exam_status(score: f64) -> ExamStatus {
    if score >= PASSING_SCORE_PERCENTAGE {
        ExamStatus::Passed
    } else {
        ExamStatus::Failed
    }
}
