// src/grading/mod.rs

//! Exam scoring engine.
//!
//! Grades every question of a submission, aggregates the outcomes into a
//! percentage score and derives the letter grade and pass/fail status.

pub mod aggregate;
pub mod grader;
pub mod normalize;
pub mod policy;

use std::collections::{HashMap, HashSet};

use chrono::Utc;
use futures::future::join_all;
use serde_json::Value;

use crate::{
    grading::{
        aggregate::aggregate,
        grader::{GradingOutcome, grade_question},
        normalize::answer_text,
        policy::{exam_status, letter_grade},
    },
    models::{
        exam_result::{AnswerDetail, ExamResult},
        question::Question,
    },
    services::evaluator::AnswerEvaluator,
};

/// Everything produced by grading one submission, before persistence.
#[derive(Debug, Clone)]
pub struct GradedSubmission {
    pub outcomes: Vec<GradingOutcome>,
    /// One row per question, in question order.
    pub details: Vec<AnswerDetail>,
    /// Answer keys that matched no question, sorted.
    pub ignored_answers: Vec<String>,
}

/// Grades all `questions` against `answers`.
///
/// Questions without an answer are graded as unanswered. Answers whose key
/// matches no question are skipped and reported in `ignored_answers`.
/// A repeated question id is graded once, using its last definition.
/// Open-ended evaluations run concurrently.
pub async fn grade_submission(
    questions: &[Question],
    answers: &HashMap<String, Value>,
    time_taken: &HashMap<String, Value>,
    evaluator: Option<&dyn AnswerEvaluator>,
) -> GradedSubmission {
    let questions = unique_by_id(questions);

    let known: HashSet<&str> = questions.iter().map(|q| q.id.as_str()).collect();
    let mut ignored_answers: Vec<String> = answers
        .keys()
        .filter(|id| !known.contains(id.as_str()))
        .cloned()
        .collect();
    ignored_answers.sort();

    for id in &ignored_answers {
        tracing::warn!(question_id = %id, "Answer references an unknown question, skipping");
    }

    let elapsed_times = elapsed_seconds(time_taken);

    let graded = join_all(questions.iter().map(|&question| {
        let elapsed_times = &elapsed_times;
        async move {
            let submitted = answers.get(&question.id).map(answer_text).unwrap_or_default();
            let elapsed = elapsed_times.get(question.id.as_str()).copied();
            let outcome = grade_question(question, &submitted, elapsed, evaluator).await;
            (question, submitted, elapsed, outcome)
        }
    }))
    .await;

    let mut outcomes = Vec::with_capacity(graded.len());
    let mut details = Vec::with_capacity(graded.len());

    for (question, submitted_answer, time_taken, outcome) in graded {
        details.push(AnswerDetail {
            question_id: question.id.clone(),
            question_text: question.text.clone(),
            question_type: question.question_type.as_str().to_string(),
            submitted_answer,
            correct_answer: question.correct_answer.clone(),
            score: outcome.raw_score,
            is_gradeable: outcome.is_gradeable,
            is_correct: outcome.is_correct(),
            feedback: outcome.feedback.clone(),
            time_taken,
            timed_out: outcome.timed_out,
        });
        outcomes.push(outcome);
    }

    GradedSubmission {
        outcomes,
        details,
        ignored_answers,
    }
}

/// Collapses repeated question ids. The first occurrence keeps its
/// position, the last occurrence supplies the question.
fn unique_by_id(questions: &[Question]) -> Vec<&Question> {
    let mut positions: HashMap<&str, usize> = HashMap::new();
    let mut unique: Vec<&Question> = Vec::with_capacity(questions.len());

    for question in questions {
        match positions.get(question.id.as_str()).copied() {
            Some(index) => {
                tracing::warn!(
                    question_id = %question.id,
                    "Duplicate question id, keeping the last definition"
                );
                unique[index] = question;
            }
            None => {
                positions.insert(question.id.as_str(), unique.len());
                unique.push(question);
            }
        }
    }

    unique
}

/// Client timings are advisory: anything that is not a finite,
/// non-negative number of seconds is dropped, which only disables the
/// time limit for that question.
fn elapsed_seconds(time_taken: &HashMap<String, Value>) -> HashMap<&str, f64> {
    time_taken
        .iter()
        .filter_map(|(id, value)| match value.as_f64() {
            Some(secs) if secs.is_finite() && secs >= 0.0 => Some((id.as_str(), secs)),
            _ => {
                tracing::warn!(question_id = %id, "Ignoring invalid elapsed time {}", value);
                None
            }
        })
        .collect()
}

/// Builds the result record for a graded submission.
pub fn summarize(user_id: i64, subject: String, outcomes: &[GradingOutcome]) -> ExamResult {
    let totals = aggregate(outcomes);

    ExamResult {
        user_id,
        subject,
        total_questions: outcomes.len() as u32,
        gradeable_questions: totals.gradeable_count,
        correct_answers: totals.correct_count,
        score: totals.score,
        grade: letter_grade(totals.score),
        status: exam_status(totals.score),
        timestamp: Utc::now(),
    }
}
