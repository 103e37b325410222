// src/grading/grader.rs

use crate::{
    grading::{aggregate::round2, normalize::normalize},
    models::question::Question,
    services::evaluator::AnswerEvaluator,
};

/// Score of a fully correct answer.
pub const FULL_MARKS: f64 = 100.0;

const TIME_LIMIT_EXCEEDED: &str = "Time limit exceeded";
const NO_EVALUATOR: &str = "Automatic evaluation is not available; excluded from the score";
const EVALUATOR_FAILED: &str = "Automatic evaluation failed; excluded from the score";
const NO_ANSWER: &str = "No answer submitted";

/// Result of grading one question.
#[derive(Debug, Clone, PartialEq)]
pub struct GradingOutcome {
    pub question_id: String,
    /// 0-100.
    pub raw_score: f64,
    /// False when the question is left out of the aggregate.
    pub is_gradeable: bool,
    pub feedback: Option<String>,
    pub timed_out: bool,
}

impl GradingOutcome {
    /// A question counts as correct only at full marks.
    pub fn is_correct(&self) -> bool {
        self.is_gradeable && self.raw_score >= FULL_MARKS
    }
}

/// Exact-match grading.
///
/// Returns `(score, gradeable)`. Objective kinds score 100 on a normalized
/// match and 0 otherwise; an empty answer or a missing reference never
/// matches. Open-ended kinds cannot be graded here and come back ungradeable.
pub fn grade(question: &Question, submitted_answer: &str) -> (f64, bool) {
    if question.question_type.is_open_ended() {
        return (0.0, false);
    }

    let given = normalize(submitted_answer);
    let matched = match question.correct_answer.as_deref() {
        Some(expected) => !given.is_empty() && given == normalize(expected),
        None => false,
    };

    (if matched { FULL_MARKS } else { 0.0 }, true)
}

/// Grades one question, delegating essay and coding answers to `evaluator`.
///
/// `elapsed_secs` is the client-reported time spent on the question; past the
/// question's `time_limit` the answer is graded as unanswered. Without an
/// evaluator, or when it fails, open-ended questions are excluded.
pub async fn grade_question(
    question: &Question,
    submitted_answer: &str,
    elapsed_secs: Option<f64>,
    evaluator: Option<&dyn AnswerEvaluator>,
) -> GradingOutcome {
    let timed_out = elapsed_secs.is_some_and(|secs| secs > f64::from(question.time_limit));
    let outcome = |raw_score: f64, is_gradeable: bool, feedback: Option<String>| GradingOutcome {
        question_id: question.id.clone(),
        raw_score,
        is_gradeable,
        feedback,
        timed_out,
    };

    if !question.question_type.is_open_ended() {
        if timed_out {
            return outcome(0.0, true, Some(TIME_LIMIT_EXCEEDED.to_string()));
        }
        let (score, gradeable) = grade(question, submitted_answer);
        return outcome(score, gradeable, None);
    }

    let Some(evaluator) = evaluator else {
        return outcome(0.0, false, Some(NO_EVALUATOR.to_string()));
    };

    if timed_out {
        return outcome(0.0, true, Some(TIME_LIMIT_EXCEEDED.to_string()));
    }
    if submitted_answer.trim().is_empty() {
        return outcome(0.0, true, Some(NO_ANSWER.to_string()));
    }

    match evaluator
        .evaluate_open_ended(
            &question.text,
            question.correct_answer.as_deref(),
            submitted_answer,
        )
        .await
    {
        Ok(evaluation) => {
            let score = if evaluation.overall_score.is_finite() {
                round2(evaluation.overall_score.clamp(0.0, FULL_MARKS))
            } else {
                0.0
            };
            let feedback = Some(evaluation.feedback).filter(|f| !f.trim().is_empty());
            outcome(score, true, feedback)
        }
        Err(e) => {
            tracing::warn!(question_id = %question.id, "Open-ended evaluation failed: {}", e);
            outcome(0.0, false, Some(EVALUATOR_FAILED.to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        error::AppError,
        models::question::QuestionType,
        services::evaluator::Evaluation,
    };
    use async_trait::async_trait;

    fn question(kind: QuestionType, correct: Option<&str>) -> Question {
        Question {
            id: "q1".to_string(),
            text: "What is the capital of France?".to_string(),
            question_type: kind,
            options: vec![],
            correct_answer: correct.map(str::to_string),
            subject: None,
            time_limit: 30,
        }
    }

    struct FixedEvaluator(f64);

    #[async_trait]
    impl AnswerEvaluator for FixedEvaluator {
        async fn evaluate_open_ended(
            &self,
            _question_text: &str,
            _reference_answer: Option<&str>,
            _submitted_answer: &str,
        ) -> Result<Evaluation, AppError> {
            Ok(Evaluation {
                overall_score: self.0,
                feedback: "Solid reasoning.".to_string(),
            })
        }
    }

    struct BrokenEvaluator;

    #[async_trait]
    impl AnswerEvaluator for BrokenEvaluator {
        async fn evaluate_open_ended(
            &self,
            _question_text: &str,
            _reference_answer: Option<&str>,
            _submitted_answer: &str,
        ) -> Result<Evaluation, AppError> {
            Err(AppError::UpstreamError("provider down".to_string()))
        }
    }

    #[test]
    fn mcq_match_ignores_case_and_whitespace() {
        let q = question(QuestionType::Mcq, Some("Paris"));
        assert_eq!(grade(&q, " paris "), (100.0, true));
        assert_eq!(grade(&q, "Lyon"), (0.0, true));
    }

    #[test]
    fn true_false_and_short_answer_use_exact_match() {
        let tf = question(QuestionType::TrueFalse, Some("True"));
        assert_eq!(grade(&tf, "true"), (100.0, true));

        let short = question(QuestionType::ShortAnswer, Some("5"));
        assert_eq!(grade(&short, "five"), (0.0, true));
    }

    #[test]
    fn empty_answer_is_incorrect_not_an_error() {
        let q = question(QuestionType::Mcq, Some("Paris"));
        assert_eq!(grade(&q, ""), (0.0, true));
        assert_eq!(grade(&q, "   "), (0.0, true));

        let no_key = question(QuestionType::ShortAnswer, None);
        assert_eq!(grade(&no_key, ""), (0.0, true));
    }

    #[test]
    fn open_ended_is_not_gradeable_by_exact_match() {
        let essay = question(QuestionType::Essay, Some("Paris"));
        assert_eq!(grade(&essay, "Paris"), (0.0, false));
    }

    #[tokio::test]
    async fn essay_uses_evaluator_score_and_feedback() {
        let essay = question(QuestionType::Essay, None);
        let outcome = grade_question(&essay, "A long essay.", None, Some(&FixedEvaluator(83.0) as &dyn AnswerEvaluator)).await;

        assert!(outcome.is_gradeable);
        assert_eq!(outcome.raw_score, 83.0);
        assert!(!outcome.is_correct());
        assert_eq!(outcome.feedback.as_deref(), Some("Solid reasoning."));
    }

    #[tokio::test]
    async fn evaluator_score_is_clamped() {
        let coding = question(QuestionType::Coding, None);
        let outcome = grade_question(&coding, "fn main() {}", None, Some(&FixedEvaluator(140.0) as &dyn AnswerEvaluator)).await;
        assert_eq!(outcome.raw_score, 100.0);
        assert!(outcome.is_correct());
    }

    #[tokio::test]
    async fn evaluator_failure_excludes_question() {
        let coding = question(QuestionType::Coding, None);
        let outcome = grade_question(&coding, "fn main() {}", None, Some(&BrokenEvaluator as &dyn AnswerEvaluator)).await;

        assert!(!outcome.is_gradeable);
        assert_eq!(outcome.feedback.as_deref(), Some(EVALUATOR_FAILED));
    }

    #[tokio::test]
    async fn missing_evaluator_excludes_question() {
        let essay = question(QuestionType::Essay, None);
        let outcome = grade_question(&essay, "text", None, None).await;
        assert!(!outcome.is_gradeable);
        assert_eq!(outcome.raw_score, 0.0);
    }

    #[tokio::test]
    async fn answer_past_time_limit_scores_zero() {
        let q = question(QuestionType::Mcq, Some("Paris"));

        let late = grade_question(&q, "Paris", Some(30.5), None).await;
        assert!(late.timed_out);
        assert!(late.is_gradeable);
        assert_eq!(late.raw_score, 0.0);

        let on_time = grade_question(&q, "Paris", Some(30.0), None).await;
        assert!(!on_time.timed_out);
        assert_eq!(on_time.raw_score, 100.0);
    }

    #[tokio::test]
    async fn late_essay_skips_evaluator() {
        let essay = question(QuestionType::Essay, None);
        let outcome = grade_question(&essay, "text", Some(600.0), Some(&BrokenEvaluator as &dyn AnswerEvaluator)).await;

        assert!(outcome.timed_out);
        assert!(outcome.is_gradeable);
        assert_eq!(outcome.feedback.as_deref(), Some(TIME_LIMIT_EXCEEDED));
    }
}
