// src/services/evaluator.rs

use async_trait::async_trait;
use serde::Deserialize;

use crate::{
    error::AppError,
    services::llm::{ChatOptions, LlmClient},
};

const EVALUATION_SYSTEM_PROMPT: &str = r#"You are an experienced examiner grading a learner's answer to an open-ended exam question (an essay or a piece of code).
Judge correctness, completeness and clarity against the question and, when given, the reference answer.
Reply with a strict JSON object and nothing else:
{"overall_score": <integer 0-100>, "feedback": "<two or three sentences addressed to the learner>"}"#;

/// Score and feedback for one open-ended answer.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Evaluation {
    /// 0-100. Values outside the range are clamped by the grader.
    pub overall_score: f64,
    #[serde(default)]
    pub feedback: String,
}

/// Scores essay and coding answers that have no exact-match key.
#[async_trait]
pub trait AnswerEvaluator: Send + Sync {
    async fn evaluate_open_ended(
        &self,
        question_text: &str,
        reference_answer: Option<&str>,
        submitted_answer: &str,
    ) -> Result<Evaluation, AppError>;
}

/// Rubric scorer backed by the chat completion endpoint.
#[derive(Debug, Clone)]
pub struct LlmEvaluator {
    llm: LlmClient,
}

impl LlmEvaluator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl AnswerEvaluator for LlmEvaluator {
    async fn evaluate_open_ended(
        &self,
        question_text: &str,
        reference_answer: Option<&str>,
        submitted_answer: &str,
    ) -> Result<Evaluation, AppError> {
        let prompt = build_prompt(question_text, reference_answer, submitted_answer);
        let reply = self
            .llm
            .chat(
                EVALUATION_SYSTEM_PROMPT,
                &prompt,
                ChatOptions {
                    temperature: 0.0,
                    max_tokens: 400,
                    json_object: true,
                },
            )
            .await?;

        parse_evaluation(&reply)
    }
}

fn build_prompt(question_text: &str, reference_answer: Option<&str>, submitted_answer: &str) -> String {
    let reference = reference_answer
        .filter(|r| !r.trim().is_empty())
        .unwrap_or("(none provided)");

    format!(
        "Question:\n{}\n\nReference answer:\n{}\n\nLearner's answer:\n{}\n",
        question_text, reference, submitted_answer
    )
}

/// Parses the evaluator reply, tolerating a fenced code block around the JSON.
pub(crate) fn parse_evaluation(reply: &str) -> Result<Evaluation, AppError> {
    let json = crate::services::generator::strip_code_fence(reply);
    serde_json::from_str::<Evaluation>(json)
        .map_err(|e| AppError::UpstreamError(format!("Invalid evaluation JSON from LLM: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_plain_and_fenced_replies() {
        let plain = parse_evaluation(r#"{"overall_score": 83, "feedback": "Good."}"#).unwrap();
        assert_eq!(plain.overall_score, 83.0);
        assert_eq!(plain.feedback, "Good.");

        let fenced =
            parse_evaluation("```json\n{\"overall_score\": 40.5, \"feedback\": \"Partial.\"}\n```")
                .unwrap();
        assert_eq!(fenced.overall_score, 40.5);
    }

    #[test]
    fn rejects_reply_without_score() {
        assert!(parse_evaluation(r#"{"feedback": "no score"}"#).is_err());
        assert!(parse_evaluation("I think this deserves an 80").is_err());
    }

    #[test]
    fn prompt_marks_missing_reference() {
        let prompt = build_prompt("Explain ownership.", None, "Each value has one owner.");
        assert!(prompt.contains("(none provided)"));
        assert!(prompt.contains("Each value has one owner."));
    }
}
