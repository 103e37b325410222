// src/services/generator.rs

use std::sync::LazyLock;

use async_trait::async_trait;
use regex::Regex;
use serde_json::Value;

use crate::{
    error::AppError,
    models::question::{GenerationRequest, Question},
    services::llm::{ChatOptions, LlmClient},
};

static CODE_FENCE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?s)```[a-zA-Z]*\s*\n?(.*?)\s*```").expect("code fence pattern is valid")
});

const GENERATION_SYSTEM_PROMPT: &str =
    "You write exam questions. Reply with JSON only, without commentary.";

/// Produces a fresh set of questions for an exam.
#[async_trait]
pub trait QuestionGenerator: Send + Sync {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Question>, AppError>;
}

/// Question generator backed by the chat completion endpoint.
#[derive(Debug, Clone)]
pub struct LlmQuestionGenerator {
    llm: LlmClient,
}

impl LlmQuestionGenerator {
    pub fn new(llm: LlmClient) -> Self {
        Self { llm }
    }
}

#[async_trait]
impl QuestionGenerator for LlmQuestionGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Question>, AppError> {
        let prompt = build_prompt(request);
        let reply = self
            .llm
            .chat(
                GENERATION_SYSTEM_PROMPT,
                &prompt,
                ChatOptions {
                    temperature: 0.7,
                    max_tokens: 300 * request.count.max(1) + 200,
                    json_object: false,
                },
            )
            .await?;

        let questions = parse_questions(&reply, request)?;
        tracing::info!(
            technology = %request.technology,
            count = questions.len(),
            "Generated exam questions"
        );
        Ok(questions)
    }
}

fn build_prompt(request: &GenerationRequest) -> String {
    format!(
        "Generate {count} {difficulty} level {kind} questions for {technology}.\n\
         Return a JSON array of objects with:\n\
         - 'id' (unique question number)\n\
         - 'question' (question text)\n\
         - 'type' (one of mcq, true_false, short_answer, coding, essay)\n\
         - 'options' (list of possible answers, if applicable)\n\
         - 'correct_answer' (correct answer text, exactly as it appears in 'options' when options are given)\n\
         - 'time_limit' (seconds a learner should need)",
        count = request.count,
        difficulty = request.difficulty,
        kind = request.question_type,
        technology = request.technology,
    )
}

/// Returns the contents of the first fenced code block, or the trimmed input.
pub(crate) fn strip_code_fence(reply: &str) -> &str {
    CODE_FENCE
        .captures(reply)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .unwrap_or(reply)
        .trim()
}

/// Parses the generator reply into questions.
///
/// Accepts a bare array or an object wrapping it under `questions`. Items
/// without an `id` are numbered by position; items without a `type` take the
/// requested one, and every question inherits the technology as its subject.
pub(crate) fn parse_questions(
    reply: &str,
    request: &GenerationRequest,
) -> Result<Vec<Question>, AppError> {
    let parsed: Value = serde_json::from_str(strip_code_fence(reply)).map_err(|e| {
        AppError::UpstreamError(format!("Invalid JSON format received from LLM: {}", e))
    })?;

    let items = match parsed {
        Value::Array(items) => items,
        Value::Object(mut map) => match map.remove("questions") {
            Some(Value::Array(items)) => items,
            _ => return Err(not_a_list()),
        },
        _ => return Err(not_a_list()),
    };

    items
        .into_iter()
        .enumerate()
        .map(|(index, mut item)| {
            let object = item.as_object_mut().ok_or_else(not_a_list)?;
            object
                .entry("id")
                .or_insert_with(|| Value::from(index as u64 + 1));
            object
                .entry("type")
                .or_insert_with(|| Value::from(request.question_type.clone()));

            let mut question: Question = serde_json::from_value(item).map_err(|e| {
                AppError::UpstreamError(format!("Generated question is malformed: {}", e))
            })?;
            if question.subject.is_none() {
                question.subject = Some(request.technology.clone());
            }
            Ok(question)
        })
        .collect()
}

fn not_a_list() -> AppError {
    AppError::UpstreamError("Generated response is not a valid list of questions.".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::question::QuestionType;

    fn request() -> GenerationRequest {
        GenerationRequest {
            technology: "Rust".to_string(),
            difficulty: "easy".to_string(),
            question_type: "mcq".to_string(),
            count: 2,
        }
    }

    #[test]
    fn parses_fenced_array() {
        let reply = "Here you go:\n```json\n[\n  {\"id\": 1, \"question\": \"Which keyword declares a constant?\", \"options\": [\"let\", \"const\"], \"correct_answer\": \"const\"},\n  {\"id\": 2, \"question\": \"Is Rust garbage collected?\", \"type\": \"true_false\", \"correct_answer\": false}\n]\n```";

        let questions = parse_questions(reply, &request()).unwrap();

        assert_eq!(questions.len(), 2);
        assert_eq!(questions[0].question_type, QuestionType::Mcq);
        assert_eq!(questions[0].subject.as_deref(), Some("Rust"));
        assert_eq!(questions[1].question_type, QuestionType::TrueFalse);
        assert_eq!(questions[1].correct_answer.as_deref(), Some("false"));
    }

    #[test]
    fn accepts_wrapped_object_and_numbers_missing_ids() {
        let reply = r#"{"questions": [{"question": "Name the borrow checker's job."}]}"#;

        let questions = parse_questions(reply, &request()).unwrap();

        assert_eq!(questions[0].id, "1");
        assert_eq!(questions[0].text, "Name the borrow checker's job.");
    }

    #[test]
    fn rejects_non_list_replies() {
        assert!(matches!(
            parse_questions(r#"{"question": "lonely"}"#, &request()),
            Err(AppError::UpstreamError(_))
        ));
        assert!(matches!(
            parse_questions("not json at all", &request()),
            Err(AppError::UpstreamError(_))
        ));
    }

    #[test]
    fn strip_code_fence_leaves_plain_text() {
        assert_eq!(strip_code_fence("  [1, 2]  "), "[1, 2]");
        assert_eq!(strip_code_fence("```\n{\"a\": 1}\n```"), "{\"a\": 1}");
    }
}
