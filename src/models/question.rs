// src/models/question.rs

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::{config::DEFAULT_TIME_LIMIT_SECS, grading::normalize::answer_text};

/// Kind of question, which decides how an answer is graded.
///
/// Parsed leniently from the wire: unknown or missing kinds fall back to
/// `ShortAnswer`, i.e. exact normalized matching.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QuestionType {
    Mcq,
    TrueFalse,
    #[default]
    ShortAnswer,
    Coding,
    Essay,
}

impl QuestionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            QuestionType::Mcq => "mcq",
            QuestionType::TrueFalse => "true_false",
            QuestionType::ShortAnswer => "short_answer",
            QuestionType::Coding => "coding",
            QuestionType::Essay => "essay",
        }
    }

    /// Essay and coding answers have no single correct string and need an evaluator.
    pub fn is_open_ended(&self) -> bool {
        matches!(self, QuestionType::Coding | QuestionType::Essay)
    }
}

impl From<&str> for QuestionType {
    fn from(raw: &str) -> Self {
        let key: String = raw
            .trim()
            .to_lowercase()
            .chars()
            .map(|c| if matches!(c, '-' | ' ' | '/') { '_' } else { c })
            .collect();

        match key.as_str() {
            "mcq" | "multiple_choice" | "single" | "multiple" | "choice" => QuestionType::Mcq,
            "true_false" | "truefalse" | "boolean" | "true_or_false" => QuestionType::TrueFalse,
            "coding" | "code" | "programming" => QuestionType::Coding,
            "essay" | "long_answer" => QuestionType::Essay,
            _ => QuestionType::ShortAnswer,
        }
    }
}

impl From<String> for QuestionType {
    fn from(raw: String) -> Self {
        QuestionType::from(raw.as_str())
    }
}

impl From<QuestionType> for String {
    fn from(kind: QuestionType) -> Self {
        kind.as_str().to_string()
    }
}

/// A single exam question as generated by the LLM and echoed back by the client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Question {
    /// Accepted as a JSON string or number, always carried as a string.
    #[serde(deserialize_with = "scalar_to_string")]
    pub id: String,

    /// Question text. The generator emits it under `question`.
    #[serde(alias = "question")]
    pub text: String,

    #[serde(rename = "type", default, deserialize_with = "lenient_question_type")]
    pub question_type: QuestionType,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub options: Vec<String>,

    /// Reference answer, converted to its string form whatever JSON scalar it arrived as.
    #[serde(
        default,
        deserialize_with = "optional_scalar_to_string",
        skip_serializing_if = "Option::is_none"
    )]
    pub correct_answer: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,

    /// Seconds the learner has for this question.
    #[serde(default = "default_time_limit")]
    pub time_limit: u32,
}

fn default_time_limit() -> u32 {
    DEFAULT_TIME_LIMIT_SECS
}

fn scalar_to_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    match value {
        Value::String(_) | Value::Number(_) => Ok(answer_text(&value)),
        other => Err(serde::de::Error::custom(format!(
            "question id must be a string or number, got {}",
            other
        ))),
    }
}

/// `null` or a non-string kind falls back to the default, as a missing key does.
fn lenient_question_type<'de, D>(deserializer: D) -> Result<QuestionType, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::String(raw) => QuestionType::from(raw),
        _ => QuestionType::default(),
    })
}

fn optional_scalar_to_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(match value {
        Value::Null => None,
        other => Some(answer_text(&other)),
    })
}

/// Query parameters for `GET /api/exam/questions`.
///
/// Fields are optional so that a missing parameter can be reported with a
/// readable message instead of an extractor rejection.
#[derive(Debug, Deserialize, Validate)]
pub struct GenerateQuestionsParams {
    #[validate(length(min = 1, max = 100))]
    pub technology: Option<String>,
    #[validate(length(min = 1, max = 50))]
    pub difficulty: Option<String>,
    #[serde(rename = "type")]
    #[validate(length(min = 1, max = 50))]
    pub question_type: Option<String>,
    pub count: Option<u32>,
}

/// A validated generation request handed to the question generator.
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub technology: String,
    pub difficulty: String,
    pub question_type: String,
    pub count: u32,
}

/// Response body of `GET /api/exam/questions`.
#[derive(Debug, Serialize)]
pub struct GeneratedQuestionsResponse {
    pub difficulty: String,
    pub technology: String,
    #[serde(rename = "type")]
    pub question_type: String,
    pub questions: Vec<Question>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn question_accepts_numeric_id_and_generator_keys() {
        let q: Question = serde_json::from_value(json!({
            "id": 3,
            "question": "Capital of France?",
            "type": "multiple_choice",
            "options": ["Paris", "Rome"],
            "correct_answer": "Paris"
        }))
        .unwrap();

        assert_eq!(q.id, "3");
        assert_eq!(q.text, "Capital of France?");
        assert_eq!(q.question_type, QuestionType::Mcq);
        assert_eq!(q.time_limit, 30);
    }

    #[test]
    fn missing_or_unknown_type_falls_back_to_short_answer() {
        let missing: Question =
            serde_json::from_value(json!({"id": "1", "text": "2+2?", "correct_answer": 4}))
                .unwrap();
        let unknown: Question =
            serde_json::from_value(json!({"id": "2", "text": "?", "type": "fill_in"})).unwrap();

        assert_eq!(missing.question_type, QuestionType::ShortAnswer);
        assert_eq!(missing.correct_answer.as_deref(), Some("4"));
        assert_eq!(unknown.question_type, QuestionType::ShortAnswer);
        assert_eq!(unknown.correct_answer, None);
    }

    #[test]
    fn null_type_falls_back_to_short_answer() {
        let q: Question = serde_json::from_value(json!({
            "id": "1",
            "text": "q",
            "type": null,
            "correct_answer": "a"
        }))
        .unwrap();
        let numeric: Question =
            serde_json::from_value(json!({"id": "2", "text": "q", "type": 7})).unwrap();

        assert_eq!(q.question_type, QuestionType::ShortAnswer);
        assert_eq!(numeric.question_type, QuestionType::ShortAnswer);
    }

    #[test]
    fn boolean_reference_answer_is_stringified() {
        let q: Question = serde_json::from_value(json!({
            "id": "tf",
            "text": "The sky is blue.",
            "type": "True/False",
            "correct_answer": true
        }))
        .unwrap();

        assert_eq!(q.correct_answer.as_deref(), Some("true"));
    }

    #[test]
    fn open_ended_kinds() {
        assert!(QuestionType::from("Essay").is_open_ended());
        assert!(QuestionType::from("code").is_open_ended());
        assert!(!QuestionType::from("true-false").is_open_ended());
    }
}
