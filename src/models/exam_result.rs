// src/models/exam_result.rs

use std::{collections::HashMap, fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use validator::Validate;

use crate::models::question::Question;

/// Letter grade derived from the percentage score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Grade {
    A,
    B,
    C,
    D,
    F,
}

/// Pass/fail outcome of an exam.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExamStatus {
    Passed,
    Failed,
}

impl Grade {
    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::B => "B",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl ExamStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExamStatus::Passed => "Passed",
            ExamStatus::Failed => "Failed",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for ExamStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Grade {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "A" => Ok(Grade::A),
            "B" => Ok(Grade::B),
            "C" => Ok(Grade::C),
            "D" => Ok(Grade::D),
            "F" => Ok(Grade::F),
            other => Err(format!("unknown grade '{}'", other)),
        }
    }
}

impl FromStr for ExamStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Passed" => Ok(ExamStatus::Passed),
            "Failed" => Ok(ExamStatus::Failed),
            other => Err(format!("unknown status '{}'", other)),
        }
    }
}

/// Summary of one exam submission, as persisted in the `results` table
/// or as an `ExamResults` table entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamResult {
    pub user_id: i64,
    pub subject: String,
    pub total_questions: u32,
    pub gradeable_questions: u32,
    pub correct_answers: u32,
    /// Percentage over gradeable questions, rounded to 2 decimals.
    pub score: f64,
    pub grade: Grade,
    pub status: ExamStatus,
    pub timestamp: DateTime<Utc>,
}

/// Per-question row written alongside the summary (`user_answers`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnswerDetail {
    pub question_id: String,
    pub question_text: String,
    pub question_type: String,
    pub submitted_answer: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correct_answer: Option<String>,
    pub score: f64,
    pub is_gradeable: bool,
    pub is_correct: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub feedback: Option<String>,
    /// Seconds, as reported by the client.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_taken: Option<f64>,
    #[serde(default)]
    pub timed_out: bool,
}

/// A result as read back from storage, with its storage-assigned id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResult {
    pub id: String,
    #[serde(flatten)]
    pub result: ExamResult,
}

/// A stored result together with its answer log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredResultDetail {
    #[serde(flatten)]
    pub summary: StoredResult,
    pub answers: Vec<AnswerDetail>,
}

/// DTO for submitting an exam.
///
/// `questions` and `answers` are optional at the serde level so a request
/// missing either is rejected with a 400 before any grading happens.
#[derive(Debug, Deserialize, Validate)]
pub struct SubmitExamRequest {
    #[validate(length(min = 1, max = 100))]
    pub subject: Option<String>,

    pub questions: Option<Vec<Question>>,

    /// User's answers map.
    /// Key: Question ID (string)
    /// Value: raw answer, any JSON scalar
    pub answers: Option<HashMap<String, Value>>,

    /// Seconds spent per question, as measured by the client.
    /// Kept raw: entries that are not non-negative numbers are dropped
    /// during grading instead of rejecting the submission.
    #[serde(default)]
    pub time_taken: HashMap<String, Value>,

    /// Set to false to skip LLM evaluation of essay/coding answers.
    #[serde(default = "default_true")]
    pub evaluate_open_ended: bool,
}

fn default_true() -> bool {
    true
}

/// Response body of `POST /api/exam/submit`.
#[derive(Debug, Serialize)]
pub struct SubmitExamResponse {
    pub result_id: String,
    #[serde(flatten)]
    pub result: ExamResult,
    pub validation: Vec<AnswerDetail>,
    /// Answer keys that matched no question and were skipped.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ignored_answers: Vec<String>,
}
