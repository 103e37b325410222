// src/storage/sql.rs

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqlitePool};

use crate::{
    error::AppError,
    models::exam_result::{AnswerDetail, ExamResult, StoredResult, StoredResultDetail},
    storage::{ResultStore, check_counts},
};

/// Row of the `results` table.
#[derive(FromRow)]
struct ResultRow {
    id: i64,
    user_id: i64,
    subject: String,
    score: f64,
    grade: String,
    status: String,
    total_questions: i64,
    gradeable_questions: i64,
    correct_answers: i64,
    timestamp: DateTime<Utc>,
}

/// Row of the `user_answers` table.
#[derive(FromRow)]
struct AnswerRow {
    question_id: String,
    question_text: String,
    question_type: String,
    answer: String,
    correct_answer: Option<String>,
    score: f64,
    is_gradeable: bool,
    is_correct: bool,
    feedback: Option<String>,
    time_taken: Option<f64>,
    timed_out: bool,
}

impl TryFrom<ResultRow> for StoredResult {
    type Error = AppError;

    fn try_from(row: ResultRow) -> Result<Self, Self::Error> {
        let corrupt = |e: String| AppError::InternalServerError(format!("result {}: {}", row.id, e));

        Ok(StoredResult {
            id: row.id.to_string(),
            result: ExamResult {
                user_id: row.user_id,
                subject: row.subject.clone(),
                total_questions: row.total_questions as u32,
                gradeable_questions: row.gradeable_questions as u32,
                correct_answers: row.correct_answers as u32,
                score: row.score,
                grade: row.grade.parse().map_err(corrupt)?,
                status: row.status.parse().map_err(corrupt)?,
                timestamp: row.timestamp,
            },
        })
    }
}

impl From<AnswerRow> for AnswerDetail {
    fn from(row: AnswerRow) -> Self {
        AnswerDetail {
            question_id: row.question_id,
            question_text: row.question_text,
            question_type: row.question_type,
            submitted_answer: row.answer,
            correct_answer: row.correct_answer,
            score: row.score,
            is_gradeable: row.is_gradeable,
            is_correct: row.is_correct,
            feedback: row.feedback,
            time_taken: row.time_taken,
            timed_out: row.timed_out,
        }
    }
}

const RESULT_COLUMNS: &str = "id, user_id, subject, score, grade, status, total_questions, \
                              gradeable_questions, correct_answers, timestamp";

/// Results in the SQLite `results` table, answers in `user_answers`.
#[derive(Debug, Clone)]
pub struct SqlResultStore {
    pool: SqlitePool,
}

impl SqlResultStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ResultStore for SqlResultStore {
    async fn store_result(
        &self,
        result: &ExamResult,
        details: &[AnswerDetail],
    ) -> Result<String, AppError> {
        check_counts(result)?;

        let storage_err = |e: sqlx::Error| AppError::StorageError(e.to_string());

        // Dropping the transaction on any early return rolls everything back.
        let mut tx = self.pool.begin().await.map_err(storage_err)?;

        let result_id = sqlx::query(
            r#"
            INSERT INTO results (
                user_id, subject, score, grade, status,
                total_questions, gradeable_questions, correct_answers, timestamp
            )
            VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)
            "#,
        )
        .bind(result.user_id)
        .bind(&result.subject)
        .bind(result.score)
        .bind(result.grade.as_str())
        .bind(result.status.as_str())
        .bind(result.total_questions as i64)
        .bind(result.gradeable_questions as i64)
        .bind(result.correct_answers as i64)
        .bind(result.timestamp)
        .execute(&mut *tx)
        .await
        .map_err(storage_err)?
        .last_insert_rowid();

        for detail in details {
            sqlx::query(
                r#"
                INSERT INTO user_answers (
                    result_id, user_id, question_id, question_text, question_type,
                    answer, correct_answer, score, is_gradeable, is_correct,
                    feedback, time_taken, timed_out
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                "#,
            )
            .bind(result_id)
            .bind(result.user_id)
            .bind(&detail.question_id)
            .bind(&detail.question_text)
            .bind(&detail.question_type)
            .bind(&detail.submitted_answer)
            .bind(&detail.correct_answer)
            .bind(detail.score)
            .bind(detail.is_gradeable)
            .bind(detail.is_correct)
            .bind(&detail.feedback)
            .bind(detail.time_taken)
            .bind(detail.timed_out)
            .execute(&mut *tx)
            .await
            .map_err(storage_err)?;
        }

        tx.commit().await.map_err(storage_err)?;

        tracing::info!(
            result_id,
            user_id = result.user_id,
            answers = details.len(),
            "Exam result saved"
        );
        Ok(result_id.to_string())
    }

    async fn list_results(&self, user_id: i64) -> Result<Vec<StoredResult>, AppError> {
        let rows: Vec<ResultRow> = sqlx::query_as(&format!(
            "SELECT {} FROM results WHERE user_id = ? ORDER BY timestamp DESC, id DESC",
            RESULT_COLUMNS
        ))
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!("Failed to list results: {:?}", e);
            AppError::from(e)
        })?;

        rows.into_iter().map(StoredResult::try_from).collect()
    }

    async fn get_result(
        &self,
        user_id: i64,
        result_id: &str,
    ) -> Result<Option<StoredResultDetail>, AppError> {
        let Ok(id) = result_id.parse::<i64>() else {
            return Ok(None);
        };

        let row: Option<ResultRow> = sqlx::query_as(&format!(
            "SELECT {} FROM results WHERE id = ? AND user_id = ?",
            RESULT_COLUMNS
        ))
        .bind(id)
        .bind(user_id)
        .fetch_optional(&self.pool)
        .await?;

        let Some(row) = row else {
            return Ok(None);
        };

        let answers: Vec<AnswerRow> = sqlx::query_as(
            r#"
            SELECT
                question_id, question_text, question_type, answer, correct_answer,
                score, is_gradeable, is_correct, feedback, time_taken, timed_out
            FROM user_answers
            WHERE result_id = ?
            ORDER BY id
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await?;

        Ok(Some(StoredResultDetail {
            summary: StoredResult::try_from(row)?,
            answers: answers.into_iter().map(AnswerDetail::from).collect(),
        }))
    }
}
