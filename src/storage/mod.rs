// src/storage/mod.rs

//! Persistence of exam results.
//!
//! One `ResultStore` implementation per backend: SQLite tables
//! (`SqlResultStore`) and Azure Table Storage entities (`TableResultStore`).

pub mod sql;
pub mod table;

use async_trait::async_trait;

use crate::{
    error::AppError,
    models::exam_result::{AnswerDetail, ExamResult, StoredResult, StoredResultDetail},
};

pub use sql::SqlResultStore;
pub use table::TableResultStore;

#[async_trait]
pub trait ResultStore: Send + Sync {
    /// Writes the summary and its answer rows as one unit and returns the new result id.
    ///
    /// Nothing is left behind when this fails.
    async fn store_result(
        &self,
        result: &ExamResult,
        details: &[AnswerDetail],
    ) -> Result<String, AppError>;

    /// All results of one user, newest first.
    async fn list_results(&self, user_id: i64) -> Result<Vec<StoredResult>, AppError>;

    /// One result of `user_id` with its answer log, if it exists.
    async fn get_result(
        &self,
        user_id: i64,
        result_id: &str,
    ) -> Result<Option<StoredResultDetail>, AppError>;
}

/// Rejects records that break `correct <= gradeable <= total`.
pub(crate) fn check_counts(result: &ExamResult) -> Result<(), AppError> {
    if result.correct_answers <= result.gradeable_questions
        && result.gradeable_questions <= result.total_questions
    {
        Ok(())
    } else {
        Err(AppError::StorageError(format!(
            "inconsistent counts: correct={} gradeable={} total={}",
            result.correct_answers, result.gradeable_questions, result.total_questions
        )))
    }
}
