// src/state.rs

use std::sync::Arc;

use axum::extract::FromRef;
use sqlx::SqlitePool;

use crate::{
    config::Config,
    services::{evaluator::AnswerEvaluator, generator::QuestionGenerator},
    storage::ResultStore,
};

#[derive(Clone)]
pub struct AppState {
    /// Users live in SQLite regardless of where results are stored.
    pub pool: SqlitePool,
    pub config: Config,
    pub results: Arc<dyn ResultStore>,
    /// `None` when no LLM is configured: essay/coding answers are then left out of the score.
    pub evaluator: Option<Arc<dyn AnswerEvaluator>>,
    pub generator: Option<Arc<dyn QuestionGenerator>>,
}

impl FromRef<AppState> for SqlitePool {
    fn from_ref(state: &AppState) -> Self {
        state.pool.clone()
    }
}

impl FromRef<AppState> for Config {
    fn from_ref(state: &AppState) -> Self {
        state.config.clone()
    }
}
