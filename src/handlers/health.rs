// src/handlers/health.rs

use axum::{Json, extract::State, response::IntoResponse};
use serde_json::json;
use sqlx::SqlitePool;

use crate::error::AppError;

/// Liveness probe that also checks the database connection.
pub async fn health(State(pool): State<SqlitePool>) -> Result<impl IntoResponse, AppError> {
    sqlx::query("SELECT 1").execute(&pool).await?;

    Ok(Json(json!({ "status": "ok" })))
}
