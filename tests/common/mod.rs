// tests/common/mod.rs

#![allow(dead_code)]

use std::sync::Arc;

use async_trait::async_trait;
use exam_backend::{
    config::{Config, ResultBackend},
    error::AppError,
    models::question::{GenerationRequest, Question},
    routes,
    services::{
        evaluator::{AnswerEvaluator, Evaluation},
        generator::QuestionGenerator,
    },
    state::AppState,
    storage::SqlResultStore,
};
use sqlx::{SqlitePool, sqlite::SqlitePoolOptions};

pub struct TestApp {
    pub address: String,
    pub client: reqwest::Client,
    pub pool: SqlitePool,
}

/// Scores answers mentioning "ownership" at 100, anything else at 40,
/// and fails on answers containing "crash".
pub struct KeywordEvaluator;

#[async_trait]
impl AnswerEvaluator for KeywordEvaluator {
    async fn evaluate_open_ended(
        &self,
        _question_text: &str,
        _reference_answer: Option<&str>,
        submitted_answer: &str,
    ) -> Result<Evaluation, AppError> {
        if submitted_answer.contains("crash") {
            return Err(AppError::UpstreamError("evaluator unavailable".to_string()));
        }
        let overall_score = if submitted_answer.contains("ownership") {
            100.0
        } else {
            40.0
        };
        Ok(Evaluation {
            overall_score,
            feedback: "Evaluated by keyword".to_string(),
        })
    }
}

/// Returns `count` true/false questions about the requested technology.
pub struct CannedGenerator;

#[async_trait]
impl QuestionGenerator for CannedGenerator {
    async fn generate(&self, request: &GenerationRequest) -> Result<Vec<Question>, AppError> {
        (1..=request.count)
            .map(|i| {
                serde_json::from_value(serde_json::json!({
                    "id": i,
                    "question": format!("{} statement {}", request.technology, i),
                    "type": "true_false",
                    "options": ["True", "False"],
                    "correct_answer": "True",
                    "subject": request.technology,
                }))
                .map_err(AppError::from)
            })
            .collect()
    }
}

/// Spawns the app on a random port over an in-memory SQLite database.
pub async fn spawn_app() -> TestApp {
    // A single connection keeps every query on the same in-memory database.
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("Failed to open in-memory SQLite");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .expect("Failed to migrate database");

    let config = Config {
        database_url: "sqlite::memory:".to_string(),
        jwt_secret: "test_secret_for_integration_tests".to_string(),
        jwt_expiration: 600,
        rust_log: "error".to_string(),
        bind_addr: "127.0.0.1:0".to_string(),
        cors_origins: vec!["http://localhost:3000".to_string()],
        result_backend: ResultBackend::Sqlite,
        llm: None,
    };

    let state = AppState {
        pool: pool.clone(),
        config,
        results: Arc::new(SqlResultStore::new(pool.clone())),
        evaluator: Some(Arc::new(KeywordEvaluator)),
        generator: Some(Arc::new(CannedGenerator)),
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind random port");
    let port = listener.local_addr().unwrap().port();
    let address = format!("http://127.0.0.1:{}", port);

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp {
        address,
        client: reqwest::Client::new(),
        pool,
    }
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.address, path)
    }

    /// Registers a fresh user and returns a bearer token for it.
    pub async fn login_new_user(&self) -> String {
        let email = format!("u_{}@example.com", &uuid::Uuid::new_v4().to_string()[..8]);
        let password = "password123";

        let register = self
            .client
            .post(self.url("/api/auth/register"))
            .json(&serde_json::json!({
                "email": email,
                "password": password,
                "first_name": "Ada",
                "last_name": "Lovelace"
            }))
            .send()
            .await
            .expect("Register failed");
        assert_eq!(register.status().as_u16(), 201);

        let login: serde_json::Value = self
            .client
            .post(self.url("/api/auth/login"))
            .json(&serde_json::json!({ "email": email, "password": password }))
            .send()
            .await
            .expect("Login failed")
            .json()
            .await
            .expect("Failed to parse login json");

        login["token"].as_str().expect("Token not found").to_string()
    }
}
