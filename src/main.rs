// src/main.rs

use std::{str::FromStr, sync::Arc, time::Duration};

use exam_backend::{
    config::{Config, ResultBackend},
    routes,
    services::{
        evaluator::{AnswerEvaluator, LlmEvaluator},
        generator::{LlmQuestionGenerator, QuestionGenerator},
        llm::LlmClient,
    },
    state::AppState,
    storage::{ResultStore, SqlResultStore, TableResultStore},
};
use sqlx::{
    SqlitePool,
    sqlite::{SqliteConnectOptions, SqlitePoolOptions},
};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[tokio::main]
async fn main() -> Result<(), BoxError> {
    // Load configuration from environment (.env if present)
    let config = Config::from_env()?;

    let file_appender = tracing_appender::rolling::daily("logs", "app.log");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);
    let env_filter = EnvFilter::new(&config.rust_log);
    let stdout_layer = fmt::layer().with_writer(std::io::stdout).with_target(false);
    let file_layer = fmt::layer().with_writer(non_blocking).with_ansi(false);

    // Initialize Tracing (Logging)
    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .with(file_layer)
        .init();

    let pool = connect_with_retry(&config.database_url).await?;
    tracing::info!("Database connected...");

    // Run Migrations Automatically
    tracing::info!("Running migrations...");
    sqlx::migrate!("./migrations").run(&pool).await?;
    tracing::info!("Migrations applied successfully.");

    let results: Arc<dyn ResultStore> = match &config.result_backend {
        ResultBackend::Sqlite => {
            tracing::info!("Storing exam results in SQLite");
            Arc::new(SqlResultStore::new(pool.clone()))
        }
        ResultBackend::AzureTable {
            endpoint,
            sas_token,
            table_name,
        } => {
            tracing::info!(table = %table_name, "Storing exam results in Azure Table Storage");
            let store = TableResultStore::new(endpoint, sas_token, table_name)?;
            store.ensure_table().await?;
            Arc::new(store)
        }
    };

    let (evaluator, generator) = match &config.llm {
        Some(llm_config) => {
            let llm = LlmClient::new(llm_config)?;
            let evaluator: Arc<dyn AnswerEvaluator> = Arc::new(LlmEvaluator::new(llm.clone()));
            let generator: Arc<dyn QuestionGenerator> = Arc::new(LlmQuestionGenerator::new(llm));
            (Some(evaluator), Some(generator))
        }
        None => {
            tracing::warn!(
                "LLM_API_KEY not set: question generation disabled, essay/coding answers will not be scored"
            );
            (None, None)
        }
    };

    let bind_addr = config.bind_addr.clone();
    let state = AppState {
        pool,
        config,
        results,
        evaluator,
        generator,
    };

    let app = routes::create_router(state);

    let listener = tokio::net::TcpListener::bind(&bind_addr).await?;
    tracing::info!("Listening on {}", bind_addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    Ok(())
}

/// Opens the SQLite pool, retrying while the database file is unavailable.
async fn connect_with_retry(database_url: &str) -> Result<SqlitePool, BoxError> {
    let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);

    let mut retry_count = 0;
    loop {
        match SqlitePoolOptions::new()
            .max_connections(5)
            .acquire_timeout(Duration::from_secs(3))
            .connect_with(options.clone())
            .await
        {
            Ok(pool) => return Ok(pool),
            Err(e) => {
                retry_count += 1;
                if retry_count > 5 {
                    return Err(format!(
                        "Failed to connect to database after 5 retries: {}",
                        e
                    )
                    .into());
                }
                tracing::warn!(
                    "Database not ready, retrying in 2s... (Attempt {})",
                    retry_count
                );
                tokio::time::sleep(Duration::from_secs(2)).await;
            }
        }
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutting down");
}
