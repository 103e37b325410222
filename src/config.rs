// src/config.rs

use std::{env, fmt};

use dotenvy::dotenv;

/// Minimum score (percentage) for an exam to count as passed.
pub const PASSING_SCORE_PERCENTAGE: f64 = 60.0;

/// Time limit applied to questions that do not carry their own.
pub const DEFAULT_TIME_LIMIT_SECS: u32 = 30;

/// Number of questions requested from the generator when the client omits `count`.
pub const DEFAULT_GENERATED_QUESTIONS: u32 = 5;

/// Upper bound on questions per generation request.
pub const MAX_GENERATED_QUESTIONS: u32 = 20;

/// Where exam results are persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResultBackend {
    Sqlite,
    AzureTable {
        endpoint: String,
        sas_token: String,
        table_name: String,
    },
}

/// Settings for the OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub api_key: String,
    pub base_url: String,
    pub model: String,
    /// When set, requests are routed the Azure OpenAI way (deployment path + `api-key` header).
    pub api_version: Option<String>,
    pub timeout_secs: u64,
}

#[derive(Debug, Clone)]
pub struct Config {
    pub database_url: String,
    pub jwt_secret: String,
    pub jwt_expiration: u64,
    pub rust_log: String,
    pub bind_addr: String,
    pub cors_origins: Vec<String>,
    pub result_backend: ResultBackend,
    pub llm: Option<LlmConfig>,
}

/// Raised when the environment does not describe a usable configuration.
#[derive(Debug)]
pub enum ConfigError {
    Missing(&'static str),
    Invalid { key: &'static str, value: String },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::Missing(key) => write!(f, "{} must be set", key),
            ConfigError::Invalid { key, value } => write!(f, "{} has invalid value '{}'", key, value),
        }
    }
}

impl std::error::Error for ConfigError {}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        dotenv().ok();

        let database_url = required("DATABASE_URL")?;
        let jwt_secret = required("JWT_SECRET")?;
        let jwt_expiration = parsed("JWT_EXPIRATION", 3600)?;

        let rust_log = env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());
        let bind_addr = env::var("BIND_ADDR").unwrap_or_else(|_| "0.0.0.0:5000".to_string());

        let cors_origins = env::var("CORS_ORIGINS")
            .unwrap_or_else(|_| "http://localhost:3000".to_string())
            .split(',')
            .map(|origin| origin.trim().to_string())
            .filter(|origin| !origin.is_empty())
            .collect();

        let result_backend = match env::var("RESULT_STORE").as_deref() {
            Err(_) | Ok("sqlite") => ResultBackend::Sqlite,
            Ok("azure_table") => ResultBackend::AzureTable {
                endpoint: required("AZURE_TABLE_ENDPOINT")?,
                sas_token: required("AZURE_TABLE_SAS_TOKEN")?,
                table_name: env::var("AZURE_TABLE_NAME")
                    .unwrap_or_else(|_| "ExamResults".to_string()),
            },
            Ok(other) => {
                return Err(ConfigError::Invalid {
                    key: "RESULT_STORE",
                    value: other.to_string(),
                });
            }
        };

        // The LLM is optional: without a key, generation is unavailable and
        // open-ended questions are left out of the score.
        let llm = match env::var("LLM_API_KEY") {
            Ok(api_key) if !api_key.is_empty() => Some(LlmConfig {
                api_key,
                base_url: env::var("LLM_BASE_URL")
                    .unwrap_or_else(|_| "https://api.openai.com/v1".to_string()),
                model: env::var("LLM_MODEL").unwrap_or_else(|_| "gpt-4o".to_string()),
                api_version: env::var("LLM_API_VERSION").ok().filter(|v| !v.is_empty()),
                timeout_secs: parsed("LLM_TIMEOUT_SECS", 60)?,
            }),
            _ => None,
        };

        Ok(Self {
            database_url,
            jwt_secret,
            jwt_expiration,
            rust_log,
            bind_addr,
            cors_origins,
            result_backend,
            llm,
        })
    }
}

fn required(key: &'static str) -> Result<String, ConfigError> {
    match env::var(key) {
        Ok(value) if !value.is_empty() => Ok(value),
        _ => Err(ConfigError::Missing(key)),
    }
}

fn parsed<T: std::str::FromStr>(key: &'static str, default: T) -> Result<T, ConfigError> {
    match env::var(key) {
        Ok(value) => value
            .parse()
            .map_err(|_| ConfigError::Invalid { key, value }),
        Err(_) => Ok(default),
    }
}
