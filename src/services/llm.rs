// src/services/llm.rs

use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};

use crate::{config::LlmConfig, error::AppError};

const MAX_ATTEMPTS: u32 = 3;

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    model: Option<&'a str>,
    messages: Vec<ChatMessage<'a>>,
    temperature: f64,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    content: Option<String>,
}

/// Options for a single chat completion call.
#[derive(Debug, Clone, Copy)]
pub struct ChatOptions {
    pub temperature: f64,
    pub max_tokens: u32,
    /// Ask the provider for a JSON object reply.
    pub json_object: bool,
}

/// Thin client for an OpenAI-compatible chat completion endpoint.
///
/// With `api_version` configured, requests go to an Azure OpenAI deployment
/// (`/openai/deployments/{model}/chat/completions`) using the `api-key` header;
/// otherwise to `{base_url}/chat/completions` with a bearer token.
#[derive(Debug, Clone)]
pub struct LlmClient {
    client: Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: &LlmConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AppError::InternalServerError(format!("Failed to build HTTP client: {}", e)))?;

        Ok(Self {
            client,
            config: config.clone(),
        })
    }

    fn endpoint(&self) -> String {
        let base = self.config.base_url.trim_end_matches('/');
        match &self.config.api_version {
            Some(version) => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                base, self.config.model, version
            ),
            None => format!("{}/chat/completions", base),
        }
    }

    /// Sends a system + user prompt and returns the trimmed reply text.
    ///
    /// Transport errors and 5xx/429 replies are retried with exponential backoff.
    pub async fn chat(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        options: ChatOptions,
    ) -> Result<String, AppError> {
        let is_azure = self.config.api_version.is_some();
        let payload = ChatRequest {
            // Azure infers the model from the deployment path.
            model: (!is_azure).then_some(self.config.model.as_str()),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            temperature: options.temperature,
            max_tokens: options.max_tokens,
            response_format: options.json_object.then_some(ResponseFormat {
                kind: "json_object",
            }),
        };

        let url = self.endpoint();
        let mut last_error = None;

        for attempt in 0..MAX_ATTEMPTS {
            if attempt > 0 {
                tokio::time::sleep(Duration::from_millis(500 * 2_u64.pow(attempt - 1))).await;
            }

            let request = self.client.post(&url).json(&payload);
            let request = if is_azure {
                request.header("api-key", &self.config.api_key)
            } else {
                request.bearer_auth(&self.config.api_key)
            };

            let response = match request.send().await {
                Ok(response) => response,
                Err(e) => {
                    tracing::warn!(attempt, "LLM request failed: {}", e);
                    last_error = Some(AppError::from(e));
                    continue;
                }
            };

            let status = response.status();
            if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
                tracing::warn!(attempt, %status, "LLM provider returned a retryable status");
                last_error = Some(AppError::UpstreamError(format!(
                    "LLM provider returned {}",
                    status
                )));
                continue;
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(AppError::UpstreamError(format!(
                    "LLM provider returned {}: {}",
                    status, body
                )));
            }

            let body: ChatResponse = response.json().await?;
            let content = body
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| AppError::UpstreamError("LLM returned an empty reply".to_string()))?;

            tracing::debug!(model = %self.config.model, "LLM call succeeded");
            return Ok(content.trim().to_string());
        }

        Err(last_error
            .unwrap_or_else(|| AppError::UpstreamError("LLM request was not attempted".to_string())))
    }
}
