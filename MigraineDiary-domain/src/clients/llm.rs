//! OpenAI-compatible chat-completions client used for narrative reports

use async_trait::async_trait;
use reqwest::{header, Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::LlmConfig;

#[derive(Debug, Clone, Error)]
pub enum LlmError {
    #[error("LLM gateway is not configured")]
    MissingApiKey,

    #[error("LLM gateway rate limit: {0}")]
    RateLimited(String),

    #[error("LLM gateway requires payment: {0}")]
    PaymentRequired(String),

    #[error("LLM gateway error: {0}")]
    Upstream(String),
}

impl LlmError {
    /// Classify a failed gateway answer by status and message text
    pub fn from_response(status: StatusCode, body: &str) -> Self {
        let lower = body.to_lowercase();
        if status == StatusCode::TOO_MANY_REQUESTS || lower.contains("rate limit") {
            LlmError::RateLimited(body.to_string())
        } else if status == StatusCode::PAYMENT_REQUIRED || lower.contains("credits") || lower.contains("payment") {
            LlmError::PaymentRequired(body.to_string())
        } else {
            LlmError::Upstream(format!("HTTP {}: {}", status, body))
        }
    }
}

/// A single-turn completion
#[derive(Debug, Clone, PartialEq)]
pub struct Completion {
    pub content: String,
    pub model: String,
}

#[async_trait]
pub trait LlmClient: Send + Sync {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<Completion, LlmError>;
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
    model: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: MessageResponse,
}

#[derive(Debug, Deserialize)]
struct MessageResponse {
    content: Option<String>,
}

/// Client for any gateway speaking the OpenAI chat-completions protocol
#[derive(Debug, Clone)]
pub struct OpenAiCompatibleClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
    model: String,
}

impl OpenAiCompatibleClient {
    pub fn new(config: &LlmConfig) -> Result<Self, LlmError> {
        let mut headers = header::HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, header::HeaderValue::from_static("application/json"));

        let client = Client::builder()
            .default_headers(headers)
            .timeout(std::time::Duration::from_secs(60))
            .build()
            .map_err(|e| LlmError::Upstream(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
            model: config.model.clone(),
        })
    }

    fn chat_completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url)
    }
}

#[async_trait]
impl LlmClient for OpenAiCompatibleClient {
    async fn complete(&self, system_prompt: &str, user_prompt: &str) -> Result<Completion, LlmError> {
        let api_key = self.api_key.as_deref().ok_or(LlmError::MissingApiKey)?;

        let request = ChatRequest {
            model: &self.model,
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
            temperature: 0.3,
        };

        debug!("Requesting completion from {} with model {}", self.base_url, self.model);

        let response = self
            .client
            .post(self.chat_completions_url())
            .bearer_auth(api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| LlmError::Upstream(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            warn!("LLM gateway answered {}", status);
            return Err(LlmError::from_response(status, &body));
        }

        let chat: ChatResponse = response
            .json()
            .await
            .map_err(|e| LlmError::Upstream(format!("invalid response: {}", e)))?;

        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| LlmError::Upstream("empty completion".to_string()))?;

        Ok(Completion {
            content,
            model: chat.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}
