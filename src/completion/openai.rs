//! OpenAI chat-completions client

use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;
use reqwest::Client;
use serde_json::{Value, json};

use super::client::{CompletionClient, CompletionError, CompletionRequest};

/// OpenAI chat completions endpoint
const OPENAI_API_URL: &str = "https://api.openai.com/v1/chat/completions";

/// Environment variable holding the API key
const API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Default model to use
const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// Configuration for the OpenAI client
#[derive(Debug, Clone)]
pub struct OpenAiConfig {
    pub model: String,
    pub temperature: f32,
    pub max_tokens: u32,
    pub timeout: Duration,
}

impl Default for OpenAiConfig {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            temperature: 0.8,
            max_tokens: 150,
            timeout: Duration::from_secs(60),
        }
    }
}

impl OpenAiConfig {
    /// Create a config with a specific model
    pub fn with_model(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            ..Default::default()
        }
    }
}

/// OpenAI API client
pub struct OpenAiClient {
    client: Client,
    api_key: String,
    config: OpenAiConfig,
}

impl OpenAiClient {
    /// Create a new client, reading the API key from OPENAI_API_KEY.
    pub fn new(config: OpenAiConfig) -> Result<Self, CompletionError> {
        let api_key =
            std::env::var(API_KEY_ENV).map_err(|_| CompletionError::MissingApiKey(API_KEY_ENV.to_string()))?;
        Self::with_api_key(api_key, config)
    }

    /// Create a client with an explicit API key
    pub fn with_api_key(api_key: String, config: OpenAiConfig) -> Result<Self, CompletionError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| CompletionError::Network(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client, api_key, config })
    }

    fn build_request(&self, request: &CompletionRequest) -> Value {
        // Random seed per call keeps repeated prompts from producing
        // identical replies.
        let seed: u32 = rand::rng().random_range(1..10_000);
        json!({
            "model": self.config.model,
            "temperature": self.config.temperature,
            "max_tokens": self.config.max_tokens,
            "seed": seed,
            "messages": [
                { "role": "system", "content": request.system_prompt },
                { "role": "user", "content": request.user_prompt }
            ]
        })
    }

    fn map_request_error(&self, e: reqwest::Error) -> CompletionError {
        if e.is_timeout() {
            CompletionError::Timeout(self.config.timeout)
        } else {
            CompletionError::Network(e.to_string())
        }
    }

    fn map_error_status(status: u16, body: &str) -> CompletionError {
        match status {
            429 if body.contains("insufficient_quota") => CompletionError::QuotaExceeded(body.to_string()),
            429 => CompletionError::RateLimited { retry_after: None },
            400 if body.contains("content_policy") || body.contains("content_filter") => {
                CompletionError::ContentPolicy(body.to_string())
            }
            _ => CompletionError::Api {
                status,
                message: body.to_string(),
            },
        }
    }

    fn extract_reply(payload: &Value) -> Result<String, CompletionError> {
        payload
            .get("choices")
            .and_then(|c| c.get(0))
            .and_then(|c| c.get("message"))
            .and_then(|m| m.get("content"))
            .and_then(|t| t.as_str())
            .map(|s| s.trim().to_string())
            .ok_or_else(|| CompletionError::InvalidResponse("no message content in response".to_string()))
    }
}

#[async_trait]
impl CompletionClient for OpenAiClient {
    async fn generate(&self, request: &CompletionRequest) -> Result<String, CompletionError> {
        let body = self.build_request(request);

        let response = self
            .client
            .post(OPENAI_API_URL)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_request_error(e))?;

        let status = response.status().as_u16();
        if status >= 400 {
            let text = response.text().await.unwrap_or_default();
            return Err(Self::map_error_status(status, &text));
        }

        let payload: Value = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;
        Self::extract_reply(&payload)
    }
}
