//! OpenAI-compatible backend
//!
//! Works with:
//! - OpenAI chat completions
//! - Azure OpenAI deployments
//! - Local servers exposing the OpenAI API (vLLM, Ollama, LM Studio)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use fleet_assistant_config::GenerationConfig;
use fleet_assistant_core::{
    FinishReason, GenerateRequest, GenerateResponse, LanguageModel, Role, TokenUsage,
};

use crate::LlmError;

/// Configuration for OpenAI-compatible backends
#[derive(Debug, Clone)]
pub struct OpenAIConfig {
    /// API endpoint (OpenAI: https://api.openai.com/v1, Azure: custom)
    pub endpoint: String,
    /// API key
    pub api_key: String,
    /// Model name
    pub model: String,
    /// Maximum tokens to generate when the request does not say
    pub max_tokens: u32,
    /// Temperature when the request does not say
    pub temperature: f32,
    /// Request timeout
    pub timeout: Duration,
    /// Maximum retry attempts for transient failures
    pub max_retries: u32,
    /// Initial backoff duration (doubles each retry)
    pub initial_backoff: Duration,
    /// Azure API version (Azure specific)
    pub api_version: Option<String>,
}

impl Default for OpenAIConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://api.openai.com/v1".to_string(),
            api_key: String::new(),
            model: "gpt-3.5-turbo".to_string(),
            max_tokens: 150,
            temperature: 0.3,
            timeout: Duration::from_secs(30),
            max_retries: 3,
            initial_backoff: Duration::from_millis(200),
            api_version: None,
        }
    }
}

impl OpenAIConfig {
    /// Create config for OpenAI
    pub fn openai(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Create config for a local OpenAI-compatible server
    pub fn local(endpoint: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            model: model.into(),
            ..Default::default()
        }
    }

    /// Build from the `generation` settings section
    pub fn from_settings(settings: &GenerationConfig) -> Self {
        Self {
            endpoint: settings.endpoint.clone(),
            api_key: settings.api_key.clone().unwrap_or_default(),
            model: settings.model.clone(),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout: settings
                .timeout_secs
                .map(Duration::from_secs)
                .unwrap_or_else(|| Duration::from_secs(60)),
            max_retries: settings.max_retries,
            ..Default::default()
        }
    }

    fn is_local(&self) -> bool {
        self.endpoint.starts_with("http://localhost") || self.endpoint.starts_with("http://127.0.0.1")
    }
}

/// OpenAI-compatible backend
pub struct OpenAIBackend {
    config: OpenAIConfig,
    client: Client,
}

impl OpenAIBackend {
    /// Create new OpenAI backend
    pub fn new(config: OpenAIConfig) -> Result<Self, LlmError> {
        if config.api_key.is_empty() && !config.is_local() {
            return Err(LlmError::Configuration(
                "API key required for remote endpoints".to_string(),
            ));
        }

        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LlmError::Configuration(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self { config, client })
    }

    /// Get the full API URL for chat completions
    fn chat_url(&self) -> String {
        let endpoint = self.config.endpoint.trim_end_matches('/');
        match self.config.api_version {
            Some(ref api_version) => format!(
                "{}/openai/deployments/{}/chat/completions?api-version={}",
                endpoint, self.config.model, api_version
            ),
            None => format!("{}/chat/completions", endpoint),
        }
    }

    /// Build request headers
    fn build_headers(&self) -> reqwest::header::HeaderMap {
        use reqwest::header::HeaderValue;

        let mut headers = reqwest::header::HeaderMap::new();
        if self.config.api_key.is_empty() {
            return headers;
        }

        if self.config.api_version.is_some() {
            if let Ok(val) = HeaderValue::from_str(&self.config.api_key) {
                headers.insert("api-key", val);
            }
        } else {
            let auth_value = format!("Bearer {}", self.config.api_key);
            if let Ok(val) = HeaderValue::from_str(&auth_value) {
                headers.insert(reqwest::header::AUTHORIZATION, val);
            }
        }
        headers
    }

    fn build_request(&self, request: &GenerateRequest) -> OpenAIChatRequest {
        OpenAIChatRequest {
            model: request
                .model
                .clone()
                .unwrap_or_else(|| self.config.model.clone()),
            messages: request
                .messages
                .iter()
                .map(|m| OpenAIMessage {
                    role: match m.role {
                        Role::System => "system".to_string(),
                        Role::User => "user".to_string(),
                        Role::Assistant => "assistant".to_string(),
                    },
                    content: m.content.clone(),
                })
                .collect(),
            max_tokens: Some(request.max_tokens.unwrap_or(self.config.max_tokens)),
            temperature: Some(request.temperature.unwrap_or(self.config.temperature)),
        }
    }

    /// Execute a single request (used by retry logic)
    async fn execute_request(
        &self,
        request: &OpenAIChatRequest,
    ) -> Result<OpenAIChatResponse, LlmError> {
        let response = self
            .client
            .post(self.chat_url())
            .headers(self.build_headers())
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let error = response.text().await.unwrap_or_default();
            // 5xx and rate limiting are retryable, other 4xx are not
            if status.is_server_error() || status == reqwest::StatusCode::TOO_MANY_REQUESTS {
                return Err(LlmError::Network(format!("Server error {}: {}", status, error)));
            }
            return Err(LlmError::Api(format!("{}: {}", status, error)));
        }

        response
            .json()
            .await
            .map_err(|e| LlmError::InvalidResponse(e.to_string()))
    }

    /// Check if an error is retryable
    fn is_retryable(error: &LlmError) -> bool {
        matches!(error, LlmError::Network(_) | LlmError::Timeout)
    }

    /// Generate with retries and exponential backoff
    pub async fn complete(&self, request: &GenerateRequest) -> Result<GenerateResponse, LlmError> {
        let request = self.build_request(request);

        let mut last_error = None;
        let mut backoff = self.config.initial_backoff;

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                tracing::warn!(
                    attempt,
                    max_retries = self.config.max_retries,
                    backoff_ms = backoff.as_millis() as u64,
                    "Generation request failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff *= 2;
            }

            match self.execute_request(&request).await {
                Ok(response) => return Self::into_response(response),
                Err(e) if Self::is_retryable(&e) => last_error = Some(e),
                Err(e) => return Err(e),
            }
        }

        Err(last_error.unwrap_or_else(|| LlmError::Network("Max retries exceeded".to_string())))
    }

    fn into_response(response: OpenAIChatResponse) -> Result<GenerateResponse, LlmError> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| LlmError::InvalidResponse("No choices in response".to_string()))?;

        let finish_reason = match choice.finish_reason.as_deref() {
            Some("length") => FinishReason::Length,
            Some("content_filter") => FinishReason::ContentFilter,
            _ => FinishReason::Stop,
        };

        Ok(GenerateResponse {
            text: choice.message.content.unwrap_or_default(),
            finish_reason,
            usage: response
                .usage
                .map(|u| TokenUsage::new(u.prompt_tokens, u.completion_tokens)),
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAIBackend {
    async fn generate(
        &self,
        request: GenerateRequest,
    ) -> fleet_assistant_core::Result<GenerateResponse> {
        Ok(self.complete(&request).await?)
    }

    async fn is_available(&self) -> bool {
        self.client
            .get(format!("{}/models", self.config.endpoint.trim_end_matches('/')))
            .headers(self.build_headers())
            .send()
            .await
            .map(|r| r.status().is_success())
            .unwrap_or(false)
    }

    fn model_name(&self) -> &str {
        &self.config.model
    }
}

// OpenAI API types
#[derive(Debug, Serialize)]
struct OpenAIChatRequest {
    model: String,
    messages: Vec<OpenAIMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
}

#[derive(Debug, Serialize)]
struct OpenAIMessage {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct OpenAIChatResponse {
    choices: Vec<OpenAIChoice>,
    usage: Option<OpenAIUsage>,
}

#[derive(Debug, Deserialize)]
struct OpenAIResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIChoice {
    message: OpenAIResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct OpenAIUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
    use serde_json::{json, Value};

    #[test]
    fn test_remote_endpoint_requires_key() {
        assert!(OpenAIBackend::new(OpenAIConfig::default()).is_err());
        assert!(OpenAIBackend::new(OpenAIConfig::local("http://localhost:8000/v1", "m")).is_ok());
    }

    #[test]
    fn test_chat_url() {
        let backend =
            OpenAIBackend::new(OpenAIConfig::local("http://localhost:8000/v1/", "m")).unwrap();
        assert_eq!(backend.chat_url(), "http://localhost:8000/v1/chat/completions");

        let azure = OpenAIBackend::new(OpenAIConfig {
            endpoint: "https://example.openai.azure.com".to_string(),
            api_key: "key".to_string(),
            model: "gpt".to_string(),
            api_version: Some("2024-02-01".to_string()),
            ..Default::default()
        })
        .unwrap();
        assert_eq!(
            azure.chat_url(),
            "https://example.openai.azure.com/openai/deployments/gpt/chat/completions?api-version=2024-02-01"
        );
        assert!(azure.build_headers().contains_key("api-key"));
    }

    #[test]
    fn test_bearer_header() {
        let backend = OpenAIBackend::new(OpenAIConfig::openai("sk-test", "gpt-4")).unwrap();
        let headers = backend.build_headers();
        assert_eq!(headers[reqwest::header::AUTHORIZATION], "Bearer sk-test");
    }

    #[test]
    fn test_request_defaults_from_config() {
        let backend =
            OpenAIBackend::new(OpenAIConfig::local("http://localhost:8000/v1", "local")).unwrap();
        let request = GenerateRequest::new("system").with_user_message("hello");
        let body = backend.build_request(&request);

        assert_eq!(body.model, "local");
        assert_eq!(body.max_tokens, Some(150));
        assert_eq!(body.messages.len(), 2);
        assert_eq!(body.messages[0].role, "system");
        assert_eq!(body.messages[1].content, "hello");
    }

    #[test]
    fn test_from_settings() {
        let settings = GenerationConfig {
            api_key: Some("secret".to_string()),
            timeout_secs: Some(5),
            ..Default::default()
        };
        let config = OpenAIConfig::from_settings(&settings);
        assert_eq!(config.api_key, "secret");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_tokens, 150);
    }

    async fn spawn_server(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://127.0.0.1:{}/v1", addr.port())
    }

    async fn flaky_completion(
        State(calls): State<Arc<AtomicUsize>>,
        Json(body): Json<Value>,
    ) -> (StatusCode, Json<Value>) {
        if calls.fetch_add(1, Ordering::SeqCst) == 0 {
            return (StatusCode::SERVICE_UNAVAILABLE, Json(json!({"error": "busy"})));
        }
        let user = body["messages"][1]["content"].as_str().unwrap_or_default().to_string();
        (
            StatusCode::OK,
            Json(json!({
                "choices": [{"message": {"role": "assistant", "content": format!("echo: {}", user)}, "finish_reason": "stop"}],
                "usage": {"prompt_tokens": 10, "completion_tokens": 3, "total_tokens": 13}
            })),
        )
    }

    #[tokio::test]
    async fn test_generate_retries_server_error() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route("/v1/chat/completions", post(flaky_completion))
            .with_state(calls.clone());
        let endpoint = spawn_server(app).await;

        let backend = OpenAIBackend::new(OpenAIConfig {
            initial_backoff: Duration::from_millis(1),
            ..OpenAIConfig::local(endpoint, "m")
        })
        .unwrap();

        let response = backend
            .generate(GenerateRequest::new("system").with_user_message("привет"))
            .await
            .unwrap();

        assert_eq!(response.text, "echo: привет");
        assert_eq!(response.usage.unwrap().total_tokens, 13);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_client_error_is_not_retried() {
        let calls = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/v1/chat/completions",
                post(|State(calls): State<Arc<AtomicUsize>>| async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::UNAUTHORIZED, "bad key")
                }),
            )
            .with_state(calls.clone());
        let endpoint = spawn_server(app).await;

        let backend = OpenAIBackend::new(OpenAIConfig::local(endpoint, "m")).unwrap();
        let result = backend
            .complete(&GenerateRequest::new("system").with_user_message("x"))
            .await;

        assert!(matches!(result, Err(LlmError::Api(_))));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
