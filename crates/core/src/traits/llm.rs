//! Language Model traits

use async_trait::async_trait;

use crate::{GenerateRequest, GenerateResponse, Result};

/// Text-generation capability consumed by the resolver
///
/// Implementations:
/// - `OpenAIBackend` - OpenAI-compatible chat completions
/// - test doubles that echo, count, fail or hang
///
/// # Example
///
/// ```ignore
/// let llm: Arc<dyn LanguageModel> = Arc::new(OpenAIBackend::new(config)?);
/// let request = GenerateRequest::new(system_prompt)
///     .with_user_message("Какие машины есть?")
///     .with_temperature(0.3)
///     .with_max_tokens(150);
/// let response = llm.generate(request).await?;
/// println!("{}", response.text);
/// ```
#[async_trait]
pub trait LanguageModel: Send + Sync + 'static {
    /// Generate completion
    ///
    /// Any failure, including a timeout enforced by the backend, is returned as
    /// an error; callers map it to the `error` intent.
    async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse>;

    /// Check if model is available
    async fn is_available(&self) -> bool {
        true
    }

    /// Get model name for logging
    fn model_name(&self) -> &str;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct MockLlm;

    #[async_trait]
    impl LanguageModel for MockLlm {
        async fn generate(&self, request: GenerateRequest) -> Result<GenerateResponse> {
            Ok(GenerateResponse::text(format!(
                "echo: {}",
                request.user_message().unwrap_or_default()
            )))
        }

        fn model_name(&self) -> &str {
            "mock-llm"
        }
    }

    #[tokio::test]
    async fn test_mock_llm() {
        let llm = MockLlm;
        assert!(llm.is_available().await);
        assert_eq!(llm.model_name(), "mock-llm");

        let request = GenerateRequest::new("Test").with_user_message("Hello");
        let response = llm.generate(request).await.unwrap();
        assert_eq!(response.text, "echo: Hello");
    }
}
