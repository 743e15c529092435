use async_trait::async_trait;
use tracing::debug;

use super::{post_completion, ChatCompletionProvider, ChatRequest, CompletionBody, LlmError};

/// OpenAI-compatible chat-completion provider
pub struct OpenAiProvider {
    client: reqwest::Client,
    api_key: String,
    base_url: String,
    default_model: String,
}

impl OpenAiProvider {
    pub fn new(
        client: reqwest::Client,
        api_key: impl Into<String>,
        default_model: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            base_url: "https://api.openai.com/v1".to_string(),
            default_model: default_model.into(),
        }
    }

    pub fn with_base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    fn completions_url(&self) -> String {
        format!("{}/chat/completions", self.base_url.trim_end_matches('/'))
    }
}

#[async_trait]
impl ChatCompletionProvider for OpenAiProvider {
    fn name(&self) -> &str {
        "openai"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        if self.api_key.is_empty() {
            return Err(LlmError::NotConfigured("OpenAI API key is missing".to_string()));
        }

        let model = request.model.as_deref().unwrap_or(&self.default_model);
        let body = CompletionBody {
            model: Some(model),
            messages: &request.messages,
        };

        debug!(model = %model, "Sending request to OpenAI-compatible API");
        post_completion(
            &self.client,
            self.name(),
            &self.completions_url(),
            &self.api_key,
            &body,
        )
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_completions_url_joins_cleanly() {
        let provider = OpenAiProvider::new(reqwest::Client::new(), "k", "m")
            .with_base_url("https://llm.example.com/v1/");
        assert_eq!(
            provider.completions_url(),
            "https://llm.example.com/v1/chat/completions"
        );
    }

    #[tokio::test]
    async fn test_missing_key_is_not_configured() {
        let provider = OpenAiProvider::new(reqwest::Client::new(), "", "m");
        let result = provider
            .complete(&ChatRequest::new(vec![super::super::ChatMessage::user("x")]))
            .await;
        assert!(matches!(result, Err(LlmError::NotConfigured(_))));
    }
}
