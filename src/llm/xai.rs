use async_trait::async_trait;
use tracing::debug;

use super::{post_completion, ChatCompletionProvider, ChatRequest, CompletionBody, LlmError};

/// Primary enhancement provider
///
/// Posts to the configured endpoint URL as-is. The model is only sent when
/// the request or the provider names one.
pub struct XaiProvider {
    client: reqwest::Client,
    api_key: String,
    endpoint: String,
    model: Option<String>,
}

impl XaiProvider {
    pub fn new(
        client: reqwest::Client,
        api_key: impl Into<String>,
        endpoint: impl Into<String>,
    ) -> Self {
        Self {
            client,
            api_key: api_key.into(),
            endpoint: endpoint.into(),
            model: None,
        }
    }

    pub fn with_model(mut self, model: Option<String>) -> Self {
        self.model = model;
        self
    }
}

#[async_trait]
impl ChatCompletionProvider for XaiProvider {
    fn name(&self) -> &str {
        "xai"
    }

    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError> {
        if self.api_key.is_empty() || self.endpoint.is_empty() {
            return Err(LlmError::NotConfigured(
                "xAI API key or endpoint URL is missing".to_string(),
            ));
        }

        let model = request.model.as_deref().or(self.model.as_deref());
        let body = CompletionBody {
            model,
            messages: &request.messages,
        };

        debug!(endpoint = %self.endpoint, model = ?model, "Sending request to xAI endpoint");
        post_completion(&self.client, self.name(), &self.endpoint, &self.api_key, &body).await
    }
}
