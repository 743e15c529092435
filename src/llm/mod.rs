//! # Chat-Completion Providers
//!
//! Wire types and the provider trait shared by text enhancement and question
//! answering. Two providers are implemented:
//!
//! - [`XaiProvider`]: the primary enhancement endpoint, posted to verbatim at
//!   its configured URL
//! - [`OpenAiProvider`]: any OpenAI-compatible `/chat/completions` API, used as
//!   the enhancement fallback and for Q&A

mod openai;
mod xai;

pub use openai::OpenAiProvider;
pub use xai::XaiProvider;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

/// One message of a chat-completion conversation
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// A conversation to complete
///
/// `model` overrides the provider's default model when set.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct ChatRequest {
    pub model: Option<String>,
    pub messages: Vec<ChatMessage>,
}

impl ChatRequest {
    pub fn new(messages: Vec<ChatMessage>) -> Self {
        Self {
            model: None,
            messages,
        }
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }
}

/// Chat-completion failure
#[derive(Debug, Clone, PartialEq)]
pub enum LlmError {
    /// The provider answered with a non-success HTTP status
    Status {
        provider: String,
        status: u16,
        body: String,
    },
    /// The request never produced a response (connect, TLS, timeout)
    Transport(String),
    /// The response body was not a chat completion
    Decode(String),
    /// The completion carried no message content
    EmptyResponse(String),
    /// The provider lacks credentials or an endpoint
    NotConfigured(String),
}

impl LlmError {
    /// HTTP status, when the provider answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            LlmError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

impl fmt::Display for LlmError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LlmError::Status {
                provider,
                status,
                body,
            } => {
                if body.is_empty() {
                    write!(f, "[LLM_STATUS] {} returned HTTP {}", provider, status)
                } else {
                    write!(f, "[LLM_STATUS] {} returned HTTP {}: {}", provider, status, body)
                }
            }
            LlmError::Transport(msg) => write!(f, "[LLM_TRANSPORT] {}", msg),
            LlmError::Decode(msg) => write!(f, "[LLM_DECODE] {}", msg),
            LlmError::EmptyResponse(provider) => {
                write!(f, "[LLM_EMPTY] {} returned no message content", provider)
            }
            LlmError::NotConfigured(msg) => write!(f, "[LLM_CONFIG] {}", msg),
        }
    }
}

impl std::error::Error for LlmError {}

/// A hosted chat-completion service
#[async_trait]
pub trait ChatCompletionProvider: Send + Sync {
    /// Provider name used in logs, metrics and results
    fn name(&self) -> &str;

    /// Complete the conversation and return the first choice's message content
    async fn complete(&self, request: &ChatRequest) -> Result<String, LlmError>;
}

/// Request body understood by OpenAI-compatible endpoints
#[derive(Debug, Serialize)]
pub(crate) struct CompletionBody<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub model: Option<&'a str>,
    pub messages: &'a [ChatMessage],
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionResponse {
    #[serde(default)]
    pub choices: Vec<CompletionChoice>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionChoice {
    pub message: CompletionMessage,
}

#[derive(Debug, Deserialize)]
pub(crate) struct CompletionMessage {
    #[serde(default)]
    pub content: Option<String>,
}

/// Build the shared outbound HTTP client
pub fn build_http_client(timeout: Duration) -> Result<reqwest::Client, LlmError> {
    reqwest::Client::builder()
        .timeout(timeout)
        .build()
        .map_err(|e| LlmError::Transport(format!("failed to build HTTP client: {e}")))
}

/// POST a completion body and extract `choices[0].message.content`
pub(crate) async fn post_completion(
    client: &reqwest::Client,
    provider: &str,
    url: &str,
    api_key: &str,
    body: &CompletionBody<'_>,
) -> Result<String, LlmError> {
    let response = client
        .post(url)
        .bearer_auth(api_key)
        .json(body)
        .send()
        .await
        .map_err(|e| LlmError::Transport(format!("{provider} request failed: {e}")))?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        return Err(LlmError::Status {
            provider: provider.to_string(),
            status: status.as_u16(),
            body: truncate_body(&body),
        });
    }

    let parsed: CompletionResponse = response
        .json()
        .await
        .map_err(|e| LlmError::Decode(format!("failed to parse {provider} response: {e}")))?;

    extract_content(provider, parsed)
}

pub(crate) fn extract_content(
    provider: &str,
    response: CompletionResponse,
) -> Result<String, LlmError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|choice| choice.message.content)
        .filter(|content| !content.trim().is_empty())
        .ok_or_else(|| LlmError::EmptyResponse(provider.to_string()))
}

fn truncate_body(body: &str) -> String {
    const MAX_BODY_CHARS: usize = 300;
    if body.chars().count() > MAX_BODY_CHARS {
        format!("{}...", body.chars().take(MAX_BODY_CHARS).collect::<String>())
    } else {
        body.to_string()
    }
}
