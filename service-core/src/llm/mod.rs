//! LLM completion abstractions shared by the invoice services.
//!
//! The backend is an opaque text-in/text-out capability behind
//! [`CompletionClient`]; [`recovery`] turns its free-form reply back into
//! typed JSON.

pub mod azure;
pub mod mock;
pub mod recovery;

use async_trait::async_trait;
use thiserror::Error;

pub use azure::AzureOpenAiClient;
pub use mock::MockCompletionClient;
pub use recovery::{FallbackPayload, Recovered, recover};

/// Classified failure of a completion call.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CompletionError {
    #[error("Azure OpenAI authentication failed. Please check your API key: {0}")]
    Auth(String),

    #[error("Azure OpenAI rate limit exceeded. Please try again later: {0}")]
    RateLimit(String),

    #[error("Failed to connect to Azure OpenAI. Please check your endpoint URL: {0}")]
    Connection(String),

    #[error("Azure OpenAI API error: {0}")]
    Api(String),

    #[error("Failed to call Azure OpenAI: {0}")]
    Unknown(String),

    #[error("Empty response from Azure OpenAI")]
    EmptyResponse,
}

impl CompletionError {
    /// Short label for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            CompletionError::Auth(_) => "auth",
            CompletionError::RateLimit(_) => "rate_limit",
            CompletionError::Connection(_) => "connection",
            CompletionError::Api(_) => "api",
            CompletionError::Unknown(_) => "unknown",
            CompletionError::EmptyResponse => "empty_response",
        }
    }
}

/// Sampling limits for a single completion.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    pub max_tokens: u32,
    /// 0 means greedy decoding, which keeps structured output reproducible.
    pub temperature: f32,
}

impl Default for CompletionParams {
    fn default() -> Self {
        Self {
            max_tokens: crate::config::DEFAULT_MAX_TOKENS,
            temperature: 0.0,
        }
    }
}

impl From<&crate::config::LlmConfig> for CompletionParams {
    fn from(config: &crate::config::LlmConfig) -> Self {
        Self {
            max_tokens: config.max_tokens,
            temperature: config.temperature,
        }
    }
}

/// A chat-completion backend: one system message, one user message, one reply.
///
/// Implementations make a single attempt; retry policy belongs to callers.
#[async_trait]
pub trait CompletionClient: Send + Sync {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        params: &CompletionParams,
    ) -> Result<String, CompletionError>;
}
