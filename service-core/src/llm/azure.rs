//! Azure OpenAI chat-completions client.

use super::{CompletionClient, CompletionError, CompletionParams};
use crate::config::LlmConfig;
use crate::error::AppError;
use async_trait::async_trait;
use metrics::{counter, histogram};
use reqwest::{Client, StatusCode};
use secrecy::ExposeSecret;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

pub struct AzureOpenAiClient {
    config: LlmConfig,
    client: Client,
}

impl AzureOpenAiClient {
    pub fn new(config: LlmConfig) -> Result<Self, AppError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                AppError::ConfigError(anyhow::anyhow!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self { config, client })
    }

    fn api_url(&self) -> String {
        format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            self.config.endpoint.trim_end_matches('/'),
            self.config.deployment,
            self.config.api_version
        )
    }

    async fn send(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        params: &CompletionParams,
    ) -> Result<String, CompletionError> {
        let request = ChatCompletionRequest {
            messages: [
                ChatMessage {
                    role: "system",
                    content: system_prompt,
                },
                ChatMessage {
                    role: "user",
                    content: user_prompt,
                },
            ],
            max_tokens: params.max_tokens,
            temperature: params.temperature,
        };

        tracing::debug!(
            deployment = %self.config.deployment,
            system_prompt_len = system_prompt.len(),
            user_prompt_len = user_prompt.len(),
            "Sending request to Azure OpenAI"
        );

        let response = self
            .client
            .post(self.api_url())
            .header("api-key", self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(status_error(status, &body));
        }

        let body: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::Unknown(format!("Failed to parse response: {}", e)))?;

        body.choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.is_empty())
            .ok_or(CompletionError::EmptyResponse)
    }
}

#[async_trait]
impl CompletionClient for AzureOpenAiClient {
    async fn complete(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        params: &CompletionParams,
    ) -> Result<String, CompletionError> {
        let start = Instant::now();
        let result = self.send(system_prompt, user_prompt, params).await;

        histogram!(
            "llm_completion_duration_seconds",
            "deployment" => self.config.deployment.clone()
        )
        .record(start.elapsed().as_secs_f64());

        match &result {
            Ok(text) => tracing::debug!(response_len = text.len(), "Azure OpenAI completion received"),
            Err(e) => {
                tracing::error!(kind = e.kind(), error = %e, "Azure OpenAI completion failed");
                counter!("llm_completion_errors_total", "kind" => e.kind()).increment(1);
            }
        }

        result
    }
}

fn transport_error(err: reqwest::Error) -> CompletionError {
    if err.is_connect() || err.is_timeout() {
        CompletionError::Connection(err.to_string())
    } else {
        CompletionError::Unknown(err.to_string())
    }
}

fn status_error(status: StatusCode, body: &str) -> CompletionError {
    let message = serde_json::from_str::<ApiErrorBody>(body)
        .map(|e| e.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => CompletionError::Auth(message),
        StatusCode::TOO_MANY_REQUESTS => CompletionError::RateLimit(message),
        _ => CompletionError::Api(format!("{}: {}", status, message)),
    }
}

// ============================================================================
// Azure OpenAI Request/Response Types
// ============================================================================

#[derive(Debug, Serialize)]
struct ChatCompletionRequest<'a> {
    messages: [ChatMessage<'a>; 2],
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    message: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use secrecy::Secret;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(endpoint: &str) -> LlmConfig {
        LlmConfig {
            endpoint: endpoint.to_string(),
            api_key: Secret::new("test-key".to_string()),
            deployment: "gpt-4.1-mini".to_string(),
            api_version: "2025-01-01-preview".to_string(),
            max_tokens: 1000,
            temperature: 0.0,
            timeout_secs: 5,
        }
    }

    async fn complete_against(server: &MockServer) -> Result<String, CompletionError> {
        let client = AzureOpenAiClient::new(test_config(&server.uri())).unwrap();
        client
            .complete("system", "user", &CompletionParams::default())
            .await
    }

    #[test]
    fn api_url_includes_deployment_and_version() {
        let client =
            AzureOpenAiClient::new(test_config("https://example.openai.azure.com/")).unwrap();
        assert_eq!(
            client.api_url(),
            "https://example.openai.azure.com/openai/deployments/gpt-4.1-mini/chat/completions?api-version=2025-01-01-preview"
        );
    }

    #[tokio::test]
    async fn returns_first_choice_content() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/openai/deployments/gpt-4.1-mini/chat/completions"))
            .and(query_param("api-version", "2025-01-01-preview"))
            .and(header("api-key", "test-key"))
            .and(body_partial_json(json!({
                "messages": [
                    {"role": "system", "content": "system"},
                    {"role": "user", "content": "user"}
                ],
                "max_tokens": 1000,
                "temperature": 0.0
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": "{\"ok\": true}"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        assert_eq!(complete_against(&server).await.unwrap(), "{\"ok\": true}");
    }

    #[tokio::test]
    async fn classifies_auth_failure() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(401).set_body_json(json!({
                "error": {"code": "401", "message": "Access denied due to invalid subscription key."}
            })))
            .mount(&server)
            .await;

        let err = complete_against(&server).await.unwrap_err();
        assert_eq!(
            err,
            CompletionError::Auth("Access denied due to invalid subscription key.".to_string())
        );
    }

    #[tokio::test]
    async fn classifies_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = complete_against(&server).await.unwrap_err();
        assert!(matches!(err, CompletionError::RateLimit(_)));
        assert_eq!(err.kind(), "rate_limit");
    }

    #[tokio::test]
    async fn other_statuses_are_api_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "error": {"code": "context_length_exceeded", "message": "too many tokens"}
            })))
            .mount(&server)
            .await;

        let err = complete_against(&server).await.unwrap_err();
        match err {
            CompletionError::Api(msg) => {
                assert!(msg.contains("400"));
                assert!(msg.contains("too many tokens"));
            }
            other => panic!("expected Api error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn null_content_is_empty_response() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "choices": [{"message": {"role": "assistant", "content": null}}]
            })))
            .mount(&server)
            .await;

        assert_eq!(
            complete_against(&server).await.unwrap_err(),
            CompletionError::EmptyResponse
        );
    }

    #[tokio::test]
    async fn undecodable_body_is_unknown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>proxy</html>"))
            .mount(&server)
            .await;

        assert!(matches!(
            complete_against(&server).await.unwrap_err(),
            CompletionError::Unknown(_)
        ));
    }

    #[tokio::test]
    async fn unreachable_backend_is_connection_error() {
        let client = AzureOpenAiClient::new(test_config("http://127.0.0.1:1")).unwrap();
        let err = client
            .complete("system", "user", &CompletionParams::default())
            .await
            .unwrap_err();
        assert!(matches!(err, CompletionError::Connection(_)));
    }
}
