//! OpenAI API client for chat-completion text generation.
//!
//! This module provides an HTTP client for the OpenAI chat completions API,
//! used by the map-reduce summarizer for chunk summaries, consolidation, and
//! structured action-item extraction.

use async_trait::async_trait;
use log::*;
use meeting_ai::traits::generation::Provider;
use meeting_ai::types::generation::CompletionRequest;
use meeting_ai::Error;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Request body for the chat completions endpoint.
#[derive(Debug, Serialize)]
struct ChatCompletionBody {
    model: String,
    messages: Vec<ChatMessage>,
    temperature: f32,
    max_tokens: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    response_format: Option<ResponseFormat>,
}

#[derive(Debug, Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Debug, Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

/// Response from the chat completions endpoint.
#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Debug, Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Error body returned by the API on failures.
#[derive(Debug, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    error: Option<ApiErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ApiErrorDetail {
    #[serde(default)]
    message: Option<String>,
}

/// OpenAI API client
pub struct OpenAiClient {
    client: reqwest::Client,
    base_url: String,
    api_key: SecretString,
}

impl OpenAiClient {
    /// Create a new OpenAI client with the given API key and base URL.
    pub fn new(api_key: &str, base_url: &str) -> Result<Self, Error> {
        let client = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(Duration::from_secs(120))
            .build()
            .map_err(|e| {
                warn!("Failed to build OpenAI HTTP client: {:?}", e);
                Error::Configuration("Failed to build HTTP client".to_string())
            })?;

        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: SecretString::new(api_key.to_string()),
        })
    }

    async fn chat_completion(&self, request: &CompletionRequest) -> Result<String, Error> {
        let url = format!("{}/chat/completions", self.base_url);

        let body = ChatCompletionBody {
            model: request.model.clone(),
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: request.system_prompt.clone(),
                },
                ChatMessage {
                    role: "user",
                    content: request.user_prompt.clone(),
                },
            ],
            temperature: request.temperature,
            max_tokens: request.max_tokens,
            response_format: request
                .json_response
                .then_some(ResponseFormat { kind: "json_object" }),
        };

        debug!(
            "OpenAI chat completion (model: {}, json: {})",
            request.model, request.json_response
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(self.api_key.expose_secret())
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                warn!("OpenAI completion request failed: {:?}", e);
                Error::Network(e.to_string())
            })?;

        let status = response.status();
        if status.is_success() {
            let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
                warn!("Failed to parse OpenAI response: {:?}", e);
                Error::Deserialization("Invalid response from OpenAI".to_string())
            })?;

            completion
                .choices
                .into_iter()
                .next()
                .and_then(|choice| choice.message.content)
                .ok_or_else(|| {
                    Error::Deserialization("OpenAI response contained no choices".to_string())
                })
        } else {
            let retry_after = retry_after_seconds(&response);
            let error_text = response.text().await.unwrap_or_default();
            error!("OpenAI API: {}", error_text);

            match status.as_u16() {
                401 | 403 => Err(Error::Authentication(error_message(&error_text))),
                429 => Err(Error::RateLimited {
                    retry_after_seconds: retry_after.unwrap_or(5),
                }),
                _ => Err(Error::Provider(error_message(&error_text))),
            }
        }
    }
}

#[async_trait]
impl Provider for OpenAiClient {
    async fn complete(&self, request: CompletionRequest) -> Result<String, Error> {
        self.chat_completion(&request).await
    }

    fn provider_id(&self) -> &str {
        "openai"
    }

    async fn verify_credentials(&self) -> Result<bool, Error> {
        let url = format!("{}/models", self.base_url);

        let response = self
            .client
            .get(&url)
            .bearer_auth(self.api_key.expose_secret())
            .send()
            .await
            .map_err(|e| {
                warn!("Failed to verify OpenAI API key: {:?}", e);
                Error::Network(e.to_string())
            })?;

        Ok(response.status().is_success())
    }
}

/// Extracts the Retry-After header as whole seconds, if present.
fn retry_after_seconds(response: &reqwest::Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.parse::<u64>().ok())
}

/// Pulls the human-readable error message out of an API error body, falling
/// back to the raw body text.
fn error_message(error_text: &str) -> String {
    serde_json::from_str::<ApiErrorBody>(error_text)
        .ok()
        .and_then(|body| body.error)
        .and_then(|detail| detail.message)
        .unwrap_or_else(|| error_text.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client_for(server: &mockito::ServerGuard) -> OpenAiClient {
        OpenAiClient::new("sk-test", &server.url()).unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest::text(
            "gpt-4o-mini",
            "You are a meeting secretary.".to_string(),
            "Summarize: Alice said hi.".to_string(),
        )
    }

    #[tokio::test]
    async fn test_complete_returns_first_choice_content() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "gpt-4o-mini",
                "temperature": 0.3
            })))
            .with_status(200)
            .with_body(
                r#"{"choices": [{"message": {"role": "assistant", "content": "Alice greeted."}}]}"#,
            )
            .create_async()
            .await;

        let client = client_for(&server);
        let result = client.complete(request()).await.unwrap();
        assert_eq!(result, "Alice greeted.");
    }

    #[tokio::test]
    async fn test_json_mode_sets_response_format() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "response_format": {"type": "json_object"}
            })))
            .with_status(200)
            .with_body(r#"{"choices": [{"message": {"content": "{\"action_items\":[]}"}}]}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let req = CompletionRequest::json(
            "gpt-4o-mini",
            "Extract action items.".to_string(),
            "summary text".to_string(),
        );
        let result = client.complete(req).await.unwrap();
        assert_eq!(result, "{\"action_items\":[]}");
    }

    #[tokio::test]
    async fn test_rate_limit_maps_to_rate_limited() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(429)
            .with_header("retry-after", "7")
            .with_body(r#"{"error": {"message": "Rate limit reached"}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.complete(request()).await.unwrap_err();
        match err {
            Error::RateLimited {
                retry_after_seconds,
            } => assert_eq!(retry_after_seconds, 7),
            other => panic!("expected RateLimited, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_server_error_maps_to_provider_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(500)
            .with_body(r#"{"error": {"message": "The server had an error"}}"#)
            .create_async()
            .await;

        let client = client_for(&server);
        let err = client.complete(request()).await.unwrap_err();
        match err {
            Error::Provider(msg) => assert_eq!(msg, "The server had an error"),
            other => panic!("expected Provider, got {:?}", other),
        }
    }
}
