//! LLM backend client.
//!
//! HTTP client speaking the Ollama API, behind the `BackendClient` trait so
//! the transform layer stays backend-agnostic. Clients are constructed only
//! when an `llm`-kind profile is actually instantiated; identity-only runs
//! never touch this module.

use crate::error::{BackendError, TransformError};
use crate::profile::{LlmProfile, LlmSettings};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

const BACKEND_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Default overall request timeout, overridable per invocation.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

/// Backend client capability consumed by the LLM transformer
#[async_trait]
pub trait BackendClient: Send + Sync {
    /// Liveness and model-presence probe. False when the server does not
    /// answer or the configured model is not present on it.
    async fn is_available(&self) -> bool;

    /// Send a system/user prompt pair and return the reply text.
    async fn invoke(&self, system_prompt: &str, user_prompt: &str)
        -> Result<String, BackendError>;
}

// Ollama API request/response structures
#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    stream: bool,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    message: ResponseMessage,
}

#[derive(Deserialize)]
struct ResponseMessage {
    content: Option<String>,
}

#[derive(Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<ModelTag>,
}

#[derive(Deserialize)]
struct ModelTag {
    #[serde(alias = "model")]
    name: String,
}

fn map_http_error(timeout: Duration, error: reqwest::Error) -> BackendError {
    if error.is_timeout() {
        BackendError::Timeout(timeout)
    } else if error.is_connect() {
        BackendError::RequestFailed(format!("Connection error: {}", error))
    } else {
        BackendError::RequestFailed(format!("HTTP error: {}", error))
    }
}

/// Ollama backend client
pub struct OllamaBackend {
    client: Client,
    model: String,
    server_url: String,
    timeout: Duration,
}

impl OllamaBackend {
    pub fn new(settings: &LlmSettings, timeout: Duration) -> Result<Self, TransformError> {
        let client = Client::builder()
            .no_proxy()
            .connect_timeout(BACKEND_CONNECT_TIMEOUT)
            .timeout(timeout)
            .build()
            .map_err(|e| {
                TransformError::BackendUnavailable(format!("Failed to create HTTP client: {}", e))
            })?;

        Ok(Self {
            client,
            model: settings.model_name.clone(),
            server_url: settings.server_url.trim_end_matches('/').to_string(),
            timeout,
        })
    }

    /// Constructor registered with the transform factory for `llm` profiles.
    pub fn construct(
        profile: &LlmProfile,
        timeout: Duration,
    ) -> Result<Box<dyn BackendClient>, TransformError> {
        Ok(Box::new(Self::new(&profile.settings, timeout)?))
    }

    pub fn model_name(&self) -> &str {
        &self.model
    }
}

#[async_trait]
impl BackendClient for OllamaBackend {
    async fn is_available(&self) -> bool {
        let url = format!("{}/api/tags", self.server_url);
        let response = match self.client.get(&url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!(url = %url, error = %e, "backend probe failed");
                return false;
            }
        };
        if !response.status().is_success() {
            debug!(url = %url, status = %response.status(), "backend probe rejected");
            return false;
        }
        let tags: TagsResponse = match response.json().await {
            Ok(tags) => tags,
            Err(e) => {
                debug!(url = %url, error = %e, "backend probe returned unparseable tags");
                return false;
            }
        };
        let present = tags.models.iter().any(|tag| tag.name == self.model);
        if !present {
            debug!(model = %self.model, "model not present on backend");
        }
        present
    }

    async fn invoke(
        &self,
        system_prompt: &str,
        user_prompt: &str,
    ) -> Result<String, BackendError> {
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
            stream: false,
        };

        let url = format!("{}/api/chat", self.server_url);
        let response = self
            .client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(|e| map_http_error(self.timeout, e))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(match status.as_u16() {
                404 => BackendError::ModelNotFound(error_text),
                _ => BackendError::RequestFailed(format!(
                    "Request failed with status {}: {}",
                    status, error_text
                )),
            });
        }

        let completion: ChatResponse = response
            .json()
            .await
            .map_err(|e| BackendError::InvalidResponse(format!("Failed to parse response: {}", e)))?;

        Ok(completion.message.content.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::profile::DEFAULT_SERVER_URL;

    fn settings(server_url: &str) -> LlmSettings {
        LlmSettings {
            model_name: "test-model".to_string(),
            server_url: server_url.to_string(),
        }
    }

    #[test]
    fn test_new_trims_trailing_slash() {
        let backend =
            OllamaBackend::new(&settings("http://localhost:11434/"), DEFAULT_REQUEST_TIMEOUT)
                .unwrap();
        assert_eq!(backend.server_url, "http://localhost:11434");
        assert_eq!(backend.model_name(), "test-model");
    }

    #[tokio::test]
    async fn test_is_available_true_when_model_listed() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"models":[{"name":"other"},{"name":"test-model"}]}"#)
            .create_async()
            .await;

        let backend =
            OllamaBackend::new(&settings(&server.url()), DEFAULT_REQUEST_TIMEOUT).unwrap();
        assert!(backend.is_available().await);
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_is_available_false_when_model_missing() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/api/tags")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"models":[{"name":"other"}]}"#)
            .create_async()
            .await;

        let backend =
            OllamaBackend::new(&settings(&server.url()), DEFAULT_REQUEST_TIMEOUT).unwrap();
        assert!(!backend.is_available().await);
    }

    #[tokio::test]
    async fn test_is_available_false_when_server_unreachable() {
        // Discard port: connection refused immediately.
        let backend =
            OllamaBackend::new(&settings("http://127.0.0.1:9"), DEFAULT_REQUEST_TIMEOUT).unwrap();
        assert!(!backend.is_available().await);
    }

    #[tokio::test]
    async fn test_invoke_sends_system_and_user_messages() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/api/chat")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "model": "test-model",
                "stream": false,
                "messages": [
                    {"role": "system", "content": "sys"},
                    {"role": "user", "content": "usr"}
                ]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":{"role":"assistant","content":"distilled"}}"#)
            .create_async()
            .await;

        let backend =
            OllamaBackend::new(&settings(&server.url()), DEFAULT_REQUEST_TIMEOUT).unwrap();
        let reply = backend.invoke("sys", "usr").await.unwrap();
        assert_eq!(reply, "distilled");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_invoke_null_content_is_empty_string() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(r#"{"message":{"role":"assistant","content":null}}"#)
            .create_async()
            .await;

        let backend =
            OllamaBackend::new(&settings(&server.url()), DEFAULT_REQUEST_TIMEOUT).unwrap();
        assert_eq!(backend.invoke("sys", "usr").await.unwrap(), "");
    }

    #[tokio::test]
    async fn test_invoke_maps_404_to_model_not_found() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(404)
            .with_body(r#"{"error":"model 'test-model' not found"}"#)
            .create_async()
            .await;

        let backend =
            OllamaBackend::new(&settings(&server.url()), DEFAULT_REQUEST_TIMEOUT).unwrap();
        let error = backend.invoke("sys", "usr").await.unwrap_err();
        assert!(matches!(error, BackendError::ModelNotFound(_)));
    }

    #[tokio::test]
    async fn test_invoke_maps_server_error_to_request_failed() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(500)
            .with_body("boom")
            .create_async()
            .await;

        let backend =
            OllamaBackend::new(&settings(&server.url()), DEFAULT_REQUEST_TIMEOUT).unwrap();
        let error = backend.invoke("sys", "usr").await.unwrap_err();
        assert!(matches!(error, BackendError::RequestFailed(_)));
    }

    #[tokio::test]
    async fn test_invoke_maps_bad_body_to_invalid_response() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/api/chat")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body("not json")
            .create_async()
            .await;

        let backend =
            OllamaBackend::new(&settings(&server.url()), DEFAULT_REQUEST_TIMEOUT).unwrap();
        let error = backend.invoke("sys", "usr").await.unwrap_err();
        assert!(matches!(error, BackendError::InvalidResponse(_)));
    }

    #[test]
    fn test_default_settings_point_at_local_server() {
        let backend = OllamaBackend::new(&LlmSettings::default(), DEFAULT_REQUEST_TIMEOUT).unwrap();
        assert_eq!(backend.server_url, DEFAULT_SERVER_URL);
    }
}
