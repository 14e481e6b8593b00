//! OpenAI-compatible chat completions provider.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{LlmError, LlmResult};
use crate::parse::parse_response;
use crate::provider::{ExecutionMode, Provider, ProviderInfo, ProviderProfile, ResponseFormat};

pub const DEFAULT_MODEL: &str = "gpt-4o-mini";
const MAX_TOKENS: u32 = 1000;

/// Stateless HTTP provider (`POST {base_url}/chat/completions`).
#[derive(Debug, Clone)]
pub struct OpenAiApiProvider {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
    model: String,
    mode: ExecutionMode,
    profile: ProviderProfile,
}

impl OpenAiApiProvider {
    pub fn new(
        model: impl Into<String>,
        base_url: impl Into<String>,
        api_key: impl Into<String>,
    ) -> LlmResult<Self> {
        let profile = ProviderProfile::PARALLEL_API;
        let model = model.into();
        Ok(Self {
            client: http_client(&profile)?,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.into(),
            model: if model.is_empty() { DEFAULT_MODEL.to_string() } else { model },
            mode: ExecutionMode::ParallelApi,
            profile,
        })
    }

    /// Replace the call profile; the HTTP client picks up the new timeout.
    pub fn with_profile(mut self, profile: ProviderProfile) -> LlmResult<Self> {
        self.client = http_client(&profile)?;
        self.profile = profile;
        Ok(self)
    }

    pub fn with_mode(mut self, mode: ExecutionMode) -> Self {
        self.mode = mode;
        self
    }

    /// Read the API key from `api_key_env`.
    pub fn from_env(
        model: impl Into<String>,
        base_url: impl Into<String>,
        api_key_env: &str,
    ) -> LlmResult<Self> {
        let key = std::env::var(api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| LlmError::ApiKeyMissing(api_key_env.to_string()))?;
        Self::new(model, base_url, key)
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Reasoning models take `max_completion_tokens` and no temperature.
    fn is_reasoning_model(&self) -> bool {
        ["gpt-5", "o1", "o3", "o4"]
            .iter()
            .any(|prefix| self.model.starts_with(prefix))
    }

    fn request_body<'a>(&'a self, prompt: &'a str) -> ChatRequest<'a> {
        let reasoning = self.is_reasoning_model();
        ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user",
                content: prompt,
            }],
            max_tokens: (!reasoning).then_some(MAX_TOKENS),
            max_completion_tokens: reasoning.then_some(MAX_TOKENS),
            temperature: (!reasoning).then_some(1.0),
            reasoning_effort: reasoning.then_some("medium"),
        }
    }
}

fn http_client(profile: &ProviderProfile) -> LlmResult<reqwest::Client> {
    Ok(reqwest::Client::builder().timeout(profile.timeout()).build()?)
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    reasoning_effort: Option<&'a str>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
    #[serde(default)]
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: String,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}

#[async_trait]
impl Provider for OpenAiApiProvider {
    fn name(&self) -> &str {
        "openai-api"
    }

    fn info(&self) -> ProviderInfo {
        ProviderInfo {
            name: self.name().to_string(),
            display_name: format!("OpenAI API ({})", self.model),
            mode: Some(self.mode),
            profile: self.profile,
        }
    }

    async fn execute(&self, prompt: &str, format: ResponseFormat) -> LlmResult<String> {
        debug!(model = %self.model, prompt_chars = prompt.len(), "sending chat completion");

        let response = self
            .client
            .post(format!("{}/chat/completions", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&self.request_body(prompt))
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(LlmError::Http {
                provider: self.name().to_string(),
                status: status.as_u16(),
                body,
            });
        }

        let parsed: ChatResponse = serde_json::from_str(&body)
            .map_err(|e| LlmError::InvalidResponse(format!("malformed completion body: {e}")))?;
        if let Some(err) = parsed.error {
            return Err(LlmError::InvalidResponse(err.message));
        }
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| LlmError::InvalidResponse("no choices in response".to_string()))?;

        debug!(model = %self.model, response_chars = content.len(), "chat completion received");
        Ok(parse_response(&content, format))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn completion(content: &str) -> String {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
        .to_string()
    }

    #[tokio::test]
    async fn test_execute_extracts_json_reply() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", "/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion("Sure:\n```json\n{\"violates\": false}\n```"))
            .create_async()
            .await;

        let provider = OpenAiApiProvider::new("gpt-4o-mini", server.url(), "sk-test").unwrap();
        let reply = provider.execute("check", ResponseFormat::Json).await.unwrap();
        assert_eq!(reply, "{\"violates\": false}");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_error_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(503)
            .with_body("overloaded")
            .create_async()
            .await;

        let provider = OpenAiApiProvider::new("", server.url(), "sk-test").unwrap();
        let err = provider.execute("check", ResponseFormat::Json).await.unwrap_err();
        assert!(matches!(err, LlmError::Http { status: 503, .. }));
        assert!(err.is_retryable());
        assert_eq!(provider.model(), DEFAULT_MODEL);
    }

    #[tokio::test]
    async fn test_empty_choices_is_invalid() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/chat/completions")
            .with_status(200)
            .with_body(r#"{"choices": []}"#)
            .create_async()
            .await;

        let provider = OpenAiApiProvider::new("gpt-4o-mini", server.url(), "sk-test").unwrap();
        let err = provider.execute("check", ResponseFormat::Text).await.unwrap_err();
        assert!(matches!(err, LlmError::InvalidResponse(_)));
    }

    #[test]
    fn test_reasoning_model_request_shape() {
        let provider = OpenAiApiProvider::new("o3-mini", "http://localhost", "k").unwrap();
        let body = serde_json::to_value(provider.request_body("hi")).unwrap();
        assert_eq!(body["max_completion_tokens"], 1000);
        assert!(body.get("temperature").is_none());

        let provider = OpenAiApiProvider::new("gpt-4o-mini", "http://localhost", "k").unwrap();
        let body = serde_json::to_value(provider.request_body("hi")).unwrap();
        assert_eq!(body["max_tokens"], 1000);
        assert!(body.get("reasoning_effort").is_none());
    }

    #[test]
    fn test_from_env_requires_key() {
        let err = OpenAiApiProvider::from_env("m", "http://localhost", "SYM_TEST_UNSET_KEY_VAR")
            .unwrap_err();
        assert!(matches!(err, LlmError::ApiKeyMissing(_)));
    }

    #[test]
    fn test_info_is_parallel_api() {
        let provider = OpenAiApiProvider::new("gpt-4o-mini", "http://localhost/", "k").unwrap();
        let info = provider.info();
        assert_eq!(info.mode, Some(ExecutionMode::ParallelApi));
        assert_eq!(info.profile.max_prompt_chars, 8000);
    }
}
