//! OpenAI chat completions provider.

use super::{http_client, non_empty, send_request, AnalysisProvider};
use crate::analysis::prompt::SYSTEM_PROMPT;
use crate::config::ProviderSettings;
use crate::error::{ConfigError, ProviderError};
use crate::models::ProviderName;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Provider backed by `POST /v1/chat/completions`.
pub struct OpenAiProvider {
    api_key: String,
    model: String,
    endpoint: String,
    max_tokens: u32,
    temperature: f32,
    timeout_seconds: u64,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
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

impl OpenAiProvider {
    pub fn new(api_key: String, settings: &ProviderSettings) -> Result<Self, ConfigError> {
        let provider = ProviderName::OpenAi;
        Ok(Self {
            api_key,
            model: settings.model_for(provider),
            endpoint: format!("{}/v1/chat/completions", settings.base_url_for(provider)),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout_seconds: settings.timeout_seconds,
            client: http_client(settings.timeout_seconds)?,
        })
    }

    fn build_request<'a>(&'a self, input: &'a str) -> ChatRequest<'a> {
        ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: input,
                },
            ],
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        }
    }
}

/// Extract the answer text from a chat completions body.
fn extract_text(body: &str) -> Result<String, ProviderError> {
    let response: ChatResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::malformed(format!("Failed to parse OpenAI response: {}", e)))?;

    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .ok_or_else(|| ProviderError::malformed("OpenAI response has no message content"))?;

    non_empty(&content)
}

#[async_trait]
impl AnalysisProvider for OpenAiProvider {
    async fn analyze(&self, input: &str) -> Result<String, ProviderError> {
        debug!("Sending {} chars to OpenAI model {}", input.len(), self.model);

        let request = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&self.build_request(input));

        let body = send_request(request, self.timeout_seconds).await?;
        extract_text(&body)
    }

    fn name(&self) -> ProviderName {
        ProviderName::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn provider() -> OpenAiProvider {
        OpenAiProvider::new("sk-test".to_string(), &ProviderSettings::default()).unwrap()
    }

    #[test]
    fn test_endpoint_and_model_defaults() {
        let provider = provider();
        assert_eq!(provider.endpoint, "https://api.openai.com/v1/chat/completions");
        assert_eq!(provider.model(), "gpt-4o-mini");
    }

    #[test]
    fn test_request_shape() {
        let provider = provider();
        let json = serde_json::to_value(provider.build_request("analyze this")).unwrap();

        assert_eq!(json["model"], "gpt-4o-mini");
        assert_eq!(json["max_tokens"], 800);
        assert_eq!(json["messages"][0]["role"], "system");
        assert_eq!(json["messages"][1]["role"], "user");
        assert_eq!(json["messages"][1]["content"], "analyze this");
    }

    #[test]
    fn test_extract_text() {
        let body = r#"{"id":"chatcmpl-1","choices":[{"index":0,"message":{"role":"assistant","content":" {\"manipulative_design\": false} "}}]}"#;
        assert_eq!(extract_text(body).unwrap(), "{\"manipulative_design\": false}");
    }

    #[test]
    fn test_extract_text_malformed() {
        assert_eq!(
            extract_text(r#"{"choices":[]}"#).unwrap_err().code,
            "malformed_response"
        );
        assert_eq!(
            extract_text("<html>gateway</html>").unwrap_err().code,
            "malformed_response"
        );
        assert_eq!(
            extract_text(r#"{"choices":[{"message":{"content":null}}]}"#)
                .unwrap_err()
                .code,
            "malformed_response"
        );
    }
}
