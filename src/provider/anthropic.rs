//! Anthropic messages provider.

use super::{http_client, non_empty, send_request, AnalysisProvider};
use crate::analysis::prompt::SYSTEM_PROMPT;
use crate::config::ProviderSettings;
use crate::error::{ConfigError, ProviderError};
use crate::models::ProviderName;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// Provider backed by `POST /v1/messages`.
pub struct AnthropicProvider {
    api_key: String,
    model: String,
    endpoint: String,
    max_tokens: u32,
    temperature: f32,
    timeout_seconds: u64,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    block_type: String,
    #[serde(default)]
    text: Option<String>,
}

impl AnthropicProvider {
    pub fn new(api_key: String, settings: &ProviderSettings) -> Result<Self, ConfigError> {
        let provider = ProviderName::Claude;
        Ok(Self {
            api_key,
            model: settings.model_for(provider),
            endpoint: format!("{}/v1/messages", settings.base_url_for(provider)),
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout_seconds: settings.timeout_seconds,
            client: http_client(settings.timeout_seconds)?,
        })
    }

    fn build_request<'a>(&'a self, input: &'a str) -> MessagesRequest<'a> {
        MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
            system: SYSTEM_PROMPT,
            messages: vec![Message {
                role: "user",
                content: input,
            }],
        }
    }
}

/// Extract the first text block from a messages body.
fn extract_text(body: &str) -> Result<String, ProviderError> {
    let response: MessagesResponse = serde_json::from_str(body).map_err(|e| {
        ProviderError::malformed(format!("Failed to parse Anthropic response: {}", e))
    })?;

    let text = response
        .content
        .into_iter()
        .find(|block| block.block_type == "text")
        .and_then(|block| block.text)
        .ok_or_else(|| ProviderError::malformed("Anthropic response has no text block"))?;

    non_empty(&text)
}

#[async_trait]
impl AnalysisProvider for AnthropicProvider {
    async fn analyze(&self, input: &str) -> Result<String, ProviderError> {
        debug!("Sending {} chars to Anthropic model {}", input.len(), self.model);

        let request = self
            .client
            .post(&self.endpoint)
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&self.build_request(input));

        let body = send_request(request, self.timeout_seconds).await?;
        extract_text(&body)
    }

    fn name(&self) -> ProviderName {
        ProviderName::Claude
    }

    fn model(&self) -> &str {
        &self.model
    }
}
