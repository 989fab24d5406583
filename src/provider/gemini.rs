//! Google Gemini provider.

use super::{http_client, non_empty, send_request, AnalysisProvider};
use crate::analysis::prompt::SYSTEM_PROMPT;
use crate::config::ProviderSettings;
use crate::error::{ConfigError, ProviderError};
use crate::models::ProviderName;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Provider backed by `POST /v1beta/models/{model}:generateContent`.
pub struct GeminiProvider {
    api_key: String,
    model: String,
    endpoint: String,
    max_tokens: u32,
    temperature: f32,
    timeout_seconds: u64,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest<'a> {
    system_instruction: Content<'a>,
    contents: Vec<Content<'a>>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize)]
struct Content<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<&'a str>,
    parts: Vec<Part<'a>>,
}

#[derive(Debug, Serialize)]
struct Part<'a> {
    text: &'a str,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    #[serde(default)]
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    #[serde(default)]
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    #[serde(default)]
    block_reason: Option<String>,
}

impl GeminiProvider {
    pub fn new(api_key: String, settings: &ProviderSettings) -> Result<Self, ConfigError> {
        let provider = ProviderName::Gemini;
        let model = settings.model_for(provider);
        Ok(Self {
            api_key,
            endpoint: format!(
                "{}/v1beta/models/{}:generateContent",
                settings.base_url_for(provider),
                model
            ),
            model,
            max_tokens: settings.max_tokens,
            temperature: settings.temperature,
            timeout_seconds: settings.timeout_seconds,
            client: http_client(settings.timeout_seconds)?,
        })
    }

    fn build_request<'a>(&self, input: &'a str) -> GenerateRequest<'a> {
        GenerateRequest {
            system_instruction: Content {
                role: None,
                parts: vec![Part {
                    text: SYSTEM_PROMPT,
                }],
            },
            contents: vec![Content {
                role: Some("user"),
                parts: vec![Part { text: input }],
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_tokens,
            },
        }
    }
}

/// Join the text parts of the first candidate.
fn extract_text(body: &str) -> Result<String, ProviderError> {
    let response: GenerateResponse = serde_json::from_str(body)
        .map_err(|e| ProviderError::malformed(format!("Failed to parse Gemini response: {}", e)))?;

    if let Some(reason) = response.prompt_feedback.and_then(|f| f.block_reason) {
        return Err(ProviderError::malformed(format!(
            "Gemini blocked the prompt: {}",
            reason
        )));
    }

    let text: String = response
        .candidates
        .into_iter()
        .next()
        .and_then(|c| c.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|p| p.text)
                .collect::<Vec<_>>()
                .join("")
        })
        .ok_or_else(|| ProviderError::malformed("Gemini response has no candidates"))?;

    non_empty(&text)
}

#[async_trait]
impl AnalysisProvider for GeminiProvider {
    async fn analyze(&self, input: &str) -> Result<String, ProviderError> {
        debug!("Sending {} chars to Gemini model {}", input.len(), self.model);

        let request = self
            .client
            .post(&self.endpoint)
            .header("x-goog-api-key", &self.api_key)
            .json(&self.build_request(input));

        let body = send_request(request, self.timeout_seconds).await?;
        extract_text(&body)
    }

    fn name(&self) -> ProviderName {
        ProviderName::Gemini
    }

    fn model(&self) -> &str {
        &self.model
    }
}
