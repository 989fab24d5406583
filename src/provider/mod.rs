//! Generative-AI providers.
//!
//! Every backend is wrapped behind [`AnalysisProvider`]: input text in,
//! analysis text out, or a [`ProviderError`] carrying only a code and a
//! message. The provider for a pass is picked once, by [`build_provider`].

pub mod anthropic;
pub mod gemini;
pub mod openai;
#[cfg(test)]
pub mod scripted;

pub use anthropic::AnthropicProvider;
pub use gemini::GeminiProvider;
pub use openai::OpenAiProvider;

use crate::config::{Credentials, ProviderSettings};
use crate::error::{ConfigError, ProviderError};
use crate::models::ProviderName;
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;

/// A backend able to analyze a piece of text.
#[async_trait]
pub trait AnalysisProvider: Send + Sync {
    /// Send `input` to the backend and return its text answer.
    async fn analyze(&self, input: &str) -> Result<String, ProviderError>;

    /// Which backend this is.
    fn name(&self) -> ProviderName;

    /// Model the requests are sent to.
    fn model(&self) -> &str;
}

/// Build the provider for `provider`.
///
/// Fails with [`ConfigError::MissingCredential`] when its API key is not set.
/// No network call is made here.
pub fn build_provider(
    provider: ProviderName,
    settings: &ProviderSettings,
    credentials: &Credentials,
) -> Result<Arc<dyn AnalysisProvider>, ConfigError> {
    let api_key = credentials.require(provider)?.to_string();

    let built: Arc<dyn AnalysisProvider> = match provider {
        ProviderName::OpenAi => Arc::new(OpenAiProvider::new(api_key, settings)?),
        ProviderName::Claude => Arc::new(AnthropicProvider::new(api_key, settings)?),
        ProviderName::Gemini => Arc::new(GeminiProvider::new(api_key, settings)?),
    };

    Ok(built)
}

/// HTTP client shared by the provider constructors.
pub(crate) fn http_client(timeout_seconds: u64) -> Result<reqwest::Client, ConfigError> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(timeout_seconds))
        .build()
        .map_err(|e| ConfigError::HttpClient(e.to_string()))
}

/// Send a prepared request and return the body of a successful response.
///
/// Non-2xx responses become a [`ProviderError`] whose code is the numeric
/// status, so rate limits surface as `"429"`.
pub(crate) async fn send_request(
    request: reqwest::RequestBuilder,
    timeout_seconds: u64,
) -> Result<String, ProviderError> {
    let response = request
        .send()
        .await
        .map_err(|e| ProviderError::from_transport(e, timeout_seconds))?;

    let status = response.status();
    let body = response
        .text()
        .await
        .map_err(|e| ProviderError::from_transport(e, timeout_seconds))?;

    if !status.is_success() {
        return Err(ProviderError::new(
            status.as_u16().to_string(),
            format!("HTTP {}: {}", status, error_message(&body)),
        ));
    }

    Ok(body)
}

/// Pull `error.message` out of an error body, falling back to the body itself.
fn error_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        if let Some(message) = json["error"]["message"].as_str() {
            return message.to_string();
        }
    }

    let trimmed = body.trim();
    if trimmed.chars().count() > 500 {
        let head: String = trimmed.chars().take(500).collect();
        format!("{}...", head)
    } else {
        trimmed.to_string()
    }
}

/// Fail on blank answers; trim the rest.
pub(crate) fn non_empty(text: &str) -> Result<String, ProviderError> {
    let text = text.trim();
    if text.is_empty() {
        Err(ProviderError::malformed("Provider returned an empty answer"))
    } else {
        Ok(text.to_string())
    }
}
