//! Page HTML retrieval.
//!
//! Failures never escape as panics; callers get a [`FetchError`] and decide
//! what to record for the site.

use crate::config::FetcherConfig;
use crate::error::{ConfigError, FetchError};
use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;

/// Something that can return the text of a web page.
#[async_trait]
pub trait PageFetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> Result<String, FetchError>;
}

/// Fetches pages over HTTP with a browser-like User-Agent.
pub struct HttpFetcher {
    client: reqwest::Client,
    timeout_seconds: u64,
}

impl HttpFetcher {
    pub fn new(config: &FetcherConfig) -> Result<Self, ConfigError> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .user_agent(config.user_agent.as_str())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(Self {
            client,
            timeout_seconds: config.timeout_seconds,
        })
    }
}

#[async_trait]
impl PageFetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> Result<String, FetchError> {
        let target = normalize_url(url);
        debug!("Fetching {}", target);

        let transport = |e: reqwest::Error| {
            if e.is_timeout() {
                FetchError::Timeout {
                    url: target.clone(),
                    timeout_seconds: self.timeout_seconds,
                }
            } else {
                FetchError::Transport {
                    url: target.clone(),
                    message: e.to_string(),
                }
            }
        };

        let response = self.client.get(&target).send().await.map_err(transport)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                url: target.clone(),
                status: status.as_u16(),
            });
        }

        let html = response.text().await.map_err(transport)?;
        debug!("Fetched {} chars from {}", html.chars().count(), target);
        Ok(html)
    }
}

/// Prefix `https://` when the site list entry has no scheme.
pub fn normalize_url(url: &str) -> String {
    let url = url.trim();
    if url.contains("://") {
        url.to_string()
    } else {
        format!("https://{}", url)
    }
}

/// Keep at most `max_chars` characters of `text`.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((byte_index, _)) => &text[..byte_index],
        None => text,
    }
}
