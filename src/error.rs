//! Error types.
//!
//! Only [`ConfigError`] is fatal. The other errors are caught per site and
//! folded into that site's verdict.

use crate::models::ProviderName;
use std::path::PathBuf;
use thiserror::Error;

/// Fatal startup conditions. Raised before any site is analyzed.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Site list not found: {}", .0.display())]
    SitesFileNotFound(PathBuf),

    #[error("Failed to read site list {}: {source}", path.display())]
    SitesFileUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Site list {} contains no sites", .0.display())]
    EmptySiteList(PathBuf),

    #[error("No API key found. Set at least one of OPENAI_API_KEY, ANTHROPIC_API_KEY or GOOGLE_API_KEY")]
    NoCredentials,

    #[error("API key not configured for {provider}. Set {env_var}")]
    MissingCredential {
        provider: ProviderName,
        env_var: &'static str,
    },

    #[error("Failed to create HTTP client: {0}")]
    HttpClient(String),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// A failed provider call.
///
/// `code` is the HTTP status for HTTP failures (`"429"`), or one of
/// `timeout`, `connect`, `transport`, `malformed_response`.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{code}: {message}")]
pub struct ProviderError {
    pub code: String,
    pub message: String,
}

impl ProviderError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }

    /// The response body was not in the shape the backend documents.
    pub fn malformed(message: impl Into<String>) -> Self {
        Self::new("malformed_response", message)
    }

    /// Map a reqwest transport failure. The request URL is stripped.
    pub fn from_transport(e: reqwest::Error, timeout_seconds: u64) -> Self {
        let e = e.without_url();
        if e.is_timeout() {
            Self::new("timeout", format!("Request timed out after {}s", timeout_seconds))
        } else if e.is_connect() {
            Self::new("connect", format!("Connection failed: {}", e))
        } else {
            Self::new("transport", format!("Failed to send request: {}", e))
        }
    }
}

/// Provider output that is not a structured verdict.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    #[error("Empty provider response")]
    Empty,

    #[error("No JSON object in provider response")]
    NoJsonObject,

    #[error("Invalid verdict JSON: {0}")]
    InvalidJson(String),
}

/// HTML retrieval failure for one site.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchError {
    #[error("Request to {url} timed out after {timeout_seconds}s")]
    Timeout { url: String, timeout_seconds: u64 },

    #[error("{url} returned HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Failed to fetch {url}: {message}")]
    Transport { url: String, message: String },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_error_display() {
        let err = ProviderError::new("429", "Rate limit reached for gpt-4o-mini");
        assert_eq!(err.to_string(), "429: Rate limit reached for gpt-4o-mini");
    }

    #[test]
    fn test_missing_credential_names_env_var() {
        let err = ConfigError::MissingCredential {
            provider: ProviderName::Gemini,
            env_var: ProviderName::Gemini.env_var(),
        };
        assert!(err.to_string().contains("GOOGLE_API_KEY"));
        assert!(err.to_string().contains("gemini"));
    }
}
