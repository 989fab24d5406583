//! Data models for the dark pattern detector.
//!
//! This module contains the core data structures used throughout
//! the application for representing sites, verdicts, and reports.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

/// A site to analyze. Identity is the literal string from the site list.
pub type Site = String;

/// Generative-AI backend used for an analysis pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderName {
    /// OpenAI chat completions API
    OpenAi,
    /// Anthropic messages API
    Claude,
    /// Google Gemini generateContent API
    Gemini,
}

impl ProviderName {
    /// All providers, in the order multi-provider runs visit them.
    pub const ALL: [ProviderName; 3] = [ProviderName::OpenAi, ProviderName::Claude, ProviderName::Gemini];

    /// Lowercase tag used in file names and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderName::OpenAi => "openai",
            ProviderName::Claude => "claude",
            ProviderName::Gemini => "gemini",
        }
    }

    /// Environment variable holding this provider's credential.
    pub fn env_var(&self) -> &'static str {
        match self {
            ProviderName::OpenAi => "OPENAI_API_KEY",
            ProviderName::Claude => "ANTHROPIC_API_KEY",
            ProviderName::Gemini => "GOOGLE_API_KEY",
        }
    }
}

impl fmt::Display for ProviderName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// How sure the provider was about its verdict.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConfidenceLevel {
    High,
    Medium,
    Low,
}

impl ConfidenceLevel {
    /// Parse a confidence label as written by a provider.
    ///
    /// Accepts the English labels and the Portuguese ones the analysis
    /// prompt historically asked for (`alta`, `média`, `baixa` and their
    /// masculine forms). Returns `None` for anything else.
    pub fn parse(label: &str) -> Option<Self> {
        match label.trim().to_lowercase().as_str() {
            "high" | "alta" | "alto" => Some(ConfidenceLevel::High),
            "medium" | "média" | "media" | "médio" | "medio" => Some(ConfidenceLevel::Medium),
            "low" | "baixa" | "baixo" => Some(ConfidenceLevel::Low),
            _ => None,
        }
    }

    /// Returns an emoji representation of the level.
    pub fn emoji(&self) -> &'static str {
        match self {
            ConfidenceLevel::High => "🟢",
            ConfidenceLevel::Medium => "🟡",
            ConfidenceLevel::Low => "🟠",
        }
    }
}

impl fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfidenceLevel::High => write!(f, "high"),
            ConfidenceLevel::Medium => write!(f, "medium"),
            ConfidenceLevel::Low => write!(f, "low"),
        }
    }
}

/// A manipulative design pattern reported for a site.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DetectedPattern {
    /// Pattern name, e.g. "Confirmshaming".
    pub name: String,
    /// Short explanation of where the pattern shows up.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl DetectedPattern {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
        }
    }
}

/// The normalized outcome of analyzing one site.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Verdict {
    /// The site as written in the site list.
    pub site: Site,
    /// Whether the provider judged the site manipulative.
    pub manipulative: bool,
    /// Patterns found, in provider order. Empty unless `manipulative`.
    #[serde(default)]
    pub patterns: Vec<DetectedPattern>,
    /// Resolved confidence level, if the provider gave a recognizable one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub confidence_level: Option<ConfidenceLevel>,
    /// Provider output that could not be parsed as a structured verdict.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub raw_provider_text: Option<String>,
    /// Why the site could not be analyzed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Verdict {
    /// A verdict parsed from structured provider output.
    ///
    /// Patterns are dropped when the site is not manipulative.
    pub fn resolved(
        site: Site,
        manipulative: bool,
        patterns: Vec<DetectedPattern>,
        confidence_level: Option<ConfidenceLevel>,
    ) -> Self {
        Self {
            site,
            manipulative,
            patterns: if manipulative { patterns } else { Vec::new() },
            confidence_level,
            raw_provider_text: None,
            error: None,
        }
    }

    /// A verdict for provider output that was not valid structured JSON.
    pub fn unparsed(site: Site, raw_text: String) -> Self {
        Self {
            site,
            manipulative: false,
            patterns: Vec::new(),
            confidence_level: None,
            raw_provider_text: Some(raw_text),
            error: None,
        }
    }

    /// A verdict for a site that could not be analyzed at all.
    pub fn failed(site: Site, error: impl Into<String>) -> Self {
        Self {
            site,
            manipulative: false,
            patterns: Vec::new(),
            confidence_level: None,
            raw_provider_text: None,
            error: Some(error.into()),
        }
    }

    pub fn is_failed(&self) -> bool {
        self.error.is_some()
    }

    /// True when the provider answered but the answer could not be read.
    pub fn is_unresolved(&self) -> bool {
        self.error.is_none() && self.raw_provider_text.is_some()
    }
}

/// Summary statistics for one analysis pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunSummary {
    /// Number of sites attempted.
    pub total: usize,
    /// Sites judged manipulative.
    pub manipulative_count: usize,
    /// Always `total - manipulative_count`.
    pub non_manipulative_count: usize,
    /// Sites whose analysis failed outright.
    pub failed_count: usize,
    /// Sites whose provider output could not be parsed.
    pub unresolved_count: usize,
    /// Occurrences of each pattern name across manipulative sites.
    pub pattern_frequency: BTreeMap<String, usize>,
    /// Resolved confidence levels.
    pub confidence_distribution: BTreeMap<ConfidenceLevel, usize>,
}

/// Metadata about a persisted report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReportMetadata {
    /// Provider used for the pass.
    pub provider: ProviderName,
    /// Model name sent to the provider.
    pub model: String,
    /// When the report was generated.
    pub generated_at: DateTime<Utc>,
    /// Wall-clock duration of the pass in seconds.
    pub duration_seconds: f64,
    /// Whether page HTML was fetched and sent to the provider.
    pub html_fetched: bool,
}

/// The persisted form of one pass: per-site detail plus its summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub metadata: ReportMetadata,
    pub summary: RunSummary,
    pub verdicts: Vec<Verdict>,
}
