//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.darkbuster.toml` files, and reading provider credentials from the
//! environment.

use crate::error::ConfigError;
use crate::models::ProviderName;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up in the working directory.
pub const CONFIG_FILE_NAME: &str = ".darkbuster.toml";

/// Upper bound for pacing and backoff settings, in seconds.
pub const MAX_WAIT_SECONDS: f64 = 3600.0;

/// Seconds to a `Duration`. Negative and NaN give zero; values too large
/// for a `Duration` saturate.
pub fn duration_from_secs(secs: f64) -> Duration {
    Duration::try_from_secs_f64(secs.max(0.0)).unwrap_or(Duration::MAX)
}

fn valid_wait(secs: f64) -> bool {
    secs.is_finite() && (0.0..=MAX_WAIT_SECONDS).contains(&secs)
}

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// General settings.
    #[serde(default)]
    pub general: GeneralConfig,

    /// Orchestration settings.
    #[serde(default)]
    pub analysis: AnalysisConfig,

    /// Retry policy for provider calls.
    #[serde(default)]
    pub retry: RetryConfig,

    /// HTML fetcher settings.
    #[serde(default)]
    pub fetcher: FetcherConfig,

    /// Per-provider settings.
    #[serde(default)]
    pub providers: ProvidersConfig,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    /// Site list, one URL per line.
    #[serde(default = "default_sites_file")]
    pub sites_file: PathBuf,

    /// Directory receiving `results_<provider>.json`.
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,

    /// Enable verbose logging by default.
    #[serde(default)]
    pub verbose: bool,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            sites_file: default_sites_file(),
            output_dir: default_output_dir(),
            verbose: false,
        }
    }
}

fn default_sites_file() -> PathBuf {
    PathBuf::from("sites.txt")
}

fn default_output_dir() -> PathBuf {
    PathBuf::from(".")
}

/// Orchestration settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Fetch each site's HTML and send it to the provider.
    /// If false, only the URL is sent.
    #[serde(default = "default_true")]
    pub fetch_html: bool,

    /// Page text is truncated to this many characters before prompting.
    #[serde(default = "default_max_html_chars")]
    pub max_html_chars: usize,

    /// Pause between two site requests.
    #[serde(default = "default_pacing_seconds")]
    pub pacing_seconds: f64,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            fetch_html: true,
            max_html_chars: default_max_html_chars(),
            pacing_seconds: default_pacing_seconds(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_html_chars() -> usize {
    12_000
}

fn default_pacing_seconds() -> f64 {
    1.0
}

/// Retry settings for provider calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Attempts per site, including the first one.
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff before retry `n` is `initial_backoff_seconds * n`.
    #[serde(default = "default_initial_backoff")]
    pub initial_backoff_seconds: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            initial_backoff_seconds: default_initial_backoff(),
        }
    }
}

fn default_max_attempts() -> u32 {
    3
}

fn default_initial_backoff() -> f64 {
    3.0
}

/// HTML fetcher settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FetcherConfig {
    /// Page request timeout in seconds.
    #[serde(default = "default_fetch_timeout")]
    pub timeout_seconds: u64,

    /// User-Agent header sent with page requests.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for FetcherConfig {
    fn default() -> Self {
        Self {
            timeout_seconds: default_fetch_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_fetch_timeout() -> u64 {
    10
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/120.0.0.0 Safari/537.36".to_string()
}

/// Settings for every provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProvidersConfig {
    #[serde(default)]
    pub openai: ProviderSettings,

    #[serde(default)]
    pub claude: ProviderSettings,

    #[serde(default)]
    pub gemini: ProviderSettings,
}

impl ProvidersConfig {
    pub fn get(&self, provider: ProviderName) -> &ProviderSettings {
        match provider {
            ProviderName::OpenAi => &self.openai,
            ProviderName::Claude => &self.claude,
            ProviderName::Gemini => &self.gemini,
        }
    }

    pub fn get_mut(&mut self, provider: ProviderName) -> &mut ProviderSettings {
        match provider {
            ProviderName::OpenAi => &mut self.openai,
            ProviderName::Claude => &mut self.claude,
            ProviderName::Gemini => &mut self.gemini,
        }
    }
}

/// Settings for one provider. Unset model and URL fall back to the
/// provider's defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSettings {
    /// Model name.
    #[serde(default)]
    pub model: Option<String>,

    /// API base URL, without a trailing path.
    #[serde(default)]
    pub base_url: Option<String>,

    /// Maximum tokens in the response.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: u32,

    /// Temperature for generation.
    #[serde(default)]
    pub temperature: f32,

    /// Request timeout in seconds.
    #[serde(default = "default_provider_timeout")]
    pub timeout_seconds: u64,
}

impl Default for ProviderSettings {
    fn default() -> Self {
        Self {
            model: None,
            base_url: None,
            max_tokens: default_max_tokens(),
            temperature: 0.0,
            timeout_seconds: default_provider_timeout(),
        }
    }
}

fn default_max_tokens() -> u32 {
    800
}

fn default_provider_timeout() -> u64 {
    60
}

impl ProviderSettings {
    /// Effective model name for `provider`.
    pub fn model_for(&self, provider: ProviderName) -> String {
        self.model
            .clone()
            .unwrap_or_else(|| default_model(provider).to_string())
    }

    /// Effective base URL for `provider`, without a trailing slash.
    pub fn base_url_for(&self, provider: ProviderName) -> String {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| default_base_url(provider))
            .trim_end_matches('/')
            .to_string()
    }
}

/// Model used when none is configured.
pub fn default_model(provider: ProviderName) -> &'static str {
    match provider {
        ProviderName::OpenAi => "gpt-4o-mini",
        ProviderName::Claude => "claude-3-5-sonnet-20241022",
        ProviderName::Gemini => "gemini-2.5-flash",
    }
}

/// API base URL used when none is configured.
pub fn default_base_url(provider: ProviderName) -> &'static str {
    match provider {
        ProviderName::OpenAi => "https://api.openai.com",
        ProviderName::Claude => "https://api.anthropic.com",
        ProviderName::Gemini => "https://generativelanguage.googleapis.com",
    }
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(CONFIG_FILE_NAME);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// CLI arguments take precedence over config file settings.
    /// This method only overrides config when CLI provides explicit values.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref sites) = args.sites {
            self.general.sites_file = sites.clone();
        }
        if let Some(ref output_dir) = args.output_dir {
            self.general.output_dir = output_dir.clone();
        }

        if args.no_fetch {
            self.analysis.fetch_html = false;
        }
        if let Some(max_chars) = args.max_html_chars {
            self.analysis.max_html_chars = max_chars;
        }
        if let Some(delay) = args.delay {
            self.analysis.pacing_seconds = delay;
        }

        if let Some(attempts) = args.max_attempts {
            self.retry.max_attempts = attempts;
        }
        if let Some(backoff) = args.backoff {
            self.retry.initial_backoff_seconds = backoff;
        }

        // --model only makes sense for a single provider
        if let (Some(ref model), Some(provider)) = (&args.model, args.provider.selected()) {
            self.providers.get_mut(provider).model = Some(model.clone());
        }

        if args.verbose {
            self.general.verbose = true;
        }
    }

    /// Check values that would make a run meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::Invalid(
                "retry.max_attempts must be at least 1".to_string(),
            ));
        }
        if !valid_wait(self.retry.initial_backoff_seconds) {
            return Err(ConfigError::Invalid(format!(
                "retry.initial_backoff_seconds must be between 0 and {}",
                MAX_WAIT_SECONDS
            )));
        }
        if !valid_wait(self.analysis.pacing_seconds) {
            return Err(ConfigError::Invalid(format!(
                "analysis.pacing_seconds must be between 0 and {}",
                MAX_WAIT_SECONDS
            )));
        }
        if self.analysis.max_html_chars == 0 {
            return Err(ConfigError::Invalid(
                "analysis.max_html_chars must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Pause between two site requests.
    pub fn pacing(&self) -> Duration {
        duration_from_secs(self.analysis.pacing_seconds)
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}

/// Provider API keys, read once at startup.
#[derive(Debug, Clone, Default)]
pub struct Credentials {
    pub openai: Option<String>,
    pub anthropic: Option<String>,
    pub google: Option<String>,
}

impl Credentials {
    /// Read `OPENAI_API_KEY`, `ANTHROPIC_API_KEY` and `GOOGLE_API_KEY`.
    /// Blank values count as absent.
    pub fn from_env() -> Self {
        let read = |provider: ProviderName| {
            std::env::var(provider.env_var())
                .ok()
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        Self {
            openai: read(ProviderName::OpenAi),
            anthropic: read(ProviderName::Claude),
            google: read(ProviderName::Gemini),
        }
    }

    pub fn get(&self, provider: ProviderName) -> Option<&str> {
        match provider {
            ProviderName::OpenAi => self.openai.as_deref(),
            ProviderName::Claude => self.anthropic.as_deref(),
            ProviderName::Gemini => self.google.as_deref(),
        }
    }

    /// Providers with a credential, in run order.
    pub fn available(&self) -> Vec<ProviderName> {
        ProviderName::ALL
            .into_iter()
            .filter(|p| self.get(*p).is_some())
            .collect()
    }

    /// Fails when no provider can be used at all.
    pub fn ensure_any(&self) -> Result<(), ConfigError> {
        if self.available().is_empty() {
            Err(ConfigError::NoCredentials)
        } else {
            Ok(())
        }
    }

    /// The credential for `provider`, or the error naming its variable.
    pub fn require(&self, provider: ProviderName) -> Result<&str, ConfigError> {
        self.get(provider).ok_or(ConfigError::MissingCredential {
            provider,
            env_var: provider.env_var(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.general.sites_file, PathBuf::from("sites.txt"));
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.retry.initial_backoff_seconds, 3.0);
        assert_eq!(config.analysis.max_html_chars, 12_000);
        assert!(config.analysis.fetch_html);
        assert_eq!(config.pacing(), Duration::from_secs(1));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_parse_config() {
        let toml_content = r#"
[general]
sites_file = "data/sites.txt"
verbose = true

[analysis]
fetch_html = false
pacing_seconds = 0.5

[retry]
max_attempts = 5

[providers.claude]
model = "claude-3-5-haiku-latest"
max_tokens = 500
"#;

        let config: Config = toml::from_str(toml_content).unwrap();
        assert_eq!(config.general.sites_file, PathBuf::from("data/sites.txt"));
        assert!(config.general.verbose);
        assert!(!config.analysis.fetch_html);
        assert_eq!(config.analysis.max_html_chars, 12_000);
        assert_eq!(config.retry.max_attempts, 5);
        assert_eq!(config.retry.initial_backoff_seconds, 3.0);
        assert_eq!(
            config.providers.claude.model_for(ProviderName::Claude),
            "claude-3-5-haiku-latest"
        );
        assert_eq!(config.providers.claude.max_tokens, 500);
        assert_eq!(
            config.providers.openai.model_for(ProviderName::OpenAi),
            "gpt-4o-mini"
        );
    }

    #[test]
    fn test_default_toml_generation() {
        let toml_str = Config::default_toml();
        assert!(toml_str.contains("[general]"));
        assert!(toml_str.contains("[analysis]"));
        assert!(toml_str.contains("[retry]"));

        let reparsed: Config = toml::from_str(&toml_str).unwrap();
        assert_eq!(reparsed.retry.max_attempts, 3);
    }

    #[test]
    fn test_base_url_trailing_slash_trimmed() {
        let settings = ProviderSettings {
            base_url: Some("http://localhost:8080/".to_string()),
            ..ProviderSettings::default()
        };
        assert_eq!(
            settings.base_url_for(ProviderName::OpenAi),
            "http://localhost:8080"
        );
        assert_eq!(
            ProviderSettings::default().base_url_for(ProviderName::Gemini),
            "https://generativelanguage.googleapis.com"
        );
    }

    #[test]
    fn test_validate_rejects_zero_attempts() {
        let mut config = Config::default();
        config.retry.max_attempts = 0;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.analysis.pacing_seconds = -1.0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_validate_rejects_oversized_waits() {
        let mut config = Config::default();
        config.analysis.pacing_seconds = 1e300;
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let mut config = Config::default();
        config.retry.initial_backoff_seconds = MAX_WAIT_SECONDS + 1.0;
        assert!(config.validate().is_err());

        config.retry.initial_backoff_seconds = MAX_WAIT_SECONDS;
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_duration_from_secs_never_panics() {
        assert_eq!(duration_from_secs(1.5), Duration::from_millis(1500));
        assert_eq!(duration_from_secs(-2.0), Duration::ZERO);
        assert_eq!(duration_from_secs(f64::NAN), Duration::ZERO);
        assert_eq!(duration_from_secs(1e300), Duration::MAX);
    }

    #[test]
    fn test_credentials_availability() {
        let none = Credentials::default();
        assert!(matches!(none.ensure_any(), Err(ConfigError::NoCredentials)));
        assert!(none.available().is_empty());

        let some = Credentials {
            openai: None,
            anthropic: Some("sk-ant".to_string()),
            google: Some("AIza".to_string()),
        };
        assert!(some.ensure_any().is_ok());
        assert_eq!(
            some.available(),
            vec![ProviderName::Claude, ProviderName::Gemini]
        );
        assert!(matches!(
            some.require(ProviderName::OpenAi),
            Err(ConfigError::MissingCredential {
                env_var: "OPENAI_API_KEY",
                ..
            })
        ));
        assert_eq!(some.require(ProviderName::Gemini).unwrap(), "AIza");
    }
}
