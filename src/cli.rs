//! Command-line interface argument parsing.
//!
//! This module handles all CLI argument parsing using clap,
//! including validation and default values.

use crate::config::MAX_WAIT_SECONDS;
use crate::models::ProviderName;
use clap::Parser;
use std::path::PathBuf;

/// DarkBuster - LLM-powered dark pattern detector
///
/// Fetches each site in a list, asks a generative-AI provider whether the
/// page uses manipulative design, and writes a JSON report per provider.
///
/// Examples:
///   darkbuster --sites sites.txt
///   darkbuster --sites sites.txt --provider claude --delay 2
///   darkbuster --sites sites.txt --provider openai --no-fetch --markdown
///   darkbuster --replay results_openai.json
///   darkbuster --init-config
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Args {
    /// Site list to analyze, one URL per line
    ///
    /// Defaults to sites.txt or the path set in .darkbuster.toml.
    #[arg(short, long, value_name = "FILE", env = "DARKBUSTER_SITES")]
    pub sites: Option<PathBuf>,

    /// Provider to use
    ///
    /// "all" runs one pass per provider that has an API key.
    #[arg(short, long, default_value = "all", value_name = "PROVIDER")]
    pub provider: ProviderChoice,

    /// Model override for the selected provider
    ///
    /// Only valid together with a single --provider.
    #[arg(short, long, value_name = "MODEL")]
    pub model: Option<String>,

    /// Directory for the results_<provider>.json reports
    #[arg(short, long, value_name = "DIR")]
    pub output_dir: Option<PathBuf>,

    /// Path to configuration file
    ///
    /// If not specified, looks for .darkbuster.toml in the current directory
    #[arg(short, long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Enable verbose logging output
    #[arg(short, long)]
    pub verbose: bool,

    /// Run in quiet mode (minimal output)
    #[arg(short, long)]
    pub quiet: bool,

    /// Send only the URL to the provider instead of the page HTML
    #[arg(long)]
    pub no_fetch: bool,

    /// Truncate page HTML to this many characters before prompting
    #[arg(long, value_name = "CHARS")]
    pub max_html_chars: Option<usize>,

    /// Seconds to wait between two site requests
    #[arg(long, value_name = "SECS")]
    pub delay: Option<f64>,

    /// Attempts per site for transient provider errors
    #[arg(long, value_name = "COUNT")]
    pub max_attempts: Option<u32>,

    /// Initial backoff in seconds; retry n waits backoff * n
    #[arg(long, value_name = "SECS")]
    pub backoff: Option<f64>,

    /// Also write a Markdown report next to each JSON report
    #[arg(long)]
    pub markdown: bool,

    /// Do not print the summary charts
    #[arg(long)]
    pub no_charts: bool,

    /// Exit with code 2 if any site is judged manipulative
    ///
    /// Useful for CI pipelines.
    #[arg(long)]
    pub fail_on_detection: bool,

    /// Re-summarize an existing JSON report without calling any provider
    #[arg(long, value_name = "REPORT", conflicts_with_all = ["dry_run", "init_config"])]
    pub replay: Option<PathBuf>,

    /// Dry run: load the site list and show the planned passes without
    /// calling any provider
    #[arg(long)]
    pub dry_run: bool,

    /// Generate a default .darkbuster.toml configuration file
    #[arg(long)]
    pub init_config: bool,
}

/// Provider selection on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, clap::ValueEnum)]
pub enum ProviderChoice {
    /// Every provider with an API key, one after another
    #[default]
    All,
    Openai,
    Claude,
    Gemini,
}

impl ProviderChoice {
    /// The single provider selected, or `None` for `all`.
    pub fn selected(&self) -> Option<ProviderName> {
        match self {
            ProviderChoice::All => None,
            ProviderChoice::Openai => Some(ProviderName::OpenAi),
            ProviderChoice::Claude => Some(ProviderName::Claude),
            ProviderChoice::Gemini => Some(ProviderName::Gemini),
        }
    }
}

impl Args {
    /// Parse command-line arguments.
    pub fn parse_args() -> Self {
        Self::parse()
    }

    /// Validate the parsed arguments.
    pub fn validate(&self) -> Result<(), String> {
        // Skip validation for --init-config
        if self.init_config {
            return Ok(());
        }

        if self.verbose && self.quiet {
            return Err("Cannot use both --verbose and --quiet".to_string());
        }

        if self.model.is_some() && self.provider == ProviderChoice::All {
            return Err("--model requires a single --provider".to_string());
        }

        if let Some(delay) = self.delay {
            if !delay.is_finite() || !(0.0..=MAX_WAIT_SECONDS).contains(&delay) {
                return Err(format!(
                    "Delay must be between 0 and {} seconds",
                    MAX_WAIT_SECONDS
                ));
            }
        }

        if let Some(backoff) = self.backoff {
            if !backoff.is_finite() || !(0.0..=MAX_WAIT_SECONDS).contains(&backoff) {
                return Err(format!(
                    "Backoff must be between 0 and {} seconds",
                    MAX_WAIT_SECONDS
                ));
            }
        }

        if self.max_attempts == Some(0) {
            return Err("Max attempts must be at least 1".to_string());
        }

        if self.max_html_chars == Some(0) {
            return Err("Max HTML chars must be at least 1".to_string());
        }

        if let Some(ref report) = self.replay {
            if !report.is_file() {
                return Err(format!("Report file does not exist: {}", report.display()));
            }
        }

        Ok(())
    }

    /// Returns the log level based on verbosity settings.
    ///
    /// `config_verbose` is `general.verbose` from the config file. `--quiet`
    /// wins over both.
    pub fn log_level(&self, config_verbose: bool) -> tracing::Level {
        if self.quiet {
            tracing::Level::ERROR
        } else if self.verbose || config_verbose {
            tracing::Level::DEBUG
        } else {
            tracing::Level::INFO
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn make_args() -> Args {
        Args {
            sites: Some(PathBuf::from("sites.txt")),
            provider: ProviderChoice::All,
            model: None,
            output_dir: None,
            config: None,
            verbose: false,
            quiet: false,
            no_fetch: false,
            max_html_chars: None,
            delay: None,
            max_attempts: None,
            backoff: None,
            markdown: false,
            no_charts: false,
            fail_on_detection: false,
            replay: None,
            dry_run: false,
            init_config: false,
        }
    }

    #[test]
    fn test_parse_from_command_line() {
        let args = Args::try_parse_from([
            "darkbuster",
            "--sites",
            "list.txt",
            "--provider",
            "claude",
            "--delay",
            "0.5",
        ])
        .unwrap();
        assert_eq!(args.sites, Some(PathBuf::from("list.txt")));
        assert_eq!(args.provider.selected(), Some(ProviderName::Claude));
        assert_eq!(args.delay, Some(0.5));
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_default_provider_is_all() {
        let args = Args::try_parse_from(["darkbuster"]).unwrap();
        assert_eq!(args.provider, ProviderChoice::All);
        assert_eq!(args.provider.selected(), None);
    }

    #[test]
    fn test_validation_model_needs_single_provider() {
        let mut args = make_args();
        args.model = Some("gpt-4.1-mini".to_string());
        assert!(args.validate().is_err());

        args.provider = ProviderChoice::Openai;
        assert!(args.validate().is_ok());
    }

    #[test]
    fn test_validation_conflicting_options() {
        let mut args = make_args();
        args.verbose = true;
        args.quiet = true;
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_validation_ranges() {
        let mut args = make_args();
        args.delay = Some(-1.0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.max_attempts = Some(0);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.backoff = Some(f64::NAN);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.delay = Some(1e300);
        assert!(args.validate().is_err());

        let mut args = make_args();
        args.backoff = Some(MAX_WAIT_SECONDS + 0.5);
        assert!(args.validate().is_err());
    }

    #[test]
    fn test_log_level() {
        let mut args = make_args();
        assert_eq!(args.log_level(false), tracing::Level::INFO);

        args.verbose = true;
        assert_eq!(args.log_level(false), tracing::Level::DEBUG);

        args.verbose = false;
        args.quiet = true;
        assert_eq!(args.log_level(false), tracing::Level::ERROR);
    }

    #[test]
    fn test_log_level_from_config_file() {
        let mut args = make_args();
        assert_eq!(args.log_level(true), tracing::Level::DEBUG);

        args.quiet = true;
        assert_eq!(args.log_level(true), tracing::Level::ERROR);
    }
}
