//! Sequential analysis of a site list with one provider.
//!
//! Sites are handled strictly one after another, in input order, with a
//! pause between requests so per-minute request and token quotas are not
//! exceeded. Every site yields exactly one verdict; nothing a single site
//! does can abort the pass.

use crate::analysis::parser::to_verdict;
use crate::analysis::prompt::build_input;
use crate::config::{Config, Credentials};
use crate::error::ConfigError;
use crate::models::{ProviderName, Site, Verdict};
use crate::provider::{build_provider, AnalysisProvider};
use crate::retry::{RetryExecutor, RetryPolicy};
use crate::sites::fetcher::truncate_chars;
use crate::sites::{HttpFetcher, PageFetcher};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Knobs for one pass.
#[derive(Debug, Clone)]
pub struct OrchestratorSettings {
    /// Page text is cut to this many characters before prompting.
    pub max_html_chars: usize,
    /// Pause between two site requests.
    pub pacing: Duration,
    /// Draw a progress bar and per-site lines.
    pub show_progress: bool,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_html_chars: 12_000,
            pacing: Duration::from_secs(1),
            show_progress: true,
        }
    }
}

impl From<&Config> for OrchestratorSettings {
    fn from(config: &Config) -> Self {
        Self {
            max_html_chars: config.analysis.max_html_chars,
            pacing: config.pacing(),
            show_progress: true,
        }
    }
}

/// Runs one provider over a site list.
pub struct AnalysisOrchestrator {
    provider: Arc<dyn AnalysisProvider>,
    retry: RetryExecutor,
    /// `None` sends only the URL to the provider.
    fetcher: Option<Arc<dyn PageFetcher>>,
    settings: OrchestratorSettings,
}

impl AnalysisOrchestrator {
    pub fn new(
        provider: Arc<dyn AnalysisProvider>,
        retry: RetryExecutor,
        fetcher: Option<Arc<dyn PageFetcher>>,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            provider,
            retry,
            fetcher,
            settings,
        }
    }

    /// Build the orchestrator for `provider` from configuration.
    ///
    /// Fails before any network activity when no credential is configured
    /// at all, when `provider` has none, or when the configuration is invalid.
    pub fn from_config(
        provider: ProviderName,
        config: &Config,
        credentials: &Credentials,
    ) -> Result<Self, ConfigError> {
        credentials.ensure_any()?;
        config.validate()?;

        let analysis_provider = build_provider(provider, config.providers.get(provider), credentials)?;

        let fetcher: Option<Arc<dyn PageFetcher>> = if config.analysis.fetch_html {
            Some(Arc::new(HttpFetcher::new(&config.fetcher)?))
        } else {
            None
        };

        info!(
            "Initialized {} orchestrator (model {}, fetch HTML: {})",
            provider,
            analysis_provider.model(),
            fetcher.is_some()
        );

        Ok(Self::new(
            analysis_provider,
            RetryExecutor::new(RetryPolicy::from(&config.retry)),
            fetcher,
            OrchestratorSettings::from(config),
        ))
    }

    /// Hide the progress bar and per-site lines.
    pub fn quiet(mut self, quiet: bool) -> Self {
        self.settings.show_progress = !quiet;
        self
    }

    pub fn provider(&self) -> &dyn AnalysisProvider {
        self.provider.as_ref()
    }

    pub fn fetches_html(&self) -> bool {
        self.fetcher.is_some()
    }

    /// Analyze every site, in order. Returns one verdict per site.
    pub async fn run(&self, sites: &[Site]) -> Vec<Verdict> {
        let total = sites.len();
        info!(
            "🔍 Starting analysis of {} sites with {}",
            total,
            self.provider.name()
        );

        let progress = self.progress_bar(total);
        let mut verdicts = Vec::with_capacity(total);

        for (index, site) in sites.iter().enumerate() {
            if index > 0 && !self.settings.pacing.is_zero() {
                debug!("Pacing {:?} before next site", self.settings.pacing);
                tokio::time::sleep(self.settings.pacing).await;
            }

            self.say(
                &progress,
                format!("➡️  [{}/{}] Analyzing: {}", index + 1, total, site),
            );

            let verdict = self.analyze_site(site).await;

            if let Some(ref error) = verdict.error {
                self.say(&progress, format!("   ❌ {}: {}", site, error));
            } else if verdict.is_unresolved() {
                self.say(
                    &progress,
                    format!("   ⚠️  {}: response kept as raw text", site),
                );
            }

            verdicts.push(verdict);
            progress.inc(1);
        }

        progress.finish_and_clear();
        verdicts
    }

    /// Produce the verdict for one site. Never fails.
    async fn analyze_site(&self, site: &Site) -> Verdict {
        let page = match self.fetcher {
            Some(ref fetcher) => match fetcher.fetch(site).await {
                Ok(html) => Some(html),
                Err(e) => {
                    warn!("Skipping analysis of {}: {}", site, e);
                    return Verdict::failed(site.clone(), format!("HTML not retrieved: {}", e));
                }
            },
            None => None,
        };

        let page_text = page
            .as_deref()
            .map(|html| truncate_chars(html, self.settings.max_html_chars));
        let input = build_input(site, page_text);

        let provider = self.provider.as_ref();
        let input = input.as_str();

        match self.retry.execute(site, move || provider.analyze(input)).await {
            Ok(text) => to_verdict(site, text),
            Err(e) => Verdict::failed(site.clone(), e.to_string()),
        }
    }

    fn progress_bar(&self, total: usize) -> ProgressBar {
        if !self.settings.show_progress {
            return ProgressBar::hidden();
        }

        let pb = ProgressBar::new(total as u64);
        let style = ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
            .map(|s| s.progress_chars("#>-"))
            .unwrap_or_else(|_| ProgressStyle::default_bar());
        pb.set_style(style);
        pb
    }

    /// Print a per-site line above the progress bar.
    fn say(&self, progress: &ProgressBar, line: String) {
        if !self.settings.show_progress {
            return;
        }
        if progress.is_hidden() {
            println!("{}", line);
        } else {
            progress.println(line);
        }
    }
}

/// Providers to run, in order.
///
/// With an explicit selection that provider must have a credential. Without
/// one, every provider with a credential gets a pass and the others are
/// skipped with a warning.
pub fn plan_passes(
    selected: Option<ProviderName>,
    credentials: &Credentials,
) -> Result<Vec<ProviderName>, ConfigError> {
    credentials.ensure_any()?;

    if let Some(provider) = selected {
        credentials.require(provider)?;
        return Ok(vec![provider]);
    }

    for provider in ProviderName::ALL {
        if credentials.get(provider).is_none() {
            warn!(
                "⚠️  {} skipped (no API key configured in {})",
                provider,
                provider.env_var()
            );
        }
    }

    Ok(credentials.available())
}
