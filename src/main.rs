//! DarkBuster - LLM-powered dark pattern detector
//!
//! A CLI tool that asks generative-AI providers whether the websites in a
//! list use manipulative design, and writes one report per provider.
//!
//! Exit codes:
//!   0 - Success
//!   1 - Fatal error (configuration, credentials, site list, report I/O)
//!   2 - A site was judged manipulative and --fail-on-detection was set

mod analysis;
mod cli;
mod config;
mod error;
mod models;
mod provider;
mod report;
mod retry;
mod sites;

use analysis::{aggregator, AnalysisOrchestrator};
use anyhow::{Context, Result};
use chrono::Utc;
use cli::Args;
use config::{Config, Credentials, CONFIG_FILE_NAME};
use models::{ProviderName, ReportMetadata, RunReport, RunSummary, Site};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, error, info, warn};
use tracing_subscriber::FmtSubscriber;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse_args();

    if let Err(e) = args.validate() {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }

    // Handle --init-config early (no logging needed)
    if args.init_config {
        return handle_init_config();
    }

    // The config file can turn on verbose logging, so it is read first
    let loaded = load_config(&args);
    let config_verbose = loaded
        .as_ref()
        .map(|(config, _)| config.general.verbose)
        .unwrap_or(false);
    init_logging(&args, config_verbose);

    info!("DarkBuster v{}", env!("CARGO_PKG_VERSION"));
    debug!("Arguments: {:?}", args);

    match run(args, loaded).await {
        Ok(exit_code) => {
            std::process::exit(exit_code);
        }
        Err(e) => {
            error!("Analysis failed: {:#}", e);
            eprintln!("\n❌ Error: {:#}", e);
            std::process::exit(1);
        }
    }
}

/// Handle --init-config: generate a default .darkbuster.toml.
fn handle_init_config() -> Result<()> {
    let path = Path::new(CONFIG_FILE_NAME);

    if path.exists() {
        eprintln!(
            "⚠️  {} already exists. Remove it first or edit it manually.",
            CONFIG_FILE_NAME
        );
        std::process::exit(1);
    }

    let content = Config::default_toml();
    std::fs::write(path, &content)
        .with_context(|| format!("Failed to write {}", CONFIG_FILE_NAME))?;

    println!("✅ Created {} with default settings.", CONFIG_FILE_NAME);
    println!("   Edit it to customize models, pacing, retries, and more.");
    Ok(())
}

/// Initialize logging based on verbosity settings.
fn init_logging(args: &Args, config_verbose: bool) {
    let level = args.log_level(config_verbose);

    let subscriber = FmtSubscriber::builder()
        .with_max_level(level)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .with_line_number(false)
        .compact()
        .finish();

    if let Err(e) = tracing::subscriber::set_global_default(subscriber) {
        eprintln!("Failed to set tracing subscriber: {}", e);
    }
}

/// Run every planned pass. Returns the exit code (0 or 2).
async fn run(args: Args, loaded: Result<(Config, ConfigSource)>) -> Result<i32> {
    let (mut config, source) = loaded?;
    source.log();

    if let Some(ref report_path) = args.replay {
        return handle_replay(report_path, &args);
    }

    config.merge_with_args(&args);
    config.validate()?;

    let sites = sites::load_sites(&config.general.sites_file)?;
    let credentials = Credentials::from_env();
    let passes = analysis::plan_passes(args.provider.selected(), &credentials)?;

    if args.dry_run {
        return handle_dry_run(&config, &sites, &passes);
    }

    println!(
        "📋 Loaded {} sites from {}",
        sites.len(),
        config.general.sites_file.display()
    );

    let mut detected = false;
    for provider in passes {
        let report = run_pass(provider, &config, &credentials, &sites, &args).await?;
        detected |= report.summary.manipulative_count > 0;
    }

    println!("\n✅ Analysis complete!");

    Ok(exit_code(&args, detected))
}

/// One full pass over the site list with `provider`.
async fn run_pass(
    provider: ProviderName,
    config: &Config,
    credentials: &Credentials,
    sites: &[Site],
    args: &Args,
) -> Result<RunReport> {
    let start_time = Instant::now();

    let orchestrator =
        AnalysisOrchestrator::from_config(provider, config, credentials)?.quiet(args.quiet);
    let model = orchestrator.provider().model().to_string();

    println!("\n🤖 Analyzing with {}...", provider);
    println!("   Model: {}", model);
    println!(
        "   Input: {}",
        if orchestrator.fetches_html() {
            format!("page HTML (first {} chars)", config.analysis.max_html_chars)
        } else {
            "URL only".to_string()
        }
    );
    println!(
        "   Retries: {} attempts, {}s initial backoff",
        config.retry.max_attempts, config.retry.initial_backoff_seconds
    );
    println!();

    let verdicts = orchestrator.run(sites).await;

    let metadata = ReportMetadata {
        provider,
        model,
        generated_at: Utc::now(),
        duration_seconds: start_time.elapsed().as_secs_f64(),
        html_fetched: orchestrator.fetches_html(),
    };
    let report = aggregator::to_persistable(&verdicts, metadata);

    let json_path = report::report_path(&config.general.output_dir, provider);
    report::write_json_report(&report, &json_path)?;
    println!("💾 Results saved to: {}", json_path.display());

    if args.markdown {
        let md_path = report::markdown_path(&config.general.output_dir, provider);
        report::write_markdown_report(&report, &md_path)?;
        println!("📝 Markdown report saved to: {}", md_path.display());
    }

    if report.summary.failed_count > 0 {
        warn!(
            "{} of {} sites could not be analyzed with {}",
            report.summary.failed_count, report.summary.total, provider
        );
    }

    print_summary(&report.summary, report.metadata.duration_seconds, args);
    Ok(report)
}

/// Handle --replay: recompute and print the summary of a saved report.
fn handle_replay(path: &Path, args: &Args) -> Result<i32> {
    let report = report::load_report(path)?;
    info!("Replaying {} ({} verdicts)", path.display(), report.verdicts.len());

    let summary = aggregator::summarize(&report.verdicts);
    if summary != report.summary {
        warn!("Stored summary differs from the verdicts; showing the recomputed one");
    }

    println!(
        "📂 Report: {} ({} / {}, {})",
        path.display(),
        report.metadata.provider,
        report.metadata.model,
        report.metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    );
    print_summary(&summary, report.metadata.duration_seconds, args);

    if args.markdown {
        let md_path = path.with_extension("md");
        let replayed = RunReport { summary, ..report };
        report::write_markdown_report(&replayed, &md_path)?;
        println!("📝 Markdown report saved to: {}", md_path.display());
        return Ok(exit_code(args, replayed.summary.manipulative_count > 0));
    }

    Ok(exit_code(args, summary.manipulative_count > 0))
}

/// Handle --dry-run: show what would be analyzed, exit.
fn handle_dry_run(config: &Config, sites: &[Site], passes: &[ProviderName]) -> Result<i32> {
    println!("\n🔍 Dry run: no provider will be called.\n");

    println!("   Planned passes:");
    for provider in passes {
        let settings = config.providers.get(*provider);
        println!(
            "     🤖 {} (model {}) -> {}",
            provider,
            settings.model_for(*provider),
            report::report_path(&config.general.output_dir, *provider).display()
        );
    }

    println!("\n   {} sites would be analyzed:\n", sites.len());
    for site in sites {
        println!("     🌐 {}", site);
    }

    println!(
        "\n   Fetch HTML: {} | Pacing: {}s | Max attempts: {}",
        config.analysis.fetch_html, config.analysis.pacing_seconds, config.retry.max_attempts
    );

    println!("\n✅ Dry run complete. No provider calls were made.");
    Ok(0)
}

/// Print the terminal summary and, unless disabled, the charts.
fn print_summary(summary: &RunSummary, duration_seconds: f64, args: &Args) {
    if args.quiet {
        return;
    }

    println!("\n📊 Analysis Summary:");
    for line in aggregator::generate_summary_text(summary).lines() {
        println!("   {}", line);
    }
    println!("   Duration: {:.1}s", duration_seconds);

    if !args.no_charts {
        println!("\n{}", report::charts::render_all(summary));
    }
}

fn exit_code(args: &Args, detected: bool) -> i32 {
    if args.fail_on_detection && detected {
        eprintln!("\n⛔ Manipulative design detected. Failing (exit code 2).");
        2
    } else {
        0
    }
}

/// Where the configuration came from.
enum ConfigSource {
    File(PathBuf),
    Default,
    Builtin,
    Unreadable(String),
}

impl ConfigSource {
    /// Report the source once logging is initialized.
    fn log(&self) {
        match self {
            ConfigSource::File(path) => info!("Loaded config from: {}", path.display()),
            ConfigSource::Default => info!("Loaded default config from {}", CONFIG_FILE_NAME),
            ConfigSource::Builtin => debug!("No config file found, using defaults"),
            ConfigSource::Unreadable(e) => warn!("Failed to load config: {}", e),
        }
    }
}

/// Load configuration from file or use defaults.
fn load_config(args: &Args) -> Result<(Config, ConfigSource)> {
    if let Some(ref config_path) = args.config {
        let config = Config::load(config_path)?;
        return Ok((config, ConfigSource::File(config_path.clone())));
    }

    match Config::load_default() {
        Ok(Some(config)) => Ok((config, ConfigSource::Default)),
        Ok(None) => Ok((Config::default(), ConfigSource::Builtin)),
        Err(e) => Ok((Config::default(), ConfigSource::Unreadable(format!("{:#}", e)))),
    }
}
