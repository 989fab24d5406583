//! Report generation.
//!
//! The JSON report is the persisted record of a pass; the Markdown report is
//! an optional human-readable rendering of the same data.

use crate::analysis::aggregator::{manipulative_share, most_common_patterns};
use crate::models::{ConfidenceLevel, ProviderName, ReportMetadata, RunReport, RunSummary, Verdict};
use anyhow::{Context, Result};
use std::path::{Path, PathBuf};

/// Where the JSON report of `provider` goes.
pub fn report_path(output_dir: &Path, provider: ProviderName) -> PathBuf {
    output_dir.join(format!("results_{}.json", provider))
}

/// Where the Markdown report of `provider` goes.
pub fn markdown_path(output_dir: &Path, provider: ProviderName) -> PathBuf {
    output_dir.join(format!("results_{}.md", provider))
}

/// Generate a JSON report.
pub fn generate_json_report(report: &RunReport) -> Result<String> {
    serde_json::to_string_pretty(report).map_err(Into::into)
}

/// Write a JSON report, creating the parent directory when needed.
pub fn write_json_report(report: &RunReport, path: &Path) -> Result<()> {
    let content = generate_json_report(report)?;
    write_file(path, &content)
}

/// Load a JSON report written by an earlier pass.
pub fn load_report(path: &Path) -> Result<RunReport> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read report: {}", path.display()))?;

    serde_json::from_str(&content)
        .with_context(|| format!("Failed to parse report: {}", path.display()))
}

/// Write the Markdown rendering of a report.
pub fn write_markdown_report(report: &RunReport, path: &Path) -> Result<()> {
    write_file(path, &generate_markdown_report(report))
}

fn write_file(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create directory: {}", parent.display()))?;
    }

    std::fs::write(path, content)
        .with_context(|| format!("Failed to write report to {}", path.display()))
}

/// Generate a complete Markdown report.
pub fn generate_markdown_report(report: &RunReport) -> String {
    let mut output = String::new();

    output.push_str("# DarkBuster Report\n\n");
    output.push_str(&generate_metadata_section(&report.metadata, &report.summary));
    output.push_str(&generate_summary_section(&report.summary));
    output.push_str(&generate_sites_section(&report.verdicts));
    output.push_str(&generate_footer());

    output
}

fn generate_metadata_section(metadata: &ReportMetadata, summary: &RunSummary) -> String {
    let mut section = String::new();

    section.push_str("## Metadata\n\n");
    section.push_str(&format!("- **Provider:** {}\n", metadata.provider));
    section.push_str(&format!("- **Model Used:** `{}`\n", metadata.model));
    section.push_str(&format!(
        "- **Analysis Date:** {}\n",
        metadata.generated_at.format("%Y-%m-%d %H:%M:%S UTC")
    ));
    section.push_str(&format!("- **Sites Analyzed:** {}\n", summary.total));
    if summary.failed_count > 0 {
        section.push_str(&format!("- **Sites Failed:** {}\n", summary.failed_count));
    }
    section.push_str(&format!(
        "- **Page HTML Sent:** {}\n",
        if metadata.html_fetched { "yes" } else { "no (URL only)" }
    ));
    section.push_str(&format!(
        "- **Analysis Duration:** {:.1}s\n\n",
        metadata.duration_seconds
    ));

    section
}

fn generate_summary_section(summary: &RunSummary) -> String {
    let mut section = String::new();

    section.push_str("## Summary\n\n");
    section.push_str("| 🚨 Manipulative | ✅ Not Manipulative | ❌ Failed | ⚠️ Unreadable | **Total** |\n");
    section.push_str("|:---:|:---:|:---:|:---:|:---:|\n");
    section.push_str(&format!(
        "| {} ({:.1}%) | {} | {} | {} | **{}** |\n\n",
        summary.manipulative_count,
        manipulative_share(summary),
        summary.non_manipulative_count,
        summary.failed_count,
        summary.unresolved_count,
        summary.total
    ));

    let patterns = most_common_patterns(summary, usize::MAX);
    if !patterns.is_empty() {
        section.push_str("### Detected Patterns\n\n");
        section.push_str("| Pattern | Sites |\n");
        section.push_str("|:---|:---:|\n");
        for (name, count) in patterns {
            section.push_str(&format!("| {} | {} |\n", name, count));
        }
        section.push('\n');
    }

    if !summary.confidence_distribution.is_empty() {
        section.push_str("### Confidence Levels\n\n");
        section.push_str("| Level | Verdicts |\n");
        section.push_str("|:---|:---:|\n");
        for level in [ConfidenceLevel::High, ConfidenceLevel::Medium, ConfidenceLevel::Low] {
            let count = summary
                .confidence_distribution
                .get(&level)
                .copied()
                .unwrap_or(0);
            section.push_str(&format!("| {} {} | {} |\n", level.emoji(), level, count));
        }
        section.push('\n');
    }

    section
}

fn generate_sites_section(verdicts: &[Verdict]) -> String {
    let mut section = String::new();

    section.push_str("## Sites\n\n");

    if verdicts.is_empty() {
        section.push_str("No sites were analyzed.\n\n");
        return section;
    }

    for verdict in verdicts {
        section.push_str(&generate_site_block(verdict));
    }

    section
}

/// One site's verdict.
fn generate_site_block(verdict: &Verdict) -> String {
    let mut block = String::new();

    let badge = if verdict.is_failed() {
        "❌ **FAILED**"
    } else if verdict.is_unresolved() {
        "⚠️ **UNREADABLE**"
    } else if verdict.manipulative {
        "🚨 **MANIPULATIVE**"
    } else {
        "✅ **CLEAN**"
    };

    block.push_str(&format!("### {} {}\n\n", badge, verdict.site));

    if let Some(level) = verdict.confidence_level {
        block.push_str(&format!("**Confidence:** {} {}\n\n", level.emoji(), level));
    }

    for pattern in &verdict.patterns {
        match pattern.description {
            Some(ref description) => {
                block.push_str(&format!("- **{}:** {}\n", pattern.name, description))
            }
            None => block.push_str(&format!("- **{}**\n", pattern.name)),
        }
    }
    if !verdict.patterns.is_empty() {
        block.push('\n');
    }

    if let Some(ref error) = verdict.error {
        block.push_str(&format!("> **Error:** {}\n\n", error));
    }

    if let Some(ref raw) = verdict.raw_provider_text {
        block.push_str("<details>\n<summary>Provider response</summary>\n\n```\n");
        block.push_str(raw);
        block.push_str("\n```\n</details>\n\n");
    }

    block.push_str("---\n\n");

    block
}

fn generate_footer() -> String {
    "*Report generated by DarkBuster*\n".to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregator::to_persistable;
    use crate::models::DetectedPattern;
    use chrono::Utc;

    fn create_test_report() -> RunReport {
        let verdicts = vec![
            Verdict::resolved(
                "https://shop.example".to_string(),
                true,
                vec![
                    DetectedPattern {
                        name: "Urgency".to_string(),
                        description: Some("Countdown timer on every product".to_string()),
                    },
                    DetectedPattern::new("Confirmshaming"),
                ],
                Some(ConfidenceLevel::High),
            ),
            Verdict::unparsed("b.com".to_string(), "Looks mostly fine.".to_string()),
            Verdict::failed("c.com".to_string(), "HTML not retrieved: HTTP 404"),
        ];

        let metadata = ReportMetadata {
            provider: ProviderName::OpenAi,
            model: "gpt-4o-mini".to_string(),
            generated_at: Utc::now(),
            duration_seconds: 12.0,
            html_fetched: true,
        };

        to_persistable(&verdicts, metadata)
    }

    #[test]
    fn test_report_paths() {
        let dir = Path::new("out");
        assert_eq!(
            report_path(dir, ProviderName::Gemini),
            Path::new("out").join("results_gemini.json")
        );
        assert_eq!(
            markdown_path(dir, ProviderName::Claude),
            Path::new("out").join("results_claude.md")
        );
    }

    #[test]
    fn test_generate_json_report_field_names() {
        let json = generate_json_report(&create_test_report()).unwrap();

        assert!(json.contains("\"metadata\""));
        assert!(json.contains("\"manipulativeCount\": 1"));
        assert!(json.contains("\"patternFrequency\""));
        assert!(json.contains("\"confidenceDistribution\""));
        assert!(json.contains("\"rawProviderText\""));
        assert!(json.contains("\"confidenceLevel\": \"high\""));
    }

    #[test]
    fn test_write_and_load_report() {
        let dir = tempfile::tempdir().unwrap();
        let path = report_path(&dir.path().join("nested"), ProviderName::OpenAi);
        let report = create_test_report();

        tokio_test::assert_ok!(write_json_report(&report, &path));
        let loaded = tokio_test::assert_ok!(load_report(&path));

        assert_eq!(loaded.verdicts, report.verdicts);
        assert_eq!(loaded.summary, report.summary);
        assert_eq!(loaded.metadata.model, "gpt-4o-mini");
    }

    #[test]
    fn test_load_report_rejects_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("results_openai.json");
        std::fs::write(&path, "not a report").unwrap();

        tokio_test::assert_err!(load_report(&path));
        tokio_test::assert_err!(load_report(&dir.path().join("missing.json")));
    }

    #[test]
    fn test_generate_markdown_report() {
        let markdown = generate_markdown_report(&create_test_report());

        assert!(markdown.contains("# DarkBuster Report"));
        assert!(markdown.contains("## Metadata"));
        assert!(markdown.contains("`gpt-4o-mini`"));
        assert!(markdown.contains("| Urgency | 1 |"));
        assert!(markdown.contains("MANIPULATIVE** https://shop.example"));
        assert!(markdown.contains("Countdown timer on every product"));
        assert!(markdown.contains("Looks mostly fine."));
        assert!(markdown.contains("> **Error:** HTML not retrieved"));
    }

    #[test]
    fn test_site_block_for_clean_site() {
        let verdict = Verdict::resolved(
            "ok.com".to_string(),
            false,
            Vec::new(),
            Some(ConfidenceLevel::Medium),
        );

        let block = generate_site_block(&verdict);
        assert!(block.contains("CLEAN"));
        assert!(block.contains("medium"));
        assert!(!block.contains("Error"));
    }
}
