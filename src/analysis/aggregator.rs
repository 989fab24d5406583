//! Verdict aggregation and statistics.
//!
//! Everything here is pure: the same verdicts always give the same summary.

use crate::models::{ConfidenceLevel, ReportMetadata, RunReport, RunSummary, Verdict};
use std::cmp::Reverse;

/// Compute summary statistics for one pass.
pub fn summarize(verdicts: &[Verdict]) -> RunSummary {
    let mut summary = RunSummary {
        total: verdicts.len(),
        ..RunSummary::default()
    };

    for verdict in verdicts {
        if verdict.manipulative {
            summary.manipulative_count += 1;
            for pattern in &verdict.patterns {
                *summary
                    .pattern_frequency
                    .entry(pattern.name.clone())
                    .or_default() += 1;
            }
        }

        if verdict.is_failed() {
            summary.failed_count += 1;
        } else if verdict.is_unresolved() {
            summary.unresolved_count += 1;
        }

        if let Some(level) = verdict.confidence_level {
            *summary.confidence_distribution.entry(level).or_default() += 1;
        }
    }

    summary.non_manipulative_count = summary.total - summary.manipulative_count;
    summary
}

/// Bundle per-site detail with its summary for persistence.
pub fn to_persistable(verdicts: &[Verdict], metadata: ReportMetadata) -> RunReport {
    RunReport {
        metadata,
        summary: summarize(verdicts),
        verdicts: verdicts.to_vec(),
    }
}

/// The `n` most frequent pattern names, most frequent first.
/// Equal counts are ordered by name.
pub fn most_common_patterns(summary: &RunSummary, n: usize) -> Vec<(&str, usize)> {
    let mut patterns: Vec<(&str, usize)> = summary
        .pattern_frequency
        .iter()
        .map(|(name, count)| (name.as_str(), *count))
        .collect();

    // BTreeMap iteration is already name-ordered and sort_by_key is stable
    patterns.sort_by_key(|(_, count)| Reverse(*count));
    patterns.truncate(n);
    patterns
}

/// Share of analyzed sites judged manipulative, in percent.
pub fn manipulative_share(summary: &RunSummary) -> f64 {
    if summary.total == 0 {
        return 0.0;
    }
    summary.manipulative_count as f64 / summary.total as f64 * 100.0
}

/// Generate a text summary of the pass statistics.
pub fn generate_summary_text(summary: &RunSummary) -> String {
    let mut lines = Vec::new();

    lines.push(format!("Sites analyzed: {}", summary.total));
    lines.push(format!(
        "- 🚨 Manipulative: {} ({:.1}%)",
        summary.manipulative_count,
        manipulative_share(summary)
    ));
    lines.push(format!(
        "- ✅ Not manipulative: {}",
        summary.non_manipulative_count
    ));
    if summary.failed_count > 0 {
        lines.push(format!("- ❌ Failed: {}", summary.failed_count));
    }
    if summary.unresolved_count > 0 {
        lines.push(format!("- ⚠️  Unreadable response: {}", summary.unresolved_count));
    }

    let top = most_common_patterns(summary, 5);
    if !top.is_empty() {
        lines.push(String::new());
        lines.push("Most common patterns:".to_string());
        for (name, count) in top {
            lines.push(format!("- {}: {}", name, count));
        }
    }

    if !summary.confidence_distribution.is_empty() {
        lines.push(String::new());
        lines.push("Confidence:".to_string());
        for level in [ConfidenceLevel::High, ConfidenceLevel::Medium, ConfidenceLevel::Low] {
            if let Some(count) = summary.confidence_distribution.get(&level) {
                lines.push(format!("- {} {}: {}", level.emoji(), level, count));
            }
        }
    }

    lines.join("\n")
}
