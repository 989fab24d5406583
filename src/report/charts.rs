//! Terminal charts for a pass summary.

use crate::analysis::aggregator::{manipulative_share, most_common_patterns};
use crate::models::{ConfidenceLevel, RunSummary};

const BAR_WIDTH: usize = 30;

/// Manipulative versus non-manipulative sites.
pub fn render_proportion(summary: &RunSummary) -> String {
    let mut lines = vec!["Manipulative design".to_string()];
    let max = summary.total;

    lines.push(bar_line("Manipulative", summary.manipulative_count, max, 14));
    lines.push(bar_line(
        "Not manipulative",
        summary.non_manipulative_count,
        max,
        14,
    ));
    lines.push(format!(
        "  {:.1}% of {} sites judged manipulative",
        manipulative_share(summary),
        summary.total
    ));

    lines.join("\n")
}

/// Occurrences of each detected pattern, most frequent first.
pub fn render_pattern_frequency(summary: &RunSummary) -> String {
    let patterns = most_common_patterns(summary, usize::MAX);
    if patterns.is_empty() {
        return "Detected patterns\n  (none)".to_string();
    }

    let label_width = patterns
        .iter()
        .map(|(name, _)| name.chars().count())
        .max()
        .unwrap_or(0);
    let max = patterns.first().map(|(_, count)| *count).unwrap_or(0);

    let mut lines = vec!["Detected patterns".to_string()];
    for (name, count) in patterns {
        lines.push(bar_line(name, count, max, label_width));
    }

    lines.join("\n")
}

/// Resolved confidence levels.
pub fn render_confidence(summary: &RunSummary) -> String {
    let counts: Vec<(ConfidenceLevel, usize)> =
        [ConfidenceLevel::High, ConfidenceLevel::Medium, ConfidenceLevel::Low]
            .into_iter()
            .map(|level| {
                let count = summary
                    .confidence_distribution
                    .get(&level)
                    .copied()
                    .unwrap_or(0);
                (level, count)
            })
            .collect();
    let max = counts.iter().map(|(_, count)| *count).max().unwrap_or(0);

    let mut lines = vec!["Confidence".to_string()];
    for (level, count) in counts {
        let label = format!("{} {}", level.emoji(), level);
        lines.push(bar_line(&label, count, max, 8));
    }

    lines.join("\n")
}

/// All three views, separated by blank lines.
pub fn render_all(summary: &RunSummary) -> String {
    [
        render_proportion(summary),
        render_pattern_frequency(summary),
        render_confidence(summary),
    ]
    .join("\n\n")
}

fn bar_line(label: &str, count: usize, max: usize, label_width: usize) -> String {
    format!(
        "  {:<width$} │{:<bar$}│ {}",
        label,
        bar(count, max),
        count,
        width = label_width,
        bar = BAR_WIDTH
    )
}

/// Scale `count` against `max` onto `BAR_WIDTH` cells. Non-zero counts get
/// at least one cell.
fn bar(count: usize, max: usize) -> String {
    if count == 0 || max == 0 {
        return String::new();
    }
    let cells = (count * BAR_WIDTH / max).clamp(1, BAR_WIDTH);
    "█".repeat(cells)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::aggregator::summarize;
    use crate::models::{DetectedPattern, Verdict};

    fn sample_summary() -> RunSummary {
        summarize(&[
            Verdict::resolved(
                "a.com".to_string(),
                true,
                vec![DetectedPattern::new("Urgency"), DetectedPattern::new("Scarcity")],
                Some(ConfidenceLevel::High),
            ),
            Verdict::resolved(
                "b.com".to_string(),
                true,
                vec![DetectedPattern::new("Urgency")],
                Some(ConfidenceLevel::Low),
            ),
            Verdict::resolved("c.com".to_string(), false, Vec::new(), Some(ConfidenceLevel::High)),
            Verdict::failed("d.com".to_string(), "timeout"),
        ])
    }

    #[test]
    fn test_bar_scaling() {
        assert_eq!(bar(0, 10), "");
        assert_eq!(bar(5, 0), "");
        assert_eq!(bar(10, 10).chars().count(), BAR_WIDTH);
        assert_eq!(bar(5, 10).chars().count(), BAR_WIDTH / 2);
        assert_eq!(bar(1, 1000).chars().count(), 1);
    }

    #[test]
    fn test_render_proportion() {
        let chart = render_proportion(&sample_summary());
        assert!(chart.contains("50.0% of 4 sites"));
        assert!(chart.lines().nth(1).unwrap().ends_with("│ 2"));
    }

    #[test]
    fn test_render_pattern_frequency_orders_by_count() {
        let chart = render_pattern_frequency(&sample_summary());
        let lines: Vec<&str> = chart.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[1].contains("Urgency"));
        assert!(lines[2].contains("Scarcity"));
    }

    #[test]
    fn test_render_without_patterns() {
        let chart = render_pattern_frequency(&RunSummary::default());
        assert!(chart.contains("(none)"));
    }

    #[test]
    fn test_render_confidence_lists_every_level() {
        let chart = render_confidence(&sample_summary());
        assert!(chart.contains("high"));
        assert!(chart.contains("medium"));
        assert!(chart.contains("low"));
        assert!(render_all(&sample_summary()).contains("Detected patterns"));
    }
}
