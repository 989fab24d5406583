//! Prompt text sent to the providers.

/// System role for every provider.
pub const SYSTEM_PROMPT: &str =
    "You are an analyzer of manipulative design patterns (dark patterns) in websites.";

/// Instructions preceding the site content.
pub const ANALYSIS_PROMPT: &str = r#"You are an automated checker for manipulative design patterns in websites (dark patterns).

Your task is to analyze the content of a website (HTML, text, scripts and described layout) and decide whether it contains manipulative patterns.

Always answer with structured JSON in exactly this format:
{
  "manipulative_design": true/false,
  "patterns_detected": [
    { "name": "Pattern name", "description": "Short description of where the pattern appears" }
  ],
  "confidence_level": "high/medium/low"
}

Analysis rules:
1. Decide whether the site contains manipulative patterns.
2. If it does, describe each pattern clearly and briefly. Common examples:
   - Confirmshaming
   - Roach Motel
   - Scarcity
   - Urgency
   - Obstruction
   - Sneaking
   - Misdirection
3. Always include a confidence level: high, medium or low.
4. If there is no clear manipulation, return "manipulative_design": false.
Output only the JSON. No markdown, no code fences, no explanations."#;

/// Build the provider input for one site.
///
/// With page content the (already truncated) HTML follows the prompt;
/// without it only the URL is given.
pub fn build_input(site: &str, page: Option<&str>) -> String {
    match page {
        Some(html) => format!("{}\n\nSite: {}\n\nSite content:\n{}", ANALYSIS_PROMPT, site, html),
        None => format!(
            "{}\n\nAnalyze the website at this address: {}",
            ANALYSIS_PROMPT, site
        ),
    }
}
