//! Turning provider text into verdicts.
//!
//! Providers are asked for a bare JSON object but sometimes wrap it in code
//! fences or add a sentence around it. The outermost `{...}` is parsed; if
//! that fails the text is kept verbatim on the verdict.

use crate::error::ParseError;
use crate::models::{ConfidenceLevel, DetectedPattern, Verdict};
use serde::Deserialize;
use tracing::warn;

#[derive(Debug, Deserialize)]
struct RawVerdict {
    manipulative_design: bool,
    #[serde(default)]
    patterns_detected: Vec<RawPattern>,
    #[serde(default)]
    confidence_level: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RawPattern {
    Described {
        name: String,
        #[serde(default)]
        description: Option<String>,
    },
    Bare(String),
}

impl RawPattern {
    fn into_pattern(self) -> Option<DetectedPattern> {
        let (name, description) = match self {
            RawPattern::Described { name, description } => (name, description),
            RawPattern::Bare(name) => (name, None),
        };

        let name = name.trim().to_string();
        if name.is_empty() {
            return None;
        }

        Some(DetectedPattern {
            name,
            description: description
                .map(|d| d.trim().to_string())
                .filter(|d| !d.is_empty()),
        })
    }
}

/// Parse structured provider output into a verdict for `site`.
pub fn parse_verdict(site: &str, text: &str) -> Result<Verdict, ParseError> {
    let json = extract_json_object(text)?;

    let raw: RawVerdict =
        serde_json::from_str(json).map_err(|e| ParseError::InvalidJson(e.to_string()))?;

    let patterns = raw
        .patterns_detected
        .into_iter()
        .filter_map(RawPattern::into_pattern)
        .collect();

    let confidence = raw.confidence_level.as_deref().and_then(ConfidenceLevel::parse);
    if confidence.is_none() {
        if let Some(ref label) = raw.confidence_level {
            warn!("Unrecognized confidence level {:?} for {}", label, site);
        }
    }

    Ok(Verdict::resolved(
        site.to_string(),
        raw.manipulative_design,
        patterns,
        confidence,
    ))
}

/// Parse provider output, falling back to a raw-text verdict.
pub fn to_verdict(site: &str, text: String) -> Verdict {
    match parse_verdict(site, &text) {
        Ok(verdict) => verdict,
        Err(e) => {
            warn!("⚠️  Response for {} is not a valid JSON verdict: {}", site, e);
            Verdict::unparsed(site.to_string(), text)
        }
    }
}

/// Slice from the first `{` to the last `}`.
fn extract_json_object(text: &str) -> Result<&str, ParseError> {
    let text = text.trim();
    if text.is_empty() {
        return Err(ParseError::Empty);
    }

    match (text.find('{'), text.rfind('}')) {
        (Some(start), Some(end)) if start < end => Ok(&text[start..=end]),
        _ => Err(ParseError::NoJsonObject),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_plain_json() {
        let text = r#"{
            "manipulative_design": true,
            "patterns_detected": [
                {"name": "Urgency", "description": "Countdown timer on checkout"},
                {"name": "Confirmshaming"}
            ],
            "confidence_level": "alta"
        }"#;

        let verdict = parse_verdict("a.com", text).unwrap();
        assert!(verdict.manipulative);
        assert_eq!(verdict.patterns.len(), 2);
        assert_eq!(verdict.patterns[0].name, "Urgency");
        assert_eq!(
            verdict.patterns[0].description.as_deref(),
            Some("Countdown timer on checkout")
        );
        assert_eq!(verdict.patterns[1].description, None);
        assert_eq!(verdict.confidence_level, Some(ConfidenceLevel::High));
        assert!(verdict.raw_provider_text.is_none());
    }

    #[test]
    fn test_parse_fenced_json_with_prose() {
        let text = "Here is the analysis:\n```json\n{\"manipulative_design\": false, \"patterns_detected\": [], \"confidence_level\": \"medium\"}\n```";

        let verdict = parse_verdict("a.com", text).unwrap();
        assert!(!verdict.manipulative);
        assert_eq!(verdict.confidence_level, Some(ConfidenceLevel::Medium));
    }

    #[test]
    fn test_parse_bare_pattern_names_and_blank_entries() {
        let text = r#"{"manipulative_design": true, "patterns_detected": ["Scarcity", {"name": "  "}], "confidence_level": "low"}"#;

        let verdict = parse_verdict("a.com", text).unwrap();
        assert_eq!(verdict.patterns, vec![DetectedPattern::new("Scarcity")]);
    }

    #[test]
    fn test_unknown_confidence_is_unresolved() {
        let text = r#"{"manipulative_design": false, "confidence_level": "very sure"}"#;
        let verdict = parse_verdict("a.com", text).unwrap();
        assert_eq!(verdict.confidence_level, None);
        assert!(!verdict.is_unresolved());
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(parse_verdict("a.com", "   "), Err(ParseError::Empty));
        assert_eq!(
            parse_verdict("a.com", "The site looks fine to me."),
            Err(ParseError::NoJsonObject)
        );
        assert!(matches!(
            parse_verdict("a.com", r#"{"confidence_level": "high"}"#),
            Err(ParseError::InvalidJson(_))
        ));
    }

    #[test]
    fn test_to_verdict_falls_back_to_raw_text() {
        let verdict = to_verdict("b.com", "I think it is manipulative.".to_string());
        assert!(verdict.is_unresolved());
        assert_eq!(
            verdict.raw_provider_text.as_deref(),
            Some("I think it is manipulative.")
        );
        assert_eq!(verdict.confidence_level, None);
        assert!(!verdict.manipulative);
    }
}
