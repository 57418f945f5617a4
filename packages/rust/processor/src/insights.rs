//! Keyword scan for what a documentation set covers.

use serde::Serialize;

const PRICING_TERMS: &[&str] = &["pricing", "cost", "free tier", "billing"];
const API_TERMS: &[&str] = &["api reference", "endpoints", "methods"];
const QUICKSTART_TERMS: &[&str] = &["quickstart", "getting started", "quick start"];
const LANGUAGES: &[&str] = &[
    "python",
    "javascript",
    "typescript",
    "ruby",
    "php",
    "java",
    "go",
    "rust",
    "c#",
];

/// Coarse facts about a cleaned document.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct KeyInfo {
    pub has_pricing: bool,
    pub has_api_reference: bool,
    pub has_quickstart: bool,
    pub has_examples: bool,
    /// Languages named in the text, in a fixed order.
    pub programming_languages: Vec<String>,
}

pub fn extract_key_info(text: &str) -> KeyInfo {
    let lower = text.to_lowercase();
    let mentions = |terms: &[&str]| terms.iter().any(|t| lower.contains(t));

    // Whole words only, so "java" does not fire on "javascript" nor "go" on "good"
    let words: Vec<&str> = lower
        .split(|c: char| !(c.is_alphanumeric() || c == '#' || c == '+'))
        .filter(|w| !w.is_empty())
        .collect();

    KeyInfo {
        has_pricing: mentions(PRICING_TERMS),
        has_api_reference: mentions(API_TERMS),
        has_quickstart: mentions(QUICKSTART_TERMS),
        has_examples: text.contains("```") || lower.contains("example"),
        programming_languages: LANGUAGES
            .iter()
            .filter(|lang| words.contains(*lang))
            .map(|lang| lang.to_string())
            .collect(),
    }
}
