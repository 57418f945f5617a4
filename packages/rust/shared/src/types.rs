//! Core domain types for the crawl → clean → chunk pipeline.

use serde::{Deserialize, Serialize};

use crate::error::{DocSimplifierError, Result};

// ---------------------------------------------------------------------------
// Page
// ---------------------------------------------------------------------------

/// A successfully fetched and extracted documentation page.
///
/// Produced once per URL by the crawler and consumed read-only downstream.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Page {
    /// Normalized URL (fragment and trailing slash stripped).
    pub url: String,
    /// Document title, first H1, or empty.
    pub title: String,
    /// Structure-preserving plain text (`## ` headers, `- ` list items, fenced code).
    pub content: String,
    /// Link distance from the start URL.
    pub depth: u32,
}

// ---------------------------------------------------------------------------
// CrawlBudget
// ---------------------------------------------------------------------------

/// Bounds for a single crawl invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CrawlBudget {
    /// Maximum link depth from the start URL (0 = start page only).
    pub max_depth: u32,
    /// Maximum number of pages returned. Always at least 1.
    pub max_pages: usize,
}

impl CrawlBudget {
    /// Build a budget, rejecting `max_pages == 0`.
    pub fn new(max_depth: u32, max_pages: usize) -> Result<Self> {
        let budget = Self {
            max_depth,
            max_pages,
        };
        budget.validate()?;
        Ok(budget)
    }

    /// Check the `max_pages >= 1` invariant (fields are public, so callers can bypass `new`).
    pub fn validate(&self) -> Result<()> {
        if self.max_pages == 0 {
            return Err(DocSimplifierError::config("max_pages must be at least 1"));
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Progress
// ---------------------------------------------------------------------------

/// Informational progress sink.
///
/// Implementations must return quickly and must not panic; the pipeline never
/// waits on or inspects the outcome of a report.
pub trait ProgressReporter: Send + Sync {
    /// `percent` is clamped to 0–100 by callers.
    fn report(&self, percent: u8, message: &str);
}

/// No-op progress reporter for headless/test usage.
pub struct SilentProgress;

impl ProgressReporter for SilentProgress {
    fn report(&self, _percent: u8, _message: &str) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn budget_rejects_zero_pages() {
        assert!(CrawlBudget::new(2, 0).is_err());
        let budget = CrawlBudget::new(0, 1).unwrap();
        assert_eq!(budget.max_depth, 0);
    }

    #[test]
    fn page_serializes_all_fields() {
        let page = Page {
            url: "https://docs.example.com/intro".into(),
            title: "Intro".into(),
            content: "## Intro".into(),
            depth: 1,
        };
        let json = serde_json::to_value(&page).unwrap();
        assert_eq!(json["title"], "Intro");
        assert_eq!(json["depth"], 1);
    }
}
