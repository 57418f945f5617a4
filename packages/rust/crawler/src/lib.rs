//! Documentation crawler: link filtering, content extraction, and bounded traversal.
//!
//! This crate provides:
//! - [`filter`]: Same-origin, deny-list aware link eligibility
//! - [`extractor`]: Structure-preserving text extraction from HTML
//! - [`engine`]: Budgeted, batch-concurrent crawler

pub mod engine;
pub mod extractor;
pub mod filter;

pub use engine::{CrawlResult, Crawler, FetchError, FetchedPage};
pub use extractor::{ContentExtractor, ExtractedContent, extract_title};
pub use filter::{LinkFilter, normalize_url};
