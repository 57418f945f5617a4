//! Shared types, error model, and configuration for DocSimplifier.
//!
//! This crate is the foundation depended on by all other DocSimplifier crates.
//! It provides:
//! - [`DocSimplifierError`]: the unified error type
//! - Domain types ([`Page`], [`CrawlBudget`]) and the [`ProgressReporter`] seam
//! - Configuration ([`AppConfig`], [`CrawlConfig`], [`ChunkConfig`], config loading)

pub mod config;
pub mod error;
pub mod types;

// Re-export public API at crate root for ergonomic imports.
pub use config::{
    AppConfig, ChunkConfig, ChunkingSection, CrawlConfig, CrawlSection, config_dir,
    config_file_path, init_config, load_config, load_config_from,
};
pub use error::{DocSimplifierError, Result};
pub use types::{CrawlBudget, Page, ProgressReporter, SilentProgress};
