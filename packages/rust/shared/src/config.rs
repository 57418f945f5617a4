//! Application configuration for DocSimplifier.
//!
//! User config lives at `~/.docsimplifier/docsimplifier.toml`.
//! CLI flags override config file values, which override defaults.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{DocSimplifierError, Result};
use crate::types::CrawlBudget;

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "docsimplifier.toml";

/// Default config directory name under the user's home.
const CONFIG_DIR_NAME: &str = ".docsimplifier";

// ---------------------------------------------------------------------------
// Config structs (matching docsimplifier.toml schema)
// ---------------------------------------------------------------------------

/// Top-level application config, deserialized from TOML.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Crawl budget and politeness settings.
    #[serde(default)]
    pub crawl: CrawlSection,

    /// Chunk sizing for the downstream generator.
    #[serde(default)]
    pub chunking: ChunkingSection,
}

/// `[crawl]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CrawlSection {
    /// Maximum link depth from the start URL.
    #[serde(default = "default_max_depth")]
    pub max_depth: u32,

    /// Maximum number of pages kept per crawl.
    #[serde(default = "default_max_pages")]
    pub max_pages: usize,

    /// Fetches in flight per batch.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,

    /// Pause between batches, in milliseconds.
    #[serde(default = "default_batch_delay")]
    pub batch_delay_ms: u64,

    /// Overall timeout for a single page fetch, in seconds.
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,

    /// Ceiling on child links followed from one page.
    #[serde(default = "default_max_links")]
    pub max_links_per_page: usize,

    /// Pages whose extracted text is shorter than this are dropped as noise.
    #[serde(default = "default_min_content_chars")]
    pub min_content_chars: usize,

    /// User-Agent header sent with every request.
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Path substrings that are never traversed.
    #[serde(default = "default_deny_list")]
    pub deny_list: Vec<String>,
}

impl Default for CrawlSection {
    fn default() -> Self {
        Self {
            max_depth: default_max_depth(),
            max_pages: default_max_pages(),
            concurrency: default_concurrency(),
            batch_delay_ms: default_batch_delay(),
            request_timeout_secs: default_request_timeout(),
            max_links_per_page: default_max_links(),
            min_content_chars: default_min_content_chars(),
            user_agent: default_user_agent(),
            deny_list: default_deny_list(),
        }
    }
}

fn default_max_depth() -> u32 {
    2
}
fn default_max_pages() -> usize {
    20
}
fn default_concurrency() -> usize {
    5
}
fn default_batch_delay() -> u64 {
    500
}
fn default_request_timeout() -> u64 {
    10
}
fn default_max_links() -> usize {
    3
}
fn default_min_content_chars() -> usize {
    100
}
fn default_user_agent() -> String {
    concat!("DocSimplifier/", env!("CARGO_PKG_VERSION")).into()
}
fn default_deny_list() -> Vec<String> {
    [
        // Auth and marketing pages
        "/blog", "/login", "/signin", "/signup", "/register", "/pricing",
        // Downloads and static assets
        ".pdf", ".zip", ".tar.gz", ".png", ".jpg", ".jpeg", ".gif", ".svg", ".ico", ".css",
        ".js", ".woff", ".woff2", ".mp4",
    ]
    .into_iter()
    .map(String::from)
    .collect()
}

/// `[chunking]` section.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChunkingSection {
    /// Approximate token budget per chunk.
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Approximate tokens repeated from the previous chunk.
    #[serde(default = "default_overlap_tokens")]
    pub overlap_tokens: usize,
}

impl Default for ChunkingSection {
    fn default() -> Self {
        Self {
            max_tokens: default_max_tokens(),
            overlap_tokens: default_overlap_tokens(),
        }
    }
}

fn default_max_tokens() -> usize {
    6000
}
fn default_overlap_tokens() -> usize {
    200
}

// ---------------------------------------------------------------------------
// Runtime config (merged from config + CLI flags)
// ---------------------------------------------------------------------------

/// Runtime crawler configuration. The per-call [`CrawlBudget`] is kept separate.
#[derive(Debug, Clone)]
pub struct CrawlConfig {
    /// Maximum fetches in flight per batch.
    pub concurrency: usize,
    /// Pause between batches.
    pub batch_delay: Duration,
    /// Overall timeout per fetch.
    pub request_timeout: Duration,
    /// Ceiling on child links followed from one page.
    pub max_links_per_page: usize,
    /// Minimum extracted text length for a page to be kept.
    pub min_content_chars: usize,
    /// User-Agent header.
    pub user_agent: String,
    /// Path substrings that are never traversed.
    pub deny_list: Vec<String>,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for CrawlConfig {
    fn from(config: &AppConfig) -> Self {
        let crawl = &config.crawl;
        Self {
            concurrency: crawl.concurrency,
            batch_delay: Duration::from_millis(crawl.batch_delay_ms),
            request_timeout: Duration::from_secs(crawl.request_timeout_secs),
            max_links_per_page: crawl.max_links_per_page,
            min_content_chars: crawl.min_content_chars,
            user_agent: crawl.user_agent.clone(),
            deny_list: crawl.deny_list.clone(),
        }
    }
}

/// Chunker sizing, expressed in approximate tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkConfig {
    pub max_tokens: usize,
    pub overlap_tokens: usize,
}

impl Default for ChunkConfig {
    fn default() -> Self {
        Self::from(&AppConfig::default())
    }
}

impl From<&AppConfig> for ChunkConfig {
    fn from(config: &AppConfig) -> Self {
        Self {
            max_tokens: config.chunking.max_tokens,
            overlap_tokens: config.chunking.overlap_tokens,
        }
    }
}

impl AppConfig {
    /// Crawl budget from the `[crawl]` section.
    pub fn budget(&self) -> Result<CrawlBudget> {
        CrawlBudget::new(self.crawl.max_depth, self.crawl.max_pages)
    }
}

// ---------------------------------------------------------------------------
// Config loading
// ---------------------------------------------------------------------------

/// Get the path to the config directory (`~/.docsimplifier/`).
pub fn config_dir() -> Result<PathBuf> {
    let home = dirs::home_dir()
        .ok_or_else(|| DocSimplifierError::config("could not determine home directory"))?;
    Ok(home.join(CONFIG_DIR_NAME))
}

/// Get the path to the config file (`~/.docsimplifier/docsimplifier.toml`).
pub fn config_file_path() -> Result<PathBuf> {
    Ok(config_dir()?.join(CONFIG_FILE_NAME))
}

/// Load the application config from disk. Returns defaults if the file does not exist.
pub fn load_config() -> Result<AppConfig> {
    let path = config_file_path()?;

    if !path.exists() {
        tracing::debug!(?path, "config file not found, using defaults");
        return Ok(AppConfig::default());
    }

    load_config_from(&path)
}

/// Load the application config from a specific file path.
pub fn load_config_from(path: &Path) -> Result<AppConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| DocSimplifierError::io(path, e))?;

    toml::from_str(&content).map_err(|e| {
        DocSimplifierError::config(format!("failed to parse {}: {e}", path.display()))
    })
}

/// Create the config directory and write a default config file.
/// Returns the path to the created file.
pub fn init_config() -> Result<PathBuf> {
    let dir = config_dir()?;
    std::fs::create_dir_all(&dir).map_err(|e| DocSimplifierError::io(&dir, e))?;

    let path = dir.join(CONFIG_FILE_NAME);
    let config = AppConfig::default();
    let content =
        toml::to_string_pretty(&config).map_err(|e| DocSimplifierError::config(e.to_string()))?;

    std::fs::write(&path, content).map_err(|e| DocSimplifierError::io(&path, e))?;
    tracing::info!(?path, "created default config file");

    Ok(path)
}
