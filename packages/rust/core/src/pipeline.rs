//! End-to-end `simplify` pipeline: URL → crawl → clean → simplify code → chunk.

use std::time::Instant;

use serde::Serialize;
use tracing::{info, instrument};

use docsimplifier_crawler::{CrawlResult, Crawler};
use docsimplifier_processor::{
    Chunker, KeyInfo, clean_content, context_header, estimate_tokens, extract_key_info,
    simplify_code_blocks,
};
use docsimplifier_shared::{
    AppConfig, ChunkConfig, CrawlBudget, CrawlConfig, DocSimplifierError, Page,
    ProgressReporter, Result,
};

/// Title used when the first page has none.
const FALLBACK_TITLE: &str = "Documentation";

// Phase windows on the overall 0–100 progress scale
const CRAWL_START: u8 = 5;
const CRAWL_END: u8 = 40;
const CLEAN: u8 = 45;
const CHUNK_START: u8 = 48;
const CHUNK_END: u8 = 50;

/// Configuration for one `simplify` run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub budget: CrawlBudget,
    pub crawl: CrawlConfig,
    pub chunking: ChunkConfig,
}

impl PipelineConfig {
    pub fn from_app_config(config: &AppConfig) -> Result<Self> {
        Ok(Self {
            budget: config.budget()?,
            crawl: CrawlConfig::from(config),
            chunking: ChunkConfig::from(config),
        })
    }
}

/// Everything the pipeline produces for downstream generation.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineOutput {
    pub title: String,
    pub pages: Vec<Page>,
    /// Cleaned, merged document with long code blocks shortened.
    pub document: String,
    /// Ordered chunks of `document`.
    pub chunks: Vec<String>,
    pub insights: KeyInfo,
    #[serde(skip)]
    pub crawl: CrawlResult,
}

impl PipelineOutput {
    /// Chunks prefixed with their `[This is part i of N ...]` header.
    pub fn chunks_with_headers(&self) -> Vec<String> {
        let total = self.chunks.len();
        self.chunks
            .iter()
            .enumerate()
            .map(|(i, chunk)| format!("{}{chunk}", context_header(i, total)))
            .collect()
    }

    pub fn estimated_tokens(&self) -> usize {
        estimate_tokens(&self.document)
    }
}

/// Maps crawler progress (0–100) into the pipeline's crawl window.
struct ScaledProgress<'a> {
    inner: &'a dyn ProgressReporter,
    from: u8,
    to: u8,
}

impl ProgressReporter for ScaledProgress<'_> {
    fn report(&self, percent: u8, message: &str) {
        let span = u32::from(self.to - self.from);
        let scaled = u32::from(self.from) + span * u32::from(percent.min(100)) / 100;
        self.inner.report(scaled as u8, message);
    }
}

/// Run the full pipeline for `url`.
///
/// Fails with [`DocSimplifierError::NoContent`] when no page yields usable
/// text; invalid URLs and budgets fail before any network access.
#[instrument(skip_all, fields(url = %url, max_pages = config.budget.max_pages))]
pub async fn simplify(
    url: &str,
    config: &PipelineConfig,
    progress: &dyn ProgressReporter,
) -> Result<PipelineOutput> {
    let start = Instant::now();
    info!("starting simplify pipeline");

    // --- Phase 1: Crawl ---
    progress.report(CRAWL_START, "Crawling documentation");
    let crawler = Crawler::new(config.crawl.clone())?;
    let scaled = ScaledProgress {
        inner: progress,
        from: CRAWL_START,
        to: CRAWL_END,
    };
    let (crawl, pages) = crawler.crawl(url, config.budget, &scaled).await?;

    if pages.is_empty() {
        return Err(DocSimplifierError::NoContent { url: url.to_string() });
    }
    progress.report(CRAWL_END, &format!("Crawled {} pages", pages.len()));

    // --- Phase 2: Clean ---
    progress.report(CLEAN, "Cleaning content");
    let cleaned = clean_content(&pages);
    if cleaned.is_empty() {
        return Err(DocSimplifierError::NoContent { url: url.to_string() });
    }
    let insights = extract_key_info(&cleaned);
    let document = simplify_code_blocks(&cleaned);

    // --- Phase 3: Chunk ---
    progress.report(CHUNK_START, "Splitting into chunks");
    let chunks = Chunker::from(&config.chunking).chunk_document(&document);
    progress.report(CHUNK_END, &format!("Prepared {} chunks", chunks.len()));

    let title = document_title(&pages);

    info!(
        %title,
        pages = pages.len(),
        skipped = crawl.pages_skipped,
        failed = crawl.errors.len(),
        chunks = chunks.len(),
        tokens = estimate_tokens(&document),
        elapsed_ms = start.elapsed().as_millis() as u64,
        "simplify pipeline complete"
    );

    Ok(PipelineOutput {
        title,
        pages,
        document,
        chunks,
        insights,
        crawl,
    })
}

/// First page's title, else the fallback.
fn document_title(pages: &[Page]) -> String {
    pages
        .first()
        .map(|p| p.title.trim())
        .filter(|t| !t.is_empty())
        .unwrap_or(FALLBACK_TITLE)
        .to_string()
}
