//! Budgeted, concurrency-limited documentation crawler.
//!
//! Traversal is an explicit breadth-first worklist owned by a single
//! coordinating task. URLs are marked visited when they are scheduled, so two
//! in-flight fetches can never race on the same page. Fetches run in small
//! batches with a politeness pause between batches; each fetch returns a
//! `Result<FetchedPage, FetchError>` that the coordinator logs and discards on
//! failure.

use std::collections::{BTreeMap, HashSet, VecDeque};
use std::sync::{Arc, LazyLock};
use std::time::{Duration, Instant};

use reqwest::{Client, StatusCode, header};
use scraper::{Html, Selector};
use tokio::task::{JoinError, JoinHandle};
use tracing::{debug, info, instrument, warn};
use url::Url;

use docsimplifier_shared::{
    CrawlBudget, CrawlConfig, DocSimplifierError, Page, ProgressReporter, Result,
};

use crate::extractor::{ContentExtractor, ExtractedContent};
use crate::filter::{LinkFilter, normalize_url};

// ---------------------------------------------------------------------------
// Results and per-page errors
// ---------------------------------------------------------------------------

/// Summary of a completed crawl.
#[derive(Debug, Clone, Default)]
pub struct CrawlResult {
    /// Pages kept in the result list.
    pub pages_fetched: usize,
    /// Pages fetched but dropped for having too little content.
    pub pages_skipped: usize,
    /// Fetch failures (URL, error message). Never fatal to the crawl.
    pub errors: Vec<(String, String)>,
    /// Total duration of the crawl.
    pub duration: Duration,
}

/// Why a single URL produced no page. Fatal to that URL only.
#[derive(Debug, thiserror::Error)]
pub enum FetchError {
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("HTTP {0}")]
    Status(StatusCode),

    #[error("not an HTML document (content-type: {0})")]
    NotHtml(String),

    #[error("fetch task failed: {0}")]
    Join(#[from] JoinError),
}

/// A fetched and extracted page plus its raw outbound hrefs.
#[derive(Debug, Clone)]
pub struct FetchedPage {
    /// URL after redirects; relative hrefs resolve against this.
    pub final_url: Url,
    pub content: ExtractedContent,
    pub hrefs: Vec<String>,
}

// ---------------------------------------------------------------------------
// Frontier
// ---------------------------------------------------------------------------

/// Visited set plus pending worklist for one crawl invocation.
struct Frontier {
    budget: CrawlBudget,
    visited: HashSet<String>,
    queue: VecDeque<(Url, u32)>,
}

impl Frontier {
    fn new(budget: CrawlBudget) -> Self {
        Self {
            budget,
            visited: HashSet::new(),
            queue: VecDeque::new(),
        }
    }

    fn is_visited(&self, url: &Url) -> bool {
        self.visited.contains(&normalize_url(url))
    }

    /// Record a redirect target. False if it was already known.
    fn mark_visited(&mut self, url: &Url) -> bool {
        self.visited.insert(normalize_url(url))
    }

    /// Schedule `url` unless already visited or deeper than the budget allows.
    fn schedule(&mut self, url: Url, depth: u32) -> bool {
        let key = normalize_url(&url);
        if self.visited.contains(&key) || depth > self.budget.max_depth {
            return false;
        }
        self.visited.insert(key);
        self.queue.push_back((url, depth));
        true
    }

    fn next_batch(&mut self, size: usize) -> Vec<(Url, u32)> {
        let take = self.queue.len().min(size);
        self.queue.drain(..take).collect()
    }
}

// ---------------------------------------------------------------------------
// Crawler
// ---------------------------------------------------------------------------

/// Documentation crawler. Holds no per-crawl state, so one instance can run
/// several crawls concurrently.
pub struct Crawler {
    config: CrawlConfig,
    client: Client,
    extractor: Arc<ContentExtractor>,
}

impl Crawler {
    /// Create a new crawler with the given configuration.
    pub fn new(config: CrawlConfig) -> Result<Self> {
        if config.user_agent.trim().is_empty() {
            return Err(DocSimplifierError::config("user_agent must not be empty"));
        }
        if config.concurrency == 0 {
            return Err(DocSimplifierError::config("concurrency must be at least 1"));
        }

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .redirect(reqwest::redirect::Policy::limited(5))
            .timeout(config.request_timeout)
            .build()
            .map_err(|e| DocSimplifierError::config(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            config,
            client,
            extractor: Arc::new(ContentExtractor::new()),
        })
    }

    /// Crawl from `start_url` within `budget`.
    ///
    /// Unreachable, non-HTML, or empty pages are skipped; the only errors are an
    /// invalid budget or a start URL that is not absolute HTTP(S). A start page
    /// that fails to load yields an empty page list.
    #[instrument(skip_all, fields(start_url = %start_url, max_depth = budget.max_depth, max_pages = budget.max_pages))]
    pub async fn crawl(
        &self,
        start_url: &str,
        budget: CrawlBudget,
        progress: &dyn ProgressReporter,
    ) -> Result<(CrawlResult, Vec<Page>)> {
        budget.validate()?;
        let start = parse_start_url(start_url)?;
        let started = Instant::now();

        let filter = LinkFilter::new(&start, &self.config.deny_list);
        let mut frontier = Frontier::new(budget);
        frontier.schedule(start, 0);

        let mut pages: Vec<Page> = Vec::new();
        let mut result = CrawlResult::default();
        let mut first_batch = true;

        info!(
            concurrency = self.config.concurrency,
            batch_delay_ms = self.config.batch_delay.as_millis() as u64,
            "starting crawl"
        );

        while pages.len() < budget.max_pages {
            // Never put more fetches in flight than pages we may still keep
            let room = budget.max_pages - pages.len();
            let batch = frontier.next_batch(self.config.concurrency.min(room));
            if batch.is_empty() {
                break;
            }

            if !first_batch && !self.config.batch_delay.is_zero() {
                tokio::time::sleep(self.config.batch_delay).await;
            }
            first_batch = false;

            let handles: Vec<(Url, u32, JoinHandle<std::result::Result<FetchedPage, FetchError>>)> =
                batch
                    .into_iter()
                    .map(|(url, depth)| {
                        let client = self.client.clone();
                        let extractor = Arc::clone(&self.extractor);
                        let target = url.clone();
                        let handle = tokio::spawn(async move {
                            fetch_page(&client, &target, &extractor).await
                        });
                        (url, depth, handle)
                    })
                    .collect();

            for (url, depth, handle) in handles {
                let outcome = match handle.await {
                    Ok(fetched) => fetched,
                    Err(e) => Err(FetchError::from(e)),
                };

                let fetched = match outcome {
                    Ok(fetched) => fetched,
                    Err(e) => {
                        warn!(%url, error = %e, "fetch failed, skipping page");
                        result.errors.push((url.to_string(), e.to_string()));
                        continue;
                    }
                };

                let FetchedPage {
                    final_url,
                    content,
                    hrefs,
                } = fetched;

                // A redirect onto a page we already know would duplicate it
                let redirected = normalize_url(&final_url) != normalize_url(&url);
                if redirected && !frontier.mark_visited(&final_url) {
                    debug!(%url, %final_url, "redirected to a known page, dropping");
                    continue;
                }

                if depth < budget.max_depth {
                    self.schedule_children(&mut frontier, &filter, &final_url, &hrefs, depth);
                }

                let ExtractedContent { title, text } = content;
                if text.chars().count() < self.config.min_content_chars {
                    debug!(%url, chars = text.chars().count(), "too little content, dropping page");
                    result.pages_skipped += 1;
                    continue;
                }

                if pages.len() >= budget.max_pages {
                    break;
                }

                debug!(%url, depth, %title, "page kept");
                let message = if title.is_empty() {
                    format!("Fetched {url}")
                } else {
                    format!("Fetched {title}")
                };
                pages.push(Page {
                    url: normalize_url(&final_url),
                    title,
                    content: text,
                    depth,
                });
                progress.report(percent_of(pages.len(), budget.max_pages), &message);
            }
        }

        result.pages_fetched = pages.len();
        result.duration = started.elapsed();

        info!(
            pages_fetched = result.pages_fetched,
            pages_skipped = result.pages_skipped,
            errors = result.errors.len(),
            duration_ms = result.duration.as_millis() as u64,
            "crawl completed"
        );

        Ok((result, pages))
    }

    /// Queue up to `max_links_per_page` unvisited eligible links, in lexicographic order.
    fn schedule_children(
        &self,
        frontier: &mut Frontier,
        filter: &LinkFilter,
        page_url: &Url,
        hrefs: &[String],
        depth: u32,
    ) {
        let candidates: BTreeMap<String, Url> = hrefs
            .iter()
            .filter_map(|href| filter.resolve(href, page_url))
            .filter(|link| !frontier.is_visited(link))
            .map(|link| (normalize_url(&link), link))
            .collect();

        let mut scheduled = 0;
        for (_, link) in candidates.into_iter().take(self.config.max_links_per_page) {
            if frontier.schedule(link, depth + 1) {
                scheduled += 1;
            }
        }
        debug!(%page_url, scheduled, "links scheduled");
    }
}

fn parse_start_url(start_url: &str) -> Result<Url> {
    let url = Url::parse(start_url.trim())
        .map_err(|e| DocSimplifierError::validation(format!("invalid start URL '{start_url}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(DocSimplifierError::validation(format!(
            "unsupported URL scheme '{other}' (expected http or https)"
        ))),
    }
}

fn percent_of(done: usize, total: usize) -> u8 {
    (done.saturating_mul(100) / total.max(1)).min(100) as u8
}

// ---------------------------------------------------------------------------
// Page fetching
// ---------------------------------------------------------------------------

/// Fetch one URL and extract its content. No retries.
async fn fetch_page(
    client: &Client,
    url: &Url,
    extractor: &ContentExtractor,
) -> std::result::Result<FetchedPage, FetchError> {
    debug!(%url, "fetching page");

    let response = client.get(url.as_str()).send().await?;

    let status = response.status();
    if !status.is_success() {
        return Err(FetchError::Status(status));
    }

    let content_type = response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_ascii_lowercase();
    if !is_html(&content_type) {
        return Err(FetchError::NotHtml(content_type));
    }

    let final_url = response.url().clone();
    let body = response.text().await?;
    Ok(parse_page(final_url, &body, extractor))
}

fn is_html(content_type: &str) -> bool {
    content_type.contains("text/html") || content_type.contains("application/xhtml+xml")
}

/// Synchronous parse step; the DOM never lives across an await point.
fn parse_page(final_url: Url, body: &str, extractor: &ContentExtractor) -> FetchedPage {
    let doc = Html::parse_document(body);
    FetchedPage {
        final_url,
        content: extractor.extract(&doc),
        hrefs: extract_hrefs(&doc),
    }
}

/// Raw `href` values of every anchor, in document order.
fn extract_hrefs(doc: &Html) -> Vec<String> {
    static LINKS: LazyLock<Selector> =
        LazyLock::new(|| Selector::parse("a[href]").expect("valid selector"));

    doc.select(&LINKS)
        .filter_map(|el| el.value().attr("href"))
        .map(str::to_string)
        .collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use docsimplifier_shared::SilentProgress;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    use super::*;

    fn test_config() -> CrawlConfig {
        CrawlConfig {
            batch_delay: Duration::ZERO,
            request_timeout: Duration::from_secs(5),
            max_links_per_page: 10,
            ..CrawlConfig::default()
        }
    }

    fn budget(max_depth: u32, max_pages: usize) -> CrawlBudget {
        CrawlBudget::new(max_depth, max_pages).unwrap()
    }

    /// A page with enough prose to clear the content threshold.
    fn doc_page(heading: &str, links: &[&str]) -> String {
        let anchors: String = links
            .iter()
            .map(|href| format!(r#"<a href="{href}">{href}</a>"#))
            .collect();
        format!(
            "<html><head><title>{heading}</title></head><body><main>\
             <h1>{heading}</h1>\
             <p>This section of the {heading} guide explains the concepts in enough detail \
             to be useful, covering configuration, usage, and common pitfalls.</p>\
             <p>{anchors}</p></main></body></html>"
        )
    }

    async fn mount_html(server: &MockServer, route: &str, body: String) {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/html"))
            .mount(server)
            .await;
    }

    #[test]
    fn frontier_marks_visited_on_schedule() {
        let mut frontier = Frontier::new(budget(1, 5));
        let url = Url::parse("https://docs.example.com/guide/").unwrap();
        assert!(frontier.schedule(url.clone(), 0));

        let same = Url::parse("https://docs.example.com/guide#intro").unwrap();
        assert!(!frontier.schedule(same, 1));

        let deep = Url::parse("https://docs.example.com/deep").unwrap();
        assert!(!frontier.schedule(deep.clone(), 2));
        assert!(!frontier.is_visited(&deep));

        assert_eq!(frontier.next_batch(5).len(), 1);
    }

    #[test]
    fn extract_hrefs_keeps_document_order() {
        let doc = Html::parse_document(
            r##"<html><body><a href="/b">B</a><a>none</a><a href="#top">Top</a><a href="a">A</a></body></html>"##,
        );
        assert_eq!(extract_hrefs(&doc), vec!["/b", "#top", "a"]);
    }

    #[test]
    fn percent_is_clamped() {
        assert_eq!(percent_of(1, 4), 25);
        assert_eq!(percent_of(9, 4), 100);
    }

    #[test]
    fn rejects_unusable_config() {
        let no_agent = CrawlConfig {
            user_agent: "  ".into(),
            ..test_config()
        };
        assert!(Crawler::new(no_agent).is_err());

        let no_workers = CrawlConfig {
            concurrency: 0,
            ..test_config()
        };
        assert!(Crawler::new(no_workers).is_err());
    }

    #[tokio::test]
    async fn rejects_invalid_start_url() {
        let crawler = Crawler::new(test_config()).unwrap();
        assert!(crawler.crawl("not a url", budget(1, 1), &SilentProgress).await.is_err());
        assert!(crawler.crawl("ftp://example.com/", budget(1, 1), &SilentProgress).await.is_err());
    }

    #[tokio::test]
    async fn getting_started_page_is_extracted() {
        let server = MockServer::start().await;
        let body = "<html><head><title>Getting Started</title></head><body><main>\
            <h1>Welcome</h1>\
            <p>Install the command line tool, create a project directory, and run the init \
            command to generate a configuration file for your first build.</p>\
            </main></body></html>";
        mount_html(&server, "/", body.to_string()).await;

        let crawler = Crawler::new(test_config()).unwrap();
        let (result, pages) = crawler
            .crawl(&server.uri(), budget(1, 5), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.pages_fetched, 1);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].title, "Getting Started");
        assert_eq!(pages[0].depth, 0);
        assert!(pages[0].content.lines().any(|l| l == "## Welcome"));
    }

    #[tokio::test]
    async fn isolated_page_yields_one_page() {
        let server = MockServer::start().await;
        mount_html(
            &server,
            "/",
            doc_page("Overview", &["https://elsewhere.example.org/docs", "#anchor"]),
        )
        .await;

        let crawler = Crawler::new(test_config()).unwrap();
        let (_, pages) = crawler
            .crawl(&server.uri(), budget(2, 10), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(pages.len(), 1);
    }

    #[tokio::test]
    async fn respects_depth() {
        let server = MockServer::start().await;
        mount_html(&server, "/", doc_page("Root", &["/page2"])).await;
        mount_html(&server, "/page2", doc_page("Page Two", &["/page3"])).await;
        mount_html(&server, "/page3", doc_page("Page Three", &[])).await;

        let crawler = Crawler::new(test_config()).unwrap();
        let (_, pages) = crawler
            .crawl(&server.uri(), budget(1, 10), &SilentProgress)
            .await
            .unwrap();

        // Root (depth 0) and page2 (depth 1), but not page3 (depth 2)
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[0].depth, 0);
        assert_eq!(pages[1].title, "Page Two");
        assert!(pages.iter().all(|p| p.depth <= 1));
    }

    #[tokio::test]
    async fn respects_page_budget() {
        let server = MockServer::start().await;
        mount_html(&server, "/", doc_page("Index", &["/a", "/b", "/c", "/d", "/e"])).await;
        for route in ["/a", "/b", "/c", "/d", "/e"] {
            mount_html(&server, route, doc_page(route, &[])).await;
        }

        struct Recorder(Mutex<Vec<u8>>);
        impl ProgressReporter for Recorder {
            fn report(&self, percent: u8, _message: &str) {
                self.0.lock().unwrap().push(percent);
            }
        }
        let recorder = Recorder(Mutex::new(Vec::new()));

        let crawler = Crawler::new(test_config()).unwrap();
        let (_, pages) = crawler
            .crawl(&server.uri(), budget(3, 3), &recorder)
            .await
            .unwrap();

        assert_eq!(pages.len(), 3);
        // Children are visited in lexicographic order
        assert!(pages[1].url.ends_with("/a"));
        assert!(pages[2].url.ends_with("/b"));
        assert_eq!(recorder.0.lock().unwrap().as_slice(), &[33, 66, 100]);
    }

    #[tokio::test]
    async fn link_cap_limits_children() {
        let server = MockServer::start().await;
        mount_html(&server, "/", doc_page("Index", &["/a", "/b", "/c"])).await;
        for route in ["/a", "/b", "/c"] {
            mount_html(&server, route, doc_page(route, &[])).await;
        }

        let config = CrawlConfig {
            max_links_per_page: 2,
            ..test_config()
        };
        let crawler = Crawler::new(config).unwrap();
        let (_, pages) = crawler
            .crawl(&server.uri(), budget(1, 10), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(pages.len(), 3);
        assert!(!pages.iter().any(|p| p.url.ends_with("/c")));
    }

    #[tokio::test]
    async fn each_url_fetched_once() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_raw(doc_page("Home", &["/page2", "/page2#setup"]), "text/html"),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/page2"))
            .respond_with(
                ResponseTemplate::new(200).set_body_raw(doc_page("Two", &["/", "/page2"]), "text/html"),
            )
            .expect(1)
            .mount(&server)
            .await;

        let crawler = Crawler::new(test_config()).unwrap();
        let (_, pages) = crawler
            .crawl(&server.uri(), budget(5, 10), &SilentProgress)
            .await
            .unwrap();
        assert_eq!(pages.len(), 2);
    }

    #[tokio::test]
    async fn depth_zero_fetches_only_start() {
        let server = MockServer::start().await;
        mount_html(&server, "/", doc_page("Home", &["/guide", "/api"])).await;
        Mock::given(method("GET"))
            .and(path("/guide"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(doc_page("Guide", &[]), "text/html"))
            .expect(0)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/api"))
            .respond_with(ResponseTemplate::new(200).set_body_raw(doc_page("API", &[]), "text/html"))
            .expect(0)
            .mount(&server)
            .await;

        let crawler = Crawler::new(test_config()).unwrap();
        let (result, pages) = crawler
            .crawl(&server.uri(), budget(0, 10), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].depth, 0);
        assert_eq!(pages[0].title, "Home");
        assert_eq!(result.pages_fetched, 1);
    }

    #[tokio::test]
    async fn follows_redirect_before_resolving_links() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/docs"))
            .respond_with(ResponseTemplate::new(301).insert_header("Location", "/docs/"))
            .mount(&server)
            .await;
        mount_html(&server, "/docs/", doc_page("Docs", &["intro"])).await;
        mount_html(&server, "/docs/intro", doc_page("Intro", &[])).await;

        let crawler = Crawler::new(test_config()).unwrap();
        let (result, pages) = crawler
            .crawl(&format!("{}/docs", server.uri()), budget(1, 10), &SilentProgress)
            .await
            .unwrap();

        assert!(result.errors.is_empty(), "{:?}", result.errors);
        assert_eq!(pages.len(), 2);
        assert_eq!(pages[1].title, "Intro");
        assert!(pages[1].url.ends_with("/docs/intro"), "{}", pages[1].url);
    }

    #[tokio::test]
    async fn redirect_onto_known_page_is_not_duplicated() {
        let server = MockServer::start().await;
        mount_html(&server, "/", doc_page("Home", &["/guide", "/old-guide"])).await;
        mount_html(&server, "/guide", doc_page("Guide", &[])).await;
        Mock::given(method("GET"))
            .and(path("/old-guide"))
            .respond_with(ResponseTemplate::new(301).insert_header("Location", "/guide"))
            .mount(&server)
            .await;

        let crawler = Crawler::new(test_config()).unwrap();
        let (_, pages) = crawler
            .crawl(&server.uri(), budget(1, 10), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(pages.iter().filter(|p| p.title == "Guide").count(), 1);
    }

    #[tokio::test]
    async fn failed_pages_do_not_abort_traversal() {
        let server = MockServer::start().await;
        mount_html(&server, "/", doc_page("Index", &["/data", "/missing", "/ok"])).await;
        Mock::given(method("GET"))
            .and(path("/data"))
            .respond_with(ResponseTemplate::new(200).set_body_string("plain text, not html"))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        mount_html(&server, "/ok", doc_page("Fine", &[])).await;

        let crawler = Crawler::new(test_config()).unwrap();
        let (result, pages) = crawler
            .crawl(&server.uri(), budget(1, 10), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(pages.len(), 2);
        assert_eq!(result.errors.len(), 2);
        assert!(result.errors.iter().any(|(_, e)| e.contains("404")));
    }

    #[tokio::test]
    async fn thin_pages_are_dropped_but_followed() {
        let server = MockServer::start().await;
        mount_html(
            &server,
            "/",
            r#"<html><body><main><p>Short landing.</p><a href="/guide">Guide</a></main></body></html>"#
                .to_string(),
        )
        .await;
        mount_html(&server, "/guide", doc_page("Guide", &[])).await;

        let crawler = Crawler::new(test_config()).unwrap();
        let (result, pages) = crawler
            .crawl(&server.uri(), budget(1, 10), &SilentProgress)
            .await
            .unwrap();

        assert_eq!(result.pages_skipped, 1);
        assert_eq!(pages.len(), 1);
        assert_eq!(pages[0].depth, 1);
    }

    #[tokio::test]
    async fn unreachable_start_returns_empty() {
        let server = MockServer::start().await;

        let crawler = Crawler::new(test_config()).unwrap();
        let (result, pages) = crawler
            .crawl(&server.uri(), budget(2, 5), &SilentProgress)
            .await
            .unwrap();
        assert!(pages.is_empty());
        assert_eq!(result.errors.len(), 1);
    }
}
