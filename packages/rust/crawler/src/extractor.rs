//! Structure-preserving text extraction from arbitrary documentation HTML.
//!
//! Boilerplate is stripped from a private copy of the document, a main-content
//! root is chosen by readability heuristics, and block elements are emitted in
//! document order as lightweight Markdown-ish lines.

use std::sync::LazyLock;

use scraper::{ElementRef, Html, Selector};

/// Elements that never carry documentation content.
const CHROME_SELECTOR: &str = "script, style, noscript, template, svg, iframe, nav, header, \
     footer, aside, .sidebar, .nav, .navbar, .toc, [role=\"navigation\"], [role=\"banner\"], \
     [role=\"contentinfo\"]";

/// Main-content candidates, most specific first. `<body>` is the fallback.
const ROOT_SELECTORS: &[&str] = &[
    "main",
    "article",
    "[role=\"main\"]",
    ".content",
    ".documentation",
    "#content",
];

const BLOCK_SELECTOR: &str = "h1, h2, h3, h4, h5, h6, p, li, pre, code";

/// Code longer than this is assumed to be embedded data, not an example.
pub const DEFAULT_CODE_CEILING: usize = 500;

static CHROME: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(CHROME_SELECTOR).expect("valid selector"));
static BLOCKS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(BLOCK_SELECTOR).expect("valid selector"));
static ROOTS: LazyLock<Vec<Selector>> = LazyLock::new(|| {
    ROOT_SELECTORS
        .iter()
        .map(|s| Selector::parse(s).expect("valid selector"))
        .collect()
});
static TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("title").expect("valid selector"));
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").expect("valid selector"));
static BODY: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("body").expect("valid selector"));

/// Title and text pulled from one page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    pub title: String,
    pub text: String,
}

/// Heuristic main-content extractor.
#[derive(Debug, Clone)]
pub struct ContentExtractor {
    code_ceiling: usize,
}

impl Default for ContentExtractor {
    fn default() -> Self {
        Self {
            code_ceiling: DEFAULT_CODE_CEILING,
        }
    }
}

impl ContentExtractor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_code_ceiling(mut self, chars: usize) -> Self {
        self.code_ceiling = chars;
        self
    }

    /// Extract title and text. `doc` is left untouched.
    pub fn extract(&self, doc: &Html) -> ExtractedContent {
        ExtractedContent {
            title: extract_title(doc),
            text: self.extract_text(doc),
        }
    }

    /// Emit the structured text of the main content area.
    pub fn extract_text(&self, doc: &Html) -> String {
        let mut working = doc.clone();
        strip_chrome(&mut working);

        let root = find_content_root(&working);
        let mut out = String::new();
        let mut prev_was_item = false;

        for el in root.select(&BLOCKS) {
            if inside_block(&el, &root) {
                continue;
            }

            let name = el.value().name();
            let is_item = name == "li";
            let rendered = match name {
                "pre" | "code" => {
                    let code = el.text().collect::<String>();
                    let code = code.trim();
                    if code.is_empty() || code.chars().count() >= self.code_ceiling {
                        continue;
                    }
                    format!("```\n{code}\n```")
                }
                _ => {
                    let text = collapse_text(&el);
                    if text.is_empty() {
                        continue;
                    }
                    match name {
                        "h1" | "h2" | "h3" | "h4" | "h5" | "h6" => format!("## {text}"),
                        "li" => format!("- {text}"),
                        _ => text,
                    }
                }
            };

            if !out.is_empty() {
                // Consecutive list items stay in one paragraph
                out.push_str(if is_item && prev_was_item { "\n" } else { "\n\n" });
            }
            out.push_str(&rendered);
            prev_was_item = is_item;
        }

        out
    }
}

/// `<title>`, else the first `<h1>`, else empty.
pub fn extract_title(doc: &Html) -> String {
    let from_title = doc
        .select(&TITLE)
        .next()
        .map(|el| collapse_text(&el))
        .filter(|t| !t.is_empty());

    from_title
        .or_else(|| {
            doc.select(&H1)
                .next()
                .map(|el| collapse_text(&el))
                .filter(|t| !t.is_empty())
        })
        .unwrap_or_default()
}

/// Detach every chrome element from the working copy.
fn strip_chrome(doc: &mut Html) {
    let ids: Vec<_> = doc.select(&CHROME).map(|el| el.id()).collect();
    for id in ids {
        if let Some(mut node) = doc.tree.get_mut(id) {
            node.detach();
        }
    }
}

/// Selects through the tree rather than `Html::select`, which would still
/// visit detached chrome nodes.
fn find_content_root(doc: &Html) -> ElementRef<'_> {
    let html = doc.root_element();
    ROOTS
        .iter()
        .find_map(|sel| html.select(sel).next())
        .or_else(|| html.select(&BODY).next())
        .unwrap_or(html)
}

/// True when an ancestor below `root` is itself an emitted block, whose text
/// already covers this element.
fn inside_block(el: &ElementRef<'_>, root: &ElementRef<'_>) -> bool {
    el.ancestors()
        .take_while(|node| node.id() != root.id())
        .filter_map(ElementRef::wrap)
        .any(|ancestor| {
            matches!(
                ancestor.value().name(),
                "h1" | "h2" | "h3" | "h4" | "h5" | "h6" | "p" | "li" | "pre" | "code"
            )
        })
}

/// Element text with all whitespace runs collapsed to single spaces.
fn collapse_text(el: &ElementRef<'_>) -> String {
    el.text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}
