//! Per-page noise stripping, page merging, and cross-page deduplication.
//!
//! Each pass is a function `&str -> String` applied in sequence, so every
//! stage can be tested on its own.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use sha2::{Digest, Sha256};
use tracing::{debug, instrument};

use docsimplifier_shared::Page;

/// Separator placed between pages in the merged document.
pub const PAGE_SEPARATOR: &str = "\n\n---\n\n";

/// Header text for a page without a title. A bare `# ` would not survive a
/// second cleaning pass unchanged.
pub const UNTITLED_PAGE: &str = "Untitled Document";

/// Cleaned pages at or below this many characters are dropped.
const MIN_PAGE_CHARS: usize = 100;

/// Lines shorter than this are usually nav or button labels.
const MIN_LINE_CHARS: usize = 21;

/// Paragraphs shorter than this are never deduplicated.
const MIN_DEDUP_CHARS: usize = 50;

// ---------------------------------------------------------------------------
// Noise rules
// ---------------------------------------------------------------------------

/// One UI-noise pattern. Matched case-insensitively; `.` also matches newlines.
#[derive(Debug, Clone, Copy)]
pub struct NoiseRule {
    pub pattern: &'static str,
    pub intent: &'static str,
}

/// Applied in order.
pub const NOISE_RULES: &[NoiseRule] = &[
    NoiseRule {
        pattern: r"Cookie.*?(?:policy|consent|preferences)",
        intent: "cookie and consent banners",
    },
    NoiseRule {
        pattern: r"Subscribe.*?newsletter",
        intent: "newsletter prompts",
    },
    NoiseRule {
        pattern: r"Follow us on.*?(?:Twitter|Facebook|LinkedIn)",
        intent: "social follow prompts",
    },
    NoiseRule {
        pattern: r"Share this.*?(?:article|page)",
        intent: "share widgets",
    },
    NoiseRule {
        pattern: r"Was this.*?helpful\??",
        intent: "feedback widgets",
    },
    NoiseRule {
        pattern: r"(?:Previous|Next) (?:article|page)",
        intent: "pagination links",
    },
    NoiseRule {
        pattern: r"Table of contents",
        intent: "table-of-contents label",
    },
    NoiseRule {
        pattern: r"On this page",
        intent: "in-page TOC label",
    },
    NoiseRule {
        pattern: r"Skip to.*?content",
        intent: "skip links",
    },
    NoiseRule {
        pattern: r"Edit this page.*?GitHub",
        intent: "edit-this-page links",
    },
    NoiseRule {
        pattern: r"Last updated:.*?\d{4}",
        intent: "last-updated stamps",
    },
    NoiseRule {
        pattern: r"Reading time:.*?min",
        intent: "reading-time estimates",
    },
];

static NOISE_PATTERNS: LazyLock<Vec<Regex>> = LazyLock::new(|| {
    NOISE_RULES
        .iter()
        .map(|rule| Regex::new(&format!("(?is){}", rule.pattern)).expect("valid regex"))
        .collect()
});

// ---------------------------------------------------------------------------
// Public entry points
// ---------------------------------------------------------------------------

/// Clean every page, merge them under `# <title>` headers, and drop repeated
/// long paragraphs across the whole document.
#[instrument(skip_all, fields(pages = pages.len()))]
pub fn clean_content(pages: &[Page]) -> String {
    let parts: Vec<String> = pages
        .iter()
        .filter_map(|page| {
            let body = clean_text(&page.content);
            if body.chars().count() <= MIN_PAGE_CHARS {
                debug!(url = %page.url, "page too short after cleaning, dropped");
                return None;
            }
            let title = match page.title.trim() {
                "" => UNTITLED_PAGE,
                title => title,
            };
            Some(format!("# {title}\n\n{body}"))
        })
        .collect();

    let combined = parts.join(PAGE_SEPARATOR);
    let deduped = remove_duplicates(&combined);

    debug!(
        kept_pages = parts.len(),
        combined_len = combined.len(),
        final_len = deduped.len(),
        "content cleaned"
    );

    deduped
}

/// Clean a single page's text.
pub fn clean_text(text: &str) -> String {
    let mut result = strip_noise(text);
    result = filter_lines(&result);
    result = clean_blank_lines(&result);
    result.trim().to_string()
}

/// Keep the first occurrence of each long paragraph (case-insensitive).
pub fn remove_duplicates(text: &str) -> String {
    let mut seen: HashSet<String> = HashSet::new();

    text.split("\n\n")
        .filter(|para| {
            let normalized = para.trim().to_lowercase();
            normalized.chars().count() < MIN_DEDUP_CHARS || seen.insert(fingerprint(&normalized))
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Shrink fenced code blocks: over 10 lines becomes a one-line summary, 6–10
/// lines keeps a 3-line preview, 5 or fewer stays as is.
pub fn simplify_code_blocks(text: &str) -> String {
    static CODE_BLOCK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"(?s)```[\w-]*\n(.*?)```").expect("valid regex"));

    CODE_BLOCK_RE
        .replace_all(text, |caps: &Captures| {
            let lines: Vec<&str> = caps[1].trim().split('\n').collect();
            let count = lines.len();

            if count > 10 {
                format!("\n[Code example with {count} lines]\n")
            } else if count > 5 {
                format!(
                    "```\n{}\n... ({} more lines)\n```",
                    lines[..3].join("\n"),
                    count - 3
                )
            } else {
                caps[0].to_string()
            }
        })
        .into_owned()
}

// ---------------------------------------------------------------------------
// Passes
// ---------------------------------------------------------------------------

/// Noise rules apply one paragraph at a time, so a match can span soft line
/// breaks but never a blank line or a page separator.
fn strip_noise(text: &str) -> String {
    static PARAGRAPH_BREAK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n[ \t]*\n").expect("valid regex"));

    let mut out = String::with_capacity(text.len());
    let mut last = 0;
    for brk in PARAGRAPH_BREAK_RE.find_iter(text) {
        out.push_str(&strip_noise_in_paragraph(&text[last..brk.start()]));
        out.push_str(brk.as_str());
        last = brk.end();
    }
    out.push_str(&strip_noise_in_paragraph(&text[last..]));
    out
}

fn strip_noise_in_paragraph(para: &str) -> String {
    NOISE_PATTERNS
        .iter()
        .fold(para.to_string(), |acc, re| re.replace_all(&acc, "").into_owned())
}

/// Collapse horizontal whitespace and drop short non-structural lines.
/// Lines inside fenced code blocks pass through untouched.
fn filter_lines(text: &str) -> String {
    static HSPACE_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"[ \t]{2,}|\t").expect("valid regex"));

    let mut kept: Vec<String> = Vec::new();
    let mut in_code_block = false;

    for raw in text.lines() {
        let line = HSPACE_RE.replace_all(raw, " ");
        let line = line.trim();

        if is_fence(line) {
            in_code_block = !in_code_block;
            kept.push(line.to_string());
            continue;
        }

        if in_code_block {
            kept.push(raw.trim_end().to_string());
            continue;
        }

        // Bare bullets left behind by stripped nav links
        if line == "-" || line == "•" {
            continue;
        }

        if line.is_empty() || is_structural(line) || line.chars().count() >= MIN_LINE_CHARS {
            kept.push(line.to_string());
        }
    }

    kept.join("\n")
}

/// Collapse runs of blank lines into exactly one.
fn clean_blank_lines(text: &str) -> String {
    static MULTI_BLANK_RE: LazyLock<Regex> =
        LazyLock::new(|| Regex::new(r"\n{3,}").expect("valid regex"));

    MULTI_BLANK_RE.replace_all(text, "\n\n").into_owned()
}

fn is_fence(line: &str) -> bool {
    line.starts_with("```") || line.ends_with("```")
}

/// Headers, list items, and page separators survive regardless of length.
fn is_structural(line: &str) -> bool {
    line.starts_with('#') || line.starts_with("- ") || line == "---"
}

fn fingerprint(normalized: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(normalized.as_bytes());
    format!("{:x}", hasher.finalize())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
