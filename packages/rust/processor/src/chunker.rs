//! Budget-aware document splitting with context overlap.
//!
//! Splits prefer section boundaries (`#`/`##` headers), fall back to paragraphs
//! (blank lines), and finally to sentences. Sizes are measured in characters;
//! tokens are approximated as `chars / 4`.

use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, instrument};

use docsimplifier_shared::ChunkConfig;

/// Rough characters-per-token ratio for budget estimates.
pub const CHARS_PER_TOKEN: usize = 4;

const UNIT_SEPARATOR: &str = "\n\n";
const SENTENCE_SEPARATOR: &str = " ";

static SECTION_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?m)^#{1,2}[ \t]").expect("valid regex"));
static PARAGRAPH_BREAK_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\n[ \t]*\n").expect("valid regex"));
static SENTENCE_END_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[.!?]\s+").expect("valid regex"));

/// One chunk plus the length of its prefix repeated from the previous chunk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Chunk {
    pub text: String,
    /// Byte length of the repeated prefix, separator included. Zero when unseeded.
    pub overlap: usize,
}

impl Chunk {
    /// The chunk without its repeated prefix.
    pub fn body(&self) -> &str {
        &self.text[self.overlap..]
    }
}

/// Approximate token count.
pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count() / CHARS_PER_TOKEN
}

/// Positional header for chunk `index` of `total`; empty for a single chunk.
pub fn context_header(index: usize, total: usize) -> String {
    if total <= 1 {
        return String::new();
    }
    format!("[This is part {} of {total} of the documentation]\n\n", index + 1)
}

#[derive(Debug, Clone)]
pub struct Chunker {
    max_chars: usize,
    overlap_chars: usize,
}

impl Default for Chunker {
    fn default() -> Self {
        Self::from(&ChunkConfig::default())
    }
}

impl From<&ChunkConfig> for Chunker {
    fn from(config: &ChunkConfig) -> Self {
        Self::new(config.max_tokens, config.overlap_tokens)
    }
}

impl Chunker {
    pub fn new(max_tokens: usize, overlap_tokens: usize) -> Self {
        Self {
            max_chars: (max_tokens * CHARS_PER_TOKEN).max(1),
            overlap_chars: overlap_tokens * CHARS_PER_TOKEN,
        }
    }

    pub fn max_chars(&self) -> usize {
        self.max_chars
    }

    pub fn overlap_chars(&self) -> usize {
        self.overlap_chars
    }

    /// Split `content` into ordered chunk strings.
    pub fn chunk_document(&self, content: &str) -> Vec<String> {
        self.split(content).into_iter().map(|c| c.text).collect()
    }

    /// Split `content`, keeping overlap bookkeeping.
    #[instrument(skip_all, fields(len = content.len(), max_chars = self.max_chars))]
    pub fn split(&self, content: &str) -> Vec<Chunk> {
        if char_len(content) <= self.max_chars {
            return vec![Chunk {
                text: content.to_string(),
                overlap: 0,
            }];
        }

        let mut chunks = self.split_by_sections(content);
        if chunks.is_empty() {
            chunks = self.split_by_paragraphs(content);
        }

        debug!(chunks = chunks.len(), "document chunked");
        chunks
    }

    /// Empty when the document has no `#`/`##` headers to split on.
    fn split_by_sections(&self, content: &str) -> Vec<Chunk> {
        let mut starts: Vec<usize> = SECTION_START_RE
            .find_iter(content)
            .map(|m| m.start())
            .collect();
        if starts.is_empty() {
            return Vec::new();
        }
        if starts[0] != 0 {
            starts.insert(0, 0);
        }
        starts.push(content.len());

        let mut acc = Accumulator::new(self.max_chars, self.overlap_chars, UNIT_SEPARATOR);
        for window in starts.windows(2) {
            let section = content[window[0]..window[1]].trim();
            if section.is_empty() {
                continue;
            }
            if char_len(section) > self.max_chars {
                acc.splice(self.split_by_paragraphs(section));
            } else {
                acc.push(section);
            }
        }
        acc.finish()
    }

    fn split_by_paragraphs(&self, content: &str) -> Vec<Chunk> {
        let mut acc = Accumulator::new(self.max_chars, self.overlap_chars, UNIT_SEPARATOR);
        for para in PARAGRAPH_BREAK_RE.split(content).map(str::trim) {
            if para.is_empty() {
                continue;
            }
            if char_len(para) > self.max_chars {
                acc.splice(self.split_by_sentences(para));
            } else {
                acc.push(para);
            }
        }
        acc.finish()
    }

    /// Sentence pieces are never seeded with overlap; a single sentence over
    /// budget becomes its own chunk.
    fn split_by_sentences(&self, para: &str) -> Vec<Chunk> {
        let mut acc = Accumulator::new(self.max_chars, 0, SENTENCE_SEPARATOR);
        for sentence in split_sentences(para) {
            acc.push(sentence);
        }
        acc.finish()
    }
}

// ---------------------------------------------------------------------------
// Accumulate-and-flush
// ---------------------------------------------------------------------------

struct Accumulator {
    max_chars: usize,
    overlap_chars: usize,
    separator: &'static str,
    chunks: Vec<Chunk>,
    current: String,
    current_chars: usize,
    current_overlap: usize,
    /// The running chunk began as the last piece of a forced sub-split.
    current_from_split: bool,
}

impl Accumulator {
    fn new(max_chars: usize, overlap_chars: usize, separator: &'static str) -> Self {
        Self {
            max_chars,
            overlap_chars,
            separator,
            chunks: Vec::new(),
            current: String::new(),
            current_chars: 0,
            current_overlap: 0,
            current_from_split: false,
        }
    }

    fn push(&mut self, unit: &str) {
        let unit_chars = char_len(unit);
        let sep_chars = self.separator.len();

        if self.current.is_empty() {
            self.start(unit, unit_chars);
            return;
        }

        if self.current_chars + sep_chars + unit_chars <= self.max_chars {
            self.current.push_str(self.separator);
            self.current.push_str(unit);
            self.current_chars += sep_chars + unit_chars;
            return;
        }

        match self.close() {
            Some(seed) if char_len(&seed) + sep_chars + unit_chars <= self.max_chars => {
                self.current_overlap = seed.len() + self.separator.len();
                self.current_chars = char_len(&seed) + sep_chars + unit_chars;
                self.current = seed;
                self.current.push_str(self.separator);
                self.current.push_str(unit);
            }
            _ => self.start(unit, unit_chars),
        }
    }

    /// Splice in the pieces of an oversized unit. All but the last piece are
    /// closed; the last becomes the running chunk.
    fn splice(&mut self, mut pieces: Vec<Chunk>) {
        // The first piece starts at a natural boundary, so the seed is dropped
        self.close();

        if let Some(last) = pieces.pop() {
            self.chunks.extend(pieces);
            self.current_chars = char_len(&last.text);
            self.current_overlap = last.overlap;
            self.current = last.text;
            self.current_from_split = true;
        }
    }

    fn finish(mut self) -> Vec<Chunk> {
        self.close();
        self.chunks
    }

    fn start(&mut self, unit: &str, unit_chars: usize) {
        self.current = unit.to_string();
        self.current_chars = unit_chars;
        self.current_overlap = 0;
        self.current_from_split = false;
    }

    /// Close the running chunk. Returns the overlap seed for the next chunk,
    /// unless overlap is disabled or the closed chunk came from a sub-split.
    fn close(&mut self) -> Option<String> {
        if self.current.is_empty() {
            return None;
        }

        let text = std::mem::take(&mut self.current);
        let seed = (self.overlap_chars > 0 && !self.current_from_split)
            .then(|| tail_chars(&text, self.overlap_chars).to_string());

        self.chunks.push(Chunk {
            text,
            overlap: self.current_overlap,
        });
        self.current_chars = 0;
        self.current_overlap = 0;
        self.current_from_split = false;

        seed
    }
}

fn char_len(text: &str) -> usize {
    text.chars().count()
}

/// The last `n` characters of `text` (all of it if shorter). `n` must be > 0.
fn tail_chars(text: &str, n: usize) -> &str {
    match text.char_indices().rev().nth(n - 1) {
        Some((idx, _)) => &text[idx..],
        None => text,
    }
}

/// Split after `.`, `!`, or `?` followed by whitespace.
fn split_sentences(text: &str) -> Vec<&str> {
    let mut sentences = Vec::new();
    let mut start = 0;

    for m in SENTENCE_END_RE.find_iter(text) {
        sentences.push(text[start..m.start() + 1].trim());
        start = m.end();
    }
    sentences.push(text[start..].trim());

    sentences.retain(|s| !s.is_empty());
    sentences
}

#[cfg(test)]
mod tests {
    use super::*;

    fn normalize(text: &str) -> String {
        text.split_whitespace().collect::<Vec<_>>().join(" ")
    }

    /// Joined chunk bodies must reproduce the document up to whitespace.
    fn assert_lossless(chunks: &[Chunk], document: &str) {
        let rebuilt = chunks.iter().map(Chunk::body).collect::<Vec<_>>().join(" ");
        assert_eq!(normalize(&rebuilt), normalize(document));
    }

    fn sample_document() -> String {
        let mut doc = String::new();
        for section in 1..=6 {
            doc.push_str(&format!("# Section {section}\n\n"));
            for para in 1..=3 {
                doc.push_str(&format!(
                    "Paragraph {para} of section {section} explains one idea. \
                     It adds a second sentence for detail! Does it end here? Yes.\n\n"
                ));
            }
        }
        doc
    }

    #[test]
    fn small_document_is_one_identical_chunk() {
        let chunker = Chunker::new(100, 10);
        let doc = "# Title\n\nShort body.\n";
        assert_eq!(chunker.chunk_document(doc), vec![doc.to_string()]);
    }

    #[test]
    fn chunks_respect_budget_and_reassemble() {
        let chunker = Chunker::new(80, 10);
        let doc = sample_document();
        let chunks = chunker.split(&doc);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert!(char_len(&chunk.text) <= chunker.max_chars(), "{chunk:?}");
        }
        assert_lossless(&chunks, &doc);
    }

    #[test]
    fn overlap_repeats_previous_tail() {
        let chunker = Chunker::new(80, 10);
        let chunks = chunker.split(&sample_document());

        let seeded: Vec<usize> = (1..chunks.len()).filter(|&i| chunks[i].overlap > 0).collect();
        assert!(!seeded.is_empty());
        for i in seeded {
            let prefix = &chunks[i].text[..chunks[i].overlap];
            let repeated = prefix.strip_suffix(UNIT_SEPARATOR).unwrap();
            assert_eq!(char_len(repeated), chunker.overlap_chars());
            assert!(chunks[i - 1].text.ends_with(repeated));
        }
    }

    #[test]
    fn sections_split_on_headers() {
        let chunker = Chunker::new(20, 0);
        let doc = format!("# One\n\n{}\n\n## Two\n\n{}", "a".repeat(60), "b".repeat(60));
        let chunks = chunker.chunk_document(&doc);
        assert_eq!(chunks.len(), 2);
        assert!(chunks[0].starts_with("# One"));
        assert!(chunks[1].starts_with("## Two"));
    }

    #[test]
    fn paragraph_fallback_without_headers() {
        let chunker = Chunker::new(40, 0);
        let para = "This paragraph has exactly enough words to matter here.";
        let doc = [para; 5].join("\n\n");
        let chunks = chunker.chunk_document(&doc);

        assert_eq!(chunks.len(), 3);
        assert_eq!(chunks[0], format!("{para}\n\n{para}"));
        assert_eq!(chunks[2], para);
    }

    #[test]
    fn long_paragraph_splits_at_sentences() {
        let chunker = Chunker::new(10, 2);
        let doc = "One short sentence here. Another one follows it! Is this the third? \
                   The fourth sentence wraps things up.";
        let chunks = chunker.split(doc);

        assert!(chunks.len() > 1);
        for chunk in &chunks {
            assert_eq!(chunk.overlap, 0);
            assert!(chunk.text.ends_with(['.', '!', '?']), "{chunk:?}");
        }
        assert_lossless(&chunks, doc);
    }

    #[test]
    fn unsplittable_sentence_passes_through() {
        let chunker = Chunker::new(5, 0);
        let giant = format!("{} end.", "word ".repeat(20).trim_end());
        let doc = format!("Tiny. {giant} Tail.");
        let chunks = chunker.chunk_document(&doc);

        assert_eq!(chunks, vec!["Tiny.".to_string(), giant, "Tail.".to_string()]);
    }

    #[test]
    fn no_overlap_after_forced_sub_split() {
        let chunker = Chunker::new(25, 2);
        let doc = "# Alpha\n\nFirst sentence is here and it is fine. Second sentence is here \
                   and also fine. Third sentence closes the alpha section.\n\n\
                   # Beta\n\nBeta body text that is long enough to sit on its own.\n\n\
                   # Gamma\n\nGamma body text that also needs some room.";
        let chunks = chunker.split(doc);

        let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
        assert_eq!(
            texts,
            vec![
                "# Alpha",
                "First sentence is here and it is fine. Second sentence is here and also fine.",
                "Third sentence closes the alpha section.",
                "# Beta\n\nBeta body text that is long enough to sit on its own.",
                "its own.\n\n# Gamma\n\nGamma body text that also needs some room.",
            ]
        );
        // Beta follows a sub-split piece, so it is not seeded; Gamma is
        assert_eq!(chunks[3].overlap, 0);
        assert_eq!(chunks[4].overlap, 10);
        assert_lossless(&chunks, doc);
    }

    #[test]
    fn tail_chars_respects_char_boundaries() {
        assert_eq!(tail_chars("héllo wörld", 5), "wörld");
        assert_eq!(tail_chars("abc", 10), "abc");
    }

    #[test]
    fn token_helpers() {
        assert_eq!(estimate_tokens(&"x".repeat(400)), 100);
        assert_eq!(context_header(0, 1), "");
        assert_eq!(
            context_header(1, 3),
            "[This is part 2 of 3 of the documentation]\n\n"
        );
    }
}
