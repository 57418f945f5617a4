//! Text processing over crawled pages: cleaning, chunking, and a keyword scan.
//!
//! - [`cleaner`]: noise stripping, page merging, deduplication, code-block shortening
//! - [`chunker`]: budget-aware splitting with context overlap
//! - [`insights`]: coarse facts about what the documentation covers

pub mod chunker;
pub mod cleaner;
pub mod insights;

pub use chunker::{CHARS_PER_TOKEN, Chunk, Chunker, context_header, estimate_tokens};
pub use cleaner::{clean_content, clean_text, remove_duplicates, simplify_code_blocks};
pub use insights::{KeyInfo, extract_key_info};
