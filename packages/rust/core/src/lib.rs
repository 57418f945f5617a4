//! End-to-end pipeline orchestration for DocSimplifier.
//!
//! This crate ties together crawling, cleaning, and chunking into a single
//! `simplify` call.

pub mod pipeline;

pub use pipeline::{PipelineConfig, PipelineOutput, simplify};
