//! DocSimplifier CLI: turn a documentation site into clean, sized chunks.
//!
//! Crawls a bounded set of same-origin pages, strips UI noise and repeated
//! text, and splits the result for a downstream text generator.

mod commands;

use clap::Parser;
use color_eyre::eyre::Result;

use commands::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    color_eyre::install()?;
    let cli = Cli::parse();
    commands::init_tracing(&cli);
    commands::run(cli).await
}
