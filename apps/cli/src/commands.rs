//! CLI command definitions, routing, and tracing setup.

use std::path::{Path, PathBuf};

use clap::{Args, Parser, Subcommand};
use color_eyre::eyre::{Result, WrapErr};
use docsimplifier_core::{PipelineConfig, PipelineOutput, simplify};
use docsimplifier_crawler::Crawler;
use docsimplifier_shared::{AppConfig, CrawlConfig, ProgressReporter, init_config, load_config};
use indicatif::{ProgressBar, ProgressStyle};
use tracing::info;

// ---------------------------------------------------------------------------
// CLI structure
// ---------------------------------------------------------------------------

/// DocSimplifier: crawl a documentation site into clean, sized chunks.
#[derive(Parser)]
#[command(
    name = "docsimplifier",
    version,
    about = "Crawl a documentation site, clean it, and split it into LLM-sized chunks.",
    long_about = None,
)]
pub(crate) struct Cli {
    /// Log format: text (default) or json.
    #[arg(long, default_value = "text", global = true)]
    pub log_format: LogFormat,

    /// Verbosity level (-v, -vv).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

/// Log output format.
#[derive(Clone, Debug, clap::ValueEnum)]
pub(crate) enum LogFormat {
    Text,
    Json,
}

/// Result output format.
#[derive(Clone, Copy, Debug, PartialEq, Eq, clap::ValueEnum)]
pub(crate) enum OutputFormat {
    Text,
    Json,
}

/// Top-level CLI subcommands.
#[derive(Subcommand)]
pub(crate) enum Command {
    /// Crawl, clean, and chunk a documentation site.
    Simplify {
        /// Documentation URL to start from.
        url: String,

        #[command(flatten)]
        overrides: Overrides,

        /// Output format: text (headed chunks) or json (full result).
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,

        /// Write output to a file instead of stdout.
        #[arg(short, long)]
        out: Option<PathBuf>,
    },

    /// Crawl only and list the pages that would be used.
    Crawl {
        /// Documentation URL to start from.
        url: String,

        #[command(flatten)]
        overrides: Overrides,

        /// Output format: text (page listing) or json (pages with content).
        #[arg(short, long, default_value = "text")]
        format: OutputFormat,
    },

    /// Configuration management.
    Config {
        /// Config subcommand.
        #[command(subcommand)]
        action: ConfigAction,
    },
}

/// Config subcommands.
#[derive(Subcommand)]
pub(crate) enum ConfigAction {
    /// Initialize config file with defaults.
    Init,
    /// Show resolved configuration.
    Show,
}

/// Flags that take precedence over the config file.
#[derive(Args, Debug, Default)]
pub(crate) struct Overrides {
    /// Maximum link depth from the start URL.
    #[arg(long)]
    pub max_depth: Option<u32>,

    /// Maximum number of pages to keep.
    #[arg(long)]
    pub max_pages: Option<usize>,

    /// Concurrent fetches per batch.
    #[arg(long)]
    pub concurrency: Option<usize>,

    /// Chunk budget in tokens.
    #[arg(long)]
    pub max_tokens: Option<usize>,

    /// Overlap between adjacent chunks in tokens.
    #[arg(long)]
    pub overlap_tokens: Option<usize>,
}

impl Overrides {
    fn apply(&self, config: &mut AppConfig) {
        if let Some(depth) = self.max_depth {
            config.crawl.max_depth = depth;
        }
        if let Some(pages) = self.max_pages {
            config.crawl.max_pages = pages;
        }
        if let Some(concurrency) = self.concurrency {
            config.crawl.concurrency = concurrency;
        }
        if let Some(tokens) = self.max_tokens {
            config.chunking.max_tokens = tokens;
        }
        if let Some(tokens) = self.overlap_tokens {
            config.chunking.overlap_tokens = tokens;
        }
    }
}

// ---------------------------------------------------------------------------
// Tracing setup
// ---------------------------------------------------------------------------

/// Initialize tracing based on CLI flags. Logs go to stderr so stdout stays
/// clean for command output.
pub(crate) fn init_tracing(cli: &Cli) {
    use tracing_subscriber::{EnvFilter, fmt};

    let filter = match cli.verbose {
        0 => "docsimplifier=info",
        1 => "docsimplifier=debug",
        _ => "docsimplifier=trace",
    };

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    match cli.log_format {
        LogFormat::Text => {
            fmt()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .with_target(false)
                .init();
        }
        LogFormat::Json => {
            fmt()
                .json()
                .with_env_filter(env_filter)
                .with_writer(std::io::stderr)
                .init();
        }
    }
}

// ---------------------------------------------------------------------------
// Command dispatch
// ---------------------------------------------------------------------------

/// Run the CLI command.
pub(crate) async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Command::Simplify {
            url,
            overrides,
            format,
            out,
        } => cmd_simplify(&url, &overrides, format, out.as_deref()).await,
        Command::Crawl {
            url,
            overrides,
            format,
        } => cmd_crawl(&url, &overrides, format).await,
        Command::Config { action } => match action {
            ConfigAction::Init => cmd_config_init(),
            ConfigAction::Show => cmd_config_show(),
        },
    }
}

/// File config with CLI overrides applied.
fn resolve_config(overrides: &Overrides) -> Result<AppConfig> {
    let mut config = load_config()?;
    overrides.apply(&mut config);
    Ok(config)
}

// ---------------------------------------------------------------------------
// Command handlers
// ---------------------------------------------------------------------------

async fn cmd_simplify(
    url: &str,
    overrides: &Overrides,
    format: OutputFormat,
    out: Option<&Path>,
) -> Result<()> {
    let config = resolve_config(overrides)?;
    let pipeline_config = PipelineConfig::from_app_config(&config)?;

    info!(
        url,
        max_depth = pipeline_config.budget.max_depth,
        max_pages = pipeline_config.budget.max_pages,
        "simplifying documentation"
    );

    let reporter = CliProgress::new()?;
    let result = simplify(url, &pipeline_config, &reporter).await;
    reporter.finish();
    let output = result?;

    let rendered = match format {
        OutputFormat::Json => serde_json::to_string_pretty(&output)?,
        OutputFormat::Text => render_chunks(&output),
    };
    emit(&rendered, out)?;

    eprintln!();
    eprintln!("  {}", output.title);
    eprintln!("  Pages:   {}", output.pages.len());
    eprintln!("  Skipped: {}", output.crawl.pages_skipped);
    eprintln!("  Failed:  {}", output.crawl.errors.len());
    eprintln!("  Chunks:  {}", output.chunks.len());
    eprintln!("  Tokens:  ~{}", output.estimated_tokens());
    eprintln!("  Time:    {:.1}s", output.crawl.duration.as_secs_f64());
    eprintln!();

    Ok(())
}

async fn cmd_crawl(url: &str, overrides: &Overrides, format: OutputFormat) -> Result<()> {
    let config = resolve_config(overrides)?;
    let budget = config.budget()?;
    let crawler = Crawler::new(CrawlConfig::from(&config))?;

    let reporter = CliProgress::new()?;
    let result = crawler.crawl(url, budget, &reporter).await;
    reporter.finish();
    let (summary, pages) = result?;

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&pages)?),
        OutputFormat::Text => {
            for page in &pages {
                println!(
                    "{depth}  {chars:>6}  {url}  {title}",
                    depth = page.depth,
                    chars = page.content.chars().count(),
                    url = page.url,
                    title = page.title,
                );
            }
        }
    }

    for (failed_url, error) in &summary.errors {
        eprintln!("  failed: {failed_url} ({error})");
    }
    eprintln!(
        "  {} pages kept, {} skipped, {} failed in {:.1}s",
        summary.pages_fetched,
        summary.pages_skipped,
        summary.errors.len(),
        summary.duration.as_secs_f64()
    );

    Ok(())
}

fn cmd_config_init() -> Result<()> {
    let path = init_config()?;
    println!("Config initialized at: {}", path.display());
    Ok(())
}

fn cmd_config_show() -> Result<()> {
    let config: AppConfig = load_config()?;
    let toml_str = toml::to_string_pretty(&config)?;
    println!("{toml_str}");
    Ok(())
}

/// Chunks with their part headers, separated by a rule.
fn render_chunks(output: &PipelineOutput) -> String {
    output.chunks_with_headers().join("\n\n==========\n\n")
}

fn emit(rendered: &str, out: Option<&Path>) -> Result<()> {
    match out {
        Some(path) => {
            std::fs::write(path, rendered)
                .wrap_err_with(|| format!("failed to write {}", path.display()))?;
            info!(path = %path.display(), bytes = rendered.len(), "output written");
        }
        None => println!("{rendered}"),
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// CLI progress reporter
// ---------------------------------------------------------------------------

/// CLI progress reporter using an indicatif spinner.
struct CliProgress {
    spinner: ProgressBar,
}

impl CliProgress {
    fn new() -> Result<Self> {
        let spinner = ProgressBar::new_spinner();
        spinner.set_style(
            ProgressStyle::with_template("{spinner:.cyan} [{prefix:>3}%] {msg}")?
                .tick_strings(&["⠋", "⠙", "⠹", "⠸", "⠼", "⠴", "⠦", "⠧", "⠇", "⠏"]),
        );
        spinner.enable_steady_tick(std::time::Duration::from_millis(80));
        Ok(Self { spinner })
    }

    fn finish(&self) {
        self.spinner.finish_and_clear();
    }
}

impl ProgressReporter for CliProgress {
    fn report(&self, percent: u8, message: &str) {
        self.spinner.set_prefix(percent.to_string());
        self.spinner.set_message(message.to_string());
    }
}
