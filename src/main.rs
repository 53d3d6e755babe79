//! Wayfinder main entry point
//!
//! This is the command-line interface for the Wayfinder navigation core,
//! driving crawls with the built-in HTTP fetch engine.

use anyhow::Context;
use clap::Parser;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;
use wayfinder::config::{compute_config_hash, read_config, validate, Config, CrawlSettings};
use wayfinder::crawler::{Controller, HttpFetchEngine};
use wayfinder::output::{write_snapshot, MarkdownReporter, Reporter, StatsReporter};
use wayfinder::CrawlState;

/// Wayfinder: a goal-directed web crawler
///
/// Wayfinder crawls from one or more seed URLs, restricted to the configured
/// domains and paths, and heads for an optional stop target by ranking
/// discovered links against it.
#[derive(Parser, Debug)]
#[command(name = "wayfinder")]
#[command(version)]
#[command(about = "A goal-directed web crawler", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without actually crawling
    #[arg(long)]
    dry_run: bool,

    /// Seed URL, replacing the seeds from the config file (repeatable)
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Stop the crawl once this URL has been fetched
    #[arg(long, value_name = "URL")]
    stop_target: Option<String>,

    /// Maximum number of pages to fetch (0 = unlimited)
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Maximum link depth from the seeds (0 = unlimited)
    #[arg(long, value_name = "N")]
    max_depth: Option<u32>,

    /// Number of concurrent fetch workers
    #[arg(long, value_name = "N")]
    workers: Option<u32>,
}

impl Cli {
    /// Applies command-line overrides on top of the file configuration
    fn apply_overrides(&self, config: &mut Config) {
        if !self.seeds.is_empty() {
            config.crawl.seeds = self.seeds.clone();
        }
        if let Some(target) = &self.stop_target {
            config.crawl.stop_target = Some(target.clone());
        }
        if let Some(max_pages) = self.max_pages {
            config.crawl.max_pages = max_pages;
        }
        if let Some(max_depth) = self.max_depth {
            config.crawl.max_depth = max_depth;
        }
        if let Some(workers) = self.workers {
            config.crawl.workers = workers;
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    // Load and validate configuration
    tracing::info!("Loading configuration from: {}", cli.config.display());
    let mut config = read_config(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    let config_hash = compute_config_hash(&cli.config)?;
    tracing::info!("Configuration loaded successfully (hash: {})", config_hash);

    cli.apply_overrides(&mut config);
    let settings = validate(&config).context("invalid configuration")?;

    if cli.dry_run {
        handle_dry_run(&config, &settings);
        return Ok(());
    }

    let state = handle_crawl(config, &settings, config_hash).await?;
    if state == CrawlState::Failed {
        std::process::exit(1);
    }
    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("wayfinder=info,warn"),
            1 => EnvFilter::new("wayfinder=debug,info"),
            2 => EnvFilter::new("wayfinder=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

fn limit(value: u32) -> String {
    if value == 0 {
        "unlimited".to_string()
    } else {
        value.to_string()
    }
}

/// Handles the --dry-run mode: shows the validated crawl plan
fn handle_dry_run(config: &Config, settings: &CrawlSettings) {
    println!("=== Wayfinder Dry Run ===\n");

    println!("Seeds ({}):", settings.seeds.len());
    for seed in &settings.seeds {
        println!("  - {}", seed);
    }
    match &settings.stop_target {
        Some(target) => println!("\nStop target: {}", target),
        None => println!("\nStop target: none"),
    }

    println!("\nScope:");
    println!("  On site: {}", config.crawl.on_site);
    if let Some(domain) = &config.crawl.force_domain {
        println!("  Force domain: {}", domain);
    }
    if let Some(include) = &config.crawl.include {
        println!("  Include: {}", include);
    }
    if let Some(exclude) = &config.crawl.exclude {
        println!("  Exclude: {}", exclude);
    }
    if let Some(file_types) = &config.crawl.file_types {
        println!("  File types: {}", file_types.join(", "));
    }
    if let Some(content) = &settings.content_filter {
        println!(
            "  Content filter: {:?} (follow filtered links: {})",
            content, settings.follow_filtered_links
        );
    }

    println!("\nLimits:");
    println!("  Max depth: {}", limit(settings.max_depth));
    println!("  Max pages: {}", limit(settings.max_pages));
    println!("  Workers: {}", settings.workers);

    println!("\nFetching:");
    println!("  User agent: {}", settings.user_agent);
    println!("  Timeout: {}ms", settings.fetch_timeout.as_millis());
    println!(
        "  Retries: {} (backoff {}ms)",
        settings.retries,
        settings.retry_backoff.as_millis()
    );

    println!("\n✓ Configuration is valid");
}

/// Handles the main crawl operation
async fn handle_crawl(
    config: Config,
    settings: &CrawlSettings,
    config_hash: String,
) -> anyhow::Result<CrawlState> {
    let engine = HttpFetchEngine::from_settings(settings).context("failed to build HTTP client")?;

    let mut reporters: Vec<Box<dyn Reporter>> = vec![Box::new(StatsReporter)];
    if let Some(path) = &config.output.summary_path {
        reporters.push(Box::new(MarkdownReporter::new(path)));
    }
    let snapshot_path = config.output.snapshot_path.clone();

    let mut controller = Controller::new(config, Arc::new(engine))
        .with_reporter(Arc::new(reporters))
        .with_config_hash(config_hash);

    let stop = controller.stop_handle();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, finishing in-flight pages");
            stop.stop("interrupted by operator");
        }
    });

    let report = controller.run().await?;
    match report.state {
        CrawlState::Failed => tracing::error!(
            "Crawl failed: {}",
            report.stop_reason.as_deref().unwrap_or("unknown")
        ),
        state => tracing::info!("Crawl finished: {}", state),
    }

    if let Some(path) = snapshot_path {
        write_snapshot(&controller.snapshot(), Path::new(&path))
            .with_context(|| format!("failed to write snapshot to {}", path))?;
    }

    Ok(report.state)
}
