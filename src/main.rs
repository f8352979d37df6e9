//! Lookbook main entry point
//!
//! This is the command-line interface for the Lookbook product-image
//! harvester.

use clap::Parser;
use lookbook::config::load_config_with_hash;
use lookbook::download::MinimumSize;
use lookbook::input::read_site_list;
use lookbook::scheduler::{CrawlJob, JobScheduler};
use lookbook::url::extract_domain;
use std::path::PathBuf;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Lookbook: a polite product-image harvester
///
/// Lookbook crawls commerce sites from a seed list, finds their
/// product pages, and downloads each distinct product image exactly
/// once, respecting per-domain rate limits and per-site budgets.
#[derive(Parser, Debug)]
#[command(name = "lookbook")]
#[command(version = "0.2.0")]
#[command(about = "A polite product-image harvester", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Path to the CSV seed list (site_name, base_url)
    #[arg(short, long, value_name = "SITES")]
    input: PathBuf,

    /// Override the output image directory
    #[arg(long, value_name = "DIR")]
    output: Option<PathBuf>,

    /// Override the per-site image budget
    #[arg(long, value_name = "N")]
    max_images: Option<u32>,

    /// Override the per-site product-page budget
    #[arg(long, value_name = "N")]
    max_pages: Option<u32>,

    /// Only crawl seed sites whose name contains this string
    #[arg(long, value_name = "NAME")]
    site: Option<String>,

    /// Discard downloaded images smaller than this many bytes
    #[arg(long, value_name = "BYTES")]
    min_image_bytes: Option<u64>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (mut config, _config_hash) = match load_config_with_hash(&cli.config) {
        Ok((cfg, hash)) => {
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            (cfg, hash)
        }
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            return Err(e.into());
        }
    };

    apply_overrides(&mut config, &cli);

    let mut seeds = read_site_list(&cli.input)?;
    if let Some(filter) = &cli.site {
        let needle = filter.to_ascii_lowercase();
        seeds.retain(|seed| seed.name.to_ascii_lowercase().contains(&needle));
        tracing::info!("Site filter '{}' left {} seeds", filter, seeds.len());
    }

    if seeds.is_empty() {
        tracing::warn!("No sites to crawl");
        return Ok(());
    }

    let jobs: Vec<CrawlJob> = seeds
        .into_iter()
        .map(|seed| {
            let domain = extract_domain(&seed.base_url).unwrap_or_default();
            let site = config.site_config(&domain);
            CrawlJob { seed, site }
        })
        .collect();

    if cli.dry_run {
        handle_dry_run(&config, &jobs);
        return Ok(());
    }

    let mut scheduler = JobScheduler::new(config)?;
    if let Some(min_bytes) = cli.min_image_bytes {
        scheduler = scheduler.with_filter(Arc::new(MinimumSize { min_bytes }));
    }
    let stats = scheduler.run(jobs).await;

    println!();
    println!("=== Run Summary ===");
    println!(
        "Sites: {} attempted, {} completed, {} failed, {} blocked",
        stats.sites_attempted, stats.sites_completed, stats.sites_failed, stats.sites_blocked
    );
    println!("Pages visited: {}", stats.pages_visited);
    println!("Product pages: {}", stats.product_pages);
    println!(
        "Images: {} saved, {} duplicates skipped, {} filtered, {} failed",
        stats.images_saved, stats.duplicates_skipped, stats.images_filtered, stats.download_failures
    );

    Ok(())
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("lookbook=info,warn"),
            1 => EnvFilter::new("lookbook=debug,info"),
            2 => EnvFilter::new("lookbook=trace,debug"),
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

/// Applies CLI overrides on top of the loaded configuration
///
/// `--output` relocates the whole output tree: the audit log and the
/// hash index move with the images, so a redirected run never reads or
/// appends the config-located files.
fn apply_overrides(config: &mut lookbook::Config, cli: &Cli) {
    if let Some(output) = &cli.output {
        config.output.image_dir = output.display().to_string();
        config.output.audit_path = output.join("sources.csv").display().to_string();
        config.output.index_path = output.join("seen_hashes.txt").display().to_string();
    }
    if let Some(max_images) = cli.max_images {
        config.crawler.max_images_per_site = Some(max_images);
    }
    if let Some(max_pages) = cli.max_pages {
        config.crawler.max_pages_per_site = max_pages;
    }
}

/// Handles the --dry-run mode: validates config and lists the jobs
fn handle_dry_run(config: &lookbook::Config, jobs: &[CrawlJob]) {
    println!("=== Lookbook Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", config.crawler.max_depth);
    println!("  Max concurrent jobs: {}", config.crawler.max_concurrent_jobs);
    println!("  Max pages per site: {}", config.crawler.max_pages_per_site);
    match config.crawler.max_images_per_site {
        Some(n) => println!("  Max images per site: {}", n),
        None => println!("  Max images per site: unlimited"),
    }
    println!(
        "  Default rate: {} req/s per domain",
        config.crawler.requests_per_second
    );

    println!("\nUser Agent:");
    println!("  {}", config.user_agent.header_value());

    println!("\nOutput:");
    println!("  Images: {}", config.output.image_dir);
    println!("  Audit log: {}", config.output.audit_path);
    println!("  Hash index: {}", config.output.index_path);

    println!("\nJobs ({}):", jobs.len());
    for job in jobs {
        let sitemap = match &job.site.sitemap_url {
            Some(url) => format!(", sitemap {}", url),
            None => String::new(),
        };
        println!(
            "  - {} ({}) [{:?}, {} req/s, {} pages{}]",
            job.seed.name,
            job.seed.base_url,
            job.site.strategy,
            job.site.rate_limit,
            job.site.max_pages,
            sitemap
        );
    }

    println!("\n✓ Configuration is valid");
    println!("✓ Would crawl {} sites", jobs.len());
}
