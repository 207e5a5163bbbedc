//! Darkline main entry point
//!
//! This is the command-line interface for the Darkline hidden-service crawler.

use anyhow::{bail, Context};
use clap::Parser;
use darkline::config::{load_config_with_hash, validate, Config};
use darkline::crawler::{CrawlError, CrawlOutcome, CrawlRequest, Crawler, PageRecord};
use darkline::output::{filter_records, print_statistics, CrawlStatistics, RecordFilter, RiskLevel};
use darkline::storage::open_store;
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

/// Darkline: hidden-service crawl orchestration and risk classification
///
/// Darkline crawls hidden-service sites through an anonymizing proxy,
/// scores every page against weighted keyword categories and tracks
/// marketplace seller profiles over time.
#[derive(Parser, Debug)]
#[command(name = "darkline")]
#[command(version)]
#[command(about = "Hidden-service crawler and risk classifier", long_about = None)]
struct Cli {
    /// Path to TOML configuration file (built-in defaults when omitted)
    #[arg(value_name = "CONFIG")]
    config: Option<PathBuf>,

    /// Seed URL; repeat for several (overrides configured seeds)
    #[arg(long = "seed", value_name = "URL")]
    seeds: Vec<String>,

    /// Page budget for this run
    #[arg(long)]
    max_pages: Option<usize>,

    /// Link depth limit for this run
    #[arg(long)]
    depth: Option<u32>,

    /// Do not parse or store seller profiles during the crawl
    #[arg(long)]
    no_profiles: bool,

    /// Fetch one seller page, store a snapshot and exit
    #[arg(long, value_name = "URL", conflicts_with_all = ["history", "dry_run"])]
    track: Option<String>,

    /// Show the stored snapshot history of a seller and exit
    #[arg(long, num_args = 2, value_names = ["MARKETPLACE", "SELLER_KEY"], conflicts_with = "dry_run")]
    history: Option<Vec<String>>,

    /// With --history, print the trend report instead of the snapshots
    #[arg(long, requires = "history")]
    trends: bool,

    /// Validate config and show what would be crawled without crawling
    #[arg(long)]
    dry_run: bool,

    /// Print results as JSON
    #[arg(long)]
    json: bool,

    /// Minimum risk score of printed records (default: configured low threshold)
    #[arg(long)]
    min_risk: Option<u8>,

    /// Only print records in this risk band (low, medium, high)
    #[arg(long)]
    level: Option<RiskLevel>,

    /// Only print records mentioning this keyword; repeat for several
    #[arg(long = "keyword")]
    keywords: Vec<String>,

    /// Only print seller pages
    #[arg(long)]
    sellers_only: bool,

    /// Also print error records
    #[arg(long)]
    errors: bool,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    let config = load(&cli)?;

    if cli.dry_run {
        handle_dry_run(&config, &cli)
    } else if let Some(url) = &cli.track {
        handle_track(config, url, cli.json).await
    } else if let Some(args) = &cli.history {
        handle_history(config, &args[0], &args[1], cli.trends, cli.json)
    } else {
        handle_crawl(config, &cli).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("darkline=info,warn"),
            1 => EnvFilter::new("darkline=debug,info"),
            2 => EnvFilter::new("darkline=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

fn load(cli: &Cli) -> anyhow::Result<Config> {
    match &cli.config {
        Some(path) => {
            tracing::info!("Loading configuration from: {}", path.display());
            let (config, hash) = load_config_with_hash(path)
                .with_context(|| format!("failed to load {}", path.display()))?;
            tracing::info!("Configuration loaded successfully (hash: {})", hash);
            Ok(config)
        }
        None => {
            tracing::info!("No configuration file given, using built-in defaults");
            let config = Config::default();
            validate(&config)?;
            Ok(config)
        }
    }
}

fn build_request(config: &Config, cli: &Cli) -> CrawlRequest {
    let mut request = CrawlRequest::from_config(config);
    if !cli.seeds.is_empty() {
        request = request.with_seeds(cli.seeds.clone());
    }
    if let Some(max_pages) = cli.max_pages {
        request.max_pages = max_pages;
    }
    if let Some(depth) = cli.depth {
        request.depth_limit = depth;
    }
    if cli.no_profiles {
        request.track_profiles = false;
    }
    request
}

/// Handles the --dry-run mode: validates config and shows what would be crawled
fn handle_dry_run(config: &Config, cli: &Cli) -> anyhow::Result<()> {
    let request = build_request(config, cli);

    println!("=== Darkline Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Max depth: {}", request.depth_limit);
    println!("  Max pages: {}", request.max_pages);
    println!("  Crawl delay: {}ms", config.crawler.crawl_delay_ms);
    println!(
        "  Max requests per domain: {}",
        config.crawler.max_requests_per_domain
    );
    println!("  Rotate identity every: {} pages", config.crawler.rotate_every);
    println!("  Network: {}", config.crawler.network_suffixes.join(", "));

    println!("\nSession:");
    println!(
        "  Proxy: {}",
        config.session.proxy.as_deref().unwrap_or("none (direct)")
    );
    match &config.control {
        Some(control) => println!("  Control port: {}", control.address),
        None => println!("  Control port: none (rotation disabled)"),
    }

    println!("\nClassifier ({:?}):", config.classifier.kind);
    for category in &config.classifier.categories {
        println!(
            "  - {} (weight {}, {} keywords)",
            category.name,
            category.weight,
            category.keywords.len()
        );
    }

    println!("\nStorage: {:?} at {}", config.storage.backend, config.storage.path);

    println!("\nSeeds ({}):", request.seeds.len());
    for seed in &request.seeds {
        println!("  - {}", seed);
    }

    if request.seeds.is_empty() {
        bail!("no seed URLs configured; pass --seed or set crawler.seeds");
    }

    println!("\n✓ Configuration is valid");
    Ok(())
}

/// Handles --track: one seller page, one snapshot
async fn handle_track(config: Config, url: &str, json: bool) -> anyhow::Result<()> {
    let store = open_store(&config.storage).context("failed to open storage")?;
    let crawler = Crawler::new(config)?.with_store(store);

    let profile = crawler
        .track_seller(url)
        .await
        .with_context(|| format!("failed to track seller at {}", url))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&profile)?);
    } else {
        println!("Marketplace: {}", profile.marketplace);
        println!("Seller key: {}", profile.seller_key());
        println!("Name: {}", profile.name.as_deref().unwrap_or("-"));
        println!("Rating: {}", profile.rating.as_deref().unwrap_or("-"));
        println!("Products: {}", profile.products.len());
        println!("Feedback: {}", profile.feedback.len());
        println!("PGP key: {}", if profile.pgp_key.is_some() { "yes" } else { "no" });
        println!("Snapshot: {}", profile.profile_id);
    }

    Ok(())
}

/// Handles --history [--trends]
fn handle_history(
    config: Config,
    marketplace: &str,
    seller_key: &str,
    trends: bool,
    json: bool,
) -> anyhow::Result<()> {
    let store = open_store(&config.storage).context("failed to open storage")?;
    let crawler = Crawler::new(config)?.with_store(store);
    let history = crawler.get_seller_history(marketplace, seller_key)?;

    if trends {
        let report = crawler.analyze_seller_trends(&history)?;
        if json {
            println!("{}", serde_json::to_string_pretty(&report)?);
        } else {
            println!("=== Trends for {}/{} ===\n", marketplace, seller_key);
            println!("Snapshots: {}", report.total_snapshots);
            println!("First seen: {}", report.first_seen);
            println!("Last seen: {}", report.last_seen);
            println!("\nRating:");
            for point in &report.rating_trend {
                println!("  {}  {}", point.timestamp, point.rating.as_deref().unwrap_or("-"));
            }
            println!("\nProducts:");
            for product in &report.product_trends {
                println!(
                    "  {} (seen {}x, {} to {})",
                    product.name, product.appearances, product.first_seen, product.last_seen
                );
            }
        }
        return Ok(());
    }

    if json {
        println!("{}", serde_json::to_string_pretty(&history.snapshots)?);
    } else {
        println!(
            "=== History for {}/{} ({} snapshots) ===\n",
            marketplace,
            seller_key,
            history.len()
        );
        for snapshot in &history.snapshots {
            println!(
                "  {}  {}  rating {}  {} products",
                snapshot.timestamp,
                snapshot.profile_id,
                snapshot.rating.as_deref().unwrap_or("-"),
                snapshot.products.len()
            );
        }
    }

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config, cli: &Cli) -> anyhow::Result<()> {
    let request = build_request(&config, cli);
    if request.seeds.is_empty() {
        bail!("no seed URLs configured; pass --seed or set crawler.seeds");
    }

    let store = open_store(&config.storage).context("failed to open storage")?;
    let crawler = Crawler::new(config)?.with_store(store);

    let cancel = CancellationToken::new();
    let ctrl_c = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupt received, stopping after the current step");
            ctrl_c.cancel();
        }
    });

    match crawler.crawl(request, &cancel).await {
        Ok(outcome) => {
            report(&crawler, &outcome, cli)?;
            Ok(())
        }
        Err(CrawlError::SessionLost { source, partial }) => {
            tracing::error!("Crawl aborted: {}", source);
            report(&crawler, &partial, cli)?;
            Err(source).context("anonymizing session lost; partial results printed")
        }
        Err(e) => Err(e.into()),
    }
}

fn report(crawler: &Crawler, outcome: &CrawlOutcome, cli: &Cli) -> anyhow::Result<()> {
    let filter = RecordFilter {
        min_risk: cli.min_risk,
        level: cli.level,
        keywords: cli.keywords.clone(),
        sellers_only: cli.sellers_only,
        include_errors: cli.errors,
        ..Default::default()
    };
    let thresholds = &crawler.config().filter;
    let records = filter_records(&outcome.records, &filter, thresholds);

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    for record in &records {
        print_record(record);
    }
    if !records.is_empty() {
        println!();
    }

    print_statistics(&CrawlStatistics::from_outcome(outcome, thresholds));
    Ok(())
}

fn print_record(record: &PageRecord) {
    match &record.error {
        Some(error) => println!("[error] {}  {}", record.url, error),
        None => println!(
            "[{:>3}] {}  {}{}  {}",
            record.risk_score,
            record.category,
            record.url,
            if record.is_seller { "  (seller)" } else { "" },
            record.title
        ),
    }
}
