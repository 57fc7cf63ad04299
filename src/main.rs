//! HostFair crawler entry point
//!
//! This is the command-line interface for the host-fair crawler.

use anyhow::Context;
use clap::Parser;
use hostfair_crawler::config::{load_config_with_hash, Config};
use hostfair_crawler::crawler::Coordinator;
use hostfair_crawler::output::{load_statistics, print_crawl_summary, print_statistics};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// HostFair: a polite, host-fair web crawler
///
/// Crawls the whitelisted hosts with a pool of workers, honoring robots.txt
/// and waiting a politeness delay between two requests to the same host.
#[derive(Parser, Debug)]
#[command(name = "hostfair-crawler")]
#[command(version)]
#[command(about = "A polite, host-fair web crawler", long_about = None)]
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
    #[arg(long, conflicts_with = "stats")]
    dry_run: bool,

    /// Show statistics from the database and exit
    #[arg(long, conflicts_with = "dry_run")]
    stats: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("Failed to load configuration {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.dry_run {
        handle_dry_run(&config);
        Ok(())
    } else if cli.stats {
        handle_stats(&config)
    } else {
        handle_crawl(config).await
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("hostfair_crawler=info,warn"),
            1 => EnvFilter::new("hostfair_crawler=debug,info"),
            2 => EnvFilter::new("hostfair_crawler=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(false)
        .init();
}

/// Handles the --dry-run mode: shows the validated configuration
fn handle_dry_run(config: &Config) {
    println!("=== HostFair Dry Run ===\n");

    println!("Crawler Configuration:");
    println!("  Workers: {}", config.crawler.workers);
    println!(
        "  Politeness delay: {}ms",
        config.crawler.politeness_delay_ms
    );

    println!("\nUser Agent:");
    println!("  Name: {}", config.user_agent.crawler_name);
    println!("  Version: {}", config.user_agent.crawler_version);
    println!("  Contact URL: {}", config.user_agent.contact_url);
    println!("  Contact Email: {}", config.user_agent.contact_email);

    println!("\nStorage:");
    println!("  Database: {}", config.storage.database_path);

    println!(
        "\nHost Whitelist ({}):",
        config.admission.host_whitelist.len()
    );
    for host in &config.admission.host_whitelist {
        println!("  - *.{} and {}", host, host);
    }

    println!(
        "\nHost Blacklist ({}):",
        config.admission.host_blacklist.len()
    );
    for host in &config.admission.host_blacklist {
        println!("  - {}", host);
    }

    println!(
        "\nExtension Blacklist: {}",
        config.admission.extension_blacklist.join(" ")
    );

    println!("\nSeeds ({}):", config.crawler.seeds.len());
    for seed in &config.crawler.seeds {
        println!("  * {}", seed);
    }

    println!("\nConfiguration is valid");
}

/// Handles the --stats mode: shows statistics from the database
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    println!("Database: {}\n", config.storage.database_path);

    let stats = load_statistics(Path::new(&config.storage.database_path))
        .context("Failed to read crawl statistics")?;
    print_statistics(&stats);

    Ok(())
}

/// Handles the main crawl operation
async fn handle_crawl(config: Config) -> anyhow::Result<()> {
    tracing::info!(
        "Whitelist: {}, Blacklist: {}, Seeds: {}",
        config.admission.host_whitelist.len(),
        config.admission.host_blacklist.len(),
        config.crawler.seeds.len()
    );

    let coordinator = Coordinator::new(config).context("Failed to start crawler")?;
    coordinator.seed().context("Failed to seed the job store")?;

    let summary = coordinator.run().await.context("Crawl failed")?;
    print_crawl_summary(&summary);

    if summary.failed_workers() > 0 || summary.lost_workers > 0 {
        tracing::warn!(
            "{} workers did not finish cleanly",
            summary.failed_workers() + summary.lost_workers
        );
    }
    Ok(())
}
