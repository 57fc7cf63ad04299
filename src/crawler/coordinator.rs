//! Crawler coordinator - main crawl orchestration logic
//!
//! This module wires the crawl together:
//! - Opening the job store and seeding it from the configuration
//! - Building the scheduler from every pending job
//! - Running the worker pool and joining it
//! - Summarizing what the workers did

use crate::config::Config;
use crate::crawler::fetcher::{ContentFetcher, HttpFetcher};
use crate::crawler::worker::{Worker, WorkerReport, WorkerStats};
use crate::crawler::{HostFairScheduler, Locator};
use crate::storage::{open_store, AdmissionPolicy, SqliteJobStore};
use crate::CrawlError;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};

/// What a finished crawl did
#[derive(Debug)]
pub struct CrawlSummary {
    /// One report per worker that ran to completion or stopped on a store error
    pub reports: Vec<WorkerReport>,
    /// Workers whose task panicked or was aborted
    pub lost_workers: usize,
    pub elapsed: Duration,
}

impl CrawlSummary {
    /// Counts across every worker
    pub fn totals(&self) -> WorkerStats {
        let mut totals = WorkerStats::default();
        for report in &self.reports {
            totals.merge(&report.stats);
        }
        totals
    }

    /// Number of workers stopped by a store error
    pub fn failed_workers(&self) -> usize {
        self.reports.iter().filter(|r| r.error.is_some()).count()
    }
}

/// Main crawler coordinator structure
pub struct Coordinator {
    config: Arc<Config>,
    store: Arc<SqliteJobStore>,
    fetcher: Arc<dyn ContentFetcher>,
}

impl Coordinator {
    /// Creates a new coordinator instance
    ///
    /// Opens the configured database and builds an HTTP fetcher.
    ///
    /// # Arguments
    ///
    /// * `config` - The crawler configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Coordinator)` - Successfully created coordinator
    /// * `Err(CrawlError)` - Failed to initialize
    pub fn new(config: Config) -> Result<Self, CrawlError> {
        let store = open_store(
            Path::new(&config.storage.database_path),
            AdmissionPolicy::from_config(&config.admission),
        )?;
        let fetcher = HttpFetcher::new(&config.user_agent)?;

        Ok(Self::with_parts(config, Arc::new(store), Arc::new(fetcher)))
    }

    /// Creates a coordinator from an existing store and fetcher
    pub fn with_parts(
        config: Config,
        store: Arc<SqliteJobStore>,
        fetcher: Arc<dyn ContentFetcher>,
    ) -> Self {
        Self {
            config: Arc::new(config),
            store,
            fetcher,
        }
    }

    /// Adds every configured seed URL to the store
    ///
    /// # Returns
    ///
    /// The number of jobs created; seeds already in the store add nothing
    pub fn seed(&self) -> Result<usize, CrawlError> {
        let mut created = 0;
        for seed in &self.config.crawler.seeds {
            let locator = Locator::parse(seed)?;
            created += self.store.seed(&locator)?.len();
        }

        tracing::info!(
            "Seeded {} new jobs from {} seed URLs",
            created,
            self.config.crawler.seeds.len()
        );
        Ok(created)
    }

    /// Runs the worker pool until every worker has exited
    ///
    /// A worker that hits a store error stops on its own; the others keep
    /// going. The crawl ends when the scheduler has no jobs left.
    pub async fn run(&self) -> Result<CrawlSummary, CrawlError> {
        let delay = Duration::from_millis(self.config.crawler.politeness_delay_ms);
        let scheduler = Arc::new(HostFairScheduler::new(self.store.clone(), delay)?);
        let worker_count = self.config.crawler.workers;

        tracing::info!(
            "Starting crawl with {} workers and a {:?} politeness delay",
            worker_count,
            delay
        );
        let start_time = Instant::now();

        let handles: Vec<_> = (0..worker_count)
            .map(|id| {
                let worker = Worker::new(id, scheduler.clone(), self.fetcher.clone());
                tokio::spawn(worker.run())
            })
            .collect();

        let mut reports = Vec::with_capacity(handles.len());
        let mut lost_workers = 0;
        for handle in handles {
            match handle.await {
                Ok(report) => reports.push(report),
                Err(e) => {
                    tracing::error!("Worker task failed: {}", CrawlError::Worker(e.to_string()));
                    lost_workers += 1;
                }
            }
        }

        let summary = CrawlSummary {
            reports,
            lost_workers,
            elapsed: start_time.elapsed(),
        };
        let totals = summary.totals();
        tracing::info!(
            "Crawl completed: {} robots files, {} pages, {} cancelled in {:?}",
            totals.robots_processed,
            totals.pages_processed,
            totals.pages_cancelled,
            summary.elapsed
        );
        if summary.failed_workers() > 0 {
            tracing::warn!("{} workers stopped on store errors", summary.failed_workers());
        }

        Ok(summary)
    }
}

/// Runs a complete crawl operation
///
/// This is the main entry point for starting a crawl. It will:
/// 1. Open the job store
/// 2. Seed it with the configured URLs
/// 3. Run the worker pool until no work remains
///
/// # Example
///
/// ```no_run
/// use hostfair_crawler::config::load_config;
/// use hostfair_crawler::crawler::run_crawl;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let config = load_config(Path::new("config.toml"))?;
/// run_crawl(config).await?;
/// # Ok(())
/// # }
/// ```
pub async fn run_crawl(config: Config) -> Result<CrawlSummary, CrawlError> {
    let coordinator = Coordinator::new(config)?;
    coordinator.seed()?;
    coordinator.run().await
}
