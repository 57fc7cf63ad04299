//! Worker loop shared by every crawl task
//!
//! A worker repeatedly takes a job from the scheduler, fetches it without
//! holding the scheduler lock, and reports the result back. It stops when the
//! scheduler has no work left or when the job store fails.

use crate::crawler::fetcher::ContentFetcher;
use crate::crawler::parser::extract_links;
use crate::crawler::{HostFairScheduler, Job};
use crate::robots::ParsedRobots;
use crate::storage::{StoreError, StoreResult};
use std::sync::Arc;
use tracing::{debug, error, info};

/// Counts of the jobs a worker handled
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WorkerStats {
    pub robots_processed: u64,
    pub pages_processed: u64,
    pub pages_cancelled: u64,
}

impl WorkerStats {
    pub fn total(&self) -> u64 {
        self.robots_processed + self.pages_processed + self.pages_cancelled
    }

    /// Adds another worker's counts to these
    pub fn merge(&mut self, other: &WorkerStats) {
        self.robots_processed += other.robots_processed;
        self.pages_processed += other.pages_processed;
        self.pages_cancelled += other.pages_cancelled;
    }
}

/// How a worker's run ended
#[derive(Debug)]
pub struct WorkerReport {
    pub worker_id: usize,
    pub stats: WorkerStats,
    /// The store failure that stopped the worker, if any
    pub error: Option<StoreError>,
}

/// One crawl task
pub struct Worker {
    id: usize,
    scheduler: Arc<HostFairScheduler>,
    fetcher: Arc<dyn ContentFetcher>,
}

impl Worker {
    pub fn new(
        id: usize,
        scheduler: Arc<HostFairScheduler>,
        fetcher: Arc<dyn ContentFetcher>,
    ) -> Self {
        Self {
            id,
            scheduler,
            fetcher,
        }
    }

    /// Processes jobs until none remain or the store fails
    pub async fn run(self) -> WorkerReport {
        let mut stats = WorkerStats::default();

        let error = loop {
            let Some(job) = self.scheduler.acquire_job().await else {
                debug!("Worker {} found no more work", self.id);
                break None;
            };

            info!("Processing {}", job);
            if let Err(e) = self.process(&job, &mut stats).await {
                error!("Worker {} exiting after store error on {}: {}", self.id, job, e);
                break Some(e);
            }
        };

        debug!("Worker {} finished after {} jobs", self.id, stats.total());
        WorkerReport {
            worker_id: self.id,
            stats,
            error,
        }
    }

    async fn process(&self, job: &Job, stats: &mut WorkerStats) -> StoreResult<()> {
        if job.is_robots() {
            self.process_robots(job).await?;
            stats.robots_processed += 1;
        } else if self.process_html(job).await? {
            stats.pages_processed += 1;
        } else {
            stats.pages_cancelled += 1;
        }
        Ok(())
    }

    async fn process_robots(&self, job: &Job) -> StoreResult<()> {
        let locator = job.locator();
        let robots = match self.fetcher.fetch_robots_text(locator).await {
            Some(lines) => ParsedRobots::from_lines(&locator.protocol, &locator.host, lines),
            None => ParsedRobots::allow_all(&locator.protocol, &locator.host),
        };

        self.scheduler.finish_robots(job, robots.rules()).await
    }

    /// Returns false if the document could not be obtained
    async fn process_html(&self, job: &Job) -> StoreResult<bool> {
        match self.fetcher.fetch_html(job.locator()).await {
            Some(page) => {
                let links = extract_links(&page.body, &page.url);
                debug!("Found {} links in {}", links.len(), job.locator());
                self.scheduler.finish_html(job, &links, &page.body).await?;
                Ok(true)
            }
            None => {
                self.scheduler.cancel_html(job).await?;
                Ok(false)
            }
        }
    }
}
