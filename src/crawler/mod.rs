//! Crawler module for job scheduling and processing
//!
//! This module contains the core crawling logic, including:
//! - Crawl jobs and their release order
//! - Host-fair scheduling with a politeness delay
//! - The worker loop and the worker pool
//! - HTTP fetching and link extraction

mod coordinator;
mod fetcher;
mod job;
mod parser;
mod scheduler;
mod worker;

pub use coordinator::{run_crawl, Coordinator, CrawlSummary};
pub use fetcher::{build_http_client, user_agent_string, ContentFetcher, FetchedPage, HttpFetcher};
pub use job::{Job, Locator, ROBOTS_PATH};
pub use parser::extract_links;
pub use scheduler::{HostFairScheduler, RELEASE_MARGIN};
pub use worker::{Worker, WorkerReport, WorkerStats};
