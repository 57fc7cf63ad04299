//! Storage traits and error types
//!
//! This module defines the trait interface the scheduler uses to persist crawl
//! progress and the associated error type.

use crate::crawler::{Job, Locator};
use crate::robots::RobotsRuleSet;
use std::collections::BTreeSet;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("Store lock poisoned")]
    LockPoisoned,

    #[error("Invalid locator in store: {0}")]
    InvalidLocator(String),
}

/// Result type for storage operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Trait for job store implementations
///
/// The scheduler calls these methods while holding its own lock, so
/// implementations only need to be safe to share between tasks. Every
/// completion is all-or-nothing: on error, no durable change is recorded.
pub trait JobStore: Send + Sync {
    /// Loads every job that has not been completed yet
    fn load_pending_jobs(&self) -> StoreResult<Vec<Job>>;

    /// Records the rules learned from a robots.txt job
    ///
    /// A root allow rule is persisted if `rules` has no root rule. The job is
    /// marked complete.
    ///
    /// # Returns
    ///
    /// The pending jobs of the same protocol and host that the new rules
    /// disallow. They have been deleted from the store.
    fn complete_robots(&self, job: &Job, rules: &RobotsRuleSet) -> StoreResult<Vec<Job>>;

    /// Records a fetched document and the links found in it
    ///
    /// # Returns
    ///
    /// Every job created for an admissible new link, plus a robots.txt job
    /// for each protocol and host that needs one.
    fn complete_html(
        &self,
        job: &Job,
        links: &BTreeSet<Locator>,
        content: &str,
    ) -> StoreResult<Vec<Job>>;

    /// Marks a job complete without content
    fn cancel_html(&self, job: &Job) -> StoreResult<()>;
}
