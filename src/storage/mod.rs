//! Storage module for persisting crawl progress
//!
//! This module handles all database operations for the crawler, including:
//! - SQLite database initialization and schema management
//! - Pending and completed crawl jobs
//! - Robots rules learned per protocol and host
//! - Fetched document content
//! - Admission of newly discovered links

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteJobStore;
pub use traits::{JobStore, StoreError, StoreResult};

use crate::config::AdmissionConfig;
use crate::url::{has_blacklisted_extension, matches_host_suffix};
use std::collections::HashSet;
use std::path::Path;

/// Opens or creates a job store database
///
/// # Arguments
///
/// * `path` - Path to the SQLite database file
/// * `admission` - Rules deciding which discovered links become jobs
pub fn open_store(path: &Path, admission: AdmissionPolicy) -> StoreResult<SqliteJobStore> {
    SqliteJobStore::new(path, admission)
}

/// Which newly discovered links may become crawl jobs
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AdmissionPolicy {
    host_whitelist: Vec<String>,
    host_blacklist: HashSet<String>,
    extension_blacklist: Vec<String>,
}

impl AdmissionPolicy {
    /// Creates a policy; all entries are compared in lowercase
    pub fn new<W, B, E>(host_whitelist: W, host_blacklist: B, extension_blacklist: E) -> Self
    where
        W: IntoIterator,
        W::Item: AsRef<str>,
        B: IntoIterator,
        B::Item: AsRef<str>,
        E: IntoIterator,
        E::Item: AsRef<str>,
    {
        Self {
            host_whitelist: host_whitelist
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
            host_blacklist: host_blacklist
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
            extension_blacklist: extension_blacklist
                .into_iter()
                .map(|s| s.as_ref().to_lowercase())
                .collect(),
        }
    }

    /// Builds the policy from the `[admission]` configuration table
    pub fn from_config(config: &AdmissionConfig) -> Self {
        Self::new(
            &config.host_whitelist,
            &config.host_blacklist,
            &config.extension_blacklist,
        )
    }

    /// A host is admitted if it matches a whitelisted suffix and is not
    /// blacklisted exactly
    pub fn admits_host(&self, host: &str) -> bool {
        self.host_whitelist
            .iter()
            .any(|suffix| matches_host_suffix(suffix, host))
            && !self.host_blacklist.contains(host)
    }

    /// A path is admitted unless it ends with a blacklisted extension
    pub fn admits_path(&self, path: &str) -> bool {
        !has_blacklisted_extension(path, &self.extension_blacklist)
    }
}

/// Counts describing the contents of a job store
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreStatistics {
    pub pending_urls: u64,
    pub crawled_urls: u64,
    pub documents: u64,
    pub robots_rules: u64,
    pub hosts: u64,
    /// Hosts with pending work, busiest first
    pub pending_by_host: Vec<(String, u64)>,
}

impl StoreStatistics {
    pub fn total_urls(&self) -> u64 {
        self.pending_urls + self.crawled_urls
    }
}
