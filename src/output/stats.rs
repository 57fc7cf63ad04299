//! Statistics about a crawl database
//!
//! This module provides functionality for extracting and displaying
//! the state of a job store.

use crate::storage::{AdmissionPolicy, SqliteJobStore, StoreResult, StoreStatistics};
use std::io::{self, Write};
use std::path::Path;

/// How many hosts are listed under "Pending by Host"
const TOP_HOSTS: usize = 10;

/// Loads statistics from the existing database at `path`
///
/// The store is opened without admission lists since nothing is admitted.
/// A missing database is an error; it is never created here.
///
/// # Returns
///
/// * `Ok(StoreStatistics)` - Successfully loaded statistics
/// * `Err(StoreError)` - Failed to open or query the database
pub fn load_statistics(path: &Path) -> StoreResult<StoreStatistics> {
    let store = SqliteJobStore::open_existing(path, AdmissionPolicy::default())?;
    store.statistics()
}

/// Prints statistics to stdout in a formatted manner
pub fn print_statistics(stats: &StoreStatistics) {
    let stdout = io::stdout();
    if let Err(e) = write_statistics(stats, &mut stdout.lock()) {
        tracing::warn!("Failed to print statistics: {}", e);
    }
}

/// Writes the statistics report to any writer
pub fn write_statistics<W: Write>(stats: &StoreStatistics, out: &mut W) -> io::Result<()> {
    writeln!(out, "=== Crawl Statistics ===\n")?;

    writeln!(out, "Overview:")?;
    writeln!(out, "  Total URLs: {}", stats.total_urls())?;
    writeln!(out, "  Pending: {}", stats.pending_urls)?;
    writeln!(out, "  Crawled: {}", stats.crawled_urls)?;
    writeln!(out, "  Documents stored: {}", stats.documents)?;
    writeln!(out, "  Hosts: {}", stats.hosts)?;
    writeln!(out, "  Robots rules: {}", stats.robots_rules)?;
    writeln!(out)?;

    if !stats.pending_by_host.is_empty() {
        writeln!(
            out,
            "Pending by Host ({} hosts):",
            stats.pending_by_host.len()
        )?;
        for (host, count) in stats.pending_by_host.iter().take(TOP_HOSTS) {
            writeln!(out, "  {}: {}", host, count)?;
        }
        if stats.pending_by_host.len() > TOP_HOSTS {
            writeln!(
                out,
                "  ... and {} more",
                stats.pending_by_host.len() - TOP_HOSTS
            )?;
        }
        writeln!(out)?;
    }

    let progress = if stats.total_urls() > 0 {
        (stats.crawled_urls as f64 / stats.total_urls() as f64) * 100.0
    } else {
        0.0
    };
    writeln!(
        out,
        "Progress: {:.1}% ({} / {} URLs crawled)",
        progress,
        stats.crawled_urls,
        stats.total_urls()
    )
}
