//! Per-worker report of a finished crawl

use crate::crawler::CrawlSummary;
use std::io::{self, Write};

/// Prints the crawl summary to stdout
pub fn print_crawl_summary(summary: &CrawlSummary) {
    let stdout = io::stdout();
    if let Err(e) = write_crawl_summary(summary, &mut stdout.lock()) {
        tracing::warn!("Failed to print crawl summary: {}", e);
    }
}

pub fn write_crawl_summary<W: Write>(summary: &CrawlSummary, out: &mut W) -> io::Result<()> {
    writeln!(out, "=== Crawl Summary ===\n")?;
    writeln!(out, "Elapsed: {:.1}s", summary.elapsed.as_secs_f64())?;
    writeln!(out)?;

    writeln!(out, "Workers ({}):", summary.reports.len())?;
    let mut reports: Vec<_> = summary.reports.iter().collect();
    reports.sort_by_key(|r| r.worker_id);
    for report in reports {
        write!(
            out,
            "  #{}: {} jobs ({} robots, {} pages, {} cancelled)",
            report.worker_id,
            report.stats.total(),
            report.stats.robots_processed,
            report.stats.pages_processed,
            report.stats.pages_cancelled
        )?;
        match &report.error {
            Some(e) => writeln!(out, " stopped: {}", e)?,
            None => writeln!(out)?,
        }
    }
    writeln!(out)?;

    let totals = summary.totals();
    writeln!(
        out,
        "Total: {} jobs ({} robots, {} pages, {} cancelled)",
        totals.total(),
        totals.robots_processed,
        totals.pages_processed,
        totals.pages_cancelled
    )?;
    if summary.lost_workers > 0 {
        writeln!(out, "Lost workers: {}", summary.lost_workers)?;
    }
    Ok(())
}
