//! Output module for operator-facing reports
//!
//! This module handles:
//! - Printing statistics about the contents of a job store
//! - Printing what each worker did during a crawl

pub mod stats;
mod summary;

pub use stats::{load_statistics, print_statistics, write_statistics};
pub use summary::{print_crawl_summary, write_crawl_summary};
