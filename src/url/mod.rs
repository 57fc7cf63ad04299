//! URL handling module
//!
//! This module canonicalizes outbound links into crawl locators and provides
//! the host and extension matching used to admit new links.

mod matcher;
mod normalize;

pub use matcher::{has_blacklisted_extension, matches_host_suffix};
pub use normalize::canonicalize_link;
