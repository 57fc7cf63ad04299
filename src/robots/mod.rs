//! Robots.txt handling module
//!
//! This module turns robots.txt lines into rules and decides, by longest
//! matching prefix, whether a path may be crawled.

mod parser;
mod rule;

pub use parser::ParsedRobots;
pub use rule::{evaluate, RobotsRule, RobotsRuleSet};
