//! Robots.txt parser implementation
//!
//! Only records addressed to every crawler (`User-agent: *`) are read. Their
//! `Disallow:` and `Allow:` directives become literal path-prefix rules; wildcard
//! and `$` patterns are not interpreted.

use super::rule::{RobotsRule, RobotsRuleSet};
use tracing::{debug, info};

const USER_AGENT_ANY: &str = "user-agent: *";
const DISALLOW: &str = "Disallow:";
const ALLOW: &str = "Allow:";
const IGNORED_PREFIXES: [&str; 3] = ["Crawl-delay", "Sitemap", "#"];

/// Parsed robots.txt data for one protocol and host
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedRobots {
    rules: RobotsRuleSet,
    skipped_lines: Vec<String>,
}

impl ParsedRobots {
    /// Parses the lines of a robots.txt file fetched from `protocol://host`
    ///
    /// The resulting rule set always has at least one rule: when no applicable
    /// directive is found, everything is allowed.
    ///
    /// # Examples
    ///
    /// ```
    /// use hostfair_crawler::ParsedRobots;
    ///
    /// let lines = ["User-agent: *", "Disallow: /private/"];
    /// let robots = ParsedRobots::from_lines("http", "example.com", lines);
    /// assert!(!robots.is_allowed("/private/index.html"));
    /// assert!(robots.is_allowed("/public/index.html"));
    /// ```
    pub fn from_lines<I, S>(protocol: &str, host: &str, lines: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut rules = RobotsRuleSet::new();
        let mut skipped_lines = Vec::new();
        let mut in_record = false;

        for line in lines {
            let line = line.as_ref();

            if !in_record {
                in_record = line.trim().eq_ignore_ascii_case(USER_AGENT_ANY);
                continue;
            }

            if line.trim().is_empty() {
                in_record = false;
                continue;
            }

            if let Some(value) = line.strip_prefix(DISALLOW) {
                match directive_prefix(value) {
                    Some(prefix) => rules.insert(RobotsRule::new(protocol, host, prefix, false)),
                    // An empty disallow excludes nothing
                    None => rules.insert(RobotsRule::allow_root(protocol, host)),
                };
            } else if let Some(value) = line.strip_prefix(ALLOW) {
                if let Some(prefix) = directive_prefix(value) {
                    rules.insert(RobotsRule::new(protocol, host, prefix, true));
                }
            } else if IGNORED_PREFIXES.iter().any(|p| line.starts_with(p)) {
                continue;
            } else {
                info!(
                    line = %line,
                    "Found unparseable line in {}://{}/robots.txt",
                    protocol,
                    host
                );
                skipped_lines.push(line.to_string());
            }
        }

        if rules.is_empty() {
            rules.insert(RobotsRule::allow_root(protocol, host));
        }

        debug!(
            "Parsed {} robots rules for {}://{}",
            rules.len(),
            protocol,
            host
        );

        Self {
            rules,
            skipped_lines,
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// This is used when a host has no robots.txt file.
    pub fn allow_all(protocol: &str, host: &str) -> Self {
        Self::from_lines(protocol, host, std::iter::empty::<&str>())
    }

    /// Returns the parsed rules
    pub fn rules(&self) -> &RobotsRuleSet {
        &self.rules
    }

    /// Lines inside a wildcard record that were neither directives nor ignored
    pub fn skipped_lines(&self) -> &[String] {
        &self.skipped_lines
    }

    /// Checks if a path is allowed under the parsed rules
    pub fn is_allowed(&self, path: &str) -> bool {
        self.rules.is_allowed(path)
    }
}

/// Strips a trailing comment and whitespace, returning the prefix if non-empty
fn directive_prefix(value: &str) -> Option<&str> {
    let value = match value.find('#') {
        Some(idx) => &value[..idx],
        None => value,
    };
    let value = value.trim();
    (!value.is_empty()).then_some(value)
}
