//! Robots rules, rule sets, and longest-prefix evaluation

use std::collections::BTreeSet;
use std::fmt;

/// One allow/disallow directive for a protocol, host and path prefix
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RobotsRule {
    pub protocol: String,
    pub host: String,
    pub path_prefix: String,
    pub allowed: bool,
}

impl RobotsRule {
    pub fn new(
        protocol: impl Into<String>,
        host: impl Into<String>,
        path_prefix: impl Into<String>,
        allowed: bool,
    ) -> Self {
        Self {
            protocol: protocol.into(),
            host: host.into(),
            path_prefix: path_prefix.into(),
            allowed,
        }
    }

    /// The rule allowing everything on a host
    pub fn allow_root(protocol: impl Into<String>, host: impl Into<String>) -> Self {
        Self::new(protocol, host, "/", true)
    }

    /// Returns true if this rule's prefix is a literal prefix of `path`
    pub fn matches(&self, path: &str) -> bool {
        path.starts_with(&self.path_prefix)
    }

    pub fn is_root(&self) -> bool {
        self.path_prefix == "/"
    }
}

impl fmt::Display for RobotsRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}://{}{} {}",
            self.protocol, self.host, self.path_prefix, self.allowed
        )
    }
}

/// The rules governing one (protocol, host) pair
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RobotsRuleSet {
    rules: BTreeSet<RobotsRule>,
}

impl RobotsRuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rule; returns false if an identical rule was already present
    pub fn insert(&mut self, rule: RobotsRule) -> bool {
        self.rules.insert(rule)
    }

    pub fn contains(&self, rule: &RobotsRule) -> bool {
        self.rules.contains(rule)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &RobotsRule> {
        self.rules.iter()
    }

    /// Returns true if some rule covers the root prefix "/"
    pub fn has_root_rule(&self) -> bool {
        self.rules.iter().any(RobotsRule::is_root)
    }

    /// Adds an allow rule for "/" unless a root rule is already present
    pub fn ensure_root_rule(&mut self, protocol: &str, host: &str) {
        if !self.has_root_rule() {
            self.rules.insert(RobotsRule::allow_root(protocol, host));
        }
    }

    /// Decides whether `path` may be crawled under these rules
    pub fn is_allowed(&self, path: &str) -> bool {
        evaluate(self, path)
    }
}

impl FromIterator<RobotsRule> for RobotsRuleSet {
    fn from_iter<I: IntoIterator<Item = RobotsRule>>(iter: I) -> Self {
        Self {
            rules: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for RobotsRuleSet {
    type Item = RobotsRule;
    type IntoIter = std::collections::btree_set::IntoIter<RobotsRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.into_iter()
    }
}

impl<'a> IntoIterator for &'a RobotsRuleSet {
    type Item = &'a RobotsRule;
    type IntoIter = std::collections::btree_set::Iter<'a, RobotsRule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}

/// Longest-prefix match over a rule set
///
/// The rule with the longest prefix that is a literal prefix of `path` decides.
/// When an allow and a disallow rule share that longest length, the allow rule
/// wins. A path no rule matches is allowed.
///
/// # Examples
///
/// ```
/// use hostfair_crawler::robots::{evaluate, RobotsRule, RobotsRuleSet};
///
/// let rules: RobotsRuleSet = [
///     RobotsRule::new("http", "example.com", "/", true),
///     RobotsRule::new("http", "example.com", "/scripts/", false),
/// ]
/// .into_iter()
/// .collect();
///
/// assert!(evaluate(&rules, "/index.html"));
/// assert!(!evaluate(&rules, "/scripts/run.js"));
/// ```
pub fn evaluate(rules: &RobotsRuleSet, path: &str) -> bool {
    rules
        .iter()
        .filter(|rule| rule.matches(path))
        .max_by_key(|rule| (rule.path_prefix.len(), rule.allowed))
        .map(|rule| rule.allowed)
        .unwrap_or(true)
}
