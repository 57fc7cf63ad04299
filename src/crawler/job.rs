//! Crawl jobs and the order in which the scheduler releases them

use crate::{UrlError, UrlResult};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use url::Url;

/// Path of the robots exclusion file on every host
pub const ROBOTS_PATH: &str = "/robots.txt";

/// Where a job points: protocol, host and path (including any query)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Locator {
    pub protocol: String,
    pub host: String,
    pub path: String,
}

impl Locator {
    /// Creates a locator from its parts
    pub fn new(
        protocol: impl Into<String>,
        host: impl Into<String>,
        path: impl Into<String>,
    ) -> Self {
        Self {
            protocol: protocol.into(),
            host: host.into(),
            path: path.into(),
        }
    }

    /// Builds a locator from an absolute http(s) URL
    ///
    /// The fragment is dropped, the query is kept as part of the path, and an
    /// empty path becomes "/". URLs carrying a non-default port are rejected.
    ///
    /// # Examples
    ///
    /// ```
    /// use hostfair_crawler::Locator;
    /// use url::Url;
    ///
    /// let url = Url::parse("http://Example.COM/a/b?x=1#top").unwrap();
    /// let locator = Locator::from_url(&url).unwrap();
    /// assert_eq!(locator.host, "example.com");
    /// assert_eq!(locator.path, "/a/b?x=1");
    /// ```
    pub fn from_url(url: &Url) -> UrlResult<Self> {
        let protocol = url.scheme().to_ascii_lowercase();
        if protocol != "http" && protocol != "https" {
            return Err(UrlError::InvalidScheme(protocol));
        }

        // `Url::port` is None when the port is absent or the scheme default
        if let Some(port) = url.port() {
            return Err(UrlError::NonDefaultPort(port));
        }

        let host = url
            .host_str()
            .filter(|h| !h.is_empty())
            .ok_or(UrlError::MissingHost)?
            .to_lowercase();

        let mut path = url.path().to_string();
        if !path.starts_with('/') {
            path.insert(0, '/');
        }
        if let Some(query) = url.query() {
            path.push('?');
            path.push_str(query);
        }

        Ok(Self {
            protocol,
            host,
            path,
        })
    }

    /// Parses a locator from a URL string
    pub fn parse(input: &str) -> UrlResult<Self> {
        let url = Url::parse(input).map_err(|e| UrlError::Parse(e.to_string()))?;
        Self::from_url(&url)
    }

    /// Returns the absolute URL this locator points to
    pub fn to_url(&self) -> Result<Url, url::ParseError> {
        Url::parse(&self.to_string())
    }

    /// Returns true if this locator names the host's robots.txt file
    pub fn is_robots_file(&self) -> bool {
        self.path.eq_ignore_ascii_case(ROBOTS_PATH)
    }

    /// Returns the robots.txt locator for the same protocol and host
    pub fn robots_locator(&self) -> Self {
        Self::new(self.protocol.clone(), self.host.clone(), ROBOTS_PATH)
    }
}

impl fmt::Display for Locator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}://{}{}", self.protocol, self.host, self.path)
    }
}

/// One unit of crawl work
///
/// Identity is the store-assigned `id` alone. The total order releases, in
/// turn: robots.txt before anything else, "http" before other protocols, then
/// lower ids first.
#[derive(Debug, Clone)]
pub struct Job {
    id: i64,
    locator: Locator,
}

impl Job {
    /// Creates a job from a store id and a locator
    pub fn new(id: i64, locator: Locator) -> Self {
        Self { id, locator }
    }

    pub fn id(&self) -> i64 {
        self.id
    }

    pub fn locator(&self) -> &Locator {
        &self.locator
    }

    pub fn host(&self) -> &str {
        &self.locator.host
    }

    /// Returns true if this job fetches a robots.txt file
    pub fn is_robots(&self) -> bool {
        self.locator.is_robots_file()
    }

    fn is_plain_http(&self) -> bool {
        self.locator.protocol.eq_ignore_ascii_case("http")
    }
}

impl PartialEq for Job {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Job {}

impl Hash for Job {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl Ord for Job {
    fn cmp(&self, other: &Self) -> Ordering {
        if self.id == other.id {
            return Ordering::Equal;
        }

        // `true` sorts after `false`, so compare the flags in reverse
        other
            .is_robots()
            .cmp(&self.is_robots())
            .then_with(|| other.is_plain_http().cmp(&self.is_plain_http()))
            .then_with(|| self.id.cmp(&other.id))
    }
}

impl PartialOrd for Job {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for Job {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.id, self.locator)
    }
}
