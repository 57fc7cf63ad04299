//! HTTP fetcher implementation
//!
//! This module handles all network access for the crawler, including:
//! - Building HTTP clients with proper user agent strings
//! - Fetching robots.txt files as lines
//! - Fetching HTML documents, skipping other content types

use crate::config::UserAgentConfig;
use crate::crawler::Locator;
use async_trait::async_trait;
use reqwest::{header::CONTENT_TYPE, redirect::Policy, Client};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// A fetched HTML document
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FetchedPage {
    /// Final URL after redirects, used to resolve relative links
    pub url: Url,
    /// Raw document content
    pub body: String,
}

/// Network access used by workers
///
/// Both methods return `None` when the resource is absent or unusable. They
/// never fail: a network error is treated as an absent resource.
#[async_trait]
pub trait ContentFetcher: Send + Sync {
    /// Fetches a robots.txt file and splits it into lines
    async fn fetch_robots_text(&self, locator: &Locator) -> Option<Vec<String>>;

    /// Fetches an HTML document
    async fn fetch_html(&self, locator: &Locator) -> Option<FetchedPage>;
}

/// Builds an HTTP client with proper configuration
///
/// # Arguments
///
/// * `config` - The user agent configuration
///
/// # Returns
///
/// * `Ok(Client)` - Successfully built HTTP client
/// * `Err(reqwest::Error)` - Failed to build client
///
/// # Example
///
/// ```no_run
/// use hostfair_crawler::config::UserAgentConfig;
/// use hostfair_crawler::crawler::build_http_client;
///
/// let config = UserAgentConfig {
///     crawler_name: "HostFairBot".to_string(),
///     crawler_version: "0.1".to_string(),
///     contact_url: "https://example.edu/bot".to_string(),
///     contact_email: "bot@example.edu".to_string(),
/// };
///
/// let client = build_http_client(&config).unwrap();
/// ```
pub fn build_http_client(config: &UserAgentConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .user_agent(user_agent_string(config))
        .timeout(Duration::from_secs(30))
        .connect_timeout(Duration::from_secs(10))
        .redirect(Policy::limited(10))
        .gzip(true)
        .brotli(true)
        .build()
}

/// Format: CrawlerName/Version (+ContactURL; ContactEmail)
pub fn user_agent_string(config: &UserAgentConfig) -> String {
    format!(
        "{}/{} (+{}; {})",
        config.crawler_name, config.crawler_version, config.contact_url, config.contact_email
    )
}

/// A [`ContentFetcher`] backed by a reqwest client
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    client: Client,
}

impl HttpFetcher {
    /// Creates a fetcher identifying itself with the configured user agent
    pub fn new(config: &UserAgentConfig) -> Result<Self, reqwest::Error> {
        Ok(Self::with_client(build_http_client(config)?))
    }

    pub fn with_client(client: Client) -> Self {
        Self { client }
    }

    /// Fetches a robots.txt file by URL
    ///
    /// Returns the body lines for a 2xx response and `None` otherwise.
    pub async fn fetch_robots_url(&self, url: &str) -> Option<Vec<String>> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("Failed to fetch {}: {}", url, e);
                return None;
            }
        };

        if !response.status().is_success() {
            debug!("No robots.txt at {} (HTTP {})", url, response.status());
            return None;
        }

        match response.text().await {
            Ok(body) => Some(body.lines().map(str::to_string).collect()),
            Err(e) => {
                warn!("Failed to read body of {}: {}", url, e);
                None
            }
        }
    }

    /// Fetches an HTML document by URL
    ///
    /// Returns `None` unless the response is 2xx with an HTML content type.
    pub async fn fetch_html_url(&self, url: &str) -> Option<FetchedPage> {
        let response = match self.client.get(url).send().await {
            Ok(response) => response,
            Err(e) => {
                debug!("Failed to fetch {}: {}", url, e);
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            debug!("Skipping {} (HTTP {})", url, status);
            return None;
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_ascii_lowercase();
        if !content_type.contains("html") {
            debug!("Skipping {} (content type {:?})", url, content_type);
            return None;
        }

        let final_url = response.url().clone();
        match response.text().await {
            Ok(body) => Some(FetchedPage {
                url: final_url,
                body,
            }),
            Err(e) => {
                warn!("Failed to read body of {}: {}", url, e);
                None
            }
        }
    }
}

#[async_trait]
impl ContentFetcher for HttpFetcher {
    async fn fetch_robots_text(&self, locator: &Locator) -> Option<Vec<String>> {
        self.fetch_robots_url(&locator.to_string()).await
    }

    async fn fetch_html(&self, locator: &Locator) -> Option<FetchedPage> {
        self.fetch_html_url(&locator.to_string()).await
    }
}
