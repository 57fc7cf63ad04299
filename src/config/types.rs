use serde::{Deserialize, Serialize};

/// Main configuration structure
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct Config {
    pub crawler: CrawlerConfig,
    #[serde(rename = "user-agent")]
    pub user_agent: UserAgentConfig,
    pub storage: StorageConfig,
    pub admission: AdmissionConfig,
}

/// Worker pool and politeness settings
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CrawlerConfig {
    /// Number of concurrent workers
    pub workers: usize,

    /// Minimum time between two releases for the same host
    #[serde(rename = "politeness-delay-ms")]
    pub politeness_delay_ms: u64,

    /// URLs the crawl starts from
    #[serde(default)]
    pub seeds: Vec<String>,
}

/// User agent configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UserAgentConfig {
    #[serde(rename = "crawler-name")]
    pub crawler_name: String,

    #[serde(rename = "crawler-version")]
    pub crawler_version: String,

    #[serde(rename = "contact-url")]
    pub contact_url: String,

    #[serde(rename = "contact-email")]
    pub contact_email: String,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct StorageConfig {
    #[serde(rename = "database-path")]
    pub database_path: String,
}

/// Which discovered links may become jobs
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct AdmissionConfig {
    /// Host suffixes; a host must match one of these
    #[serde(rename = "host-whitelist")]
    pub host_whitelist: Vec<String>,

    /// Exact host names that are never crawled
    #[serde(rename = "host-blacklist", default)]
    pub host_blacklist: Vec<String>,

    /// Path suffixes such as ".pdf", compared case-insensitively
    #[serde(rename = "extension-blacklist", default)]
    pub extension_blacklist: Vec<String>,
}
