//! Integration tests for the crawler
//!
//! These tests run the full worker pool against a SQLite job store and an
//! in-memory web, end to end.

use async_trait::async_trait;
use hostfair_crawler::config::{
    AdmissionConfig, Config, CrawlerConfig, StorageConfig, UserAgentConfig,
};
use hostfair_crawler::crawler::{ContentFetcher, Coordinator, FetchedPage, Locator};
use hostfair_crawler::storage::{open_store, AdmissionPolicy, JobStore, SqliteJobStore};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use tempfile::TempDir;
use url::Url;

/// Serves canned robots files and pages, recording every request in order
#[derive(Default)]
struct StubWeb {
    robots: HashMap<String, String>,
    pages: HashMap<String, String>,
    requests: Mutex<Vec<(String, Instant)>>,
    robots_latency: Duration,
    page_latency: Duration,
}

impl StubWeb {
    fn robots(mut self, url: &str, body: &str) -> Self {
        self.robots.insert(url.to_string(), body.to_string());
        self
    }

    fn page(mut self, url: &str, body: &str) -> Self {
        self.pages.insert(url.to_string(), body.to_string());
        self
    }

    fn latency(mut self, robots: Duration, page: Duration) -> Self {
        self.robots_latency = robots;
        self.page_latency = page;
        self
    }

    fn requested(&self) -> Vec<String> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    fn record(&self, locator: &Locator) -> String {
        let key = locator.to_string();
        self.requests
            .lock()
            .unwrap()
            .push((key.clone(), Instant::now()));
        key
    }
}

#[async_trait]
impl ContentFetcher for StubWeb {
    async fn fetch_robots_text(&self, locator: &Locator) -> Option<Vec<String>> {
        let key = self.record(locator);
        tokio::time::sleep(self.robots_latency).await;
        self.robots
            .get(&key)
            .map(|body| body.lines().map(str::to_string).collect())
    }

    async fn fetch_html(&self, locator: &Locator) -> Option<FetchedPage> {
        let key = self.record(locator);
        tokio::time::sleep(self.page_latency).await;
        self.pages.get(&key).map(|body| FetchedPage {
            url: Url::parse(&key).unwrap(),
            body: body.clone(),
        })
    }
}

fn create_test_config(seeds: &[&str], workers: usize, delay_ms: u64) -> Config {
    Config {
        crawler: CrawlerConfig {
            workers,
            politeness_delay_ms: delay_ms,
            seeds: seeds.iter().map(|s| s.to_string()).collect(),
        },
        user_agent: UserAgentConfig {
            crawler_name: "TestBot".to_string(),
            crawler_version: "1.0.0".to_string(),
            contact_url: "https://example.com/contact".to_string(),
            contact_email: "test@example.com".to_string(),
        },
        storage: StorageConfig {
            database_path: ":memory:".to_string(),
        },
        admission: AdmissionConfig {
            host_whitelist: vec!["example.edu".to_string()],
            host_blacklist: vec!["private.example.edu".to_string()],
            extension_blacklist: vec![".pdf".to_string()],
        },
    }
}

fn in_memory_store(config: &Config) -> Arc<SqliteJobStore> {
    let policy = AdmissionPolicy::from_config(&config.admission);
    Arc::new(SqliteJobStore::new_in_memory(policy).unwrap())
}

fn university_web() -> StubWeb {
    StubWeb::default()
        .robots(
            "http://www.example.edu/robots.txt",
            "# main site\nUser-agent: *\nDisallow: /private/\n",
        )
        .robots("https://www.example.edu/robots.txt", "User-agent: *\nAllow: /\n")
        .page(
            "http://www.example.edu/",
            r#"<html><body>
                <a href="/a.html">A</a>
                <a href="/private/secret.html">Secret</a>
                <a href="/paper.pdf">Paper</a>
                <a href="/missing.html">Missing</a>
                <a href="http://cs.example.edu/people.html">People</a>
                <a href="http://private.example.edu/">Private</a>
                <a href="http://other.org/">Elsewhere</a>
                <a href="https://www.example.edu/secure.html">Secure</a>
            </body></html>"#,
        )
        .page("http://www.example.edu/a.html", r#"<a href="/">Home</a>"#)
        .page("http://cs.example.edu/", r#"<a href="people.html">People</a>"#)
        .page("http://cs.example.edu/people.html", "<p>Nobody here</p>")
        .page("https://www.example.edu/secure.html", "<p>Secure</p>")
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_full_crawl_honors_admission_and_robots() {
    let config = create_test_config(&["http://www.example.edu/", "http://cs.example.edu/"], 4, 30);
    let store = in_memory_store(&config);
    let web = Arc::new(university_web());

    let coordinator = Coordinator::with_parts(config, store.clone(), web.clone());
    assert_eq!(coordinator.seed().unwrap(), 4);
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.reports.len(), 4);
    assert_eq!(summary.failed_workers(), 0);
    assert_eq!(summary.lost_workers, 0);

    let totals = summary.totals();
    assert_eq!(totals.robots_processed, 3);
    assert_eq!(totals.pages_processed, 5);
    assert_eq!(totals.pages_cancelled, 1);

    let mut requested = web.requested();
    requested.sort();
    assert_eq!(
        requested,
        vec![
            "http://cs.example.edu/",
            "http://cs.example.edu/people.html",
            "http://cs.example.edu/robots.txt",
            "http://www.example.edu/",
            "http://www.example.edu/a.html",
            "http://www.example.edu/missing.html",
            "http://www.example.edu/robots.txt",
            "https://www.example.edu/robots.txt",
            "https://www.example.edu/secure.html",
        ]
    );

    assert!(store.load_pending_jobs().unwrap().is_empty());
    let stats = store.statistics().unwrap();
    assert_eq!(stats.pending_urls, 0);
    assert_eq!(stats.crawled_urls, 9);
    assert_eq!(stats.documents, 5);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_robots_fetched_before_host_content() {
    let config = create_test_config(&["http://www.example.edu/", "http://cs.example.edu/"], 3, 20);
    let store = in_memory_store(&config);
    let web = Arc::new(university_web());

    let coordinator = Coordinator::with_parts(config, store, web.clone());
    coordinator.seed().unwrap();
    coordinator.run().await.unwrap();

    let requested = web.requested();
    let position = |url: &str| requested.iter().position(|r| r == url).unwrap();

    for (robots, page) in [
        ("http://www.example.edu/robots.txt", "http://www.example.edu/"),
        ("http://cs.example.edu/robots.txt", "http://cs.example.edu/"),
        ("https://www.example.edu/robots.txt", "https://www.example.edu/secure.html"),
    ] {
        assert!(
            position(robots) < position(page),
            "{} should be fetched before {}",
            robots,
            page
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_disallowed_pending_jobs_are_never_fetched() {
    let config = create_test_config(
        &["http://www.example.edu/", "http://www.example.edu/private/a.html"],
        2,
        20,
    );
    let store = in_memory_store(&config);
    let web = Arc::new(
        StubWeb::default()
            .robots(
                "http://www.example.edu/robots.txt",
                "User-agent: *\nDisallow: /private/\n",
            )
            .page("http://www.example.edu/", "<p>Home</p>")
            .page("http://www.example.edu/private/a.html", "<p>Hidden</p>"),
    );

    let coordinator = Coordinator::with_parts(config, store.clone(), web.clone());
    coordinator.seed().unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(
        web.requested(),
        vec!["http://www.example.edu/robots.txt", "http://www.example.edu/"]
    );
    assert_eq!(summary.totals().pages_processed, 1);

    let stats = store.statistics().unwrap();
    assert_eq!(stats.total_urls(), 2);
    assert_eq!(stats.pending_urls, 0);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_page_in_flight_when_robots_disallows_it() {
    let config = create_test_config(&["http://www.example.edu/private/a.html"], 2, 0);
    let store = in_memory_store(&config);
    let web = Arc::new(
        StubWeb::default()
            .robots(
                "http://www.example.edu/robots.txt",
                "User-agent: *\nDisallow: /private/\n",
            )
            .page(
                "http://www.example.edu/private/a.html",
                r#"<a href="/public.html">Public</a>"#,
            )
            .page("http://www.example.edu/public.html", "<p>Public</p>")
            .latency(Duration::from_millis(300), Duration::from_millis(600)),
    );

    let coordinator = Coordinator::with_parts(config, store.clone(), web.clone());
    coordinator.seed().unwrap();
    let summary = coordinator.run().await.unwrap();

    assert_eq!(summary.failed_workers(), 0);
    assert_eq!(summary.totals().robots_processed, 1);
    assert_eq!(summary.totals().pages_processed, 2);
    assert!(web
        .requested()
        .contains(&"http://www.example.edu/private/a.html".to_string()));

    let stats = store.statistics().unwrap();
    assert_eq!(stats.pending_urls, 0);
    assert_eq!(stats.crawled_urls, 3);
    assert_eq!(stats.documents, 2);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_same_host_requests_are_spaced() {
    let delay = Duration::from_millis(60);
    let config = create_test_config(&["http://www.example.edu/"], 4, delay.as_millis() as u64);
    let store = in_memory_store(&config);
    let web = Arc::new(
        StubWeb::default()
            .page("http://www.example.edu/", r#"<a href="/1.html">1</a>"#)
            .page("http://www.example.edu/1.html", r#"<a href="/2.html">2</a>"#)
            .page("http://www.example.edu/2.html", "<p>End</p>"),
    );

    let coordinator = Coordinator::with_parts(config, store, web.clone());
    coordinator.seed().unwrap();
    coordinator.run().await.unwrap();

    let requests = web.requests.lock().unwrap().clone();
    assert_eq!(requests.len(), 4);
    for pair in requests.windows(2) {
        let gap = pair[1].1.duration_since(pair[0].1);
        assert!(
            gap + Duration::from_millis(10) >= delay,
            "{} followed {} after only {:?}",
            pair[1].0,
            pair[0].0,
            gap
        );
    }
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn test_other_hosts_are_not_held_back() {
    let delay = Duration::from_millis(400);
    let config = create_test_config(
        &["http://a.example.edu/", "http://b.example.edu/"],
        2,
        delay.as_millis() as u64,
    );
    let store = in_memory_store(&config);
    let web = Arc::new(
        StubWeb::default()
            .page("http://a.example.edu/", "<p>A</p>")
            .page("http://b.example.edu/", "<p>B</p>"),
    );

    let coordinator = Coordinator::with_parts(config, store, web.clone());
    coordinator.seed().unwrap();
    let started = Instant::now();
    coordinator.run().await.unwrap();

    // Two rounds: robots of both hosts, then both pages after one delay
    let elapsed = started.elapsed();
    assert!(elapsed >= delay);
    assert!(elapsed < delay * 2, "crawl took {:?}", elapsed);
    assert_eq!(web.requested().len(), 4);
}

#[tokio::test]
async fn test_crawl_state_survives_restart() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("crawl.db");

    let mut config = create_test_config(&["http://www.example.edu/"], 2, 0);
    config.storage.database_path = db_path.to_string_lossy().to_string();
    let policy = AdmissionPolicy::from_config(&config.admission);

    let web = Arc::new(
        StubWeb::default()
            .page("http://www.example.edu/", r#"<a href="/next.html">Next</a>"#)
            .page("http://www.example.edu/next.html", "<p>Next</p>"),
    );

    {
        let store = Arc::new(open_store(&db_path, policy.clone()).unwrap());
        let coordinator = Coordinator::with_parts(config.clone(), store, web.clone());
        coordinator.seed().unwrap();
        let summary = coordinator.run().await.unwrap();
        assert_eq!(summary.totals().total(), 3);
    }

    let store = Arc::new(open_store(&db_path, policy).unwrap());
    assert_eq!(store.statistics().unwrap().crawled_urls, 3);

    let coordinator = Coordinator::with_parts(config, store, web.clone());
    assert_eq!(coordinator.seed().unwrap(), 0);
    let summary = coordinator.run().await.unwrap();
    assert_eq!(summary.totals().total(), 0);
    assert_eq!(web.requested().len(), 3);
}
