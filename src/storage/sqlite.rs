//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the JobStore trait.

use crate::crawler::{Job, Locator, ROBOTS_PATH};
use crate::robots::{evaluate, RobotsRule, RobotsRuleSet};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{JobStore, StoreError, StoreResult};
use crate::storage::{AdmissionPolicy, StoreStatistics};
use chrono::Utc;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use std::collections::BTreeSet;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info};

/// SQLite job store backend
pub struct SqliteJobStore {
    conn: Mutex<Connection>,
    admission: AdmissionPolicy,
}

impl SqliteJobStore {
    /// Creates a new SqliteJobStore instance
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    /// * `admission` - Rules deciding which discovered links become jobs
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteJobStore)` - Successfully opened/created database
    /// * `Err(StoreError)` - Failed to open database
    pub fn new(path: &Path, admission: AdmissionPolicy) -> StoreResult<Self> {
        Self::configure(Connection::open(path)?, admission)
    }

    /// Opens a database that must already exist
    ///
    /// Unlike [`SqliteJobStore::new`], a missing file is an error rather than
    /// a fresh empty store.
    pub fn open_existing(path: &Path, admission: AdmissionPolicy) -> StoreResult<Self> {
        let conn = Connection::open_with_flags(path, OpenFlags::SQLITE_OPEN_READ_WRITE)?;
        Self::configure(conn, admission)
    }

    fn configure(conn: Connection, admission: AdmissionPolicy) -> StoreResult<Self> {
        // Configure SQLite for better performance
        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            admission,
        })
    }

    /// Creates an in-memory database
    pub fn new_in_memory(admission: AdmissionPolicy) -> StoreResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            admission,
        })
    }

    fn lock(&self) -> StoreResult<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|_| StoreError::LockPoisoned)
    }

    /// Adds a seed URL, plus its robots.txt job when the host needs one
    ///
    /// Seeds bypass the admission policy. Seeding a URL that is already known
    /// creates nothing.
    ///
    /// # Returns
    ///
    /// The jobs that were created
    pub fn seed(&self, locator: &Locator) -> StoreResult<Vec<Job>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let mut created = Vec::new();

        let host_id = ensure_host(&tx, &locator.host)?;
        if find_url(&tx, &locator.protocol, host_id, &locator.path)?.is_none() {
            let id = insert_url(&tx, &locator.protocol, host_id, &locator.path)?;
            created.push(Job::new(id, locator.clone()));
        }

        if needs_robots_job(&tx, &locator.protocol, host_id)? {
            let robots = locator.robots_locator();
            let id = insert_url(&tx, &robots.protocol, host_id, &robots.path)?;
            created.push(Job::new(id, robots));
        }

        tx.commit()?;

        for job in &created {
            info!("Seeded {}", job);
        }
        Ok(created)
    }

    /// Counts the contents of the store
    pub fn statistics(&self) -> StoreResult<StoreStatistics> {
        let conn = self.lock()?;

        let count = |sql: &str| -> StoreResult<u64> {
            let n: i64 = conn.query_row(sql, [], |row| row.get(0))?;
            Ok(n as u64)
        };

        let mut stmt = conn.prepare(
            "SELECT h.host_name, COUNT(*) AS pending
             FROM urls u JOIN hosts h ON u.host_id = h.id
             WHERE u.crawled_at IS NULL
             GROUP BY h.host_name
             ORDER BY pending DESC, h.host_name",
        )?;
        let pending_by_host = stmt
            .query_map([], |row| {
                Ok((row.get::<_, String>(0)?, row.get::<_, i64>(1)? as u64))
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(StoreStatistics {
            pending_urls: count("SELECT COUNT(*) FROM urls WHERE crawled_at IS NULL")?,
            crawled_urls: count("SELECT COUNT(*) FROM urls WHERE crawled_at IS NOT NULL")?,
            documents: count("SELECT COUNT(*) FROM documents")?,
            robots_rules: count("SELECT COUNT(*) FROM robots_rules")?,
            hosts: count("SELECT COUNT(*) FROM hosts")?,
            pending_by_host,
        })
    }

    /// Returns the stored content of a document, if one was recorded
    pub fn document(&self, url_id: i64) -> StoreResult<Option<String>> {
        let conn = self.lock()?;
        let content = conn
            .query_row(
                "SELECT content FROM documents WHERE url_id = ?1",
                params![url_id],
                |row| row.get(0),
            )
            .optional()?;
        Ok(content)
    }

    /// Returns the persisted robots rules for a protocol and host
    pub fn robots_rules(&self, protocol: &str, host: &str) -> StoreResult<RobotsRuleSet> {
        let conn = self.lock()?;
        match find_host(&conn, host)? {
            Some(host_id) => load_rules(&conn, protocol, host, host_id),
            None => Ok(RobotsRuleSet::new()),
        }
    }
}

impl JobStore for SqliteJobStore {
    fn load_pending_jobs(&self) -> StoreResult<Vec<Job>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT u.id, u.protocol, h.host_name, u.path
             FROM urls u JOIN hosts h ON u.host_id = h.id
             WHERE u.crawled_at IS NULL
             ORDER BY u.id",
        )?;

        let rows = stmt.query_map([], |row| {
            Ok((
                row.get::<_, i64>(0)?,
                row.get::<_, String>(1)?,
                row.get::<_, String>(2)?,
                row.get::<_, String>(3)?,
            ))
        })?;

        let mut jobs = Vec::new();
        for row in rows {
            let (id, protocol, host, path) = row?;
            if !matches!(protocol.as_str(), "http" | "https") || !path.starts_with('/') {
                return Err(StoreError::InvalidLocator(format!(
                    "{}://{}{}",
                    protocol, host, path
                )));
            }
            jobs.push(Job::new(id, Locator::new(protocol, host, path)));
        }

        debug!("Loaded {} pending jobs", jobs.len());
        Ok(jobs)
    }

    fn complete_robots(&self, job: &Job, rules: &RobotsRuleSet) -> StoreResult<Vec<Job>> {
        let locator = job.locator();
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;

        let host_id = ensure_host(&tx, &locator.host)?;

        let mut rules = rules.clone();
        rules.ensure_root_rule(&locator.protocol, &locator.host);
        for rule in &rules {
            tx.execute(
                "INSERT OR IGNORE INTO robots_rules (protocol, host_id, path_prefix, allowed)
                 VALUES (?1, ?2, ?3, ?4)",
                params![locator.protocol, host_id, rule.path_prefix, rule.allowed],
            )?;
        }

        let persisted = load_rules(&tx, &locator.protocol, &locator.host, host_id)?;

        let pending = {
            let mut stmt = tx.prepare(
                "SELECT id, path FROM urls
                 WHERE protocol = ?1 AND host_id = ?2 AND crawled_at IS NULL AND id != ?3",
            )?;
            let rows = stmt.query_map(params![locator.protocol, host_id, job.id()], |row| {
                Ok((row.get::<_, i64>(0)?, row.get::<_, String>(1)?))
            })?;
            rows.collect::<Result<Vec<_>, _>>()?
        };

        let mut disallowed = Vec::new();
        for (id, path) in pending {
            if !evaluate(&persisted, &path) {
                tx.execute("DELETE FROM urls WHERE id = ?1", params![id])?;
                disallowed.push(Job::new(
                    id,
                    Locator::new(locator.protocol.clone(), locator.host.clone(), path),
                ));
            }
        }

        mark_crawled(&tx, job)?;
        tx.commit()?;

        for removed in &disallowed {
            info!("Removed {} because robots.txt disallows it", removed);
        }
        Ok(disallowed)
    }

    fn complete_html(
        &self,
        job: &Job,
        links: &BTreeSet<Locator>,
        content: &str,
    ) -> StoreResult<Vec<Job>> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let url_id = mark_crawled(&tx, job)?;
        let mut created = Vec::new();

        for link in links {
            if let Some(host_id) = find_host(&tx, &link.host)? {
                if find_url(&tx, &link.protocol, host_id, &link.path)?.is_some() {
                    continue;
                }
            }

            if !self.admission.admits_host(&link.host) || !self.admission.admits_path(&link.path) {
                continue;
            }

            let host_id = ensure_host(&tx, &link.host)?;
            let rules = load_rules(&tx, &link.protocol, &link.host, host_id)?;
            let add_robots = if rules.is_empty() {
                needs_robots_job(&tx, &link.protocol, host_id)? && !link.is_robots_file()
            } else if evaluate(&rules, &link.path) {
                false
            } else {
                debug!("Disallowing {} by robots.txt", link);
                continue;
            };

            let id = insert_url(&tx, &link.protocol, host_id, &link.path)?;
            created.push(Job::new(id, link.clone()));

            if add_robots {
                let robots = link.robots_locator();
                let id = insert_url(&tx, &robots.protocol, host_id, &robots.path)?;
                created.push(Job::new(id, robots));
            }
        }

        // Content with an embedded NUL is not stored
        let content = if content.contains('\0') { "" } else { content };
        if !content.is_empty() {
            tx.execute(
                "INSERT OR REPLACE INTO documents (url_id, content, fetched_at) VALUES (?1, ?2, ?3)",
                params![url_id, content, Utc::now().to_rfc3339()],
            )?;
        }

        tx.commit()?;

        debug!("{} produced {} new jobs", job, created.len());
        Ok(created)
    }

    fn cancel_html(&self, job: &Job) -> StoreResult<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        mark_crawled(&tx, job)?;
        tx.commit()?;
        Ok(())
    }
}

fn find_host(conn: &Connection, host: &str) -> StoreResult<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM hosts WHERE host_name = ?1",
            params![host],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn ensure_host(conn: &Connection, host: &str) -> StoreResult<i64> {
    if let Some(id) = find_host(conn, host)? {
        return Ok(id);
    }
    conn.execute("INSERT INTO hosts (host_name) VALUES (?1)", params![host])?;
    Ok(conn.last_insert_rowid())
}

fn find_url(conn: &Connection, protocol: &str, host_id: i64, path: &str) -> StoreResult<Option<i64>> {
    let id = conn
        .query_row(
            "SELECT id FROM urls WHERE protocol = ?1 AND host_id = ?2 AND path = ?3",
            params![protocol, host_id, path],
            |row| row.get(0),
        )
        .optional()?;
    Ok(id)
}

fn insert_url(conn: &Connection, protocol: &str, host_id: i64, path: &str) -> StoreResult<i64> {
    conn.execute(
        "INSERT INTO urls (protocol, host_id, path, discovered_at) VALUES (?1, ?2, ?3, ?4)",
        params![protocol, host_id, path, Utc::now().to_rfc3339()],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Marks a job's url crawled and returns its row id
///
/// A job already handed out can lose its row to a later robots.txt. Its
/// completion still counts, so the row comes back as crawled.
fn mark_crawled(conn: &Connection, job: &Job) -> StoreResult<i64> {
    let now = Utc::now().to_rfc3339();
    let updated = conn.execute(
        "UPDATE urls SET crawled_at = ?1 WHERE id = ?2",
        params![now, job.id()],
    )?;
    if updated > 0 {
        return Ok(job.id());
    }

    let locator = job.locator();
    let host_id = ensure_host(conn, &locator.host)?;
    if let Some(id) = find_url(conn, &locator.protocol, host_id, &locator.path)? {
        conn.execute(
            "UPDATE urls SET crawled_at = ?1 WHERE id = ?2",
            params![now, id],
        )?;
        return Ok(id);
    }

    conn.execute(
        "INSERT INTO urls (id, protocol, host_id, path, discovered_at, crawled_at)
         VALUES (?1, ?2, ?3, ?4, ?5, ?5)",
        params![job.id(), locator.protocol, host_id, locator.path, now],
    )?;
    debug!("Restored {} after robots.txt removed it mid-fetch", job);
    Ok(job.id())
}

fn load_rules(conn: &Connection, protocol: &str, host: &str, host_id: i64) -> StoreResult<RobotsRuleSet> {
    let mut stmt = conn.prepare(
        "SELECT path_prefix, allowed FROM robots_rules WHERE protocol = ?1 AND host_id = ?2",
    )?;
    let rules = stmt
        .query_map(params![protocol, host_id], |row| {
            Ok(RobotsRule::new(
                protocol,
                host,
                row.get::<_, String>(0)?,
                row.get::<_, bool>(1)?,
            ))
        })?
        .collect::<Result<RobotsRuleSet, _>>()?;
    Ok(rules)
}

/// A host needs a robots.txt job if it has neither rules nor such a job yet
fn needs_robots_job(conn: &Connection, protocol: &str, host_id: i64) -> StoreResult<bool> {
    let has_rules: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM robots_rules WHERE protocol = ?1 AND host_id = ?2)",
        params![protocol, host_id],
        |row| row.get(0),
    )?;
    if has_rules {
        return Ok(false);
    }
    Ok(find_url(conn, protocol, host_id, ROBOTS_PATH)?.is_none())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn policy() -> AdmissionPolicy {
        AdmissionPolicy::new(["example.edu"], ["private.example.edu"], [".pdf"])
    }

    fn store() -> SqliteJobStore {
        SqliteJobStore::new_in_memory(policy()).unwrap()
    }

    fn locator(url: &str) -> Locator {
        Locator::parse(url).unwrap()
    }

    fn links(urls: &[&str]) -> BTreeSet<Locator> {
        urls.iter().map(|u| locator(u)).collect()
    }

    fn paths(jobs: &[Job]) -> Vec<String> {
        let mut paths: Vec<String> = jobs.iter().map(|j| j.locator().to_string()).collect();
        paths.sort();
        paths
    }

    fn rule(prefix: &str, allowed: bool) -> RobotsRule {
        RobotsRule::new("http", "www.example.edu", prefix, allowed)
    }

    /// Seeds one host and completes its robots job with `rules`
    fn seeded_with_rules(rules: &[RobotsRule]) -> (SqliteJobStore, Job) {
        let store = store();
        let created = store.seed(&locator("http://www.example.edu/")).unwrap();
        let robots = created.iter().find(|j| j.is_robots()).unwrap().clone();
        let page = created.iter().find(|j| !j.is_robots()).unwrap().clone();
        store
            .complete_robots(&robots, &rules.iter().cloned().collect())
            .unwrap();
        (store, page)
    }

    #[test]
    fn test_create_in_memory() {
        let store = store();
        assert!(store.load_pending_jobs().unwrap().is_empty());
    }

    #[test]
    fn test_seed_creates_page_and_robots() {
        let store = store();
        let created = store.seed(&locator("http://www.example.edu/")).unwrap();
        assert_eq!(
            paths(&created),
            vec!["http://www.example.edu/", "http://www.example.edu/robots.txt"]
        );
        assert_eq!(store.load_pending_jobs().unwrap().len(), 2);
    }

    #[test]
    fn test_seed_is_idempotent() {
        let store = store();
        store.seed(&locator("http://www.example.edu/")).unwrap();
        let again = store.seed(&locator("http://www.example.edu/")).unwrap();
        assert!(again.is_empty());

        let other = store.seed(&locator("http://www.example.edu/about")).unwrap();
        assert_eq!(paths(&other), vec!["http://www.example.edu/about"]);
    }

    #[test]
    fn test_cancel_marks_crawled() {
        let store = store();
        let created = store.seed(&locator("http://www.example.edu/")).unwrap();
        let page = created.iter().find(|j| !j.is_robots()).unwrap();
        store.cancel_html(page).unwrap();

        let pending = store.load_pending_jobs().unwrap();
        assert_eq!(pending.len(), 1);
        assert!(pending[0].is_robots());
    }

    #[test]
    fn test_complete_robots_synthesizes_root_rule() {
        let (store, _) = seeded_with_rules(&[rule("/private/", false)]);
        let rules = store.robots_rules("http", "www.example.edu").unwrap();
        assert!(rules.contains(&rule("/", true)));
        assert!(rules.contains(&rule("/private/", false)));
        assert_eq!(rules.len(), 2);
    }

    #[test]
    fn test_complete_robots_keeps_explicit_root_rule() {
        let (store, _) = seeded_with_rules(&[rule("/", false)]);
        let rules = store.robots_rules("http", "www.example.edu").unwrap();
        assert_eq!(rules.len(), 1);
        assert!(rules.contains(&rule("/", false)));
    }

    #[test]
    fn test_complete_robots_returns_disallowed_pending_jobs() {
        let store = store();
        let created = store.seed(&locator("http://www.example.edu/")).unwrap();
        store.seed(&locator("http://www.example.edu/a/1.html")).unwrap();
        store.seed(&locator("http://www.example.edu/b/1.html")).unwrap();
        let robots = created.iter().find(|j| j.is_robots()).unwrap();

        let rules: RobotsRuleSet = [rule("/a/", false)].into_iter().collect();
        let removed = store.complete_robots(robots, &rules).unwrap();
        assert_eq!(paths(&removed), vec!["http://www.example.edu/a/1.html"]);

        let pending = paths(&store.load_pending_jobs().unwrap());
        assert_eq!(
            pending,
            vec!["http://www.example.edu/", "http://www.example.edu/b/1.html"]
        );
    }

    #[test]
    fn test_complete_robots_ignores_other_protocol() {
        let store = store();
        let created = store.seed(&locator("http://www.example.edu/a")).unwrap();
        store.seed(&locator("https://www.example.edu/a")).unwrap();
        let robots = created.iter().find(|j| j.is_robots()).unwrap();

        let rules: RobotsRuleSet = [rule("/a", false)].into_iter().collect();
        let removed = store.complete_robots(robots, &rules).unwrap();
        assert_eq!(paths(&removed), vec!["http://www.example.edu/a"]);
        assert!(paths(&store.load_pending_jobs().unwrap())
            .contains(&"https://www.example.edu/a".to_string()));
    }

    #[test]
    fn test_complete_html_admits_new_links() {
        let (store, page) = seeded_with_rules(&[]);
        let found = links(&[
            "http://www.example.edu/next.html",
            "http://other.com/",
            "http://private.example.edu/",
            "http://www.example.edu/paper.PDF",
        ]);

        let created = store.complete_html(&page, &found, "<html></html>").unwrap();
        assert_eq!(paths(&created), vec!["http://www.example.edu/next.html"]);
    }

    #[test]
    fn test_complete_html_deduplicates() {
        let (store, page) = seeded_with_rules(&[]);
        let found = links(&["http://www.example.edu/", "http://www.example.edu/x"]);
        let created = store.complete_html(&page, &found, "").unwrap();
        assert_eq!(paths(&created), vec!["http://www.example.edu/x"]);
    }

    #[test]
    fn test_complete_html_applies_robots_rules() {
        let (store, page) = seeded_with_rules(&[rule("/private/", false)]);
        let found = links(&[
            "http://www.example.edu/private/x.html",
            "http://www.example.edu/public/x.html",
        ]);
        let created = store.complete_html(&page, &found, "").unwrap();
        assert_eq!(paths(&created), vec!["http://www.example.edu/public/x.html"]);
    }

    #[test]
    fn test_complete_html_adds_robots_job_for_new_host() {
        let (store, page) = seeded_with_rules(&[]);
        let found = links(&[
            "https://cs.example.edu/a.html",
            "https://cs.example.edu/b.html",
        ]);
        let created = store.complete_html(&page, &found, "").unwrap();
        assert_eq!(
            paths(&created),
            vec![
                "https://cs.example.edu/a.html",
                "https://cs.example.edu/b.html",
                "https://cs.example.edu/robots.txt",
            ]
        );
    }

    #[test]
    fn test_complete_html_link_to_robots_file() {
        let (store, page) = seeded_with_rules(&[]);
        let found = links(&["http://cs.example.edu/robots.txt"]);
        let created = store.complete_html(&page, &found, "").unwrap();
        assert_eq!(paths(&created), vec!["http://cs.example.edu/robots.txt"]);
    }

    #[test]
    fn test_complete_html_stores_document() {
        let (store, page) = seeded_with_rules(&[]);
        store
            .complete_html(&page, &BTreeSet::new(), "<html>hello</html>")
            .unwrap();
        assert_eq!(
            store.document(page.id()).unwrap().as_deref(),
            Some("<html>hello</html>")
        );
        assert!(!paths(&store.load_pending_jobs().unwrap())
            .contains(&"http://www.example.edu/".to_string()));
    }

    #[test]
    fn test_complete_html_drops_nul_content() {
        let (store, page) = seeded_with_rules(&[]);
        store
            .complete_html(&page, &BTreeSet::new(), "bad\0content")
            .unwrap();
        assert_eq!(store.document(page.id()).unwrap(), None);
    }

    /// Seeds a page under /private/ and lets robots.txt remove it while it is out
    fn removed_while_dispatched() -> (SqliteJobStore, Job) {
        let store = store();
        let created = store
            .seed(&locator("http://www.example.edu/private/a.html"))
            .unwrap();
        let robots = created.iter().find(|j| j.is_robots()).unwrap().clone();
        let page = created.iter().find(|j| !j.is_robots()).unwrap().clone();

        let rules: RobotsRuleSet = [rule("/private/", false)].into_iter().collect();
        let removed = store.complete_robots(&robots, &rules).unwrap();
        assert_eq!(removed, vec![page.clone()]);
        (store, page)
    }

    #[test]
    fn test_complete_html_after_robots_removed_dispatched_job() {
        let (store, page) = removed_while_dispatched();

        let created = store
            .complete_html(
                &page,
                &links(&["http://www.example.edu/next.html"]),
                "<html>hi</html>",
            )
            .unwrap();
        assert_eq!(paths(&created), vec!["http://www.example.edu/next.html"]);
        assert_eq!(
            store.document(page.id()).unwrap().as_deref(),
            Some("<html>hi</html>")
        );

        let stats = store.statistics().unwrap();
        assert_eq!(stats.crawled_urls, 2);
        assert_eq!(stats.pending_urls, 1);
    }

    #[test]
    fn test_cancel_html_after_robots_removed_dispatched_job() {
        let (store, page) = removed_while_dispatched();
        store.cancel_html(&page).unwrap();

        assert!(store.load_pending_jobs().unwrap().is_empty());
        assert_eq!(store.statistics().unwrap().crawled_urls, 2);
    }

    #[test]
    fn test_statistics() {
        let (store, page) = seeded_with_rules(&[rule("/private/", false)]);
        store
            .complete_html(
                &page,
                &links(&["http://www.example.edu/a", "http://cs.example.edu/"]),
                "<html></html>",
            )
            .unwrap();

        let stats = store.statistics().unwrap();
        assert_eq!(stats.crawled_urls, 2);
        assert_eq!(stats.pending_urls, 3);
        assert_eq!(stats.documents, 1);
        assert_eq!(stats.robots_rules, 2);
        assert_eq!(stats.hosts, 2);
        assert_eq!(
            stats.pending_by_host,
            vec![("cs.example.edu".to_string(), 2), ("www.example.edu".to_string(), 1)]
        );
    }
}
