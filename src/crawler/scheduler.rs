//! Host-fair scheduler for handing out crawl jobs
//!
//! This module handles:
//! - Per-host queues ordered by job priority
//! - Round-robin draws across hosts, one job per host per round
//! - A minimum delay between two releases for the same host
//! - Dropping pending jobs that newly learned robots rules disallow
//!
//! Every operation runs under one lock, including the politeness wait inside
//! [`HostFairScheduler::acquire_job`]. While one worker waits out a host's
//! delay, no other worker can acquire or complete a job.

use crate::crawler::{Job, Locator};
use crate::robots::RobotsRuleSet;
use crate::storage::{JobStore, StoreResult};
use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{Mutex, Notify};
use tracing::{debug, info, trace};

/// Added to the politeness delay before a host's next release
pub const RELEASE_MARGIN: Duration = Duration::from_millis(5);

/// Queue state owned by the scheduler
#[derive(Debug, Default)]
struct SchedulerState {
    /// Pending jobs per host, lowest job first
    host_queues: BTreeMap<String, BTreeSet<Job>>,

    /// Jobs drawn for the current round, at most one per host
    round: VecDeque<Job>,

    /// When each host last had a job released
    last_release: HashMap<String, Instant>,
}

impl SchedulerState {
    fn enqueue(&mut self, job: Job) {
        self.host_queues
            .entry(job.host().to_string())
            .or_default()
            .insert(job);
    }

    /// Draws the head job of every non-empty host queue into the round buffer
    fn refill(&mut self) {
        for queue in self.host_queues.values_mut() {
            if let Some(job) = queue.pop_first() {
                self.round.push_back(job);
            }
        }
        self.host_queues.retain(|_, queue| !queue.is_empty());
        trace!("Refilled round with {} jobs", self.round.len());
    }

    /// Removes the given jobs wherever the scheduler still holds them
    fn remove_all(&mut self, jobs: &[Job]) {
        if jobs.is_empty() {
            return;
        }

        let ids: HashSet<i64> = jobs.iter().map(Job::id).collect();
        let hosts: HashSet<&str> = jobs.iter().map(Job::host).collect();

        self.round.retain(|job| !ids.contains(&job.id()));
        for host in hosts {
            if let Some(queue) = self.host_queues.get_mut(host) {
                queue.retain(|job| !ids.contains(&job.id()));
                if queue.is_empty() {
                    self.host_queues.remove(host);
                }
            }
        }
    }

    fn pending(&self) -> usize {
        self.round.len() + self.host_queues.values().map(BTreeSet::len).sum::<usize>()
    }
}

/// Hands out crawl jobs to concurrent workers
///
/// The scheduler coordinates:
/// - Robots.txt before content, http before https, lower ids first, per host
/// - Fairness across hosts through round-robin draws
/// - The politeness delay between releases for the same host
/// - Persisting completions through the [`JobStore`]
pub struct HostFairScheduler {
    store: Arc<dyn JobStore>,
    delay: Duration,
    state: Mutex<SchedulerState>,
    interrupt: Notify,
}

impl HostFairScheduler {
    /// Creates a scheduler holding every pending job of the store
    ///
    /// # Arguments
    ///
    /// * `store` - The job store to load from and report completions to
    /// * `delay` - Minimum time between two releases for the same host
    pub fn new(store: Arc<dyn JobStore>, delay: Duration) -> StoreResult<Self> {
        let mut state = SchedulerState::default();
        for job in store.load_pending_jobs()? {
            state.enqueue(job);
        }

        info!(
            "Scheduler loaded {} pending jobs across {} hosts",
            state.pending(),
            state.host_queues.len()
        );

        Ok(Self {
            store,
            delay,
            state: Mutex::new(state),
            interrupt: Notify::new(),
        })
    }

    /// Gets the next job to process
    ///
    /// This method:
    /// 1. Refills the round buffer from the host queues if it is empty
    /// 2. Returns None if there is still nothing to hand out
    /// 3. Waits until the job's host is past its politeness delay
    /// 4. Records the release time and returns the job
    ///
    /// # Returns
    ///
    /// * `Some(Job)` - The job to process
    /// * `None` - No work remains anywhere
    pub async fn acquire_job(&self) -> Option<Job> {
        let mut state = self.state.lock().await;

        if state.round.is_empty() {
            state.refill();
        }

        let job = state.round.pop_front()?;

        if let Some(&last) = state.last_release.get(job.host()) {
            self.wait_until(last + self.delay + RELEASE_MARGIN).await;
        }

        state
            .last_release
            .insert(job.host().to_string(), Instant::now());
        trace!("Released {}", job);
        Some(job)
    }

    /// Records the rules learned from a robots.txt job
    ///
    /// Pending jobs the store reports as disallowed are dropped from the
    /// round buffer and host queues. Jobs already handed out are not affected.
    /// On a store error nothing changes.
    pub async fn finish_robots(&self, job: &Job, rules: &RobotsRuleSet) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let disallowed = self.store.complete_robots(job, rules)?;

        if !disallowed.is_empty() {
            debug!(
                "Dropping {} jobs disallowed by {}",
                disallowed.len(),
                job.locator()
            );
        }
        state.remove_all(&disallowed);
        Ok(())
    }

    /// Records a fetched document and queues the jobs for its new links
    ///
    /// On a store error nothing changes.
    pub async fn finish_html(
        &self,
        job: &Job,
        links: &BTreeSet<Locator>,
        content: &str,
    ) -> StoreResult<()> {
        let mut state = self.state.lock().await;
        let new_jobs = self.store.complete_html(job, links, content)?;

        debug!("{} added {} jobs", job, new_jobs.len());
        for new_job in new_jobs {
            state.enqueue(new_job);
        }
        Ok(())
    }

    /// Records that a job's content could not be obtained
    pub async fn cancel_html(&self, job: &Job) -> StoreResult<()> {
        let _state = self.state.lock().await;
        self.store.cancel_html(job)
    }

    /// Wakes any worker parked in a politeness wait
    ///
    /// The woken worker recomputes its remaining wait and resumes it, so this
    /// never shortens a delay.
    pub fn interrupt_waiters(&self) {
        self.interrupt.notify_waiters();
    }

    /// Number of jobs the scheduler still holds
    pub async fn pending_jobs(&self) -> usize {
        self.state.lock().await.pending()
    }

    async fn wait_until(&self, deadline: Instant) {
        loop {
            let now = Instant::now();
            if now >= deadline {
                return;
            }

            let remaining = deadline - now;
            debug!("Waiting {:?} before next release", remaining);
            tokio::select! {
                _ = tokio::time::sleep(remaining) => {}
                _ = self.interrupt.notified() => {
                    trace!("Politeness wait woken early");
                }
            }
        }
    }
}
