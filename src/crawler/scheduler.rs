//! Frontier scheduler
//!
//! This module owns the breadth-first queue of `(url, depth)` entries, the
//! visited set and the per-domain politeness state for a single crawl run.
//!
//! # Rules
//!
//! - Every URL is normalized before it is queued or compared
//! - Entries deeper than the depth limit are never queued
//! - A URL is handed out at most once per run
//! - Consecutive fetches to one domain are spaced by the crawl delay,
//!   measured from the end of the previous fetch

use crate::state::{DomainState, PolitenessPolicy};
use crate::url::normalize_url;
use crate::UrlResult;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet, VecDeque};
use std::time::Duration;
use tokio::time::Instant;

/// One queued URL and the link distance from its seed
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FrontierEntry {
    pub url: String,
    pub depth: u32,
}

/// BFS frontier for one crawl run
#[derive(Debug)]
pub struct Frontier {
    queue: VecDeque<FrontierEntry>,
    queued: HashSet<String>,
    visited: HashSet<String>,
    domains: HashMap<String, DomainState>,
    policy: PolitenessPolicy,
    max_depth: u32,
}

impl Frontier {
    pub fn new(max_depth: u32, policy: PolitenessPolicy) -> Self {
        Self {
            queue: VecDeque::new(),
            queued: HashSet::new(),
            visited: HashSet::new(),
            domains: HashMap::new(),
            policy,
            max_depth,
        }
    }

    /// Queues a URL at `depth`
    ///
    /// Returns `Ok(false)` when the URL was already queued or visited, or
    /// when `depth` exceeds the limit.
    pub fn enqueue(&mut self, url: &str, depth: u32) -> UrlResult<bool> {
        let url = normalize_url(url)?;

        if depth > self.max_depth {
            tracing::trace!("Not queueing {} at depth {} (limit {})", url, depth, self.max_depth);
            return Ok(false);
        }

        if self.visited.contains(&url) || self.queued.contains(&url) {
            return Ok(false);
        }

        self.queued.insert(url.clone());
        self.queue.push_back(FrontierEntry { url, depth });
        Ok(true)
    }

    /// Takes the next unvisited entry and marks it visited
    pub fn next(&mut self) -> Option<FrontierEntry> {
        while let Some(entry) = self.queue.pop_front() {
            self.queued.remove(&entry.url);
            if self.visited.insert(entry.url.clone()) {
                return Some(entry);
            }
        }
        None
    }

    /// Puts an entry that was taken but not fetched back at the front
    pub fn requeue_front(&mut self, entry: FrontierEntry) {
        self.visited.remove(&entry.url);
        self.queued.insert(entry.url.clone());
        self.queue.push_front(entry);
    }

    pub fn is_empty(&self) -> bool {
        self.queue.is_empty()
    }

    /// Number of queued entries
    pub fn len(&self) -> usize {
        self.queue.len()
    }

    pub fn is_visited(&self, url: &str) -> bool {
        normalize_url(url)
            .map(|u| self.visited.contains(&u))
            .unwrap_or(false)
    }

    pub fn visited_count(&self) -> usize {
        self.visited.len()
    }

    /// Checks if a domain has used up its request cap for this run
    pub fn domain_exhausted(&self, domain: &str) -> bool {
        self.domains
            .get(domain)
            .is_some_and(|state| state.has_exceeded_limit(&self.policy))
    }

    /// Time to wait before `domain` may be fetched, if any
    pub fn wait_time(&self, domain: &str, now: Instant) -> Option<Duration> {
        self.domains
            .get(domain)
            .and_then(|state| state.time_until_next_request(&self.policy, now))
    }

    /// Records that a fetch to `domain` is starting
    pub fn record_fetch_start(&mut self, domain: &str, now: Instant) {
        self.domains
            .entry(domain.to_string())
            .or_default()
            .record_request(now);
    }

    /// Records that a fetch to `domain` has finished
    pub fn record_fetch_end(&mut self, domain: &str, now: Instant) {
        self.domains
            .entry(domain.to_string())
            .or_default()
            .record_completion(now);
    }

    /// Entries still queued, in dequeue order
    pub fn residual(&self) -> Vec<FrontierEntry> {
        self.queue.iter().cloned().collect()
    }
}
