use std::time::Duration;
use tokio::time::Instant;

/// Per-domain politeness limits applied by the frontier
#[derive(Debug, Clone, Copy)]
pub struct PolitenessPolicy {
    /// Minimum spacing between consecutive fetches to one domain
    pub crawl_delay: Duration,

    /// Maximum fetches to one domain in a run
    pub max_requests: u32,
}

impl Default for PolitenessPolicy {
    fn default() -> Self {
        Self {
            crawl_delay: Duration::from_secs(2),
            max_requests: 500,
        }
    }
}

/// Tracks the fetch history of one domain during a crawl run
///
/// Holds the domain's last-visit timestamp and its request count. The
/// timestamp is written immediately before and after each fetch, so spacing
/// is measured from the end of the previous fetch.
#[derive(Debug, Clone, Default)]
pub struct DomainState {
    /// Number of fetches started against this domain
    pub request_count: u32,

    /// Timestamp of the last fetch start or completion
    pub last_request_time: Option<Instant>,
}

impl DomainState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records the start of a fetch
    pub fn record_request(&mut self, now: Instant) {
        self.request_count += 1;
        self.last_request_time = Some(now);
    }

    /// Records the completion of a fetch
    pub fn record_completion(&mut self, now: Instant) {
        self.last_request_time = Some(now);
    }

    /// Checks if this domain has used up its request budget
    pub fn has_exceeded_limit(&self, policy: &PolitenessPolicy) -> bool {
        self.request_count >= policy.max_requests
    }

    /// Time left before the next fetch may start, or None if it may start now
    pub fn time_until_next_request(
        &self,
        policy: &PolitenessPolicy,
        now: Instant,
    ) -> Option<Duration> {
        let last = self.last_request_time?;
        let elapsed = now.saturating_duration_since(last);
        if elapsed < policy.crawl_delay {
            Some(policy.crawl_delay - elapsed)
        } else {
            None
        }
    }
}
