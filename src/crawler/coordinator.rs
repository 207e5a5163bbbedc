//! Crawl coordinator - main crawl orchestration logic
//!
//! This module contains the crawl loop that ties the frontier, the anonymity
//! session, the fetcher and the analysis pipeline together:
//! - Seeding the frontier and enforcing the page budget
//! - Rotating the anonymizing identity on a page-count cadence
//! - Enforcing per-domain spacing before every fetch
//! - Extracting, classifying and recording every fetched page
//! - Tracking seller profiles on marketplace pages
//! - Stopping cleanly on cancellation or a run deadline
//!
//! One `crawl` call is one run: it owns its frontier and session manager
//! and shares nothing mutable with other runs.

use crate::classify::{build_classifier, Classifier};
use crate::config::{read_control_auth, validate, Config, MAX_DEPTH};
use crate::content::extract;
use crate::crawler::fetcher::{fetch_page, FetchOutcome};
use crate::crawler::parser::extract_links;
use crate::crawler::record::PageRecord;
use crate::crawler::scheduler::{Frontier, FrontierEntry};
use crate::marketplace::{
    build_profile_parser, identify_marketplace, ProfileParser, SellerProfile, UNKNOWN_MARKETPLACE,
};
use crate::sellers::{analyze_trends, SellerHistory, SellerHistoryStore, TrendError, TrendReport};
use crate::session::{ControlAuth, IdentityController, SessionError, SessionManager, TorController};
use crate::state::PolitenessPolicy;
use crate::storage::{put_json_new, KeyValueStore, StorageError};
use crate::url::{extract_domain, is_network_url, normalize_url};
use crate::{ConfigError, UrlError};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::future::Future;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use url::Url;

/// Pages between progress log lines
const PROGRESS_EVERY: usize = 10;

/// Errors that end a crawl run
#[derive(Debug, Error)]
pub enum CrawlError {
    #[error("Invalid crawl request: {0}")]
    Config(#[from] ConfigError),

    /// The anonymizing session became unusable mid-run
    ///
    /// Everything collected before the failure is kept in `partial`.
    #[error("Anonymizing session lost: {source}")]
    SessionLost {
        source: SessionError,
        partial: Box<CrawlOutcome>,
    },
}

impl CrawlError {
    /// Records gathered before the run failed, if any run took place
    pub fn partial(&self) -> Option<&CrawlOutcome> {
        match self {
            CrawlError::Config(_) => None,
            CrawlError::SessionLost { partial, .. } => Some(partial),
        }
    }

    pub fn into_partial(self) -> Option<CrawlOutcome> {
        match self {
            CrawlError::Config(_) => None,
            CrawlError::SessionLost { partial, .. } => Some(*partial),
        }
    }
}

/// Errors from tracking a single seller page
#[derive(Debug, Error)]
pub enum TrackError {
    #[error("Fetch failed: {0}")]
    FetchFailed(String),

    #[error("Parse failed: no profile fields found at {0}")]
    ParseFailed(String),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),

    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("Invalid URL: {0}")]
    Url(#[from] UrlError),
}

/// Why a crawl run stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    FrontierExhausted,
    PageBudgetReached,
    Cancelled,
    DeadlineReached,
    SessionLost,
}

/// Parameters of one crawl run
#[derive(Debug, Clone, PartialEq)]
pub struct CrawlRequest {
    pub seeds: Vec<String>,
    pub max_pages: usize,
    pub depth_limit: u32,
    pub track_profiles: bool,
}

impl CrawlRequest {
    /// Builds a request from the configured seeds and limits
    pub fn from_config(config: &Config) -> Self {
        Self {
            seeds: config.crawler.seeds.clone(),
            max_pages: config.crawler.max_pages,
            depth_limit: config.crawler.max_depth,
            track_profiles: config.profiles.track,
        }
    }

    /// Replaces the seed list
    pub fn with_seeds(mut self, seeds: Vec<String>) -> Self {
        self.seeds = seeds;
        self
    }
}

/// Audit entry for one completed fetch
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FetchAttempt {
    pub url: String,
    pub depth: u32,
    pub started: DateTime<Utc>,
    pub finished: DateTime<Utc>,
    pub status: Option<u16>,
    pub error: Option<String>,
}

/// Everything a crawl run produced
#[derive(Debug, Clone, Serialize)]
pub struct CrawlOutcome {
    /// Retained page records, in fetch order
    pub records: Vec<PageRecord>,
    /// Entries discovered but never fetched, in dequeue order
    pub residual_frontier: Vec<FrontierEntry>,
    /// Fetches completed, errors included
    pub pages_crawled: usize,
    pub profiles_tracked: usize,
    pub attempts: Vec<FetchAttempt>,
    pub stop_reason: StopReason,
}

/// Mutable bookkeeping for one run
#[derive(Default)]
struct RunLog {
    records: Vec<PageRecord>,
    attempts: Vec<FetchAttempt>,
    pages_crawled: usize,
    profiles_tracked: usize,
}

impl RunLog {
    fn into_outcome(self, frontier: &Frontier, stop_reason: StopReason) -> CrawlOutcome {
        CrawlOutcome {
            records: self.records,
            residual_frontier: frontier.residual(),
            pages_crawled: self.pages_crawled,
            profiles_tracked: self.profiles_tracked,
            attempts: self.attempts,
            stop_reason,
        }
    }
}

/// Resolves once the run is cancelled or its deadline passes
async fn stop_signal(cancel: &CancellationToken, deadline: Option<Instant>) -> StopReason {
    match deadline {
        Some(deadline) => tokio::select! {
            _ = cancel.cancelled() => StopReason::Cancelled,
            _ = tokio::time::sleep_until(deadline) => StopReason::DeadlineReached,
        },
        None => {
            cancel.cancelled().await;
            StopReason::Cancelled
        }
    }
}

/// Drives `fut` to completion unless the run is stopped first
async fn run_until_stopped<F: Future>(
    fut: F,
    cancel: &CancellationToken,
    deadline: Option<Instant>,
) -> Result<F::Output, StopReason> {
    tokio::select! {
        biased;
        reason = stop_signal(cancel, deadline) => Err(reason),
        output = fut => Ok(output),
    }
}

/// Crawl orchestrator
///
/// Holds the run-independent pieces: configuration, the classifier and
/// profile parser chosen by configuration, and the optional durable store.
pub struct Crawler {
    config: Config,
    classifier: Box<dyn Classifier>,
    profile_parser: Box<dyn ProfileParser>,
    store: Option<Arc<dyn KeyValueStore>>,
    history: Option<SellerHistoryStore>,
    control: Option<(String, ControlAuth)>,
    resolve_overrides: Vec<(String, SocketAddr)>,
}

impl Crawler {
    /// Creates a crawler from configuration
    ///
    /// The configuration is validated first, so politeness floors such as
    /// the minimum crawl delay hold for configs built in code as well as
    /// for those read by `load_config`.
    pub fn new(config: Config) -> Result<Self, ConfigError> {
        validate(&config)?;
        Self::new_unchecked(config)
    }

    /// Creates a crawler without validating timing floors or limits
    ///
    /// Only the keyword table and the control credential are checked. Meant
    /// for driving local mock services where the minimum crawl delay and
    /// settle interval would make runs needlessly slow.
    pub fn new_unchecked(config: Config) -> Result<Self, ConfigError> {
        let classifier = build_classifier(&config.classifier)?;
        let profile_parser = build_profile_parser(config.profiles.parser);

        let control = match &config.control {
            Some(control) => Some((control.address.clone(), read_control_auth(control)?)),
            None => None,
        };

        Ok(Self {
            config,
            classifier,
            profile_parser,
            store: None,
            history: None,
            control,
            resolve_overrides: Vec::new(),
        })
    }

    /// Attaches the durable store for page records and seller snapshots
    pub fn with_store(mut self, store: Arc<dyn KeyValueStore>) -> Self {
        self.history = Some(SellerHistoryStore::new(Arc::clone(&store)));
        self.store = Some(store);
        self
    }

    /// Pins a host name to a socket address in every session this crawler builds
    pub fn with_resolve_override(mut self, host: &str, addr: SocketAddr) -> Self {
        self.resolve_overrides.push((host.to_string(), addr));
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn classifier(&self) -> &dyn Classifier {
        self.classifier.as_ref()
    }

    fn session_manager(&self) -> SessionManager {
        let timeout = Duration::from_secs(self.config.crawler.fetch_timeout_secs);
        self.resolve_overrides.iter().fold(
            SessionManager::new(self.config.session.clone(), timeout),
            |manager, (host, addr)| manager.with_resolve_override(host, *addr),
        )
    }

    /// Call-time checks that must pass before any network activity
    fn validate_request(&self, request: &CrawlRequest) -> Result<Vec<String>, ConfigError> {
        if request.seeds.is_empty() {
            return Err(ConfigError::Validation("no seed URLs given".to_string()));
        }

        if request.max_pages == 0 {
            return Err(ConfigError::Validation(
                "max-pages must be >= 1".to_string(),
            ));
        }

        if request.depth_limit > MAX_DEPTH {
            return Err(ConfigError::Validation(format!(
                "depth limit must be <= {}, got {}",
                MAX_DEPTH, request.depth_limit
            )));
        }

        request
            .seeds
            .iter()
            .map(|seed| {
                normalize_url(seed)
                    .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", seed, e)))
            })
            .collect()
    }

    /// Runs a crawl, rotating identity through the configured control port
    ///
    /// Without a `[control]` section the run proceeds without rotation.
    pub async fn crawl(
        &self,
        request: CrawlRequest,
        cancel: &CancellationToken,
    ) -> Result<CrawlOutcome, CrawlError> {
        match &self.control {
            Some((address, auth)) => {
                let mut controller = TorController::new(address, auth.clone());
                self.crawl_with_controller(
                    request,
                    Some(&mut controller as &mut dyn IdentityController),
                    cancel,
                )
                .await
            }
            None => self.crawl_with_controller(request, None, cancel).await,
        }
    }

    /// Runs a crawl with an explicit identity controller
    pub async fn crawl_with_controller(
        &self,
        request: CrawlRequest,
        mut controller: Option<&mut dyn IdentityController>,
        cancel: &CancellationToken,
    ) -> Result<CrawlOutcome, CrawlError> {
        let seeds = self.validate_request(&request)?;
        let crawler_config = &self.config.crawler;
        let network = &crawler_config.network_suffixes;

        let policy = PolitenessPolicy {
            crawl_delay: Duration::from_millis(crawler_config.crawl_delay_ms),
            max_requests: crawler_config.max_requests_per_domain,
        };
        let mut frontier = Frontier::new(request.depth_limit, policy);
        for seed in &seeds {
            if !is_network_url(seed, network) {
                tracing::warn!("Seed {} is outside the hidden-network address space", seed);
            }
            frontier
                .enqueue(seed, 0)
                .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", seed, e)))?;
        }

        let deadline = crawler_config
            .run_deadline_secs
            .map(|secs| Instant::now() + Duration::from_secs(secs));
        let rotate_every = crawler_config.rotate_every;

        if rotate_every > 0 && controller.is_none() {
            tracing::info!("No identity controller configured, rotation disabled");
        }

        let mut run = RunLog::default();
        let mut sessions = self.session_manager();
        let mut session = match sessions.new_session() {
            Ok(session) => session,
            Err(source) => {
                return Err(CrawlError::SessionLost {
                    source,
                    partial: Box::new(run.into_outcome(&frontier, StopReason::SessionLost)),
                })
            }
        };
        let mut last_rotation_at = 0;

        tracing::info!(
            "Starting crawl: {} seeds, budget {} pages, depth limit {}",
            seeds.len(),
            request.max_pages,
            request.depth_limit
        );

        let stop_reason = 'crawl: loop {
            if cancel.is_cancelled() {
                break StopReason::Cancelled;
            }
            if deadline.is_some_and(|deadline| Instant::now() >= deadline) {
                break StopReason::DeadlineReached;
            }
            if run.pages_crawled >= request.max_pages {
                break StopReason::PageBudgetReached;
            }
            if frontier.is_empty() {
                break StopReason::FrontierExhausted;
            }

            // Rotation cadence
            if rotate_every > 0
                && run.pages_crawled > 0
                && run.pages_crawled % rotate_every == 0
                && last_rotation_at != run.pages_crawled
            {
                last_rotation_at = run.pages_crawled;

                if let Some(ctrl) = controller.as_deref_mut() {
                    let rotation = run_until_stopped(
                        sessions.try_rotate_identity(ctrl, cancel),
                        cancel,
                        deadline,
                    )
                    .await;

                    match rotation {
                        Err(reason) => break 'crawl reason,
                        Ok(Ok(())) => continue 'crawl,
                        Ok(Err(source)) if crawler_config.abort_on_rotation_failure => {
                            tracing::error!(
                                "Identity rotation failed after {} pages, aborting run: {}",
                                run.pages_crawled,
                                source
                            );
                            return Err(CrawlError::SessionLost {
                                source,
                                partial: Box::new(
                                    run.into_outcome(&frontier, StopReason::SessionLost),
                                ),
                            });
                        }
                        Ok(Err(e)) => {
                            tracing::warn!("Identity rotation failed, keeping current session: {}", e);
                        }
                    }
                }
            }

            if !sessions.is_current(&session) {
                session = match sessions.new_session() {
                    Ok(session) => session,
                    Err(source) => {
                        return Err(CrawlError::SessionLost {
                            source,
                            partial: Box::new(run.into_outcome(&frontier, StopReason::SessionLost)),
                        })
                    }
                };
            }

            let Some(entry) = frontier.next() else {
                break StopReason::FrontierExhausted;
            };

            let Some(domain) = extract_domain(&entry.url) else {
                tracing::warn!("Skipping {}: no host", entry.url);
                continue;
            };

            if frontier.domain_exhausted(&domain) {
                tracing::warn!(
                    "Skipping {}: request cap of {} reached for {}",
                    entry.url,
                    crawler_config.max_requests_per_domain,
                    domain
                );
                continue;
            }

            if let Some(wait) = frontier.wait_time(&domain, Instant::now()) {
                tracing::debug!("Waiting {:?} before fetching from {}", wait, domain);
                if let Err(reason) =
                    run_until_stopped(tokio::time::sleep(wait), cancel, deadline).await
                {
                    frontier.requeue_front(entry);
                    break reason;
                }
            }

            tracing::debug!("Fetching {} (depth {})", entry.url, entry.depth);
            let started = Utc::now();
            frontier.record_fetch_start(&domain, Instant::now());

            let fetched = run_until_stopped(fetch_page(&session, &entry.url), cancel, deadline).await;
            frontier.record_fetch_end(&domain, Instant::now());

            let outcome = match fetched {
                Ok(outcome) => outcome,
                Err(reason) => {
                    frontier.requeue_front(entry);
                    break reason;
                }
            };

            run.pages_crawled += 1;

            let record = match outcome {
                FetchOutcome::Failed {
                    kind,
                    status,
                    error,
                } => {
                    tracing::warn!("Fetch of {} failed ({}): {}", entry.url, kind, error);
                    PageRecord::failed(&entry.url, entry.depth, status, error)
                }
                FetchOutcome::Page {
                    final_url,
                    status,
                    body,
                } => {
                    let (record, profile) =
                        self.analyze_page(&entry, status, &body, request.track_profiles);

                    if let Some(profile) = profile {
                        self.store_profile(&profile);
                        run.profiles_tracked += 1;
                    }

                    if entry.depth < request.depth_limit {
                        let base = Url::parse(&final_url)
                            .or_else(|_| Url::parse(&entry.url))
                            .ok();
                        if let Some(base) = base {
                            self.enqueue_links(&mut frontier, &body, &base, entry.depth + 1);
                        }
                    }

                    record
                }
            };

            run.attempts.push(FetchAttempt {
                url: entry.url.clone(),
                depth: entry.depth,
                started,
                finished: Utc::now(),
                status: record.status,
                error: record.error.clone(),
            });

            if record.should_retain() {
                self.store_record(&record);
                run.records.push(record);
            } else {
                tracing::debug!("Dropping uninformative page {}", entry.url);
            }

            if run.pages_crawled % PROGRESS_EVERY == 0 {
                tracing::info!(
                    "Progress: {} pages crawled, {} records kept, {} in frontier",
                    run.pages_crawled,
                    run.records.len(),
                    frontier.len()
                );
            }
        };

        tracing::info!(
            "Crawl stopped ({:?}): {} pages crawled, {} records kept, {} URLs seen, {} left in frontier",
            stop_reason,
            run.pages_crawled,
            run.records.len(),
            frontier.visited_count(),
            frontier.len()
        );

        Ok(run.into_outcome(&frontier, stop_reason))
    }

    /// Runs the analysis pipeline over a fetched page
    fn analyze_page(
        &self,
        entry: &FrontierEntry,
        status: u16,
        html: &str,
        track_profiles: bool,
    ) -> (PageRecord, Option<SellerProfile>) {
        let content = extract(html, &entry.url);
        let assessment = self.classifier.assess(&content.analysis_text());
        let marketplace = identify_marketplace(&entry.url);
        let seller_id = marketplace.and_then(|market| market.seller_id(&entry.url));

        if assessment.score > 0 {
            tracing::debug!(
                "{} scored {} ({})",
                entry.url,
                assessment.score,
                assessment.category
            );
        }

        let profile = match (track_profiles, marketplace, &seller_id) {
            (true, Some(market), Some(id)) => {
                match self.profile_parser.parse(html, Some(market)) {
                    Some(data) => Some(SellerProfile::new(
                        data,
                        market.name,
                        &entry.url,
                        Some(id.clone()),
                        Utc::now(),
                    )),
                    None => {
                        tracing::warn!("No profile fields found on seller page {}", entry.url);
                        None
                    }
                }
            }
            _ => None,
        };

        let record = PageRecord::analyzed(
            &entry.url,
            entry.depth,
            status,
            &content,
            assessment,
            marketplace.map(|market| market.name.to_string()),
            seller_id,
        );

        (record, profile)
    }

    fn enqueue_links(&self, frontier: &mut Frontier, html: &str, base: &Url, depth: u32) {
        let network = &self.config.crawler.network_suffixes;
        let mut queued = 0;

        for link in extract_links(html, base) {
            if !is_network_url(&link, network) {
                tracing::trace!("Ignoring off-network link {}", link);
                continue;
            }

            match frontier.enqueue(&link, depth) {
                Ok(true) => queued += 1,
                Ok(false) => {}
                Err(e) => tracing::debug!("Skipping link {}: {}", link, e),
            }
        }

        if queued > 0 {
            tracing::debug!("Queued {} new links from {} at depth {}", queued, base, depth);
        }
    }

    fn store_record(&self, record: &PageRecord) {
        if let Some(store) = &self.store {
            if let Err(e) = put_json_new(store.as_ref(), &record.storage_key(), record) {
                tracing::warn!("Failed to store record for {}: {}", record.url, e);
            }
        }
    }

    fn store_profile(&self, profile: &SellerProfile) {
        if let Some(history) = &self.history {
            match history.append(profile) {
                Ok(key) => tracing::debug!("Stored seller snapshot {}", key),
                Err(e) => tracing::warn!(
                    "Failed to store snapshot for {}/{}: {}",
                    profile.marketplace,
                    profile.seller_key(),
                    e
                ),
            }
        }
    }

    /// Fetches one seller page, parses it and appends a snapshot
    ///
    /// Uses a fresh session without identity rotation. Unknown marketplaces
    /// are parsed with the generic heuristics and stored under `unknown`.
    pub async fn track_seller(&self, url: &str) -> Result<SellerProfile, TrackError> {
        let url = normalize_url(url)?;
        let session = self.session_manager().new_session()?;

        let body = match fetch_page(&session, &url).await {
            FetchOutcome::Page { body, .. } => body,
            FetchOutcome::Failed { kind, error, .. } => {
                tracing::warn!("Fetch of seller page {} failed ({}): {}", url, kind, error);
                return Err(TrackError::FetchFailed(error));
            }
        };

        let marketplace = identify_marketplace(&url);
        let data = self
            .profile_parser
            .parse(&body, marketplace)
            .ok_or_else(|| TrackError::ParseFailed(url.clone()))?;

        let profile = SellerProfile::new(
            data,
            marketplace.map_or(UNKNOWN_MARKETPLACE, |market| market.name),
            &url,
            marketplace.and_then(|market| market.seller_id(&url)),
            Utc::now(),
        );

        if let Some(history) = &self.history {
            history.append(&profile)?;
        }

        tracing::info!(
            "Tracked seller {}/{} from {}",
            profile.marketplace,
            profile.seller_key(),
            url
        );

        Ok(profile)
    }

    /// Stored snapshots for a seller, newest first
    ///
    /// Without an attached store the history is empty.
    pub fn get_seller_history(
        &self,
        marketplace: &str,
        seller_key: &str,
    ) -> Result<SellerHistory, StorageError> {
        match &self.history {
            Some(history) => history.history(marketplace, seller_key),
            None => {
                tracing::debug!("No store attached, seller history is empty");
                Ok(SellerHistory {
                    marketplace: marketplace.to_string(),
                    seller_key: seller_key.to_string(),
                    snapshots: Vec::new(),
                })
            }
        }
    }

    pub fn analyze_seller_trends(&self, history: &SellerHistory) -> Result<TrendReport, TrendError> {
        analyze_trends(history)
    }
}
