use crate::classify::{default_categories, CategoryDefinition};
use serde::Deserialize;

/// Main configuration structure for Darkline
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub crawler: CrawlerConfig,
    #[serde(default)]
    pub session: SessionConfig,
    #[serde(default)]
    pub control: Option<ControlConfig>,
    #[serde(default)]
    pub classifier: ClassifierConfig,
    #[serde(default)]
    pub profiles: ProfileConfig,
    #[serde(default)]
    pub storage: StorageConfig,
    #[serde(default)]
    pub filter: FilterConfig,
}

/// Crawler behavior configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct CrawlerConfig {
    /// Maximum link depth from the seed URLs
    pub max_depth: u32,

    /// Page budget for a single run (errors count against it)
    pub max_pages: usize,

    /// Minimum time between requests to the same domain (milliseconds)
    pub crawl_delay_ms: u64,

    /// Maximum number of requests per domain in one run
    pub max_requests_per_domain: u32,

    /// Rotate the anonymizing identity every N crawled pages (0 disables)
    pub rotate_every: usize,

    /// Whether a failed rotation ends the run
    pub abort_on_rotation_failure: bool,

    /// Per-request timeout (seconds)
    pub fetch_timeout_secs: u64,

    /// Host patterns that make up the hidden-network address space
    pub network_suffixes: Vec<String>,

    /// Optional wall-clock budget for a run (seconds)
    pub run_deadline_secs: Option<u64>,

    /// Seed URLs used when none are given on the command line
    pub seeds: Vec<String>,
}

impl Default for CrawlerConfig {
    fn default() -> Self {
        Self {
            max_depth: 3,
            max_pages: 100,
            crawl_delay_ms: 2000,
            max_requests_per_domain: 500,
            rotate_every: 10,
            abort_on_rotation_failure: true,
            fetch_timeout_secs: 30,
            network_suffixes: vec!["*.onion".to_string()],
            run_deadline_secs: None,
            seeds: Vec::new(),
        }
    }
}

/// HTTP session configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct SessionConfig {
    /// Proxy URL, e.g. `socks5h://127.0.0.1:9050`
    pub proxy: Option<String>,

    /// User agent sent with every request
    pub user_agent: String,

    /// Wait after an identity rotation before new circuits are used (milliseconds)
    pub settle_ms: u64,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            proxy: Some("socks5h://127.0.0.1:9050".to_string()),
            user_agent: "Mozilla/5.0 (Windows NT 10.0; rv:91.0) Gecko/20100101 Firefox/91.0"
                .to_string(),
            settle_ms: 2000,
        }
    }
}

/// Anonymizing network control channel configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct ControlConfig {
    /// Control port address (host:port)
    pub address: String,

    /// Shared secret for password authentication
    #[serde(default)]
    pub password: Option<String>,

    /// Path to the authentication cookie file
    #[serde(default)]
    pub cookie_path: Option<String>,
}

/// Which classifier implementation to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ClassifierKind {
    /// Whole-word weighted category scoring
    #[default]
    Weighted,
    /// Plain substring presence per keyword
    Substring,
}

/// Risk classifier configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ClassifierConfig {
    pub kind: ClassifierKind,

    /// Distinct seller indicators needed before a page counts as a seller page
    pub seller_indicator_threshold: usize,

    /// Weighted keyword categories, in declaration order
    pub categories: Vec<CategoryDefinition>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            kind: ClassifierKind::Weighted,
            seller_indicator_threshold: 2,
            categories: default_categories(),
        }
    }
}

/// Which profile parser implementation to construct
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProfileParserKind {
    /// Per-marketplace selector tables, generic fallback for unknown sites
    #[default]
    Marketplace,
    /// Generic heuristics only
    Generic,
}

/// Seller profile tracking configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct ProfileConfig {
    pub parser: ProfileParserKind,

    /// Whether crawls parse and store seller profiles by default
    pub track: bool,
}

impl Default for ProfileConfig {
    fn default() -> Self {
        Self {
            parser: ProfileParserKind::Marketplace,
            track: true,
        }
    }
}

/// Storage backend selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StorageBackend {
    /// One file per key under a directory
    #[default]
    Files,
    /// Single SQLite database file
    Sqlite,
}

/// Durable storage configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct StorageConfig {
    pub backend: StorageBackend,

    /// Storage directory; the sqlite backend keeps `darkline.db` inside it
    pub path: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Files,
            path: "./data".to_string(),
        }
    }
}

/// Risk level thresholds used when filtering records
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct FilterConfig {
    pub low_risk: u8,
    pub medium_risk: u8,
    pub high_risk: u8,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            low_risk: 30,
            medium_risk: 60,
            high_risk: 80,
        }
    }
}
