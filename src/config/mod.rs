//! Configuration module for Darkline
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//! Every section is optional; omitted values fall back to the crawler's
//! built-in constants (2s crawl delay, depth 3, default keyword table).
//!
//! # Example
//!
//! ```no_run
//! use darkline::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("darkline.toml")).unwrap();
//! println!("Crawler will use max depth: {}", config.crawler.max_depth);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{
    ClassifierConfig, ClassifierKind, Config, ControlConfig, CrawlerConfig, FilterConfig,
    ProfileConfig, ProfileParserKind, SessionConfig, StorageBackend, StorageConfig,
};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, read_control_auth};
pub use validation::{validate, MAX_DEPTH};
