//! State module for tracking crawl progress
//!
//! `DomainState` holds the per-domain last-visit timestamp and request count
//! that the frontier uses to enforce politeness within one run. It is never
//! persisted across runs.

mod domain_state;

pub use domain_state::{DomainState, PolitenessPolicy};
