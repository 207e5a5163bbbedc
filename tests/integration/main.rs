//! Integration tests for darkline
//!
//! Mock hidden services are wiremock servers; `.onion` host names are
//! pinned to the mock's address so URLs look like real onion addresses.

mod common;
mod crawl_tests;
mod seller_tests;
