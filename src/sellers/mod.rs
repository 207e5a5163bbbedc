//! Seller history and trend analysis
//!
//! Seller profiles are stored as immutable, timestamped snapshots keyed by
//! `(marketplace, seller_key)`. History is rebuilt by scanning stored
//! snapshots rather than held in memory.

mod history;
mod trends;

pub use history::{SellerHistory, SellerHistoryStore, LATEST_FILE, SELLERS_PREFIX};
pub use trends::{
    analyze_trends, CountPoint, PricePoint, ProductTrend, RatingPoint, TrendError, TrendReport,
};
