use super::SellerHistory;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TrendError {
    #[error("No snapshot data for {marketplace}/{seller_key}")]
    NoData {
        marketplace: String,
        seller_key: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RatingPoint {
    pub timestamp: DateTime<Utc>,
    pub rating: Option<String>,
    pub rating_value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountPoint {
    pub timestamp: DateTime<Utc>,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PricePoint {
    pub timestamp: DateTime<Utc>,
    pub price: String,
}

/// Appearance timeline of one product across snapshots
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductTrend {
    pub name: String,
    pub appearances: usize,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub price_history: Vec<PricePoint>,
}

/// Trends computed from a seller's snapshot history
///
/// Every series is in chronological order, oldest first.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendReport {
    pub marketplace: String,
    pub seller_key: String,
    pub first_seen: DateTime<Utc>,
    pub last_seen: DateTime<Utc>,
    pub total_snapshots: usize,
    pub rating_trend: Vec<RatingPoint>,
    pub feedback_trend: Vec<CountPoint>,
    pub product_count_trend: Vec<CountPoint>,

    /// Most frequently seen products first
    pub product_trends: Vec<ProductTrend>,
}

/// Computes rating, feedback and product trends from a history
///
/// Products are grouped by name; nameless products are not tracked.
pub fn analyze_trends(history: &SellerHistory) -> Result<TrendReport, TrendError> {
    let mut snapshots: Vec<_> = history.snapshots.iter().collect();
    snapshots.sort_by_key(|s| s.timestamp);

    let (Some(first), Some(last)) = (snapshots.first(), snapshots.last()) else {
        return Err(TrendError::NoData {
            marketplace: history.marketplace.clone(),
            seller_key: history.seller_key.clone(),
        });
    };
    let (first_seen, last_seen) = (first.timestamp, last.timestamp);

    let rating_trend = snapshots
        .iter()
        .map(|s| RatingPoint {
            timestamp: s.timestamp,
            rating: s.rating.clone(),
            rating_value: s.rating_value,
        })
        .collect();

    let feedback_trend = snapshots
        .iter()
        .map(|s| CountPoint {
            timestamp: s.timestamp,
            count: s.feedback.len(),
        })
        .collect();

    let product_count_trend = snapshots
        .iter()
        .map(|s| CountPoint {
            timestamp: s.timestamp,
            count: s.products.len(),
        })
        .collect();

    let mut products: HashMap<&str, ProductTrend> = HashMap::new();
    for snapshot in &snapshots {
        for product in &snapshot.products {
            let Some(name) = product.name.as_deref() else {
                continue;
            };

            let trend = products.entry(name).or_insert_with(|| ProductTrend {
                name: name.to_string(),
                appearances: 0,
                first_seen: snapshot.timestamp,
                last_seen: snapshot.timestamp,
                price_history: Vec::new(),
            });

            trend.appearances += 1;
            trend.last_seen = snapshot.timestamp;
            if let Some(price) = &product.price {
                trend.price_history.push(PricePoint {
                    timestamp: snapshot.timestamp,
                    price: price.clone(),
                });
            }
        }
    }

    let mut product_trends: Vec<ProductTrend> = products.into_values().collect();
    product_trends.sort_by(|a, b| {
        b.appearances
            .cmp(&a.appearances)
            .then_with(|| a.name.cmp(&b.name))
    });

    Ok(TrendReport {
        marketplace: history.marketplace.clone(),
        seller_key: history.seller_key.clone(),
        first_seen,
        last_seen,
        total_snapshots: snapshots.len(),
        rating_trend,
        feedback_trend,
        product_count_trend,
        product_trends,
    })
}
