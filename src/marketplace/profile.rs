//! Seller profile parsing
//!
//! Parsing is defensive: a selector that matches nothing leaves its field
//! empty and never produces an error. A profile with no populated fields is
//! reported as `None`, meaning extraction failed, not that the seller has no
//! data.

use super::{Marketplace, SelectorTable};
use crate::config::ProfileParserKind;
use crate::content::collapse_whitespace;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Marketplace name recorded for profiles from unrecognised sites
pub const UNKNOWN_MARKETPLACE: &str = "unknown";

const PGP_HEADER: &str = "-----BEGIN PGP PUBLIC KEY BLOCK-----";

static RATING_NUMBER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+\.\d+|\d+)").unwrap());

static KEY_SANITIZER: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[^A-Za-z0-9_\-]").unwrap());

/// A product listed on a seller profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub name: Option<String>,
    pub price: Option<String>,
    pub description: Option<String>,
}

impl Product {
    fn is_empty(&self) -> bool {
        self.name.is_none() && self.price.is_none() && self.description.is_none()
    }
}

/// One feedback entry on a seller profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub rating: Option<String>,
    pub comment: Option<String>,
    pub date: Option<String>,
}

impl Feedback {
    fn is_empty(&self) -> bool {
        self.rating.is_none() && self.comment.is_none() && self.date.is_none()
    }
}

/// Fields parsed out of a seller page, before snapshot identity is assigned
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileData {
    pub name: Option<String>,
    pub rating: Option<String>,
    pub rating_value: Option<f64>,
    pub products: Vec<Product>,
    pub feedback: Vec<Feedback>,
    pub pgp_key: Option<String>,
}

impl ProfileData {
    /// True when no field was populated
    pub fn is_empty(&self) -> bool {
        self.name.is_none()
            && self.rating.is_none()
            && self.products.is_empty()
            && self.feedback.is_empty()
            && self.pgp_key.is_none()
    }
}

/// One immutable snapshot of a seller profile
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SellerProfile {
    pub marketplace: String,
    pub url: String,
    pub seller_id: Option<String>,
    pub name: Option<String>,
    pub rating: Option<String>,
    pub rating_value: Option<f64>,
    pub products: Vec<Product>,
    pub feedback: Vec<Feedback>,
    pub pgp_key: Option<String>,
    pub profile_id: String,
    pub timestamp: DateTime<Utc>,
}

impl SellerProfile {
    /// Builds a snapshot from parsed data
    ///
    /// `profile_id` is the first 32 hex characters of
    /// SHA-256(`url|name|timestamp`).
    pub fn new(
        data: ProfileData,
        marketplace: &str,
        url: &str,
        seller_id: Option<String>,
        timestamp: DateTime<Utc>,
    ) -> Self {
        let name = data.name.as_deref().unwrap_or_default();
        let digest = Sha256::digest(
            format!("{}|{}|{}", url, name, timestamp.timestamp_micros()).as_bytes(),
        );
        let mut profile_id = hex::encode(digest);
        profile_id.truncate(32);

        Self {
            marketplace: marketplace.to_string(),
            url: url.to_string(),
            seller_id,
            name: data.name,
            rating: data.rating,
            rating_value: data.rating_value,
            products: data.products,
            feedback: data.feedback,
            pgp_key: data.pgp_key,
            profile_id,
            timestamp,
        }
    }

    /// Key identifying this seller within its marketplace
    ///
    /// The seller id if one was extracted, otherwise the sanitized name,
    /// otherwise the snapshot's own id.
    pub fn seller_key(&self) -> String {
        self.seller_id
            .as_deref()
            .or(self.name.as_deref())
            .map(sanitize_key)
            .filter(|k| !k.is_empty())
            .unwrap_or_else(|| self.profile_id.clone())
    }
}

/// Replaces characters outside `[A-Za-z0-9_-]` with underscores
pub fn sanitize_key(raw: &str) -> String {
    KEY_SANITIZER.replace_all(raw.trim(), "_").into_owned()
}

/// Pulls the first number out of a rating string, e.g. "4.8/5" -> 4.8
pub fn parse_rating_value(rating: &str) -> Option<f64> {
    RATING_NUMBER
        .captures(rating)
        .and_then(|caps| caps.get(1))
        .and_then(|m| m.as_str().parse().ok())
}

/// Capability interface for seller profile parsers
pub trait ProfileParser: Send + Sync {
    /// Parses a seller page
    ///
    /// `marketplace` is the identified marketplace, if any. Returns `None`
    /// when nothing could be extracted.
    fn parse(&self, html: &str, marketplace: Option<&Marketplace>) -> Option<ProfileData>;

    /// Short name for logs
    fn name(&self) -> &'static str;
}

/// Uses the marketplace selector table when the site is known, and the
/// generic heuristics otherwise
#[derive(Debug, Default)]
pub struct MarketplaceProfileParser;

impl ProfileParser for MarketplaceProfileParser {
    fn parse(&self, html: &str, marketplace: Option<&Marketplace>) -> Option<ProfileData> {
        let document = Html::parse_document(html);

        if let Some(market) = marketplace {
            let data = parse_with_selectors(&document, &market.selectors);
            if !data.is_empty() {
                return Some(data);
            }
            tracing::debug!(
                "Selector table for {} matched nothing, trying generic extraction",
                market.name
            );
        }

        Some(parse_generic(&document)).filter(|data| !data.is_empty())
    }

    fn name(&self) -> &'static str {
        "marketplace"
    }
}

/// Generic heuristics only, regardless of marketplace
#[derive(Debug, Default)]
pub struct GenericProfileParser;

impl ProfileParser for GenericProfileParser {
    fn parse(&self, html: &str, _marketplace: Option<&Marketplace>) -> Option<ProfileData> {
        let document = Html::parse_document(html);
        Some(parse_generic(&document)).filter(|data| !data.is_empty())
    }

    fn name(&self) -> &'static str {
        "generic"
    }
}

/// Builds the profile parser selected by configuration
pub fn build_profile_parser(kind: ProfileParserKind) -> Box<dyn ProfileParser> {
    match kind {
        ProfileParserKind::Marketplace => Box::new(MarketplaceProfileParser),
        ProfileParserKind::Generic => Box::new(GenericProfileParser),
    }
}

fn selector(css: &str) -> Option<Selector> {
    Selector::parse(css).ok()
}

fn first_text(scope: ElementRef<'_>, css: &str) -> Option<String> {
    let selector = selector(css)?;
    scope
        .select(&selector)
        .map(|e| collapse_whitespace(&e.text().collect::<String>()))
        .find(|text| !text.is_empty())
}

fn all_matches<'a>(scope: ElementRef<'a>, css: &str) -> Vec<ElementRef<'a>> {
    match selector(css) {
        Some(selector) => scope.select(&selector).collect(),
        None => Vec::new(),
    }
}

fn parse_with_selectors(document: &Html, selectors: &SelectorTable) -> ProfileData {
    let root = document.root_element();
    let scope = selector(selectors.profile)
        .and_then(|s| root.select(&s).next())
        .unwrap_or(root);

    let rating = first_text(scope, selectors.rating);
    let rating_value = rating.as_deref().and_then(parse_rating_value);

    let products = all_matches(scope, selectors.products)
        .into_iter()
        .map(|item| Product {
            name: first_text(item, "h3, h4, .title, .name"),
            price: first_text(item, ".price, .cost"),
            description: first_text(item, ".description, .desc"),
        })
        .filter(|p| !p.is_empty())
        .collect();

    let feedback = all_matches(scope, selectors.feedback)
        .into_iter()
        .map(|item| Feedback {
            rating: first_text(item, ".rating, .stars"),
            comment: first_text(item, ".comment, .text"),
            date: first_text(item, ".date, .time"),
        })
        .filter(|f| !f.is_empty())
        .collect();

    let pgp_key = selector(selectors.pgp)
        .and_then(|s| scope.select(&s).next())
        .map(|e| e.text().collect::<String>().trim().to_string())
        .filter(|key| !key.is_empty());

    ProfileData {
        name: first_text(scope, selectors.name),
        rating,
        rating_value,
        products,
        feedback,
        pgp_key,
    }
}

fn parse_generic(document: &Html) -> ProfileData {
    let root = document.root_element();

    let name = first_text(root, ".profile-name, .vendor-name, .seller-name, .username")
        .or_else(|| first_text(root, "h1, h2, h3"));

    let rating = all_matches(root, ".rating, .stars, .score, .feedback-score")
        .into_iter()
        .map(|e| collapse_whitespace(&e.text().collect::<String>()))
        .find(|text| text.chars().any(|c| c.is_ascii_digit()));
    let rating_value = rating.as_deref().and_then(parse_rating_value);

    let products = all_matches(root, ".product, .listing, .item, .product-item, .product-listing")
        .into_iter()
        .map(|item| Product {
            name: first_text(item, "h3, h4, .title, .name, .product-title"),
            price: first_text(item, ".price, .cost, .btc, .amount"),
            description: None,
        })
        .filter(|p| !p.is_empty())
        .collect();

    let feedback = all_matches(root, ".feedback, .review, .comment, .rating-item")
        .into_iter()
        .map(|item| Feedback {
            rating: first_text(item, ".stars, .rating-value, .score"),
            comment: first_text(item, ".text, .comment-text, .review-text"),
            date: first_text(item, ".date, .time"),
        })
        .filter(|f| !f.is_empty())
        .collect();

    let pgp_key = all_matches(root, "pre, .pgp, .pgp-key, .public-key")
        .into_iter()
        .map(|e| e.text().collect::<String>().trim().to_string())
        .find(|text| text.starts_with(PGP_HEADER));

    ProfileData {
        name,
        rating,
        rating_value,
        products,
        feedback,
        pgp_key,
    }
}
