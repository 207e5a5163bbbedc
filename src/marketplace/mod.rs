//! Marketplace identification and seller profile parsing
//!
//! Known marketplaces are recognised by a regex over the page URL. Each one
//! carries a seller-path pattern and a table of CSS selectors that locate
//! the profile fields on its seller pages.

mod profile;

pub use profile::{
    build_profile_parser, parse_rating_value, sanitize_key, Feedback, GenericProfileParser,
    MarketplaceProfileParser, Product, ProfileData, ProfileParser, SellerProfile,
    UNKNOWN_MARKETPLACE,
};

use once_cell::sync::Lazy;
use regex::Regex;

/// CSS selectors for the fields of a seller profile page
#[derive(Debug, Clone, Copy)]
pub struct SelectorTable {
    pub profile: &'static str,
    pub name: &'static str,
    pub rating: &'static str,
    pub products: &'static str,
    pub feedback: &'static str,
    pub pgp: &'static str,
}

/// A known marketplace
#[derive(Debug)]
pub struct Marketplace {
    pub name: &'static str,
    url_pattern: Regex,
    seller_pattern: Regex,
    pub selectors: SelectorTable,
}

impl Marketplace {
    fn new(
        name: &'static str,
        url_pattern: &str,
        seller_pattern: &str,
        selectors: SelectorTable,
    ) -> Option<Self> {
        Some(Self {
            name,
            url_pattern: Regex::new(url_pattern).ok()?,
            seller_pattern: Regex::new(seller_pattern).ok()?,
            selectors,
        })
    }

    /// Checks whether the URL belongs to this marketplace
    pub fn matches(&self, url: &str) -> bool {
        self.url_pattern.is_match(url)
    }

    /// Extracts the seller identifier from a seller page URL
    pub fn seller_id(&self, url: &str) -> Option<String> {
        self.seller_pattern
            .captures(url)
            .and_then(|caps| caps.get(1))
            .map(|m| m.as_str().to_string())
    }
}

static MARKETPLACES: Lazy<Vec<Marketplace>> = Lazy::new(|| {
    [
        Marketplace::new(
            "darkmarket",
            r"(?i)darkmarket[a-z0-9]+\.onion",
            r"/vendor/([a-zA-Z0-9_-]+)",
            SelectorTable {
                profile: "div.vendor-profile",
                name: "h1.vendor-name",
                rating: "div.vendor-rating",
                products: "div.product-list .product",
                feedback: "div.feedback-list .feedback-item",
                pgp: "pre.vendor-pgp",
            },
        ),
        Marketplace::new(
            "whitehouse",
            r"(?i)white[a-z0-9]+\.onion",
            r"/seller/([a-zA-Z0-9_-]+)",
            SelectorTable {
                profile: "div.seller-profile",
                name: "h2.seller-name",
                rating: "div.seller-stats .rating",
                products: "div.listing-list .listing",
                feedback: "div.reviews .review",
                pgp: "pre.pgp-key",
            },
        ),
        Marketplace::new(
            "alphabay",
            r"(?i)alphabay[a-z0-9]+\.onion",
            r"/user/([a-zA-Z0-9_-]+)",
            SelectorTable {
                profile: "div.user-profile",
                name: "h1.username",
                rating: "div.user-rating",
                products: "div.listings .listing",
                feedback: "div.feedback-list .feedback",
                pgp: "pre.pgp-key",
            },
        ),
        Marketplace::new(
            "versus",
            r"(?i)versus[a-z0-9]+\.onion",
            r"/vendor/([a-zA-Z0-9_-]+)",
            SelectorTable {
                profile: "div.vendor-profile",
                name: "h2.vendor-name",
                rating: "div.vendor-rating",
                products: "div.product-list .product",
                feedback: "div.feedback-list .feedback",
                pgp: "pre.pgp-key",
            },
        ),
        Marketplace::new(
            "torrez",
            r"(?i)torrez[a-z0-9]+\.onion",
            r"/vendor/([a-zA-Z0-9_-]+)",
            SelectorTable {
                profile: "div.vendor-profile",
                name: "h1.vendor-name",
                rating: "div.vendor-rating",
                products: "div.listings .listing",
                feedback: "div.reviews .review",
                pgp: "pre.pgp-key",
            },
        ),
        Marketplace::new(
            "darkfox",
            r"(?i)darkfox[a-z0-9]+\.onion",
            r"/vendor/([a-zA-Z0-9_-]+)",
            SelectorTable {
                profile: "div.vendor-profile",
                name: "h1.vendor-name",
                rating: "div.vendor-rating",
                products: "div.product-list .product",
                feedback: "div.feedback-list .feedback",
                pgp: "pre.pgp-key",
            },
        ),
    ]
    .into_iter()
    .flatten()
    .collect()
});

/// All known marketplaces, in match priority order
pub fn known_marketplaces() -> &'static [Marketplace] {
    &MARKETPLACES
}

/// Matches a URL against the known marketplace table
///
/// # Examples
///
/// ```
/// use darkline::marketplace::identify_marketplace;
///
/// let market = identify_marketplace("http://darkmarketabc123.onion/vendor/x").unwrap();
/// assert_eq!(market.name, "darkmarket");
/// assert!(identify_marketplace("http://forum.onion/").is_none());
/// ```
pub fn identify_marketplace(url: &str) -> Option<&'static Marketplace> {
    MARKETPLACES.iter().find(|m| m.matches(url))
}

/// Looks up a marketplace by name
pub fn marketplace_by_name(name: &str) -> Option<&'static Marketplace> {
    MARKETPLACES.iter().find(|m| m.name == name)
}

/// Extracts a seller identifier from a URL for the named marketplace
pub fn extract_seller_id(url: &str, marketplace: &str) -> Option<String> {
    marketplace_by_name(marketplace)?.seller_id(url)
}
