use once_cell::sync::Lazy;
use regex::Regex;

/// Words that suggest a page belongs to someone selling something
pub const SELLER_INDICATORS: &[&str] = &[
    "vendor", "seller", "shop", "store", "market", "price", "pricing", "cost", "shipping",
    "payment", "bitcoin", "btc", "monero", "xmr", "escrow", "buy", "purchase", "order",
    "checkout", "cart", "product", "listing", "feedback", "rating", "review", "trusted",
    "verified", "pgp", "contact",
];

static INDICATOR_PATTERNS: Lazy<Vec<(&'static str, Regex)>> = Lazy::new(|| {
    SELLER_INDICATORS
        .iter()
        .filter_map(|word| {
            Regex::new(&format!(r"\b{}\b", regex::escape(word)))
                .ok()
                .map(|re| (*word, re))
        })
        .collect()
});

/// Whole-word seller indicators present in already-lowercased text
pub fn whole_word_indicators(lowered: &str) -> Vec<String> {
    INDICATOR_PATTERNS
        .iter()
        .filter(|(_, re)| re.is_match(lowered))
        .map(|(word, _)| word.to_string())
        .collect()
}

/// Seller indicators appearing anywhere in already-lowercased text
pub fn substring_indicators(lowered: &str) -> Vec<String> {
    SELLER_INDICATORS
        .iter()
        .filter(|word| lowered.contains(*word))
        .map(|word| word.to_string())
        .collect()
}
