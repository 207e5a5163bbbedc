//! Seller tracking, history and trends against mock marketplaces

use crate::common::{crawler_for, mount_page, onion_url, page, test_config};
use darkline::crawler::{CrawlRequest, Crawler, TrackError};
use darkline::sellers::TrendError;
use darkline::storage::{FileStore, KeyValueStore, SqliteStore};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

const MARKET: &str = "darkmarketq7x.onion";

fn vendor_page(rating: &str, products: &[(&str, &str)]) -> String {
    let items: String = products
        .iter()
        .map(|(name, price)| {
            format!(
                r#"<div class="product"><h3>{}</h3><span class="price">{}</span></div>"#,
                name, price
            )
        })
        .collect();

    format!(
        r#"<html><head><title>Vendor</title></head><body>
        <div class="vendor-profile">
          <h1 class="vendor-name">abc123</h1>
          <div class="vendor-rating">{}</div>
          <div class="product-list">{}</div>
          <div class="feedback-list">
            <div class="feedback-item"><span class="rating">5/5</span><span class="comment">fast</span></div>
          </div>
        </div></body></html>"#,
        rating, items
    )
}

fn file_store() -> (tempfile::TempDir, Arc<dyn KeyValueStore>) {
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.path()).unwrap());
    (dir, store)
}

fn tracking_crawler(server: &MockServer, store: Arc<dyn KeyValueStore>) -> Crawler {
    crawler_for(test_config(10), server, &[MARKET, "forum.onion"]).with_store(store)
}

#[tokio::test]
async fn test_track_seller_stores_snapshot() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/vendor/abc123",
        vendor_page("4.5/5", &[("Widget", "0.01 BTC")]),
    )
    .await;
    let (_dir, store) = file_store();
    let crawler = tracking_crawler(&server, store);

    let profile = crawler
        .track_seller(&onion_url(&server, MARKET, "/vendor/abc123"))
        .await
        .unwrap();

    assert_eq!(profile.marketplace, "darkmarket");
    assert_eq!(profile.seller_id.as_deref(), Some("abc123"));
    assert_eq!(profile.name.as_deref(), Some("abc123"));
    assert_eq!(profile.rating_value, Some(4.5));
    assert_eq!(profile.products.len(), 1);
    assert_eq!(profile.feedback.len(), 1);

    let history = crawler.get_seller_history("darkmarket", "abc123").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history.snapshots[0], profile);
}

#[tokio::test]
async fn test_history_is_newest_first_and_unchanged() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/vendor/abc123"))
        .respond_with(ResponseTemplate::new(200).set_body_string(vendor_page(
            "4.5/5",
            &[("Widget", "0.01 BTC")],
        )))
        .up_to_n_times(1)
        .with_priority(1)
        .mount(&server)
        .await;
    mount_page(
        &server,
        "/vendor/abc123",
        vendor_page("4.8/5", &[("Widget", "0.02 BTC"), ("Gadget", "0.5 BTC")]),
    )
    .await;

    let (_dir, store) = file_store();
    let crawler = tracking_crawler(&server, store);
    let url = onion_url(&server, MARKET, "/vendor/abc123");

    let first = crawler.track_seller(&url).await.unwrap();
    let second = crawler.track_seller(&url).await.unwrap();
    assert!(second.timestamp > first.timestamp);

    let history = crawler.get_seller_history("darkmarket", "abc123").unwrap();
    assert_eq!(history.snapshots, vec![second, first]);

    let report = crawler.analyze_seller_trends(&history).unwrap();
    assert_eq!(report.total_snapshots, 2);

    let ratings: Vec<_> = report.rating_trend.iter().map(|p| p.rating_value).collect();
    assert_eq!(ratings, vec![Some(4.5), Some(4.8)]);

    let counts: Vec<_> = report.product_count_trend.iter().map(|p| p.count).collect();
    assert_eq!(counts, vec![1, 2]);

    let widget = &report.product_trends[0];
    assert_eq!(widget.name, "Widget");
    assert_eq!(widget.appearances, 2);
    let prices: Vec<_> = widget.price_history.iter().map(|p| p.price.as_str()).collect();
    assert_eq!(prices, vec!["0.01 BTC", "0.02 BTC"]);
    assert_eq!(report.product_trends[1].name, "Gadget");
}

#[tokio::test]
async fn test_track_seller_fetch_failure() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&server)
        .await;
    let (_dir, store) = file_store();
    let crawler = tracking_crawler(&server, store);

    let result = crawler
        .track_seller(&onion_url(&server, MARKET, "/vendor/gone"))
        .await;
    assert!(matches!(result, Err(TrackError::FetchFailed(_))));
}

#[tokio::test]
async fn test_track_seller_parse_failure() {
    let server = MockServer::start().await;
    mount_page(&server, "/vendor/blank", "<html><body></body></html>".to_string()).await;
    let (_dir, store) = file_store();
    let crawler = tracking_crawler(&server, Arc::clone(&store));

    let result = crawler
        .track_seller(&onion_url(&server, MARKET, "/vendor/blank"))
        .await;

    assert!(matches!(result, Err(TrackError::ParseFailed(_))));
    assert!(store.list_keys("sellers/").unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_marketplace_uses_generic_parser() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/profile",
        r#"<html><body><h2 class="seller-name">quietvendor</h2>
           <span class="rating">4.1 stars</span></body></html>"#
            .to_string(),
    )
    .await;
    let (_dir, store) = file_store();
    let crawler = tracking_crawler(&server, store);

    let profile = crawler
        .track_seller(&onion_url(&server, "forum.onion", "/profile"))
        .await
        .unwrap();

    assert_eq!(profile.marketplace, "unknown");
    assert_eq!(profile.seller_key(), "quietvendor");

    let history = crawler.get_seller_history("unknown", "quietvendor").unwrap();
    assert_eq!(history.len(), 1);
}

#[tokio::test]
async fn test_crawl_tracks_vendor_profiles() {
    let server = MockServer::start().await;
    let vendor = onion_url(&server, MARKET, "/vendor/abc123");
    mount_page(&server, "/", page("Market", &[vendor])).await;
    mount_page(
        &server,
        "/vendor/abc123",
        vendor_page("4.5/5", &[("Widget", "0.01 BTC")]),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn KeyValueStore> = Arc::new(SqliteStore::new(&dir.path().join("darkline.db")).unwrap());
    let crawler = tracking_crawler(&server, store);

    let request = CrawlRequest {
        seeds: vec![onion_url(&server, MARKET, "/")],
        max_pages: 10,
        depth_limit: 3,
        track_profiles: true,
    };
    let outcome = crawler.crawl(request, &CancellationToken::new()).await.unwrap();

    assert_eq!(outcome.pages_crawled, 2);
    assert_eq!(outcome.profiles_tracked, 1);

    let history = crawler.get_seller_history("darkmarket", "abc123").unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history.snapshots[0].rating_value, Some(4.5));
}

#[tokio::test]
async fn test_trends_without_history_is_no_data() {
    let (_dir, store) = file_store();
    let server = MockServer::start().await;
    let crawler = tracking_crawler(&server, store);

    let history = crawler.get_seller_history("darkmarket", "nobody").unwrap();
    assert!(history.is_empty());
    assert_eq!(
        crawler.analyze_seller_trends(&history),
        Err(TrendError::NoData {
            marketplace: "darkmarket".to_string(),
            seller_key: "nobody".to_string(),
        })
    );
}
