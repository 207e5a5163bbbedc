//! End-to-end crawl runs against mock hidden services

use crate::common::{crawler_for, mount_page, onion_url, page, request, test_config};
use async_trait::async_trait;
use darkline::config::ControlConfig;
use darkline::crawler::{CrawlError, StopReason};
use darkline::session::{IdentityController, SessionError};
use darkline::storage::{FileStore, KeyValueStore};
use darkline::url::normalize_url;
use std::collections::HashSet;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Default)]
struct CountingController {
    fail: bool,
    newnym_calls: usize,
}

#[async_trait]
impl IdentityController for CountingController {
    async fn authenticate(&mut self) -> Result<(), SessionError> {
        if self.fail {
            Err(SessionError::Authentication("515 Authentication failed".into()))
        } else {
            Ok(())
        }
    }

    async fn request_new_identity(&mut self) -> Result<(), SessionError> {
        self.newnym_calls += 1;
        Ok(())
    }
}

/// Seed page linking to `count` pages on the same host
async fn mount_fan_out(server: &MockServer, host: &str, count: usize) -> Vec<String> {
    let children: Vec<String> = (1..=count)
        .map(|i| onion_url(server, host, &format!("/page{}", i)))
        .collect();

    mount_page(server, "/", page("Index", &children)).await;
    for i in 1..=count {
        mount_page(server, &format!("/page{}", i), page(&format!("Page {}", i), &[])).await;
    }
    children
}

#[tokio::test]
async fn test_risky_page_is_classified() {
    let server = MockServer::start().await;
    mount_page(
        &server,
        "/",
        "<html><head><title>Shop</title></head><body><p>buy cocaine here, bitcoin accepted</p></body></html>"
            .to_string(),
    )
    .await;

    let crawler = crawler_for(test_config(10), &server, &["sitea.onion"]);
    let outcome = crawler
        .crawl(
            request(vec![onion_url(&server, "sitea.onion", "/")], 10, 3),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.stop_reason, StopReason::FrontierExhausted);
    assert_eq!(outcome.records.len(), 1);

    let record = &outcome.records[0];
    assert_eq!(record.category, "drugs");
    assert!(record.found_keywords.contains("cocaine"));
    assert!(record.is_seller);
    assert!(record.risk_score > 0);
    assert_eq!(record.title, "Shop");
    assert!(record.risk_categories["drugs"].matches.contains(&"cocaine".to_string()));
}

#[tokio::test]
async fn test_marketplace_vendor_page() {
    let server = MockServer::start().await;
    let host = "darkmarketq7x.onion";
    let vendor = onion_url(&server, host, "/vendor/abc123");

    mount_page(&server, "/", page("Market", &[vendor.clone()])).await;
    mount_page(&server, "/vendor/abc123", page("Vendor abc123", &[])).await;

    let crawler = crawler_for(test_config(10), &server, &[host]);
    let outcome = crawler
        .crawl(
            request(vec![onion_url(&server, host, "/")], 10, 3),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let record = outcome
        .records
        .iter()
        .find(|r| r.url == vendor)
        .expect("vendor page recorded");
    assert_eq!(record.marketplace.as_deref(), Some("darkmarket"));
    assert_eq!(record.seller_id.as_deref(), Some("abc123"));
    assert!(record.is_seller);
}

#[tokio::test]
async fn test_page_budget_leaves_residual_frontier() {
    let server = MockServer::start().await;
    let children = mount_fan_out(&server, "sitea.onion", 5).await;

    let crawler = crawler_for(test_config(10), &server, &["sitea.onion"]);
    let outcome = crawler
        .crawl(
            request(vec![onion_url(&server, "sitea.onion", "/")], 1, 3),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.stop_reason, StopReason::PageBudgetReached);
    assert_eq!(outcome.pages_crawled, 1);
    assert_eq!(outcome.records.len(), 1);

    let residual: Vec<_> = outcome.residual_frontier.iter().map(|e| e.url.clone()).collect();
    assert_eq!(residual, children);
    assert!(outcome.residual_frontier.iter().all(|e| e.depth == 1));
}

#[tokio::test]
async fn test_each_url_fetched_once() {
    let server = MockServer::start().await;
    let host = "loop.onion";
    let a = onion_url(&server, host, "/a");
    let b = onion_url(&server, host, "/b");
    let root = onion_url(&server, host, "/");

    for (route, links) in [
        ("/", vec![a.clone(), b.clone(), format!("{}/", a)]),
        ("/a", vec![root.clone(), b.clone()]),
        ("/b", vec![a.clone(), format!("{}#top", root)]),
    ] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(200).set_body_string(page(route, &links)))
            .expect(1)
            .mount(&server)
            .await;
    }

    let crawler = crawler_for(test_config(10), &server, &[host]);
    let outcome = crawler
        .crawl(request(vec![root.clone()], 50, 3), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.pages_crawled, 3);
    let fetched: HashSet<_> = outcome.attempts.iter().map(|a| a.url.clone()).collect();
    assert_eq!(fetched.len(), outcome.attempts.len());
    assert!(outcome.residual_frontier.is_empty());
}

#[tokio::test]
async fn test_depth_limit_stops_link_following() {
    let server = MockServer::start().await;
    let host = "deep.onion";
    let level1 = onion_url(&server, host, "/one");
    let level2 = onion_url(&server, host, "/two");

    mount_page(&server, "/", page("root", &[level1.clone()])).await;
    mount_page(&server, "/one", page("one", &[level2])).await;
    Mock::given(method("GET"))
        .and(path("/two"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let crawler = crawler_for(test_config(10), &server, &[host]);
    let outcome = crawler
        .crawl(
            request(vec![onion_url(&server, host, "/")], 10, 1),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.pages_crawled, 2);
    assert!(outcome.residual_frontier.is_empty());
    assert!(outcome.attempts.iter().all(|a| a.depth <= 1));
}

#[tokio::test]
async fn test_same_domain_fetches_are_spaced() {
    let server = MockServer::start().await;
    mount_fan_out(&server, "slow.onion", 2).await;

    let crawler = crawler_for(test_config(300), &server, &["slow.onion"]);
    let outcome = crawler
        .crawl(
            request(vec![onion_url(&server, "slow.onion", "/")], 10, 3),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.attempts.len(), 3);
    for pair in outcome.attempts.windows(2) {
        let gap = pair[1].started - pair[0].started;
        assert!(
            gap >= chrono::Duration::milliseconds(295),
            "fetches only {:?} apart",
            gap
        );
    }
}

#[tokio::test]
async fn test_failed_fetch_is_recorded_and_crawl_continues() {
    let server = MockServer::start().await;
    let broken = onion_url(&server, "broken.onion", "/");
    let healthy = onion_url(&server, "healthy.onion", "/ok");

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;
    mount_page(&server, "/ok", page("Forum", &[])).await;

    let crawler = crawler_for(test_config(10), &server, &["broken.onion", "healthy.onion"]);
    let outcome = crawler
        .crawl(request(vec![broken.clone(), healthy.clone()], 10, 3), &CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(outcome.pages_crawled, 2);
    assert_eq!(outcome.records.len(), 2);

    let failed = &outcome.records[0];
    assert_eq!(failed.url, normalize_url(&broken).unwrap());
    assert_eq!(failed.status, Some(503));
    assert!(failed.is_error());
    assert_eq!(failed.risk_score, 0);

    assert_eq!(outcome.records[1].url, normalize_url(&healthy).unwrap());
    assert!(!outcome.records[1].is_error());
}

#[tokio::test]
async fn test_off_network_links_are_ignored() {
    let server = MockServer::start().await;
    let clearnet = format!("http://localhost:{}/clear", server.address().port());

    mount_page(&server, "/", page("Links", &[clearnet])).await;
    Mock::given(method("GET"))
        .and(path("/clear"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let crawler = crawler_for(test_config(10), &server, &["hub.onion"]);
    let outcome = crawler
        .crawl(
            request(vec![onion_url(&server, "hub.onion", "/")], 10, 3),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.pages_crawled, 1);
    assert!(outcome.residual_frontier.is_empty());
}

#[tokio::test]
async fn test_domain_request_cap_skips_urls() {
    let server = MockServer::start().await;
    mount_fan_out(&server, "capped.onion", 4).await;

    let mut config = test_config(10);
    config.crawler.max_requests_per_domain = 2;
    let crawler = crawler_for(config, &server, &["capped.onion"]);
    let outcome = crawler
        .crawl(
            request(vec![onion_url(&server, "capped.onion", "/")], 10, 3),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.pages_crawled, 2);
    assert_eq!(outcome.stop_reason, StopReason::FrontierExhausted);
}

#[tokio::test]
async fn test_identity_rotates_on_cadence() {
    let server = MockServer::start().await;
    mount_fan_out(&server, "rot.onion", 3).await;

    let mut config = test_config(10);
    config.crawler.rotate_every = 2;
    let crawler = crawler_for(config, &server, &["rot.onion"]);

    let mut controller = CountingController::default();
    let outcome = crawler
        .crawl_with_controller(
            request(vec![onion_url(&server, "rot.onion", "/")], 10, 3),
            Some(&mut controller),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.pages_crawled, 4);
    assert_eq!(controller.newnym_calls, 1);
}

#[tokio::test]
async fn test_failed_rotation_aborts_with_partial_results() {
    let server = MockServer::start().await;
    let children = mount_fan_out(&server, "rot.onion", 2).await;

    let mut config = test_config(10);
    config.crawler.rotate_every = 1;
    let crawler = crawler_for(config, &server, &["rot.onion"]);

    let mut controller = CountingController {
        fail: true,
        ..Default::default()
    };
    let err = crawler
        .crawl_with_controller(
            request(vec![onion_url(&server, "rot.onion", "/")], 10, 3),
            Some(&mut controller),
            &CancellationToken::new(),
        )
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        CrawlError::SessionLost {
            source: SessionError::Authentication(_),
            ..
        }
    ));

    let partial = err.into_partial().expect("partial outcome");
    assert_eq!(partial.stop_reason, StopReason::SessionLost);
    assert_eq!(partial.pages_crawled, 1);
    assert_eq!(partial.records.len(), 1);
    let residual: Vec<_> = partial.residual_frontier.iter().map(|e| e.url.clone()).collect();
    assert_eq!(residual, children);
}

#[tokio::test]
async fn test_failed_rotation_can_be_tolerated() {
    let server = MockServer::start().await;
    mount_fan_out(&server, "rot.onion", 2).await;

    let mut config = test_config(10);
    config.crawler.rotate_every = 1;
    config.crawler.abort_on_rotation_failure = false;
    let crawler = crawler_for(config, &server, &["rot.onion"]);

    let mut controller = CountingController {
        fail: true,
        ..Default::default()
    };
    let outcome = crawler
        .crawl_with_controller(
            request(vec![onion_url(&server, "rot.onion", "/")], 10, 3),
            Some(&mut controller),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.pages_crawled, 3);
    assert_eq!(outcome.stop_reason, StopReason::FrontierExhausted);
}

/// Control port that accepts any password and counts NEWNYM signals
async fn scripted_control_port() -> (String, Arc<AtomicUsize>) {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap().to_string();
    let newnyms = Arc::new(AtomicUsize::new(0));
    let counter = Arc::clone(&newnyms);

    tokio::spawn(async move {
        while let Ok((stream, _)) = listener.accept().await {
            let counter = Arc::clone(&counter);
            tokio::spawn(async move {
                let (read, mut write) = stream.into_split();
                let mut lines = BufReader::new(read).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    if line.starts_with("SIGNAL NEWNYM") {
                        counter.fetch_add(1, Ordering::SeqCst);
                    }
                    if write.write_all(b"250 OK\r\n").await.is_err() {
                        break;
                    }
                }
            });
        }
    });

    (address, newnyms)
}

#[tokio::test]
async fn test_rotation_through_control_port() {
    let server = MockServer::start().await;
    mount_fan_out(&server, "ctl.onion", 3).await;
    let (address, newnyms) = scripted_control_port().await;

    let mut config = test_config(10);
    config.crawler.rotate_every = 1;
    config.control = Some(ControlConfig {
        address,
        password: Some("hunter2".to_string()),
        cookie_path: None,
    });
    let crawler = crawler_for(config, &server, &["ctl.onion"]);

    let outcome = crawler
        .crawl(
            request(vec![onion_url(&server, "ctl.onion", "/")], 10, 3),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.pages_crawled, 4);
    assert_eq!(newnyms.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn test_cancellation_interrupts_politeness_wait() {
    let server = MockServer::start().await;
    let children = mount_fan_out(&server, "wait.onion", 1).await;

    let crawler = crawler_for(test_config(10_000), &server, &["wait.onion"]);
    let cancel = CancellationToken::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(500)).await;
        trigger.cancel();
    });

    let started = std::time::Instant::now();
    let outcome = crawler
        .crawl(
            request(vec![onion_url(&server, "wait.onion", "/")], 10, 3),
            &cancel,
        )
        .await
        .unwrap();

    assert!(started.elapsed() < Duration::from_secs(5));
    assert_eq!(outcome.stop_reason, StopReason::Cancelled);
    assert_eq!(outcome.pages_crawled, 1);
    assert_eq!(outcome.records.len(), 1);
    assert_eq!(outcome.residual_frontier[0].url, children[0]);
}

#[tokio::test]
async fn test_run_deadline_stops_crawl() {
    let server = MockServer::start().await;
    mount_fan_out(&server, "late.onion", 1).await;

    let mut config = test_config(10_000);
    config.crawler.run_deadline_secs = Some(1);
    let crawler = crawler_for(config, &server, &["late.onion"]);

    let outcome = crawler
        .crawl(
            request(vec![onion_url(&server, "late.onion", "/")], 10, 3),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    assert_eq!(outcome.stop_reason, StopReason::DeadlineReached);
    assert_eq!(outcome.pages_crawled, 1);
    assert_eq!(outcome.residual_frontier.len(), 1);
}

#[tokio::test]
async fn test_records_are_persisted() {
    let server = MockServer::start().await;
    mount_fan_out(&server, "store.onion", 2).await;
    let dir = tempfile::tempdir().unwrap();
    let store: Arc<dyn KeyValueStore> = Arc::new(FileStore::new(dir.path()).unwrap());

    let crawler =
        crawler_for(test_config(10), &server, &["store.onion"]).with_store(Arc::clone(&store));
    let outcome = crawler
        .crawl(
            request(vec![onion_url(&server, "store.onion", "/")], 10, 3),
            &CancellationToken::new(),
        )
        .await
        .unwrap();

    let keys = store.list_keys("pages/").unwrap();
    assert_eq!(keys.len(), outcome.records.len());
    assert_eq!(keys.len(), 3);
}
