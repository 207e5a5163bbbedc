use darkline::config::Config;
use darkline::crawler::{CrawlRequest, Crawler};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Configuration for talking to a local mock without a proxy
pub fn test_config(crawl_delay_ms: u64) -> Config {
    let mut config = Config::default();
    config.session.proxy = None;
    config.session.settle_ms = 10;
    config.crawler.crawl_delay_ms = crawl_delay_ms;
    config.crawler.fetch_timeout_secs = 5;
    config.crawler.rotate_every = 0;
    config
}

/// URL on `host` that routes to the mock server
pub fn onion_url(server: &MockServer, host: &str, path: &str) -> String {
    format!("http://{}:{}{}", host, server.address().port(), path)
}

/// Crawler with every host in `hosts` pinned to the mock server
pub fn crawler_for(config: Config, server: &MockServer, hosts: &[&str]) -> Crawler {
    hosts.iter().fold(
        Crawler::new_unchecked(config).expect("crawler builds"),
        |crawler, host| crawler.with_resolve_override(host, *server.address()),
    )
}

pub fn request(seeds: Vec<String>, max_pages: usize, depth_limit: u32) -> CrawlRequest {
    CrawlRequest {
        seeds,
        max_pages,
        depth_limit,
        track_profiles: false,
    }
}

/// Serves `body` as HTML at `route`
pub async fn mount_page(server: &MockServer, route: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string(body),
        )
        .mount(server)
        .await;
}

/// Simple page with a title and links
pub fn page(title: &str, links: &[String]) -> String {
    let anchors: String = links
        .iter()
        .map(|link| format!(r#"<a href="{}">{}</a>"#, link, link))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body><p>{}</p>{}</body></html>",
        title, title, anchors
    )
}
