//! Integration tests for the crawler
//!
//! These tests use wiremock to serve a small site and drive the full
//! crawl, index and rank cycle end-to-end against an in-memory store.

use driftnet::config::{parse_config, Config};
use driftnet::crawler::{crawl, CrawlSummary};
use driftnet::index::search;
use driftnet::rank::RankEngine;
use driftnet::storage::{self, share, SharedStorage, SqliteStorage};
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Creates a test configuration seeded with `seed`
fn create_test_config(seed: &str) -> Config {
    parse_config(&format!(
        r#"
[crawler]
seeds = ["{}"]
batch-size = 4
request-timeout-ms = 2000
default-crawl-delay-ms = 10
idle-backoff-ms = 10

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[indexer]
intake-capacity = 8
max-concurrent = 2

[autoscale]
min-workers = 1
max-workers = 3
target-rate = 50.0
interval-ms = 100

[output]
database-path = ":memory:"
"#,
        seed
    ))
    .expect("Failed to parse test config")
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_raw(body.into_bytes(), "text/html")
}

fn count_pages(storage: &SharedStorage) -> u64 {
    storage::lock(storage)
        .expect("storage lock")
        .count_pages()
        .expect("count pages")
}

/// Crawls until at least `pages` pages are stored, then shuts down
async fn crawl_until(config: Config, storage: SharedStorage, pages: u64) -> CrawlSummary {
    let shutdown = CancellationToken::new();
    let handle = tokio::spawn(crawl(config, storage.clone(), true, shutdown.clone()));

    let deadline = tokio::time::Instant::now() + Duration::from_secs(10);
    while count_pages(&storage) < pages {
        assert!(
            tokio::time::Instant::now() < deadline,
            "Expected {} pages, got {}",
            pages,
            count_pages(&storage)
        );
        tokio::time::sleep(Duration::from_millis(20)).await;
    }

    shutdown.cancel();
    handle
        .await
        .expect("crawl task panicked")
        .expect("crawl failed")
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(format!(
            r#"<html><head><title>Home</title>
            <meta name="description" content="The home page"></head><body>
            <h1>Welcome spiders</h1>
            <a href="{0}/page1">Page 1</a>
            <a href="{0}/page2">Page 2</a>
            <a href="https://elsewhere.invalid/">Elsewhere</a>
            </body></html>"#,
            base_url
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(html(
            "<html><head><title>Page 1</title></head><body><p>The cat sat</p></body></html>"
                .to_string(),
        ))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(html(
            "<html><head><title>Page 2</title></head><body><p>Cats chase spiders</p></body></html>"
                .to_string(),
        ))
        .mount(&mock_server)
        .await;

    let storage = share(SqliteStorage::new_in_memory().expect("in-memory storage"));
    let config = create_test_config(&format!("{}/", base_url));

    let summary = crawl_until(config, storage.clone(), 3).await;
    assert!(summary.index.records >= 3);
    assert!(summary.snapshot_saved);

    let page1 = format!("{}/page1", base_url);
    {
        let s = storage::lock(&storage).expect("storage lock");

        let home = s
            .get_page(&format!("{}/", base_url))
            .expect("read page")
            .expect("home page stored");
        assert_eq!(home.title, "Home");
        assert_eq!(home.description, "The home page");

        assert_eq!(s.get_posting("cat", &page1).expect("read posting"), Some(1));
        assert_eq!(s.get_posting("sat", &page1).expect("read posting"), Some(1));
        assert_eq!(s.get_posting("the", &page1).expect("read posting"), None);

        // Only the cross-domain link is kept as outgoing
        let links = s.load_links().expect("load links");
        let home_links = links
            .iter()
            .find(|l| l.url == format!("{}/", base_url))
            .expect("home link record");
        assert_eq!(home_links.outgoing, vec!["https://elsewhere.invalid/"]);
    }

    let hits = search(&storage, "cat", false, 10).expect("search");
    let urls: Vec<&str> = hits.iter().map(|h| h.url.as_str()).collect();
    assert!(urls.contains(&page1.as_str()));

    let report = RankEngine::new(storage.clone(), Default::default())
        .run()
        .await
        .expect("ranking");
    assert_eq!(report.failed_chunks, 0);
}

#[tokio::test]
async fn test_robots_txt_respect() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /admin"),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html(format!(
            r#"<html><head><title>Home</title></head><body>
            <a href="{0}/allowed">Allowed Page</a>
            <a href="{0}/admin">Admin Page</a>
            </body></html>"#,
            base_url
        )))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/allowed"))
        .respond_with(html(
            "<html><head><title>Allowed</title></head><body><p>Allowed content</p></body></html>"
                .to_string(),
        ))
        .mount(&mock_server)
        .await;

    // Admin page should never be fetched
    Mock::given(method("GET"))
        .and(path("/admin"))
        .respond_with(html("<p>secret</p>".to_string()))
        .expect(0)
        .mount(&mock_server)
        .await;

    let storage = share(SqliteStorage::new_in_memory().expect("in-memory storage"));
    let config = create_test_config(&format!("{}/", base_url));

    // Shutdown waits for in-flight batches, so /admin was dequeued with /allowed
    crawl_until(config, storage.clone(), 2).await;

    let admin = format!("{}/admin", base_url);
    let s = storage::lock(&storage).expect("storage lock");
    assert!(s.get_page(&admin).expect("read page").is_none());

    // Denied URLs stay seen and are not requeued
    let snapshot = s
        .load_frontier()
        .expect("load frontier")
        .expect("snapshot saved");
    assert!(snapshot.seen.contains(&admin));
    assert!(!snapshot.high.contains(&admin));
    assert!(!snapshot.low.contains(&admin));
}
