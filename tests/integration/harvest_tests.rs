//! Integration tests for the harvester
//!
//! These tests use wiremock to create mock documentation sites and run the
//! full harvest cycle end-to-end.

use doc_harvest::config::Config;
use doc_harvest::crawler::{FetchStatus, Harvester, DEADLINE_EXCEEDED};
use tempfile::TempDir;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Fast settings for a mock server on loopback
fn create_test_config() -> Config {
    let mut config = Config::default();
    config.engine.min_domain_interval_ms = 0;
    config.engine.backoff_base_ms = 10;
    config.engine.request_timeout_secs = 5;
    config.engine.respect_robots = false;
    config.content.min_content_length = 50;
    config.cache.enabled = false;
    config.security.trusted_hosts = vec!["127.0.0.1".to_string()];
    config
}

/// A page with `words` distinct tokens of the given topic and some links
fn doc_page(title: &str, topic: &str, words: usize, links: &[&str]) -> String {
    let text: Vec<String> = (0..words).map(|i| format!("{}{}", topic, i)).collect();
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a> "#, href, href))
        .collect();
    format!(
        "<html><head><title>{}</title></head><body>\
         <nav><a href=\"/pricing\">Pricing</a></nav>\
         <main><h1>{}</h1><p>{}</p><p>{}</p></main></body></html>",
        title,
        title,
        text.join(" "),
        anchors
    )
}

async fn mount_page(server: &MockServer, route: &str, body: String, expected: u64) {
    Mock::given(method("GET"))
        .and(path(route))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(body)
                .insert_header("content-type", "text/html"),
        )
        .expect(expected)
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_harvest_follows_doc_links_one_hop() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/docs/intro",
        doc_page(
            "Intro",
            "intro",
            40,
            &["/docs/install", "/docs/config", "/pricing", "https://other.example/docs/x"],
        ),
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/docs/install",
        doc_page("Install", "install", 40, &["/docs/deep"]),
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/docs/config",
        doc_page("Config", "config", 40, &[]),
        1,
    )
    .await;
    mount_page(&mock_server, "/docs/deep", doc_page("Deep", "deep", 40, &[]), 0).await;
    mount_page(&mock_server, "/pricing", doc_page("Pricing", "price", 40, &[]), 0).await;

    let harvester = Harvester::with_cache(create_test_config(), None).unwrap();
    let report = harvester
        .run(&[format!("{}/docs/intro", base_url)])
        .await
        .unwrap();

    let titles: Vec<&str> = report.documents.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["Intro", "Config", "Install"]);
    assert!(report.failures.is_empty());
    assert_eq!(report.stats.discovered, 3);
    assert_eq!(report.stats.ok, 3);
    assert_eq!(report.stats.documents, 3);
    assert!(!report.documents[0].text.contains("Pricing"));
}

#[tokio::test]
async fn test_near_duplicate_pages_are_dropped() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let original = doc_page("Routing", "route", 100, &[]);
    let copy = original.replace("route99", "route99 extra");

    mount_page(&mock_server, "/docs/routing", original, 1).await;
    mount_page(&mock_server, "/docs/routing-copy", copy, 1).await;

    let harvester = Harvester::with_cache(create_test_config(), None).unwrap();
    let report = harvester
        .run(&[
            format!("{}/docs/routing", base_url),
            format!("{}/docs/routing-copy", base_url),
        ])
        .await
        .unwrap();

    assert_eq!(report.documents.len(), 1);
    assert_eq!(report.stats.duplicates, 1);
    assert_eq!(report.stats.ok, 2);
}

#[tokio::test]
async fn test_robots_disallowed_urls_are_skipped() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(
            ResponseTemplate::new(200).set_body_string("User-agent: *\nDisallow: /docs/internal\n"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(
        &mock_server,
        "/docs/public",
        doc_page("Public", "public", 40, &["/docs/internal"]),
        1,
    )
    .await;
    mount_page(
        &mock_server,
        "/docs/internal",
        doc_page("Internal", "internal", 40, &[]),
        0,
    )
    .await;

    let mut config = create_test_config();
    config.engine.respect_robots = true;
    let harvester = Harvester::with_cache(config, None).unwrap();
    let report = harvester
        .run(&[format!("{}/docs/public", base_url)])
        .await
        .unwrap();

    assert_eq!(report.documents.len(), 1);
    assert_eq!(report.stats.robots_disallowed, 1);
}

#[tokio::test]
async fn test_missing_robots_allows_everything() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/docs/a", doc_page("A", "alpha", 40, &[]), 1).await;

    let mut config = create_test_config();
    config.engine.respect_robots = true;
    let harvester = Harvester::with_cache(config, None).unwrap();
    let report = harvester.run(&[format!("{}/docs/a", base_url)]).await.unwrap();

    assert_eq!(report.documents.len(), 1);
    assert_eq!(report.stats.robots_disallowed, 0);
}

#[tokio::test]
async fn test_failures_do_not_abort_the_run() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/docs/gone"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/docs/ok", doc_page("Ok", "fine", 40, &[]), 1).await;

    let harvester = Harvester::with_cache(create_test_config(), None).unwrap();
    let report = harvester
        .run(&[
            format!("{}/docs/gone", base_url),
            format!("{}/docs/ok", base_url),
        ])
        .await
        .unwrap();

    assert_eq!(report.documents.len(), 1);
    assert_eq!(report.failures.len(), 1);
    assert_eq!(report.failures[0].url, format!("{}/docs/gone", base_url));
    assert!(matches!(
        report.failures[0].status,
        FetchStatus::PermanentError {
            status_code: Some(404),
            ..
        }
    ));
}

#[tokio::test]
async fn test_max_documents_stops_the_run() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(
        &mock_server,
        "/docs/first",
        doc_page("First", "first", 40, &["/docs/second"]),
        1,
    )
    .await;
    mount_page(&mock_server, "/docs/second", doc_page("Second", "second", 40, &[]), 0).await;

    let mut config = create_test_config();
    config.engine.max_documents = 1;
    let harvester = Harvester::with_cache(config, None).unwrap();
    let report = harvester
        .run(&[format!("{}/docs/first", base_url)])
        .await
        .unwrap();

    assert_eq!(report.documents.len(), 1);
    assert_eq!(report.documents[0].title, "First");
}

#[tokio::test]
async fn test_run_deadline_cancels_slow_fetches() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/docs/slow"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(doc_page("Slow", "slow", 40, &[]))
                .set_delay(std::time::Duration::from_secs(3)),
        )
        .mount(&mock_server)
        .await;

    let mut config = create_test_config();
    config.engine.run_deadline_secs = 1;
    let harvester = Harvester::with_cache(config, None).unwrap();
    let report = harvester
        .run(&[format!("{}/docs/slow", base_url)])
        .await
        .unwrap();

    assert!(report.documents.is_empty());
    assert!(report.stats.deadline_exceeded);
    assert!(matches!(
        &report.failures[0].status,
        FetchStatus::TransientError { reason } if reason == DEADLINE_EXCEEDED
    ));
    assert!(report.failures[0].status.is_deadline_exceeded());
}

#[tokio::test]
async fn test_disk_cache_serves_second_run() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();
    let cache_root = TempDir::new().unwrap();

    mount_page(&mock_server, "/docs/cached", doc_page("Cached", "cache", 40, &[]), 1).await;

    let mut config = create_test_config();
    config.cache.enabled = true;
    config.cache.directory = cache_root.path().join("pages").to_string_lossy().into_owned();
    config.security.allowed_roots = vec![cache_root.path().to_string_lossy().into_owned()];

    let seeds = [format!("{}/docs/cached", base_url)];

    let first = Harvester::new(config.clone()).unwrap().run(&seeds).await.unwrap();
    assert_eq!(first.stats.from_cache, 0);

    let second = Harvester::new(config).unwrap().run(&seeds).await.unwrap();
    assert_eq!(second.stats.from_cache, 1);
    assert_eq!(second.documents, first.documents);
}

#[tokio::test]
async fn test_cache_outside_allowed_roots_is_refused() {
    let allowed = TempDir::new().unwrap();
    let elsewhere = TempDir::new().unwrap();

    let mut config = create_test_config();
    config.cache.enabled = true;
    config.cache.directory = elsewhere.path().to_string_lossy().into_owned();
    config.security.allowed_roots = vec![allowed.path().to_string_lossy().into_owned()];

    assert!(Harvester::new(config).is_err());
}

#[tokio::test]
async fn test_second_run_on_same_harvester_starts_fresh() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    mount_page(&mock_server, "/docs/repeat", doc_page("Repeat", "repeat", 40, &[]), 2).await;

    let harvester = Harvester::with_cache(create_test_config(), None).unwrap();
    let seeds = [format!("{}/docs/repeat", base_url)];

    let first = harvester.run(&seeds).await.unwrap();
    let second = harvester.run(&seeds).await.unwrap();

    assert_eq!(first.documents.len(), 1);
    assert_eq!(second.documents.len(), 1);
    assert_eq!(second.stats.soft_failures, 0);
    assert!(second.failures.is_empty());
}

fn urlset(urls: &[String]) -> String {
    let entries: String = urls
        .iter()
        .map(|u| format!("<url><loc>{}</loc></url>", u))
        .collect();
    format!(
        r#"<?xml version="1.0" encoding="UTF-8"?><urlset xmlns="http://www.sitemaps.org/schemas/sitemap/0.9">{}</urlset>"#,
        entries
    )
}

#[tokio::test]
async fn test_sitemap_from_robots_is_queued_first() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "User-agent: *\nAllow: /\nSitemap: {}/docs-sitemap.xml\n",
            base_url
        )))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs-sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(urlset(&[
            format!("{}/docs/alpha", base_url),
            format!("{}/docs/beta", base_url),
            format!("{}/pricing", base_url),
            "https://other.example/docs/x".to_string(),
        ])))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(404))
        .expect(0)
        .mount(&mock_server)
        .await;

    mount_page(&mock_server, "/docs/start", doc_page("Start", "start", 40, &[]), 1).await;
    mount_page(&mock_server, "/docs/alpha", doc_page("Alpha", "alpha", 40, &[]), 1).await;
    mount_page(&mock_server, "/docs/beta", doc_page("Beta", "beta", 40, &[]), 1).await;
    mount_page(&mock_server, "/pricing", doc_page("Pricing", "price", 40, &[]), 0).await;

    let mut config = create_test_config();
    config.engine.respect_robots = true;
    let harvester = Harvester::with_cache(config, None).unwrap();
    let report = harvester
        .run(&[format!("{}/docs/start", base_url)])
        .await
        .unwrap();

    let titles: Vec<&str> = report.documents.iter().map(|d| d.title.as_str()).collect();
    assert_eq!(titles, vec!["Beta", "Alpha", "Start"]);
    assert_eq!(report.stats.sitemap_urls, 2);
    assert_eq!(report.stats.discovered, 3);
}

#[tokio::test]
async fn test_sitemap_index_is_followed() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    Mock::given(method("GET"))
        .and(path("/sitemap.xml"))
        .respond_with(ResponseTemplate::new(200).set_body_string(format!(
            "<sitemapindex><sitemap><loc>{}/sitemap-docs.xml</loc></sitemap></sitemapindex>",
            base_url
        )))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/sitemap-docs.xml"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(urlset(&[format!("{}/guide/gamma", base_url)])),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    mount_page(&mock_server, "/docs/start", doc_page("Start", "start", 40, &[]), 1).await;
    mount_page(&mock_server, "/guide/gamma", doc_page("Gamma", "gamma", 40, &[]), 1).await;

    let harvester = Harvester::with_cache(create_test_config(), None).unwrap();
    let report = harvester
        .run(&[format!("{}/docs/start", base_url)])
        .await
        .unwrap();

    assert_eq!(report.documents.len(), 2);
    assert_eq!(report.documents[0].title, "Gamma");
    assert_eq!(report.stats.sitemap_urls, 1);
}

#[tokio::test]
async fn test_changelog_fills_release_information() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let changelog = "# Changelog\n\n\
        All notable changes to this project are documented in this file. \
        The format follows Keep a Changelog and releases use semantic versioning.\n\n\
        ## v3.1.0 (2024-04-10)\n\n- Streaming uploads\n- Retry hooks for clients\n\n\
        ## v3.0.0 (2024-01-02)\n\n- New configuration format\n";

    Mock::given(method("GET"))
        .and(path("/changelog"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_string(changelog)
                .insert_header("content-type", "text/markdown"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;
    mount_page(&mock_server, "/docs/start", doc_page("Start", "start", 40, &[]), 1).await;

    let harvester = Harvester::with_cache(create_test_config(), None).unwrap();
    let report = harvester
        .run(&[format!("{}/docs/start", base_url)])
        .await
        .unwrap();

    assert_eq!(report.documents.len(), 1);
    assert_eq!(report.changelog_url, Some(format!("{}/changelog", base_url)));
    assert_eq!(report.changelog.len(), 2);
    assert_eq!(report.changelog[0].version, "3.1.0");
    assert_eq!(report.changelog[0].date.as_deref(), Some("2024-04-10"));
    assert_eq!(
        report.changelog[0].summary,
        "- Streaming uploads\n- Retry hooks for clients"
    );
    assert_eq!(report.version.as_deref(), Some("3.1.0"));
}

#[tokio::test]
async fn test_version_detected_from_documents() {
    let mock_server = MockServer::start().await;
    let base_url = mock_server.uri();

    let page = doc_page("Install", "setup", 40, &[]).replace(
        "<main><h1>Install</h1>",
        "<main><h1>Install</h1><p>Run npm install widget@2.4.1 to get v2.4.1.</p>",
    );
    mount_page(&mock_server, "/docs/install", page, 1).await;
    Mock::given(method("GET"))
        .and(path("/changelog"))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config();
    config.discovery.changelog = false;
    let harvester = Harvester::with_cache(config, None).unwrap();
    let report = harvester
        .run(&[format!("{}/docs/install", base_url)])
        .await
        .unwrap();

    assert_eq!(report.version.as_deref(), Some("2.4.1"));
    assert!(report.changelog.is_empty());
    assert_eq!(report.changelog_url, None);
}
