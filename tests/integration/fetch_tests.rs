//! Integration tests for the fetcher
//!
//! These tests use wiremock to create mock HTTP servers and exercise
//! retries, redirects, caching and outcome classification end-to-end.

use doc_harvest::cache::{PageStore, SqliteCache};
use doc_harvest::config::Config;
use doc_harvest::crawler::{FetchStatus, Fetcher, RateLimiter, SeenContent};
use doc_harvest::security::SecurityGuard;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};
use url::Url;
use wiremock::matchers::{method, path, path_regex};
use wiremock::{Mock, MockServer, Request, Respond, ResponseTemplate};

/// Fast settings: no rate-limit wait, short backoff, small minimum length
fn create_test_config() -> Config {
    let mut config = Config::default();
    config.engine.min_domain_interval_ms = 0;
    config.engine.backoff_base_ms = 10;
    config.engine.request_timeout_secs = 5;
    config.content.min_content_length = 50;
    config.cache.enabled = false;
    config.security.trusted_hosts = vec!["127.0.0.1".to_string()];
    config
}

fn create_fetcher(config: &Config, cache: Option<Arc<dyn PageStore>>) -> Fetcher {
    Fetcher::new(
        config,
        Arc::new(SecurityGuard::with_trusted_hosts(
            config.security.trusted_hosts.iter(),
        )),
        Arc::new(RateLimiter::new(config.engine.min_domain_interval())),
        cache,
    )
    .expect("Failed to build fetcher")
}

fn page(text: &str) -> String {
    format!(
        "<html><head><title>Docs</title></head><body><main><p>{}</p></main></body></html>",
        text
    )
}

fn html(body: String) -> ResponseTemplate {
    ResponseTemplate::new(200)
        .set_body_string(body)
        .insert_header("content-type", "text/html")
}

#[tokio::test]
async fn test_successful_fetch() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/intro"))
        .respond_with(html(page("Install the package and import the client module.")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(&create_test_config(), None);
    let outcome = fetcher
        .fetch(&format!("{}/docs/intro", mock_server.uri()))
        .await;

    assert_eq!(outcome.status, FetchStatus::Ok { status_code: 200 });
    assert_eq!(outcome.attempt_count, 1);
    assert!(!outcome.from_cache);
    assert!(outcome.final_url.is_none());
    assert!(outcome.body.unwrap().contains("import the client module"));
    assert!(outcome.headers.unwrap().contains_key("content-type"));
}

#[tokio::test]
async fn test_server_error_is_retried_up_to_budget() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/flaky"))
        .respond_with(ResponseTemplate::new(503))
        .expect(3)
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(&create_test_config(), None);
    let outcome = fetcher
        .fetch(&format!("{}/docs/flaky", mock_server.uri()))
        .await;

    match &outcome.status {
        FetchStatus::TransientError { reason } => assert!(reason.contains("503")),
        other => panic!("expected transient error, got {:?}", other),
    }
    assert_eq!(outcome.attempt_count, 3);
    assert!(outcome.body.is_none());
}

#[tokio::test]
async fn test_client_error_is_not_retried() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(&create_test_config(), None);
    let outcome = fetcher
        .fetch(&format!("{}/docs/missing", mock_server.uri()))
        .await;

    assert!(matches!(
        outcome.status,
        FetchStatus::PermanentError {
            status_code: Some(404),
            ..
        }
    ));
    assert_eq!(outcome.attempt_count, 1);
}

#[tokio::test]
async fn test_recovers_after_transient_failure() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/recover"))
        .respond_with(ResponseTemplate::new(500))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs/recover"))
        .respond_with(html(page("Second attempt returns the real documentation page.")))
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(&create_test_config(), None);
    let outcome = fetcher
        .fetch(&format!("{}/docs/recover", mock_server.uri()))
        .await;

    assert!(outcome.is_ok());
    assert_eq!(outcome.attempt_count, 2);
}

#[tokio::test]
async fn test_cache_read_through() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/cached"))
        .respond_with(html(page("Cached pages are served without another request.")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let cache = Arc::new(SqliteCache::open_in_memory(10).unwrap());
    let fetcher = create_fetcher(&create_test_config(), Some(cache.clone()));
    let url = format!("{}/docs/cached", mock_server.uri());

    let first = fetcher.fetch(&url).await;
    assert!(first.is_ok());
    assert!(!first.from_cache);
    assert_eq!(cache.len().unwrap(), 1);

    let second = fetcher.fetch(&url).await;
    assert_eq!(second.status, FetchStatus::Ok { status_code: 200 });
    assert!(second.from_cache);
    assert_eq!(second.attempt_count, 0);
    assert_eq!(second.body, first.body);
}

#[tokio::test]
async fn test_expired_cache_entry_is_refetched() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/stale"))
        .respond_with(html(page("Expired entries go back to the network every time.")))
        .expect(2)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config();
    config.cache.ttl_secs = 0;
    let cache = Arc::new(SqliteCache::open_in_memory(10).unwrap());
    let fetcher = create_fetcher(&config, Some(cache));
    let url = format!("{}/docs/stale", mock_server.uri());

    assert!(!fetcher.fetch(&url).await.from_cache);
    let second = fetcher.fetch(&url).await;
    assert!(!second.from_cache);
}

#[tokio::test]
async fn test_sign_in_wall_is_soft_failure_and_not_cached() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/private"))
        .respond_with(html(page(
            "Please sign in to view this page of the documentation.",
        )))
        .expect(1)
        .mount(&mock_server)
        .await;

    let cache = Arc::new(SqliteCache::open_in_memory(10).unwrap());
    let fetcher = create_fetcher(&create_test_config(), Some(cache.clone()));
    let outcome = fetcher
        .fetch(&format!("{}/docs/private", mock_server.uri()))
        .await;

    assert!(matches!(outcome.status, FetchStatus::SoftFailure { .. }));
    assert_eq!(outcome.attempt_count, 1);
    assert!(outcome.body.is_none());
    assert_eq!(cache.len().unwrap(), 0);
}

#[tokio::test]
async fn test_short_body_is_soft_failure() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/stub"))
        .respond_with(html("<p>stub</p>".to_string()))
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(&create_test_config(), None);
    let outcome = fetcher
        .fetch(&format!("{}/docs/stub", mock_server.uri()))
        .await;

    match outcome.status {
        FetchStatus::SoftFailure { reason } => assert!(reason.contains("too short")),
        other => panic!("expected soft failure, got {:?}", other),
    }
}

#[tokio::test]
async fn test_identical_content_under_second_url_is_soft_failure() {
    let mock_server = MockServer::start().await;
    let body = page("Mirrored content that lives under two different paths.");
    for p in ["/docs/one", "/docs/two"] {
        Mock::given(method("GET"))
            .and(path(p))
            .respond_with(html(body.clone()))
            .mount(&mock_server)
            .await;
    }

    let fetcher = create_fetcher(&create_test_config(), None);
    let first = fetcher.fetch(&format!("{}/docs/one", mock_server.uri())).await;
    let second = fetcher.fetch(&format!("{}/docs/two", mock_server.uri())).await;

    assert!(first.is_ok());
    assert!(matches!(second.status, FetchStatus::SoftFailure { .. }));
}

#[tokio::test]
async fn test_repeated_content_is_judged_per_run() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/same"))
        .respond_with(html(page("The same page fetched in two separate runs.")))
        .expect(3)
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(&create_test_config(), None);
    let url = format!("{}/docs/same", mock_server.uri());

    let first_run = SeenContent::new();
    assert!(fetcher.fetch_in(&url, &first_run).await.is_ok());
    let repeat = fetcher.fetch_in(&url, &first_run).await;
    assert!(matches!(repeat.status, FetchStatus::SoftFailure { .. }));

    let second_run = SeenContent::new();
    assert!(fetcher.fetch_in(&url, &second_run).await.is_ok());
    assert_eq!(second_run.len(), 1);
}

#[tokio::test]
async fn test_untrusted_loopback_is_blocked_without_request() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .respond_with(html(page("Never served.")))
        .expect(0)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config();
    config.security.trusted_hosts.clear();
    let fetcher = create_fetcher(&config, None);

    let outcome = fetcher
        .fetch(&format!("{}/docs/intro", mock_server.uri()))
        .await;
    assert!(matches!(outcome.status, FetchStatus::Blocked { .. }));
    assert_eq!(outcome.attempt_count, 0);
}

#[tokio::test]
async fn test_redirect_is_followed() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/old"))
        .respond_with(ResponseTemplate::new(301).insert_header("location", "/docs/new"))
        .expect(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/docs/new"))
        .respond_with(html(page("The page moved here and kept all of its content.")))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(&create_test_config(), None);
    let outcome = fetcher
        .fetch(&format!("{}/docs/old", mock_server.uri()))
        .await;

    assert!(outcome.is_ok());
    assert_eq!(
        outcome.final_url.as_deref(),
        Some(format!("{}/docs/new", mock_server.uri()).as_str())
    );
}

#[tokio::test]
async fn test_redirect_to_private_address_is_blocked() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/jump"))
        .respond_with(
            ResponseTemplate::new(302).insert_header("location", "http://10.0.0.5/admin"),
        )
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(&create_test_config(), None);
    let outcome = fetcher
        .fetch(&format!("{}/docs/jump", mock_server.uri()))
        .await;

    assert!(matches!(outcome.status, FetchStatus::Blocked { .. }));
}

#[tokio::test]
async fn test_redirect_loop_is_permanent_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/loop"))
        .respond_with(ResponseTemplate::new(302).insert_header("location", "/docs/loop"))
        .expect(6)
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(&create_test_config(), None);
    let outcome = fetcher
        .fetch(&format!("{}/docs/loop", mock_server.uri()))
        .await;

    match outcome.status {
        FetchStatus::PermanentError { reason, .. } => assert!(reason.contains("redirects")),
        other => panic!("expected permanent error, got {:?}", other),
    }
}

#[tokio::test]
async fn test_redirect_without_location_is_permanent_error() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/docs/nowhere"))
        .respond_with(ResponseTemplate::new(302))
        .expect(1)
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(&create_test_config(), None);
    let outcome = fetcher
        .fetch(&format!("{}/docs/nowhere", mock_server.uri()))
        .await;

    assert!(matches!(
        outcome.status,
        FetchStatus::PermanentError {
            status_code: Some(302),
            ..
        }
    ));
}

#[tokio::test]
async fn test_fetch_plain_skips_content_checks() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/robots.txt"))
        .respond_with(ResponseTemplate::new(200).set_body_string("User-agent: *\nAllow: /"))
        .mount(&mock_server)
        .await;

    let fetcher = create_fetcher(&create_test_config(), None);
    let url = Url::parse(&format!("{}/robots.txt", mock_server.uri())).unwrap();
    let outcome = fetcher.fetch_plain(&url).await;

    assert_eq!(outcome.status, FetchStatus::Ok { status_code: 200 });
    assert_eq!(outcome.body.as_deref(), Some("User-agent: *\nAllow: /"));
}

#[tokio::test]
async fn test_same_domain_requests_are_spaced() {
    let mock_server = MockServer::start().await;
    for i in 0..3 {
        Mock::given(method("GET"))
            .and(path(format!("/docs/p{}", i)))
            .respond_with(html(page(&format!(
                "Page number {} explains a different part of the system.",
                i
            ))))
            .mount(&mock_server)
            .await;
    }

    let mut config = create_test_config();
    config.engine.min_domain_interval_ms = 200;
    let fetcher = Arc::new(create_fetcher(&config, None));

    let start = Instant::now();
    let mut handles = Vec::new();
    for i in 0..3 {
        let fetcher = Arc::clone(&fetcher);
        let url = format!("{}/docs/p{}", mock_server.uri(), i);
        handles.push(tokio::spawn(async move { fetcher.fetch(&url).await }));
    }
    for handle in handles {
        assert!(handle.await.unwrap().is_ok());
    }

    assert!(start.elapsed() >= Duration::from_millis(400));
    assert_eq!(fetcher.limiter().request_count("127.0.0.1"), 3);
}

/// Records when each request reaches the server, then answers after a delay
struct ArrivalRecorder {
    arrivals: Arc<Mutex<Vec<Instant>>>,
    delay: Duration,
}

impl Respond for ArrivalRecorder {
    fn respond(&self, _request: &Request) -> ResponseTemplate {
        self.arrivals.lock().unwrap().push(Instant::now());
        html(page("A page that takes a while to render on the server side."))
            .set_delay(self.delay)
    }
}

#[tokio::test]
async fn test_same_domain_spacing_holds_when_pool_is_saturated() {
    let mock_server = MockServer::start().await;
    let arrivals = Arc::new(Mutex::new(Vec::new()));
    Mock::given(method("GET"))
        .and(path_regex(r"^/docs/p\d+$"))
        .respond_with(ArrivalRecorder {
            arrivals: Arc::clone(&arrivals),
            delay: Duration::from_millis(120),
        })
        .expect(20)
        .mount(&mock_server)
        .await;

    let mut config = create_test_config();
    config.engine.concurrency = 2;
    config.engine.min_domain_interval_ms = 50;
    let fetcher = Arc::new(create_fetcher(&config, None));

    let mut handles = Vec::new();
    for i in 0..20 {
        let fetcher = Arc::clone(&fetcher);
        let url = format!("{}/docs/p{}", mock_server.uri(), i);
        handles.push(tokio::spawn(async move { fetcher.fetch(&url).await }));
    }
    for handle in handles {
        handle.await.unwrap();
    }

    let mut arrivals = arrivals.lock().unwrap().clone();
    assert_eq!(arrivals.len(), 20);
    arrivals.sort();
    for pair in arrivals.windows(2) {
        let gap = pair[1].duration_since(pair[0]);
        assert!(
            gap >= Duration::from_millis(40),
            "same-domain requests started {:?} apart",
            gap
        );
    }
}
