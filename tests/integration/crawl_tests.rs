//! Integration tests for the crawler
//!
//! These tests use wiremock to create mock HTTP servers and run the full
//! fetch, parse and follow-links pipeline end-to-end.

use ripple_frontier::config::{load_config_with_hash, Config};
use ripple_frontier::crawler::{DecisionCode, RunContext, Runner, Services};
use ripple_frontier::fetch::{Fetcher, HttpFetcher, ParserRegistry};
use ripple_frontier::output::{write_markdown_report, RunSummary};
use ripple_frontier::pipeline::{page_pipeline, RouteTable, SimpleRoute};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Writes a test configuration for the given mock server into `dir`
fn write_test_config(dir: &Path, base_url: &str, strategy: &str) -> PathBuf {
    let domain = url::Url::parse(base_url)
        .expect("Failed to parse base URL")
        .host_str()
        .expect("Failed to extract host")
        .to_string();
    let report_path = dir.join("report.md");

    let content = format!(
        r#"
[engine]
max-in-flight = 4
max-park-ms = 50

[retry]
strategy = "{strategy}"
max-attempts = 1
base-delay-ms = 20

[politeness]
minimum-delay-ms = 5

[scope]
max-depth = 2

[user-agent]
crawler-name = "TestBot"
crawler-version = "1.0.0"
contact-url = "https://example.com/contact"
contact-email = "test@example.com"

[output]
summary-path = "{report}"

[[quality]]
domain = "{domain}"
seeds = ["{base_url}/"]
"#,
        strategy = strategy,
        report = report_path.display(),
        domain = domain,
        base_url = base_url,
    );

    let config_path = dir.join("config.toml");
    std::fs::write(&config_path, content).expect("Failed to write config");
    config_path
}

fn html_page(title: &str, links: &[&str]) -> ResponseTemplate {
    let anchors: String = links
        .iter()
        .map(|href| format!(r#"<a href="{}">{}</a>"#, href, href))
        .collect();

    // set_body_string would force text/plain
    ResponseTemplate::new(200).set_body_raw(
        format!(
            "<html><head><title>{}</title></head><body>{}</body></html>",
            title, anchors
        ),
        "text/html",
    )
}

async fn mount_site(mock_server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page(
            "Home",
            &["/page1", "/page2", "/missing", "https://external.example.org/"],
        ))
        .expect(1)
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page1"))
        .respond_with(html_page("Page 1", &["/page2", "/"]))
        .expect(1)
        .mount(mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/page2"))
        .respond_with(html_page("Page 2", &["/page1#top"]))
        .expect(1)
        .mount(mock_server)
        .await;
}

/// Builds the standard page crawl for a configuration and seeds it
fn build_crawl(config: &Config) -> (Arc<RunContext>, Runner) {
    let mut services = Services::new();
    services
        .insert::<Arc<dyn Fetcher>>(Arc::new(
            HttpFetcher::new(&config.user_agent).expect("Failed to build fetcher"),
        ))
        .insert(ParserRegistry::with_html());

    let run = Arc::new(RunContext::from_config(config, services).expect("Failed to build run"));
    let seeds = run.seed(
        config
            .quality
            .iter()
            .flat_map(|q| q.seeds.iter().map(String::as_str)),
    );
    assert_eq!(seeds.count(DecisionCode::Accepted), 1);

    let routes = RouteTable::new().fallback(Arc::new(SimpleRoute::new("page", page_pipeline())));
    let runner = Runner::from_config(Arc::clone(&run), Arc::new(routes), &config.engine)
        .expect("Failed to build runner");

    (run, runner)
}

#[tokio::test]
async fn test_served_pages_are_html() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_test_config(dir.path(), &mock_server.uri(), "linear");
    let (config, _) = load_config_with_hash(&config_path).expect("Failed to load config");
    let fetcher = HttpFetcher::new(&config.user_agent).expect("Failed to build fetcher");

    for page in ["/", "/page1", "/page2"] {
        let url = url::Url::parse(&format!("{}{}", mock_server.uri(), page))
            .expect("Failed to parse URL");
        let response = fetcher.fetch(&url).await.expect("Failed to fetch");

        assert_eq!(response.status, 200);
        assert!(ParserRegistry::with_html()
            .parser_for(&response.content_type)
            .is_some());
    }
}

#[tokio::test]
async fn test_full_crawl_single_domain() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(404))
        .expect(2)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_test_config(dir.path(), &mock_server.uri(), "linear");
    let (config, hash) = load_config_with_hash(&config_path).expect("Failed to load config");
    assert_eq!(hash.len(), 64);

    let (run, runner) = build_crawl(&config);
    let summary = runner.run().await;

    // Home, page1, page2, and /missing on attempts 0 and 1
    assert_eq!(summary.executed, 5);
    assert_eq!(summary.completed, 3);
    assert_eq!(summary.retried, 1);
    assert_eq!(summary.dead_lettered, 1);
    assert_eq!(run.seen().processed_count(), 3);
    assert!(run.is_idle());

    let items = run.dead_letters().items();
    assert_eq!(items.len(), 1);
    let item = &items[0];
    assert!(item.url.as_str().ends_with("/missing"));
    assert_eq!(item.reason, "max attempts reached");
    assert_eq!(item.stage_id.as_deref(), Some("fetch"));
    assert_eq!(item.route_id.as_deref(), Some("page"));
    assert_eq!(item.attempt, 1);
    assert!(item
        .error
        .as_ref()
        .map(|e| e.to_string().contains("HTTP 404"))
        .unwrap_or(false));
}

#[tokio::test]
async fn test_exponential_policy_discards_gone_pages() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(410))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_test_config(dir.path(), &mock_server.uri(), "exponential");
    let (config, _) = load_config_with_hash(&config_path).expect("Failed to load config");

    let (run, runner) = build_crawl(&config);
    let summary = runner.run().await;

    assert_eq!(summary.completed, 3);
    assert_eq!(summary.discarded, 1);
    assert_eq!(summary.dead_lettered, 0);
    assert!(run.dead_letters().is_empty());
}

#[tokio::test]
async fn test_sequential_crawl_visits_each_page_once() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(html_page("Found after all", &[]))
        .expect(1)
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_test_config(dir.path(), &mock_server.uri(), "linear");
    let (mut config, _) = load_config_with_hash(&config_path).expect("Failed to load config");
    config.engine.max_in_flight = 1;

    let (run, runner) = build_crawl(&config);
    let summary = runner.run().await;

    assert_eq!(summary.executed, 4);
    assert_eq!(summary.completed, 4);
    // Home, its four links and nothing else: page links are all duplicates
    assert_eq!(run.seen().discovered_count(), 4);
}

#[tokio::test]
async fn test_server_errors_are_retried() {
    let mock_server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    Mock::given(method("GET"))
        .and(path("/"))
        .respond_with(html_page("Recovered", &[]))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_test_config(dir.path(), &mock_server.uri(), "linear");
    let (config, _) = load_config_with_hash(&config_path).expect("Failed to load config");

    let (run, runner) = build_crawl(&config);
    let summary = runner.run().await;

    assert_eq!(summary.retried, 1);
    assert_eq!(summary.completed, 1);
    assert!(run.dead_letters().is_empty());
}

#[tokio::test]
async fn test_report_written_after_crawl() {
    let mock_server = MockServer::start().await;
    mount_site(&mock_server).await;
    Mock::given(method("GET"))
        .and(path("/missing"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let config_path = write_test_config(dir.path(), &mock_server.uri(), "linear");
    let (config, hash) = load_config_with_hash(&config_path).expect("Failed to load config");

    let (run, runner) = build_crawl(&config);
    let summary: RunSummary = runner.run().await;

    let report_path = Path::new(&config.output.summary_path);
    write_markdown_report(
        &summary,
        &run.dead_letters().items(),
        Some(&hash),
        report_path,
    )
    .expect("Failed to write report");

    let report = std::fs::read_to_string(report_path).expect("Failed to read report");
    assert!(report.contains(&format!("- **Config Hash**: {}", hash)));
    assert!(report.contains("| max attempts reached | 1 |"));
    assert!(report.contains("/missing | max attempts reached | page | fetch | 1 |"));
}
