//! End-to-end harvests against a mock callbook site

use callbook_harvest::config::{Config, ProxyMode};
use callbook_harvest::crawler::harvest;
use callbook_harvest::proxy::ProxyBinding;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn listing_page(links: &[&str]) -> String {
    let rows: String = links
        .iter()
        .map(|link| format!(r#"<tr><td><a href="{}">{}</a></td></tr>"#, link, link))
        .collect();
    format!(
        "<html><body><div class=\"main_content\"><table>{}</table></div></body></html>",
        rows
    )
}

fn detail_page(call_sign: &str, name: &str, english: Option<&str>) -> String {
    let english = english
        .map(|e| format!(r#"<div style="color:gray;"><b>{}</b></div>"#, e))
        .unwrap_or_default();
    format!(
        r#"<html><body>
<div class="main_content"><h1>{}</h1></div>
<div id="infoBlock"><b>{}</b>{}</div>
</body></html>"#,
        call_sign, name, english
    )
}

/// Creates a test configuration for a two-day window against `base_url`
fn create_test_config(base_url: &str, output: &str) -> Config {
    let mut config = Config::default();
    config.crawl.year = Some(2024);
    config.crawl.first_day = Some("01-01".to_string());
    config.crawl.last_day = Some("01-02".to_string());
    config.crawl.base_url = base_url.to_string();
    config.fetch.user_agent = "TestHarvester/1.0".to_string();
    config.fetch.timeout_secs = 5;
    config.fetch.connect_timeout_secs = 2;
    config.fetch.max_attempts = 3;
    config.fetch.backoff_factor = 0.0;
    config.fetch.concurrency = 4;
    config.proxy.mode = ProxyMode::None;
    config.output.path = output.to_string();
    config
}

async fn mount_page(server: &MockServer, page_path: &str, body: String) {
    Mock::given(method("GET"))
        .and(path(page_path))
        .respond_with(ResponseTemplate::new(200).set_body_string(body))
        .mount(server)
        .await;
}

/// Two days: 01-01 lists two amateurs, 01-02 lists one
async fn mount_two_day_site(server: &MockServer) {
    mount_page(
        server,
        "/callbook/birthday/01-01",
        listing_page(&["/db/AA1AA", "/db/BB2BB"]),
    )
    .await;
    mount_page(
        server,
        "/callbook/birthday/01-02",
        listing_page(&["/db/CC3CC"]),
    )
    .await;
    mount_page(
        server,
        "/db/AA1AA",
        detail_page("AA1AA", "Alice Able", Some("Alice Able")),
    )
    .await;
    mount_page(server, "/db/BB2BB", detail_page("BB2BB", "Борис", Some("Boris")))
        .await;
    mount_page(server, "/db/CC3CC", detail_page("CC3CC", "Carol Cole", None)).await;
}

#[tokio::test]
async fn test_every_work_unit_kept_in_output() {
    let mock_server = MockServer::start().await;
    mount_two_day_site(&mock_server).await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let output = dir.path().join("amateurs");
    let config = create_test_config(&mock_server.uri(), output.to_str().unwrap());

    let stats = harvest(&config, ProxyBinding::direct())
        .await
        .expect("Harvest failed");

    assert_eq!(stats.work_units, 2);
    assert_eq!(stats.records_written, 3);
    assert_eq!(stats.detail_pages_ok, 3);

    let text = std::fs::read_to_string(&output).expect("Failed to read output");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "call_sign,name_original,name_english,birthdate",
            "AA1AA,Alice Able,Alice Able,01-01",
            "BB2BB,Борис,Boris,01-01",
            "CC3CC,Carol Cole,No info,01-02",
        ]
    );
}

#[tokio::test]
async fn test_rerun_is_byte_identical() {
    let mock_server = MockServer::start().await;
    mount_two_day_site(&mock_server).await;

    let dir = tempfile::tempdir().expect("Failed to create temp dir");
    let first = dir.path().join("first.csv");
    let second = dir.path().join("second.csv");

    for output in [&first, &second] {
        let config = create_test_config(&mock_server.uri(), output.to_str().unwrap());
        harvest(&config, ProxyBinding::direct())
            .await
            .expect("Harvest failed");
    }

    let first = std::fs::read(&first).unwrap();
    let second = std::fs::read(&second).unwrap();
    assert!(!first.is_empty());
    assert_eq!(first, second);
}

#[tokio::test]
async fn test_rerun_replaces_previous_file() {
    let mock_server = MockServer::start().await;
    mount_two_day_site(&mock_server).await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("amateurs");
    std::fs::write(&output, "stale content from an older run\n").unwrap();

    let config = create_test_config(&mock_server.uri(), output.to_str().unwrap());
    harvest(&config, ProxyBinding::direct()).await.unwrap();

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(!text.contains("stale"));
    assert_eq!(text.lines().count(), 4);
}

#[tokio::test]
async fn test_transient_detail_failure_is_retried() {
    let mock_server = MockServer::start().await;

    mount_page(
        &mock_server,
        "/callbook/birthday/01-01",
        listing_page(&["/db/FLAKY"]),
    )
    .await;
    mount_page(&mock_server, "/callbook/birthday/01-02", listing_page(&[])).await;

    // First answer is a 503, then the page is served
    Mock::given(method("GET"))
        .and(path("/db/FLAKY"))
        .respond_with(ResponseTemplate::new(503))
        .up_to_n_times(1)
        .mount(&mock_server)
        .await;
    mount_page(
        &mock_server,
        "/db/FLAKY",
        detail_page("DL1FLK", "Flaky Fritz", Some("Flaky Fritz")),
    )
    .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("amateurs");
    let config = create_test_config(&mock_server.uri(), output.to_str().unwrap());

    let stats = harvest(&config, ProxyBinding::direct()).await.unwrap();
    assert_eq!(stats.retries, 1);
    assert_eq!(stats.detail_pages_degraded, 0);

    let text = std::fs::read_to_string(&output).unwrap();
    assert!(text.contains("DL1FLK,Flaky Fritz,Flaky Fritz,01-01"));
}

#[tokio::test]
async fn test_degraded_pages_do_not_abort_run() {
    let mock_server = MockServer::start().await;

    // 01-01 listing is missing entirely, 01-02 lists one broken detail page
    Mock::given(method("GET"))
        .and(path("/callbook/birthday/01-01"))
        .respond_with(ResponseTemplate::new(404))
        .mount(&mock_server)
        .await;
    mount_page(
        &mock_server,
        "/callbook/birthday/01-02",
        listing_page(&["/db/BROKEN"]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/db/BROKEN"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&mock_server)
        .await;

    let dir = tempfile::tempdir().unwrap();
    let output = dir.path().join("amateurs");
    let config = create_test_config(&mock_server.uri(), output.to_str().unwrap());

    let stats = harvest(&config, ProxyBinding::direct()).await.unwrap();
    assert_eq!(stats.listing_pages_degraded, 1);
    assert_eq!(stats.detail_pages_degraded, 1);
    assert_eq!(stats.retries, 2);

    let text = std::fs::read_to_string(&output).unwrap();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[1], "No info,No info,No info,01-02");
}

#[tokio::test]
async fn test_unwritable_output_is_fatal() {
    let mock_server = MockServer::start().await;
    let config = create_test_config(&mock_server.uri(), "/nonexistent-dir/amateurs");

    let result = harvest(&config, ProxyBinding::direct()).await;
    assert!(result.is_err());
}
