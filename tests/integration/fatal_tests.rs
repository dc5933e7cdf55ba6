//! Proxy failures end the run without losing completed units

use callbook_harvest::config::Config;
use callbook_harvest::crawler::{Coordinator, RawPage, Transport, TransportError};
use callbook_harvest::output::CsvSink;
use callbook_harvest::HarvestError;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::{Duration, Instant};
use url::Url;

/// In-process site: 01-01 lists ten amateurs, every other day lists one.
/// Detail pages whose path ends in `fail_on` answer with a proxy failure.
struct FakeSite {
    fail_on: Option<&'static str>,
    requested: Mutex<Vec<String>>,
}

impl FakeSite {
    fn new(fail_on: Option<&'static str>) -> Self {
        Self {
            fail_on,
            requested: Mutex::new(Vec::new()),
        }
    }

    fn requested(&self) -> Vec<String> {
        self.requested.lock().unwrap().clone()
    }
}

impl Transport for FakeSite {
    async fn get(&self, url: &Url) -> Result<RawPage, TransportError> {
        let path = url.path().to_string();
        self.requested.lock().unwrap().push(path.clone());

        if let Some(day) = path.strip_prefix("/callbook/birthday/") {
            let count = if day == "01-01" { 10 } else { 1 };
            let links: String = (0..count)
                .map(|i| format!(r#"<tr><td><a href="/db/{}-{}">x</a></td></tr>"#, day, i))
                .collect();
            return Ok(RawPage {
                status: 200,
                body: format!("<table>{}</table>", links),
            });
        }

        if self.fail_on.is_some_and(|fail| path.ends_with(fail)) {
            return Err(TransportError::Proxy("connection refused by proxy".to_string()));
        }

        let call_sign = path.trim_start_matches("/db/");
        Ok(RawPage {
            status: 200,
            body: format!(
                r#"<div class="main_content"><h1>{}</h1></div><div id="infoBlock"><b>Op</b></div>"#,
                call_sign
            ),
        })
    }
}

/// 01-01 lists twenty slow detail pages; the 01-02 listing goes through a dead proxy
#[derive(Default)]
struct StalledEgress {
    detail_requests: AtomicUsize,
}

impl Transport for StalledEgress {
    async fn get(&self, url: &Url) -> Result<RawPage, TransportError> {
        match url.path() {
            "/callbook/birthday/01-01" => {
                let links: String = (0..20)
                    .map(|i| format!(r#"<tr><td><a href="/db/SLOW{}">x</a></td></tr>"#, i))
                    .collect();
                Ok(RawPage {
                    status: 200,
                    body: format!("<table>{}</table>", links),
                })
            }
            "/callbook/birthday/01-02" => {
                Err(TransportError::Proxy("tunnel refused".to_string()))
            }
            _ => {
                self.detail_requests.fetch_add(1, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(100)).await;
                Ok(RawPage {
                    status: 200,
                    body: String::new(),
                })
            }
        }
    }
}

fn create_test_config(last_day: &str) -> Config {
    let mut config = Config::default();
    config.crawl.year = Some(2024);
    config.crawl.first_day = Some("01-01".to_string());
    config.crawl.last_day = Some(last_day.to_string());
    config.crawl.base_url = "http://callbook.test".to_string();
    config.fetch.concurrency = 1;
    config.fetch.backoff_factor = 0.0;
    config
}

#[tokio::test]
async fn test_proxy_failure_stops_batch_and_run() {
    let site = FakeSite::new(Some("/db/01-01-2"));
    let config = create_test_config("01-03");
    let sink = CsvSink::new(Vec::new()).unwrap();

    let mut coordinator = Coordinator::new(&config, site, sink).unwrap();
    let result = coordinator.run().await;

    assert!(matches!(result, Err(HarvestError::ProxyFailure { .. })));

    // Listing plus the first three details; the failing request is not retried
    let requested = coordinator.transport().requested();
    assert_eq!(
        requested,
        vec![
            "/callbook/birthday/01-01",
            "/db/01-01-0",
            "/db/01-01-1",
            "/db/01-01-2",
        ]
    );

    let bytes = coordinator.into_sink().into_inner().unwrap();
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        "call_sign,name_original,name_english,birthdate\r\n"
    );
}

#[tokio::test]
async fn test_completed_units_survive_later_proxy_failure() {
    let site = FakeSite::new(Some("/db/01-03-0"));
    let config = create_test_config("01-05");
    let sink = CsvSink::new(Vec::new()).unwrap();

    let mut coordinator = Coordinator::new(&config, site, sink).unwrap();
    let result = coordinator.run().await;
    assert!(result.is_err());

    // Nothing past the failing day is requested
    assert!(!coordinator
        .transport()
        .requested()
        .iter()
        .any(|path| path.contains("01-04") || path.contains("01-05")));

    let bytes = coordinator.into_sink().into_inner().unwrap();
    let text = String::from_utf8(bytes).unwrap();
    let lines: Vec<&str> = text.lines().collect();

    // Header, ten rows for 01-01, one for 01-02
    assert_eq!(lines.len(), 12);
    assert_eq!(lines[1], "01-01-0,Op,No info,01-01");
    assert_eq!(lines[11], "01-02-0,Op,No info,01-02");
}

#[tokio::test]
async fn test_rows_follow_listing_order() {
    let site = FakeSite::new(None);
    let mut config = create_test_config("01-01");
    config.fetch.concurrency = 8;
    let sink = CsvSink::new(Vec::new()).unwrap();

    let mut coordinator = Coordinator::new(&config, site, sink).unwrap();
    let stats = coordinator.run().await.unwrap();
    assert_eq!(stats.records_written, 10);

    let bytes = coordinator.into_sink().into_inner().unwrap();
    let text = String::from_utf8(bytes).unwrap();
    let call_signs: Vec<&str> = text
        .lines()
        .skip(1)
        .map(|line| line.split(',').next().unwrap())
        .collect();
    let expected: Vec<String> = (0..10).map(|i| format!("01-01-{}", i)).collect();
    assert_eq!(call_signs, expected);
}

#[tokio::test]
async fn test_proxy_failure_in_later_unit_stops_earlier_units() {
    let mut config = create_test_config("01-02");
    config.crawl.unit_concurrency = 2;
    let sink = CsvSink::new(Vec::new()).unwrap();

    let mut coordinator = Coordinator::new(&config, StalledEgress::default(), sink).unwrap();
    let start = Instant::now();
    let result = coordinator.run().await;

    assert!(matches!(result, Err(HarvestError::ProxyFailure { .. })));
    assert!(start.elapsed() < Duration::from_secs(1), "{:?}", start.elapsed());

    // 01-01 had at most its first detail page in flight when 01-02 failed
    let detail_requests = coordinator
        .transport()
        .detail_requests
        .load(Ordering::SeqCst);
    assert!(detail_requests <= 1, "{} detail requests", detail_requests);

    let bytes = coordinator.into_sink().into_inner().unwrap();
    assert_eq!(
        String::from_utf8(bytes).unwrap(),
        "call_sign,name_original,name_english,birthdate\r\n"
    );
}

#[tokio::test]
async fn test_concurrent_units_written_in_calendar_order() {
    let site = FakeSite::new(None);
    let mut config = create_test_config("01-04");
    config.crawl.unit_concurrency = 3;
    config.fetch.concurrency = 4;
    let sink = CsvSink::new(Vec::new()).unwrap();

    let mut coordinator = Coordinator::new(&config, site, sink).unwrap();
    let stats = coordinator.run().await.unwrap();
    assert_eq!(stats.work_units, 4);

    let bytes = coordinator.into_sink().into_inner().unwrap();
    let text = String::from_utf8(bytes).unwrap();
    let days: Vec<&str> = text
        .lines()
        .skip(1)
        .filter_map(|line| line.rsplit(',').next())
        .collect();

    // Ten rows for 01-01, then one per later day
    assert_eq!(days.len(), 13);
    assert!(days[..10].iter().all(|day| *day == "01-01"));
    assert_eq!(&days[10..], &["01-02", "01-03", "01-04"]);
}
