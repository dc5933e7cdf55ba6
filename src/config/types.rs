use crate::units::{parse_day, work_units, work_units_between, WorkUnit};
use crate::HarvestError;
use chrono::Datelike;
use serde::Deserialize;

/// Main configuration structure
///
/// Every section and key has a default, so an empty file (or no file at all)
/// yields a runnable configuration.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Config {
    pub crawl: CrawlConfig,
    pub fetch: FetchConfig,
    pub proxy: ProxyConfig,
    pub output: OutputConfig,
    pub selectors: SelectorConfig,
}

/// What to harvest
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct CrawlConfig {
    /// Year to harvest; the current year when unset
    pub year: Option<i32>,

    /// First day of the window as `MM-DD` (January 1 when unset)
    pub first_day: Option<String>,

    /// Last day of the window as `MM-DD` (December 31 when unset)
    pub last_day: Option<String>,

    /// Site root; detail links are resolved against it
    pub base_url: String,

    /// Path of the dated listing endpoint, the `MM-DD` label is appended to it
    pub listing_path: String,

    /// Number of work units allowed in flight at once
    pub unit_concurrency: usize,
}

impl Default for CrawlConfig {
    fn default() -> Self {
        Self {
            year: None,
            first_day: None,
            last_day: None,
            base_url: "https://www.qrz.com".to_string(),
            listing_path: "/callbook/birthday/".to_string(),
            unit_concurrency: 1,
        }
    }
}

/// Transport and retry behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct FetchConfig {
    /// User-Agent header sent on every request
    pub user_agent: String,

    /// Whole-request timeout (seconds)
    pub timeout_secs: u64,

    /// Connect timeout (seconds), proxy tunnel setup included; must stay below `timeout_secs`
    pub connect_timeout_secs: u64,

    /// Attempts per request, the first one included
    pub max_attempts: u32,

    /// Base backoff delay (seconds), doubled after every failed attempt
    pub backoff_factor: f64,

    /// Upper bound for a single backoff delay (seconds)
    pub backoff_max_secs: f64,

    /// Maximum in-flight requests per batch
    pub concurrency: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "Mozilla/5.0 (Windows NT 6.1) AppleWebKit/537.36 (KHTML, like Gecko) \
                         Chrome/41.0.2228.0 Safari/537.36"
                .to_string(),
            timeout_secs: 30,
            connect_timeout_secs: 10,
            max_attempts: 5,
            backoff_factor: 0.2,
            backoff_max_secs: 30.0,
            concurrency: 50,
        }
    }
}

/// How the egress proxy is obtained
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ProxyMode {
    /// Direct egress
    None,
    /// Endpoints listed in this configuration
    Static,
    /// Endpoints scraped and probed from a public proxy list
    FreeList,
}

/// Proxy acquisition configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct ProxyConfig {
    pub mode: ProxyMode,

    /// Preferred ISO country codes, in order of preference
    pub regions: Vec<String>,

    /// Accept an endpoint from any region when none of the preferred ones works
    pub fallback_any_region: bool,

    /// Static endpoint for plain-HTTP targets
    pub http: Option<String>,

    /// Static endpoint for HTTPS targets
    pub https: Option<String>,

    /// Proxy list page for plain endpoints
    pub list_url: String,

    /// Proxy list page for HTTPS-capable endpoints
    pub https_list_url: String,

    /// URL fetched through a candidate plain endpoint to check it works
    pub probe_url: String,

    /// URL fetched through a candidate HTTPS endpoint to check it works
    pub https_probe_url: String,

    /// Probe timeout (milliseconds)
    pub probe_timeout_ms: u64,

    /// Maximum number of candidates probed per endpoint kind
    pub max_candidates: usize,
}

impl Default for ProxyConfig {
    fn default() -> Self {
        Self {
            mode: ProxyMode::FreeList,
            regions: vec!["FI".into(), "JP".into(), "CA".into(), "NL".into()],
            fallback_any_region: true,
            http: None,
            https: None,
            list_url: "https://free-proxy-list.net/".to_string(),
            https_list_url: "https://www.sslproxies.org/".to_string(),
            probe_url: "http://www.google.com".to_string(),
            https_probe_url: "https://www.google.com".to_string(),
            probe_timeout_ms: 1000,
            max_candidates: 20,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Path of the CSV file; truncated once at the start of a run
    pub path: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: "./amateurs".to_string(),
        }
    }
}

/// CSS selectors used by the extractor
#[derive(Debug, Clone, Deserialize)]
#[serde(default, rename_all = "kebab-case")]
pub struct SelectorConfig {
    /// Links to detail pages on a listing page
    pub listing_links: String,

    pub call_sign: String,

    pub name_original: String,

    pub name_english: String,
}

impl Default for SelectorConfig {
    fn default() -> Self {
        Self {
            listing_links: "table a".to_string(),
            call_sign: "div.main_content h1".to_string(),
            name_original: "#infoBlock b".to_string(),
            name_english: r#"#infoBlock div[style="color:gray;"] b"#.to_string(),
        }
    }
}

impl Config {
    /// The harvested year, falling back to the current local year
    pub fn year(&self) -> i32 {
        self.crawl
            .year
            .unwrap_or_else(|| chrono::Local::now().date_naive().year())
    }

    /// Builds the ordered list of work units for the configured window
    pub fn window(&self) -> Result<Vec<WorkUnit>, HarvestError> {
        let year = self.year();

        match (&self.crawl.first_day, &self.crawl.last_day) {
            (None, None) => work_units(year),
            (first, last) => {
                let first = match first {
                    Some(label) => parse_day(year, label)?,
                    None => parse_day(year, "01-01")?,
                };
                let last = match last {
                    Some(label) => parse_day(year, label)?,
                    None => parse_day(year, "12-31")?,
                };
                work_units_between(first, last)
            }
        }
    }
}
