//! Public proxy list provisioner
//!
//! Scrapes a free proxy table, filters rows by country (and HTTPS support for
//! the secure endpoint), then probes candidates one by one until one answers.

use crate::config::ProxyConfig;
use crate::proxy::{ProxyBinding, ProxyCriteria, ProxyError, ProxyProvisioner};
use reqwest::{Client, Proxy};
use scraper::{Html, Selector};
use std::net::IpAddr;
use std::time::Duration;
use url::Url;

/// One row of a proxy list table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProxyCandidate {
    pub ip: IpAddr,
    pub port: u16,
    /// Two-letter country code, uppercase
    pub country_code: String,
    /// Whether the list marks this proxy as HTTPS-capable
    pub https: bool,
}

impl ProxyCandidate {
    /// The endpoint URL used when binding this candidate
    pub fn endpoint(&self) -> Result<Url, ProxyError> {
        Url::parse(&format!("http://{}:{}", self.ip, self.port))
            .map_err(|e| ProxyError::InvalidEndpoint(e.to_string()))
    }
}

/// Provisioner backed by public proxy list pages
pub struct FreeProxyList {
    client: Client,
    list_url: Url,
    https_list_url: Url,
    probe_url: Url,
    https_probe_url: Url,
    probe_timeout: Duration,
    max_candidates: usize,
}

impl FreeProxyList {
    pub fn from_config(config: &ProxyConfig, user_agent: &str) -> Result<Self, ProxyError> {
        let parse = |value: &str| {
            Url::parse(value).map_err(|e| ProxyError::InvalidEndpoint(format!("{}: {}", value, e)))
        };

        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(Duration::from_secs(15))
            .no_proxy()
            .build()?;

        Ok(Self {
            client,
            list_url: parse(&config.list_url)?,
            https_list_url: parse(&config.https_list_url)?,
            probe_url: parse(&config.probe_url)?,
            https_probe_url: parse(&config.https_probe_url)?,
            probe_timeout: Duration::from_millis(config.probe_timeout_ms),
            max_candidates: config.max_candidates,
        })
    }

    /// Downloads and parses one proxy list page
    async fn fetch_candidates(&self, list_url: &Url) -> Result<Vec<ProxyCandidate>, ProxyError> {
        let response = self
            .client
            .get(list_url.clone())
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| ProxyError::List {
                url: list_url.to_string(),
                message: e.to_string(),
            })?;

        let body = response.text().await.map_err(|e| ProxyError::List {
            url: list_url.to_string(),
            message: e.to_string(),
        })?;

        let candidates = parse_proxy_table(&body);
        tracing::debug!("{} proxy rows listed at {}", candidates.len(), list_url);
        Ok(candidates)
    }

    /// Returns true if `probe_url` answers successfully through `endpoint`
    async fn probe(&self, endpoint: &Url, probe_url: &Url) -> bool {
        let client = match Proxy::all(endpoint.as_str())
            .and_then(|proxy| {
                Client::builder()
                    .proxy(proxy)
                    .timeout(self.probe_timeout)
                    .build()
            }) {
            Ok(client) => client,
            Err(e) => {
                tracing::debug!("Cannot build probe client for {}: {}", endpoint, e);
                return false;
            }
        };

        match client.get(probe_url.clone()).send().await {
            Ok(response) => response.status().is_success(),
            Err(e) => {
                tracing::trace!("Probe through {} failed: {}", endpoint, e);
                false
            }
        }
    }

    /// Finds one working endpoint of the requested kind
    async fn find_endpoint(&self, criteria: &ProxyCriteria, secure: bool) -> Result<Url, ProxyError> {
        let (list_url, probe_url) = if secure {
            (&self.https_list_url, &self.https_probe_url)
        } else {
            (&self.list_url, &self.probe_url)
        };

        let listed = self.fetch_candidates(list_url).await?;

        let preferred = select_candidates(&listed, &criteria.regions, secure);
        if let Some(endpoint) = self.first_working(&preferred, probe_url).await {
            return Ok(endpoint);
        }

        if criteria.fallback_any_region && !criteria.regions.is_empty() {
            tracing::info!("No working proxy in {:?}, trying any region", criteria.regions);
            let fallback: Vec<&ProxyCandidate> = select_candidates(&listed, &[], secure)
                .into_iter()
                .filter(|c| !preferred.contains(c))
                .collect();
            if let Some(endpoint) = self.first_working(&fallback, probe_url).await {
                return Ok(endpoint);
            }
        }

        Err(ProxyError::Unavailable(format!(
            "no working {} proxy found at {}",
            if secure { "https" } else { "http" },
            list_url
        )))
    }

    async fn first_working(&self, candidates: &[&ProxyCandidate], probe_url: &Url) -> Option<Url> {
        for candidate in candidates.iter().take(self.max_candidates) {
            let Ok(endpoint) = candidate.endpoint() else {
                continue;
            };
            if self.probe(&endpoint, probe_url).await {
                tracing::debug!("Proxy {} ({}) answered", endpoint, candidate.country_code);
                return Some(endpoint);
            }
        }
        None
    }
}

impl ProxyProvisioner for FreeProxyList {
    async fn acquire(&self, criteria: &ProxyCriteria) -> Result<ProxyBinding, ProxyError> {
        let http = self.find_endpoint(criteria, false).await?;
        let https = self.find_endpoint(criteria, true).await?;
        Ok(ProxyBinding::new(Some(http), Some(https)))
    }
}

/// Parses the rows of a proxy list table
///
/// Expected columns: IP, Port, Code, Country, Anonymity, Google, Https, ...
/// Rows that do not have that shape are skipped.
pub fn parse_proxy_table(html: &str) -> Vec<ProxyCandidate> {
    let document = Html::parse_document(html);
    let (row_selector, cell_selector) =
        match (Selector::parse("table tbody tr"), Selector::parse("td")) {
            (Ok(rows), Ok(cells)) => (rows, cells),
            _ => return Vec::new(),
        };

    document
        .select(&row_selector)
        .filter_map(|row| {
            let cells: Vec<String> = row
                .select(&cell_selector)
                .map(|cell| cell.text().collect::<String>().trim().to_string())
                .collect();

            if cells.len() < 7 {
                return None;
            }

            Some(ProxyCandidate {
                ip: cells[0].parse().ok()?,
                port: cells[1].parse().ok()?,
                country_code: cells[2].to_ascii_uppercase(),
                https: cells[6].eq_ignore_ascii_case("yes"),
            })
        })
        .collect()
}

/// Keeps candidates in `regions` (any region when empty), preserving list order
pub fn select_candidates<'a>(
    candidates: &'a [ProxyCandidate],
    regions: &[String],
    https_only: bool,
) -> Vec<&'a ProxyCandidate> {
    candidates
        .iter()
        .filter(|c| !https_only || c.https)
        .filter(|c| {
            regions.is_empty()
                || regions
                    .iter()
                    .any(|region| region.eq_ignore_ascii_case(&c.country_code))
        })
        .collect()
}
