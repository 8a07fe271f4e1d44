//! Client adapter for the external proxy verification API

use crate::config::{DEFAULT_API_URL, DEFAULT_TIMEOUT_SECS};
use crate::proxy::models::{CheckOutcome, ProxyRecord};
use crate::Result;
use anyhow::Context;
use reqwest::Client;
use serde::Deserialize;
use std::collections::HashMap;
use std::time::{Duration, Instant};

/// Configuration for the verifier client
#[derive(Debug, Clone)]
pub struct VerifierConfig {
    /// URL template with an `{ip_port_list}` (or `{}`) marker
    pub url_template: String,
    /// Request timeout for each call
    pub timeout: Duration,
}

impl Default for VerifierConfig {
    fn default() -> Self {
        Self {
            url_template: DEFAULT_API_URL.to_string(),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl VerifierConfig {
    pub fn new(url_template: String) -> Self {
        Self {
            url_template,
            ..Default::default()
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

/// One element of the verifier's JSON array response.
///
/// `ip` carries the endpoint identifier in `"ip:port"` form; `proxyip` is
/// the liveness flag. Country and organization names vary across verifier
/// deployments, hence the aliases.
#[derive(Debug, Deserialize)]
struct VerifierEntry {
    #[serde(default)]
    ip: String,
    #[serde(default)]
    proxyip: bool,
    #[serde(default, rename = "countryCode", alias = "country")]
    country_code: Option<String>,
    #[serde(default, rename = "asOrganization", alias = "org", alias = "isp")]
    organization: Option<String>,
}

impl VerifierEntry {
    fn into_outcome(self, record: ProxyRecord, latency_ms: Option<u64>) -> CheckOutcome {
        if self.proxyip {
            CheckOutcome::alive(record, latency_ms, self.country_code, self.organization)
        } else {
            CheckOutcome::dead(record)
        }
    }
}

/// HTTP client for the verification service.
///
/// Every failure mode (transport, timeout, non-2xx, malformed payload) is
/// folded into per-endpoint Error outcomes so one bad call never aborts the
/// rest of a run.
pub struct VerifierClient {
    client: Client,
    config: VerifierConfig,
}

impl VerifierClient {
    pub fn new(config: VerifierConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .context("Failed to build HTTP client")?;
        Ok(Self { client, config })
    }

    /// Check a single endpoint. Latency is the wall-clock round trip in
    /// whole milliseconds.
    pub async fn check_endpoint(&self, record: ProxyRecord) -> CheckOutcome {
        let endpoint = record.endpoint();
        let url = self.request_url(&endpoint);
        let start = Instant::now();

        match self.fetch_entries(&url).await {
            Ok(entries) => {
                let latency_ms = start.elapsed().as_millis() as u64;
                match entries.into_iter().next() {
                    Some(entry) => entry.into_outcome(record, Some(latency_ms)),
                    None => {
                        CheckOutcome::error(record, format!("{}: empty verifier response", endpoint))
                    }
                }
            }
            Err(e) => CheckOutcome::error(record, format!("{}: {:#}", endpoint, e)),
        }
    }

    /// Check a batch of endpoints in one call. Response elements are
    /// matched back to inputs by their `"ip:port"` key; inputs missing from
    /// the response get an Error outcome, surplus elements are ignored.
    pub async fn check_batch(&self, records: Vec<ProxyRecord>) -> Vec<CheckOutcome> {
        let payload = records
            .iter()
            .map(ProxyRecord::endpoint)
            .collect::<Vec<_>>()
            .join(",");
        let url = self.request_url(&payload);

        let entries = match self.fetch_entries(&url).await {
            Ok(entries) => entries,
            Err(e) => {
                let cause = format!("{:#}", e);
                return records
                    .into_iter()
                    .map(|record| {
                        let endpoint = record.endpoint();
                        CheckOutcome::error(
                            record,
                            format!("{}: batch check failed: {}", endpoint, cause),
                        )
                    })
                    .collect();
            }
        };

        let mut by_endpoint: HashMap<String, VerifierEntry> = entries
            .into_iter()
            .filter(|entry| !entry.ip.is_empty())
            .map(|entry| (entry.ip.clone(), entry))
            .collect();

        records
            .into_iter()
            .map(|record| match by_endpoint.remove(&record.endpoint()) {
                Some(entry) => entry.into_outcome(record, None),
                None => {
                    let endpoint = record.endpoint();
                    CheckOutcome::error(
                        record,
                        format!("{}: no entry in verifier response", endpoint),
                    )
                }
            })
            .collect()
    }

    async fn fetch_entries(&self, url: &str) -> Result<Vec<VerifierEntry>> {
        let response = self
            .client
            .get(url)
            .send()
            .await
            .context("verifier request failed")?
            .error_for_status()
            .context("verifier returned error status")?;

        let entries = response
            .json::<Vec<VerifierEntry>>()
            .await
            .context("invalid verifier response payload")?;
        Ok(entries)
    }

    /// Substitute the endpoint payload into the URL template.
    fn request_url(&self, payload: &str) -> String {
        let template = &self.config.url_template;
        if template.contains("{ip_port_list}") {
            template.replace("{ip_port_list}", payload)
        } else if template.contains("{}") {
            template.replacen("{}", payload, 1)
        } else if template.ends_with('/') {
            format!("{}{}", template, payload)
        } else {
            format!("{}/{}", template, payload)
        }
    }
}
