//! Proxy record and check-outcome data models

use serde::{Deserialize, Serialize};
use std::fmt;

/// A single proxy endpoint as read from the input list.
///
/// Identity is the `(ip, port)` pair; country code and ISP are optional
/// metadata that the verifier may later override.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProxyRecord {
    pub ip: String,
    pub port: u16,
    pub country_code: Option<String>,
    pub isp: Option<String>,
}

impl ProxyRecord {
    /// Create a new record without metadata
    pub fn new(ip: String, port: u16) -> Self {
        Self {
            ip,
            port,
            country_code: None,
            isp: None,
        }
    }

    /// Create a new record with country code and ISP metadata
    pub fn with_meta(
        ip: String,
        port: u16,
        country_code: Option<String>,
        isp: Option<String>,
    ) -> Self {
        Self {
            ip,
            port,
            country_code,
            isp,
        }
    }

    /// Get the endpoint string in IP:PORT format
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    /// Identity key for deduplication
    pub fn key(&self) -> (&str, u16) {
        (&self.ip, self.port)
    }
}

impl fmt::Display for ProxyRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.endpoint())
    }
}

/// Verifier classification for one endpoint
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum CheckStatus {
    Alive,
    Dead,
    Error(String),
}

/// Result of checking a single endpoint against the verifier.
///
/// Produced exactly once per input record. Resolved fields carry
/// verifier-supplied metadata and take precedence over the record's own.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckOutcome {
    pub record: ProxyRecord,
    pub status: CheckStatus,
    pub latency_ms: Option<u64>,
    pub resolved_country: Option<String>,
    pub resolved_isp: Option<String>,
}

impl CheckOutcome {
    pub fn alive(
        record: ProxyRecord,
        latency_ms: Option<u64>,
        resolved_country: Option<String>,
        resolved_isp: Option<String>,
    ) -> Self {
        Self {
            record,
            status: CheckStatus::Alive,
            latency_ms,
            resolved_country,
            resolved_isp,
        }
    }

    pub fn dead(record: ProxyRecord) -> Self {
        Self {
            record,
            status: CheckStatus::Dead,
            latency_ms: None,
            resolved_country: None,
            resolved_isp: None,
        }
    }

    pub fn error(record: ProxyRecord, message: String) -> Self {
        Self {
            record,
            status: CheckStatus::Error(message),
            latency_ms: None,
            resolved_country: None,
            resolved_isp: None,
        }
    }

    pub fn is_alive(&self) -> bool {
        matches!(self.status, CheckStatus::Alive)
    }
}

/// A confirmed-alive proxy, ready for export.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliveProxy {
    pub ip: String,
    pub port: u16,
    pub country_code: Option<String>,
    pub isp: Option<String>,
}

impl AliveProxy {
    /// Build from an alive outcome, preferring verifier-resolved metadata
    /// over the original record's fields.
    pub fn from_outcome(outcome: &CheckOutcome) -> Self {
        Self {
            ip: outcome.record.ip.clone(),
            port: outcome.record.port,
            country_code: outcome
                .resolved_country
                .clone()
                .or_else(|| outcome.record.country_code.clone()),
            isp: outcome
                .resolved_isp
                .clone()
                .or_else(|| outcome.record.isp.clone()),
        }
    }

    /// Get the endpoint string in IP:PORT format
    pub fn endpoint(&self) -> String {
        format!("{}:{}", self.ip, self.port)
    }

    /// Identity key for deduplication
    pub fn key(&self) -> (String, u16) {
        (self.ip.clone(), self.port)
    }
}

impl fmt::Display for AliveProxy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.endpoint())
    }
}
