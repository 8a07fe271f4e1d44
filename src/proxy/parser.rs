//! Record parser and normalizer for raw proxy lists

use crate::proxy::models::ProxyRecord;
use crate::Result;
use anyhow::Context;
use csv::ReaderBuilder;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Punctuation and symbols stripped from ISP names
static ISP_PUNCT_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"[,.;:!?'"`()\[\]{}<>@#$%^&*+=/\\|~_]"#).expect("Invalid ISP punctuation regex")
});

/// Runs of whitespace, collapsed to single spaces after punctuation removal
static WHITESPACE_REGEX: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\s+").expect("Invalid whitespace regex"));

/// JSON-lines input row: `{"ip": "...", "port": 8080, "country": "US"}`.
/// Port may arrive as a number or a string.
#[derive(Debug, Deserialize)]
struct JsonRecord {
    ip: String,
    port: PortValue,
    country: Option<String>,
    isp: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum PortValue {
    Number(u16),
    Text(String),
}

impl PortValue {
    fn as_port(&self) -> Option<u16> {
        match self {
            PortValue::Number(n) => Some(*n),
            PortValue::Text(s) => s.trim().parse().ok(),
        }
    }
}

/// Record parser for delimited and JSON-lines proxy lists
pub struct RecordParser;

impl RecordParser {
    /// Parse a single input line, auto-detecting the format.
    ///
    /// Lines starting with `{` are treated as JSON objects, everything else
    /// as comma-delimited `ip,port,countryCode,isp[,extra...]`. Returns
    /// `None` for blank lines, comments, and records that fail validation.
    pub fn parse_line(line: &str) -> Option<ProxyRecord> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return None;
        }

        if line.starts_with('{') {
            Self::parse_json_line(line)
        } else {
            Self::parse_delimited_line(line)
        }
    }

    /// Parse one delimited line, honoring CSV quoting so ISP names
    /// containing commas stay a single field.
    fn parse_delimited_line(line: &str) -> Option<ProxyRecord> {
        let mut reader = ReaderBuilder::new()
            .has_headers(false)
            .flexible(true)
            .from_reader(line.as_bytes());
        let record = match reader.records().next()? {
            Ok(record) => record,
            Err(e) => {
                debug!("skipping malformed delimited record: {}", e);
                return None;
            }
        };
        let fields: Vec<&str> = record.iter().collect();
        Self::normalize_fields(&fields)
    }

    /// Parse one JSON object line
    fn parse_json_line(line: &str) -> Option<ProxyRecord> {
        let raw: JsonRecord = match serde_json::from_str(line) {
            Ok(raw) => raw,
            Err(e) => {
                debug!("skipping malformed JSON record: {}", e);
                return None;
            }
        };

        let ip = raw.ip.trim().to_string();
        let port = raw.port.as_port().filter(|p| *p > 0)?;
        if ip.is_empty() {
            return None;
        }

        let country_code = raw
            .country
            .as_deref()
            .map(str::trim)
            .filter(|c| !c.is_empty())
            .map(String::from);
        let isp = raw.isp.as_deref().and_then(Self::normalize_isp);

        Some(ProxyRecord::with_meta(ip, port, country_code, isp))
    }

    /// Normalize a sequence of raw fields into a record.
    ///
    /// Requires at least an ip and a port after trimming; anything past the
    /// fourth field (such as a stale latency column) is discarded by
    /// position. Records with a blank ip or an unparseable port are
    /// rejected.
    pub fn normalize_fields(fields: &[&str]) -> Option<ProxyRecord> {
        let trimmed: Vec<&str> = fields.iter().take(4).map(|f| f.trim()).collect();
        if trimmed.len() < 2 {
            return None;
        }

        let ip = trimmed[0];
        if ip.is_empty() {
            return None;
        }

        let port: u16 = match trimmed[1].parse() {
            Ok(p) if p > 0 => p,
            _ => {
                debug!("skipping record with invalid port: {:?}", fields);
                return None;
            }
        };

        let country_code = trimmed
            .get(2)
            .copied()
            .filter(|c| !c.is_empty())
            .map(String::from);
        let isp = trimmed.get(3).copied().and_then(Self::normalize_isp);

        Some(ProxyRecord::with_meta(
            ip.to_string(),
            port,
            country_code,
            isp,
        ))
    }

    /// Clean an ISP name: strip punctuation, collapse whitespace runs to
    /// single spaces, trim. Returns `None` if nothing remains.
    pub fn normalize_isp(raw: &str) -> Option<String> {
        let stripped = ISP_PUNCT_REGEX.replace_all(raw, " ");
        let collapsed = WHITESPACE_REGEX.replace_all(&stripped, " ");
        let cleaned = collapsed.trim();
        if cleaned.is_empty() {
            None
        } else {
            Some(cleaned.to_string())
        }
    }

    /// Parse records from a string (multiple lines)
    pub fn parse_string(content: &str) -> Vec<ProxyRecord> {
        content.lines().filter_map(Self::parse_line).collect()
    }

    /// Parse records from a file. A missing or unreadable file is an error;
    /// the caller treats it as fatal before any checking begins.
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Vec<ProxyRecord>> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display()))?;
        Ok(Self::parse_string(&content))
    }
}
