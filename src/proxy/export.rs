//! Export builders: flat proxy list, grouped JSON document, error log

use crate::proxy::models::AliveProxy;
use crate::Result;
use anyhow::Context;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;

/// Bucket for records carrying no country code (ISO user-assigned element)
pub const UNKNOWN_COUNTRY: &str = "ZZ";

/// Bucket for records carrying no ISP name
pub const UNKNOWN_ISP: &str = "Unknown";

/// One ISP slot in the grouped export
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GroupEntry {
    pub name: String,
    pub proxies: Vec<String>,
}

/// countryCode -> slot letter -> ISP entry. BTreeMap keys make iteration
/// (and serialization) order deterministic.
pub type GroupedExport = BTreeMap<String, BTreeMap<String, GroupEntry>>;

/// Slot label for the nth ISP within a country: `a`..`z`, then
/// spreadsheet-style `aa`, `ab`, ...
pub fn slot_label(index: usize) -> String {
    let mut label = String::new();
    let mut n = index + 1;
    while n > 0 {
        let rem = (n - 1) % 26;
        label.insert(0, (b'a' + rem as u8) as char);
        n = (n - 1) / 26;
    }
    label
}

/// Build the grouped hierarchy from the final alive set.
///
/// Countries iterate ascending; within a country, ISP names are sorted
/// ascending and assigned slot labels in that order. Proxy lists keep the
/// order of the flat table. Pure function of its input: the same alive set
/// always yields an identical structure.
pub fn build_grouped(alive: &[AliveProxy]) -> GroupedExport {
    let mut by_country: BTreeMap<String, BTreeMap<String, Vec<String>>> = BTreeMap::new();
    for proxy in alive {
        let country = proxy
            .country_code
            .clone()
            .unwrap_or_else(|| UNKNOWN_COUNTRY.to_string());
        let isp = proxy
            .isp
            .clone()
            .unwrap_or_else(|| UNKNOWN_ISP.to_string());
        by_country
            .entry(country)
            .or_default()
            .entry(isp)
            .or_default()
            .push(proxy.endpoint());
    }

    let mut grouped = GroupedExport::new();
    for (country, isps) in by_country {
        let mut slots = BTreeMap::new();
        for (index, (name, proxies)) in isps.into_iter().enumerate() {
            slots.insert(slot_label(index), GroupEntry { name, proxies });
        }
        grouped.insert(country, slots);
    }
    grouped
}

/// Render the grouped export as JSON with 2-space indentation
pub fn render_grouped(grouped: &GroupedExport) -> Result<String> {
    let mut json =
        serde_json::to_string_pretty(grouped).context("Failed to serialize grouped export")?;
    json.push('\n');
    Ok(json)
}

/// Write the grouped JSON document
pub fn write_grouped<P: AsRef<Path>>(path: P, grouped: &GroupedExport) -> Result<()> {
    let path = path.as_ref();
    fs::write(path, render_grouped(grouped)?)
        .with_context(|| format!("Failed to write grouped export {}", path.display()))?;
    Ok(())
}

/// Render the flat table: one `ip,port,countryCode,isp` row per record,
/// absent fields left empty.
pub fn render_flat(alive: &[AliveProxy]) -> String {
    let mut out = String::new();
    for proxy in alive {
        out.push_str(&format!(
            "{},{},{},{}\n",
            proxy.ip,
            proxy.port,
            proxy.country_code.as_deref().unwrap_or(""),
            proxy.isp.as_deref().unwrap_or("")
        ));
    }
    out
}

/// Atomically replace `path` with the flat table.
///
/// The content is written to a temporary file in the destination directory
/// and renamed over the target, so the original is never left partially
/// written; the temporary file is cleaned up on any failure.
pub fn write_flat<P: AsRef<Path>>(path: P, alive: &[AliveProxy]) -> Result<()> {
    let path = path.as_ref();
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };

    let mut tmp = NamedTempFile::new_in(dir)
        .with_context(|| format!("Failed to create temporary file in {}", dir.display()))?;
    tmp.write_all(render_flat(alive).as_bytes())
        .context("Failed to write flat output")?;
    tmp.persist(path)
        .map_err(|e| e.error)
        .with_context(|| format!("Failed to replace {}", path.display()))?;
    Ok(())
}

/// Write the error log, one message per line. A run with zero errors leaves
/// no log behind: any stale file from a previous run is removed so absence
/// always means "no errors".
pub fn write_error_log<P: AsRef<Path>>(path: P, errors: &[String]) -> Result<()> {
    let path = path.as_ref();
    if errors.is_empty() {
        match fs::remove_file(path) {
            Ok(()) => {}
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(e)
                    .with_context(|| format!("Failed to remove stale {}", path.display()));
            }
        }
        return Ok(());
    }

    let mut content = errors.join("\n");
    content.push('\n');
    fs::write(path, content)
        .with_context(|| format!("Failed to write error log {}", path.display()))?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alive(ip: &str, port: u16, country: Option<&str>, isp: Option<&str>) -> AliveProxy {
        AliveProxy {
            ip: ip.to_string(),
            port,
            country_code: country.map(String::from),
            isp: isp.map(String::from),
        }
    }

    #[test]
    fn test_slot_labels() {
        assert_eq!(slot_label(0), "a");
        assert_eq!(slot_label(1), "b");
        assert_eq!(slot_label(25), "z");
        assert_eq!(slot_label(26), "aa");
        assert_eq!(slot_label(27), "ab");
        assert_eq!(slot_label(51), "az");
        assert_eq!(slot_label(52), "ba");
    }

    #[test]
    fn test_grouping_by_country_then_isp() {
        let set = vec![
            alive("5.6.7.8", 443, Some("DE"), Some("Deutsche Telekom AG")),
            alive("1.2.3.4", 8080, Some("US"), Some("Cloudflare Inc")),
            alive("4.3.2.1", 80, Some("US"), Some("Akamai")),
        ];

        let grouped = build_grouped(&set);
        assert_eq!(
            grouped.keys().cloned().collect::<Vec<_>>(),
            vec!["DE", "US"]
        );

        let us = &grouped["US"];
        assert_eq!(us["a"].name, "Akamai");
        assert_eq!(us["b"].name, "Cloudflare Inc");
        assert_eq!(us["b"].proxies, vec!["1.2.3.4:8080"]);

        let de = &grouped["DE"];
        assert_eq!(de.len(), 1);
        assert_eq!(de["a"].name, "Deutsche Telekom AG");
        assert_eq!(de["a"].proxies, vec!["5.6.7.8:443"]);
    }

    #[test]
    fn test_grouping_unknown_buckets() {
        let set = vec![alive("1.2.3.4", 8080, None, None)];
        let grouped = build_grouped(&set);
        assert_eq!(grouped[UNKNOWN_COUNTRY]["a"].name, UNKNOWN_ISP);
    }

    #[test]
    fn test_grouping_completeness() {
        let set = vec![
            alive("1.2.3.4", 8080, Some("US"), Some("Cloudflare Inc")),
            alive("5.6.7.8", 443, Some("DE"), Some("Deutsche Telekom AG")),
            alive("9.9.9.9", 53, None, Some("Quad9")),
            alive("8.8.8.8", 53, Some("US"), None),
        ];

        let grouped = build_grouped(&set);
        let mut bucketed: Vec<String> = grouped
            .values()
            .flat_map(|slots| slots.values())
            .flat_map(|entry| entry.proxies.clone())
            .collect();
        bucketed.sort();

        let mut expected: Vec<String> = set.iter().map(AliveProxy::endpoint).collect();
        expected.sort();
        assert_eq!(bucketed, expected);
    }

    #[test]
    fn test_grouped_render_is_deterministic() {
        let set = vec![
            alive("1.2.3.4", 8080, Some("US"), Some("Cloudflare Inc")),
            alive("5.6.7.8", 443, Some("DE"), Some("Deutsche Telekom AG")),
        ];

        let first = render_grouped(&build_grouped(&set)).unwrap();
        let second = render_grouped(&build_grouped(&set)).unwrap();
        assert_eq!(first, second);
        assert!(first.contains("  \"DE\""));
    }

    #[test]
    fn test_render_flat_rows() {
        let set = vec![
            alive("1.2.3.4", 8080, Some("US"), Some("Cloudflare Inc")),
            alive("5.6.7.8", 443, None, None),
        ];

        assert_eq!(
            render_flat(&set),
            "1.2.3.4,8080,US,Cloudflare Inc\n5.6.7.8,443,,\n"
        );
    }

    #[test]
    fn test_write_flat_replaces_content() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("proxies.csv");
        fs::write(&path, "stale,content\n").unwrap();

        let set = vec![alive("1.2.3.4", 8080, Some("US"), Some("Cloudflare Inc"))];
        write_flat(&path, &set).unwrap();

        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "1.2.3.4,8080,US,Cloudflare Inc\n"
        );
        // No temp files left behind
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 1);
    }

    #[test]
    fn test_write_flat_missing_directory_fails() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("missing").join("proxies.csv");
        let set = vec![alive("1.2.3.4", 8080, None, None)];
        assert!(write_flat(&path, &set).is_err());
    }

    #[test]
    fn test_error_log_written_only_when_nonempty() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("error.txt");

        write_error_log(&path, &[]).unwrap();
        assert!(!path.exists());

        let errors = vec![
            "5.6.7.8:443 is DEAD".to_string(),
            "9.9.9.9:53: request timed out".to_string(),
        ];
        write_error_log(&path, &errors).unwrap();
        assert_eq!(
            fs::read_to_string(&path).unwrap(),
            "5.6.7.8:443 is DEAD\n9.9.9.9:53: request timed out\n"
        );

        // A later clean run removes the stale log
        write_error_log(&path, &[]).unwrap();
        assert!(!path.exists());
    }
}
