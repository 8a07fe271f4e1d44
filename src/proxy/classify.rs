//! Classification, deduplication and ordering of check outcomes

use crate::proxy::models::{AliveProxy, CheckOutcome, CheckStatus};
use crate::proxy::parser::RecordParser;
use std::collections::HashSet;
use std::net::Ipv4Addr;
use tracing::warn;

/// Outcome partition: confirmed-alive proxies and error-log lines
#[derive(Debug, Default)]
pub struct Classification {
    pub alive: Vec<AliveProxy>,
    pub errors: Vec<String>,
}

/// Partition outcomes into alive proxies and error-log lines.
///
/// Outcomes are expected in input-record order (the dispatcher guarantees
/// this), which makes first-seen deduplication deterministic. With
/// `postprocess` off, alive records pass through as-is: duplicates
/// retained, input order kept.
pub fn classify(outcomes: Vec<CheckOutcome>, postprocess: bool) -> Classification {
    let mut alive = Vec::new();
    let mut errors = Vec::new();

    for outcome in outcomes {
        match &outcome.status {
            CheckStatus::Alive => {
                let mut proxy = AliveProxy::from_outcome(&outcome);
                // Verifier-resolved names get the same cleanup as input ones
                // so grouped export keys stay consistent.
                proxy.isp = proxy.isp.as_deref().and_then(RecordParser::normalize_isp);
                alive.push(proxy);
            }
            CheckStatus::Dead => errors.push(format!("{} is DEAD", outcome.record)),
            CheckStatus::Error(message) => errors.push(message.clone()),
        }
    }

    if postprocess {
        alive = sort_alive(dedupe(alive));
    }

    Classification { alive, errors }
}

/// Keep only the first-seen entry per (ip, port) key
fn dedupe(alive: Vec<AliveProxy>) -> Vec<AliveProxy> {
    let mut seen = HashSet::new();
    alive
        .into_iter()
        .filter(|proxy| seen.insert(proxy.key()))
        .collect()
}

/// Order by the IPv4 address compared as four numeric octets, port as the
/// tie-break. Entries whose IP does not parse are reported and placed after
/// all well-formed entries, keeping their own relative order.
fn sort_alive(alive: Vec<AliveProxy>) -> Vec<AliveProxy> {
    let mut valid: Vec<(Ipv4Addr, AliveProxy)> = Vec::new();
    let mut malformed: Vec<AliveProxy> = Vec::new();

    for proxy in alive {
        match proxy.ip.parse::<Ipv4Addr>() {
            Ok(addr) => valid.push((addr, proxy)),
            Err(_) => {
                warn!(
                    "malformed IP {:?}, ordering it after valid entries",
                    proxy.ip
                );
                malformed.push(proxy);
            }
        }
    }

    valid.sort_by_key(|(addr, proxy)| (*addr, proxy.port));
    valid
        .into_iter()
        .map(|(_, proxy)| proxy)
        .chain(malformed)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::proxy::models::ProxyRecord;

    fn alive_outcome(ip: &str, port: u16) -> CheckOutcome {
        CheckOutcome::alive(ProxyRecord::new(ip.to_string(), port), None, None, None)
    }

    #[test]
    fn test_partition_alive_dead_error() {
        let outcomes = vec![
            alive_outcome("1.2.3.4", 8080),
            CheckOutcome::dead(ProxyRecord::new("5.6.7.8".to_string(), 443)),
            CheckOutcome::error(
                ProxyRecord::new("9.9.9.9".to_string(), 53),
                "9.9.9.9:53: request timed out".to_string(),
            ),
        ];

        let classification = classify(outcomes, true);
        assert_eq!(classification.alive.len(), 1);
        assert_eq!(classification.alive[0].endpoint(), "1.2.3.4:8080");
        assert_eq!(
            classification.errors,
            vec![
                "5.6.7.8:443 is DEAD".to_string(),
                "9.9.9.9:53: request timed out".to_string(),
            ]
        );
    }

    #[test]
    fn test_dedup_keeps_first_seen() {
        let first = CheckOutcome::alive(
            ProxyRecord::new("1.2.3.4".to_string(), 8080),
            None,
            Some("US".to_string()),
            None,
        );
        let second = CheckOutcome::alive(
            ProxyRecord::new("1.2.3.4".to_string(), 8080),
            None,
            Some("DE".to_string()),
            None,
        );

        let classification = classify(vec![first, second], true);
        assert_eq!(classification.alive.len(), 1);
        assert_eq!(classification.alive[0].country_code.as_deref(), Some("US"));
    }

    #[test]
    fn test_numeric_octet_sort() {
        let outcomes = vec![
            alive_outcome("10.0.0.1", 80),
            alive_outcome("9.0.0.1", 80),
            alive_outcome("2.30.0.1", 80),
            alive_outcome("2.4.0.1", 80),
        ];

        let classification = classify(outcomes, true);
        let order: Vec<String> = classification.alive.iter().map(|p| p.ip.clone()).collect();
        assert_eq!(order, vec!["2.4.0.1", "2.30.0.1", "9.0.0.1", "10.0.0.1"]);
    }

    #[test]
    fn test_port_tie_break() {
        let outcomes = vec![
            alive_outcome("1.2.3.4", 9090),
            alive_outcome("1.2.3.4", 80),
        ];

        let classification = classify(outcomes, true);
        let ports: Vec<u16> = classification.alive.iter().map(|p| p.port).collect();
        assert_eq!(ports, vec![80, 9090]);
    }

    #[test]
    fn test_malformed_ips_ordered_last() {
        let outcomes = vec![
            alive_outcome("not-an-ip", 80),
            alive_outcome("9.0.0.1", 80),
            alive_outcome("300.1.1.1", 80),
            alive_outcome("1.0.0.1", 80),
        ];

        let classification = classify(outcomes, true);
        let order: Vec<String> = classification.alive.iter().map(|p| p.ip.clone()).collect();
        assert_eq!(order, vec!["1.0.0.1", "9.0.0.1", "not-an-ip", "300.1.1.1"]);
    }

    #[test]
    fn test_postprocess_off_keeps_duplicates_and_order() {
        let outcomes = vec![
            alive_outcome("10.0.0.1", 80),
            alive_outcome("9.0.0.1", 80),
            alive_outcome("10.0.0.1", 80),
        ];

        let classification = classify(outcomes, false);
        let order: Vec<String> = classification.alive.iter().map(|p| p.ip.clone()).collect();
        assert_eq!(order, vec!["10.0.0.1", "9.0.0.1", "10.0.0.1"]);
    }

    #[test]
    fn test_resolved_isp_is_normalized() {
        let outcome = CheckOutcome::alive(
            ProxyRecord::new("1.2.3.4".to_string(), 8080),
            None,
            None,
            Some("Cloudflare, Inc.".to_string()),
        );

        let classification = classify(vec![outcome], true);
        assert_eq!(
            classification.alive[0].isp.as_deref(),
            Some("Cloudflare Inc")
        );
    }
}
