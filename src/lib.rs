//! Proxy Refresh - proxy liveness checking and list refreshing
//!
//! Checks a list of proxy endpoints against an external verification API
//! and rewrites the list with the proxies confirmed alive, alongside a
//! country/ISP-grouped JSON export and a plain-text error log.

pub mod config;
pub mod pipeline;
pub mod proxy;

pub use config::{Granularity, RunConfig};
pub use proxy::*;

/// Application result type
pub type Result<T> = anyhow::Result<T>;
