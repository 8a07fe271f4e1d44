//! Proxy checking pipeline modules
//!
//! This module provides functionality for:
//! - Parsing and normalizing raw proxy records (delimited or JSON lines)
//! - Verifying endpoints against the external verification API
//! - Dispatching checks across a bounded worker pool
//! - Classifying, deduplicating and exporting the results

pub mod classify;
pub mod dispatcher;
pub mod export;
pub mod models;
pub mod parser;
pub mod verifier;

pub use classify::{classify, Classification};
pub use dispatcher::{Dispatcher, DispatcherConfig};
pub use export::{build_grouped, GroupEntry, GroupedExport};
pub use models::{AliveProxy, CheckOutcome, CheckStatus, ProxyRecord};
pub use parser::RecordParser;
pub use verifier::{VerifierClient, VerifierConfig};
