//! Run configuration for the check pipeline

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

/// Default number of verification calls in flight
pub const DEFAULT_WORKERS: usize = 10;

/// Default number of endpoints per batch request
pub const DEFAULT_BATCH_SIZE: usize = 50;

/// Default request timeout for verifier calls in seconds
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Default verification API URL template
pub const DEFAULT_API_URL: &str = "https://proxyip-check.vercel.app/{ip_port_list}";

/// Default path for the grouped JSON export
pub const DEFAULT_GROUPED_OUTPUT: &str = "alive_proxies_grouped.json";

/// Default path for the error log
pub const DEFAULT_ERROR_LOG: &str = "error.txt";

/// Verification dispatch granularity: one call per endpoint, or one call
/// per batch of endpoints.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Single,
    Batch,
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Granularity::Single => write!(f, "single"),
            Granularity::Batch => write!(f, "batch"),
        }
    }
}

/// Configuration for one pipeline run
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Input proxy list; also the destination of the refreshed list
    pub input_path: PathBuf,
    /// Verifier URL template with an `{ip_port_list}` (or `{}`) marker
    pub api_url_template: String,
    /// Number of verification calls in flight
    pub workers: usize,
    /// Endpoints per request in batch mode
    pub batch_size: usize,
    /// Dispatch granularity
    pub granularity: Granularity,
    /// Deduplicate and sort the alive set before export
    pub postprocess: bool,
    /// Path for the grouped JSON export
    pub grouped_output: PathBuf,
    /// Path for the error log
    pub error_log: PathBuf,
    /// Request timeout for each verifier call
    pub timeout: Duration,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            input_path: PathBuf::from("proxies.txt"),
            api_url_template: DEFAULT_API_URL.to_string(),
            workers: DEFAULT_WORKERS,
            batch_size: DEFAULT_BATCH_SIZE,
            granularity: Granularity::Batch,
            postprocess: true,
            grouped_output: PathBuf::from(DEFAULT_GROUPED_OUTPUT),
            error_log: PathBuf::from(DEFAULT_ERROR_LOG),
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        }
    }
}

impl RunConfig {
    pub fn new(input_path: PathBuf) -> Self {
        Self {
            input_path,
            ..Default::default()
        }
    }

    pub fn with_api_url(mut self, template: String) -> Self {
        self.api_url_template = template;
        self
    }

    pub fn with_workers(mut self, workers: usize) -> Self {
        self.workers = workers.max(1);
        self
    }

    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    pub fn with_granularity(mut self, granularity: Granularity) -> Self {
        self.granularity = granularity;
        self
    }

    pub fn with_postprocess(mut self, postprocess: bool) -> Self {
        self.postprocess = postprocess;
        self
    }

    pub fn with_grouped_output(mut self, path: PathBuf) -> Self {
        self.grouped_output = path;
        self
    }

    pub fn with_error_log(mut self, path: PathBuf) -> Self {
        self.error_log = path;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = RunConfig::default();
        assert_eq!(config.workers, DEFAULT_WORKERS);
        assert_eq!(config.batch_size, DEFAULT_BATCH_SIZE);
        assert_eq!(config.granularity, Granularity::Batch);
        assert!(config.postprocess);
        assert_eq!(config.timeout, Duration::from_secs(DEFAULT_TIMEOUT_SECS));
    }

    #[test]
    fn test_config_builder() {
        let config = RunConfig::new(PathBuf::from("list.csv"))
            .with_workers(4)
            .with_batch_size(25)
            .with_granularity(Granularity::Single)
            .with_postprocess(false)
            .with_timeout(Duration::from_secs(5));

        assert_eq!(config.input_path, PathBuf::from("list.csv"));
        assert_eq!(config.workers, 4);
        assert_eq!(config.batch_size, 25);
        assert_eq!(config.granularity, Granularity::Single);
        assert!(!config.postprocess);
    }

    #[test]
    fn test_config_clamps_zero_workers() {
        let config = RunConfig::default().with_workers(0).with_batch_size(0);
        assert_eq!(config.workers, 1);
        assert_eq!(config.batch_size, 1);
    }
}
