use anyhow::{anyhow, Result};
use clap::Parser;
use proxy_refresh::config::{
    DEFAULT_API_URL, DEFAULT_BATCH_SIZE, DEFAULT_ERROR_LOG, DEFAULT_GROUPED_OUTPUT,
    DEFAULT_TIMEOUT_SECS, DEFAULT_WORKERS,
};
use proxy_refresh::{pipeline, Granularity, RunConfig};
use std::path::PathBuf;
use std::time::Duration;

/// Checks proxy liveness against a verification API and refreshes the list
#[derive(Parser)]
#[command(name = "proxy-refresh")]
#[command(about = "Checks proxy liveness against a verification API and refreshes the proxy list")]
struct Cli {
    /// Input proxy list; rewritten in place with the alive records
    #[arg(short, long, env = "IP_FILE")]
    input: PathBuf,

    /// Verifier URL template with an {ip_port_list} marker
    #[arg(long, env = "API_URL", default_value = DEFAULT_API_URL)]
    api_url: String,

    /// Number of verification calls in flight
    #[arg(short = 'n', long, default_value_t = DEFAULT_WORKERS)]
    workers: usize,

    /// Endpoints per request in batch mode
    #[arg(long, default_value_t = DEFAULT_BATCH_SIZE)]
    batch_size: usize,

    /// Verification granularity (single, batch)
    #[arg(short, long, default_value = "batch")]
    granularity: String,

    /// Keep the raw alive order: skip deduplication and sorting
    #[arg(long)]
    no_postprocess: bool,

    /// Output path for the grouped JSON export
    #[arg(long, default_value = DEFAULT_GROUPED_OUTPUT)]
    grouped_output: PathBuf,

    /// Output path for the error log
    #[arg(long, default_value = DEFAULT_ERROR_LOG)]
    error_log: PathBuf,

    /// Request timeout in seconds for each verifier call
    #[arg(long, default_value_t = DEFAULT_TIMEOUT_SECS)]
    timeout: u64,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let cli = Cli::parse();
    let granularity = parse_granularity(&cli.granularity)?;

    let config = RunConfig::new(cli.input)
        .with_api_url(cli.api_url)
        .with_workers(cli.workers)
        .with_batch_size(cli.batch_size)
        .with_granularity(granularity)
        .with_postprocess(!cli.no_postprocess)
        .with_grouped_output(cli.grouped_output)
        .with_error_log(cli.error_log)
        .with_timeout(Duration::from_secs(cli.timeout));

    let summary = pipeline::run(&config).await?;

    println!(
        "Checked {} proxies: {} alive, {} dead, {} errors",
        summary.total, summary.alive, summary.dead, summary.errors
    );
    println!(
        "{} has been refreshed with the alive proxies.",
        config.input_path.display()
    );
    if summary.dead + summary.errors > 0 {
        println!("Failures were logged to {}.", config.error_log.display());
    }

    Ok(())
}

fn parse_granularity(s: &str) -> Result<Granularity> {
    match s.to_lowercase().as_str() {
        "single" => Ok(Granularity::Single),
        "batch" => Ok(Granularity::Batch),
        _ => Err(anyhow!("Invalid granularity: {}. Use: single, batch", s)),
    }
}
