//! End-to-end run: load records, dispatch checks, classify, write outputs

use crate::config::RunConfig;
use crate::proxy::classify::{classify, Classification};
use crate::proxy::dispatcher::{Dispatcher, DispatcherConfig};
use crate::proxy::export;
use crate::proxy::models::CheckStatus;
use crate::proxy::parser::RecordParser;
use crate::proxy::verifier::{VerifierClient, VerifierConfig};
use crate::Result;
use tracing::{error, info};

/// Counts reported after a completed run
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSummary {
    /// Records loaded from the input file
    pub total: usize,
    /// Alive proxies in the final (post-processed) set
    pub alive: usize,
    /// Endpoints the verifier classified as dead
    pub dead: usize,
    /// Endpoints whose check failed (transport, timeout, bad payload)
    pub errors: usize,
}

/// Run the full check pipeline.
///
/// A missing input file or a failure to rewrite it is fatal. The grouped
/// export and the error log are best-effort: once the refreshed list is
/// committed, their failures are reported but do not fail the run. Nothing
/// is written to disk before every outcome has been collected.
pub async fn run(config: &RunConfig) -> Result<RunSummary> {
    let records = RecordParser::parse_file(&config.input_path)?;
    info!(
        "loaded {} records from {}",
        records.len(),
        config.input_path.display()
    );
    let total = records.len();

    let verifier = VerifierClient::new(
        VerifierConfig::new(config.api_url_template.clone()).with_timeout(config.timeout),
    )?;
    let dispatcher = Dispatcher::new(
        verifier,
        DispatcherConfig::new()
            .with_workers(config.workers)
            .with_batch_size(config.batch_size)
            .with_granularity(config.granularity),
    );

    let outcomes = dispatcher.run(records).await;
    let dead = outcomes
        .iter()
        .filter(|o| o.status == CheckStatus::Dead)
        .count();
    let failed = outcomes
        .iter()
        .filter(|o| matches!(o.status, CheckStatus::Error(_)))
        .count();

    let Classification { alive, errors } = classify(outcomes, config.postprocess);

    export::write_flat(&config.input_path, &alive)?;
    info!(
        "refreshed {} with {} alive proxies",
        config.input_path.display(),
        alive.len()
    );

    let grouped = export::build_grouped(&alive);
    if let Err(e) = export::write_grouped(&config.grouped_output, &grouped) {
        error!("{:#}", e);
    }
    if let Err(e) = export::write_error_log(&config.error_log, &errors) {
        error!("{:#}", e);
    }

    Ok(RunSummary {
        total,
        alive: alive.len(),
        dead,
        errors: failed,
    })
}
