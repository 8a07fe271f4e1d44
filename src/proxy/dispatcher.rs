//! Bounded-concurrency dispatch of verification calls

use crate::config::{Granularity, DEFAULT_BATCH_SIZE, DEFAULT_WORKERS};
use crate::proxy::models::{CheckOutcome, CheckStatus, ProxyRecord};
use crate::proxy::verifier::VerifierClient;
use futures::stream::{self, StreamExt};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tracing::{info, warn};

/// Configuration for the dispatcher
#[derive(Debug, Clone)]
pub struct DispatcherConfig {
    /// Number of verification calls in flight
    pub workers: usize,
    /// Endpoints per request in batch mode
    pub batch_size: usize,
    /// Dispatch granularity
    pub granularity: Granularity,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            workers: DEFAULT_WORKERS,
            batch_size: DEFAULT_BATCH_SIZE,
            granularity: Granularity::Batch,
        }
    }
}

impl DispatcherConfig {
    pub fn new() -> Self {
        Self::default()
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
}

/// Fans verification calls out across a bounded worker pool and collects
/// one outcome per input record.
///
/// Completion order is arbitrary; outcomes are re-sorted to input order
/// before being returned so downstream classification is deterministic. A
/// failing call only ever maps to Error outcomes for its own records.
pub struct Dispatcher {
    verifier: Arc<VerifierClient>,
    config: DispatcherConfig,
}

impl Dispatcher {
    pub fn new(verifier: VerifierClient, config: DispatcherConfig) -> Self {
        Self {
            verifier: Arc::new(verifier),
            config,
        }
    }

    /// Check every record, returning exactly one outcome per record in
    /// input order.
    pub async fn run(&self, records: Vec<ProxyRecord>) -> Vec<CheckOutcome> {
        match self.config.granularity {
            Granularity::Single => self.run_single(records).await,
            Granularity::Batch => self.run_batch(records).await,
        }
    }

    async fn run_single(&self, records: Vec<ProxyRecord>) -> Vec<CheckOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.config.workers));

        let mut outcomes: Vec<(usize, CheckOutcome)> =
            stream::iter(records.into_iter().enumerate())
                .map(|(index, record)| {
                    let sem = Arc::clone(&semaphore);
                    let verifier = Arc::clone(&self.verifier);
                    async move {
                        // Acquire only fails if the semaphore is closed, which
                        // can't happen while we hold the Arc.
                        let _permit = sem.acquire().await.expect("Semaphore closed unexpectedly");
                        let outcome = verifier.check_endpoint(record).await;
                        log_progress(&outcome);
                        (index, outcome)
                    }
                })
                .buffer_unordered(self.config.workers)
                .collect()
                .await;

        outcomes.sort_by_key(|(index, _)| *index);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }

    async fn run_batch(&self, records: Vec<ProxyRecord>) -> Vec<CheckOutcome> {
        let semaphore = Arc::new(Semaphore::new(self.config.workers));
        let indexed: Vec<(usize, ProxyRecord)> = records.into_iter().enumerate().collect();
        let chunks: Vec<Vec<(usize, ProxyRecord)>> = indexed
            .chunks(self.config.batch_size)
            .map(<[_]>::to_vec)
            .collect();

        let mut outcomes: Vec<(usize, CheckOutcome)> = stream::iter(chunks)
            .map(|chunk| {
                let sem = Arc::clone(&semaphore);
                let verifier = Arc::clone(&self.verifier);
                async move {
                    let _permit = sem.acquire().await.expect("Semaphore closed unexpectedly");
                    let (indices, batch): (Vec<usize>, Vec<ProxyRecord>) =
                        chunk.into_iter().unzip();
                    let outcomes = verifier.check_batch(batch).await;
                    for outcome in &outcomes {
                        log_progress(outcome);
                    }
                    // check_batch returns one outcome per input, in order
                    indices.into_iter().zip(outcomes).collect::<Vec<_>>()
                }
            })
            .buffer_unordered(self.config.workers)
            .collect::<Vec<Vec<_>>>()
            .await
            .into_iter()
            .flatten()
            .collect();

        outcomes.sort_by_key(|(index, _)| *index);
        outcomes.into_iter().map(|(_, outcome)| outcome).collect()
    }
}

fn log_progress(outcome: &CheckOutcome) {
    match &outcome.status {
        CheckStatus::Alive => match outcome.latency_ms {
            Some(ms) => info!("{} is ALIVE ({}ms)", outcome.record, ms),
            None => info!("{} is ALIVE", outcome.record),
        },
        CheckStatus::Dead => info!("{} is DEAD", outcome.record),
        CheckStatus::Error(message) => warn!("check failed: {}", message),
    }
}
