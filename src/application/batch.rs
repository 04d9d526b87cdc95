// Bounded fan-out of independent lineup requests
//
// Each request owns its pool and config, so workers share nothing but the
// optimizer itself. Solves are CPU-bound and run on the blocking pool.

use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::stream::{self, StreamExt};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tracing::{debug, info};

use super::lineup_service::LineupOptimizer;
use crate::domain::{LineupConfig, LineupError, OptimizationOutcome, PlayerRecord};

/// One independent lineup request
#[derive(Debug, Clone)]
pub struct LineupRequest {
    pub label: String,
    pub pool: Arc<Vec<PlayerRecord>>,
    pub config: LineupConfig,
}

impl LineupRequest {
    pub fn new(label: impl Into<String>, pool: Arc<Vec<PlayerRecord>>, config: LineupConfig) -> Self {
        Self {
            label: label.into(),
            pool,
            config,
        }
    }
}

#[derive(Debug)]
pub struct BatchResult {
    /// Position of the request in the submitted batch
    pub index: usize,
    pub label: String,
    pub result: Result<OptimizationOutcome, LineupError>,
    pub elapsed: Duration,
}

/// Runs lineup requests concurrently on at most `concurrency` blocking workers.
#[derive(Clone)]
pub struct BatchRunner {
    optimizer: Arc<LineupOptimizer>,
    concurrency: usize,
    request_timeout: Option<Duration>,
}

impl BatchRunner {
    /// Runner sized to the machine's available parallelism.
    pub fn new(optimizer: LineupOptimizer) -> Self {
        let concurrency = std::thread::available_parallelism()
            .map(|n| n.get())
            .unwrap_or(4);
        Self {
            optimizer: Arc::new(optimizer),
            concurrency,
            request_timeout: None,
        }
    }

    pub fn with_concurrency(mut self, concurrency: usize) -> Self {
        self.concurrency = concurrency.max(1);
        self
    }

    /// Per-request budget; becomes the solve deadline of each request.
    pub fn with_request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = Some(timeout);
        self
    }

    pub fn concurrency(&self) -> usize {
        self.concurrency
    }

    /// Solve every request and return the results in request order.
    pub async fn run(&self, requests: Vec<LineupRequest>) -> Vec<BatchResult> {
        let started = Instant::now();
        let total = requests.len();
        info!(event = "batch_start", requests = total, concurrency = self.concurrency);

        let mut results: Vec<BatchResult> = stream::iter(requests.into_iter().enumerate())
            .map(|(index, request)| {
                solve_one(Arc::clone(&self.optimizer), self.request_timeout, index, request)
            })
            .buffer_unordered(self.concurrency)
            .collect()
            .await;
        results.sort_by_key(|r| r.index);

        let solved = results
            .iter()
            .filter(|r| r.result.as_ref().is_ok_and(OptimizationOutcome::is_success))
            .count();
        info!(
            event = "batch_done",
            requests = total,
            solved,
            elapsed_ms = started.elapsed().as_millis() as u64
        );
        results
    }

    /// Solve every request, yielding results as they complete.
    ///
    /// Must be called from within a Tokio runtime. Dropping the stream stops
    /// new requests from being started.
    pub fn stream(&self, requests: Vec<LineupRequest>) -> ReceiverStream<BatchResult> {
        let (tx, rx) = mpsc::channel(self.concurrency);
        let runner = self.clone();

        tokio::spawn(async move {
            let mut pending = stream::iter(requests.into_iter().enumerate())
                .map(|(index, request)| {
                    solve_one(Arc::clone(&runner.optimizer), runner.request_timeout, index, request)
                })
                .buffer_unordered(runner.concurrency);

            while let Some(result) = pending.next().await {
                if tx.send(result).await.is_err() {
                    debug!(event = "batch_stream_closed");
                    break;
                }
            }
        });

        ReceiverStream::new(rx)
    }
}

/// Requests that differ only by heuristic seed, labelled `{prefix}-{seed}`.
pub fn seeded_requests(
    prefix: &str,
    pool: Arc<Vec<PlayerRecord>>,
    config: &LineupConfig,
    seeds: impl IntoIterator<Item = u64>,
) -> Vec<LineupRequest> {
    seeds
        .into_iter()
        .map(|seed| {
            LineupRequest::new(
                format!("{}-{}", prefix, seed),
                Arc::clone(&pool),
                config.clone().with_seed(seed),
            )
        })
        .collect()
}

async fn solve_one(
    optimizer: Arc<LineupOptimizer>,
    timeout: Option<Duration>,
    index: usize,
    request: LineupRequest,
) -> BatchResult {
    let started = Instant::now();
    let LineupRequest { label, pool, config } = request;

    let joined = tokio::task::spawn_blocking(move || match timeout {
        Some(budget) => optimizer.optimize_until(&pool, &config, started + budget),
        None => optimizer.optimize(&pool, &config),
    })
    .await;

    let result = joined.unwrap_or_else(|e| Err(LineupError::Cancelled(e.to_string())));
    BatchResult {
        index,
        label,
        result,
        elapsed: started.elapsed(),
    }
}
