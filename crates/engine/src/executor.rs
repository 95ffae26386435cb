// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The bounded-concurrency batch executor every stage runs its work
//! through: per-run retry with backoff, progress reporting, and
//! cooperative cancellation against the shared shutdown predicate.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use rra_core::{ArchiverError, StageName};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

use crate::config::PipelineConfig;
use crate::shutdown::ShutdownController;

/// Emit a progress log every this many completions, in addition to one at
/// the end of the batch.
const PROGRESS_REPORT_INTERVAL: usize = 10;

/// The per-stage hooks the executor drives. `process` is called with up to
/// `run_process_retries + 1` attempts before a run is recorded as failed.
#[async_trait]
pub trait StageWorker: Send + Sync {
    fn stage_name(&self) -> StageName;
    async fn work_items(&self, incremental: bool) -> Result<Vec<u32>, ArchiverError>;
    async fn process(&self, run: u32) -> Result<(), ArchiverError>;
    fn state_path(&self) -> &Path;
    fn failure_log_path(&self) -> &Path;
}

/// The outcome of one batch invocation.
#[derive(Debug, Default, Clone)]
pub struct BatchReport {
    pub successful: Vec<u32>,
    pub failed: Vec<u32>,
    pub cancelled: usize,
}

impl BatchReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }
}

enum RunOutcome {
    Success,
    Failed,
    Cancelled,
}

async fn process_with_retry(worker: &dyn StageWorker, run: u32, retries: u32, delay: Duration) -> RunOutcome {
    let attempts = retries + 1;
    for attempt in 1..=attempts {
        match worker.process(run).await {
            Ok(()) => return RunOutcome::Success,
            Err(err) if err.is_permanent_skip() => {
                tracing::warn!(run, stage = %worker.stage_name(), error = %err, "permanent skip, aborting retries");
                return RunOutcome::Failed;
            }
            Err(err) => {
                tracing::warn!(run, stage = %worker.stage_name(), attempt, attempts, error = %err, "run attempt failed");
                if attempt < attempts {
                    tokio::time::sleep(delay).await;
                }
            }
        }
    }
    tracing::error!(run, stage = %worker.stage_name(), attempts, "run failed after exhausting retries");
    RunOutcome::Failed
}

/// Runs `runs` (already deduplicated) with bounded concurrency and per-run
/// retry, without touching the state file or failure log. Callers that need
/// the normal batch finalization should use [`run_batch`]; recovery paths
/// call this directly so they can apply their own finalization rules.
pub async fn execute_runs(
    worker: Arc<dyn StageWorker>,
    mut runs: Vec<u32>,
    incremental: bool,
    config: &PipelineConfig,
    shutdown: &Arc<ShutdownController>,
) -> BatchReport {
    let cap = config.batch_cap(incremental);
    if runs.len() > cap {
        tracing::info!(stage = %worker.stage_name(), candidates = runs.len(), cap, "truncating batch to cap");
        runs.truncate(cap);
    }
    let total = runs.len();

    let semaphore = Arc::new(Semaphore::new(config.parallel_workers.max(1)));
    let mut joinset: JoinSet<(u32, RunOutcome)> = JoinSet::new();

    for run in runs {
        let worker = Arc::clone(&worker);
        let semaphore = Arc::clone(&semaphore);
        let shutdown = Arc::clone(shutdown);
        let retries = config.run_process_retries;
        let delay = config.retry_delay;
        joinset.spawn(async move {
            if shutdown.is_shutdown_requested() {
                return (run, RunOutcome::Cancelled);
            }
            let Ok(_permit) = semaphore.acquire_owned().await else {
                return (run, RunOutcome::Cancelled);
            };
            if shutdown.is_shutdown_requested() {
                return (run, RunOutcome::Cancelled);
            }
            let outcome = process_with_retry(worker.as_ref(), run, retries, delay).await;
            (run, outcome)
        });
    }

    let mut successful = Vec::new();
    let mut failed = Vec::new();
    let mut cancelled = 0usize;
    let mut completed = 0usize;

    while let Some(joined) = joinset.join_next().await {
        match joined {
            Ok((run, RunOutcome::Success)) => successful.push(run),
            Ok((run, RunOutcome::Failed)) => failed.push(run),
            Ok((_, RunOutcome::Cancelled)) => cancelled += 1,
            Err(join_err) if join_err.is_cancelled() => cancelled += 1,
            Err(join_err) => tracing::error!(error = %join_err, stage = %worker.stage_name(), "stage task panicked"),
        }
        completed += 1;
        if completed % PROGRESS_REPORT_INTERVAL == 0 || completed == total {
            tracing::info!(
                stage = %worker.stage_name(),
                completed,
                total,
                successful = successful.len(),
                failed = failed.len(),
                "batch progress"
            );
        }
    }

    BatchReport { successful, failed, cancelled }
}

/// Runs a normal batch: execute, then persist the result to the stage's
/// state file and failure log.
pub async fn run_batch(
    worker: Arc<dyn StageWorker>,
    runs: Vec<u32>,
    incremental: bool,
    config: &PipelineConfig,
    shutdown: &Arc<ShutdownController>,
) -> BatchReport {
    let report = execute_runs(Arc::clone(&worker), runs, incremental, config, shutdown).await;

    rra_storage::append_to_failure_log(worker.failure_log_path(), &report.failed);
    rra_storage::update_contiguous_run_state(worker.state_path(), &report.successful);

    let mut attempted = report.successful.clone();
    attempted.extend(&report.failed);
    rra_storage::update_attempted_run_state(worker.state_path(), &attempted);

    tracing::info!(
        stage = %worker.stage_name(),
        successful = report.successful.len(),
        failed = report.failed.len(),
        cancelled = report.cancelled,
        "batch complete"
    );

    report
}

#[cfg(test)]
#[path = "executor_tests.rs"]
mod tests;
