// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Import stage: reconciles the filesystem run-records tree against
//! artdaqDB and archives whatever the filesystem has that artdaqDB
//! doesn't.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use rra_adapters::{ArtdaqDbClient, RunPreparer};
use rra_core::{ArchiverError, StageName};

use crate::config::PipelineConfig;
use crate::executor::{execute_runs, BatchReport, StageWorker};
use crate::fs_source::list_fs_runs;
use crate::shutdown::ShutdownController;

pub struct ImportStage<A, P> {
    artdaq: Arc<A>,
    preparer: Arc<P>,
    run_records_dir: PathBuf,
    scratch_root: PathBuf,
    state_path: PathBuf,
    failure_log_path: PathBuf,
    recovery: bool,
}

impl<A, P> ImportStage<A, P>
where
    A: ArtdaqDbClient,
    P: RunPreparer,
{
    pub fn new(artdaq: Arc<A>, preparer: Arc<P>, config: &PipelineConfig) -> Self {
        ImportStage {
            artdaq,
            preparer,
            run_records_dir: config.run_records_dir.clone(),
            scratch_root: config.scratch_root.clone(),
            state_path: config.import_state_path.clone(),
            failure_log_path: config.import_failure_log_path.clone(),
            recovery: false,
        }
    }

    /// Marks this stage as driving `--retry-failed-import` rather than a
    /// normal batch, so its diagnostics report under `StageName::ImportRecovery`.
    pub fn as_recovery(mut self) -> Self {
        self.recovery = true;
        self
    }

    fn scratch_dir_for(&self, run: u32) -> PathBuf {
        self.scratch_root.join(format!("import-{run}"))
    }

    async fn process_inner(&self, run: u32, source_dir: &Path, scratch: &Path) -> Result<(), ArchiverError> {
        let config_name = self.preparer.prepare_for_archive(run, source_dir, scratch).await?;
        self.artdaq.archive_run(run, &config_name, scratch, false).await?;

        let _ = std::fs::remove_dir_all(scratch);
        let has_update = self.preparer.prepare_for_update(run, source_dir, scratch).await?;
        if has_update {
            self.artdaq.archive_run(run, &config_name, scratch, true).await?;
        }
        Ok(())
    }

    /// Splits the current import failure log into runs already archived out
    /// of band (silently dropped) and runs still missing, retries the
    /// latter, and rewrites the log to whatever remains failed. Afterward,
    /// `last_contiguous_run` is recomputed against the current, complete
    /// `artdaq_runs` set rather than merely advanced.
    pub async fn run_failure_recovery(self: &Arc<Self>, config: &PipelineConfig, shutdown: &Arc<ShutdownController>) -> BatchReport {
        let previously_failed = rra_storage::parse_run_records_from_file(&self.failure_log_path);
        let artdaq_runs = match self.artdaq.get_archived_runs().await {
            Ok(runs) => runs,
            Err(err) => {
                tracing::error!(error = %err, "import failure recovery could not query artdaqDB");
                return BatchReport::default();
            }
        };

        let already_archived: BTreeSet<u32> = previously_failed.iter().copied().filter(|r| artdaq_runs.contains(r)).collect();
        let to_retry: Vec<u32> = previously_failed.iter().copied().filter(|r| !artdaq_runs.contains(r)).collect();

        let worker: Arc<dyn StageWorker> = Arc::clone(self) as Arc<dyn StageWorker>;
        let report = execute_runs(worker, to_retry, false, config, shutdown).await;

        let remaining: Vec<u32> = previously_failed
            .iter()
            .copied()
            .filter(|r| !report.successful.contains(r) && !already_archived.contains(r))
            .collect();
        rra_storage::write_failure_log(&self.failure_log_path, &remaining);

        let mut current_archived = artdaq_runs;
        current_archived.extend(&report.successful);
        rra_storage::recompute_contiguous_run_state(&self.state_path, &current_archived);

        report
    }
}

#[async_trait]
impl<A, P> StageWorker for ImportStage<A, P>
where
    A: ArtdaqDbClient,
    P: RunPreparer,
{
    fn stage_name(&self) -> StageName {
        if self.recovery {
            StageName::ImportRecovery
        } else {
            StageName::Import
        }
    }

    async fn work_items(&self, incremental: bool) -> Result<Vec<u32>, ArchiverError> {
        let fs_runs = list_fs_runs(&self.run_records_dir, StageName::Import)?;
        let artdaq_runs = self.artdaq.get_archived_runs().await?;
        let mut candidates: Vec<u32> = fs_runs.difference(&artdaq_runs).copied().collect();
        candidates.sort_unstable();
        if incremental {
            let start = rra_storage::get_incremental_start_run(&self.state_path);
            candidates.retain(|&r| r > start);
        }
        Ok(candidates)
    }

    async fn process(&self, run: u32) -> Result<(), ArchiverError> {
        let source_dir = self.run_records_dir.join(run.to_string());
        let scratch = self.scratch_dir_for(run);
        let result = self.process_inner(run, &source_dir, &scratch).await;
        let _ = std::fs::remove_dir_all(&scratch);
        result
    }

    fn state_path(&self) -> &Path {
        &self.state_path
    }

    fn failure_log_path(&self) -> &Path {
        &self.failure_log_path
    }
}

#[cfg(test)]
#[path = "import_tests.rs"]
mod tests;
