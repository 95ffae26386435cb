// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Migrate stage: reconciles artdaqDB against UconDB, packing each run's
//! exported configuration into a blob, uploading it, and verifying the
//! upload by fetching it back and comparing checksums.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use md5::{Digest, Md5};
use rra_adapters::{ArtdaqDbClient, CarbonClient, UconDbClient, UploadOutcome};
use rra_core::{pack, ArchiverError, BlobFile, StageName};

use crate::config::PipelineConfig;
use crate::executor::{BatchReport, StageWorker};
use crate::validator::{validate_blob, ValidatorReport};

pub struct MigrateStage<A, U> {
    artdaq: Arc<A>,
    ucondb: Arc<U>,
    carbon: Arc<CarbonClient>,
    scratch_root: PathBuf,
    state_path: PathBuf,
    failure_log_path: PathBuf,
    validate: bool,
    validator_params: Vec<(String, String)>,
    recovery: bool,
}

impl<A, U> MigrateStage<A, U>
where
    A: ArtdaqDbClient,
    U: UconDbClient,
{
    pub fn new(artdaq: Arc<A>, ucondb: Arc<U>, carbon: Arc<CarbonClient>, config: &PipelineConfig) -> Self {
        MigrateStage {
            artdaq,
            ucondb,
            carbon,
            scratch_root: config.scratch_root.clone(),
            state_path: config.migrate_state_path.clone(),
            failure_log_path: config.migrate_failure_log_path.clone(),
            validate: config.validate,
            validator_params: config.validator_params.clone(),
            recovery: false,
        }
    }

    /// Marks this stage as driving `--retry-failed-migrate` rather than a
    /// normal batch, so its diagnostics report under `StageName::MigrationRecovery`.
    pub fn as_recovery(mut self) -> Self {
        self.recovery = true;
        self
    }

    fn scratch_dir_for(&self, run: u32) -> PathBuf {
        self.scratch_root.join(format!("migrate-{run}"))
    }

    async fn process_inner(&self, run: u32, scratch: &Path) -> Result<(), ArchiverError> {
        self.artdaq.export_run_configuration(run, scratch).await?;

        let files = read_exported_files(run, scratch)?;
        let generated_blob = pack(run, Utc::now(), &files);

        let outcome = self.ucondb.upload_blob(run, &generated_blob).await?;
        if outcome == UploadOutcome::AlreadyExists {
            tracing::info!(run, "blob already present in UconDB, treating upload as success");
        }

        let downloaded_blob = self.ucondb.get_data(run).await?;
        verify_checksum(run, &generated_blob, &downloaded_blob)?;

        if self.validate {
            match validate_blob(&downloaded_blob, &self.validator_params) {
                Ok(report) => {
                    if report.has_errors() {
                        tracing::warn!(run, errors = ?report.errors, "blob validation reported errors");
                    }
                }
                Err(err) => tracing::warn!(run, error = %err, "blob validator failed to run"),
            }
        }

        Ok(())
    }

    /// Splits the current migrate failure log into runs already uploaded out
    /// of band (silently dropped) and runs still missing from UconDB,
    /// retries the latter, and rewrites the log to whatever remains failed.
    /// `last_contiguous_run` is then recomputed against the current,
    /// complete `ucon_runs` set rather than merely advanced.
    pub async fn run_failure_recovery(self: &Arc<Self>, config: &PipelineConfig, shutdown: &Arc<crate::shutdown::ShutdownController>) -> BatchReport {
        let previously_failed = rra_storage::parse_run_records_from_file(&self.failure_log_path);
        let ucon_runs = match self.ucondb.get_existing_runs().await {
            Ok(runs) => runs,
            Err(err) => {
                tracing::error!(error = %err, "migrate failure recovery could not query UconDB");
                return BatchReport::default();
            }
        };

        let already_uploaded: BTreeSet<u32> = previously_failed.iter().copied().filter(|r| ucon_runs.contains(r)).collect();
        let to_retry: Vec<u32> = previously_failed.iter().copied().filter(|r| !ucon_runs.contains(r)).collect();

        let worker: Arc<dyn StageWorker> = Arc::clone(self) as Arc<dyn StageWorker>;
        let report = crate::executor::execute_runs(worker, to_retry, false, config, shutdown).await;

        let remaining: Vec<u32> = previously_failed
            .iter()
            .copied()
            .filter(|r| !report.successful.contains(r) && !already_uploaded.contains(r))
            .collect();
        rra_storage::write_failure_log(&self.failure_log_path, &remaining);

        let mut current_uploaded = ucon_runs;
        current_uploaded.extend(&report.successful);
        rra_storage::recompute_contiguous_run_state(&self.state_path, &current_uploaded);

        report
    }

    /// Publishes batch-level counters to Carbon; a no-op if the sink is
    /// disabled. Never fails the caller.
    pub fn publish_metrics(&self, report: &BatchReport) {
        let now = Utc::now().timestamp();
        self.carbon.post_metric("runs_processed", (report.successful.len() + report.failed.len()) as f64, now);
        self.carbon.post_metric("runs_successful", report.successful.len() as f64, now);
        self.carbon.post_metric("runs_failed", report.failed.len() as f64, now);
        if let Some(&last) = report.successful.iter().max() {
            self.carbon.post_metric("last_successful_run", last as f64, now);
        }
    }
}

#[async_trait]
impl<A, U> StageWorker for MigrateStage<A, U>
where
    A: ArtdaqDbClient,
    U: UconDbClient,
{
    fn stage_name(&self) -> StageName {
        if self.recovery {
            StageName::MigrationRecovery
        } else {
            StageName::Migration
        }
    }

    async fn work_items(&self, incremental: bool) -> Result<Vec<u32>, ArchiverError> {
        let artdaq_runs = self.artdaq.get_archived_runs().await?;
        let ucon_runs = self.ucondb.get_existing_runs().await?;
        let mut candidates: Vec<u32> = artdaq_runs.difference(&ucon_runs).copied().collect();
        candidates.sort_unstable();
        if incremental {
            let start = rra_storage::get_incremental_start_run(&self.state_path);
            candidates.retain(|&r| r > start);
        }
        Ok(candidates)
    }

    async fn process(&self, run: u32) -> Result<(), ArchiverError> {
        let scratch = self.scratch_dir_for(run);
        let result = self.process_inner(run, &scratch).await;
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

fn read_exported_files(run: u32, scratch: &Path) -> Result<Vec<BlobFile>, ArchiverError> {
    let entries = std::fs::read_dir(scratch).map_err(|err| {
        ArchiverError::retriable(Some(StageName::Migration), Some(run), format!("could not read exported configuration: {err}"))
    })?;
    let mut files = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|err| {
            ArchiverError::retriable(Some(StageName::Migration), Some(run), format!("could not read directory entry: {err}"))
        })?;
        if !entry.file_type().map(|t| t.is_file()).unwrap_or(false) {
            continue;
        }
        let name = entry.file_name().to_string_lossy().into_owned();
        let content = std::fs::read(entry.path()).map_err(|err| {
            ArchiverError::retriable(Some(StageName::Migration), Some(run), format!("could not read exported file '{name}': {err}"))
        })?;
        files.push(BlobFile::new(name, content));
    }
    Ok(files)
}

fn md5_hex(content: &str) -> String {
    let mut hasher = Md5::new();
    hasher.update(content.as_bytes());
    hasher.finalize().iter().map(|b| format!("{b:02x}")).collect()
}

fn verify_checksum(run: u32, generated: &str, downloaded: &str) -> Result<(), ArchiverError> {
    let generated_md5 = md5_hex(generated);
    let downloaded_md5 = md5_hex(downloaded);
    if generated_md5 != downloaded_md5 {
        return Err(ArchiverError::retriable(
            Some(StageName::Migration),
            Some(run),
            format!("uploaded blob checksum mismatch on fetch-back: generated={generated_md5} downloaded={downloaded_md5}"),
        ));
    }
    Ok(())
}

#[cfg(test)]
#[path = "migrate_tests.rs"]
mod tests;
