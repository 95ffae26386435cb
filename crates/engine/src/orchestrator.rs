// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Orchestrator: holds every client and stage, selects which stages a given
//! invocation runs, and fans the shutdown predicate and `incremental` flag
//! into them.

use std::sync::Arc;

use rra_adapters::{ArtdaqDbClient, CarbonClient, RunPreparer, UconDbClient};
use rra_core::{ArchiverError, StageName};

use crate::config::PipelineConfig;
use crate::executor::{run_batch, BatchReport, StageWorker};
use crate::import::ImportStage;
use crate::migrate::MigrateStage;
use crate::recovery::{recover_import_state, recover_migrate_state, RecoveryReport};
use crate::reporter::{Reporter, StatusReport};
use crate::shutdown::ShutdownController;

/// The mode selected by the CLI's mutually exclusive flags (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Full,
    ImportOnly,
    MigrateOnly,
    RetryFailedImport,
    RetryFailedMigrate,
    ReportStatus,
    CompareState,
    RecoverImportState,
    RecoverMigrateState,
}

/// The outcome of one orchestrator invocation, covering every mode.
#[derive(Debug, Default)]
pub enum RunOutcome {
    #[default]
    Nothing,
    Batch(Vec<BatchReport>),
    Status(StatusReport),
    Recovery(RecoveryReport),
}

pub struct Orchestrator<A, U, P> {
    artdaq: Arc<A>,
    ucondb: Arc<U>,
    preparer: Arc<P>,
    carbon: Arc<CarbonClient>,
    config: PipelineConfig,
    shutdown: Arc<ShutdownController>,
}

impl<A, U, P> Orchestrator<A, U, P>
where
    A: ArtdaqDbClient,
    U: UconDbClient,
    P: RunPreparer,
{
    pub fn new(artdaq: Arc<A>, ucondb: Arc<U>, preparer: Arc<P>, carbon: Arc<CarbonClient>, config: PipelineConfig, shutdown: Arc<ShutdownController>) -> Self {
        Orchestrator { artdaq, ucondb, preparer, carbon, config, shutdown }
    }

    /// Runs the pipeline in `mode`, annotating any stage error with the
    /// stage that produced it before returning it to the caller.
    pub async fn run(&self, mode: Mode, incremental: bool) -> Result<RunOutcome, ArchiverError> {
        match mode {
            Mode::Full => {
                let mut reports = Vec::new();
                reports.push(self.run_import(incremental).await.map_err(|e| self.with_context(StageName::Import, e))?);
                if self.shutdown.is_shutdown_requested() {
                    return Ok(RunOutcome::Batch(reports));
                }
                reports.push(self.run_migrate(incremental).await.map_err(|e| self.with_context(StageName::Migration, e))?);
                Ok(RunOutcome::Batch(reports))
            }
            Mode::ImportOnly => {
                let report = self.run_import(incremental).await.map_err(|e| self.with_context(StageName::Import, e))?;
                Ok(RunOutcome::Batch(vec![report]))
            }
            Mode::MigrateOnly => {
                let report = self.run_migrate(incremental).await.map_err(|e| self.with_context(StageName::Migration, e))?;
                Ok(RunOutcome::Batch(vec![report]))
            }
            Mode::RetryFailedImport => {
                let stage = Arc::new(ImportStage::new(Arc::clone(&self.artdaq), Arc::clone(&self.preparer), &self.config).as_recovery());
                let report = stage.run_failure_recovery(&self.config, &self.shutdown).await;
                Ok(RunOutcome::Batch(vec![report]))
            }
            Mode::RetryFailedMigrate => {
                let stage = Arc::new(MigrateStage::new(Arc::clone(&self.artdaq), Arc::clone(&self.ucondb), Arc::clone(&self.carbon), &self.config).as_recovery());
                let report = stage.run_failure_recovery(&self.config, &self.shutdown).await;
                stage.publish_metrics(&report);
                Ok(RunOutcome::Batch(vec![report]))
            }
            Mode::ReportStatus => {
                let reporter = Reporter::new(Arc::clone(&self.artdaq), Arc::clone(&self.ucondb), &self.config);
                let status = reporter.report(false).await.map_err(|e| self.with_context(StageName::Report, e))?;
                Ok(RunOutcome::Status(status))
            }
            Mode::CompareState => {
                let reporter = Reporter::new(Arc::clone(&self.artdaq), Arc::clone(&self.ucondb), &self.config);
                let status = reporter.report(true).await.map_err(|e| self.with_context(StageName::Report, e))?;
                Ok(RunOutcome::Status(status))
            }
            Mode::RecoverImportState => {
                let report = recover_import_state(&self.artdaq, &self.config)
                    .await
                    .map_err(|e| self.with_context(StageName::ImportStateRecovery, e))?;
                Ok(RunOutcome::Recovery(report))
            }
            Mode::RecoverMigrateState => {
                let report = recover_migrate_state(&self.artdaq, &self.ucondb, &self.config)
                    .await
                    .map_err(|e| self.with_context(StageName::MigrationStateRecovery, e))?;
                Ok(RunOutcome::Recovery(report))
            }
        }
    }

    async fn run_import(&self, incremental: bool) -> Result<BatchReport, ArchiverError> {
        let stage = Arc::new(ImportStage::new(Arc::clone(&self.artdaq), Arc::clone(&self.preparer), &self.config));
        let items = stage.work_items(incremental).await?;
        Ok(run_batch(stage as Arc<dyn crate::executor::StageWorker>, items, incremental, &self.config, &self.shutdown).await)
    }

    async fn run_migrate(&self, incremental: bool) -> Result<BatchReport, ArchiverError> {
        let stage = Arc::new(MigrateStage::new(Arc::clone(&self.artdaq), Arc::clone(&self.ucondb), Arc::clone(&self.carbon), &self.config));
        let items = stage.work_items(incremental).await?;
        let report = run_batch(Arc::clone(&stage) as Arc<dyn crate::executor::StageWorker>, items, incremental, &self.config, &self.shutdown).await;
        stage.publish_metrics(&report);
        Ok(report)
    }

    fn with_context(&self, stage: StageName, err: ArchiverError) -> ArchiverError {
        tracing::error!(stage = %stage, error = %err, "stage failed");
        err
    }
}

#[cfg(test)]
#[path = "orchestrator_tests.rs"]
mod tests;
