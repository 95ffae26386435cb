// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! rra - run record archiver CLI.

mod config;
mod logging;
mod report;

use std::path::PathBuf;
use std::sync::Arc;

use clap::Parser;
use rra_adapters::{CarbonClient, FclPreparer, RealArtdaqDbClient, RealUconDbClient};
use rra_core::ArchiverError;
use rra_engine::{Mode, Orchestrator, RunOutcome, ShutdownController};
use rra_storage::ProcessLock;

#[derive(Parser)]
#[command(name = "rra", version, about = "Run record archiver: filesystem -> artdaqDB -> UconDB")]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(default_value = "config.yaml")]
    config_file: PathBuf,

    #[arg(long)]
    import_only: bool,
    #[arg(long)]
    migrate_only: bool,
    #[arg(long)]
    retry_failed_import: bool,
    #[arg(long)]
    retry_failed_migrate: bool,
    #[arg(long)]
    report_status: bool,
    #[arg(long)]
    compare_state: bool,
    #[arg(long)]
    recover_import_state: bool,
    #[arg(long)]
    recover_migrate_state: bool,

    /// Filter candidates by the incremental start marker instead of the
    /// full candidate set.
    #[arg(long)]
    incremental: bool,
    /// Run the blob validator after each successful migrate upload.
    #[arg(long)]
    validate: bool,
    /// Debug logging.
    #[arg(short, long)]
    verbose: bool,
}

impl Cli {
    fn mode(&self) -> Result<Mode, ArchiverError> {
        let flags: Vec<(bool, Mode)> = vec![
            (self.import_only, Mode::ImportOnly),
            (self.migrate_only, Mode::MigrateOnly),
            (self.retry_failed_import, Mode::RetryFailedImport),
            (self.retry_failed_migrate, Mode::RetryFailedMigrate),
            (self.compare_state, Mode::CompareState),
            (self.report_status, Mode::ReportStatus),
            (self.recover_import_state, Mode::RecoverImportState),
            (self.recover_migrate_state, Mode::RecoverMigrateState),
        ];
        let selected: Vec<Mode> = flags.into_iter().filter(|(set, _)| *set).map(|(_, mode)| mode).collect();
        match selected.len() {
            0 => Ok(Mode::Full),
            1 => Ok(selected[0]),
            _ => Err(ArchiverError::Configuration("mode flags are mutually exclusive".to_string())),
        }
    }
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    let code = match run(cli) {
        Ok(()) => 0,
        Err(err) => {
            let code = exit_code(&err);
            eprintln!("archiver failed: {err}");
            tracing::error!(error = %err, "archiver exiting with error");
            code
        }
    };
    std::process::exit(code);
}

fn exit_code(err: &ArchiverError) -> i32 {
    match err {
        ArchiverError::Configuration(_) | ArchiverError::LockHeld(_) => 1,
        ArchiverError::Retriable { .. } | ArchiverError::PermanentSkip { .. } => 1,
        ArchiverError::RunsFailed(_) => 1,
        ArchiverError::Interrupted(_) => 130,
        ArchiverError::Unexpected(_) => 2,
    }
}

#[tokio::main(flavor = "multi_thread")]
async fn run(cli: Cli) -> Result<(), ArchiverError> {
    let mode = cli.mode()?;
    let config = config::load(&cli.config_file)?;
    let mut pipeline_config = config.pipeline;
    pipeline_config.validate = cli.validate;

    let lock = ProcessLock::acquire(&pipeline_config.lock_path).map_err(|err| ArchiverError::LockHeld(err.to_string()))?;
    let lock = Arc::new(lock);

    let shutdown = ShutdownController::new();
    install_signal_handler(Arc::clone(&shutdown));
    let watchdog = shutdown.spawn_lock_watchdog(Arc::clone(&lock));

    let artdaq = Arc::new(RealArtdaqDbClient::new(config.artdaqdb));
    let ucondb = Arc::new(RealUconDbClient::new(config.ucondb));
    let preparer = Arc::new(FclPreparer::new(config.preparer)?);
    let carbon = Arc::new(CarbonClient::new(config.carbon));

    let orchestrator = Orchestrator::new(artdaq, ucondb, preparer, carbon, pipeline_config, Arc::clone(&shutdown));
    let outcome = orchestrator.run(mode, cli.incremental).await?;

    drop(lock);
    drop(watchdog);

    report::print(&outcome);

    if !outcome_succeeded(&outcome) {
        if shutdown.reason().as_deref() == Some("SIGINT received") {
            return Err(ArchiverError::Interrupted("graceful shutdown interrupted by SIGINT".to_string()));
        }
        return Err(ArchiverError::RunsFailed("one or more runs failed".to_string()));
    }
    Ok(())
}

fn outcome_succeeded(outcome: &RunOutcome) -> bool {
    match outcome {
        RunOutcome::Batch(reports) => reports.iter().all(|r| r.is_success() && r.cancelled == 0),
        RunOutcome::Status(_) | RunOutcome::Recovery(_) | RunOutcome::Nothing => true,
    }
}

/// Wires SIGINT into the shutdown controller: the first interrupt requests
/// a graceful stop; the third within the controller's window forces an
/// immediate exit at code 130.
fn install_signal_handler(shutdown: Arc<ShutdownController>) {
    let result = ctrlc::set_handler(move || {
        if shutdown.note_interrupt() {
            eprintln!("received repeated interrupts, exiting immediately");
            std::process::exit(130);
        }
    });
    if let Err(err) = result {
        tracing::warn!(error = %err, "could not install SIGINT handler");
    }
}

#[cfg(test)]
#[path = "main_tests.rs"]
mod tests;
