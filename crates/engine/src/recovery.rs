// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! State recovery: rebuilds a stage's durable state and failure log from an
//! authoritative external source rather than from the stage's own history.
//! Used after state-file loss or corruption.

use std::collections::BTreeSet;
use std::path::Path;
use std::sync::Arc;

use rra_adapters::{ArtdaqDbClient, UconDbClient};
use rra_core::{longest_contiguous_prefix_end, ArchiverError};

use crate::config::PipelineConfig;
use crate::fs_source::list_fs_runs;

/// Summary of one recovery pass, for the caller to log or print.
#[derive(Debug, Clone, Default)]
pub struct RecoveryReport {
    pub last_contiguous_run: u32,
    pub last_attempted_run: u32,
    pub missing: Vec<u32>,
}

fn recompute(authoritative: &BTreeSet<u32>, universe: &BTreeSet<u32>, state_path: &Path, failure_log_path: &Path) -> RecoveryReport {
    if authoritative.is_empty() {
        rra_storage::write_recomputed_state(state_path, 0, 0);
        rra_storage::write_failure_log(failure_log_path, &[]);
        return RecoveryReport::default();
    }

    let sorted: Vec<u32> = authoritative.iter().copied().collect();
    #[allow(clippy::expect_used)]
    let last_attempted_run = *sorted.last().expect("checked non-empty above");
    let last_contiguous_run = longest_contiguous_prefix_end(&sorted);

    let missing: Vec<u32> = universe
        .iter()
        .copied()
        .filter(|r| *r <= last_attempted_run && !authoritative.contains(r))
        .collect();

    rra_storage::write_recomputed_state(state_path, last_contiguous_run, last_attempted_run);
    rra_storage::write_failure_log(failure_log_path, &missing);

    RecoveryReport { last_contiguous_run, last_attempted_run, missing }
}

/// Rebuilds import state from artdaqDB (`A`) against the filesystem (`U`).
pub async fn recover_import_state<A: ArtdaqDbClient>(artdaq: &Arc<A>, config: &PipelineConfig) -> Result<RecoveryReport, ArchiverError> {
    let authoritative = artdaq.get_archived_runs().await?;
    let universe = list_fs_runs(&config.run_records_dir, rra_core::StageName::ImportStateRecovery)?;
    let report = recompute(&authoritative, &universe, &config.import_state_path, &config.import_failure_log_path);
    tracing::info!(
        last_contiguous_run = report.last_contiguous_run,
        last_attempted_run = report.last_attempted_run,
        missing = report.missing.len(),
        "import state recovered"
    );
    Ok(report)
}

/// Rebuilds migrate state from UconDB (`A`) against artdaqDB (`U`).
pub async fn recover_migrate_state<A: ArtdaqDbClient, U: UconDbClient>(
    artdaq: &Arc<A>,
    ucondb: &Arc<U>,
    config: &PipelineConfig,
) -> Result<RecoveryReport, ArchiverError> {
    let authoritative = ucondb.get_existing_runs().await?;
    let universe = artdaq.get_archived_runs().await?;
    let report = recompute(&authoritative, &universe, &config.migrate_state_path, &config.migrate_failure_log_path);
    tracing::info!(
        last_contiguous_run = report.last_contiguous_run,
        last_attempted_run = report.last_attempted_run,
        missing = report.missing.len(),
        "migrate state recovered"
    );
    Ok(report)
}

#[cfg(test)]
#[path = "recovery_tests.rs"]
mod tests;
