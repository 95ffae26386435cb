// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Status reporter: a pure-read diagnostic over the three run sources
//! (filesystem, artdaqDB, UconDB), with optional comparison against the
//! recorded stage state.

use std::collections::BTreeSet;
use std::sync::Arc;

use rra_adapters::{ArtdaqDbClient, UconDbClient};
use rra_core::{compute_ranges_and_gaps, format_gaps, format_ranges, ArchiverError, StageName};

use crate::fs_source::list_fs_runs;

const MAX_DISPLAY: usize = 10;

/// Summary of one source's run numbers.
#[derive(Debug, Clone, Default)]
pub struct SourceSummary {
    pub total: usize,
    pub min: Option<u32>,
    pub max: Option<u32>,
    pub ranges: String,
    pub gaps: String,
}

impl SourceSummary {
    fn from_runs(runs: &BTreeSet<u32>) -> Self {
        let (ranges, gaps) = compute_ranges_and_gaps(runs);
        SourceSummary {
            total: runs.len(),
            min: runs.iter().next().copied(),
            max: runs.iter().next_back().copied(),
            ranges: format_ranges(&ranges, MAX_DISPLAY),
            gaps: format_gaps(&gaps, MAX_DISPLAY),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct StatusReport {
    pub fs: SourceSummary,
    pub artdaq: SourceSummary,
    pub ucon: SourceSummary,
    pub recommendations: Vec<String>,
    pub state_comparison: Option<StateComparison>,
}

#[derive(Debug, Clone, Default)]
pub struct StateComparison {
    pub import_missing_before_contiguous: Vec<u32>,
    pub migrate_missing_before_contiguous: Vec<u32>,
    pub import_failure_log: Vec<u32>,
    pub migrate_failure_log: Vec<u32>,
}

pub struct Reporter<A, U> {
    artdaq: Arc<A>,
    ucondb: Arc<U>,
    run_records_dir: std::path::PathBuf,
    import_state_path: std::path::PathBuf,
    migrate_state_path: std::path::PathBuf,
    import_failure_log_path: std::path::PathBuf,
    migrate_failure_log_path: std::path::PathBuf,
}

impl<A, U> Reporter<A, U>
where
    A: ArtdaqDbClient,
    U: UconDbClient,
{
    pub fn new(artdaq: Arc<A>, ucondb: Arc<U>, config: &crate::config::PipelineConfig) -> Self {
        Reporter {
            artdaq,
            ucondb,
            run_records_dir: config.run_records_dir.clone(),
            import_state_path: config.import_state_path.clone(),
            migrate_state_path: config.migrate_state_path.clone(),
            import_failure_log_path: config.import_failure_log_path.clone(),
            migrate_failure_log_path: config.migrate_failure_log_path.clone(),
        }
    }

    pub async fn report(&self, compare_state: bool) -> Result<StatusReport, ArchiverError> {
        let fs_runs = list_fs_runs(&self.run_records_dir, StageName::Report)?;
        let artdaq_runs = self.artdaq.get_archived_runs().await?;
        let ucon_runs = self.ucondb.get_existing_runs().await?;

        let mut recommendations = Vec::new();
        let fs_not_artdaq: Vec<u32> = fs_runs.difference(&artdaq_runs).copied().collect();
        if !fs_not_artdaq.is_empty() {
            recommendations.push(format!("{} run(s) present on the filesystem but not in artdaqDB: run the importer", fs_not_artdaq.len()));
        }
        let artdaq_not_ucon: Vec<u32> = artdaq_runs.difference(&ucon_runs).copied().collect();
        if !artdaq_not_ucon.is_empty() {
            recommendations.push(format!("{} run(s) present in artdaqDB but not in UconDB: run the migrator", artdaq_not_ucon.len()));
        }
        let artdaq_not_fs: Vec<u32> = artdaq_runs.difference(&fs_runs).copied().collect();
        if !artdaq_not_fs.is_empty() {
            recommendations.push(format!("{} run(s) present in artdaqDB but not on the filesystem: may have been deleted", artdaq_not_fs.len()));
        }
        let ucon_not_artdaq: Vec<u32> = ucon_runs.difference(&artdaq_runs).copied().collect();
        if !ucon_not_artdaq.is_empty() {
            recommendations.push(format!("{} run(s) present in UconDB but not in artdaqDB (informational)", ucon_not_artdaq.len()));
        }

        let state_comparison = if compare_state {
            Some(self.compare_state(&artdaq_runs, &ucon_runs))
        } else {
            None
        };

        Ok(StatusReport {
            fs: SourceSummary::from_runs(&fs_runs),
            artdaq: SourceSummary::from_runs(&artdaq_runs),
            ucon: SourceSummary::from_runs(&ucon_runs),
            recommendations,
            state_comparison,
        })
    }

    fn compare_state(&self, artdaq_runs: &BTreeSet<u32>, ucon_runs: &BTreeSet<u32>) -> StateComparison {
        let import_state = rra_storage::read_state(&self.import_state_path);
        let migrate_state = rra_storage::read_state(&self.migrate_state_path);

        let import_missing_before_contiguous: Vec<u32> =
            (1..=import_state.last_contiguous_run).filter(|r| !artdaq_runs.contains(r)).collect();
        let migrate_missing_before_contiguous: Vec<u32> =
            (1..=migrate_state.last_contiguous_run).filter(|r| !ucon_runs.contains(r)).collect();

        StateComparison {
            import_missing_before_contiguous,
            migrate_missing_before_contiguous,
            import_failure_log: rra_storage::parse_run_records_from_file(&self.import_failure_log_path),
            migrate_failure_log: rra_storage::parse_run_records_from_file(&self.migrate_failure_log_path),
        }
    }
}

#[cfg(test)]
#[path = "reporter_tests.rs"]
mod tests;
