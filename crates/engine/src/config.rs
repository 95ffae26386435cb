// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pipeline-level settings the stages and executor consume. The CLI crate
//! is responsible for parsing these out of YAML; this struct is the plain
//! data boundary between that and the engine.

use std::path::PathBuf;
use std::time::Duration;

/// Default `metadata.fcl` keys the blob validator checks, mapping the
/// in-file key to the parameter name used in diagnostics.
pub fn default_validator_params() -> Vec<(String, String)> {
    vec![
        ("components".to_string(), "components".to_string()),
        ("configuration".to_string(), "config_name".to_string()),
        ("projectversion".to_string(), "sbndaq_commit_or_version".to_string()),
    ]
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Maximum runs processed per incremental invocation; non-incremental
    /// invocations use `batch_size * 10`.
    pub batch_size: usize,
    pub parallel_workers: usize,
    pub run_process_retries: u32,
    pub retry_delay: Duration,
    pub run_records_dir: PathBuf,
    pub scratch_root: PathBuf,
    pub import_state_path: PathBuf,
    pub import_failure_log_path: PathBuf,
    pub migrate_state_path: PathBuf,
    pub migrate_failure_log_path: PathBuf,
    pub lock_path: PathBuf,
    pub validate: bool,
    pub validator_params: Vec<(String, String)>,
}

impl PipelineConfig {
    pub fn batch_cap(&self, incremental: bool) -> usize {
        if incremental {
            self.batch_size
        } else {
            self.batch_size.saturating_mul(10)
        }
    }
}
