// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! JSON-backed stage state and the per-stage failure log.
//!
//! All failures here are non-fatal by design (see the state store's
//! semantics): a read failure logs a warning and yields a zeroed state, a
//! write failure logs an error and returns `false`. Callers never have to
//! thread a storage error through the pipeline for these operations — the
//! pipeline stays live even if its disk is misbehaving, at the cost of the
//! operator needing to notice the warnings.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::Write as _;
use std::path::Path;

use rra_core::StageState;

/// Reads a stage's state file, returning a zeroed [`StageState`] if it is
/// missing, unreadable, or not valid JSON.
pub fn read_state(path: &Path) -> StageState {
    match fs::read_to_string(path) {
        Ok(contents) => match serde_json::from_str(&contents) {
            Ok(state) => state,
            Err(err) => {
                tracing::warn!(path = %path.display(), error = %err, "failed to parse state file");
                StageState::default()
            }
        },
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => StageState::default(),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "failed to read state file");
            StageState::default()
        }
    }
}

/// Writes a stage's state file with atomic-replace semantics: the new
/// content lands in a sibling temp file, is fsynced, then renamed over the
/// target. Returns `false` (and logs) on any I/O failure; never raises.
pub fn write_state(path: &Path, state: &StageState) -> bool {
    if let Some(parent) = path.parent() {
        if let Err(err) = fs::create_dir_all(parent) {
            tracing::error!(path = %path.display(), error = %err, "failed to create state directory");
            return false;
        }
    }
    match atomic_write(path, &serde_json::to_vec_pretty(state).unwrap_or_default()) {
        Ok(()) => true,
        Err(err) => {
            tracing::error!(path = %path.display(), error = %err, "failed to write state file");
            false
        }
    }
}

fn atomic_write(path: &Path, contents: &[u8]) -> std::io::Result<()> {
    let tmp_path = path.with_extension("tmp");
    {
        let mut tmp = File::create(&tmp_path)?;
        tmp.write_all(contents)?;
        tmp.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    if let Some(parent) = path.parent() {
        if let Ok(dir) = File::open(parent) {
            let _ = dir.sync_all();
        }
    }
    Ok(())
}

/// Advances `last_contiguous_run` past `successful_runs`, persisting only
/// if it moved.
pub fn update_contiguous_run_state(path: &Path, successful_runs: &[u32]) {
    if successful_runs.is_empty() {
        return;
    }
    let mut state = read_state(path);
    if rra_core::update_contiguous_run_state(&mut state, successful_runs) && write_state(path, &state) {
        tracing::info!(
            path = %path.display(),
            last_contiguous_run = state.last_contiguous_run,
            "advanced last contiguous run"
        );
    }
}

/// Advances `last_attempted_run` to the batch's highest run number,
/// persisting only if it moved.
pub fn update_attempted_run_state(path: &Path, attempted_runs: &[u32]) {
    if attempted_runs.is_empty() {
        return;
    }
    let mut state = read_state(path);
    let before = state.last_attempted_run;
    if rra_core::update_attempted_run_state(&mut state, attempted_runs) && write_state(path, &state) {
        tracing::info!(
            path = %path.display(),
            before,
            after = state.last_attempted_run,
            "advanced last attempted run"
        );
    }
}

/// `max(last_contiguous_run, last_attempted_run)` for `path`'s state file.
pub fn get_incremental_start_run(path: &Path) -> u32 {
    read_state(path).incremental_start_run()
}

/// Recomputes `last_contiguous_run` directly from `authoritative_runs`
/// (rather than advancing the prior value), leaving `last_attempted_run`
/// untouched. Used by failure recovery, which rebuilds contiguity against
/// the full current set of archived/migrated runs rather than a batch.
pub fn recompute_contiguous_run_state(path: &Path, authoritative_runs: &BTreeSet<u32>) {
    let mut state = read_state(path);
    let sorted: Vec<u32> = authoritative_runs.iter().copied().collect();
    let recomputed = if sorted.is_empty() { 0 } else { rra_core::longest_contiguous_prefix_end(&sorted) };
    if recomputed != state.last_contiguous_run {
        state.last_contiguous_run = recomputed;
        if write_state(path, &state) {
            tracing::info!(path = %path.display(), last_contiguous_run = recomputed, "recomputed contiguous run state");
        }
    }
}

/// Overwrites both markers unconditionally, used by full state recovery
/// which rebuilds the state file from scratch against an authoritative
/// source rather than advancing it.
pub fn write_recomputed_state(path: &Path, last_contiguous_run: u32, last_attempted_run: u32) {
    let state = StageState { last_contiguous_run, last_attempted_run };
    if write_state(path, &state) {
        tracing::info!(
            path = %path.display(),
            last_contiguous_run,
            last_attempted_run,
            "recomputed state"
        );
    }
}

/// Parses a failure log into run numbers, skipping blank and non-integer
/// lines. Returns an empty vec (with a logged error) on I/O failure, and
/// silently for a missing file.
pub fn parse_run_records_from_file(path: &Path) -> Vec<u32> {
    let contents = match fs::read_to_string(path) {
        Ok(c) => c,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Vec::new(),
        Err(err) => {
            tracing::error!(path = %path.display(), error = %err, "failed to read failure log");
            return Vec::new();
        }
    };
    contents
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter_map(|line| line.parse::<u32>().ok())
        .collect()
}

/// Appends `failed_runs` (sorted ascending, one per line) to the failure
/// log without disturbing its existing contents.
pub fn append_to_failure_log(path: &Path, failed_runs: &[u32]) {
    if failed_runs.is_empty() {
        return;
    }
    let mut sorted = failed_runs.to_vec();
    sorted.sort_unstable();
    let result = (|| -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::OpenOptions::new().create(true).append(true).open(path)?;
        for run in sorted {
            writeln!(file, "{run}")?;
        }
        Ok(())
    })();
    if let Err(err) = result {
        tracing::error!(path = %path.display(), error = %err, "could not write to failure log");
    }
}

/// Truncates and rewrites the failure log with exactly `failed_runs`
/// (sorted ascending). An empty slice yields an empty file.
pub fn write_failure_log(path: &Path, failed_runs: &[u32]) {
    let mut sorted = failed_runs.to_vec();
    sorted.sort_unstable();
    let result = (|| -> std::io::Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut file = fs::File::create(path)?;
        for run in sorted {
            writeln!(file, "{run}")?;
        }
        Ok(())
    })();
    if let Err(err) = result {
        tracing::error!(path = %path.display(), error = %err, "could not update failure log");
    }
}

#[cfg(test)]
#[path = "state_tests.rs"]
mod tests;
