// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure state-transition logic for a stage's persisted progress marker.
//!
//! [`StageState`] is the in-memory shape of a stage's JSON state file
//! (`last_contiguous_run`, `last_attempted_run`). Reading and writing that
//! file is the storage crate's job; this module only decides *what the new
//! values should be* given a batch of run outcomes, so it can be tested
//! without touching a filesystem.

use serde::{Deserialize, Serialize};

/// A stage's persisted progress: the highest run number for which every
/// run up to and including it is known good, and the highest run number
/// any attempt has reached (including runs that failed).
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct StageState {
    #[serde(default)]
    pub last_contiguous_run: u32,
    #[serde(default)]
    pub last_attempted_run: u32,
}

impl StageState {
    /// The run number an incremental pass should resume from: whichever
    /// marker is further along, since a batch can advance `last_attempted`
    /// past `last_contiguous` when later runs succeed before earlier ones.
    pub fn incremental_start_run(&self) -> u32 {
        self.last_contiguous_run.max(self.last_attempted_run)
    }
}

/// Advances `last_contiguous_run` past a batch's successful runs, stopping
/// at the first gap. Returns `true` if the state changed and should be
/// persisted.
pub fn update_contiguous_run_state(state: &mut StageState, successful_runs: &[u32]) -> bool {
    if successful_runs.is_empty() {
        return false;
    }
    let mut sorted = successful_runs.to_vec();
    sorted.sort_unstable();

    let mut last_run = state.last_contiguous_run;
    for run in sorted {
        if run == last_run + 1 {
            last_run = run;
        } else if run > last_run + 1 {
            break;
        }
    }

    if last_run > state.last_contiguous_run {
        state.last_contiguous_run = last_run;
        true
    } else {
        false
    }
}

/// Advances `last_attempted_run` to the highest run number touched by a
/// batch, whether or not that run succeeded. Returns `true` if the state
/// changed and should be persisted.
pub fn update_attempted_run_state(state: &mut StageState, attempted_runs: &[u32]) -> bool {
    let Some(&max_attempted) = attempted_runs.iter().max() else {
        return false;
    };
    let new_last_attempted = max_attempted.max(state.last_attempted_run);
    if new_last_attempted > state.last_attempted_run {
        state.last_attempted_run = new_last_attempted;
        true
    } else {
        false
    }
}

#[cfg(test)]
#[path = "stage_tests.rs"]
mod tests;
