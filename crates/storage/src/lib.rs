// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Durable storage for the run record archiver: per-stage JSON state,
//! failure logs, and the single-instance process lock.

mod lock;
mod state;

pub use lock::{LockError, ProcessLock};
pub use state::{
    append_to_failure_log, get_incremental_start_run, parse_run_records_from_file, read_state,
    recompute_contiguous_run_state, update_attempted_run_state, update_contiguous_run_state,
    write_failure_log, write_recomputed_state, write_state,
};
