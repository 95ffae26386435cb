// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Enumerates the filesystem's view of which runs exist: integer-named
//! subdirectories of the run-records root.

use std::collections::BTreeSet;
use std::path::Path;

use rra_core::{ArchiverError, StageName};

pub fn list_fs_runs(run_records_dir: &Path, stage: StageName) -> Result<BTreeSet<u32>, ArchiverError> {
    let entries = match std::fs::read_dir(run_records_dir) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(BTreeSet::new()),
        Err(err) => {
            return Err(ArchiverError::retriable(
                Some(stage),
                None,
                format!("could not list run records directory '{}': {err}", run_records_dir.display()),
            ))
        }
    };

    let mut runs = BTreeSet::new();
    for entry in entries {
        let entry = entry.map_err(|err| {
            ArchiverError::retriable(Some(stage), None, format!("could not read directory entry: {err}"))
        })?;
        if !entry.file_type().map(|t| t.is_dir()).unwrap_or(false) {
            continue;
        }
        if let Some(run) = entry.file_name().to_str().and_then(|name| name.parse::<u32>().ok()) {
            runs.insert(run);
        }
    }
    Ok(runs)
}
