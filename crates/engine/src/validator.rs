// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The blob validator (`--validate`): unpacks a downloaded blob and checks
//! that a fixed set of `metadata.fcl` keys are present exactly once. Errors
//! here are diagnostic only — they never fail the migrate run that
//! triggered them (see the migrate stage's `process`).

use regex::Regex;
use rra_core::{unpack, ArchiverError};

const METADATA_FILE: &str = "metadata.fcl";

/// Per-parameter validation outcome: how many matches `^<key>:\s+(.+)$`
/// found in `metadata.fcl` (exactly one is correct).
#[derive(Debug, Clone)]
pub struct ValidatorReport {
    pub errors: Vec<String>,
}

impl ValidatorReport {
    pub fn has_errors(&self) -> bool {
        !self.errors.is_empty()
    }
}

/// Validates `blob` against `params`, a list of `(metadata_key,
/// parameter_name)` pairs (see [`crate::config::default_validator_params`]).
pub fn validate_blob(blob: &str, params: &[(String, String)]) -> Result<ValidatorReport, ArchiverError> {
    let files = unpack(blob)?;
    let metadata = files
        .iter()
        .find(|f| f.name.eq_ignore_ascii_case(METADATA_FILE))
        .map(|f| String::from_utf8_lossy(&f.content).into_owned())
        .unwrap_or_default();

    let mut errors = Vec::new();
    for (key, parameter_name) in params {
        let pattern = format!(r"(?m)^{}:\s+(.+)$", regex::escape(key));
        let re = Regex::new(&pattern)
            .map_err(|err| ArchiverError::Unexpected(format!("invalid validator pattern for '{key}': {err}")))?;
        let matches: Vec<_> = re.captures_iter(&metadata).collect();
        if matches.len() != 1 {
            errors.push(format!(
                "expected exactly one match for '{parameter_name}' (key '{key}'), found {}",
                matches.len()
            ));
        }
    }

    Ok(ValidatorReport { errors })
}

#[cfg(test)]
#[path = "validator_tests.rs"]
mod tests;
