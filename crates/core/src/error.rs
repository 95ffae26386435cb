// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Error taxonomy shared across the pipeline.
//!
//! Every fallible operation in the archiver returns [`ArchiverError`]. The
//! variant is what the stage executor's retry loop switches on: `Retriable`
//! drives the retry-with-backoff path, `PermanentSkip` aborts it
//! immediately, and the rest are surfaced as-is.

use std::fmt;

/// Which stage (or pseudo-stage) an error originated in, for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageName {
    Import,
    Migration,
    ImportRecovery,
    MigrationRecovery,
    Report,
    ImportStateRecovery,
    MigrationStateRecovery,
}

impl fmt::Display for StageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            StageName::Import => "Import",
            StageName::Migration => "Migration",
            StageName::ImportRecovery => "Import Recovery",
            StageName::MigrationRecovery => "Migration Recovery",
            StageName::Report => "Status Report",
            StageName::ImportStateRecovery => "Import State Recovery",
            StageName::MigrationStateRecovery => "Migration State Recovery",
        };
        f.write_str(s)
    }
}

/// The archiver's error taxonomy (see `§7 ERROR HANDLING DESIGN`).
#[derive(Debug, thiserror::Error)]
pub enum ArchiverError {
    /// Missing setting, malformed YAML, or a circular `${...}` reference.
    /// Fatal before any work begins.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Another instance already holds the process lock.
    #[error("lock held: {0}")]
    LockHeld(String),

    /// A downstream failure during a per-run step (DB error, HTTP error,
    /// verification mismatch, preparer failure). Drives the retry loop.
    #[error("{stage}{run} {message}")]
    Retriable {
        stage: StageWrapper,
        run: RunSuffix,
        message: String,
    },

    /// Stop retrying this run immediately and fail it. Used by
    /// fault-injection and by clients that classify an error as
    /// non-retriable.
    #[error("{stage}{run} permanent skip: {message}")]
    PermanentSkip {
        stage: StageWrapper,
        run: RunSuffix,
        message: String,
    },

    /// One or more runs in a batch ended up in the failure log, or the
    /// batch was cut short by a graceful shutdown that was not itself
    /// driven by SIGINT. A known, non-crashing condition; exit code 1.
    #[error("{0}")]
    RunsFailed(String),

    /// A graceful shutdown driven by SIGINT completed. Exit code 130,
    /// matching the conventional "terminated by signal" code.
    #[error("interrupted: {0}")]
    Interrupted(String),

    /// Any exception not of the above families. Surfaced at exit code 2.
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

/// Displays as `" [Run N]"` or `""`, matching the bracketed prefix style of
/// the original error messages without making every call site format it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunSuffix(pub Option<u32>);

impl fmt::Display for RunSuffix {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(run) => write!(f, " [Run {run}]"),
            None => Ok(()),
        }
    }
}

impl fmt::Display for StageWrapper {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.0 {
            Some(stage) => write!(f, "[{stage}] "),
            None => Ok(()),
        }
    }
}

/// Internal helper so `{stage}` in the `Retriable`/`PermanentSkip` display
/// impls formats through `Option<StageName>` directly.
#[derive(Debug, Clone, Copy)]
pub struct StageWrapper(pub Option<StageName>);

impl ArchiverError {
    pub fn retriable(stage: Option<StageName>, run: Option<u32>, message: impl Into<String>) -> Self {
        ArchiverError::Retriable {
            stage: StageWrapper(stage),
            run: RunSuffix(run),
            message: message.into(),
        }
    }

    pub fn permanent_skip(stage: Option<StageName>, run: Option<u32>, message: impl Into<String>) -> Self {
        ArchiverError::PermanentSkip {
            stage: StageWrapper(stage),
            run: RunSuffix(run),
            message: message.into(),
        }
    }

    /// True if the executor's retry loop should stop retrying this run
    /// immediately rather than spending the remaining attempts.
    pub fn is_permanent_skip(&self) -> bool {
        matches!(self, ArchiverError::PermanentSkip { .. })
    }
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
