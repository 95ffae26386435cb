// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The single-instance process lock: an exclusive advisory file lock whose
//! payload is the owning process's PID.
//!
//! Acquisition failure ([`LockError::AlreadyHeld`]) is an ordinary operator
//! condition, not a bug — another archiver invocation is running. The lock
//! is released on every exit path via `Drop`.

use std::fs::{File, OpenOptions};
use std::io::{Read, Write as _};
use std::path::{Path, PathBuf};

use fs2::FileExt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum LockError {
    #[error("another process may be running; lock file '{0}' is held")]
    AlreadyHeld(PathBuf),
    #[error("failed to prepare lock file '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// An acquired process lock. Dropping it releases the underlying advisory
/// lock and closes the file; the lock file itself is left on disk (its
/// removal, while the lock is held, is how an operator signals shutdown —
/// see [`ProcessLock::is_valid`]).
pub struct ProcessLock {
    path: PathBuf,
    file: File,
    pid: u32,
}

impl ProcessLock {
    /// Acquires the lock at `path`, creating parent directories as needed.
    /// Fails with [`LockError::AlreadyHeld`] if another process holds it.
    pub fn acquire(path: &Path) -> Result<Self, LockError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|source| LockError::Io {
                path: path.to_path_buf(),
                source,
            })?;
        }
        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(false)
            .open(path)
            .map_err(|source| LockError::Io {
                path: path.to_path_buf(),
                source,
            })?;

        file.try_lock_exclusive().map_err(|_| LockError::AlreadyHeld(path.to_path_buf()))?;

        let pid = std::process::id();
        let mut file = file;
        file.set_len(0).map_err(|source| LockError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        writeln!(file, "{pid}").map_err(|source| LockError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        file.flush().map_err(|source| LockError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        Ok(ProcessLock { path: path.to_path_buf(), file, pid })
    }

    /// The PID that was written into the lock file on acquisition.
    pub fn pid(&self) -> u32 {
        self.pid
    }

    /// True only if the lock file still exists and its first line still
    /// holds this process's PID. The orchestrator's lock-watchdog polls
    /// this to detect out-of-band lock removal and convert it into a
    /// graceful shutdown request.
    pub fn is_valid(&self) -> bool {
        let Ok(mut f) = File::open(&self.path) else {
            return false;
        };
        let mut contents = String::new();
        if f.read_to_string(&mut contents).is_err() {
            return false;
        }
        match contents.trim().parse::<u32>() {
            Ok(pid) => pid == self.pid,
            Err(_) => false,
        }
    }
}

impl Drop for ProcessLock {
    fn drop(&mut self) {
        let _ = FileExt::unlock(&self.file);
    }
}

#[cfg(test)]
#[path = "lock_tests.rs"]
mod tests;
