// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! artdaqDB adapter backed by an external command-line tool.
//!
//! The real artdaqDB library is an in-process, non-reentrant native
//! component configured through a process-global environment variable
//! (see the design notes on `W = 1` on the in-process path). The portable
//! strategy this adapter takes is (b) from those notes: every call shells
//! out to a helper binary, so the environment variable is scoped to a
//! child process rather than shared mutable state in this process.

use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
use rra_core::{ArchiverError, StageName};
use tokio::process::Command;

use crate::subprocess::{run_with_timeout, EXTERNAL_PROCESS_TIMEOUT};
use crate::traits::ArtdaqDbClient;

/// Connection details for the artdaqDB adapter.
#[derive(Debug, Clone)]
pub struct ArtdaqDbConfig {
    /// Path to the helper tool that wraps the native client library.
    pub tool_path: String,
    /// `ARTDAQ_DATABASE_URI` equivalent passed to the helper.
    pub database_uri: String,
    /// Optional remote host for bulkloader-style archiving.
    pub remote_host: Option<String>,
}

pub struct RealArtdaqDbClient {
    config: ArtdaqDbConfig,
}

impl RealArtdaqDbClient {
    pub fn new(config: ArtdaqDbConfig) -> Self {
        RealArtdaqDbClient { config }
    }

    fn base_command(&self, subcommand: &str) -> Command {
        let mut cmd = Command::new(&self.config.tool_path);
        cmd.arg(subcommand).env("ARTDAQ_DATABASE_URI", &self.config.database_uri);
        if let Some(host) = &self.config.remote_host {
            cmd.env("ARTDAQ_DATABASE_REMOTEHOST", host);
        }
        cmd
    }

    fn err(&self, message: impl Into<String>) -> ArchiverError {
        ArchiverError::retriable(Some(StageName::Import), None, message)
    }
}

#[async_trait]
impl ArtdaqDbClient for RealArtdaqDbClient {
    async fn get_archived_runs(&self) -> Result<BTreeSet<u32>, ArchiverError> {
        let cmd = self.base_command("list-runs");
        let output = run_with_timeout(cmd, EXTERNAL_PROCESS_TIMEOUT, "artdaqdb list-runs")
            .await
            .map_err(|e| self.err(e))?;
        if !output.status.success() {
            return Err(self.err(format!(
                "list-runs exited with {}: {}",
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().filter_map(|line| line.trim().parse::<u32>().ok()).collect())
    }

    async fn archive_run(&self, run: u32, config_name: &str, prepared_dir: &Path, update: bool) -> Result<(), ArchiverError> {
        let mut cmd = self.base_command("archive-run");
        cmd.arg(run.to_string())
            .arg("--config-name")
            .arg(config_name)
            .arg("--source-dir")
            .arg(prepared_dir);
        if update {
            cmd.arg("--update");
        }
        let output = run_with_timeout(cmd, EXTERNAL_PROCESS_TIMEOUT, "artdaqdb archive-run")
            .await
            .map_err(|e| self.err(e))?;
        if !output.status.success() {
            return Err(self.err(format!(
                "archive-run failed for run {run}: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }

    async fn export_run_configuration(&self, run: u32, destination_dir: &Path) -> Result<(), ArchiverError> {
        let mut cmd = self.base_command("export-run");
        cmd.arg(run.to_string()).arg("--destination-dir").arg(destination_dir);
        let output = run_with_timeout(cmd, EXTERNAL_PROCESS_TIMEOUT, "artdaqdb export-run")
            .await
            .map_err(|e| self.err(e))?;
        if !output.status.success() {
            return Err(self.err(format!(
                "export-run failed for run {run}: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(())
    }
}
