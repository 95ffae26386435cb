// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! UconDB adapter: a thin HTTP client over the object store's put/get/list
//! API, plus the fetch-back verification path the migrate stage drives
//! separately via [`UconDbConfig::data_url`].

use std::collections::BTreeSet;
use std::time::Duration;

use async_trait::async_trait;
use rra_core::{ArchiverError, StageName};

use crate::traits::{UconDbClient, UploadOutcome};

const HTTP_TIMEOUT: Duration = Duration::from_secs(30);

/// Connection details for the UconDB adapter.
#[derive(Debug, Clone)]
pub struct UconDbConfig {
    pub server_url: String,
    pub folder_name: String,
    pub object_name: String,
    pub writer_user: String,
    pub writer_password: String,
}

impl UconDbConfig {
    /// The canonical data URL used for fetch-back verification:
    /// `<server>/data/<folder>/<object>/key=<run>`.
    pub fn data_url(&self, run: u32) -> String {
        format!("{}/data/{}/{}/key={run}", self.server_url.trim_end_matches('/'), self.folder_name, self.object_name)
    }

    fn list_url(&self) -> String {
        format!("{}/list/{}/{}", self.server_url.trim_end_matches('/'), self.folder_name, self.object_name)
    }

    fn put_url(&self, run: u32) -> String {
        format!("{}/data/{}/{}/key={run}", self.server_url.trim_end_matches('/'), self.folder_name, self.object_name)
    }
}

pub struct RealUconDbClient {
    config: UconDbConfig,
    agent: ureq::Agent,
}

impl RealUconDbClient {
    pub fn new(config: UconDbConfig) -> Self {
        let agent: ureq::Agent = ureq::Agent::config_builder().timeout_global(Some(HTTP_TIMEOUT)).build().into();
        RealUconDbClient { config, agent }
    }

    fn basic_auth(&self) -> String {
        use base64::Engine as _;
        let raw = format!("{}:{}", self.config.writer_user, self.config.writer_password);
        format!("Basic {}", base64::engine::general_purpose::STANDARD.encode(raw))
    }

    fn err(&self, run: Option<u32>, message: impl Into<String>) -> ArchiverError {
        ArchiverError::retriable(Some(StageName::Migration), run, message)
    }
}

#[async_trait]
impl UconDbClient for RealUconDbClient {
    async fn get_existing_runs(&self) -> Result<BTreeSet<u32>, ArchiverError> {
        let url = self.config.list_url();
        let mut response = self
            .agent
            .get(&url)
            .header("Authorization", &self.basic_auth())
            .call()
            .map_err(|e| self.err(None, format!("failed to list versions in UconDB: {e}")))?;
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| self.err(None, format!("failed to read UconDB list response: {e}")))?;
        Ok(body.lines().filter_map(|line| line.trim().parse::<u32>().ok()).collect())
    }

    async fn upload_blob(&self, run: u32, blob_content: &str) -> Result<UploadOutcome, ArchiverError> {
        let url = self.config.put_url(run);
        match self
            .agent
            .put(&url)
            .header("Authorization", &self.basic_auth())
            .send(blob_content.as_bytes())
        {
            Ok(_) => Ok(UploadOutcome::Uploaded),
            Err(e) => {
                let message = e.to_string();
                if message.contains("409") || message.to_lowercase().contains("already exists") {
                    Ok(UploadOutcome::AlreadyExists)
                } else {
                    Err(self.err(Some(run), format!("failed to upload blob for run {run}: {message}")))
                }
            }
        }
    }

    async fn get_data(&self, run: u32) -> Result<String, ArchiverError> {
        let url = self.config.data_url(run);
        let mut response = self
            .agent
            .get(&url)
            .header("Authorization", &self.basic_auth())
            .call()
            .map_err(|e| self.err(Some(run), format!("failed to download blob for run {run}: {e}")))?;
        response
            .body_mut()
            .read_to_string()
            .map_err(|e| self.err(Some(run), format!("failed to decode blob body for run {run}: {e}")))
    }
}

#[cfg(test)]
#[path = "ucondb_tests.rs"]
mod tests;
