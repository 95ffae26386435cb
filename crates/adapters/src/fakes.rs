// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! In-memory fakes for the external collaborator traits, used by engine
//! tests to drive the stage executor's retry and concurrency behavior
//! without real infrastructure.

use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use rra_core::{ArchiverError, StageName};

use crate::traits::{ArtdaqDbClient, RunPreparer, UconDbClient, UploadOutcome};

/// A scripted outcome for a single call against a fake run number.
#[derive(Debug, Clone)]
pub enum Scripted {
    Succeed,
    Retriable(String),
    PermanentSkip(String),
}

struct ArtdaqState {
    archived: BTreeSet<u32>,
    script: BTreeMap<u32, Scripted>,
    archive_calls: Vec<(u32, String, bool)>,
}

/// Fake artdaqDB: an in-memory set of archived runs, with per-run scripted
/// failures for `archive_run`.
#[derive(Clone)]
pub struct FakeArtdaqDbClient {
    inner: Arc<Mutex<ArtdaqState>>,
}

impl Default for FakeArtdaqDbClient {
    fn default() -> Self {
        FakeArtdaqDbClient {
            inner: Arc::new(Mutex::new(ArtdaqState {
                archived: BTreeSet::new(),
                script: BTreeMap::new(),
                archive_calls: Vec::new(),
            })),
        }
    }
}

impl FakeArtdaqDbClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn seed_archived(&self, runs: impl IntoIterator<Item = u32>) {
        self.inner.lock().archived.extend(runs);
    }

    pub fn script_archive(&self, run: u32, outcome: Scripted) {
        self.inner.lock().script.insert(run, outcome);
    }

    pub fn archive_calls(&self) -> Vec<(u32, String, bool)> {
        self.inner.lock().archive_calls.clone()
    }
}

#[async_trait]
impl ArtdaqDbClient for FakeArtdaqDbClient {
    async fn get_archived_runs(&self) -> Result<BTreeSet<u32>, ArchiverError> {
        Ok(self.inner.lock().archived.clone())
    }

    async fn archive_run(&self, run: u32, config_name: &str, _prepared_dir: &Path, update: bool) -> Result<(), ArchiverError> {
        let mut inner = self.inner.lock();
        inner.archive_calls.push((run, config_name.to_string(), update));
        match inner.script.get(&run).cloned() {
            Some(Scripted::Succeed) | None => {
                inner.archived.insert(run);
                Ok(())
            }
            Some(Scripted::Retriable(message)) => Err(ArchiverError::retriable(Some(StageName::Import), Some(run), message)),
            Some(Scripted::PermanentSkip(message)) => Err(ArchiverError::permanent_skip(Some(StageName::Import), Some(run), message)),
        }
    }

    async fn export_run_configuration(&self, run: u32, destination_dir: &Path) -> Result<(), ArchiverError> {
        std::fs::create_dir_all(destination_dir).map_err(|e| ArchiverError::retriable(Some(StageName::Migration), Some(run), e.to_string()))?;
        std::fs::write(destination_dir.join("metadata.fcl"), format!("components: fake\nconfiguration: cfg-{run}\nprojectversion: v1\n"))
            .map_err(|e| ArchiverError::retriable(Some(StageName::Migration), Some(run), e.to_string()))?;
        Ok(())
    }
}

struct UconState {
    objects: BTreeMap<u32, String>,
    script: BTreeMap<u32, Scripted>,
    upload_calls: Vec<u32>,
}

/// Fake UconDB: an in-memory key/value store, with per-run scripted
/// upload failures.
#[derive(Clone)]
pub struct FakeUconDbClient {
    inner: Arc<Mutex<UconState>>,
}

impl Default for FakeUconDbClient {
    fn default() -> Self {
        FakeUconDbClient {
            inner: Arc::new(Mutex::new(UconState {
                objects: BTreeMap::new(),
                script: BTreeMap::new(),
                upload_calls: Vec::new(),
            })),
        }
    }
}

impl FakeUconDbClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_upload(&self, run: u32, outcome: Scripted) {
        self.inner.lock().script.insert(run, outcome);
    }

    /// Seed an object already present, as if uploaded by a prior
    /// invocation, exercising the key-collision-as-success path.
    pub fn seed_object(&self, run: u32, content: impl Into<String>) {
        self.inner.lock().objects.insert(run, content.into());
    }

    /// Corrupt the stored object so fetch-back verification observes a
    /// body different from what was uploaded.
    pub fn corrupt_object(&self, run: u32, content: impl Into<String>) {
        self.inner.lock().objects.insert(run, content.into());
    }

    pub fn upload_calls(&self) -> Vec<u32> {
        self.inner.lock().upload_calls.clone()
    }
}

#[async_trait]
impl UconDbClient for FakeUconDbClient {
    async fn get_existing_runs(&self) -> Result<BTreeSet<u32>, ArchiverError> {
        Ok(self.inner.lock().objects.keys().copied().collect())
    }

    async fn upload_blob(&self, run: u32, blob_content: &str) -> Result<UploadOutcome, ArchiverError> {
        let mut inner = self.inner.lock();
        inner.upload_calls.push(run);
        match inner.script.get(&run).cloned() {
            Some(Scripted::Retriable(message)) => {
                return Err(ArchiverError::retriable(Some(StageName::Migration), Some(run), message));
            }
            Some(Scripted::PermanentSkip(message)) => {
                return Err(ArchiverError::permanent_skip(Some(StageName::Migration), Some(run), message));
            }
            Some(Scripted::Succeed) | None => {}
        }
        if inner.objects.contains_key(&run) {
            return Ok(UploadOutcome::AlreadyExists);
        }
        inner.objects.insert(run, blob_content.to_string());
        Ok(UploadOutcome::Uploaded)
    }

    async fn get_data(&self, run: u32) -> Result<String, ArchiverError> {
        self.inner
            .lock()
            .objects
            .get(&run)
            .cloned()
            .ok_or_else(|| ArchiverError::retriable(Some(StageName::Migration), Some(run), format!("no object for run {run}")))
    }
}

/// Fake preparer: writes a single marker file into the scratch dir and
/// returns a deterministic config name, with per-run scripting for
/// failure-path tests.
#[derive(Clone, Default)]
pub struct FakeRunPreparer {
    inner: Arc<Mutex<FakePreparerState>>,
}

#[derive(Default)]
struct FakePreparerState {
    script: BTreeMap<u32, Scripted>,
    has_update: BTreeSet<u32>,
    prepare_calls: Vec<PathBuf>,
}

impl FakeRunPreparer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn script_prepare(&self, run: u32, outcome: Scripted) {
        self.inner.lock().script.insert(run, outcome);
    }

    pub fn mark_has_update(&self, run: u32) {
        self.inner.lock().has_update.insert(run);
    }

    pub fn prepare_calls(&self) -> Vec<PathBuf> {
        self.inner.lock().prepare_calls.clone()
    }
}

#[async_trait]
impl RunPreparer for FakeRunPreparer {
    async fn prepare_for_archive(&self, run: u32, _source_dir: &Path, scratch_dir: &Path) -> Result<String, ArchiverError> {
        let mut inner = self.inner.lock();
        inner.prepare_calls.push(scratch_dir.to_path_buf());
        match inner.script.get(&run).cloned() {
            Some(Scripted::Retriable(message)) => return Err(ArchiverError::retriable(Some(StageName::Import), Some(run), message)),
            Some(Scripted::PermanentSkip(message)) => return Err(ArchiverError::permanent_skip(Some(StageName::Import), Some(run), message)),
            Some(Scripted::Succeed) | None => {}
        }
        std::fs::create_dir_all(scratch_dir).map_err(|e| ArchiverError::retriable(Some(StageName::Import), Some(run), e.to_string()))?;
        std::fs::write(scratch_dir.join("boot.fcl"), format!("run: {run}\n"))
            .map_err(|e| ArchiverError::retriable(Some(StageName::Import), Some(run), e.to_string()))?;
        Ok(format!("cfg-{run}"))
    }

    async fn prepare_for_update(&self, run: u32, _source_dir: &Path, scratch_dir: &Path) -> Result<bool, ArchiverError> {
        let has_update = self.inner.lock().has_update.contains(&run);
        if has_update {
            std::fs::create_dir_all(scratch_dir).map_err(|e| ArchiverError::retriable(Some(StageName::Import), Some(run), e.to_string()))?;
            std::fs::write(scratch_dir.join("RunHistory.fcl"), format!("run: {run}\nstop_time: now\n"))
                .map_err(|e| ArchiverError::retriable(Some(StageName::Import), Some(run), e.to_string()))?;
        }
        Ok(has_update)
    }
}
