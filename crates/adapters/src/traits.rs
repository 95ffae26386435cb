// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Capability interfaces for the pipeline's external collaborators.
//!
//! The engine crate only ever talks to these traits: it does not know
//! whether a run is archived by shelling out to a bulkloader binary or by
//! linking a native database library, and it does not know whether a blob
//! lands in a real object store or a fake one in a test. That boundary is
//! what lets the stage executor's retry and concurrency logic be exercised
//! without real infrastructure.

use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
use rra_core::ArchiverError;

/// The intermediate configuration document store. Supports list, archive
/// (write/update), and export of per-run entity documents.
#[async_trait]
pub trait ArtdaqDbClient: Send + Sync + 'static {
    /// All run numbers with at least one archived configuration.
    async fn get_archived_runs(&self) -> Result<BTreeSet<u32>, ArchiverError>;

    /// Archives the prepared layout in `prepared_dir` under `config_name`
    /// for `run`. `update` selects the update-only write path (stop-time
    /// metadata) over the initial archive.
    async fn archive_run(&self, run: u32, config_name: &str, prepared_dir: &Path, update: bool) -> Result<(), ArchiverError>;

    /// Materializes `run`'s archived entity documents as files under
    /// `destination_dir`, ready for the blob codec to pack.
    async fn export_run_configuration(&self, run: u32, destination_dir: &Path) -> Result<(), ArchiverError>;
}

/// The long-term versioned object store, indexed by folder/object and
/// keyed per run.
#[async_trait]
pub trait UconDbClient: Send + Sync + 'static {
    /// All run numbers with an existing object version.
    async fn get_existing_runs(&self) -> Result<BTreeSet<u32>, ArchiverError>;

    /// Uploads `blob_content` under `key = run`. A failure because the key
    /// already exists is the caller's job to treat as idempotent success;
    /// this method reports it as [`ArchiverError::Retriable`] like any
    /// other upload failure, labeled distinctly so the migrate stage can
    /// recognize it (see [`UploadOutcome`]).
    async fn upload_blob(&self, run: u32, blob_content: &str) -> Result<UploadOutcome, ArchiverError>;

    /// Downloads the object body at `key = run` for fetch-back
    /// verification.
    async fn get_data(&self, run: u32) -> Result<String, ArchiverError>;
}

/// Result of a migrate-stage upload attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UploadOutcome {
    /// The upload ran and created a new version.
    Uploaded,
    /// The key already held an object; treated as success (idempotent
    /// re-upload window, see the migrate stage's retry semantics).
    AlreadyExists,
}

/// Stages a run's raw configuration artifacts into the archive-ready
/// layout the artdaqDB client expects. This is the text-format conversion
/// boundary ("FHiCL-ization"), deliberately kept outside the pipeline core.
#[async_trait]
pub trait RunPreparer: Send + Sync + 'static {
    /// Populates `scratch_dir` with the initial archive layout for `run`,
    /// sourced from `source_dir`, returning the `config_name` the artdaqDB
    /// client should archive it under.
    async fn prepare_for_archive(&self, run: u32, source_dir: &Path, scratch_dir: &Path) -> Result<String, ArchiverError>;

    /// Populates `scratch_dir` with update-only files (stop-time metadata)
    /// for `run`. Returns `false` if there is nothing to update, in which
    /// case the caller skips the follow-up archive call.
    async fn prepare_for_update(&self, run: u32, source_dir: &Path, scratch_dir: &Path) -> Result<bool, ArchiverError>;
}
