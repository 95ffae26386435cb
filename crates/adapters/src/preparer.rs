// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! FCL preparer: stages a run directory into the archive-ready layout the
//! artdaqDB client expects, converting loose `key: value` text files into
//! FHiCL (`key: "value"`) documents.

use std::path::Path;

use async_trait::async_trait;
use rra_core::{ArchiverError, StageName};

use crate::traits::RunPreparer;

#[derive(Debug, Clone)]
pub struct FclPreparerConfig {
    /// Directory holding the shared `schema.fcl` copied into every run.
    pub fcl_conf_dir: std::path::PathBuf,
}

pub struct FclPreparer {
    config: FclPreparerConfig,
}

impl FclPreparer {
    /// Validates that `fcl_conf_dir` exists before the preparer is handed
    /// to the pipeline, matching the original's constructor-time check.
    pub fn new(config: FclPreparerConfig) -> Result<Self, ArchiverError> {
        if !config.fcl_conf_dir.is_dir() {
            return Err(ArchiverError::Configuration(format!(
                "FCL confdir '{}' is not a directory",
                config.fcl_conf_dir.display()
            )));
        }
        Ok(FclPreparer { config })
    }

    fn err(run_dir: &Path, message: impl std::fmt::Display) -> ArchiverError {
        ArchiverError::retriable(Some(StageName::Import), None, format!("error preparing FCL for '{}': {message}", run_dir.display()))
    }
}

fn fhiclize_document(contents: &str) -> String {
    let mut lines = Vec::new();
    for line in contents.lines() {
        let Some(colon) = line.find(':') else { continue };
        let key = line[..colon].trim();
        if key.is_empty() {
            continue;
        }
        let value = line[colon + 1..].trim().trim_matches(|c| c == '\'' || c == '"').replace('"', "\\\"");
        let key = key.chars().map(|c| if c.is_whitespace() || c == '(' || c == ')' || c == '/' { '_' } else { c }).collect::<String>();
        lines.push(format!("{key}: \"{value}\""));
    }
    lines.join("\n")
}

fn resolve_config_name(run_dir: &Path) -> String {
    let metadata_path = run_dir.join("metadata.txt");
    let Ok(contents) = std::fs::read_to_string(&metadata_path) else {
        return "standard".to_string();
    };
    for line in contents.lines() {
        if let Some(rest) = line.strip_prefix("Config name:") {
            let name = rest.trim();
            if !name.is_empty() {
                return name.replace('/', "_");
            }
        }
    }
    "standard".to_string()
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> std::io::Result<()> {
    std::fs::create_dir_all(dst)?;
    for entry in std::fs::read_dir(src)? {
        let entry = entry?;
        let dest_path = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&entry.path(), &dest_path)?;
        } else {
            std::fs::copy(entry.path(), dest_path)?;
        }
    }
    Ok(())
}

#[async_trait]
impl RunPreparer for FclPreparer {
    async fn prepare_for_archive(&self, _run: u32, source_dir: &Path, scratch_dir: &Path) -> Result<String, ArchiverError> {
        copy_dir_recursive(source_dir, scratch_dir).map_err(|e| Self::err(source_dir, e))?;

        let entries: Vec<_> = std::fs::read_dir(scratch_dir)
            .map_err(|e| Self::err(source_dir, e))?
            .filter_map(Result::ok)
            .filter(|e| e.path().extension().and_then(|ext| ext.to_str()) == Some("txt"))
            .collect();

        for entry in entries {
            let path = entry.path();
            if path.file_name().and_then(|n| n.to_str()) == Some("metadata.txt") {
                let contents = std::fs::read_to_string(&path).map_err(|e| Self::err(source_dir, e))?;
                std::fs::write(scratch_dir.join("metadata.fcl"), fhiclize_document(&contents)).map_err(|e| Self::err(source_dir, e))?;
            }
            std::fs::remove_file(&path).map_err(|e| Self::err(source_dir, e))?;
        }

        let schema_src = self.config.fcl_conf_dir.join("schema.fcl");
        if !schema_src.is_file() {
            return Err(ArchiverError::retriable(Some(StageName::Import), None, format!("schema not found at {}", schema_src.display())));
        }
        std::fs::copy(&schema_src, scratch_dir.join("schema.fcl")).map_err(|e| Self::err(source_dir, e))?;

        Ok(resolve_config_name(source_dir))
    }

    async fn prepare_for_update(&self, _run: u32, source_dir: &Path, scratch_dir: &Path) -> Result<bool, ArchiverError> {
        let metadata_path = source_dir.join("metadata.txt");
        let Ok(contents) = std::fs::read_to_string(&metadata_path) else {
            return Ok(false);
        };

        let mut lines = Vec::new();
        for line in contents.lines() {
            if let Some(rest) = line.trim_start().strip_prefix("DAQInterface stop time:") {
                lines.push(format!("DAQInterface_stop_time: \"{}\"", rest.trim()));
            }
        }
        if lines.is_empty() {
            return Ok(false);
        }

        std::fs::create_dir_all(scratch_dir).map_err(|e| Self::err(source_dir, e))?;
        std::fs::write(scratch_dir.join("RunHistory2.fcl"), lines.join("\n")).map_err(|e| Self::err(source_dir, e))?;
        Ok(true)
    }
}

#[cfg(test)]
#[path = "preparer_tests.rs"]
mod tests;
