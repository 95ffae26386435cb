// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The blob codec (`pack`/`unpack`): a deterministic framed text document
//! that packs a directory's worth of run-configuration files into a single
//! string, and parses one back into named sections.

use chrono::{DateTime, Utc};

use crate::error::{ArchiverError, StageName};

const DELIM: &str = "#####\n";
const END_OF_RECORD_MARKER: &str = "\nEnd of Record";

/// Fixed trailing order for well-known run-configuration files. Matching is
/// case-insensitive; anything not in this list is a "regular" file sorted
/// ahead of the tail by lowercase name.
const END_FILES_TAIL: &[&str] = &[
    "boot.fcl",
    "known_boardreaders_list.fcl",
    "setup.fcl",
    "environment.fcl",
    "metadata.fcl",
    "settings.fcl",
    "ranks.fcl",
    "runhistory.fcl",
    "runhistory2.fcl",
];

/// A single file as pulled into (or out of) a blob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlobFile {
    pub name: String,
    pub content: Vec<u8>,
}

impl BlobFile {
    pub fn new(name: impl Into<String>, content: impl Into<Vec<u8>>) -> Self {
        BlobFile {
            name: name.into(),
            content: content.into(),
        }
    }
}

fn order_files(files: &[BlobFile]) -> Vec<&BlobFile> {
    let mut regular: Vec<&BlobFile> = files
        .iter()
        .filter(|f| !END_FILES_TAIL.contains(&f.name.to_lowercase().as_str()))
        .collect();
    regular.sort_by_key(|f| f.name.to_lowercase());

    let mut tail: Vec<&BlobFile> = Vec::new();
    for tail_name in END_FILES_TAIL {
        if let Some(f) = files.iter().find(|f| f.name.to_lowercase() == *tail_name) {
            tail.push(f);
        }
    }
    regular.into_iter().chain(tail).collect()
}

/// Best-effort text rendering of a file's bytes: valid UTF-8 is used
/// verbatim, anything else falls back to dropping non-ASCII bytes (matching
/// the original importer's "not UTF-8, read as binary" path) and logs a
/// warning naming the file.
fn render_content(name: &str, content: &[u8]) -> String {
    match std::str::from_utf8(content) {
        Ok(s) => s.to_string(),
        Err(_) => {
            tracing::warn!(file = name, "file not UTF-8, decoding as ASCII with bytes dropped");
            content.iter().filter(|b| b.is_ascii()).map(|&b| b as char).collect()
        }
    }
}

/// Packs `files` for `run` into the wire format described in the run-record
/// archiver's blob layout: a `Start of Record` header, each file framed by
/// `#####` delimiters in [`END_FILES_TAIL`]-then-alphabetical order, and a
/// matching `End of Record` footer. `timestamp` is rendered in UTC using the
/// `"%b %d %H:%M UTC"` format both runs share.
pub fn pack(run: u32, timestamp: DateTime<Utc>, files: &[BlobFile]) -> String {
    let ts = timestamp.format("%b %d %H:%M UTC").to_string();
    let mut out = String::new();
    out.push_str("Start of Record\n");
    out.push_str(&format!("Run Number: {run}\n"));
    out.push_str(&format!("Packed on {ts}\n"));

    for f in order_files(files) {
        out.push('\n');
        out.push_str(DELIM);
        out.push_str(&f.name);
        out.push_str(":\n");
        out.push_str(DELIM);
        out.push_str(&render_content(&f.name, &f.content));
    }

    out.push('\n');
    out.push_str("End of Record\n");
    out.push_str(&format!("Run Number: {run}\n"));
    out.push_str(&format!("Packed on {ts}\n"));
    out
}

/// Parses a blob back into its named file sections by scanning for
/// `#####\n<name>:\n#####\n` delimiters, each section terminated by the
/// start of the next delimiter or by `End of Record`.
pub fn unpack(blob: &str) -> Result<Vec<BlobFile>, ArchiverError> {
    let mut files = Vec::new();
    let mut cursor = 0usize;

    while let Some(delim1_rel) = blob[cursor..].find(DELIM) {
        let delim1 = cursor + delim1_rel;
        let name_start = delim1 + DELIM.len();

        let Some(name_len) = blob[name_start..].find('\n') else {
            break;
        };
        let name_line = &blob[name_start..name_start + name_len];

        let Some(name) = name_line.strip_suffix(':') else {
            cursor = name_start;
            continue;
        };

        let second_delim_start = name_start + name_len + 1;
        if !blob[second_delim_start..].starts_with(DELIM) {
            cursor = name_start;
            continue;
        }

        let content_start = second_delim_start + DELIM.len();
        let next_delim = blob[content_start..].find("\n#####\n").map(|i| content_start + i);
        let end_marker = blob[content_start..]
            .find(END_OF_RECORD_MARKER)
            .map(|i| content_start + i);
        let content_end = match (next_delim, end_marker) {
            (Some(a), Some(b)) => a.min(b),
            (Some(a), None) => a,
            (None, Some(b)) => b,
            (None, None) => blob.len(),
        };

        files.push(BlobFile::new(name, blob[content_start..content_end].as_bytes()));
        cursor = content_end;
    }

    if files.is_empty() {
        return Err(ArchiverError::retriable(
            Some(StageName::Migration),
            None,
            "no file delimiters found in blob",
        ));
    }

    Ok(files)
}

#[cfg(test)]
#[path = "blob_tests.rs"]
mod tests;
