// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! YAML configuration loading: parses `config.yaml` into the typed settings
//! each adapter and the engine need, expanding `${...}` references against
//! both other scalar config values and the process environment.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use rra_adapters::{ArtdaqDbConfig, CarbonConfig, FclPreparerConfig, UconDbConfig};
use rra_core::ArchiverError;
use rra_engine::PipelineConfig;
use serde::Deserialize;

const MAX_EXPANSION_DEPTH: usize = 16;

#[derive(Debug, Deserialize)]
struct RawConfig {
    run_records_dir: String,
    scratch_root: String,
    state_dir: String,
    lock_path: String,

    #[serde(default = "default_batch_size")]
    batch_size: usize,
    #[serde(default = "default_parallel_workers")]
    parallel_workers: usize,
    #[serde(default = "default_run_process_retries")]
    run_process_retries: u32,
    #[serde(default = "default_retry_delay_seconds")]
    retry_delay_seconds: u64,

    artdaqdb: RawArtdaqDb,
    ucondb: RawUconDb,
    fcl_conf_dir: String,
    carbon: Option<RawCarbon>,
    validator_params: Option<Vec<(String, String)>>,
}

#[derive(Debug, Deserialize)]
struct RawArtdaqDb {
    tool_path: String,
    database_uri: String,
    remote_host: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawUconDb {
    server_url: String,
    folder_name: String,
    object_name: String,
    writer_user: String,
    writer_password: String,
}

#[derive(Debug, Deserialize)]
struct RawCarbon {
    host: String,
    port: u16,
    #[serde(default = "default_metric_prefix")]
    metric_prefix: String,
}

fn default_batch_size() -> usize {
    500
}
fn default_parallel_workers() -> usize {
    4
}
fn default_run_process_retries() -> u32 {
    2
}
fn default_retry_delay_seconds() -> u64 {
    5
}
fn default_metric_prefix() -> String {
    "archiver".to_string()
}

/// Everything the orchestrator needs, assembled from one YAML file.
pub struct ArchiverConfig {
    pub pipeline: PipelineConfig,
    pub artdaqdb: ArtdaqDbConfig,
    pub ucondb: UconDbConfig,
    pub preparer: FclPreparerConfig,
    pub carbon: Option<CarbonConfig>,
}

/// Loads and expands `path`, producing the fully resolved configuration.
pub fn load(path: &Path) -> Result<ArchiverConfig, ArchiverError> {
    let text = std::fs::read_to_string(path)
        .map_err(|err| ArchiverError::Configuration(format!("could not read config file '{}': {err}", path.display())))?;
    let value: serde_yaml::Value =
        serde_yaml::from_str(&text).map_err(|err| ArchiverError::Configuration(format!("malformed YAML in '{}': {err}", path.display())))?;

    let mut scalars = HashMap::new();
    flatten_scalars("", &value, &mut scalars);
    let expanded = expand_value(&value, &scalars)?;

    let raw: RawConfig = serde_yaml::from_value(expanded)
        .map_err(|err| ArchiverError::Configuration(format!("config '{}' is missing a required setting: {err}", path.display())))?;

    Ok(ArchiverConfig {
        pipeline: PipelineConfig {
            batch_size: raw.batch_size,
            parallel_workers: raw.parallel_workers,
            run_process_retries: raw.run_process_retries,
            retry_delay: Duration::from_secs(raw.retry_delay_seconds),
            run_records_dir: PathBuf::from(raw.run_records_dir),
            scratch_root: PathBuf::from(raw.scratch_root),
            import_state_path: Path::new(&raw.state_dir).join("import-state.json"),
            import_failure_log_path: Path::new(&raw.state_dir).join("import-failures.log"),
            migrate_state_path: Path::new(&raw.state_dir).join("migrate-state.json"),
            migrate_failure_log_path: Path::new(&raw.state_dir).join("migrate-failures.log"),
            lock_path: PathBuf::from(raw.lock_path),
            validate: false,
            validator_params: raw.validator_params.unwrap_or_else(rra_engine::default_validator_params),
        },
        artdaqdb: ArtdaqDbConfig {
            tool_path: raw.artdaqdb.tool_path,
            database_uri: raw.artdaqdb.database_uri,
            remote_host: raw.artdaqdb.remote_host,
        },
        ucondb: UconDbConfig {
            server_url: raw.ucondb.server_url,
            folder_name: raw.ucondb.folder_name,
            object_name: raw.ucondb.object_name,
            writer_user: raw.ucondb.writer_user,
            writer_password: raw.ucondb.writer_password,
        },
        preparer: FclPreparerConfig { fcl_conf_dir: PathBuf::from(raw.fcl_conf_dir) },
        carbon: raw.carbon.map(|c| CarbonConfig { host: c.host, port: c.port, metric_prefix: c.metric_prefix }),
    })
}

/// Collects every scalar (string/number/bool) under its dotted path, e.g.
/// `ucondb.server_url`, so `${ucondb.server_url}` can be used elsewhere in
/// the document.
fn flatten_scalars(prefix: &str, value: &serde_yaml::Value, out: &mut HashMap<String, String>) {
    match value {
        serde_yaml::Value::Mapping(map) => {
            for (key, val) in map {
                let Some(key) = key.as_str() else { continue };
                let path = if prefix.is_empty() { key.to_string() } else { format!("{prefix}.{key}") };
                flatten_scalars(&path, val, out);
            }
        }
        serde_yaml::Value::String(s) => {
            out.insert(prefix.to_string(), s.clone());
        }
        serde_yaml::Value::Number(n) => {
            out.insert(prefix.to_string(), n.to_string());
        }
        serde_yaml::Value::Bool(b) => {
            out.insert(prefix.to_string(), b.to_string());
        }
        _ => {}
    }
}

fn expand_value(value: &serde_yaml::Value, scalars: &HashMap<String, String>) -> Result<serde_yaml::Value, ArchiverError> {
    match value {
        serde_yaml::Value::Mapping(map) => {
            let mut out = serde_yaml::Mapping::new();
            for (key, val) in map {
                out.insert(key.clone(), expand_value(val, scalars)?);
            }
            Ok(serde_yaml::Value::Mapping(out))
        }
        serde_yaml::Value::Sequence(seq) => {
            let mut out = Vec::with_capacity(seq.len());
            for val in seq {
                out.push(expand_value(val, scalars)?);
            }
            Ok(serde_yaml::Value::Sequence(out))
        }
        serde_yaml::Value::String(s) => {
            let mut seen = Vec::new();
            Ok(serde_yaml::Value::String(expand_string(s, scalars, &mut seen)?))
        }
        other => Ok(other.clone()),
    }
}

/// Expands `${key}` references in `input`, where `key` resolves first
/// against other scalar config values, then against the process
/// environment. `seen` tracks the reference chain so a cycle (`a` refers to
/// `b` refers to `a`) fails with a configuration error instead of looping.
fn expand_string(input: &str, scalars: &HashMap<String, String>, seen: &mut Vec<String>) -> Result<String, ArchiverError> {
    if seen.len() > MAX_EXPANSION_DEPTH {
        return Err(ArchiverError::Configuration(format!("reference chain too deep expanding '{input}', possible cycle in {seen:?}")));
    }

    let mut result = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            result.push_str(rest);
            rest = "";
            break;
        };
        result.push_str(&rest[..start]);
        let key = &rest[start + 2..start + end];

        if seen.iter().any(|k| k == key) {
            return Err(ArchiverError::Configuration(format!("circular reference in config expansion: {} -> {key}", seen.join(" -> "))));
        }

        let resolved = if let Some(value) = scalars.get(key) {
            seen.push(key.to_string());
            let expanded = expand_string(value, scalars, seen)?;
            seen.pop();
            expanded
        } else {
            std::env::var(key).map_err(|_| ArchiverError::Configuration(format!("unresolved reference '${{{key}}}': no such config key or environment variable")))?
        };

        result.push_str(&resolved);
        rest = &rest[start + end + 1..];
    }
    result.push_str(rest);
    Ok(result)
}

#[cfg(test)]
#[path = "config_tests.rs"]
mod tests;
