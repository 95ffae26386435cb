//! Test helpers for black-box CLI specifications.
//!
//! These drive the built `rra` binary as a subprocess against a temporary
//! workspace, a fake artdaqDB backed by a shell-script tool, and a fake
//! UconDB backed by a tiny in-process HTTP server.

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic, dead_code)]

use std::collections::HashMap;
use std::io::{BufRead, BufReader, Read, Write};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::path::{Path, PathBuf};
use std::process::{Command, Output};
use std::sync::{Arc, Mutex};

/// Resolves the path to the `rra` binary built alongside the test binary.
fn binary_path(name: &str) -> PathBuf {
    let manifest_dir = Path::new(env!("CARGO_MANIFEST_DIR"));
    let standard = manifest_dir.join("target/debug").join(name);
    if standard.exists() {
        return standard;
    }
    if let Ok(exe) = std::env::current_exe() {
        if let Some(debug_dir) = exe.parent().and_then(|d| d.parent()) {
            let fallback = debug_dir.join(name);
            if fallback.exists() {
                return fallback;
            }
        }
    }
    standard
}

pub fn rra_binary() -> PathBuf {
    binary_path("rra")
}

pub fn rra_cmd(config_path: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::new(rra_binary());
    cmd.arg(config_path);
    cmd.args(args);
    cmd
}

pub trait OutputExt {
    fn stdout_string(&self) -> String;
    fn stderr_string(&self) -> String;
}

impl OutputExt for Output {
    fn stdout_string(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }
    fn stderr_string(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }
}

/// A fake UconDB: list/put/get over HTTP, in-memory, one process-lifetime
/// listener per test. No auth check - the real adapter always sends a
/// Basic-auth header, this server just ignores it.
pub struct FakeUcon {
    addr: SocketAddr,
    store: Arc<Mutex<HashMap<u32, String>>>,
}

impl FakeUcon {
    pub fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind fake UconDB listener");
        let addr = listener.local_addr().expect("local addr");
        let store = Arc::new(Mutex::new(HashMap::new()));
        let store_for_thread = Arc::clone(&store);
        std::thread::spawn(move || {
            for stream in listener.incoming() {
                let Ok(stream) = stream else { continue };
                let store = Arc::clone(&store_for_thread);
                std::thread::spawn(move || {
                    let _ = handle_connection(stream, &store);
                });
            }
        });
        FakeUcon { addr, store }
    }

    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// Pre-seed a run as already uploaded, to test the key-collision path.
    pub fn seed(&self, run: u32, blob: &str) {
        self.store.lock().expect("store lock").insert(run, blob.to_string());
    }

    pub fn contains(&self, run: u32) -> bool {
        self.store.lock().expect("store lock").contains_key(&run)
    }

    pub fn get(&self, run: u32) -> Option<String> {
        self.store.lock().expect("store lock").get(&run).cloned()
    }
}

fn handle_connection(mut stream: TcpStream, store: &Arc<Mutex<HashMap<u32, String>>>) -> std::io::Result<()> {
    let mut reader = BufReader::new(stream.try_clone()?);
    let mut request_line = String::new();
    reader.read_line(&mut request_line)?;
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or("").to_string();
    let target = parts.next().unwrap_or("").to_string();

    let mut content_length: usize = 0;
    loop {
        let mut line = String::new();
        reader.read_line(&mut line)?;
        if line == "\r\n" || line.is_empty() {
            break;
        }
        if let Some(rest) = line.to_ascii_lowercase().strip_prefix("content-length:") {
            content_length = rest.trim().parse().unwrap_or(0);
        }
    }
    let mut body = vec![0u8; content_length];
    if content_length > 0 {
        reader.read_exact(&mut body)?;
    }
    let body = String::from_utf8_lossy(&body).into_owned();

    let (status, response_body) = route(&method, &target, body, store);
    write_response(&mut stream, status, &response_body)
}

fn route(method: &str, target: &str, body: String, store: &Arc<Mutex<HashMap<u32, String>>>) -> (u16, String) {
    if let Some(rest) = target.strip_prefix("/list/") {
        let _ = rest;
        let store = store.lock().expect("store lock");
        let mut keys: Vec<u32> = store.keys().copied().collect();
        keys.sort_unstable();
        let body = keys.iter().map(u32::to_string).collect::<Vec<_>>().join("\n");
        return (200, body);
    }
    if let Some(run) = extract_key(target) {
        match method {
            "PUT" => {
                let mut store = store.lock().expect("store lock");
                if store.contains_key(&run) {
                    return (409, "already exists".to_string());
                }
                store.insert(run, body);
                return (201, String::new());
            }
            "GET" => {
                let store = store.lock().expect("store lock");
                return match store.get(&run) {
                    Some(blob) => (200, blob.clone()),
                    None => (404, "not found".to_string()),
                };
            }
            _ => {}
        }
    }
    (404, "not found".to_string())
}

fn extract_key(target: &str) -> Option<u32> {
    let key_part = target.rsplit('/').next()?;
    key_part.strip_prefix("key=")?.parse().ok()
}

fn write_response(stream: &mut TcpStream, status: u16, body: &str) -> std::io::Result<()> {
    let reason = match status {
        200 => "OK",
        201 => "Created",
        404 => "Not Found",
        409 => "Conflict",
        _ => "Error",
    };
    let response = format!(
        "HTTP/1.1 {status} {reason}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{body}",
        body.len()
    );
    stream.write_all(response.as_bytes())?;
    stream.flush()
}

/// A temporary archiver workspace: run-records filesystem source, scratch
/// root, state dir, a fake artdaqDB (a plain directory plus a shell-script
/// tool that lists/archives/exports against it), and an FCL conf dir.
pub struct Workspace {
    dir: tempfile::TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let dir = tempfile::tempdir().expect("tempdir");
        let ws = Workspace { dir };
        std::fs::create_dir_all(ws.run_records_dir()).unwrap();
        std::fs::create_dir_all(ws.scratch_root()).unwrap();
        std::fs::create_dir_all(ws.state_dir()).unwrap();
        std::fs::create_dir_all(ws.artdaq_store_dir()).unwrap();
        std::fs::create_dir_all(ws.fcl_conf_dir()).unwrap();
        std::fs::write(ws.fcl_conf_dir().join("schema.fcl"), "schema: \"v1\"\n").unwrap();
        ws.write_tool_script();
        ws
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }
    pub fn run_records_dir(&self) -> PathBuf {
        self.path().join("run_records")
    }
    pub fn scratch_root(&self) -> PathBuf {
        self.path().join("scratch")
    }
    pub fn state_dir(&self) -> PathBuf {
        self.path().join("state")
    }
    pub fn lock_path(&self) -> PathBuf {
        self.path().join("archiver.lock")
    }
    pub fn artdaq_store_dir(&self) -> PathBuf {
        self.path().join("artdaqdb-store")
    }
    pub fn fcl_conf_dir(&self) -> PathBuf {
        self.path().join("fcl_conf")
    }
    pub fn tool_path(&self) -> PathBuf {
        self.path().join("artdaqdb-tool.sh")
    }

    fn write_tool_script(&self) {
        let script = r#"#!/bin/sh
set -e
cmd="$1"
shift
db="$ARTDAQ_DATABASE_URI"
case "$cmd" in
  list-runs)
    ls "$db" 2>/dev/null | grep -E '^[0-9]+$' || true
    ;;
  archive-run)
    run="$1"; shift
    source_dir=""
    while [ $# -gt 0 ]; do
      case "$1" in
        --source-dir) source_dir="$2"; shift 2 ;;
        --config-name) shift 2 ;;
        --update) shift ;;
        *) shift ;;
      esac
    done
    mkdir -p "$db/$run"
    cp -r "$source_dir"/. "$db/$run"/
    ;;
  export-run)
    run="$1"; shift
    dest=""
    while [ $# -gt 0 ]; do
      case "$1" in
        --destination-dir) dest="$2"; shift 2 ;;
        *) shift ;;
      esac
    done
    if [ ! -d "$db/$run" ]; then
      echo "run $run not archived" >&2
      exit 1
    fi
    mkdir -p "$dest"
    cp -r "$db/$run"/. "$dest"/
    ;;
  *)
    echo "unknown subcommand $cmd" >&2
    exit 1
    ;;
esac
"#;
        std::fs::write(self.tool_path(), script).unwrap();
        let mut perms = std::fs::metadata(self.tool_path()).unwrap().permissions();
        std::os::unix::fs::PermissionsExt::set_mode(&mut perms, 0o755);
        std::fs::set_permissions(self.tool_path(), perms).unwrap();
    }

    /// Writes a run record directory with a minimal `metadata.txt`.
    pub fn add_run(&self, run: u32, config_name: &str) {
        let run_dir = self.run_records_dir().join(run.to_string());
        std::fs::create_dir_all(&run_dir).unwrap();
        std::fs::write(run_dir.join("metadata.txt"), format!("Config name: {config_name}\n")).unwrap();
    }

    /// Marks a run as already archived in the fake artdaqDB, bypassing
    /// Import, for tests that only exercise Migrate.
    pub fn seed_artdaq(&self, run: u32, config_name: &str) {
        let dir = self.artdaq_store_dir().join(run.to_string());
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join("metadata.fcl"), format!("configuration: \"{config_name}\"\n")).unwrap();
        std::fs::write(dir.join("schema.fcl"), "schema: \"v1\"\n").unwrap();
    }

    /// Writes `config.yaml` pointing at this workspace and the given fake
    /// UconDB server, returning its path.
    pub fn write_config(&self, ucon: &FakeUcon) -> PathBuf {
        let config_path = self.path().join("config.yaml");
        let yaml = format!(
            r#"
run_records_dir: {run_records_dir}
scratch_root: {scratch_root}
state_dir: {state_dir}
lock_path: {lock_path}
batch_size: 10
parallel_workers: 2
run_process_retries: 1
retry_delay_seconds: 0
artdaqdb:
  tool_path: {tool_path}
  database_uri: {artdaq_store_dir}
ucondb:
  server_url: {server_url}
  folder_name: run_records
  object_name: run_config
  writer_user: writer
  writer_password: secret
fcl_conf_dir: {fcl_conf_dir}
"#,
            run_records_dir = self.run_records_dir().display(),
            scratch_root = self.scratch_root().display(),
            state_dir = self.state_dir().display(),
            lock_path = self.lock_path().display(),
            tool_path = self.tool_path().display(),
            artdaq_store_dir = self.artdaq_store_dir().display(),
            server_url = ucon.url(),
            fcl_conf_dir = self.fcl_conf_dir().display(),
        );
        std::fs::write(&config_path, yaml).unwrap();
        config_path
    }

    pub fn import_state(&self) -> serde_json::Value {
        read_json(self.state_dir().join("import-state.json"))
    }
    pub fn migrate_state(&self) -> serde_json::Value {
        read_json(self.state_dir().join("migrate-state.json"))
    }
    pub fn import_failures(&self) -> Vec<u32> {
        read_lines_as_u32(self.state_dir().join("import-failures.log"))
    }
    pub fn migrate_failures(&self) -> Vec<u32> {
        read_lines_as_u32(self.state_dir().join("migrate-failures.log"))
    }
}

fn read_json(path: PathBuf) -> serde_json::Value {
    let text = std::fs::read_to_string(path).unwrap_or_else(|_| "{}".to_string());
    serde_json::from_str(&text).unwrap_or(serde_json::Value::Null)
}

fn read_lines_as_u32(path: PathBuf) -> Vec<u32> {
    std::fs::read_to_string(path)
        .unwrap_or_default()
        .lines()
        .filter_map(|line| line.trim().parse::<u32>().ok())
        .collect()
}
