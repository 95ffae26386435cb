//! The single-instance process lock: a second invocation while the lock
//! file is held must fail cleanly rather than racing the first.

use crate::prelude::*;
use fs2::FileExt;

#[test]
fn held_lock_is_reported_and_exits_one() {
    let ws = Workspace::new();
    let ucon = FakeUcon::start();
    let config_path = ws.write_config(&ucon);

    std::fs::create_dir_all(ws.lock_path().parent().unwrap()).unwrap();
    let lock_file = std::fs::OpenOptions::new().create(true).write(true).open(ws.lock_path()).unwrap();
    lock_file.lock_exclusive().unwrap();

    let output = rra_cmd(&config_path, &["--report-status"]).output().expect("run rra");
    assert_eq!(output.status.code(), Some(1));
    assert!(output.stderr_string().to_lowercase().contains("lock"), "stderr: {}", output.stderr_string());

    FileExt::unlock(&lock_file).unwrap();
}
