use super::*;
use tempfile::tempdir;

#[test]
fn acquire_creates_parent_dir_and_writes_pid() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("nested").join("archiver.lock");
    let lock = ProcessLock::acquire(&path).unwrap();
    assert_eq!(lock.pid(), std::process::id());
    let contents = std::fs::read_to_string(&path).unwrap();
    assert_eq!(contents.trim().parse::<u32>().unwrap(), std::process::id());
}

#[test]
fn second_acquire_fails_while_first_is_held() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("archiver.lock");
    let _lock = ProcessLock::acquire(&path).unwrap();
    let second = ProcessLock::acquire(&path);
    assert!(matches!(second, Err(LockError::AlreadyHeld(_))));
}

#[test]
fn lock_is_reacquirable_after_drop() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("archiver.lock");
    {
        let _lock = ProcessLock::acquire(&path).unwrap();
    }
    assert!(ProcessLock::acquire(&path).is_ok());
}

#[test]
fn is_valid_true_while_file_and_pid_match() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("archiver.lock");
    let lock = ProcessLock::acquire(&path).unwrap();
    assert!(lock.is_valid());
}

#[test]
fn is_valid_false_after_external_removal() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("archiver.lock");
    let lock = ProcessLock::acquire(&path).unwrap();
    std::fs::remove_file(&path).unwrap();
    assert!(!lock.is_valid());
}

#[test]
fn is_valid_false_when_pid_overwritten() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("archiver.lock");
    let lock = ProcessLock::acquire(&path).unwrap();
    std::fs::write(&path, "999999999\n").unwrap();
    assert!(!lock.is_valid());
}
