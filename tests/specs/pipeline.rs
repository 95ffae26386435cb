//! End-to-end pipeline scenarios against a fake artdaqDB (shell-script
//! tool backed by a plain directory) and a fake UconDB (in-process HTTP).

use crate::prelude::*;

#[test]
fn happy_path_small_batch_advances_both_stages_contiguously() {
    let ws = Workspace::new();
    let ucon = FakeUcon::start();
    ws.add_run(1, "standard");
    ws.add_run(2, "standard");
    ws.add_run(3, "standard");
    let config_path = ws.write_config(&ucon);

    let output = rra_cmd(&config_path, &[]).output().expect("run rra");
    assert_eq!(output.status.code(), Some(0), "stdout: {}\nstderr: {}", output.stdout_string(), output.stderr_string());

    assert_eq!(ws.import_state()["last_contiguous_run"], 3);
    assert_eq!(ws.import_state()["last_attempted_run"], 3);
    assert!(ws.import_failures().is_empty());

    assert_eq!(ws.migrate_state()["last_contiguous_run"], 3);
    assert_eq!(ws.migrate_state()["last_attempted_run"], 3);
    assert!(ws.migrate_failures().is_empty());

    assert!(ucon.contains(1));
    assert!(ucon.contains(2));
    assert!(ucon.contains(3));
}

#[test]
fn gap_in_filesystem_runs_stops_contiguous_advance_at_the_gap() {
    let ws = Workspace::new();
    let ucon = FakeUcon::start();
    ws.add_run(1, "standard");
    ws.add_run(2, "standard");
    ws.add_run(4, "standard");
    let config_path = ws.write_config(&ucon);

    let output = rra_cmd(&config_path, &[]).output().expect("run rra");
    assert_eq!(output.status.code(), Some(0), "stdout: {}\nstderr: {}", output.stdout_string(), output.stderr_string());

    assert_eq!(ws.import_state()["last_contiguous_run"], 2);
    assert_eq!(ws.import_state()["last_attempted_run"], 4);
    assert!(ws.import_failures().is_empty());
}

#[test]
fn migrate_only_reconciles_an_already_archived_run_against_empty_ucondb() {
    let ws = Workspace::new();
    let ucon = FakeUcon::start();
    ws.seed_artdaq(5, "standard");
    let config_path = ws.write_config(&ucon);

    let output = rra_cmd(&config_path, &["--migrate-only"]).output().expect("run rra");
    assert_eq!(output.status.code(), Some(0), "stdout: {}\nstderr: {}", output.stdout_string(), output.stderr_string());
    // Run 5 has no predecessors in UconDB, so it advances `last_attempted_run`
    // but - being a gap relative to the prior `last_contiguous_run` of 0 -
    // does not advance `last_contiguous_run` past it.
    assert_eq!(ws.migrate_state()["last_contiguous_run"], 0);
    assert_eq!(ws.migrate_state()["last_attempted_run"], 5);
    assert!(ws.migrate_failures().is_empty());
    assert!(ucon.contains(5));
}
