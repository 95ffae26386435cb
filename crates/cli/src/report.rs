// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Renders a completion banner to stdout for every run outcome, matching
//! the exit-code story in `main`: a clear statement of what happened before
//! the process exits.

use rra_engine::{BatchReport, RecoveryReport, RunOutcome, StatusReport};

pub fn print(outcome: &RunOutcome) {
    match outcome {
        RunOutcome::Batch(reports) => {
            for report in reports {
                print_batch(report);
            }
        }
        RunOutcome::Status(status) => print_status(status),
        RunOutcome::Recovery(report) => print_recovery(report),
        RunOutcome::Nothing => {}
    }
}

fn print_batch(report: &BatchReport) {
    let banner = if report.is_success() && report.cancelled == 0 { "SUCCESS" } else { "FAILED" };
    println!(
        "==== {banner} ==== successful={} failed={} cancelled={}",
        report.successful.len(),
        report.failed.len(),
        report.cancelled
    );
    if !report.failed.is_empty() {
        println!("failed runs: {:?}", report.failed);
    }
}

fn print_status(status: &StatusReport) {
    println!("filesystem: {} runs ({})", status.fs.total, status.fs.ranges);
    println!("artdaqDB:   {} runs ({})", status.artdaq.total, status.artdaq.ranges);
    println!("UconDB:     {} runs ({})", status.ucon.total, status.ucon.ranges);
    for recommendation in &status.recommendations {
        println!("- {recommendation}");
    }
    if let Some(comparison) = &status.state_comparison {
        println!(
            "import missing before contiguous: {:?}",
            comparison.import_missing_before_contiguous
        );
        println!(
            "migrate missing before contiguous: {:?}",
            comparison.migrate_missing_before_contiguous
        );
        println!("import failure log: {:?}", comparison.import_failure_log);
        println!("migrate failure log: {:?}", comparison.migrate_failure_log);
    }
}

fn print_recovery(report: &RecoveryReport) {
    println!(
        "==== RECOVERED ==== last_contiguous_run={} last_attempted_run={} missing={}",
        report.last_contiguous_run,
        report.last_attempted_run,
        report.missing.len()
    );
}
