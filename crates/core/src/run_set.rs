// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Pure set arithmetic over run numbers: contiguous-range compression and
//! gap detection, used by the status reporter to summarize a data source
//! without dumping every run number it holds.

use std::collections::BTreeSet;

/// Compresses a set of run numbers into `(start, end)` inclusive ranges and
/// lists the runs missing from the span between the lowest and highest run
/// present. Returns `(vec![], vec![])` for an empty input.
pub fn compute_ranges_and_gaps(runs: &BTreeSet<u32>) -> (Vec<(u32, u32)>, Vec<u32>) {
    let Some(&min_run) = runs.iter().next() else {
        return (Vec::new(), Vec::new());
    };
    #[allow(clippy::expect_used)]
    let &max_run = runs.iter().next_back().expect("non-empty set has a last element");

    let gaps: Vec<u32> = (min_run..=max_run).filter(|r| !runs.contains(r)).collect();

    let mut ranges = Vec::new();
    let mut sorted = runs.iter().copied();
    #[allow(clippy::expect_used)]
    let first = sorted.next().expect("non-empty set has a first element");
    let mut range_start = first;
    let mut prev = first;
    for run in sorted {
        if run != prev + 1 {
            ranges.push((range_start, prev));
            range_start = run;
        }
        prev = run;
    }
    ranges.push((range_start, prev));

    (ranges, gaps)
}

/// The end of the longest run of consecutive integers starting at
/// `sorted[0]`, used by state recovery to rebuild `last_contiguous_run`
/// directly from an authoritative source rather than by advancing a prior
/// value. Panics if `sorted` is empty; callers handle the empty source
/// separately (recovery writes zeroed state in that case).
pub fn longest_contiguous_prefix_end(sorted: &[u32]) -> u32 {
    let mut iter = sorted.iter().copied();
    #[allow(clippy::expect_used)]
    let mut prev = iter.next().expect("longest_contiguous_prefix_end requires a non-empty slice");
    for run in iter {
        if run == prev + 1 {
            prev = run;
        } else {
            break;
        }
    }
    prev
}

fn range_str(start: u32, end: u32) -> String {
    if start == end {
        start.to_string()
    } else {
        format!("{start}-{end}")
    }
}

/// Renders ranges for display, truncating to the first/last halves of
/// `max_display` when there are more ranges than that.
pub fn format_ranges(ranges: &[(u32, u32)], max_display: usize) -> String {
    if ranges.is_empty() {
        return "None".to_string();
    }
    if ranges.len() <= max_display {
        return ranges.iter().map(|&(s, e)| range_str(s, e)).collect::<Vec<_>>().join(", ");
    }
    let half = max_display / 2;
    let first: Vec<String> = ranges[..half].iter().map(|&(s, e)| range_str(s, e)).collect();
    let last: Vec<String> = ranges[ranges.len() - half..].iter().map(|&(s, e)| range_str(s, e)).collect();
    format!("{} ... {} ({} ranges total)", first.join(", "), last.join(", "), ranges.len())
}

/// Renders gaps for display, truncating to the first `max_display` entries.
pub fn format_gaps(gaps: &[u32], max_display: usize) -> String {
    if gaps.is_empty() {
        return "None".to_string();
    }
    if gaps.len() <= max_display {
        return gaps.iter().map(u32::to_string).collect::<Vec<_>>().join(", ");
    }
    let displayed: Vec<String> = gaps[..max_display].iter().map(u32::to_string).collect();
    format!("{} ... ({} gaps total)", displayed.join(", "), gaps.len())
}

#[cfg(test)]
#[path = "run_set_tests.rs"]
mod tests;
