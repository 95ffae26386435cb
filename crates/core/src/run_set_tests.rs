use super::*;

fn set(runs: &[u32]) -> BTreeSet<u32> {
    runs.iter().copied().collect()
}

#[test]
fn empty_set_yields_no_ranges_or_gaps() {
    assert_eq!(compute_ranges_and_gaps(&BTreeSet::new()), (Vec::new(), Vec::new()));
}

#[test]
fn contiguous_run_is_a_single_range_with_no_gaps() {
    let (ranges, gaps) = compute_ranges_and_gaps(&set(&[1, 2, 3, 4]));
    assert_eq!(ranges, vec![(1, 4)]);
    assert!(gaps.is_empty());
}

#[test]
fn single_run_is_a_degenerate_range() {
    let (ranges, gaps) = compute_ranges_and_gaps(&set(&[42]));
    assert_eq!(ranges, vec![(42, 42)]);
    assert!(gaps.is_empty());
}

#[test]
fn gap_in_the_middle_splits_ranges_and_is_listed() {
    let (ranges, gaps) = compute_ranges_and_gaps(&set(&[1, 2, 5, 6, 7]));
    assert_eq!(ranges, vec![(1, 2), (5, 7)]);
    assert_eq!(gaps, vec![3, 4]);
}

#[test]
fn format_ranges_collapses_singletons() {
    assert_eq!(format_ranges(&[(1, 1), (3, 5)], 10), "1, 3-5");
}

#[test]
fn format_ranges_empty_is_none() {
    assert_eq!(format_ranges(&[], 10), "None");
}

#[test]
fn format_ranges_truncates_with_total_count() {
    let ranges: Vec<(u32, u32)> = (0..20).map(|i| (i, i)).collect();
    let out = format_ranges(&ranges, 4);
    assert!(out.starts_with("0, 1 ... 18, 19"));
    assert!(out.ends_with("(20 ranges total)"));
}

#[test]
fn format_gaps_truncates_with_total_count() {
    let gaps: Vec<u32> = (0..30).collect();
    let out = format_gaps(&gaps, 5);
    assert!(out.starts_with("0, 1, 2, 3, 4 ..."));
    assert!(out.ends_with("(30 gaps total)"));
}

#[test]
fn format_gaps_empty_is_none() {
    assert_eq!(format_gaps(&[], 20), "None");
}

#[test]
fn longest_contiguous_prefix_end_stops_at_first_gap() {
    assert_eq!(longest_contiguous_prefix_end(&[5, 6, 7, 9, 10]), 7);
}

#[test]
fn longest_contiguous_prefix_end_single_element() {
    assert_eq!(longest_contiguous_prefix_end(&[42]), 42);
}

#[test]
fn longest_contiguous_prefix_end_fully_contiguous() {
    assert_eq!(longest_contiguous_prefix_end(&[1, 2, 3, 4]), 4);
}
