//! Redistribution provenance validator.
//!
//! In a redistributed folder, the line ranges recorded in
//! `_redist_info.json` for each output grid must cover `0..count` of that
//! grid exactly once, where `count` comes from the folder's `_info.json`.

use std::collections::BTreeMap;
use std::path::Path;

use anyhow::Result;
use radiance_folder::partition::{GRID_INFO_FILE, REDIST_INFO_FILE};
use radiance_folder::writer::read_json;
use radiance_folder::{DistributionRecord, GridRecord};
use walkdir::WalkDir;

use crate::report::{CheckReport, CheckResult};

const VALIDATOR: &str = "redist";

/// Checks that sorted `(start, end)` ranges tile `0..count`.
fn tiling_gap(ranges: &mut [(usize, usize)], count: usize) -> Option<String> {
    ranges.sort_unstable();
    let mut next = 0;
    for &(start, end) in ranges.iter() {
        if start != next {
            return Some(format!("expected line {next}, range starts at {start}"));
        }
        if end < start {
            return Some(format!("range {start}..={end} is inverted"));
        }
        next = end + 1;
    }
    (next != count).then(|| format!("ranges end at line {next}, count is {count}"))
}

/// Validates the provenance records of a redistributed folder.
///
/// # Errors
///
/// Never fails; missing or invalid files are reported as failures.
pub fn validate(folder: &Path) -> Result<CheckReport> {
    let mut report = CheckReport::new();

    let records: Vec<DistributionRecord> = match read_json(&folder.join(REDIST_INFO_FILE)) {
        Ok(records) => records,
        Err(e) => {
            report.push(CheckResult::fail(VALIDATOR, e.to_string()));
            return Ok(report);
        }
    };
    let outputs: Vec<GridRecord> = match read_json(&folder.join(GRID_INFO_FILE)) {
        Ok(outputs) => outputs,
        Err(e) => {
            report.push(CheckResult::fail(VALIDATOR, e.to_string()));
            return Ok(report);
        }
    };

    let mut ranges: BTreeMap<String, Vec<(usize, usize)>> = BTreeMap::new();
    for record in &records {
        for segment in &record.segments {
            ranges
                .entry(segment.output.to_string())
                .or_default()
                .push((segment.start_line, segment.end_line));
        }
    }

    let mut problems = Vec::new();
    for output in &outputs {
        let mut output_ranges = ranges.remove(&output.identifier).unwrap_or_default();
        if let Some(gap) = tiling_gap(&mut output_ranges, output.count) {
            problems.push(format!("output {}: {gap}", output.identifier));
        }
    }
    for identifier in ranges.keys() {
        problems.push(format!("output {identifier}: not in {GRID_INFO_FILE}"));
    }

    if problems.is_empty() {
        report.push(CheckResult::pass(
            VALIDATOR,
            format!(
                "{} records tile {} output grids exactly",
                records.len(),
                outputs.len()
            ),
        ));
    } else {
        report.push(CheckResult::fail_with_details(
            VALIDATOR,
            format!("{} provenance problems", problems.len()),
            problems,
        ));
    }

    let stray: Vec<String> = WalkDir::new(folder)
        .max_depth(1)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter_map(|e| {
            let stem = e.path().file_stem()?.to_string_lossy().into_owned();
            let numbered = !stem.is_empty() && stem.bytes().all(|b| b.is_ascii_digit());
            (numbered && !outputs.iter().any(|o| o.identifier == stem))
                .then(|| e.path().display().to_string())
        })
        .collect();
    if !stray.is_empty() {
        report.push(CheckResult::warn_with_details(
            VALIDATOR,
            format!("{} numbered grid files are not in {GRID_INFO_FILE}", stray.len()),
            stray,
        ));
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn contiguous_ranges_tile() {
        assert_eq!(tiling_gap(&mut [(4, 9), (0, 3)], 10), None);
    }

    #[test]
    fn gaps_and_overlaps_are_reported() {
        assert!(tiling_gap(&mut [(0, 3), (5, 9)], 10).is_some());
        assert!(tiling_gap(&mut [(0, 5), (5, 9)], 10).is_some());
        assert!(tiling_gap(&mut [(0, 8)], 10).is_some());
        assert!(tiling_gap(&mut [], 1).is_some());
    }
}
