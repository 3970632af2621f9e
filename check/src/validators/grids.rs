//! Grid inventory validator.
//!
//! Each inventory record must point at a grid file holding exactly `count`
//! lines. Grid files that no record points at are reported as warnings.

use std::collections::HashSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use anyhow::{Context, Result};
use radiance_folder::ModelFolder;
use regex::Regex;
use walkdir::WalkDir;

use crate::report::{CheckReport, CheckResult};

const VALIDATOR: &str = "grids";

/// Number of lines in a file. A final line without a newline counts.
fn line_count(path: &Path) -> Result<usize> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let mut count = 0;
    for line in BufReader::new(file).split(b'\n') {
        line.with_context(|| format!("Failed to read {}", path.display()))?;
        count += 1;
    }
    Ok(count)
}

/// Validates the grid inventory of `folder` against the grid files.
///
/// # Errors
///
/// Returns an error if the grid pattern is invalid or a grid file cannot be read.
pub fn validate(folder: &ModelFolder) -> Result<CheckReport> {
    let mut report = CheckReport::new();
    let grid_folder = folder.grid_folder(true);
    if !grid_folder.is_dir() {
        report.push(CheckResult::pass(VALIDATOR, "No grid folder in model folder"));
        return Ok(report);
    }

    let grids = match folder.grid_info(false) {
        Ok(grids) => grids,
        Err(e) => {
            report.push(CheckResult::fail(VALIDATOR, format!("Invalid inventory: {e}")));
            return Ok(report);
        }
    };

    let pattern = &folder.config().grid.pattern;
    let regex = Regex::new(pattern).with_context(|| format!("Invalid grid pattern {pattern}"))?;
    let extension = pattern
        .trim_end_matches('$')
        .rsplit_once(r"\.")
        .map_or("pts", |(_, ext)| ext);

    let mut known = HashSet::new();
    let mut mismatched = Vec::new();
    for grid in &grids {
        let path = grid_folder.join(format!("{}.{extension}", grid.file_stem()));
        known.insert(path.clone());
        if !path.is_file() {
            mismatched.push(format!("{}: missing {}", grid.identifier, path.display()));
            continue;
        }
        let lines = line_count(&path)?;
        if lines != grid.count {
            mismatched.push(format!(
                "{}: inventory count {} but {lines} lines",
                grid.identifier, grid.count
            ));
        }
    }

    if mismatched.is_empty() {
        report.push(CheckResult::pass(
            VALIDATOR,
            format!("{} grids match their inventory counts", grids.len()),
        ));
    } else {
        report.push(CheckResult::fail_with_details(
            VALIDATOR,
            format!("{} grids do not match the inventory", mismatched.len()),
            mismatched,
        ));
    }

    let orphans: Vec<String> = WalkDir::new(&grid_folder)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| regex.is_match(&e.file_name().to_string_lossy()))
        .filter(|e| !known.contains(e.path()))
        .map(|e| e.path().display().to_string())
        .collect();
    if !orphans.is_empty() {
        report.push(CheckResult::warn_with_details(
            VALIDATOR,
            format!("{} grid files are not in the inventory", orphans.len()),
            orphans,
        ));
    }

    Ok(report)
}
