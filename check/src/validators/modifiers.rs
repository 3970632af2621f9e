//! Modifier matching validator.
//!
//! Every scene and static aperture geometry file needs a modifier file and a
//! black modifier file with the same stem. Aperture groups need a black file
//! on their default state.

use anyhow::Result;
use radiance_folder::{Error, ModelFolder};

use crate::report::{CheckReport, CheckResult};

const VALIDATOR: &str = "modifiers";

fn record(report: &mut CheckReport, label: &str, files: radiance_folder::Result<Vec<String>>) {
    match files {
        Ok(files) => report.push(CheckResult::pass(
            VALIDATOR,
            format!("{label}: {} modifier/geometry pairs", files.len() / 2),
        )),
        Err(Error::UnmatchedModifier { geometry }) => report.push(CheckResult::fail_with_details(
            VALIDATOR,
            format!("{label}: geometry without modifier"),
            vec![geometry],
        )),
        Err(e) => report.push(CheckResult::fail(VALIDATOR, format!("{label}: {e}"))),
    }
}

/// Validates modifier matching in `folder`.
///
/// # Errors
///
/// Never fails; matching problems are reported as failures.
pub fn validate(folder: &ModelFolder) -> Result<CheckReport> {
    let mut report = CheckReport::new();
    record(&mut report, "scene", folder.scene_files(false));
    record(&mut report, "scene (black)", folder.scene_files(true));
    record(&mut report, "aperture", folder.aperture_files(false));
    record(&mut report, "aperture (black)", folder.aperture_files(true));

    if folder.has_aperture_group() {
        match folder.aperture_group_files_black(&[]) {
            Ok(files) => report.push(CheckResult::pass(
                VALIDATOR,
                format!("aperture groups: {} black files", files.len()),
            )),
            Err(e) => report.push(CheckResult::fail(VALIDATOR, format!("aperture groups: {e}"))),
        }
    }
    Ok(report)
}
