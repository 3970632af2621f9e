//! State catalog validator.
//!
//! Loads every state catalog of the model folder with validation on, so each
//! `default`, `direct`, `black`, `vmtx` and `dmtx` reference must exist next
//! to its states file and each `tmtx` must exist in the BSDF folder.

use anyhow::Result;
use radiance_folder::{load_aperture_groups, load_dynamic_scene, ModelFolder, Section};

use crate::report::{CheckReport, CheckResult};

const VALIDATOR: &str = "states";

/// Validates all state catalogs of `folder`. Missing states files are skipped.
///
/// # Errors
///
/// Never fails; catalog problems are reported as failures.
pub fn validate(folder: &ModelFolder) -> Result<CheckReport> {
    let mut report = CheckReport::new();
    let matrix_folder = folder.bsdf_folder(true);

    for section in [
        Section::ApertureGroup,
        Section::InteriorApertureGroup,
        Section::DynamicScene,
        Section::IndoorDynamicScene,
    ] {
        let states_file = folder.states_file(section);
        if !states_file.is_file() {
            continue;
        }
        let loaded = match section {
            Section::ApertureGroup | Section::InteriorApertureGroup => {
                load_aperture_groups(&states_file, &matrix_folder, true)
            }
            _ => load_dynamic_scene(&states_file, true),
        };
        let label = states_file.display();
        match loaded {
            Ok(groups) => {
                let states: usize = groups.iter().map(|g| g.states.len()).sum();
                report.push(CheckResult::pass(
                    VALIDATOR,
                    format!("{label}: {} groups, {states} states resolve", groups.len()),
                ));
            }
            Err(e) => report.push(CheckResult::fail(VALIDATOR, format!("{label}: {e}"))),
        }
    }

    if report.results.is_empty() {
        report.push(CheckResult::pass(VALIDATOR, "No state catalogs in model folder"));
    }
    Ok(report)
}
