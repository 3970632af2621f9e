//! Radiance folder check suite.
//!
//! Validates a model folder before a simulation run and a redistributed
//! grid folder after it, collecting pass/warn/fail results into one report.
//!
//! # Checks
//!
//! | Validator | Checks |
//! |-----------|--------|
//! | `states` | Every state catalog file reference resolves on disk |
//! | `modifiers` | Scene and aperture geometry pair with normal and black modifiers |
//! | `grids` | Inventory counts equal point file line counts; orphan point files |
//! | `redist` | `_redist_info.json` line ranges tile every output grid exactly |
//!
//! # Entry Point
//!
//! ```no_run
//! use radiance_folder_check::{run_all, FolderPaths};
//! use std::path::PathBuf;
//!
//! let paths = FolderPaths {
//!     project: PathBuf::from("project"),
//!     model: "model".to_string(),
//!     redistributed: None,
//! };
//! let report = run_all(&paths).expect("Failed to run checks");
//! assert!(report.all_passed());
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use anyhow::Context;
use radiance_folder::ModelFolder;
use tracing::debug;

pub mod report;
pub mod validators;

pub use report::{CheckReport, CheckResult, Severity};

/// Paths required by the check runner.
#[derive(Debug, Clone)]
pub struct FolderPaths {
    /// Project folder holding the model folder.
    pub project: std::path::PathBuf,
    /// Model folder name inside the project folder.
    pub model: String,
    /// Folder written by a sensor grid redistribution, if any.
    pub redistributed: Option<std::path::PathBuf>,
}

/// Runs all validators and returns the aggregated report.
///
/// Validators are run in this order:
/// 1. State catalogs (exterior and interior aperture groups, dynamic scene)
/// 2. Modifier matching for scene and static apertures
/// 3. Grid inventory against point files
/// 4. Redistribution provenance, when a redistributed folder is given
///
/// # Errors
///
/// Returns an error if the folder config cannot be loaded or a file system
/// operation fails.
pub fn run_all(paths: &FolderPaths) -> anyhow::Result<CheckReport> {
    let folder = ModelFolder::new(&paths.project, paths.model.as_str())
        .with_context(|| format!("Failed to open model folder {}", paths.model))?;
    let mut report = CheckReport::new();

    debug!("running states validator");
    report.extend(validators::states::validate(&folder)?);

    debug!("running modifiers validator");
    report.extend(validators::modifiers::validate(&folder)?);

    debug!("running grids validator");
    report.extend(validators::grids::validate(&folder)?);

    if let Some(redistributed) = &paths.redistributed {
        debug!("running redist validator");
        report.extend(validators::redist::validate(redistributed)?);
    }

    Ok(report)
}
