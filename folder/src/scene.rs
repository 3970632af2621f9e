//! Scene file assembly for each simulation pass.
//!
//! Every entry lists the modifier and geometry files a renderer scene needs,
//! in a fixed order: static scene pairs, static aperture pairs, then
//! aperture group files in catalog order. Duplicates keep their first
//! position.

use std::collections::HashSet;

use serde::Serialize;

use crate::catalog::DynamicGroup;
use crate::error::{Error, Result};
use crate::phase::{Phase, STATIC_APERTURES};
use crate::writer::join_posix;

/// Pairs each geometry file with the modifier file of the same stem.
///
/// The result alternates modifier and geometry so materials are defined
/// before the surfaces that use them. Geometry order is preserved.
///
/// # Errors
///
/// Returns [`Error::UnmatchedModifier`] naming the first geometry file with
/// no modifier of the same stem.
pub fn match_files(geometry: &[String], modifiers: &[String]) -> Result<Vec<String>> {
    let mut combined = Vec::with_capacity(geometry.len() * 2);
    for geo in geometry {
        let stem = file_stem(geo);
        let modifier = modifiers
            .iter()
            .find(|m| file_stem(m) == stem)
            .ok_or_else(|| Error::UnmatchedModifier {
                geometry: geo.clone(),
            })?;
        combined.push(modifier.clone());
        combined.push(geo.clone());
    }
    Ok(combined)
}

/// Path without its final extension.
fn file_stem(path: &str) -> &str {
    let name_start = path.rfind('/').map_or(0, |i| i + 1);
    match path[name_start..].rfind('.') {
        Some(dot) if dot > 0 => &path[..name_start + dot],
        _ => path,
    }
}

/// Matched static files of a model folder, normal and blacked out.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StaticFiles {
    /// Scene pairs with regular modifiers.
    pub scene: Vec<String>,
    /// Scene pairs with black modifiers.
    pub scene_black: Vec<String>,
    /// Static aperture pairs with regular modifiers.
    pub aperture: Vec<String>,
    /// Static aperture pairs with black modifiers.
    pub aperture_black: Vec<String>,
}

/// File lists for one simulation pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneEntry {
    /// Light-path key the pass belongs to.
    pub light_path: String,
    /// State identifier, group identifier, or [`STATIC_APERTURES`].
    pub identifier: String,
    /// Files for the regular pass. Absent for five-phase entries.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scene_files: Option<Vec<String>>,
    /// Files for the direct-isolation pass.
    pub scene_files_direct: Vec<String>,
}

/// Scene entries per phase. Phases that were not requested are `None`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SceneMapping {
    /// Two-phase entries: static apertures and direct-only group states.
    pub two_phase: Vec<SceneEntry>,
    /// Three-phase entries, one per matrix-bearing group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub three_phase: Option<Vec<SceneEntry>>,
    /// Five-phase entries, one per state of each matrix-bearing group.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub five_phase: Option<Vec<SceneEntry>>,
}

/// Builds scene file lists from static files and an aperture group catalog.
#[derive(Debug, Clone, Copy)]
pub struct SceneAssembler<'a> {
    files: &'a StaticFiles,
    groups: &'a [DynamicGroup],
    group_folder: &'a str,
}

impl<'a> SceneAssembler<'a> {
    /// Creates an assembler. Group file references are prefixed with
    /// `group_folder` (posix, may be empty).
    pub fn new(files: &'a StaticFiles, groups: &'a [DynamicGroup], group_folder: &'a str) -> Self {
        Self {
            files,
            groups,
            group_folder,
        }
    }

    /// Assembles the scene mapping for the requested phase.
    ///
    /// The static entry is emitted only when static apertures exist and
    /// `exclude_static` is false. When only two-phase is requested every
    /// group is handled as direct-only.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingBlackFile`] if a group that must be blacked out
    /// has no black file.
    pub fn assemble(&self, phase: Phase, exclude_static: bool) -> Result<SceneMapping> {
        let files = self.files;
        let mut two_phase = Vec::new();
        let mut three_phase = Vec::new();
        let mut five_phase = Vec::new();

        if !exclude_static && !files.aperture.is_empty() {
            let black = self.black_files(None)?;
            two_phase.push(SceneEntry {
                light_path: STATIC_APERTURES.to_string(),
                identifier: STATIC_APERTURES.to_string(),
                scene_files: Some(concat(&[&files.scene, &files.aperture, &black])),
                scene_files_direct: concat(&[&files.scene_black, &files.aperture, &black]),
            });
        }

        for group in self.groups {
            let black = self.black_files(Some(&group.identifier))?;
            if phase.uses_matrices() && group.is_matrix_bearing() {
                three_phase.push(SceneEntry {
                    light_path: group.identifier.clone(),
                    identifier: group.identifier.clone(),
                    scene_files: Some(concat(&[&files.scene, &files.aperture_black, &black])),
                    scene_files_direct: concat(&[
                        &files.scene_black,
                        &files.aperture_black,
                        &black,
                    ]),
                });
                if phase.uses_direct_matrices() {
                    for state in &group.states {
                        let direct = vec![self.group_file(&state.direct_file)];
                        five_phase.push(SceneEntry {
                            light_path: group.identifier.clone(),
                            identifier: state.identifier.clone(),
                            scene_files: None,
                            scene_files_direct: concat(&[
                                &files.scene_black,
                                &files.aperture_black,
                                &direct,
                                &black,
                            ]),
                        });
                    }
                }
            } else {
                for state in &group.states {
                    let default = vec![self.group_file(&state.default_file)];
                    two_phase.push(SceneEntry {
                        light_path: group.identifier.clone(),
                        identifier: state.identifier.clone(),
                        scene_files: Some(concat(&[
                            &files.scene,
                            &files.aperture_black,
                            &default,
                            &black,
                        ])),
                        scene_files_direct: concat(&[
                            &files.scene_black,
                            &files.aperture_black,
                            &default,
                            &black,
                        ]),
                    });
                }
            }
        }

        Ok(SceneMapping {
            two_phase,
            three_phase: phase.uses_matrices().then_some(three_phase),
            five_phase: phase.uses_direct_matrices().then_some(five_phase),
        })
    }

    /// Black files of every group except `exclude`, in catalog order.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingBlackFile`] for a group without a black file.
    pub fn black_files(&self, exclude: Option<&str>) -> Result<Vec<String>> {
        self.groups
            .iter()
            .filter(|g| Some(g.identifier.as_str()) != exclude)
            .map(|g| {
                g.black_file()
                    .map(|f| self.group_file(f))
                    .ok_or_else(|| Error::MissingBlackFile {
                        group: g.identifier.clone(),
                    })
            })
            .collect()
    }

    fn group_file(&self, file: &str) -> String {
        join_posix(self.group_folder, file)
    }
}

fn concat(parts: &[&Vec<String>]) -> Vec<String> {
    let mut seen = HashSet::new();
    parts
        .iter()
        .flat_map(|part| part.iter())
        .filter(|f| seen.insert(f.as_str()))
        .cloned()
        .collect()
}
