//! Model folder layout and folder-level operations.
//!
//! ```text
//! project/
//! ├── grid_mapping.json
//! ├── scene_mapping.json
//! └── model/
//!     ├── folder.toml
//!     ├── aperture/
//!     ├── aperture_group/
//!     │   └── interior/
//!     ├── bsdf/
//!     ├── grid/
//!     ├── ies/
//!     ├── receiver/
//!     ├── scene/
//!     ├── scene_dynamic/
//!     │   └── indoor/
//!     └── view/
//! ```
//!
//! File lists are returned as posix paths relative to the project folder.

use std::fs;
use std::path::{Path, PathBuf};

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::catalog::{load_aperture_groups, load_dynamic_scene, DynamicGroup};
use crate::config::{FolderConfig, FolderSections, FolderType, Section, CONFIG_FILE};
use crate::error::{Error, Result};
use crate::grid::{parse_grid_info, GridRecord};
use crate::phase::{classify, GridMapping, Phase};
use crate::receiver::write_combined_receiver;
use crate::scene::{match_files, SceneAssembler, SceneMapping, StaticFiles};
use crate::writer::{
    as_posix, join_posix, normalize_relative, read_json_optional, write_json, write_text,
};

/// File written by [`ModelFolder::grid_mapping`] in the project folder.
pub const GRID_MAPPING_FILE: &str = "grid_mapping.json";

/// File written by [`ModelFolder::octree_scene_mapping`] in the project folder.
pub const SCENE_MAPPING_FILE: &str = "scene_mapping.json";

/// Grid inventory written after a simulation.
pub const MODEL_GRIDS_INFO_FILE: &str = "_model_grids_info.json";

/// Entry of the receiver `_info.json` written by [`ModelFolder::combined_receivers`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReceiverInfo {
    /// Grid identifier.
    pub identifier: String,
    /// Number of sensors in the grid.
    pub count: usize,
    /// Receiver file name inside the receiver folder.
    pub path: String,
    /// Matrix-bearing groups on the grid's light path.
    pub aperture_groups: Vec<String>,
}

/// A Radiance model folder inside a project folder.
#[derive(Debug, Clone)]
pub struct ModelFolder {
    project_folder: PathBuf,
    model_name: String,
    config: FolderConfig,
}

impl ModelFolder {
    /// Opens `<project_folder>/<model_name>`.
    ///
    /// The config is read from `<model>/folder.toml` when present and falls
    /// back to defaults otherwise. The folder does not have to exist.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if an existing `folder.toml` is invalid.
    pub fn new(project_folder: impl Into<PathBuf>, model_name: impl Into<String>) -> Result<Self> {
        let project_folder = project_folder.into();
        let model_name = model_name.into();
        let config_file = project_folder.join(&model_name).join(CONFIG_FILE);
        let config = if config_file.is_file() {
            FolderConfig::from_file(&config_file)?
        } else {
            FolderConfig::default()
        };
        Ok(Self::with_config(project_folder, model_name, config))
    }

    /// Creates a folder with an explicit config.
    pub fn with_config(
        project_folder: impl Into<PathBuf>,
        model_name: impl Into<String>,
        config: FolderConfig,
    ) -> Self {
        Self {
            project_folder: project_folder.into(),
            model_name: model_name.into(),
            config,
        }
    }

    /// Opens a model folder by its own path; the parent becomes the project folder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Config`] if an existing `folder.toml` is invalid.
    pub fn from_model_folder(model_folder: &Path) -> Result<Self> {
        let model_name = model_folder
            .file_name()
            .map_or_else(|| "model".to_string(), |n| n.to_string_lossy().into_owned());
        let project_folder = model_folder
            .parent()
            .map_or_else(PathBuf::new, Path::to_path_buf);
        Self::new(project_folder, model_name)
    }

    /// Project folder.
    pub fn project_folder(&self) -> &Path {
        &self.project_folder
    }

    /// Folder configuration in use.
    pub fn config(&self) -> &FolderConfig {
        &self.config
    }

    /// Model folder, relative to the project folder unless `full`.
    pub fn model_folder(&self, full: bool) -> PathBuf {
        if full {
            self.project_folder.join(&self.model_name)
        } else {
            PathBuf::from(&self.model_name)
        }
    }

    /// Folder of a section, relative to the project folder unless `full`.
    pub fn folder(&self, section: Section, full: bool) -> PathBuf {
        self.model_folder(full)
            .join(self.config.section_path(section))
    }

    /// Static aperture folder.
    pub fn aperture_folder(&self, full: bool) -> PathBuf {
        self.folder(Section::Aperture, full)
    }

    /// Aperture group folder, or the interior one.
    pub fn aperture_group_folder(&self, full: bool, interior: bool) -> PathBuf {
        let section = if interior {
            Section::InteriorApertureGroup
        } else {
            Section::ApertureGroup
        };
        self.folder(section, full)
    }

    /// BSDF folder.
    pub fn bsdf_folder(&self, full: bool) -> PathBuf {
        self.folder(Section::Bsdf, full)
    }

    /// Sensor grid folder.
    pub fn grid_folder(&self, full: bool) -> PathBuf {
        self.folder(Section::Grid, full)
    }

    /// IES folder.
    pub fn ies_folder(&self, full: bool) -> PathBuf {
        self.folder(Section::Ies, full)
    }

    /// Static scene folder.
    pub fn scene_folder(&self, full: bool) -> PathBuf {
        self.folder(Section::Scene, full)
    }

    /// Dynamic scene folder, or the indoor one.
    pub fn dynamic_scene_folder(&self, full: bool, indoor: bool) -> PathBuf {
        let section = if indoor {
            Section::IndoorDynamicScene
        } else {
            Section::DynamicScene
        };
        self.folder(section, full)
    }

    /// View folder.
    pub fn view_folder(&self, full: bool) -> PathBuf {
        self.folder(Section::View, full)
    }

    /// Receiver folder.
    pub fn receiver_folder(&self, full: bool) -> PathBuf {
        self.folder(Section::Receiver, full)
    }

    /// Files in `subfolder` whose name matches `pattern`, sorted by name.
    ///
    /// `subfolder` is relative to the project folder. An absolute
    /// `subfolder` inside the project folder yields project-relative paths;
    /// one outside it yields absolute paths. A missing sub-folder yields an
    /// empty list. Only the file name is matched.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPattern`] for a bad regular expression and
    /// [`Error::Io`] if the folder cannot be listed.
    pub fn find_files(&self, subfolder: &Path, pattern: &str) -> Result<Vec<String>> {
        let regex = Regex::new(pattern).map_err(|source| Error::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })?;
        let folder = self.project_folder.join(subfolder);
        if !folder.is_dir() {
            return Ok(Vec::new());
        }
        let entries = fs::read_dir(&folder).map_err(|e| Error::io(&folder, e))?;
        let mut names = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| Error::io(&folder, e))?;
            let is_file = entry
                .file_type()
                .map_err(|e| Error::io(entry.path(), e))?
                .is_file();
            let name = entry.file_name().to_string_lossy().into_owned();
            if is_file && regex.is_match(&name) {
                names.push(name);
            }
        }
        names.sort();
        let prefix = folder
            .strip_prefix(&self.project_folder)
            .unwrap_or(subfolder);
        Ok(names
            .into_iter()
            .map(|name| normalize_relative(&as_posix(&prefix.join(name))))
            .collect())
    }

    fn matched_files(&self, section: Section, black_out: bool) -> Result<Vec<String>> {
        let cfg = match section {
            Section::Scene => &self.config.scene,
            _ => &self.config.aperture,
        };
        let folder = self.folder(section, false);
        let geometry = self.find_files(&folder, &cfg.geo_pattern)?;
        let modifier_pattern = if black_out {
            &cfg.blk_pattern
        } else {
            &cfg.mod_pattern
        };
        let modifiers = self.find_files(&folder, modifier_pattern)?;
        match_files(&geometry, &modifiers)
    }

    /// Static aperture modifier and geometry files, paired.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnmatchedModifier`] for a geometry file without a
    /// modifier of the same stem.
    pub fn aperture_files(&self, black_out: bool) -> Result<Vec<String>> {
        self.matched_files(Section::Aperture, black_out)
    }

    /// Static scene modifier and geometry files, paired.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnmatchedModifier`] for a geometry file without a
    /// modifier of the same stem.
    pub fn scene_files(&self, black_out: bool) -> Result<Vec<String>> {
        self.matched_files(Section::Scene, black_out)
    }

    /// Normal and blacked-out scene and aperture files.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnmatchedModifier`] for any unpaired geometry file.
    pub fn static_files(&self) -> Result<StaticFiles> {
        Ok(StaticFiles {
            scene: self.scene_files(false)?,
            scene_black: self.scene_files(true)?,
            aperture: self.aperture_files(false)?,
            aperture_black: self.aperture_files(true)?,
        })
    }

    /// Black files of the exterior aperture groups not named in `exclude`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MissingBlackFile`] for a group without a black file
    /// and any catalog loading error.
    pub fn aperture_group_files_black(&self, exclude: &[&str]) -> Result<Vec<String>> {
        let folder = as_posix(&self.aperture_group_folder(false, false));
        self.aperture_groups(false)?
            .iter()
            .filter(|g| !exclude.contains(&g.identifier.as_str()))
            .map(|g| {
                g.black_file()
                    .map(|f| join_posix(&folder, f))
                    .ok_or_else(|| Error::MissingBlackFile {
                        group: g.identifier.clone(),
                    })
            })
            .collect()
    }

    /// Sensor grid files, optionally from a grid group sub-folder.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is invalid or the folder cannot be listed.
    pub fn grid_files(&self, group: Option<&str>) -> Result<Vec<String>> {
        let mut folder = self.grid_folder(false);
        if let Some(group) = group {
            folder.push(group);
        }
        self.find_files(&folder, &self.config.grid.pattern)
    }

    /// Grid inventory files.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is invalid or the folder cannot be listed.
    pub fn grid_info_files(&self) -> Result<Vec<String>> {
        self.info_files(Section::Grid)
    }

    /// View files.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is invalid or the folder cannot be listed.
    pub fn view_files(&self) -> Result<Vec<String>> {
        self.find_files(&self.view_folder(false), &self.config.view.pattern)
    }

    /// View inventory files.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is invalid or the folder cannot be listed.
    pub fn view_info_files(&self) -> Result<Vec<String>> {
        self.info_files(Section::View)
    }

    /// Receiver files.
    ///
    /// # Errors
    ///
    /// Returns an error if the pattern is invalid or the folder cannot be listed.
    pub fn receiver_files(&self) -> Result<Vec<String>> {
        self.find_files(&self.receiver_folder(false), &self.config.receiver.pattern)
    }

    fn info_files(&self, section: Section) -> Result<Vec<String>> {
        let cfg = match section {
            Section::View => &self.config.view,
            Section::Receiver => &self.config.receiver,
            _ => &self.config.grid,
        };
        match &cfg.info_pattern {
            Some(pattern) => self.find_files(&self.folder(section, false), pattern),
            None => Ok(Vec::new()),
        }
    }

    /// Returns true if the model has at least one static aperture.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnmatchedModifier`] for an unpaired aperture file.
    pub fn has_aperture(&self) -> Result<bool> {
        Ok(!self.aperture_files(false)?.is_empty())
    }

    /// Returns true if an exterior or interior aperture group states file exists.
    pub fn has_aperture_group(&self) -> bool {
        self.states_file(Section::ApertureGroup).is_file()
            || self.states_file(Section::InteriorApertureGroup).is_file()
    }

    /// Returns true if an outdoor or indoor dynamic scene states file exists.
    pub fn has_dynamic_scene(&self) -> bool {
        self.states_file(Section::DynamicScene).is_file()
            || self.states_file(Section::IndoorDynamicScene).is_file()
    }

    /// States file of an aperture group or dynamic scene section.
    pub fn states_file(&self, section: Section) -> PathBuf {
        let states = match section {
            Section::InteriorApertureGroup => &self.config.interior_aperture_group.states,
            Section::DynamicScene => &self.config.dynamic_scene.states,
            Section::IndoorDynamicScene => &self.config.indoor_dynamic_scene.states,
            _ => &self.config.aperture_group.states,
        };
        self.folder(section, true).join(states)
    }

    /// Loads the exterior or interior aperture groups.
    ///
    /// Each call reads the states file again.
    ///
    /// # Errors
    ///
    /// Returns any catalog loading error.
    pub fn aperture_groups(&self, interior: bool) -> Result<Vec<DynamicGroup>> {
        let section = if interior {
            Section::InteriorApertureGroup
        } else {
            Section::ApertureGroup
        };
        load_aperture_groups(&self.states_file(section), &self.bsdf_folder(true), false)
    }

    /// Raw contents of the aperture group states file, an empty object if missing.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be parsed.
    pub fn aperture_groups_states(&self, interior: bool) -> Result<Value> {
        let section = if interior {
            Section::InteriorApertureGroup
        } else {
            Section::ApertureGroup
        };
        Ok(read_json_optional(&self.states_file(section))?
            .unwrap_or_else(|| Value::Object(serde_json::Map::new())))
    }

    /// Loads the outdoor or indoor dynamic scene.
    ///
    /// # Errors
    ///
    /// Returns any catalog loading error.
    pub fn dynamic_scene(&self, indoor: bool) -> Result<Vec<DynamicGroup>> {
        let section = if indoor {
            Section::IndoorDynamicScene
        } else {
            Section::DynamicScene
        };
        load_dynamic_scene(&self.states_file(section), false)
    }

    /// Grid inventory from `_info.json`, or from `_model_grids_info.json`
    /// with `is_model`. A missing file yields an empty inventory.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRecord`] for invalid records.
    pub fn grid_info(&self, is_model: bool) -> Result<Vec<GridRecord>> {
        let name = if is_model {
            MODEL_GRIDS_INFO_FILE
        } else {
            crate::partition::GRID_INFO_FILE
        };
        parse_grid_info(&self.grid_folder(true).join(name))
    }

    /// Grid inventory without `full_id`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::MalformedRecord`] for invalid records.
    pub fn grid_data_all(&self, is_model: bool) -> Result<Vec<GridRecord>> {
        Ok(self
            .grid_info(is_model)?
            .into_iter()
            .map(|grid| GridRecord {
                full_id: None,
                ..grid
            })
            .collect())
    }

    /// Creates an empty model folder and returns its path.
    ///
    /// `folder_type` adds the grid and view folders to `sections`. The
    /// effective config is written to `<model>/folder.toml`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::FolderExists`] if the model folder exists and
    /// `overwrite` is false, and I/O errors.
    pub fn write(
        &self,
        folder_type: FolderType,
        sections: FolderSections,
        overwrite: bool,
    ) -> Result<PathBuf> {
        let root = self.model_folder(true);
        if root.exists() {
            if !overwrite {
                return Err(Error::FolderExists { path: root });
            }
            fs::remove_dir_all(&root).map_err(|e| Error::io(&root, e))?;
        }
        let sections = sections.with_folder_type(folder_type);
        for section in Section::WRITABLE {
            if !sections.contains(section) {
                continue;
            }
            let directory = self.folder(section, true);
            fs::create_dir_all(&directory).map_err(|e| Error::io(&directory, e))?;
            debug!(path = %directory.display(), "created folder");
        }
        fs::create_dir_all(&root).map_err(|e| Error::io(&root, e))?;
        write_text(&root.join(CONFIG_FILE), &self.config.to_toml()?)?;
        info!("Created model folder {}.", root.display());
        Ok(root)
    }

    /// Buckets the folder's grids by phase and writes `grid_mapping.json`
    /// in the project folder.
    ///
    /// # Errors
    ///
    /// Returns any inventory or catalog error, and I/O errors.
    pub fn grid_mapping(&self, phase: Phase, exclude_static: bool) -> Result<GridMapping> {
        let grids = self.grid_info(false)?;
        let groups = self.aperture_groups(false)?;
        let mapping = classify(&grids, &groups, phase, exclude_static);
        write_json(&self.project_folder.join(GRID_MAPPING_FILE), &mapping)?;
        Ok(mapping)
    }

    /// Assembles scene file lists per pass and writes `scene_mapping.json`
    /// in the project folder.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnmatchedModifier`], [`Error::MissingBlackFile`],
    /// catalog errors, and I/O errors.
    pub fn octree_scene_mapping(&self, phase: Phase, exclude_static: bool) -> Result<SceneMapping> {
        let files = self.static_files()?;
        let groups = self.aperture_groups(false)?;
        let group_folder = as_posix(&self.aperture_group_folder(false, false));
        let mapping = SceneAssembler::new(&files, &groups, &group_folder)
            .assemble(phase, exclude_static)?;
        write_json(&self.project_folder.join(SCENE_MAPPING_FILE), &mapping)?;
        Ok(mapping)
    }

    /// Writes one combined receiver per grid into `<model>/<folder>` and the
    /// receiver `_info.json` next to them.
    ///
    /// Grids without a light path, or whose light path holds no
    /// matrix-bearing group, are skipped with a warning. With
    /// `auto_mtx_path` every group reference names its view matrix file.
    ///
    /// # Errors
    ///
    /// Returns any inventory or catalog error, and I/O errors.
    pub fn combined_receivers(&self, folder: &str, auto_mtx_path: bool) -> Result<Vec<ReceiverInfo>> {
        let grids = self.grid_data_all(false)?;
        let groups = self.aperture_groups(false)?;
        let group_folder = as_posix(&self.aperture_group_folder(false, false));
        let target = self.model_folder(true).join(folder);
        fs::create_dir_all(&target).map_err(|e| Error::io(&target, e))?;

        let mut receivers = Vec::new();
        for grid in &grids {
            if grid.light_path.is_empty() {
                warn!(
                    "{} sensor grid has no light path. It will not be included in three or five phase studies.",
                    grid.identifier
                );
                continue;
            }
            let matrix_groups: Vec<String> = grid
                .light_path
                .iter()
                .filter(|id| {
                    groups
                        .iter()
                        .any(|g| &g.identifier == *id && g.is_matrix_bearing())
                })
                .cloned()
                .collect();
            if matrix_groups.is_empty() {
                warn!(
                    "{} sensor grid has no view matrix receiver. It will not be included in three or five phase studies.",
                    grid.identifier
                );
                continue;
            }
            let path = write_combined_receiver(
                &grid.identifier,
                &group_folder,
                &matrix_groups,
                &target,
                auto_mtx_path,
            )?;
            receivers.push(ReceiverInfo {
                identifier: grid.identifier.clone(),
                count: grid.count,
                path,
                aperture_groups: matrix_groups,
            });
        }

        write_json(&target.join(crate::partition::GRID_INFO_FILE), &receivers)?;
        Ok(receivers)
    }
}
