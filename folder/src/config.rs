//! Model folder configuration (`folder.toml`).
//!
//! Every section has a default, so a config file only lists the sections it
//! changes. Within a section only `states` and `info_pattern` may be omitted.
//!
//! ```toml
//! [grid]
//! path = "sensor_grids"
//! pattern = '.*\.pts$'
//!
//! [aperture_group]
//! path = "aperture_group"
//! states = "groups.json"
//! ```

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// File name of the configuration written into a model folder.
pub const CONFIG_FILE: &str = "folder.toml";

/// Sub-folder holding geometry, modifier and black modifier files.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GeometrySection {
    /// Folder relative to the model folder.
    pub path: String,
    /// Geometry file pattern.
    pub geo_pattern: String,
    /// Modifier file pattern.
    pub mod_pattern: String,
    /// Black modifier file pattern.
    pub blk_pattern: String,
}

impl GeometrySection {
    fn with_path(path: &str) -> Self {
        Self {
            path: path.to_string(),
            geo_pattern: r".*\.rad$".to_string(),
            mod_pattern: r".*\.mat$".to_string(),
            blk_pattern: r".*\.blk$".to_string(),
        }
    }
}

/// Sub-folder holding a `states.json` catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct StatesSection {
    /// Folder relative to the model folder.
    pub path: String,
    /// States file name inside the folder.
    #[serde(default = "default_states")]
    pub states: String,
}

fn default_states() -> String {
    "states.json".to_string()
}

impl StatesSection {
    fn with_path(path: &str) -> Self {
        Self {
            path: path.to_string(),
            states: default_states(),
        }
    }
}

/// Sub-folder holding one kind of file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FilesSection {
    /// Folder relative to the model folder.
    pub path: String,
    /// File pattern.
    pub pattern: String,
    /// Inventory file pattern.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub info_pattern: Option<String>,
}

impl FilesSection {
    fn new(path: &str, pattern: &str, info_pattern: Option<&str>) -> Self {
        Self {
            path: path.to_string(),
            pattern: pattern.to_string(),
            info_pattern: info_pattern.map(str::to_string),
        }
    }
}

/// Folder names and file patterns of a model folder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct FolderConfig {
    /// Static apertures.
    pub aperture: GeometrySection,
    /// Static scene.
    pub scene: GeometrySection,
    /// Aperture groups.
    pub aperture_group: StatesSection,
    /// Interior aperture groups.
    pub interior_aperture_group: StatesSection,
    /// Dynamic scene.
    pub dynamic_scene: StatesSection,
    /// Indoor dynamic scene.
    pub indoor_dynamic_scene: StatesSection,
    /// BSDF and transmittance matrix files.
    pub bsdf: FilesSection,
    /// Electric light descriptions.
    pub ies: FilesSection,
    /// Sensor grids.
    pub grid: FilesSection,
    /// Views.
    pub view: FilesSection,
    /// Receivers.
    pub receiver: FilesSection,
}

impl Default for FolderConfig {
    fn default() -> Self {
        Self {
            aperture: GeometrySection::with_path("aperture"),
            scene: GeometrySection::with_path("scene"),
            aperture_group: StatesSection::with_path("aperture_group"),
            interior_aperture_group: StatesSection::with_path("aperture_group/interior"),
            dynamic_scene: StatesSection::with_path("scene_dynamic"),
            indoor_dynamic_scene: StatesSection::with_path("scene_dynamic/indoor"),
            bsdf: FilesSection::new("bsdf", r".*\.xml$", None),
            ies: FilesSection::new("ies", r".*\.ies$", None),
            grid: FilesSection::new("grid", r".*\.pts$", Some(r"info\.json$")),
            view: FilesSection::new("view", r".*\.vf$", Some(r"info\.json$")),
            receiver: FilesSection::new("receiver", r".*\.rad$", Some(r"_info\.json$")),
        }
    }
}

impl FolderConfig {
    /// Loads a config file. Missing sections take their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NotFound`] if the file is missing, [`Error::Config`]
    /// if it is not valid TOML or holds unknown keys.
    pub fn from_file(path: &Path) -> Result<Self> {
        if !path.is_file() {
            return Err(Error::NotFound {
                path: path.to_path_buf(),
            });
        }
        let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
        toml::from_str(&content).map_err(|source| Error::Config {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Renders the config as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`Error::ConfigRender`] if the config cannot be serialized.
    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).map_err(Error::ConfigRender)
    }

    /// Path of a section relative to the model folder.
    pub fn section_path(&self, section: Section) -> &str {
        match section {
            Section::Aperture => &self.aperture.path,
            Section::Scene => &self.scene.path,
            Section::ApertureGroup => &self.aperture_group.path,
            Section::InteriorApertureGroup => &self.interior_aperture_group.path,
            Section::DynamicScene => &self.dynamic_scene.path,
            Section::IndoorDynamicScene => &self.indoor_dynamic_scene.path,
            Section::Bsdf => &self.bsdf.path,
            Section::Ies => &self.ies.path,
            Section::Grid => &self.grid.path,
            Section::View => &self.view.path,
            Section::Receiver => &self.receiver.path,
        }
    }
}

/// Sub-folders of a model folder.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Section {
    /// `aperture`
    Aperture,
    /// `scene`
    Scene,
    /// `aperture_group`
    ApertureGroup,
    /// `aperture_group/interior`
    InteriorApertureGroup,
    /// `scene_dynamic`
    DynamicScene,
    /// `scene_dynamic/indoor`
    IndoorDynamicScene,
    /// `bsdf`
    Bsdf,
    /// `ies`
    Ies,
    /// `grid`
    Grid,
    /// `view`
    View,
    /// `receiver`
    Receiver,
}

impl Section {
    /// Sections created by [`crate::ModelFolder::write`], in creation order.
    pub const WRITABLE: [Self; 10] = [
        Self::Aperture,
        Self::ApertureGroup,
        Self::Scene,
        Self::Grid,
        Self::View,
        Self::InteriorApertureGroup,
        Self::Bsdf,
        Self::Ies,
        Self::DynamicScene,
        Self::IndoorDynamicScene,
    ];
}

/// Which sub-folders a new model folder gets.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FolderSections {
    /// `aperture`
    pub aperture: bool,
    /// `aperture_group`
    pub aperture_group: bool,
    /// `scene`
    pub scene: bool,
    /// `grid`
    pub grid: bool,
    /// `view`
    pub view: bool,
    /// `aperture_group/interior`
    pub interior_aperture_group: bool,
    /// `bsdf`
    pub bsdf: bool,
    /// `ies`
    pub ies: bool,
    /// `scene_dynamic`
    pub dynamic_scene: bool,
    /// `scene_dynamic/indoor`
    pub indoor_dynamic_scene: bool,
}

impl FolderSections {
    /// Static apertures and scene only.
    pub fn minimal() -> Self {
        Self {
            aperture: true,
            scene: true,
            ..Self::default()
        }
    }

    /// Minimal plus exterior and interior aperture groups.
    pub fn aperture_groups() -> Self {
        Self {
            aperture_group: true,
            interior_aperture_group: true,
            ..Self::minimal()
        }
    }

    /// Every sub-folder.
    pub fn full() -> Self {
        Self {
            aperture: true,
            aperture_group: true,
            scene: true,
            grid: true,
            view: true,
            interior_aperture_group: true,
            bsdf: true,
            ies: true,
            dynamic_scene: true,
            indoor_dynamic_scene: true,
        }
    }

    /// Returns true if `section` is selected. Receivers are never created up front.
    pub fn contains(&self, section: Section) -> bool {
        match section {
            Section::Aperture => self.aperture,
            Section::Scene => self.scene,
            Section::ApertureGroup => self.aperture_group,
            Section::InteriorApertureGroup => self.interior_aperture_group,
            Section::DynamicScene => self.dynamic_scene,
            Section::IndoorDynamicScene => self.indoor_dynamic_scene,
            Section::Bsdf => self.bsdf,
            Section::Ies => self.ies,
            Section::Grid => self.grid,
            Section::View => self.view,
            Section::Receiver => false,
        }
    }

    /// Adds the grid and view folders required by `folder_type`.
    pub fn with_folder_type(mut self, folder_type: FolderType) -> Self {
        match folder_type {
            FolderType::Plain => {}
            FolderType::Grid => self.grid = true,
            FolderType::View => self.view = true,
            FolderType::GridAndView => {
                self.grid = true;
                self.view = true;
            }
        }
        self
    }
}

/// Kind of study a new model folder is prepared for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FolderType {
    /// No grids or views.
    Plain,
    /// Grid-based.
    #[default]
    Grid,
    /// View-based.
    View,
    /// Grids and views.
    GridAndView,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn partial_file_keeps_defaults() {
        let config: FolderConfig = toml::from_str(
            r#"
            [grid]
            path = "sensor_grids"
            pattern = '.*\.pts$'
            "#,
        )
        .unwrap();
        assert_eq!(config.grid.path, "sensor_grids");
        assert!(config.grid.info_pattern.is_none());
        assert_eq!(config.aperture, FolderConfig::default().aperture);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let err = toml::from_str::<FolderConfig>("[aperture]\nfolder = \"x\"\n");
        assert!(err.is_err());
        let err = toml::from_str::<FolderConfig>("[lights]\npath = \"x\"\n");
        assert!(err.is_err());
    }

    #[test]
    fn config_survives_toml() {
        let config = FolderConfig::default();
        let text = config.to_toml().unwrap();
        let parsed: FolderConfig = toml::from_str(&text).unwrap();
        assert_eq!(parsed, config);
    }

    #[test]
    fn folder_type_adds_grid_and_view() {
        let sections = FolderSections::minimal().with_folder_type(FolderType::GridAndView);
        assert!(sections.grid && sections.view && sections.aperture);
        assert!(!sections.aperture_group);
        assert!(FolderSections::aperture_groups().contains(Section::InteriorApertureGroup));
        assert!(!FolderSections::full().contains(Section::Receiver));
    }

    #[test]
    fn missing_config_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = FolderConfig::from_file(&dir.path().join(CONFIG_FILE)).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
