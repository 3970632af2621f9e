//! Radiance model folder toolkit.
//!
//! This crate manages the folder convention of a multi-phase daylight
//! simulation: which sensor grids and scene files belong to which simulation
//! pass, and how sensor grids are redistributed for parallel runs and
//! restored afterwards.
//!
//! # Components
//!
//! | Module | Role |
//! |--------|------|
//! | [`catalog`] | Aperture group and dynamic scene state catalogs |
//! | [`grid`] | Sensor grid inventory (`_info.json`) |
//! | [`phase`] | Two-, three- and five-phase grid buckets |
//! | [`scene`] | Scene file lists per simulation pass |
//! | [`receiver`] | Combined receiver files and output specs |
//! | [`partition`] | Sensor grid redistribution with provenance |
//! | [`restore`] | Restoring results to the original grids |
//! | [`config`], [`folder`] | Folder layout, discovery and orchestration |
//!
//! # Entry Point
//!
//! ```no_run
//! use radiance_folder::{ModelFolder, Phase};
//!
//! let folder = ModelFolder::new("project", "model")?;
//! let grids = folder.grid_mapping(Phase::Three, false)?;
//! let scenes = folder.octree_scene_mapping(Phase::Three, false)?;
//! println!("{} two-phase buckets", grids.two_phase.len());
//! println!("{} two-phase scenes", scenes.two_phase.len());
//! # Ok::<(), radiance_folder::Error>(())
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

pub mod catalog;
pub mod config;
pub mod error;
pub mod folder;
pub mod grid;
pub mod partition;
pub mod phase;
pub mod receiver;
pub mod restore;
pub mod scene;
pub mod writer;

pub use catalog::{load_aperture_groups, load_dynamic_scene, DynamicGroup, GroupKind, State};
pub use config::{FolderConfig, FolderSections, FolderType, Section};
pub use error::{Error, ReceiverIssue, Result};
pub use folder::{ModelFolder, ReceiverInfo};
pub use grid::{parse_grid_info, GridRecord};
pub use partition::{
    partition, redistribute_sensors, DistributionRecord, Partition, PartitionInput, PartitionPlan,
    RedistributeOptions, Redistribution, Segment,
};
pub use phase::{classify, GridBucket, GridMapping, Phase, STATIC_APERTURES};
pub use receiver::{add_output_spec, write_combined_receiver};
pub use restore::{restore, restore_grid, restore_original_distribution};
pub use scene::{match_files, SceneAssembler, SceneEntry, SceneMapping, StaticFiles};
