//! `rf-folder`: Queries and prepares Radiance model folders.
//!
//! Every query prints JSON to stdout, or writes it to `--output <file>`.
//! Logs go to stderr; set `RUST_LOG` to change the level.
//!
//! **Usage:**
//! ```
//! rf-folder scene-files <project> [--model <name>] [--black]
//! rf-folder grid-mapping <project> [--phase 2|3|5] [--exclude-static]
//! rf-folder scene-mapping <project> [--phase 2|3|5] [--exclude-static]
//! rf-folder receivers <project> [--receiver-folder receiver] [--auto-mtx-path]
//! rf-folder add-output-spec <receiver-file> <output-spec> [--output-file <path>]
//! rf-folder write <project> [--folder-type grid] [--sections minimal] [--overwrite]
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use radiance_folder::{add_output_spec, FolderSections, FolderType, ModelFolder, Phase};
use serde::Serialize;
use tracing_subscriber::EnvFilter;

/// Query and prepare Radiance model folders.
#[derive(Parser)]
#[command(name = "rf-folder", version, about = "Query and prepare Radiance model folders")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

/// Project folder selection shared by the folder commands.
#[derive(ClapArgs)]
struct FolderArgs {
    /// Project folder holding the model folder.
    project: PathBuf,

    /// Model folder name inside the project folder.
    #[arg(short, long, default_value = "model")]
    model: String,

    /// Write the JSON result to this file instead of stdout.
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl FolderArgs {
    fn open(&self) -> Result<ModelFolder> {
        ModelFolder::new(&self.project, self.model.as_str())
            .with_context(|| format!("Failed to open model folder {}", self.project.display()))
    }

    fn emit<T: Serialize + ?Sized>(&self, value: &T) -> Result<()> {
        emit(value, self.output.as_deref())
    }
}

#[derive(Subcommand)]
enum Command {
    /// Static aperture modifier and geometry files.
    ApertureFiles {
        #[command(flatten)]
        folder: FolderArgs,
        /// Return black modifiers instead of the regular ones.
        #[arg(long)]
        black: bool,
    },
    /// Static scene modifier and geometry files.
    SceneFiles {
        #[command(flatten)]
        folder: FolderArgs,
        /// Return black modifiers instead of the regular ones.
        #[arg(long)]
        black: bool,
    },
    /// Sensor grid files.
    GridFiles {
        #[command(flatten)]
        folder: FolderArgs,
        /// Grid group sub-folder.
        #[arg(long)]
        group: Option<String>,
    },
    /// Sensor grid inventory files.
    GridInfoFiles {
        #[command(flatten)]
        folder: FolderArgs,
    },
    /// View files.
    ViewFiles {
        #[command(flatten)]
        folder: FolderArgs,
    },
    /// View inventory files.
    ViewInfoFiles {
        #[command(flatten)]
        folder: FolderArgs,
    },
    /// Aperture groups and their states.
    ApertureGroups {
        #[command(flatten)]
        folder: FolderArgs,
        /// Return interior aperture groups.
        #[arg(long)]
        interior: bool,
    },
    /// Dynamic scene groups and their states.
    DynamicScene {
        #[command(flatten)]
        folder: FolderArgs,
        /// Return the indoor dynamic scene.
        #[arg(long)]
        indoor: bool,
    },
    /// Files in a sub-folder of the project folder matching a pattern.
    Filter {
        #[command(flatten)]
        folder: FolderArgs,
        /// Sub-folder relative to the project folder.
        sub_folder: PathBuf,
        /// Regular expression matched against file names.
        pattern: String,
    },
    /// Bucket sensor grids by phase and write grid_mapping.json.
    GridMapping {
        #[command(flatten)]
        folder: FolderArgs,
        #[command(flatten)]
        phase: PhaseArgs,
    },
    /// Assemble scene files per pass and write scene_mapping.json.
    SceneMapping {
        #[command(flatten)]
        folder: FolderArgs,
        #[command(flatten)]
        phase: PhaseArgs,
    },
    /// Write combined receiver files for matrix-bearing aperture groups.
    Receivers {
        #[command(flatten)]
        folder: FolderArgs,
        /// Receiver folder inside the model folder.
        #[arg(long, default_value = "receiver")]
        receiver_folder: String,
        /// Name the view matrix output of every aperture group.
        #[arg(long)]
        auto_mtx_path: bool,
    },
    /// Add an output spec to the control line of a receiver file.
    AddOutputSpec {
        /// Receiver file with a `#@rfluxmtx` control line.
        receiver_file: PathBuf,
        /// Output spec, e.g. `sky.vmx`.
        output_spec: String,
        /// Write the result here instead of updating the file in place.
        #[arg(long)]
        output_file: Option<PathBuf>,
    },
    /// Create an empty model folder.
    Write {
        #[command(flatten)]
        folder: FolderArgs,
        /// Kind of study the folder is prepared for.
        #[arg(long, value_enum, default_value_t = FolderTypeArg::Grid)]
        folder_type: FolderTypeArg,
        /// Sub-folder preset.
        #[arg(long, value_enum, default_value_t = SectionsArg::Minimal)]
        sections: SectionsArg,
        /// Replace an existing model folder.
        #[arg(long)]
        overwrite: bool,
    },
}

/// Phase selection shared by the mapping commands.
#[derive(ClapArgs)]
struct PhaseArgs {
    /// Simulation phase: 2, 3 or 5.
    #[arg(long, default_value_t = 5, value_parser = clap::value_parser!(u8).range(2..=5))]
    phase: u8,

    /// Leave out the static aperture bucket.
    #[arg(long)]
    exclude_static: bool,
}

impl PhaseArgs {
    fn phase(&self) -> Result<Phase> {
        Phase::from_number(self.phase)
            .with_context(|| format!("Phase must be 2, 3 or 5, got {}", self.phase))
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum FolderTypeArg {
    Plain,
    Grid,
    View,
    GridAndView,
}

impl From<FolderTypeArg> for FolderType {
    fn from(arg: FolderTypeArg) -> Self {
        match arg {
            FolderTypeArg::Plain => Self::Plain,
            FolderTypeArg::Grid => Self::Grid,
            FolderTypeArg::View => Self::View,
            FolderTypeArg::GridAndView => Self::GridAndView,
        }
    }
}

#[derive(Clone, Copy, ValueEnum)]
enum SectionsArg {
    Minimal,
    ApertureGroups,
    Full,
}

impl From<SectionsArg> for FolderSections {
    fn from(arg: SectionsArg) -> Self {
        match arg {
            SectionsArg::Minimal => Self::minimal(),
            SectionsArg::ApertureGroups => Self::aperture_groups(),
            SectionsArg::Full => Self::full(),
        }
    }
}

/// Prints `value` as JSON, or writes it to `output`.
fn emit<T: Serialize + ?Sized>(value: &T, output: Option<&Path>) -> Result<()> {
    let json = serde_json::to_string(value).context("Failed to serialize result")?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))
        }
        None => {
            println!("{json}");
            Ok(())
        }
    }
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    init_logging();
    let args = Args::parse();

    match args.command {
        Command::ApertureFiles { folder, black } => {
            folder.emit(&folder.open()?.aperture_files(black)?)
        }
        Command::SceneFiles { folder, black } => folder.emit(&folder.open()?.scene_files(black)?),
        Command::GridFiles { folder, group } => {
            folder.emit(&folder.open()?.grid_files(group.as_deref())?)
        }
        Command::GridInfoFiles { folder } => folder.emit(&folder.open()?.grid_info_files()?),
        Command::ViewFiles { folder } => folder.emit(&folder.open()?.view_files()?),
        Command::ViewInfoFiles { folder } => folder.emit(&folder.open()?.view_info_files()?),
        Command::ApertureGroups { folder, interior } => {
            folder.emit(&folder.open()?.aperture_groups(interior)?)
        }
        Command::DynamicScene { folder, indoor } => {
            folder.emit(&folder.open()?.dynamic_scene(indoor)?)
        }
        Command::Filter {
            folder,
            sub_folder,
            pattern,
        } => folder.emit(&folder.open()?.find_files(&sub_folder, &pattern)?),
        Command::GridMapping { folder, phase } => {
            let mapping = folder
                .open()?
                .grid_mapping(phase.phase()?, phase.exclude_static)?;
            folder.emit(&mapping)
        }
        Command::SceneMapping { folder, phase } => {
            let mapping = folder
                .open()?
                .octree_scene_mapping(phase.phase()?, phase.exclude_static)?;
            folder.emit(&mapping)
        }
        Command::Receivers {
            folder,
            receiver_folder,
            auto_mtx_path,
        } => {
            let receivers = folder
                .open()?
                .combined_receivers(&receiver_folder, auto_mtx_path)?;
            folder.emit(&receivers)
        }
        Command::AddOutputSpec {
            receiver_file,
            output_spec,
            output_file,
        } => {
            add_output_spec(&receiver_file, &output_spec, output_file.as_deref())?;
            Ok(())
        }
        Command::Write {
            folder,
            folder_type,
            sections,
            overwrite,
        } => {
            let root = folder
                .open()?
                .write(folder_type.into(), sections.into(), overwrite)?;
            folder.emit(&root.display().to_string())
        }
    }
}
