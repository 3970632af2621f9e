//! `rf-grids`: Redistributes sensor grids across workers and restores them.
//!
//! **Usage:**
//! ```
//! rf-grids redistribute <input> <output> --grid-count <n> [--min-sensor-count 2000]
//! rf-grids restore <input> <output> [--extension pts] [--dist-info <file>]
//! ```

#![deny(
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::panic,
    missing_docs,
    clippy::missing_errors_doc
)]

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use radiance_folder::{
    parse_grid_info, redistribute_sensors, restore_original_distribution, RedistributeOptions,
};
use serde_json::json;
use tracing_subscriber::EnvFilter;

/// Redistribute sensor grids and restore them afterwards.
#[derive(Parser)]
#[command(name = "rf-grids", version, about = "Redistribute and restore sensor grids")]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Split the grids of a folder into evenly sized output grids.
    Redistribute {
        /// Folder with the grid files and `_info.json`.
        input: PathBuf,
        /// Folder for the numbered output grids.
        output: PathBuf,
        /// Requested number of output grids.
        #[arg(long)]
        grid_count: usize,
        /// Minimum sensors per output grid; takes precedence over the grid count.
        #[arg(long, default_value_t = 2000)]
        min_sensor_count: usize,
        /// Grid file extension.
        #[arg(long, default_value = "pts")]
        extension: String,
        /// Inventory to use instead of `<input>/_info.json`.
        #[arg(long)]
        grid_info: Option<PathBuf>,
    },
    /// Reassemble the original grids from a redistributed folder.
    Restore {
        /// Folder with the numbered grids.
        input: PathBuf,
        /// Folder for the restored grids.
        output: PathBuf,
        /// File extension of the numbered and restored grids.
        #[arg(long, default_value = "pts")]
        extension: String,
        /// Distribution records to use instead of `<input>/_redist_info.json`.
        #[arg(long)]
        dist_info: Option<PathBuf>,
    },
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
        Command::Redistribute {
            input,
            output,
            grid_count,
            min_sensor_count,
            extension,
            grid_info,
        } => {
            let grid_info = grid_info
                .map(|path| {
                    parse_grid_info(&path)
                        .with_context(|| format!("Failed to load inventory {}", path.display()))
                })
                .transpose()?;
            let options = RedistributeOptions {
                min_sensor_count,
                extension,
                grid_info,
                ..RedistributeOptions::new(grid_count)
            };
            let result = redistribute_sensors(&input, &output, &options).with_context(|| {
                format!(
                    "Failed to redistribute {} into {}",
                    input.display(),
                    output.display()
                )
            })?;
            println!(
                "{}",
                json!({
                    "grid_count": result.grid_count,
                    "sensors_per_grid": result.sensors_per_grid,
                })
            );
        }
        Command::Restore {
            input,
            output,
            extension,
            dist_info,
        } => {
            let restored =
                restore_original_distribution(&input, &output, &extension, dist_info.as_deref())
                    .with_context(|| format!("Failed to restore grids from {}", input.display()))?;
            println!("{}", json!({ "restored": restored }));
        }
    }
    Ok(())
}
