//! Sensor grid inventory records (`_info.json`).

use std::path::Path;

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::{Error, Result};
use crate::writer::read_json_optional;

/// Inventory entry for one sensor grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GridRecord {
    /// Grid identifier.
    pub identifier: String,
    /// Display name.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Path of the grid file relative to the grid folder, without extension.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub full_id: Option<String>,
    /// Grid group (sub-folder), empty for top level grids.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group: Option<String>,
    /// Number of sensor points.
    pub count: usize,
    /// Dynamic groups the grid sees through, outermost first.
    #[serde(
        default,
        deserialize_with = "deserialize_light_path",
        skip_serializing_if = "Vec::is_empty"
    )]
    pub light_path: Vec<String>,
}

impl GridRecord {
    /// Creates a record with only identifier, count and light path.
    pub fn new(identifier: impl Into<String>, count: usize, light_path: Vec<String>) -> Self {
        Self {
            identifier: identifier.into(),
            name: None,
            full_id: None,
            group: None,
            count,
            light_path,
        }
    }

    /// The grid file stem relative to the grid folder.
    ///
    /// Falls back to the identifier when `full_id` is absent.
    pub fn file_stem(&self) -> &str {
        self.full_id.as_deref().unwrap_or(&self.identifier)
    }
}

/// Light path segments may be written flat (`["a", "b"]`) or nested
/// (`[["a"], ["b", "static"]]`). Nested entries contribute their first id.
#[derive(Deserialize)]
#[serde(untagged)]
enum LightPathEntry {
    Group(String),
    Path(Vec<String>),
}

fn deserialize_light_path<'de, D>(deserializer: D) -> std::result::Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let entries = Option::<Vec<LightPathEntry>>::deserialize(deserializer)?.unwrap_or_default();
    Ok(entries
        .into_iter()
        .filter_map(|entry| match entry {
            LightPathEntry::Group(id) => Some(id),
            LightPathEntry::Path(path) => path.into_iter().next(),
        })
        .collect())
}

/// Parses a grid inventory file. A missing file yields an empty inventory.
///
/// # Errors
///
/// Returns [`Error::MalformedRecord`] for a record that does not match the
/// schema or declares zero sensors, and I/O or JSON errors for unreadable files.
pub fn parse_grid_info(info_file: &Path) -> Result<Vec<GridRecord>> {
    let Some(data) = read_json_optional::<Vec<Value>>(info_file)? else {
        return Ok(Vec::new());
    };
    data.into_iter()
        .enumerate()
        .map(|(index, value)| {
            let record = value
                .get("identifier")
                .and_then(Value::as_str)
                .map_or_else(|| format!("[{index}]"), str::to_string);
            let grid: GridRecord = serde_json::from_value(value)
                .map_err(|e| Error::malformed(info_file, &record, e.to_string()))?;
            if grid.count == 0 {
                return Err(Error::malformed(info_file, record, "count must be positive"));
            }
            Ok(grid)
        })
        .collect()
}
