//! State catalogs for aperture groups and dynamic scene geometry.
//!
//! A states file maps each dynamic group identifier to its ordered states:
//!
//! ```json
//! {
//!   "south_window": [
//!     {
//!       "identifier": "0_clear",
//!       "default": "./south_window..default..000.rad",
//!       "direct": "./south_window..direct..000.rad",
//!       "black": "./south_window..black.rad",
//!       "tmtx": "clear.xml",
//!       "vmtx": "./south_window..mtx.rad",
//!       "dmtx": "./south_window..mtx.rad"
//!     }
//!   ]
//! }
//! ```
//!
//! Loading returns a fresh immutable snapshot every call. Callers that want
//! caching keep the returned `Vec<DynamicGroup>` themselves.

use std::collections::HashSet;
use std::path::Path;

use serde::Serialize;
use serde_json::{Map, Value};
use tracing::debug;

use crate::error::{Error, Result};
use crate::writer::{normalize_relative, read_json_optional};

/// Which kind of dynamic element a group describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GroupKind {
    /// Aperture group (window group) with optional black and matrix files.
    Aperture,
    /// Generic dynamic scene geometry with only default and direct files.
    Scene,
}

/// One representation of a dynamic element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct State {
    /// Identifier, unique within the owning group.
    pub identifier: String,
    /// Geometry used for the normal representation.
    #[serde(rename = "default")]
    pub default_file: String,
    /// Geometry used for direct-sun isolation.
    #[serde(rename = "direct")]
    pub direct_file: String,
    /// Blacked-out geometry.
    #[serde(rename = "black", skip_serializing_if = "Option::is_none")]
    pub black_file: Option<String>,
    /// Transmittance matrix, relative to the matrix (BSDF) folder.
    #[serde(rename = "tmtx", skip_serializing_if = "Option::is_none")]
    pub transmittance_matrix_file: Option<String>,
    /// View matrix receiver geometry.
    #[serde(rename = "vmtx", skip_serializing_if = "Option::is_none")]
    pub view_matrix_file: Option<String>,
    /// Daylight matrix sender geometry.
    #[serde(rename = "dmtx", skip_serializing_if = "Option::is_none")]
    pub daylight_matrix_file: Option<String>,
}

impl State {
    /// Returns true if the state carries a transmittance matrix.
    pub fn is_matrix_bearing(&self) -> bool {
        self.transmittance_matrix_file.is_some()
    }

    /// Checks that every referenced file exists.
    ///
    /// Geometry references resolve under `folder`; the transmittance matrix
    /// resolves under `matrix_folder`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for the first reference that does not exist.
    pub fn validate(&self, folder: &Path, matrix_folder: &Path) -> Result<()> {
        let in_folder = [
            ("default", Some(&self.default_file)),
            ("direct", Some(&self.direct_file)),
            ("black", self.black_file.as_ref()),
            ("vmtx", self.view_matrix_file.as_ref()),
            ("dmtx", self.daylight_matrix_file.as_ref()),
        ];
        for (field, file) in in_folder {
            if let Some(file) = file {
                self.require(field, &folder.join(file))?;
            }
        }
        if let Some(tmtx) = &self.transmittance_matrix_file {
            self.require("tmtx", &matrix_folder.join(tmtx))?;
        }
        Ok(())
    }

    fn require(&self, field: &'static str, path: &Path) -> Result<()> {
        if path.is_file() {
            Ok(())
        } else {
            Err(Error::Validation {
                state: self.identifier.clone(),
                field,
                path: path.to_path_buf(),
            })
        }
    }
}

/// A named dynamic element and its ordered states.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DynamicGroup {
    /// Identifier, unique across the catalog.
    pub identifier: String,
    /// Kind of element.
    #[serde(skip)]
    pub kind: GroupKind,
    /// States in source order. Index 0 is the default state.
    pub states: Vec<State>,
}

impl DynamicGroup {
    /// Returns true if any state carries a transmittance matrix.
    pub fn is_matrix_bearing(&self) -> bool {
        self.states.iter().any(State::is_matrix_bearing)
    }

    /// The black file of the default state, if any.
    pub fn black_file(&self) -> Option<&str> {
        self.states.first().and_then(|s| s.black_file.as_deref())
    }
}

/// Loads aperture groups from a states file.
///
/// Returns an empty list if `states_file` does not exist. With `validate`,
/// geometry references must exist next to the states file and transmittance
/// matrices must exist under `matrix_folder`.
///
/// # Errors
///
/// Returns [`Error::MalformedRecord`] for schema violations,
/// [`Error::Validation`] for missing referenced files, and I/O or JSON errors
/// for unreadable files.
pub fn load_aperture_groups(
    states_file: &Path,
    matrix_folder: &Path,
    validate: bool,
) -> Result<Vec<DynamicGroup>> {
    load(states_file, GroupKind::Aperture, matrix_folder, validate)
}

/// Loads dynamic scene geometry from a states file.
///
/// Returns an empty list if `states_file` does not exist. Aperture-only keys
/// in the state records are ignored.
///
/// # Errors
///
/// Returns [`Error::MalformedRecord`] for schema violations,
/// [`Error::Validation`] for missing referenced files, and I/O or JSON errors
/// for unreadable files.
pub fn load_dynamic_scene(states_file: &Path, validate: bool) -> Result<Vec<DynamicGroup>> {
    let folder = states_file.parent().unwrap_or_else(|| Path::new(""));
    load(states_file, GroupKind::Scene, folder, validate)
}

fn load(
    states_file: &Path,
    kind: GroupKind,
    matrix_folder: &Path,
    validate: bool,
) -> Result<Vec<DynamicGroup>> {
    let data: Value = match read_json_optional(states_file)? {
        Some(data) => data,
        None => {
            debug!(path = %states_file.display(), "no states file");
            return Ok(Vec::new());
        }
    };
    let groups = match &data {
        Value::Object(groups) => groups,
        _ => {
            return Err(Error::malformed(
                states_file,
                "<root>",
                "states file must hold a JSON object",
            ))
        }
    };

    let mut catalog = Vec::with_capacity(groups.len());
    for (identifier, value) in groups {
        let records = state_records(states_file, identifier, value)?;
        let mut states = Vec::with_capacity(records.len());
        let mut seen = HashSet::new();
        for (index, record) in records.into_iter().enumerate() {
            let state = parse_state(states_file, identifier, index, record, kind)?;
            if !seen.insert(state.identifier.clone()) {
                return Err(Error::malformed(
                    states_file,
                    format!("{identifier}[{index}]"),
                    format!("duplicate state identifier {}", state.identifier),
                ));
            }
            states.push(state);
        }
        catalog.push(DynamicGroup {
            identifier: identifier.clone(),
            kind,
            states,
        });
    }

    if validate {
        let folder = states_file.parent().unwrap_or_else(|| Path::new(""));
        for group in &catalog {
            for state in &group.states {
                state.validate(folder, matrix_folder)?;
            }
        }
    }

    debug!(
        path = %states_file.display(),
        groups = catalog.len(),
        "loaded state catalog"
    );
    Ok(catalog)
}

/// Collects a group's state records in order.
///
/// Arrays are taken as-is; objects keyed `"0"`, `"1"`, ... are ordered by key.
fn state_records<'a>(file: &Path, group: &str, value: &'a Value) -> Result<Vec<&'a Value>> {
    match value {
        Value::Array(items) => Ok(items.iter().collect()),
        Value::Object(items) => (0..items.len())
            .map(|i| {
                items.get(&i.to_string()).ok_or_else(|| {
                    Error::malformed(file, group, format!("missing state key \"{i}\""))
                })
            })
            .collect(),
        _ => Err(Error::malformed(
            file,
            group,
            "states must be a JSON array",
        )),
    }
}

fn parse_state(
    file: &Path,
    group: &str,
    index: usize,
    value: &Value,
    kind: GroupKind,
) -> Result<State> {
    let record = format!("{group}[{index}]");
    let fields = value
        .as_object()
        .ok_or_else(|| Error::malformed(file, &record, "state must be a JSON object"))?;

    let required = |field: &str| -> Result<String> {
        match fields.get(field) {
            Some(Value::String(s)) => Ok(s.clone()),
            Some(_) => Err(Error::malformed(
                file,
                &record,
                format!("field `{field}` must be a string"),
            )),
            None => Err(Error::malformed(
                file,
                &record,
                format!("missing field `{field}`"),
            )),
        }
    };
    let identifier = required("identifier")?;
    let default_file = normalize_relative(&required("default")?);
    let direct_file = normalize_relative(&required("direct")?);

    let mut state = State {
        identifier,
        default_file,
        direct_file,
        black_file: None,
        transmittance_matrix_file: None,
        view_matrix_file: None,
        daylight_matrix_file: None,
    };
    if kind == GroupKind::Aperture {
        state.black_file = optional(fields, "black", file, &record)?;
        state.transmittance_matrix_file = optional(fields, "tmtx", file, &record)?;
        state.view_matrix_file = optional(fields, "vmtx", file, &record)?;
        state.daylight_matrix_file = optional(fields, "dmtx", file, &record)?;
    }
    Ok(state)
}

fn optional(
    fields: &Map<String, Value>,
    field: &str,
    file: &Path,
    record: &str,
) -> Result<Option<String>> {
    match fields.get(field) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(normalize_relative(s))),
        Some(_) => Err(Error::malformed(
            file,
            record,
            format!("field `{field}` must be a string"),
        )),
    }
}
