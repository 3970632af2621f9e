//! Error taxonomy for folder, catalog, mapping, and redistribution operations.

use std::path::{Path, PathBuf};

use thiserror::Error;

/// Errors raised by the Radiance folder library.
#[derive(Debug, Error)]
pub enum Error {
    /// A mandatory input file does not exist.
    #[error("Failed to find {}", path.display())]
    NotFound {
        /// Path that was expected to exist.
        path: PathBuf,
    },

    /// A state or grid record violates the expected schema.
    #[error("Malformed record in {}: {record}: {reason}", file.display())]
    MalformedRecord {
        /// File the record was read from.
        file: PathBuf,
        /// Record locator, e.g. `south_window[1]`.
        record: String,
        /// What is wrong with the record.
        reason: String,
    },

    /// A file referenced by a state does not exist on disk.
    #[error("Failed to find {field} file for state {state}: {}", path.display())]
    Validation {
        /// Identifier of the offending state.
        state: String,
        /// Field holding the missing reference (`default`, `tmtx`, ...).
        field: &'static str,
        /// Resolved path that was checked.
        path: PathBuf,
    },

    /// A geometry file has no modifier file with the same stem.
    #[error("Failed to find matching modifier for {geometry}")]
    UnmatchedModifier {
        /// Geometry file without a modifier.
        geometry: String,
    },

    /// A group has to be blacked out but its default state has no black file.
    #[error("Aperture group {group} has no black file in its default state")]
    MissingBlackFile {
        /// Identifier of the group.
        group: String,
    },

    /// A receiver file cannot take an output spec.
    #[error("Invalid receiver file {}: {reason}", file.display())]
    ReceiverFormat {
        /// Receiver file that was inspected.
        file: PathBuf,
        /// Why the file was rejected.
        reason: ReceiverIssue,
    },

    /// An input grid holds a different number of lines than its inventory count.
    #[error("Sensor grid {identifier} declares {expected} sensors but holds {actual}")]
    CountMismatch {
        /// Identifier of the input grid.
        identifier: String,
        /// Count from the inventory.
        expected: usize,
        /// Lines actually read.
        actual: usize,
    },

    /// A redistributed file ends before a recorded line range.
    #[error("{} ends before line {line}", file.display())]
    TruncatedSource {
        /// File that was read.
        file: PathBuf,
        /// Zero-based data line that could not be read.
        line: usize,
    },

    /// Partition parameters cannot produce any output.
    #[error("Invalid partition: {0}")]
    InvalidPartition(String),

    /// A configured file pattern is not a valid regular expression.
    #[error("Invalid file pattern {pattern:?}: {source}")]
    InvalidPattern {
        /// The pattern text.
        pattern: String,
        /// Parser error.
        #[source]
        source: regex::Error,
    },

    /// The model folder already exists and overwriting was not requested.
    #[error("Model folder already exists: {}. Set overwrite to replace it.", path.display())]
    FolderExists {
        /// Existing folder.
        path: PathBuf,
    },

    /// A folder configuration file could not be parsed.
    #[error("Failed to parse folder config {}: {source}", path.display())]
    Config {
        /// Config file path.
        path: PathBuf,
        /// TOML parser error.
        #[source]
        source: toml::de::Error,
    },

    /// A folder configuration could not be rendered as TOML.
    #[error("Failed to render folder config: {0}")]
    ConfigRender(#[source] toml::ser::Error),

    /// A JSON file could not be parsed or serialized.
    #[error("Failed to process JSON {}: {source}", path.display())]
    Json {
        /// File path.
        path: PathBuf,
        /// JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// A file system operation failed.
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path involved in the operation.
        path: PathBuf,
        /// Underlying error.
        #[source]
        source: std::io::Error,
    },
}

/// Reasons a receiver file is rejected by [`crate::receiver::add_output_spec`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceiverIssue {
    /// The `#@rfluxmtx` control line is missing.
    MissingControlLine,
    /// The control line already declares `o=`.
    OutputSpecPresent,
}

impl std::fmt::Display for ReceiverIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::MissingControlLine => f.write_str("no #@rfluxmtx control line"),
            Self::OutputSpecPresent => f.write_str("control line already has an output spec"),
        }
    }
}

impl Error {
    /// Wraps an I/O error with the path it occurred on.
    pub fn io(path: impl AsRef<Path>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    /// Wraps a JSON error with the path it occurred on.
    pub fn json(path: impl AsRef<Path>, source: serde_json::Error) -> Self {
        Self::Json {
            path: path.as_ref().to_path_buf(),
            source,
        }
    }

    pub(crate) fn malformed(
        file: impl AsRef<Path>,
        record: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::MalformedRecord {
            file: file.as_ref().to_path_buf(),
            record: record.into(),
            reason: reason.into(),
        }
    }
}

/// Result alias used across the crate.
pub type Result<T> = std::result::Result<T, Error>;
