//! JSON and text file readers/writers shared by the folder operations.

use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};

/// Reads and parses a JSON file.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the file is missing, [`Error::Io`] if it
/// cannot be read, and [`Error::Json`] if it does not parse into `T`.
pub fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    if !path.is_file() {
        return Err(Error::NotFound {
            path: path.to_path_buf(),
        });
    }
    let content = fs::read_to_string(path).map_err(|e| Error::io(path, e))?;
    serde_json::from_str(&content).map_err(|e| Error::json(path, e))
}

/// Reads a JSON file, returning `None` when it does not exist.
///
/// # Errors
///
/// Returns an error if an existing file cannot be read or parsed.
pub fn read_json_optional<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    if !path.is_file() {
        return Ok(None);
    }
    read_json(path).map(Some)
}

/// Serializes `value` as indented JSON and writes it to `path`, creating
/// parent directories as needed.
///
/// # Errors
///
/// Returns an error if serialization fails or the file cannot be written.
pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let content = serde_json::to_string_pretty(value).map_err(|e| Error::json(path, e))?;
    write_text(path, &content)
}

/// Writes a text file, creating parent directories as needed.
///
/// # Errors
///
/// Returns an error if the directory cannot be created or the file cannot be written.
pub fn write_text(path: &Path, content: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
    }
    fs::write(path, content).map_err(|e| Error::io(path, e))
}

/// Renders a path with `/` separators regardless of platform.
pub fn as_posix(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

/// Normalizes a path read from a JSON record or built from a folder listing.
///
/// `./` and empty components are dropped, `..` pops the previous component
/// when there is one, and `\` separators become `/`. A leading separator is
/// kept, so absolute paths stay absolute; `..` never climbs above their root.
pub fn normalize_relative(path: &str) -> String {
    let absolute = path.starts_with(['/', '\\']);
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split(['/', '\\']) {
        match part {
            "" | "." => {}
            ".." => match parts.last() {
                Some(last) if *last != ".." => {
                    parts.pop();
                }
                None if absolute => {}
                _ => parts.push(".."),
            },
            other => parts.push(other),
        }
    }
    if absolute {
        format!("/{}", parts.join("/"))
    } else {
        parts.join("/")
    }
}

/// Resolves `file` against `folder`, both posix. An absolute `file` is
/// returned as it is, normalized.
pub fn join_posix(folder: &str, file: &str) -> String {
    if folder.is_empty() || file.starts_with(['/', '\\']) {
        normalize_relative(file)
    } else {
        normalize_relative(&format!("{folder}/{file}"))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn normalize_strips_current_dir() {
        assert_eq!(
            normalize_relative("./south_window..default..000.rad"),
            "south_window..default..000.rad"
        );
    }

    #[test]
    fn normalize_handles_backslashes_and_parents() {
        assert_eq!(normalize_relative(r"a\.\b\..\c.rad"), "a/c.rad");
        assert_eq!(normalize_relative("../shared/x.rad"), "../shared/x.rad");
    }

    #[test]
    fn absolute_paths_keep_their_root() {
        assert_eq!(normalize_relative("/srv/model/./a.rad"), "/srv/model/a.rad");
        assert_eq!(normalize_relative("/../a.rad"), "/a.rad");
        assert_eq!(normalize_relative(r"\\share\a.rad"), "/share/a.rad");
    }

    #[test]
    fn absolute_files_ignore_the_folder() {
        assert_eq!(
            join_posix("model/aperture_group", "./w..black.rad"),
            "model/aperture_group/w..black.rad"
        );
        assert_eq!(
            join_posix("model/aperture_group", "/lib/w..black.rad"),
            "/lib/w..black.rad"
        );
        assert_eq!(join_posix("", "w.rad"), "w.rad");
    }

    #[test]
    fn missing_optional_json_is_none() {
        let dir = tempfile::tempdir().unwrap();
        let value: Option<Vec<u32>> = read_json_optional(&dir.path().join("nope.json")).unwrap();
        assert!(value.is_none());
    }

    #[test]
    fn missing_required_json_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = read_json::<Vec<u32>>(&dir.path().join("nope.json")).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
