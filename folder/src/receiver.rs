//! Combined receiver files for matrix-based studies.
//!
//! A combined receiver lets one `rfluxmtx` run collect the view matrices of
//! several aperture groups for one sensor grid:
//!
//! ```text
//! # room..receiver.rad
//! #@rfluxmtx o=south_window..room.vmx
//! !xform ./model/aperture_group/south_window..mtx.rad
//! ```

use std::fs;
use std::path::Path;

use tracing::debug;

use crate::error::{Error, ReceiverIssue, Result};
use crate::writer::write_text;

/// Control-line marker read by `rfluxmtx`.
pub const CONTROL_MARKER: &str = "#@rfluxmtx";

/// File name of the combined receiver for a grid.
pub fn receiver_file_name(grid_identifier: &str) -> String {
    format!("{grid_identifier}..receiver.rad")
}

/// Writes the combined receiver for one grid and returns its file name.
///
/// Groups are referenced in the given order as
/// `./<group_folder>/<group>..mtx.rad`. With `annotate_output` each
/// reference is preceded by a control line naming the view matrix
/// `<group>..<grid>.vmx`.
///
/// # Errors
///
/// Returns an error if the file cannot be written.
pub fn write_combined_receiver(
    grid_identifier: &str,
    group_folder: &str,
    group_ids: &[String],
    target_folder: &Path,
    annotate_output: bool,
) -> Result<String> {
    let file_name = receiver_file_name(grid_identifier);
    let group_folder = group_folder.replace('\\', "/");
    let group_folder = group_folder.trim_end_matches('/');

    let mut lines = vec![format!("# {file_name}")];
    for group in group_ids {
        if annotate_output {
            lines.push(format!("{CONTROL_MARKER} o={group}..{grid_identifier}.vmx"));
        }
        lines.push(format!("!xform ./{group_folder}/{group}..mtx.rad"));
    }
    let mut content = lines.join("\n");
    content.push('\n');

    let path = target_folder.join(&file_name);
    write_text(&path, &content)?;
    debug!(path = %path.display(), groups = group_ids.len(), "wrote combined receiver");
    Ok(file_name)
}

/// Adds `o=<output_spec>` to the control line of an existing receiver file.
///
/// The result is written to `output_file`, or back to `receiver_file` when
/// `output_file` is `None`. Nothing is written when the file is rejected.
///
/// # Errors
///
/// Returns [`Error::ReceiverFormat`] if the file has no `#@rfluxmtx` line or
/// the line already declares an output, and I/O errors otherwise.
pub fn add_output_spec(
    receiver_file: &Path,
    output_spec: &str,
    output_file: Option<&Path>,
) -> Result<()> {
    let content = fs::read_to_string(receiver_file).map_err(|e| Error::io(receiver_file, e))?;
    let updated = with_output_spec(&content, output_spec).map_err(|reason| {
        Error::ReceiverFormat {
            file: receiver_file.to_path_buf(),
            reason,
        }
    })?;
    write_text(output_file.unwrap_or(receiver_file), &updated)
}

/// Inserts the output spec into the first control line of `content`.
fn with_output_spec(content: &str, output_spec: &str) -> std::result::Result<String, ReceiverIssue> {
    let start = content
        .find(CONTROL_MARKER)
        .ok_or(ReceiverIssue::MissingControlLine)?;
    let params_start = start + CONTROL_MARKER.len();
    let line_end = content[params_start..]
        .find('\n')
        .map_or(content.len(), |i| params_start + i);

    let params: Vec<&str> = content[params_start..line_end].split_whitespace().collect();
    if params.iter().any(|p| p.starts_with("o=")) {
        return Err(ReceiverIssue::OutputSpecPresent);
    }

    let mut line = String::from(CONTROL_MARKER);
    for param in params {
        line.push(' ');
        line.push_str(param);
    }
    line.push_str(" o=");
    line.push_str(output_spec);

    Ok(format!(
        "{}{}{}",
        &content[..start],
        line,
        &content[line_end..]
    ))
}
