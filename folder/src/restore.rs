//! Restoring results computed on redistributed grids to the original grids.
//!
//! Result files may start with a Radiance header. A file whose first line
//! starts with `#?RADIANCE` has its header skipped up to and including the
//! first blank line after the `FORMAT=` line; line numbers in the
//! distribution records count data lines only.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::partition::{DistributionRecord, Segment, REDIST_INFO_FILE};
use crate::writer::read_json;

const HEADER_MAGIC: &[u8] = b"#?RADIANCE";
const FORMAT_PREFIX: &[u8] = b"FORMAT=";

/// Data lines of a result file, past any Radiance header.
struct DataLines<R> {
    source: R,
    path: PathBuf,
    started: bool,
    /// Line number of the next data line.
    next: usize,
}

impl<R: BufRead> DataLines<R> {
    fn new(source: R, path: PathBuf) -> Self {
        Self {
            source,
            path,
            started: false,
            next: 0,
        }
    }

    fn read_raw(&mut self, buf: &mut Vec<u8>) -> Result<bool> {
        buf.clear();
        let n = self
            .source
            .read_until(b'\n', buf)
            .map_err(|e| Error::io(&self.path, e))?;
        Ok(n > 0)
    }

    /// Reads the next data line into `buf`. Returns false at end of file.
    fn read_line(&mut self, buf: &mut Vec<u8>) -> Result<bool> {
        if !self.read_raw(buf)? {
            return Ok(false);
        }
        if !self.started {
            self.started = true;
            if buf.starts_with(HEADER_MAGIC) {
                self.skip_header(buf)?;
                if !self.read_raw(buf)? {
                    return Ok(false);
                }
            }
        }
        if !buf.ends_with(b"\n") {
            buf.push(b'\n');
        }
        self.next += 1;
        Ok(true)
    }

    fn skip_header(&mut self, buf: &mut Vec<u8>) -> Result<()> {
        let mut seen_format = false;
        loop {
            if !self.read_raw(buf)? {
                return Err(Error::TruncatedSource {
                    file: self.path.clone(),
                    line: 0,
                });
            }
            if buf.starts_with(FORMAT_PREFIX) {
                seen_format = true;
            } else if seen_format && buf.trim_ascii().is_empty() {
                return Ok(());
            }
        }
    }
}

/// Copies the lines of `segment` from `source` to `out`.
///
/// # Errors
///
/// Returns [`Error::TruncatedSource`] if `source` ends before the segment
/// does, [`Error::MalformedRecord`] for an inverted range, and I/O errors.
pub fn copy_segment<R: BufRead, W: Write>(
    source: R,
    source_path: &Path,
    segment: &Segment,
    out: &mut W,
    out_path: &Path,
) -> Result<()> {
    if segment.start_line > segment.end_line {
        return Err(Error::malformed(
            source_path,
            format!("{}:{}", segment.start_line, segment.end_line),
            "segment starts after it ends",
        ));
    }
    let mut lines = DataLines::new(source, source_path.to_path_buf());
    let mut line = Vec::new();
    while lines.next <= segment.end_line {
        let line_no = lines.next;
        if !lines.read_line(&mut line)? {
            return Err(Error::TruncatedSource {
                file: source_path.to_path_buf(),
                line: line_no,
            });
        }
        if line_no >= segment.start_line {
            out.write_all(&line).map_err(|e| Error::io(out_path, e))?;
        }
    }
    Ok(())
}

/// Rebuilds one original grid by concatenating its segments.
///
/// `source_for` maps an output index to the redistributed result file.
///
/// # Errors
///
/// Returns any error from [`copy_segment`] or from opening a source.
pub fn restore_grid<F, W>(
    record: &DistributionRecord,
    mut source_for: F,
    out: &mut W,
    out_path: &Path,
) -> Result<()>
where
    F: FnMut(usize) -> PathBuf,
    W: Write,
{
    for segment in &record.segments {
        let path = source_for(segment.output);
        let file = File::open(&path).map_err(|e| Error::io(&path, e))?;
        copy_segment(BufReader::new(file), &path, segment, out, out_path)?;
    }
    Ok(())
}

/// Restores every record's grid from `input_folder` into `output_folder`.
///
/// Sources are `<input_folder>/<index>.<extension>`; outputs are
/// `<output_folder>/<identifier>.<extension>`, with parent folders created
/// for grouped identifiers.
///
/// # Errors
///
/// Returns any error from [`restore_grid`] and I/O errors on the outputs.
pub fn restore(
    records: &[DistributionRecord],
    input_folder: &Path,
    output_folder: &Path,
    extension: &str,
) -> Result<()> {
    let extension = extension.trim_start_matches('.');
    for record in records {
        let out_path = output_folder.join(format!("{}.{extension}", record.identifier));
        if let Some(parent) = out_path.parent() {
            fs::create_dir_all(parent).map_err(|e| Error::io(parent, e))?;
        }
        let file = File::create(&out_path).map_err(|e| Error::io(&out_path, e))?;
        let mut out = BufWriter::new(file);
        restore_grid(
            record,
            |index| input_folder.join(format!("{index}.{extension}")),
            &mut out,
            &out_path,
        )?;
        out.flush().map_err(|e| Error::io(&out_path, e))?;
        debug!(path = %out_path.display(), segments = record.segments.len(), "restored grid");
    }
    Ok(())
}

/// Restores the grids of a redistributed folder.
///
/// Records are read from `dist_info`, or from
/// `<input_folder>/_redist_info.json` when `None`. Returns the number of
/// restored files.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if the records file is missing, and any
/// error from [`restore`].
pub fn restore_original_distribution(
    input_folder: &Path,
    output_folder: &Path,
    extension: &str,
    dist_info: Option<&Path>,
) -> Result<usize> {
    let info_file = dist_info.map_or_else(|| input_folder.join(REDIST_INFO_FILE), Path::to_path_buf);
    let records: Vec<DistributionRecord> = read_json(&info_file)?;
    restore(&records, input_folder, output_folder, extension)?;
    info!(
        "Restored {} grids from {} to {}.",
        records.len(),
        input_folder.display(),
        output_folder.display()
    );
    Ok(records.len())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::io::Cursor;

    fn segment(output: usize, start_line: usize, end_line: usize) -> Segment {
        Segment {
            output,
            start_line,
            end_line,
        }
    }

    fn copy(source: &str, seg: Segment) -> Result<String> {
        let mut out = Vec::new();
        copy_segment(
            Cursor::new(source),
            Path::new("0.ill"),
            &seg,
            &mut out,
            Path::new("out.ill"),
        )?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn plain_files_are_copied_by_line() {
        let source = "a\nb\nc\nd\n";
        assert_eq!(copy(source, segment(0, 1, 2)).unwrap(), "b\nc\n");
        assert_eq!(copy(source, segment(0, 3, 3)).unwrap(), "d\n");
    }

    #[test]
    fn radiance_header_is_skipped() {
        let source = "#?RADIANCE\nrfluxmtx -h\nNROWS=3\nFORMAT=ascii\n\n1 1 1\n2 2 2\n3 3 3";
        assert_eq!(copy(source, segment(0, 0, 0)).unwrap(), "1 1 1\n");
        assert_eq!(copy(source, segment(0, 1, 2)).unwrap(), "2 2 2\n3 3 3\n");
    }

    #[test]
    fn blank_line_before_format_does_not_end_header() {
        let source = "#?RADIANCE\n\nFORMAT=ascii\n\nx\n";
        assert_eq!(copy(source, segment(0, 0, 0)).unwrap(), "x\n");
    }

    #[test]
    fn short_source_is_truncated() {
        let err = copy("a\nb\n", segment(0, 1, 4)).unwrap_err();
        assert!(matches!(err, Error::TruncatedSource { line: 2, .. }));
    }

    #[test]
    fn unterminated_header_is_truncated() {
        let err = copy("#?RADIANCE\nFORMAT=ascii\n", segment(0, 0, 0)).unwrap_err();
        assert!(matches!(err, Error::TruncatedSource { line: 0, .. }));
    }

    #[test]
    fn inverted_segment_is_malformed() {
        let err = copy("a\nb\n", segment(0, 1, 0)).unwrap_err();
        assert!(matches!(err, Error::MalformedRecord { .. }));
    }

    #[test]
    fn grids_are_restored_from_records() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("results");
        fs::create_dir_all(&input).unwrap();
        fs::write(input.join("0.ill"), "r1 0\nr1 1\nr1 2\n").unwrap();
        fs::write(
            input.join("1.ill"),
            "#?RADIANCE\nFORMAT=ascii\n\nr1 3\nr2 0\nr2 1\n",
        )
        .unwrap();
        let records = vec![
            DistributionRecord {
                identifier: "room_1".to_string(),
                segments: vec![segment(0, 0, 2), segment(1, 0, 0)],
            },
            DistributionRecord {
                identifier: "floor/room_2".to_string(),
                segments: vec![segment(1, 1, 2)],
            },
        ];
        crate::writer::write_json(&input.join(REDIST_INFO_FILE), &records).unwrap();

        let output = dir.path().join("restored");
        let restored = restore_original_distribution(&input, &output, ".ill", None).unwrap();
        assert_eq!(restored, 2);
        assert_eq!(
            fs::read_to_string(output.join("room_1.ill")).unwrap(),
            "r1 0\nr1 1\nr1 2\nr1 3\n"
        );
        assert_eq!(
            fs::read_to_string(output.join("floor/room_2.ill")).unwrap(),
            "r2 0\nr2 1\n"
        );
    }

    #[test]
    fn missing_records_file_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let err = restore_original_distribution(dir.path(), dir.path(), "ill", None).unwrap_err();
        assert!(matches!(err, Error::NotFound { .. }));
    }
}
