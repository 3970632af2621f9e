//! Sensor grid redistribution.
//!
//! Input grids are streamed, in order, into a fixed number of output grids of
//! near-equal size. Each input records where its lines went so results
//! computed on the output grids can be mapped back (see [`crate::restore`]).
//!
//! `_redist_info.json` holds one record per input grid:
//!
//! ```json
//! [
//!   {"identifier": "room_1", "dist_info": [
//!     {"identifier": 0, "st_ln": 0, "end_ln": 175},
//!     {"identifier": 1, "st_ln": 0, "end_ln": 21}
//!   ]},
//!   {"identifier": "room_2", "dist_info": [
//!     {"identifier": 1, "st_ln": 22, "end_ln": 135}
//!   ]}
//! ]
//! ```
//!
//! Line ranges are zero-based and inclusive. The last output grid absorbs the
//! remainder once every other output is full, so it may hold more than
//! `lines_per_output` lines.

use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::grid::{parse_grid_info, GridRecord};
use crate::writer::write_json;

/// File name of the provenance records in a redistributed folder.
pub const REDIST_INFO_FILE: &str = "_redist_info.json";

/// File name of a grid inventory.
pub const GRID_INFO_FILE: &str = "_info.json";

/// Sizing of a redistribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PartitionPlan {
    /// Number of output grids allotted.
    pub output_count: usize,
    /// Lines per output before the last output absorbs the remainder.
    pub lines_per_output: usize,
}

impl PartitionPlan {
    /// Sizes a redistribution of `total` lines.
    ///
    /// `lines_per_output` is `total / target_count` rounded half to even. If
    /// that is below `min_count`, the output count becomes
    /// `floor(total / min_count)` (at least one) and the line count is
    /// recomputed, so `min_count` always wins over `target_count`. Where
    /// `total / min_count` ends in `.5` or more this yields one output fewer
    /// than rounding would: 3000 lines at a minimum of 2000 give one output
    /// of 3000, not two of 1500.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidPartition`] if `target_count` is zero.
    pub fn new(total: usize, target_count: usize, min_count: usize) -> Result<Self> {
        if target_count == 0 {
            return Err(Error::InvalidPartition(
                "target count must be at least 1".to_string(),
            ));
        }
        let mut output_count = target_count;
        let mut lines_per_output = div_round(total, output_count).max(1);
        if lines_per_output < min_count {
            output_count = (total / min_count).max(1);
            lines_per_output = div_round(total, output_count).max(1);
        }
        Ok(Self {
            output_count,
            lines_per_output,
        })
    }
}

/// Integer division rounded half to even.
fn div_round(numerator: usize, denominator: usize) -> usize {
    let quotient = numerator / denominator;
    let twice_remainder = 2 * (numerator % denominator);
    if twice_remainder > denominator || (twice_remainder == denominator && quotient % 2 == 1) {
        quotient + 1
    } else {
        quotient
    }
}

/// Contiguous line range of an input grid inside one output grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Index of the output grid.
    #[serde(rename = "identifier")]
    pub output: usize,
    /// First line, zero-based.
    #[serde(rename = "st_ln")]
    pub start_line: usize,
    /// Last line, inclusive.
    #[serde(rename = "end_ln")]
    pub end_line: usize,
}

/// Where the lines of one input grid ended up.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DistributionRecord {
    /// Identifier (`full_id`) of the input grid.
    pub identifier: String,
    /// Line ranges in output order.
    #[serde(rename = "dist_info")]
    pub segments: Vec<Segment>,
}

/// One input grid to redistribute.
#[derive(Debug)]
pub struct PartitionInput<R> {
    /// Identifier recorded in the distribution record.
    pub identifier: String,
    /// Declared number of lines.
    pub count: usize,
    /// Line source.
    pub source: R,
    /// Path reported in errors.
    pub path: PathBuf,
}

impl<R: BufRead> PartitionInput<R> {
    /// Creates an input whose error path is its identifier.
    pub fn new(identifier: impl Into<String>, count: usize, source: R) -> Self {
        let identifier = identifier.into();
        Self {
            path: PathBuf::from(&identifier),
            identifier,
            count,
            source,
        }
    }
}

/// Outcome of [`partition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Partition {
    /// Number of non-empty output grids produced.
    pub output_count: usize,
    /// Planned lines per output.
    pub lines_per_output: usize,
    /// Lines written to each output, by index.
    pub counts: Vec<usize>,
    /// Provenance per input, in input order.
    pub records: Vec<DistributionRecord>,
}

/// Output grids opened lazily by index.
struct Outputs<W, F> {
    open: F,
    plan: PartitionPlan,
    current: Option<(PathBuf, W)>,
    written: usize,
    counts: Vec<usize>,
}

impl<W, F> Outputs<W, F>
where
    W: Write,
    F: FnMut(usize) -> Result<(PathBuf, W)>,
{
    /// Writes one line and returns `(output index, line number)`.
    fn write_line(&mut self, line: &[u8]) -> Result<(usize, usize)> {
        let index = self.counts.len();
        let (path, mut writer) = match self.current.take() {
            Some(stream) => stream,
            None => {
                let stream = (self.open)(index)?;
                debug!(path = %stream.0.display(), "started writing");
                stream
            }
        };
        writer.write_all(line).map_err(|e| Error::io(&path, e))?;
        self.current = Some((path, writer));

        let position = (index, self.written);
        self.written += 1;
        // The last allotted output never rotates; it takes the remainder.
        if self.written == self.plan.lines_per_output && index + 1 < self.plan.output_count {
            self.close()?;
        }
        Ok(position)
    }

    fn close(&mut self) -> Result<()> {
        if let Some((path, mut writer)) = self.current.take() {
            writer.flush().map_err(|e| Error::io(&path, e))?;
            self.counts.push(self.written);
            self.written = 0;
        }
        Ok(())
    }
}

/// Streams inputs into output grids following `plan`.
///
/// `open_output` is called with the output index the first time a line goes
/// to that output, so no output is ever empty. A final line without a
/// newline is terminated with `\n`.
///
/// # Errors
///
/// Returns [`Error::CountMismatch`] if an input holds a different number of
/// lines than declared, and any error produced while opening, reading, or
/// writing. Outputs written before the failure are left as they are.
pub fn partition<I, R, W, F>(inputs: I, plan: PartitionPlan, open_output: F) -> Result<Partition>
where
    I: IntoIterator<Item = Result<PartitionInput<R>>>,
    R: BufRead,
    W: Write,
    F: FnMut(usize) -> Result<(PathBuf, W)>,
{
    let mut outputs = Outputs {
        open: open_output,
        plan,
        current: None,
        written: 0,
        counts: Vec::new(),
    };
    let mut records = Vec::new();
    let mut line = Vec::new();

    for input in inputs {
        let mut input = input?;
        debug!(path = %input.path.display(), "started reading");
        let mut segments: Vec<Segment> = Vec::new();
        let mut read = 0usize;
        loop {
            line.clear();
            let n = input
                .source
                .read_until(b'\n', &mut line)
                .map_err(|e| Error::io(&input.path, e))?;
            if n == 0 {
                break;
            }
            if !line.ends_with(b"\n") {
                line.push(b'\n');
            }
            read += 1;

            let (output, line_no) = outputs.write_line(&line)?;
            match segments.last_mut() {
                Some(segment) if segment.output == output => segment.end_line = line_no,
                _ => segments.push(Segment {
                    output,
                    start_line: line_no,
                    end_line: line_no,
                }),
            }
        }
        if read != input.count {
            return Err(Error::CountMismatch {
                identifier: input.identifier,
                expected: input.count,
                actual: read,
            });
        }
        records.push(DistributionRecord {
            identifier: input.identifier,
            segments,
        });
    }
    outputs.close()?;

    Ok(Partition {
        output_count: outputs.counts.len(),
        lines_per_output: plan.lines_per_output,
        counts: outputs.counts,
        records,
    })
}

/// Options for [`redistribute_sensors`].
#[derive(Debug, Clone)]
pub struct RedistributeOptions {
    /// Requested number of output grids, usually the number of workers.
    pub grid_count: usize,
    /// Minimum sensors per output grid. Takes precedence over `grid_count`.
    pub min_sensor_count: usize,
    /// Extension of the grid files (`pts`, `csv`, ...).
    pub extension: String,
    /// Inventory to use instead of `<input_folder>/_info.json`.
    pub grid_info: Option<Vec<GridRecord>>,
}

impl RedistributeOptions {
    /// Options for `grid_count` outputs with the default minimum of 2000
    /// sensors per grid and `pts` files.
    pub fn new(grid_count: usize) -> Self {
        Self {
            grid_count,
            min_sensor_count: 2000,
            extension: "pts".to_string(),
            grid_info: None,
        }
    }
}

/// Outcome of [`redistribute_sensors`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Redistribution {
    /// Number of output grids written.
    pub grid_count: usize,
    /// Sensors per output grid before remainder absorption.
    pub sensors_per_grid: usize,
    /// Inventory written to `<output_folder>/_info.json`.
    pub grid_info: Vec<GridRecord>,
    /// Records written to `<output_folder>/_redist_info.json`.
    pub records: Vec<DistributionRecord>,
}

/// Redistributes the grids of `input_folder` into `output_folder`.
///
/// Output grids are named `<index>.<extension>`. After all lines are
/// written, `_redist_info.json` and `_info.json` are written to the output
/// folder.
///
/// # Errors
///
/// Returns [`Error::NotFound`] if no inventory is supplied and
/// `_info.json` is missing, and any partition or I/O error.
pub fn redistribute_sensors(
    input_folder: &Path,
    output_folder: &Path,
    options: &RedistributeOptions,
) -> Result<Redistribution> {
    let grids = match &options.grid_info {
        Some(grids) => grids.clone(),
        None => {
            let info_file = input_folder.join(GRID_INFO_FILE);
            if !info_file.is_file() {
                return Err(Error::NotFound { path: info_file });
            }
            parse_grid_info(&info_file)?
        }
    };
    let total: usize = grids.iter().map(|g| g.count).sum();
    let plan = PartitionPlan::new(total, options.grid_count, options.min_sensor_count)?;

    fs::create_dir_all(output_folder).map_err(|e| Error::io(output_folder, e))?;

    let extension = options.extension.as_str();
    let inputs = grids.iter().map(|grid| -> Result<PartitionInput<BufReader<File>>> {
        let path = input_folder.join(format!("{}.{extension}", grid.file_stem()));
        let file = File::open(&path).map_err(|e| Error::io(&path, e))?;
        Ok(PartitionInput {
            identifier: grid.file_stem().to_string(),
            count: grid.count,
            source: BufReader::new(file),
            path,
        })
    });
    let result = partition(inputs, plan, |index| {
        let path = output_folder.join(format!("{index}.{extension}"));
        let file = File::create(&path).map_err(|e| Error::io(&path, e))?;
        Ok((path, BufWriter::new(file)))
    })?;

    let grid_info: Vec<GridRecord> = result
        .counts
        .iter()
        .enumerate()
        .map(|(index, &count)| GridRecord {
            identifier: index.to_string(),
            name: Some(index.to_string()),
            full_id: Some(index.to_string()),
            group: Some(String::new()),
            count,
            light_path: Vec::new(),
        })
        .collect();

    write_json(&output_folder.join(REDIST_INFO_FILE), &result.records)?;
    write_json(&output_folder.join(GRID_INFO_FILE), &grid_info)?;

    info!(
        "Distributed {} sensors among {} grids with {} sensors each.",
        total, result.output_count, result.lines_per_output
    );

    Ok(Redistribution {
        grid_count: result.output_count,
        sensors_per_grid: result.lines_per_output,
        grid_info,
        records: result.records,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::io::Cursor;
    use std::rc::Rc;

    fn lines(prefix: &str, count: usize) -> String {
        (0..count).map(|i| format!("{prefix} {i}\n")).collect()
    }

    fn run(counts: &[usize], plan: PartitionPlan) -> (Partition, Vec<Vec<u8>>) {
        let inputs: Vec<_> = counts
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                PartitionInput::new(
                    format!("grid_{i}"),
                    n,
                    Cursor::new(lines(&format!("g{i}"), n)),
                )
            })
            .collect();
        run_inputs(inputs, plan)
    }

    fn run_inputs(
        inputs: Vec<PartitionInput<Cursor<String>>>,
        plan: PartitionPlan,
    ) -> (Partition, Vec<Vec<u8>>) {
        let mut buffers: Vec<Rc<RefCell<Vec<u8>>>> = Vec::new();
        let result = partition(inputs.into_iter().map(Ok), plan, |index| {
            let buffer = Rc::new(RefCell::new(Vec::new()));
            buffers.push(Rc::clone(&buffer));
            Ok((PathBuf::from(index.to_string()), SharedBuffer(buffer)))
        })
        .unwrap();
        let outputs = buffers.into_iter().map(|b| b.borrow().clone()).collect();
        (result, outputs)
    }

    struct SharedBuffer(Rc<RefCell<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.borrow_mut().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn plan_rounds_half_to_even() {
        assert_eq!(div_round(10, 4), 2);
        assert_eq!(div_round(14, 4), 4);
        assert_eq!(div_round(10, 3), 3);
        assert_eq!(div_round(11, 3), 4);
    }

    #[test]
    fn min_count_takes_precedence() {
        let plan = PartitionPlan::new(1000, 9, 2000).unwrap();
        assert_eq!(
            plan,
            PartitionPlan {
                output_count: 1,
                lines_per_output: 1000
            }
        );

        let plan = PartitionPlan::new(7000, 10, 2000).unwrap();
        assert_eq!(plan.output_count, 3);
        assert!(plan.lines_per_output >= 2000);
    }

    #[test]
    fn recompute_floors_the_output_count() {
        assert_eq!(
            PartitionPlan::new(3000, 9, 2000).unwrap(),
            PartitionPlan {
                output_count: 1,
                lines_per_output: 3000
            }
        );
    }

    #[test]
    fn zero_target_is_rejected() {
        assert!(matches!(
            PartitionPlan::new(10, 0, 1),
            Err(Error::InvalidPartition(_))
        ));
    }

    #[test]
    fn equal_inputs_map_one_to_one() {
        let plan = PartitionPlan::new(1500, 3, 1).unwrap();
        let (result, outputs) = run(&[500, 500, 500], plan);
        assert_eq!(result.output_count, 3);
        assert_eq!(result.counts, [500, 500, 500]);
        for (i, record) in result.records.iter().enumerate() {
            assert_eq!(
                record.segments,
                [Segment {
                    output: i,
                    start_line: 0,
                    end_line: 499
                }]
            );
        }
        assert_eq!(outputs[1], lines("g1", 500).into_bytes());
    }

    #[test]
    fn inputs_split_across_boundaries() {
        let plan = PartitionPlan {
            output_count: 3,
            lines_per_output: 4,
        };
        let (result, _) = run(&[6, 3, 2], plan);
        assert_eq!(result.counts, [4, 4, 3]);
        let segments: Vec<_> = result
            .records
            .iter()
            .map(|r| {
                r.segments
                    .iter()
                    .map(|s| (s.output, s.start_line, s.end_line))
                    .collect::<Vec<_>>()
            })
            .collect();
        assert_eq!(
            segments,
            [
                vec![(0, 0, 3), (1, 0, 1)],
                vec![(1, 2, 3)],
                vec![(2, 0, 1)],
            ]
        );
    }

    #[test]
    fn last_output_absorbs_remainder() {
        let plan = PartitionPlan {
            output_count: 2,
            lines_per_output: 3,
        };
        let (result, outputs) = run(&[4, 5], plan);
        assert_eq!(result.output_count, 2);
        assert_eq!(result.counts, [3, 6]);
        assert_eq!(
            result.records[0].segments,
            [
                Segment {
                    output: 0,
                    start_line: 0,
                    end_line: 2
                },
                Segment {
                    output: 1,
                    start_line: 0,
                    end_line: 0
                },
            ]
        );
        assert_eq!(
            result.records[1].segments,
            [Segment {
                output: 1,
                start_line: 1,
                end_line: 5
            }]
        );
        assert_eq!(outputs[1].iter().filter(|&&b| b == b'\n').count(), 6);
    }

    #[test]
    fn small_totals_produce_fewer_outputs() {
        // 10 lines for 6 outputs: 2 lines each fill five outputs exactly.
        let plan = PartitionPlan::new(10, 6, 1).unwrap();
        assert_eq!(plan.lines_per_output, 2);
        let (result, outputs) = run(&[10], plan);
        assert_eq!(result.output_count, 5);
        assert_eq!(outputs.len(), 5);
        assert!(result.counts.iter().all(|&c| c == 2));
    }

    #[test]
    fn declared_count_must_match() {
        let plan = PartitionPlan::new(5, 1, 1).unwrap();
        let inputs = vec![Ok(PartitionInput::new("room", 5, Cursor::new(lines("r", 4))))];
        let err = partition(inputs, plan, |_| Ok((PathBuf::from("0"), Vec::new()))).unwrap_err();
        assert!(matches!(
            err,
            Error::CountMismatch {
                expected: 5,
                actual: 4,
                ..
            }
        ));
    }

    #[test]
    fn missing_trailing_newline_is_terminated() {
        let plan = PartitionPlan::new(3, 1, 1).unwrap();
        let inputs = vec![
            PartitionInput::new("a", 2, Cursor::new("1\n2".to_string())),
            PartitionInput::new("b", 1, Cursor::new("3\n".to_string())),
        ];
        let (result, outputs) = run_inputs(inputs, plan);
        assert_eq!(result.counts, [3]);
        assert_eq!(outputs, [b"1\n2\n3\n".to_vec()]);
    }
}
