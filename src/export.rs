// SPDX-License-Identifier: MIT
//
// Copyright 2025, The cellfeed authors.

//! Cell stream to tsv export

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;

use log::{debug, warn};

use crate::errors::Error;
use crate::feed::{FeedError, FeedReader};
use crate::grid::{CellRecord, GridAccumulator, GridError, RowSink};
use crate::stream::{open_input, StreamError};
use crate::tsv::{LineEnding, TsvWriter};

/// Export configuration
#[derive(Debug, Clone, Default)]
pub struct ExportOptions {
    line_ending: LineEnding,
    column_count: Option<usize>,
}

impl ExportOptions {
    /// Creates the default options: `\n` line endings, column count taken
    /// from the source
    pub fn new() -> ExportOptions {
        ExportOptions::default()
    }

    /// Sets the line terminator written after every row
    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Overrides the column count declared by a cell feed
    ///
    /// Only [`export_feed`] reads this value, [`export`] is always given an
    /// explicit column count.
    pub fn with_column_count(mut self, column_count: usize) -> Self {
        self.column_count = Some(column_count);
        self
    }

    /// Line terminator
    pub fn line_ending(&self) -> LineEnding {
        self.line_ending
    }

    /// Column count override
    pub fn column_count(&self) -> Option<usize> {
        self.column_count
    }
}

/// What a successful export wrote
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExportSummary {
    /// Number of lines written
    pub rows: u64,
    /// Number of fields per line
    pub columns: usize,
    /// Number of records read from the source
    pub cells: u64,
}

/// Writes a sparse cell stream as a dense tab separated table
///
/// `records` must be grouped by non decreasing row. Every row between 1 and
/// the last row seen is written, `column_count` fields each. The writer is
/// flushed on every exit path; when an error is returned its content is
/// partial and must be discarded.
///
/// Any failure of `writer`, while writing a row or flushing, is reported as
/// [`GridError::Io`].
///
/// # Examples
/// ```
/// use cellfeed::{export, CellRecord, ExportOptions};
/// use std::convert::Infallible;
///
/// let records = [("R1C1", "a"), ("R1C2", "b"), ("R3C1", "c")]
///     .into_iter()
///     .map(|r| Ok::<_, Infallible>(CellRecord::from(r)));
/// let mut out: Vec<u8> = Vec::new();
/// let summary = export(records, 2, &mut out, &ExportOptions::new()).unwrap();
/// assert_eq!(out, b"a\tb\n\t\nc\t\n");
/// assert_eq!(summary.rows, 3);
/// ```
pub fn export<I, E, W>(
    records: I,
    column_count: usize,
    writer: W,
    options: &ExportOptions,
) -> Result<ExportSummary, Error>
where
    I: IntoIterator<Item = Result<CellRecord, E>>,
    E: Into<Error>,
    W: Write,
{
    let mut tsv = TsvWriter::new(writer).with_line_ending(options.line_ending);
    let result = accumulate(records, column_count, &mut tsv);
    let flushed = tsv.flush();
    match result {
        Ok(summary) => {
            flushed.map_err(GridError::Io)?;
            debug!(
                "exported {} cells into {} rows of {} columns",
                summary.cells, summary.rows, summary.columns
            );
            Ok(summary)
        }
        Err(e) => {
            if let Err(fe) = flushed {
                warn!("cannot flush partial output: {fe}");
            }
            warn!(
                "export failed after {} rows, output is incomplete: {e}",
                tsv.rows_written()
            );
            Err(e)
        }
    }
}

fn accumulate<I, E, S>(records: I, column_count: usize, sink: &mut S) -> Result<ExportSummary, Error>
where
    I: IntoIterator<Item = Result<CellRecord, E>>,
    E: Into<Error>,
    S: RowSink,
{
    let mut grid = GridAccumulator::new(column_count)?;
    for record in records {
        let record = record.map_err(Into::<Error>::into)?;
        grid.push(record, &mut *sink)?;
    }
    let cells = grid.cells();
    let rows = grid.finish(sink)?;
    Ok(ExportSummary {
        rows,
        columns: column_count,
        cells,
    })
}

/// Converts a cell feed file into a tsv file
///
/// The input may be gzip or zip compressed (see [`open_input`]). The column
/// count is the one declared by the feed unless overridden in `options`.
/// An `output` leading to the input file itself is refused with
/// [`StreamError::OutputIsInput`].
pub fn export_feed<P, Q>(input: P, output: Q, options: &ExportOptions) -> Result<ExportSummary, Error>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let (input, output) = (input.as_ref(), output.as_ref());
    let feed = FeedReader::new(open_input(input)?)?;
    if let (Ok(i), Ok(o)) = (fs::canonicalize(input), fs::canonicalize(output)) {
        if i == o {
            return Err(StreamError::OutputIsInput(o).into());
        }
    }
    let column_count = options
        .column_count
        .or(feed.metadata().column_count)
        .ok_or(FeedError::MissingColumnCount)?;
    debug!(
        "exporting '{}' ({} columns) to '{}'",
        input.display(),
        column_count,
        output.display()
    );
    let declared_rows = feed.metadata().row_count;
    let writer = BufWriter::new(File::create(output)?);
    let summary = export(feed, column_count, writer, options)?;
    if let Some(declared) = declared_rows {
        if summary.rows > declared as u64 {
            warn!(
                "'{}' declares {declared} rows but {} were written",
                input.display(),
                summary.rows
            );
        }
    }
    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;
    use std::io;

    fn records<'a>(
        cells: &'a [(&'a str, &'a str)],
    ) -> impl Iterator<Item = Result<CellRecord, Infallible>> + 'a {
        cells.iter().map(|&c| Ok(CellRecord::from(c)))
    }

    fn to_tsv(cells: &[(&str, &str)], column_count: usize) -> Result<String, Error> {
        let mut out: Vec<u8> = Vec::new();
        export(records(cells), column_count, &mut out, &ExportOptions::new())?;
        Ok(String::from_utf8(out).unwrap())
    }

    #[test]
    fn test_examples() {
        assert_eq!(
            to_tsv(&[("R1C1", "a"), ("R1C2", "b"), ("R3C1", "c")], 2).unwrap(),
            "a\tb\n\t\nc\t\n"
        );
        assert_eq!(to_tsv(&[], 3).unwrap(), "\t\t\n");
        assert_eq!(to_tsv(&[("R1C1", "x"), ("R1C1", "y")], 1).unwrap(), "y\n");
        assert_eq!(to_tsv(&[("R2C1", "z")], 1).unwrap(), "\nz\n");
        assert!(matches!(
            to_tsv(&[("R1C1", "a"), ("bogus", "b")], 1),
            Err(Error::Grid(GridError::MalformedCoordinate(_)))
        ));
    }

    #[test]
    fn test_crlf() {
        let mut out: Vec<u8> = Vec::new();
        let opts = ExportOptions::new().with_line_ending(LineEnding::CrLf);
        export(records(&[("R2C2", "b")]), 2, &mut out, &opts).unwrap();
        assert_eq!(out, b"\t\r\n\tb\r\n");
    }

    #[test]
    fn test_summary() {
        let mut out: Vec<u8> = Vec::new();
        let summary = export(
            records(&[("R1C1", "a"), ("R1C1", "b"), ("R4C3", "c")]),
            3,
            &mut out,
            &ExportOptions::new(),
        )
        .unwrap();
        assert_eq!(
            summary,
            ExportSummary {
                rows: 4,
                columns: 3,
                cells: 3
            }
        );
    }

    #[test]
    fn test_source_error_is_propagated() {
        let source = vec![
            Ok(CellRecord::from(("R1C1", "a"))),
            Err(FeedError::MissingEntryId),
            Ok(CellRecord::from(("R2C1", "b"))),
        ];
        let mut out: Vec<u8> = Vec::new();
        let err = export(source, 1, &mut out, &ExportOptions::new()).unwrap_err();
        assert!(matches!(err, Error::Feed(FeedError::MissingEntryId)));
    }

    /// Records every write and flush, optionally failing writes after a limit
    /// or failing every flush
    #[derive(Default)]
    struct Recorder {
        written: Vec<u8>,
        flushes: usize,
        fail_after: Option<usize>,
        fail_flush: bool,
    }

    impl Write for Recorder {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_after.is_some_and(|n| self.written.len() + buf.len() > n) {
                return Err(io::Error::other("disk full"));
            }
            self.written.extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> io::Result<()> {
            self.flushes += 1;
            if self.fail_flush {
                return Err(io::Error::other("disk full"));
            }
            Ok(())
        }
    }

    #[test]
    fn test_flushed_on_failure() {
        let mut recorder = Recorder::default();
        let err = export(
            records(&[("R1C1", "a"), ("R2C1", "b"), ("R1C1", "c")]),
            1,
            &mut recorder,
            &ExportOptions::new(),
        )
        .unwrap_err();
        assert!(matches!(
            err,
            Error::Grid(GridError::OutOfOrderRecord { current_row: 2, .. })
        ));
        assert_eq!(recorder.flushes, 1);
        assert_eq!(recorder.written, b"a\n");
    }

    #[test]
    fn test_sink_error() {
        let mut recorder = Recorder {
            fail_after: Some(3),
            ..Recorder::default()
        };
        let err = export(
            records(&[("R1C1", "a"), ("R2C1", "b"), ("R3C1", "c")]),
            1,
            &mut recorder,
            &ExportOptions::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Grid(GridError::Io(_))));
        assert_eq!(recorder.flushes, 1);
    }

    #[test]
    fn test_flush_error_is_a_sink_error() {
        let mut recorder = Recorder {
            fail_flush: true,
            ..Recorder::default()
        };
        let err = export(
            records(&[("R1C1", "a")]),
            1,
            &mut recorder,
            &ExportOptions::new(),
        )
        .unwrap_err();
        assert!(matches!(err, Error::Grid(GridError::Io(_))));
        assert_eq!(recorder.written, b"a\n");
    }

    #[test]
    fn test_unallocatable_column_count() {
        let mut out: Vec<u8> = Vec::new();
        let err = export(records(&[("R1C1", "a")]), usize::MAX, &mut out, &ExportOptions::new())
            .unwrap_err();
        assert!(matches!(
            err,
            Error::Grid(GridError::TooManyColumns(usize::MAX))
        ));
        assert!(out.is_empty());
    }
}
