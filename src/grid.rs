// SPDX-License-Identifier: MIT
//
// Copyright 2025, The cellfeed authors.

//! Sparse to dense grid reconstruction
//!
//! Cells arrive as a coordinate list (COO), grouped by non decreasing row and
//! with empty cells usually omitted. [`GridAccumulator`] rebuilds complete rows
//! from that list while holding at most one row in memory, and hands each row
//! to a [`RowSink`] as soon as the next row starts.

use std::fmt;

use log::trace;

use crate::coordinate::CellCoordinate;

/// An enum for grid reconstruction errors
#[derive(Debug)]
pub enum GridError {
    /// Io error raised while writing or flushing rows
    Io(std::io::Error),
    /// Cell identifier doesn't end with `R<row>C<col>`
    MalformedCoordinate(String),
    /// Cell column is beyond the declared column count
    ColumnOutOfRange {
        /// offending cell
        pos: CellCoordinate,
        /// declared column count
        column_count: usize,
    },
    /// Cell row is lower than the row being assembled
    OutOfOrderRecord {
        /// offending cell
        pos: CellCoordinate,
        /// row being assembled
        current_row: u32,
    },
    /// Declared column count is 0
    NoColumns,
    /// Declared column count cannot be addressed or allocated
    TooManyColumns(usize),
}

from_err!(std::io::Error, GridError, Io);

impl fmt::Display for GridError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridError::Io(e) => write!(f, "I/O error: {e}"),
            GridError::MalformedCoordinate(id) => {
                write!(f, "Unexpected cell id '{id}', cannot determine row/column")
            }
            GridError::ColumnOutOfRange { pos, column_count } => write!(
                f,
                "Cell {pos} is out of range, worksheet declares {column_count} column(s)"
            ),
            GridError::OutOfOrderRecord { pos, current_row } => write!(
                f,
                "Cell {pos} arrived after row {current_row} was started, rows must not decrease"
            ),
            GridError::NoColumns => write!(f, "Column count must be positive"),
            GridError::TooManyColumns(n) => write!(f, "Cannot allocate a row of {n} columns"),
        }
    }
}

impl std::error::Error for GridError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GridError::Io(e) => Some(e),
            _ => None,
        }
    }
}

/// A cell as produced by a cell source: an identifier and an optional value
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CellRecord {
    /// Identifier ending with the `R<row>C<col>` position
    pub id: String,
    /// Cell text, `None` for an empty cell
    pub value: Option<String>,
}

impl CellRecord {
    /// Creates a new `CellRecord`
    pub fn new<I, V>(id: I, value: Option<V>) -> CellRecord
    where
        I: Into<String>,
        V: Into<String>,
    {
        CellRecord {
            id: id.into(),
            value: value.map(Into::into),
        }
    }

    /// Parses the position out of the identifier
    pub fn coordinate(&self) -> Result<CellCoordinate, GridError> {
        self.id.parse()
    }
}

impl<I: Into<String>, V: Into<String>> From<(I, V)> for CellRecord {
    fn from((id, value): (I, V)) -> CellRecord {
        CellRecord::new(id, Some(value))
    }
}

/// A destination for completed rows
///
/// Rows are handed over in strictly increasing row order, each exactly once
/// and each exactly `column_count` wide.
pub trait RowSink {
    /// Consumes one completed row
    fn write_row(&mut self, row: &[String]) -> std::io::Result<()>;
}

impl RowSink for Vec<Vec<String>> {
    fn write_row(&mut self, row: &[String]) -> std::io::Result<()> {
        self.push(row.to_vec());
        Ok(())
    }
}

impl<S: RowSink + ?Sized> RowSink for &mut S {
    fn write_row(&mut self, row: &[String]) -> std::io::Result<()> {
        (**self).write_row(row)
    }
}

/// The row being assembled
///
/// Its width is fixed at creation, slots default to the empty string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RowBuffer {
    cells: Vec<String>,
}

impl RowBuffer {
    /// Creates a row of `width` empty cells
    ///
    /// Fails with `TooManyColumns` if `width` is beyond the `u32` column
    /// range or cannot be allocated.
    pub fn new(width: usize) -> Result<RowBuffer, GridError> {
        if u32::try_from(width).is_err() {
            return Err(GridError::TooManyColumns(width));
        }
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(width)
            .map_err(|_| GridError::TooManyColumns(width))?;
        cells.resize(width, String::new());
        Ok(RowBuffer { cells })
    }

    /// Number of cells
    pub fn width(&self) -> usize {
        self.cells.len()
    }

    /// Sets the value at a zero based column index, last write wins
    ///
    /// Panics if `idx` is out of bounds
    pub fn set(&mut self, idx: usize, value: String) {
        self.cells[idx] = value;
    }

    /// Is every cell empty
    pub fn is_empty(&self) -> bool {
        self.cells.iter().all(String::is_empty)
    }

    /// Cells as a slice
    pub fn as_slice(&self) -> &[String] {
        &self.cells
    }

    /// Empties every cell, keeping their allocations
    fn clear(&mut self) {
        self.cells.iter_mut().for_each(String::clear);
    }
}

/// Rebuilds dense rows from a sparse, row ordered cell stream
///
/// # Examples
/// ```
/// use cellfeed::{CellRecord, GridAccumulator};
///
/// let mut rows: Vec<Vec<String>> = Vec::new();
/// let mut grid = GridAccumulator::new(2).unwrap();
/// grid.push(CellRecord::from(("R1C2", "b")), &mut rows).unwrap();
/// grid.push(CellRecord::from(("R3C1", "c")), &mut rows).unwrap();
/// grid.finish(&mut rows).unwrap();
///
/// assert_eq!(rows, vec![vec!["", "b"], vec!["", ""], vec!["c", ""]]);
/// ```
#[derive(Debug)]
pub struct GridAccumulator {
    column_count: usize,
    current_row: u32,
    row: RowBuffer,
    rows_flushed: u64,
    cells: u64,
}

impl GridAccumulator {
    /// Creates an accumulator for a worksheet declaring `column_count` columns
    pub fn new(column_count: usize) -> Result<GridAccumulator, GridError> {
        if column_count == 0 {
            return Err(GridError::NoColumns);
        }
        Ok(GridAccumulator {
            column_count,
            current_row: 1,
            row: RowBuffer::new(column_count)?,
            rows_flushed: 0,
            cells: 0,
        })
    }

    /// Declared column count
    pub fn column_count(&self) -> usize {
        self.column_count
    }

    /// Row currently being assembled (one based)
    pub fn current_row(&self) -> u32 {
        self.current_row
    }

    /// Number of rows handed to the sink so far
    pub fn rows_flushed(&self) -> u64 {
        self.rows_flushed
    }

    /// Number of records accepted so far
    pub fn cells(&self) -> u64 {
        self.cells
    }

    /// Adds one record, flushing every row completed by it
    ///
    /// Rows skipped entirely by the stream are flushed as empty rows.
    pub fn push<S: RowSink>(&mut self, record: CellRecord, mut sink: S) -> Result<(), GridError> {
        let pos = record.coordinate()?;
        if pos.row < self.current_row {
            return Err(GridError::OutOfOrderRecord {
                pos,
                current_row: self.current_row,
            });
        }
        if pos.col_index() >= self.column_count {
            return Err(GridError::ColumnOutOfRange {
                pos,
                column_count: self.column_count,
            });
        }
        while self.current_row < pos.row {
            self.flush(&mut sink)?;
            self.current_row += 1;
        }
        self.row.set(pos.col_index(), record.value.unwrap_or_default());
        self.cells += 1;
        Ok(())
    }

    /// Flushes the last row
    ///
    /// Always emits a row, even when no record was ever pushed.
    pub fn finish<S: RowSink>(mut self, mut sink: S) -> Result<u64, GridError> {
        self.flush(&mut sink)?;
        Ok(self.rows_flushed)
    }

    fn flush<S: RowSink>(&mut self, sink: &mut S) -> Result<(), GridError> {
        trace!(
            "flushing row {} ({})",
            self.current_row,
            if self.row.is_empty() { "empty" } else { "filled" }
        );
        sink.write_row(self.row.as_slice())?;
        self.row.clear();
        self.rows_flushed += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn accumulate(cols: usize, records: &[(&str, &str)]) -> Result<Vec<Vec<String>>, GridError> {
        let mut rows = Vec::new();
        let mut grid = GridAccumulator::new(cols)?;
        for &r in records {
            grid.push(CellRecord::from(r), &mut rows)?;
        }
        grid.finish(&mut rows)?;
        Ok(rows)
    }

    macro_rules! rows {
        ($([$($c:expr),*]),* $(,)?) => {
            vec![$(vec![$($c.to_string()),*]),*]
        };
    }

    #[test]
    fn test_gap_rows_are_filled() {
        let rows = accumulate(2, &[("R1C1", "a"), ("R1C2", "b"), ("R3C1", "c")]).unwrap();
        assert_eq!(rows, rows![["a", "b"], ["", ""], ["c", ""]]);
    }

    #[test]
    fn test_no_records() {
        assert_eq!(accumulate(3, &[]).unwrap(), rows![["", "", ""]]);
    }

    #[test]
    fn test_last_write_wins() {
        assert_eq!(
            accumulate(1, &[("R1C1", "x"), ("R1C1", "y")]).unwrap(),
            rows![["y"]]
        );
    }

    #[test]
    fn test_leading_empty_row() {
        assert_eq!(accumulate(1, &[("R2C1", "z")]).unwrap(), rows![[""], ["z"]]);
    }

    #[test]
    fn test_columns_in_any_order() {
        let rows = accumulate(
            3,
            &[("R1C3", "c"), ("R1C1", "a"), ("R1C2", "b"), ("R2C2", "e")],
        )
        .unwrap();
        assert_eq!(rows, rows![["a", "b", "c"], ["", "e", ""]]);
    }

    #[test]
    fn test_empty_value() {
        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut grid = GridAccumulator::new(2).unwrap();
        grid.push(CellRecord::new("R1C1", Some("a")), &mut rows).unwrap();
        grid.push(CellRecord::new("R1C1", None::<String>), &mut rows)
            .unwrap();
        grid.push(CellRecord::new("R1C2", None::<String>), &mut rows)
            .unwrap();
        grid.finish(&mut rows).unwrap();
        assert_eq!(rows, rows![["", ""]]);
    }

    #[test]
    fn test_malformed_coordinate() {
        match accumulate(2, &[("R1C1", "a"), ("cells/A2", "b")]) {
            Err(GridError::MalformedCoordinate(id)) => assert_eq!(id, "cells/A2"),
            r => panic!("unexpected result {r:?}"),
        }
    }

    #[test]
    fn test_column_out_of_range() {
        match accumulate(2, &[("R1C1", "a"), ("R1C3", "b")]) {
            Err(GridError::ColumnOutOfRange { pos, column_count }) => {
                assert_eq!((pos.row, pos.col), (1, 3));
                assert_eq!(column_count, 2);
            }
            r => panic!("unexpected result {r:?}"),
        }
    }

    #[test]
    fn test_row_regression() {
        match accumulate(2, &[("R2C1", "a"), ("R1C2", "b")]) {
            Err(GridError::OutOfOrderRecord { pos, current_row }) => {
                assert_eq!((pos.row, pos.col), (1, 2));
                assert_eq!(current_row, 2);
            }
            r => panic!("unexpected result {r:?}"),
        }
    }

    #[test]
    fn test_no_columns() {
        assert!(matches!(GridAccumulator::new(0), Err(GridError::NoColumns)));
    }

    #[test]
    fn test_rows_are_flushed_eagerly() {
        let mut rows: Vec<Vec<String>> = Vec::new();
        let mut grid = GridAccumulator::new(1).unwrap();
        grid.push(CellRecord::from(("R1C1", "a")), &mut rows).unwrap();
        assert!(rows.is_empty());
        grid.push(CellRecord::from(("R4C1", "d")), &mut rows).unwrap();
        assert_eq!(rows, rows![["a"], [""], [""]]);
        assert_eq!(grid.current_row(), 4);
        assert_eq!(grid.rows_flushed(), 3);
        assert_eq!(grid.cells(), 2);
        assert_eq!(grid.finish(&mut rows).unwrap(), 4);
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn test_row_buffer() {
        let mut row = RowBuffer::new(3).unwrap();
        assert!(row.is_empty());
        row.set(1, "b".to_string());
        assert!(!row.is_empty());
        assert_eq!(row.as_slice(), ["", "b", ""]);
        row.clear();
        assert_eq!(row.width(), 3);
        assert!(row.is_empty());
    }

    #[test]
    fn test_too_many_columns() {
        let huge = u32::MAX as usize + 1;
        assert!(matches!(
            GridAccumulator::new(huge),
            Err(GridError::TooManyColumns(n)) if n == huge
        ));
        assert!(matches!(
            GridAccumulator::new(usize::MAX),
            Err(GridError::TooManyColumns(usize::MAX))
        ));
    }
}
