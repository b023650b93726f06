// SPDX-License-Identifier: MIT
//
// Copyright 2025, The cellfeed authors.

//! Cell addressing in `R<row>C<col>` notation

use std::fmt;
use std::str::FromStr;

use crate::grid::GridError;

/// A one based (row, column) position of a cell
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct CellCoordinate {
    /// Row, starting at 1
    pub row: u32,
    /// Column, starting at 1
    pub col: u32,
}

impl CellCoordinate {
    /// Creates a new `CellCoordinate`
    ///
    /// Returns `None` if either component is 0.
    pub fn new(row: u32, col: u32) -> Option<CellCoordinate> {
        if row == 0 || col == 0 {
            None
        } else {
            Some(CellCoordinate { row, col })
        }
    }

    /// Zero based index of the column within a row
    pub fn col_index(&self) -> usize {
        (self.col - 1) as usize
    }
}

impl fmt::Display for CellCoordinate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "R{}C{}", self.row, self.col)
    }
}

/// Parses the trailing path segment of a cell identifier
///
/// Feed identifiers look like
/// `https://spreadsheets.google.com/feeds/cells/<key>/od6/private/full/R12C3`,
/// only the part after the last `/` is relevant. An identifier without any `/`
/// is its own trailing segment.
///
/// # Examples
/// ```
/// use cellfeed::CellCoordinate;
///
/// let pos: CellCoordinate = "feeds/cells/key/od6/private/full/R12C3".parse().unwrap();
/// assert_eq!((pos.row, pos.col), (12, 3));
/// assert!("feeds/cells/key/od6/private/full/A1".parse::<CellCoordinate>().is_err());
/// ```
impl FromStr for CellCoordinate {
    type Err = GridError;

    fn from_str(id: &str) -> Result<Self, Self::Err> {
        parse_segment(id.rsplit('/').next().unwrap_or(id).as_bytes())
            .ok_or_else(|| GridError::MalformedCoordinate(id.to_string()))
    }
}

fn parse_segment(segment: &[u8]) -> Option<CellCoordinate> {
    let rest = segment.strip_prefix(b"R")?;
    let split = rest.iter().position(|&c| c == b'C')?;
    let (row, col) = (&rest[..split], &rest[split + 1..]);
    CellCoordinate::new(parse_digits(row)?, parse_digits(col)?)
}

/// Parses a non empty run of ASCII digits, rejecting signs and overflow
fn parse_digits(s: &[u8]) -> Option<u32> {
    if s.is_empty() || !s.iter().all(u8::is_ascii_digit) {
        return None;
    }
    atoi_simd::parse::<u32>(s).ok()
}
