// SPDX-License-Identifier: MIT
//
// Copyright 2025, The cellfeed authors.

//! Tab separated row serialization

use std::io::{self, Write};

use crate::grid::RowSink;

/// Line terminator written after every row
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LineEnding {
    /// `\n`
    #[default]
    Lf,
    /// `\r\n`
    CrLf,
}

impl LineEnding {
    /// Terminator bytes
    pub fn as_bytes(&self) -> &'static [u8] {
        match self {
            LineEnding::Lf => b"\n",
            LineEnding::CrLf => b"\r\n",
        }
    }
}

/// Writes rows as tab separated lines
///
/// Empty cells become zero length fields. Values are written verbatim.
///
/// # Examples
/// ```
/// use cellfeed::{RowSink, TsvWriter};
///
/// let mut tsv = TsvWriter::new(Vec::new());
/// tsv.write_row(&["a".to_string(), String::new(), "c".to_string()]).unwrap();
/// assert_eq!(tsv.into_inner().unwrap(), b"a\t\tc\n");
/// ```
#[derive(Debug)]
pub struct TsvWriter<W: Write> {
    inner: W,
    line_ending: LineEnding,
    rows: u64,
}

impl<W: Write> TsvWriter<W> {
    /// Creates a new `TsvWriter` terminating lines with `\n`
    pub fn new(inner: W) -> TsvWriter<W> {
        TsvWriter {
            inner,
            line_ending: LineEnding::default(),
            rows: 0,
        }
    }

    /// Sets the line terminator
    pub fn with_line_ending(mut self, line_ending: LineEnding) -> Self {
        self.line_ending = line_ending;
        self
    }

    /// Number of rows written so far
    pub fn rows_written(&self) -> u64 {
        self.rows
    }

    /// Gets a reference to the underlying writer
    pub fn get_ref(&self) -> &W {
        &self.inner
    }

    /// Flushes the underlying writer
    pub fn flush(&mut self) -> io::Result<()> {
        self.inner.flush()
    }

    /// Flushes and returns the underlying writer
    pub fn into_inner(mut self) -> io::Result<W> {
        self.inner.flush()?;
        Ok(self.inner)
    }
}

impl<W: Write> RowSink for TsvWriter<W> {
    fn write_row(&mut self, row: &[String]) -> io::Result<()> {
        for (i, cell) in row.iter().enumerate() {
            if i > 0 {
                self.inner.write_all(b"\t")?;
            }
            self.inner.write_all(cell.as_bytes())?;
        }
        self.inner.write_all(self.line_ending.as_bytes())?;
        self.rows += 1;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cells: &[&str]) -> Vec<String> {
        cells.iter().map(|c| c.to_string()).collect()
    }

    #[test]
    fn test_empty_cells() {
        let mut tsv = TsvWriter::new(Vec::new());
        tsv.write_row(&row(&["", "b", ""])).unwrap();
        tsv.write_row(&row(&["", "", ""])).unwrap();
        tsv.write_row(&row(&["x"])).unwrap();
        assert_eq!(tsv.rows_written(), 3);
        assert_eq!(tsv.into_inner().unwrap(), b"\tb\t\n\t\t\nx\n");
    }

    #[test]
    fn test_crlf() {
        let mut tsv = TsvWriter::new(Vec::new()).with_line_ending(LineEnding::CrLf);
        tsv.write_row(&row(&["a", "b"])).unwrap();
        tsv.write_row(&row(&["", ""])).unwrap();
        assert_eq!(tsv.get_ref(), b"a\tb\r\n\t\r\n");
    }

    #[test]
    fn test_unicode_passthrough() {
        let mut tsv = TsvWriter::new(Vec::new());
        tsv.write_row(&row(&["été", "日本"])).unwrap();
        let out = String::from_utf8(tsv.into_inner().unwrap()).unwrap();
        assert_eq!(out, "été\t日本\n");
    }
}
