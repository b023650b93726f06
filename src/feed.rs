// SPDX-License-Identifier: MIT
//
// Copyright 2025, The cellfeed authors.

//! A module to read spreadsheet cell feeds
//!
//! A cell feed is an Atom document listing the non empty cells of one
//! worksheet, one `<entry>` per cell:
//!
//! ```xml
//! <feed xmlns="http://www.w3.org/2005/Atom"
//!       xmlns:gs="http://schemas.google.com/spreadsheets/2006">
//!   <title type="text">Sheet1</title>
//!   <gs:rowCount>100</gs:rowCount>
//!   <gs:colCount>20</gs:colCount>
//!   <entry>
//!     <id>https://spreadsheets.google.com/feeds/cells/key/od6/private/full/R1C1</id>
//!     <content type="text">Gene</content>
//!     <gs:cell row="1" col="1" inputValue="Gene">Gene</gs:cell>
//!   </entry>
//! </feed>
//! ```

use std::fmt;
use std::io::BufRead;

use log::debug;

use crate::cursor::{CursorEvent, XmlCursor};
use crate::grid::CellRecord;

/// An enum for cell feed specific errors
#[derive(Debug)]
pub enum FeedError {
    /// Io error
    Io(std::io::Error),
    /// Xml error
    Xml(quick_xml::Error),
    /// Xml attribute error
    XmlAttr(quick_xml::events::attributes::AttrError),
    /// Xml encoding error
    Encoding(quick_xml::encoding::EncodingError),
    /// Xml escape error
    Escape(quick_xml::escape::EscapeError),
    /// Entity which is neither predefined nor a character reference
    UnknownEntity(String),
    /// Unexpected end of xml
    XmlEof(&'static str),
    /// Feed header has no column count
    MissingColumnCount,
    /// Row or column count is not a number within the `u32` range
    InvalidCount {
        /// element name
        tag: &'static str,
        /// value found
        val: String,
    },
    /// Entry without an `<id>`
    MissingEntryId,
}

from_err!(std::io::Error, FeedError, Io);
from_err!(quick_xml::Error, FeedError, Xml);
from_err!(quick_xml::events::attributes::AttrError, FeedError, XmlAttr);
from_err!(quick_xml::encoding::EncodingError, FeedError, Encoding);
from_err!(quick_xml::escape::EscapeError, FeedError, Escape);

impl fmt::Display for FeedError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FeedError::Io(e) => write!(f, "I/O error: {e}"),
            FeedError::Xml(e) => write!(f, "Xml error: {e}"),
            FeedError::XmlAttr(e) => write!(f, "Xml attribute error: {e}"),
            FeedError::Encoding(e) => write!(f, "XML encoding error: {e}"),
            FeedError::Escape(e) => write!(f, "XML escape error: {e}"),
            FeedError::UnknownEntity(e) => write!(f, "Unknown entity '&{e};'"),
            FeedError::XmlEof(e) => write!(f, "Unexpected end of xml, expecting '</{e}>'"),
            FeedError::MissingColumnCount => write!(f, "Feed does not declare a column count"),
            FeedError::InvalidCount { tag, val } => write!(f, "Invalid {tag}: '{val}'"),
            FeedError::MissingEntryId => write!(f, "Feed entry has no id"),
        }
    }
}

impl std::error::Error for FeedError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            FeedError::Io(e) => Some(e),
            FeedError::Xml(e) => Some(e),
            FeedError::XmlAttr(e) => Some(e),
            FeedError::Encoding(e) => Some(e),
            FeedError::Escape(e) => Some(e),
            _ => None,
        }
    }
}

/// Worksheet level information found in the feed header
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WorksheetMetadata {
    /// Worksheet title
    pub title: Option<String>,
    /// Declared number of rows
    pub row_count: Option<usize>,
    /// Declared number of columns
    pub column_count: Option<usize>,
}

/// A cell feed reader
///
/// Reads the feed header eagerly, then yields one [`CellRecord`] per entry.
///
/// # Examples
/// ```
/// use cellfeed::FeedReader;
///
/// let xml = r#"<feed xmlns:gs="http://schemas.google.com/spreadsheets/2006">
///   <gs:colCount>2</gs:colCount>
///   <entry><id>cells/R1C2</id><gs:cell row="1" col="2">b</gs:cell></entry>
/// </feed>"#;
/// let mut feed = FeedReader::new(xml.as_bytes()).unwrap();
/// assert_eq!(feed.metadata().column_count, Some(2));
/// let cell = feed.next_cell().unwrap().unwrap();
/// assert_eq!((cell.id.as_str(), cell.value.as_deref()), ("cells/R1C2", Some("b")));
/// assert!(feed.next_cell().unwrap().is_none());
/// ```
pub struct FeedReader<R: BufRead> {
    cursor: XmlCursor<R>,
    metadata: WorksheetMetadata,
    /// Cursor already stands on an `<entry>` start element
    at_entry: bool,
    done: bool,
}

impl<R: BufRead> FeedReader<R> {
    /// Creates a new reader and parses the feed header
    pub fn new(reader: R) -> Result<FeedReader<R>, FeedError> {
        let mut cursor = XmlCursor::new(reader);
        if !cursor.start_element("feed", None)? {
            return Err(FeedError::XmlEof("feed"));
        }
        let mut metadata = WorksheetMetadata::default();
        let mut at_entry = false;
        let mut done = true;
        while let Some(event) = cursor.advance()? {
            let Some(name) = cursor.local_name() else {
                continue;
            };
            match (event, name) {
                (CursorEvent::Start, "entry") => {
                    at_entry = true;
                    done = false;
                    break;
                }
                (CursorEvent::Start, "title") => metadata.title = cursor.text_trimmed()?,
                (CursorEvent::Start, "rowCount") => {
                    metadata.row_count = read_count(&mut cursor, "rowCount")?
                }
                (CursorEvent::Start, "colCount") => {
                    metadata.column_count = read_count(&mut cursor, "colCount")?
                }
                (CursorEvent::End, "feed") => break,
                _ => (),
            }
        }
        debug!("cell feed header: {metadata:?}");
        Ok(FeedReader {
            cursor,
            metadata,
            at_entry,
            done,
        })
    }

    /// Worksheet information read from the feed header
    pub fn metadata(&self) -> &WorksheetMetadata {
        &self.metadata
    }

    /// Reads the next cell, `None` once the feed is exhausted
    pub fn next_cell(&mut self) -> Result<Option<CellRecord>, FeedError> {
        if self.done {
            return Ok(None);
        }
        if !self.at_entry && !self.cursor.start_element("entry", Some("feed"))? {
            self.done = true;
            return Ok(None);
        }
        self.at_entry = false;
        let mut id = None;
        let mut cell = None;
        let mut content = None;
        loop {
            match self.cursor.advance()? {
                Some(CursorEvent::Start) => match self.cursor.local_name() {
                    Some("id") => id = self.cursor.text_trimmed()?,
                    Some("cell") => cell = Some(self.cursor.text_content()?),
                    Some("content") => content = self.cursor.text_content()?,
                    _ => (),
                },
                Some(CursorEvent::End) if self.cursor.local_name() == Some("entry") => break,
                Some(_) => (),
                None => return Err(FeedError::XmlEof("entry")),
            }
        }
        let id = id.ok_or(FeedError::MissingEntryId)?;
        let value = cell.unwrap_or(content).filter(|v| !v.is_empty());
        Ok(Some(CellRecord { id, value }))
    }
}

impl<R: BufRead> Iterator for FeedReader<R> {
    type Item = Result<CellRecord, FeedError>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.next_cell() {
            Ok(Some(cell)) => Some(Ok(cell)),
            Ok(None) => None,
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

fn read_count<R: BufRead>(
    cursor: &mut XmlCursor<R>,
    tag: &'static str,
) -> Result<Option<usize>, FeedError> {
    let Some(val) = cursor.text_trimmed()? else {
        return Ok(None);
    };
    // rows and columns are addressed with u32
    match atoi_simd::parse::<u32>(val.as_bytes()) {
        Ok(n) => Ok(Some(n as usize)),
        Err(_) => Err(FeedError::InvalidCount { tag, val }),
    }
}
