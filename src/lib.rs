//! Rebuild dense tab separated tables from sparse spreadsheet cell feeds
//!
//! # Status
//!
//! **cellfeed** reads the cell listing of a worksheet, where every cell comes
//! with its own `R<row>C<col>` address and empty cells are usually left out,
//! and writes it back as a rectangular tsv table:
//! - every row from 1 to the last row seen is written, empty rows included
//! - every row has exactly the declared number of columns
//! - rows are written as soon as they are complete, so only one row is ever
//!   held in memory
//!
//! # Examples
//! ```
//! use cellfeed::{export, CellRecord, ExportOptions, FeedReader};
//!
//! let xml = r#"<feed xmlns:gs="http://schemas.google.com/spreadsheets/2006">
//!   <gs:colCount>2</gs:colCount>
//!   <entry><id>cells/R1C1</id><gs:cell>gene</gs:cell></entry>
//!   <entry><id>cells/R1C2</id><gs:cell>drug</gs:cell></entry>
//!   <entry><id>cells/R3C2</id><gs:cell>warfarin</gs:cell></entry>
//! </feed>"#;
//!
//! let feed = FeedReader::new(xml.as_bytes()).expect("Cannot read feed header");
//! let columns = feed.metadata().column_count.expect("No column count");
//!
//! let mut tsv = Vec::new();
//! let summary = export(feed, columns, &mut tsv, &ExportOptions::new())
//!     .expect("Cannot export feed");
//!
//! assert_eq!(summary.rows, 3);
//! assert_eq!(String::from_utf8(tsv).unwrap(), "gene\tdrug\n\t\n\twarfarin\n");
//! ```
//!
//! Files can be converted directly with [`export_feed`], which also unwraps
//! `.gz` and `.zip` inputs.
#![deny(missing_docs)]

#[macro_use]
mod utils;

mod coordinate;
mod cursor;
mod export;
mod feed;
mod grid;
mod stream;
mod tsv;

pub mod errors;

pub use crate::coordinate::CellCoordinate;
pub use crate::cursor::{CursorEvent, XmlCursor};
pub use crate::errors::Error;
pub use crate::export::{export, export_feed, ExportOptions, ExportSummary};
pub use crate::feed::{FeedError, FeedReader, WorksheetMetadata};
pub use crate::grid::{CellRecord, GridAccumulator, GridError, RowBuffer, RowSink};
pub use crate::stream::{open_input, EntryName, Input, StreamError, ZippedFile};
pub use crate::tsv::{LineEnding, TsvWriter};
