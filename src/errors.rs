//! `Error` management module
//!
//! Provides all cellfeed error conversion and description

use std::convert::Infallible;

/// A struct to handle any error and a message
#[derive(Debug)]
pub enum Error {
    /// IO error
    Io(std::io::Error),
    /// Grid reconstruction error
    Grid(crate::grid::GridError),
    /// Cell feed error
    Feed(crate::feed::FeedError),
    /// Input stream error
    Stream(crate::stream::StreamError),
}

from_err!(std::io::Error, Error, Io);
from_err!(crate::grid::GridError, Error, Grid);
from_err!(crate::feed::FeedError, Error, Feed);
from_err!(crate::stream::StreamError, Error, Stream);

impl From<Infallible> for Error {
    fn from(e: Infallible) -> Error {
        match e {}
    }
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Io(e) => write!(f, "I/O error: {e}"),
            Error::Grid(e) => write!(f, "Grid error: {e}"),
            Error::Feed(e) => write!(f, "Cell feed error: {e}"),
            Error::Stream(e) => write!(f, "Input error: {e}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Io(e) => Some(e),
            Error::Grid(e) => Some(e),
            Error::Feed(e) => Some(e),
            Error::Stream(e) => Some(e),
        }
    }
}
