// SPDX-License-Identifier: MIT
//
// Copyright 2025, The cellfeed authors.

//! Input helpers transparently unwrapping compressed files

use std::fmt;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};

use flate2::read::MultiGzDecoder;
use log::{debug, trace};
use zip::read::{ZipArchive, ZipFile};
use zip::result::ZipError;

const GZIP_BUFFER_SIZE: usize = 65_536;

/// An enum for input stream errors
#[derive(Debug)]
pub enum StreamError {
    /// Io error
    Io(io::Error),
    /// Zip error
    Zip(ZipError),
    /// Path does not exist
    NotFound(PathBuf),
    /// Path is not a regular file
    NotAFile(PathBuf),
    /// Zip archive does not contain the expected entry
    EntryNotFound(String),
    /// Archive name cannot be turned into an entry name
    InvalidArchiveName(PathBuf),
    /// Output path leads to the input file
    OutputIsInput(PathBuf),
}

from_err!(io::Error, StreamError, Io);
from_err!(ZipError, StreamError, Zip);

impl fmt::Display for StreamError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StreamError::Io(e) => write!(f, "I/O error: {e}"),
            StreamError::Zip(e) => write!(f, "Zip error: {e}"),
            StreamError::NotFound(p) => write!(f, "File '{}' does not exist", p.display()),
            StreamError::NotAFile(p) => {
                write!(f, "Path '{}' does not lead to a regular file", p.display())
            }
            StreamError::EntryNotFound(n) => write!(f, "Cannot find '{n}' in zipped file"),
            StreamError::InvalidArchiveName(p) => {
                write!(f, "Cannot derive an entry name from '{}'", p.display())
            }
            StreamError::OutputIsInput(p) => {
                write!(f, "Refusing to overwrite input file '{}'", p.display())
            }
        }
    }
}

impl std::error::Error for StreamError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            StreamError::Io(e) => Some(e),
            StreamError::Zip(e) => Some(e),
            _ => None,
        }
    }
}

/// How to find the single file stored in a zip archive
#[derive(Debug, Clone, Copy)]
pub enum EntryName<'a> {
    /// Archive file name without its `.zip` extension, matched against the
    /// file name part of each entry (`data.xml.zip` finds `dir/data.xml`)
    FromArchive(&'a Path),
    /// Exact entry path
    Named(&'a str),
}

/// The content of one file stored in a zip archive
#[derive(Debug)]
pub struct ZippedFile {
    name: String,
    data: Cursor<Vec<u8>>,
}

impl ZippedFile {
    /// Opens a zip archive and extracts the entry selected by `entry`
    pub fn open<RS: Read + Seek>(reader: RS, entry: EntryName<'_>) -> Result<ZippedFile, StreamError> {
        let mut zip = ZipArchive::new(reader)?;
        match entry {
            EntryName::Named(name) => match zip.by_name(name) {
                Ok(f) => extract(f),
                Err(ZipError::FileNotFound) => Err(StreamError::EntryNotFound(name.to_string())),
                Err(e) => Err(e.into()),
            },
            EntryName::FromArchive(path) => {
                let base = archive_base_name(path)?;
                match find_by_file_name(&mut zip, &base)? {
                    Some(i) => extract(zip.by_index(i)?),
                    None => Err(StreamError::EntryNotFound(base)),
                }
            }
        }
    }

    /// Full path of the entry inside the archive
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl Read for ZippedFile {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.data.read(buf)
    }
}

impl BufRead for ZippedFile {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        self.data.fill_buf()
    }

    fn consume(&mut self, amt: usize) {
        self.data.consume(amt)
    }
}

fn extract<R: Read>(mut file: ZipFile<'_, R>) -> Result<ZippedFile, StreamError> {
    let name = file.name().to_string();
    // declared sizes come from the archive and are not trusted
    let mut data = Vec::new();
    file.read_to_end(&mut data)?;
    debug!("extracted '{name}' ({} bytes)", data.len());
    Ok(ZippedFile {
        name,
        data: Cursor::new(data),
    })
}

fn archive_base_name(path: &Path) -> Result<String, StreamError> {
    let invalid = || StreamError::InvalidArchiveName(path.to_path_buf());
    let file_name = path.file_name().and_then(|n| n.to_str()).ok_or_else(invalid)?;
    let split = file_name.len().checked_sub(4).ok_or_else(invalid)?;
    match file_name.get(split..) {
        Some(ext) if ext.eq_ignore_ascii_case(".zip") && split > 0 => {
            Ok(file_name[..split].to_string())
        }
        _ => Err(invalid()),
    }
}

fn find_by_file_name<RS: Read + Seek>(
    zip: &mut ZipArchive<RS>,
    base: &str,
) -> Result<Option<usize>, StreamError> {
    for i in 0..zip.len() {
        let file = zip.by_index(i)?;
        if file.is_dir() {
            trace!("skipping directory '{}'", file.name());
            continue;
        }
        if file.name().rsplit('/').next() == Some(base) {
            return Ok(Some(i));
        }
    }
    Ok(None)
}

/// An opened input, possibly decompressed on the fly
#[derive(Debug)]
pub enum Input {
    /// Regular file
    Plain(BufReader<File>),
    /// Gzip compressed file
    Gzip(BufReader<MultiGzDecoder<File>>),
    /// Single file zip archive
    Zipped(ZippedFile),
}

/// Opens a file, unwrapping `.gz` and `.zip` files based on their extension
///
/// A `.zip` file must contain an entry named after the archive itself, without
/// the `.zip` extension.
pub fn open_input<P: AsRef<Path>>(path: P) -> Result<Input, StreamError> {
    let path = path.as_ref();
    let meta = match path.metadata() {
        Ok(meta) => meta,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            return Err(StreamError::NotFound(path.to_path_buf()))
        }
        Err(e) => return Err(e.into()),
    };
    if !meta.is_file() {
        return Err(StreamError::NotAFile(path.to_path_buf()));
    }
    let file = File::open(path)?;
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);
    Ok(match ext.as_deref() {
        Some("gz") => Input::Gzip(BufReader::with_capacity(
            GZIP_BUFFER_SIZE,
            MultiGzDecoder::new(file),
        )),
        Some("zip") => Input::Zipped(ZippedFile::open(file, EntryName::FromArchive(path))?),
        _ => Input::Plain(BufReader::new(file)),
    })
}

impl Read for Input {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        match self {
            Input::Plain(r) => r.read(buf),
            Input::Gzip(r) => r.read(buf),
            Input::Zipped(r) => r.read(buf),
        }
    }
}

impl BufRead for Input {
    fn fill_buf(&mut self) -> io::Result<&[u8]> {
        match self {
            Input::Plain(r) => r.fill_buf(),
            Input::Gzip(r) => r.fill_buf(),
            Input::Zipped(r) => r.fill_buf(),
        }
    }

    fn consume(&mut self, amt: usize) {
        match self {
            Input::Plain(r) => r.consume(amt),
            Input::Gzip(r) => r.consume(amt),
            Input::Zipped(r) => r.consume(amt),
        }
    }
}
