//! Delimited input: header plus data rows, one separator for both.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use csv::{Reader, ReaderBuilder};

use crate::error::{ImportError, Result};

/// Open `path` for a fresh pass from the first line.
pub fn open(path: &Path, separator: u8) -> Result<Reader<File>> {
    builder(separator)
        .from_path(path)
        .map_err(|source| ImportError::Open {
            path: path.to_path_buf(),
            source,
        })
}

/// Wrap an arbitrary reader, e.g. an in-memory buffer.
pub fn from_reader<R: Read>(input: R, separator: u8) -> Reader<R> {
    builder(separator).from_reader(input)
}

fn builder(separator: u8) -> ReaderBuilder {
    let mut builder = ReaderBuilder::new();
    builder.delimiter(separator).has_headers(true);
    builder
}

/// Column names from the first line. Fails on input without one.
pub fn read_header<R: Read>(reader: &mut Reader<R>) -> Result<Vec<String>> {
    let header = reader.headers()?;
    if header.is_empty() {
        return Err(ImportError::EmptyInput);
    }
    Ok(header.iter().map(str::to_string).collect())
}
