//! Record sources: where raw rows come from.
//!
//! The decoder never performs I/O itself. A [`RecordSource`] yields
//! [`RawRow`]s one at a time; [`JsonLinesSource`] reads them from a file with
//! one JSON object per line:
//!
//! ```text
//! {"hash":"abc123","statement_map":{"0":[1,2,3,4]},"fn_map":"{}","branch_map":"{}", ... ,"ts":"2024-05-01T12:30:00Z"}
//! ```

use crate::error::{Error, Result};
use crate::record::RawRow;
use std::fs::File;
use std::io::{BufRead, BufReader, Lines};
use std::path::Path;
use tracing::trace;

/// A provider of raw coverage-map rows
pub trait RecordSource {
    /// Returns the next row, or `None` when the source is exhausted
    fn next_row(&mut self) -> Result<Option<RawRow>>;

    /// Adapts the source into an iterator of rows
    fn rows(&mut self) -> Rows<'_, Self>
    where
        Self: Sized,
    {
        Rows { source: self }
    }
}

/// Iterator returned by [`RecordSource::rows`]
pub struct Rows<'a, S> {
    source: &'a mut S,
}

impl<S: RecordSource> Iterator for Rows<'_, S> {
    type Item = Result<RawRow>;

    fn next(&mut self) -> Option<Self::Item> {
        self.source.next_row().transpose()
    }
}

/// Reads rows from JSON lines. Blank lines are skipped.
pub struct JsonLinesSource<R> {
    lines: Lines<R>,
    line_no: usize,
}

impl<R: BufRead> JsonLinesSource<R> {
    /// Creates a source over any buffered reader
    pub fn new(reader: R) -> Self {
        Self {
            lines: reader.lines(),
            line_no: 0,
        }
    }

    /// Number of lines consumed so far
    pub fn line_no(&self) -> usize {
        self.line_no
    }
}

impl JsonLinesSource<BufReader<File>> {
    /// Opens a JSON-lines file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|e| Error::file_read(path, e))?;
        Ok(Self::new(BufReader::new(file)))
    }
}

impl<R: BufRead> RecordSource for JsonLinesSource<R> {
    fn next_row(&mut self) -> Result<Option<RawRow>> {
        for line in self.lines.by_ref() {
            self.line_no += 1;
            let line = line.map_err(|e| Error::line_read(self.line_no, e))?;

            if line.trim().is_empty() {
                continue;
            }

            trace!("Parsing row on line {}", self.line_no);
            let row = serde_json::from_str(&line).map_err(|e| Error::row_parse(self.line_no, e))?;
            return Ok(Some(row));
        }

        Ok(None)
    }
}

/// Reads every row of a JSON-lines file
pub fn read_rows_file(path: impl AsRef<Path>) -> Result<Vec<RawRow>> {
    JsonLinesSource::open(path)?.rows().collect()
}
