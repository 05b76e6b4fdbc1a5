//! Error types for the covmap-core library.
//!
//! Decoding itself never fails in the default lenient mode. The variants here
//! cover the record source (reading and parsing rows) and the opt-in strict
//! decoding mode.

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for covmap operations
pub type Result<T> = std::result::Result<T, Error>;

/// Error type for all covmap operations
#[derive(Error, Debug)]
#[non_exhaustive]
pub enum Error {
    /// Failed to read an input file
    #[error("failed to read file '{path}'")]
    FileRead {
        /// Path to the file that failed to read
        path: PathBuf,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// Failed to read a line from a record source
    #[error("failed to read line {line}")]
    LineRead {
        /// 1-based line number
        line: usize,
        /// Underlying I/O error
        #[source]
        source: std::io::Error,
    },

    /// A row in a JSON-lines source could not be parsed
    #[error("failed to parse row on line {line}")]
    RowParse {
        /// 1-based line number of the offending row
        line: usize,
        /// Underlying JSON error
        #[source]
        source: serde_json::Error,
    },

    /// Strict mode: a map contained fragments that did not match its grammar
    #[error("{map} map has {skipped} unparsable fragment(s), first at offset {offset}: '{first}'")]
    MalformedEntries {
        /// Which map grammar was being decoded
        map: &'static str,
        /// Number of skipped fragments
        skipped: usize,
        /// Byte offset of the first skipped fragment
        offset: usize,
        /// Text of the first skipped fragment
        first: String,
    },
}

impl Error {
    /// Creates a new file read error
    pub fn file_read(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::FileRead {
            path: path.into(),
            source,
        }
    }

    /// Creates a new line read error
    pub fn line_read(line: usize, source: std::io::Error) -> Self {
        Self::LineRead { line, source }
    }

    /// Creates a new row parse error
    pub fn row_parse(line: usize, source: serde_json::Error) -> Self {
        Self::RowParse { line, source }
    }

    /// Creates a new malformed-entries error
    pub fn malformed_entries(
        map: &'static str,
        skipped: usize,
        offset: usize,
        first: impl Into<String>,
    ) -> Self {
        Self::MalformedEntries {
            map,
            skipped,
            offset,
            first: first.into(),
        }
    }

    /// Returns true if this error concerns a single row and the rest of the
    /// input can still be processed.
    ///
    /// A line that is not valid UTF-8 has already been consumed by the
    /// reader, so it counts as a bad row; any other I/O failure does not.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Self::RowParse { .. } | Self::MalformedEntries { .. } => true,
            Self::LineRead { source, .. } => source.kind() == std::io::ErrorKind::InvalidData,
            Self::FileRead { .. } => false,
        }
    }
}
