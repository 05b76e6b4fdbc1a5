//! # covmap-core
//!
//! A library for decoding coverage-map rows into typed records.
//!
//! Coverage maps describe the instrumentation of one source file: counted
//! statements, function spans, and branches with their alternative paths,
//! plus a "restore" snapshot of each. Storage layers commonly hand these
//! columns over as text such as
//!
//! ```text
//! {0:(1,0,1,20),1:(2,4,2,11)}
//! {0:('main',1,(1,0,1,15),(1,16,9,1))}
//! {0:(1,5,(5,2,5,30),[(5,2,5,10),(5,13,5,30)])}
//! ```
//!
//! This crate provides:
//! - Recursive-descent decoders for the statement, function, and branch map
//!   grammars
//! - Coercion of natively typed statement maps
//! - Assembly of one row into a [`CoverageRecord`]
//! - A JSON-lines [`RecordSource`]
//!
//! ## Architecture
//!
//! - [`grammar`]: Byte cursor and per-map entry grammars
//! - [`decoder`]: Map framing, scanning, and the malformed-input policy
//! - [`coerce`]: Native scalar coercion
//! - [`record`]: Row-to-record assembly
//! - [`source`]: Record sources
//! - [`model`]: Decoded types
//! - [`error`]: Error types and handling
//!
//! ## Example
//!
//! ```
//! use covmap_core::{decode_branch_map, decode_function_map, decode_statement_map};
//!
//! let statements = decode_statement_map("{0:(1,2,3,4),1:(5,6,7,8)}");
//! assert_eq!(statements[&1].count, 8);
//!
//! let functions = decode_function_map("{5:('myFunc',10,(1,2,3,4),(5,6,7,8))}");
//! assert_eq!(functions[&5].name, "myFunc");
//!
//! let branches = decode_branch_map("{2:(1,7,(7,4,9,5),[(7,4,8,1),(8,2,9,5)])}");
//! assert_eq!(branches[&2].paths.len(), 2);
//!
//! // Malformed input never fails, it just yields fewer entries
//! assert!(decode_statement_map("not a map").is_empty());
//! ```
//!
//! ## Strict decoding
//!
//! The default policy silently skips anything that does not match. To find
//! out what was skipped, use [`MapDecoder`] directly; with
//! [`DecoderConfig::strict()`] it returns [`Error::MalformedEntries`] instead.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, unreachable_pub)]

pub mod coerce;
pub mod decoder;
pub mod error;
pub mod grammar;
pub mod model;
pub mod record;
pub mod source;

// Re-export primary types for convenience
pub use coerce::{coerce_statement_map, NativeScalar, NativeStatementMap};
pub use decoder::{
    decode_branch_map, decode_function_map, decode_statement_map, Decoded, DecoderConfig,
    MapDecoder, SkippedFragment,
};
pub use error::{Error, Result};
pub use grammar::{decode_paths, BranchGrammar, EntryGrammar, FunctionGrammar, StatementGrammar};
pub use model::{
    BranchInfo, BranchMap, CoverageRecord, FunctionInfo, FunctionMap, Position, RecordSummary,
    StatementInfo, StatementMap,
};
pub use record::{assemble, AssemblerConfig, RawRow, RecordAssembler, StatementField};
pub use source::{read_rows_file, JsonLinesSource, RecordSource};

/// Crate version for programmatic access
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
