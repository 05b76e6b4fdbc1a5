//! Assembly of a [`CoverageRecord`] from one row's raw fields.
//!
//! The assembler is pure composition: each map is decoded independently and
//! no consistency between maps (or between primary and restore maps) is
//! checked.

use crate::coerce::{coerce_statement_map, NativeStatementMap};
use crate::decoder::{DecoderConfig, MapDecoder};
use crate::error::Result;
use crate::model::{CoverageRecord, StatementMap};
use serde::Deserialize;
use time::OffsetDateTime;
use tracing::debug;

/// The statement column, either already structured or as grammar text
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(try_from = "serde_json::Value")]
pub enum StatementField {
    /// Key to `[line, column, length, count]`
    Native(NativeStatementMap),
    /// `{key:(line,column,length,count),...}`
    Text(String),
}

impl Default for StatementField {
    fn default() -> Self {
        Self::Native(NativeStatementMap::new())
    }
}

// Integer map keys arrive as JSON strings; going through `Value` keeps
// serde_json's key parsing, which an untagged enum would lose.
impl TryFrom<serde_json::Value> for StatementField {
    type Error = serde_json::Error;

    fn try_from(value: serde_json::Value) -> std::result::Result<Self, Self::Error> {
        match value {
            serde_json::Value::String(text) => Ok(Self::Text(text)),
            serde_json::Value::Null => Ok(Self::default()),
            other => serde_json::from_value(other).map(Self::Native),
        }
    }
}

/// One row's raw fields as produced by a record source
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RawRow {
    /// Source-file hash
    pub hash: String,
    /// Statement map
    #[serde(default)]
    pub statement_map: StatementField,
    /// Function map text
    #[serde(default)]
    pub fn_map: String,
    /// Branch map text
    #[serde(default)]
    pub branch_map: String,
    /// Restore statement map text
    #[serde(default)]
    pub restore_statement_map: String,
    /// Restore function map text
    #[serde(default)]
    pub restore_fn_map: String,
    /// Restore branch map text
    #[serde(default)]
    pub restore_branch_map: String,
    /// Row timestamp
    #[serde(with = "time::serde::rfc3339")]
    pub ts: OffsetDateTime,
}

/// Configuration for record assembly
#[derive(Debug, Clone, Default)]
pub struct AssemblerConfig {
    /// Decoder settings applied to every text map
    pub decoder: DecoderConfig,
}

impl AssemblerConfig {
    /// Creates a new assembler config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the decoder configuration
    pub fn decoder(mut self, decoder: DecoderConfig) -> Self {
        self.decoder = decoder;
        self
    }
}

/// Builds [`CoverageRecord`]s from raw rows
#[derive(Debug, Clone, Default)]
pub struct RecordAssembler {
    decoder: MapDecoder,
}

impl RecordAssembler {
    /// Creates a new lenient assembler
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new assembler with custom configuration
    pub fn with_config(config: AssemblerConfig) -> Self {
        Self {
            decoder: MapDecoder::with_config(config.decoder),
        }
    }

    /// Decodes every map in `row` into one record.
    ///
    /// Only fails when the decoder is in strict mode.
    pub fn assemble(&self, row: &RawRow) -> Result<CoverageRecord> {
        let statement_map = self.statement_map(&row.statement_map)?;

        let record = CoverageRecord {
            hash: row.hash.clone(),
            statement_map,
            fn_map: self.decoder.functions(&row.fn_map)?.entries,
            branch_map: self.decoder.branches(&row.branch_map)?.entries,
            restore_statement_map: self.decoder.statements(&row.restore_statement_map)?.entries,
            restore_fn_map: self.decoder.functions(&row.restore_fn_map)?.entries,
            restore_branch_map: self.decoder.branches(&row.restore_branch_map)?.entries,
            timestamp: row.ts,
        };

        debug!(
            "Assembled record {}: {} total entries",
            record.hash,
            record.summary().total()
        );

        Ok(record)
    }

    fn statement_map(&self, field: &StatementField) -> Result<StatementMap> {
        match field {
            StatementField::Native(native) => Ok(coerce_statement_map(native)),
            StatementField::Text(text) => Ok(self.decoder.statements(text)?.entries),
        }
    }
}

/// Assembles a record with the lenient default decoder. Never fails.
#[allow(clippy::too_many_arguments)]
pub fn assemble(
    hash: impl Into<String>,
    timestamp: OffsetDateTime,
    statements: &NativeStatementMap,
    fn_map: &str,
    branch_map: &str,
    restore_statement_map: &str,
    restore_fn_map: &str,
    restore_branch_map: &str,
) -> CoverageRecord {
    use crate::decoder::{decode_branch_map, decode_function_map, decode_statement_map};

    CoverageRecord {
        hash: hash.into(),
        statement_map: coerce_statement_map(statements),
        fn_map: decode_function_map(fn_map),
        branch_map: decode_branch_map(branch_map),
        restore_statement_map: decode_statement_map(restore_statement_map),
        restore_fn_map: decode_function_map(restore_fn_map),
        restore_branch_map: decode_branch_map(restore_branch_map),
        timestamp,
    }
}
