//! Decoded coverage-map entities.
//!
//! Every map is keyed by the producer's `u32` entry id. Keys are unordered in
//! the source text; they are stored in a [`BTreeMap`] so that iteration and
//! serialized output are deterministic.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use time::OffsetDateTime;

/// A source position 4-tuple, `(start_line, start_column, end_line, end_column)`
/// as emitted by the producer.
pub type Position = [u32; 4];

/// Statement map keyed by statement id
pub type StatementMap = BTreeMap<u32, StatementInfo>;
/// Function map keyed by function id
pub type FunctionMap = BTreeMap<u32, FunctionInfo>;
/// Branch map keyed by branch id
pub type BranchMap = BTreeMap<u32, BranchInfo>;

/// One counted source statement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct StatementInfo {
    /// Source line
    pub line: u32,
    /// Source column
    pub column: u32,
    /// Length in characters
    pub length: u32,
    /// Hit count
    pub count: u32,
}

impl StatementInfo {
    /// Creates a statement from its four fields in wire order
    pub fn new(line: u32, column: u32, length: u32, count: u32) -> Self {
        Self {
            line,
            column,
            length,
            count,
        }
    }
}

impl From<[u32; 4]> for StatementInfo {
    fn from([line, column, length, count]: [u32; 4]) -> Self {
        Self::new(line, column, length, count)
    }
}

/// One instrumented function span
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct FunctionInfo {
    /// Function name, possibly empty
    pub name: String,
    /// Declaration line
    pub line: u32,
    /// Start of the function's declaration span
    pub start_pos: Position,
    /// End of the function's body span
    pub end_pos: Position,
}

/// A decision point with an ordered list of alternatives
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct BranchInfo {
    /// Producer-defined branch kind (if, switch, cond-expr, ...). Not validated.
    #[serde(rename = "type")]
    pub kind: u8,
    /// Source line
    pub line: u32,
    /// Span of the whole decision point
    pub position: Position,
    /// One span per alternative; index 0 is the first path
    pub paths: Vec<Position>,
}

/// One fully decoded coverage-map row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverageRecord {
    /// Source-file hash identifying the row
    pub hash: String,
    /// Primary statement map
    pub statement_map: StatementMap,
    /// Primary function map
    pub fn_map: FunctionMap,
    /// Primary branch map
    pub branch_map: BranchMap,
    /// Statement map from the restore snapshot
    pub restore_statement_map: StatementMap,
    /// Function map from the restore snapshot
    pub restore_fn_map: FunctionMap,
    /// Branch map from the restore snapshot
    pub restore_branch_map: BranchMap,
    /// When the row was recorded
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

impl CoverageRecord {
    /// Entry counts for every map in this record
    pub fn summary(&self) -> RecordSummary {
        RecordSummary {
            statements: self.statement_map.len(),
            functions: self.fn_map.len(),
            branches: self.branch_map.len(),
            restore_statements: self.restore_statement_map.len(),
            restore_functions: self.restore_fn_map.len(),
            restore_branches: self.restore_branch_map.len(),
        }
    }

    /// Returns true if every map is empty
    pub fn is_empty(&self) -> bool {
        self.summary().total() == 0
    }
}

/// Per-map entry counts of a [`CoverageRecord`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct RecordSummary {
    /// Primary statement entries
    pub statements: usize,
    /// Primary function entries
    pub functions: usize,
    /// Primary branch entries
    pub branches: usize,
    /// Restore statement entries
    pub restore_statements: usize,
    /// Restore function entries
    pub restore_functions: usize,
    /// Restore branch entries
    pub restore_branches: usize,
}

impl RecordSummary {
    /// Sum of all six map sizes
    pub fn total(&self) -> usize {
        self.statements
            + self.functions
            + self.branches
            + self.restore_statements
            + self.restore_functions
            + self.restore_branches
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn empty_record() -> CoverageRecord {
        CoverageRecord {
            hash: "h".to_string(),
            statement_map: StatementMap::new(),
            fn_map: FunctionMap::new(),
            branch_map: BranchMap::new(),
            restore_statement_map: StatementMap::new(),
            restore_fn_map: FunctionMap::new(),
            restore_branch_map: BranchMap::new(),
            timestamp: OffsetDateTime::UNIX_EPOCH,
        }
    }

    #[test]
    fn test_statement_from_array() {
        assert_eq!(StatementInfo::from([1, 2, 3, 4]), StatementInfo::new(1, 2, 3, 4));
    }

    #[test]
    fn test_summary_total() {
        let mut record = empty_record();
        assert!(record.is_empty());

        record.statement_map.insert(0, StatementInfo::new(1, 2, 3, 4));
        record.restore_fn_map.insert(7, FunctionInfo::default());
        record.restore_branch_map.insert(1, BranchInfo::default());
        record.restore_branch_map.insert(2, BranchInfo::default());

        let summary = record.summary();
        assert_eq!(summary.statements, 1);
        assert_eq!(summary.restore_functions, 1);
        assert_eq!(summary.restore_branches, 2);
        assert_eq!(summary.total(), 4);
        assert!(!record.is_empty());
    }

    #[test]
    fn test_branch_kind_serializes_as_type() {
        let branch = BranchInfo {
            kind: 1,
            line: 3,
            position: [3, 0, 3, 9],
            paths: vec![[3, 0, 3, 4]],
        };
        let json = serde_json::to_value(&branch).unwrap();
        assert_eq!(json["type"], 1);
        assert_eq!(json["paths"][0][3], 4);
    }

    #[test]
    fn test_record_timestamp_is_rfc3339() {
        let json = serde_json::to_value(empty_record()).unwrap();
        assert_eq!(json["timestamp"], "1970-01-01T00:00:00Z");
    }
}
