//! Entry grammars for the three coverage-map encodings.
//!
//! Every map shares the same framing:
//!
//! ```text
//! map   := '{' entry (sep entry)* '}' | '{' '}'
//! entry := key ':' '(' payload ')'
//! key   := uint32
//! sep   := any run of non-digit characters
//! ```
//!
//! and differs only in its payload:
//!
//! | map       | payload                                       |
//! |-----------|-----------------------------------------------|
//! | statement | `line,column,length,count`                    |
//! | function  | `'name',line,(a,b,c,d),(a,b,c,d)`             |
//! | branch    | `type,line,(a,b,c,d),[(a,b,c,d),(a,b,c,d)...]` |
//!
//! An [`EntryGrammar`] parses one payload. The framing and the scan across
//! the map body live in [`crate::decoder`].
//!
//! ## Extensibility
//!
//! Implement [`EntryGrammar`] to decode another payload shape with the same
//! framing:
//!
//! ```
//! use covmap_core::grammar::{Cursor, EntryGrammar};
//! use covmap_core::MapDecoder;
//!
//! struct Pair;
//!
//! impl EntryGrammar for Pair {
//!     type Value = (u32, u32);
//!
//!     fn name(&self) -> &'static str {
//!         "pair"
//!     }
//!
//!     fn parse_payload(&self, cursor: &mut Cursor<'_>) -> Option<(u32, u32)> {
//!         let a = cursor.u32()?;
//!         cursor.eat(b',')?;
//!         Some((a, cursor.u32()?))
//!     }
//! }
//!
//! let decoded = MapDecoder::new().decode(&Pair, "{7:(1,2)}")?;
//! assert_eq!(decoded.entries[&7], (1, 2));
//! # Ok::<(), covmap_core::Error>(())
//! ```

mod cursor;

use crate::model::{BranchInfo, FunctionInfo, Position, StatementInfo};

pub use cursor::Cursor;
pub(crate) use cursor::{end_of_digits, next_digit};

/// Parses the payload of one map entry
pub trait EntryGrammar: Send + Sync {
    /// The decoded entry type
    type Value;

    /// Short name used in logs and errors
    fn name(&self) -> &'static str;

    /// Parse the payload between the entry's `(` and `)`.
    ///
    /// The cursor is positioned just after `(`; on success it must be left
    /// just before the closing `)`.
    fn parse_payload(&self, cursor: &mut Cursor<'_>) -> Option<Self::Value>;
}

/// Parses `key:(payload)` at the cursor
pub(crate) fn parse_entry<G: EntryGrammar + ?Sized>(
    grammar: &G,
    cursor: &mut Cursor<'_>,
) -> Option<(u32, G::Value)> {
    let key = cursor.u32()?;
    cursor.eat(b':')?;
    cursor.eat(b'(')?;
    let value = grammar.parse_payload(cursor)?;
    cursor.eat(b')')?;
    Some((key, value))
}

/// `line,column,length,count`
#[derive(Debug, Clone, Copy, Default)]
pub struct StatementGrammar;

impl EntryGrammar for StatementGrammar {
    type Value = StatementInfo;

    fn name(&self) -> &'static str {
        "statement"
    }

    fn parse_payload(&self, cursor: &mut Cursor<'_>) -> Option<StatementInfo> {
        let line = cursor.u32()?;
        cursor.eat(b',')?;
        let column = cursor.u32()?;
        cursor.eat(b',')?;
        let length = cursor.u32()?;
        cursor.eat(b',')?;
        let count = cursor.u32()?;
        Some(StatementInfo::new(line, column, length, count))
    }
}

/// `'name',line,(start),(end)`
#[derive(Debug, Clone, Copy, Default)]
pub struct FunctionGrammar;

impl EntryGrammar for FunctionGrammar {
    type Value = FunctionInfo;

    fn name(&self) -> &'static str {
        "function"
    }

    fn parse_payload(&self, cursor: &mut Cursor<'_>) -> Option<FunctionInfo> {
        let name = cursor.quoted()?;
        cursor.eat(b',')?;
        let line = cursor.u32()?;
        cursor.eat(b',')?;
        let start_pos = cursor.tuple4()?;
        cursor.eat(b',')?;
        let end_pos = cursor.tuple4()?;
        Some(FunctionInfo {
            name: name.to_string(),
            line,
            start_pos,
            end_pos,
        })
    }
}

/// `type,line,(position),[paths]`
#[derive(Debug, Clone, Copy, Default)]
pub struct BranchGrammar;

impl EntryGrammar for BranchGrammar {
    type Value = BranchInfo;

    fn name(&self) -> &'static str {
        "branch"
    }

    fn parse_payload(&self, cursor: &mut Cursor<'_>) -> Option<BranchInfo> {
        let kind = cursor.u8()?;
        cursor.eat(b',')?;
        let line = cursor.u32()?;
        cursor.eat(b',')?;
        let position = cursor.tuple4()?;
        cursor.eat(b',')?;
        cursor.eat(b'[')?;
        let paths = decode_paths(cursor.until(b']')?);
        Some(BranchInfo {
            kind,
            line,
            position,
            paths,
        })
    }
}

/// Decodes the text between a branch entry's `[` and `]` into its ordered
/// list of path spans.
///
/// Every `(a,b,c,d)` found is kept in order, duplicates included. Anything
/// that is not a well-formed 4-tuple is dropped.
pub fn decode_paths(inner: &str) -> Vec<Position> {
    let bytes = inner.as_bytes();
    let mut paths = Vec::new();
    let mut pos = 0;

    while let Some(offset) = bytes[pos..].iter().position(|&b| b == b'(') {
        let start = pos + offset;
        let mut cursor = Cursor::new(inner, start);
        match cursor.tuple4() {
            Some(tuple) => {
                paths.push(tuple);
                pos = cursor.pos();
            }
            None => pos = start + 1,
        }
    }

    paths
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn entry<G: EntryGrammar>(grammar: &G, text: &str) -> Option<(u32, G::Value)> {
        let mut cursor = Cursor::new(text, 0);
        let parsed = parse_entry(grammar, &mut cursor)?;
        assert!(cursor.is_at_end(), "entry did not consume all of {text:?}");
        Some(parsed)
    }

    #[test]
    fn test_statement_entry() {
        assert_eq!(
            entry(&StatementGrammar, "3:(10,4,22,7)"),
            Some((3, StatementInfo::new(10, 4, 22, 7)))
        );
    }

    #[test]
    fn test_statement_entry_rejects_bad_payload() {
        assert_eq!(entry(&StatementGrammar, "3:(10,4,22)"), None);
        assert_eq!(entry(&StatementGrammar, "3:(10,4,22,7,1)"), None);
        assert_eq!(entry(&StatementGrammar, "3:(a,4,22,7)"), None);
        assert_eq!(entry(&StatementGrammar, "3(10,4,22,7)"), None);
    }

    #[test]
    fn test_function_entry() {
        let (key, info) = entry(&FunctionGrammar, "5:('myFunc',10,(1,2,3,4),(5,6,7,8))").unwrap();
        assert_eq!(key, 5);
        assert_eq!(
            info,
            FunctionInfo {
                name: "myFunc".to_string(),
                line: 10,
                start_pos: [1, 2, 3, 4],
                end_pos: [5, 6, 7, 8],
            }
        );
    }

    #[test]
    fn test_function_entry_empty_name() {
        let (_, info) = entry(&FunctionGrammar, "0:('',1,(1,0,1,5),(1,6,3,1))").unwrap();
        assert_eq!(info.name, "");
    }

    #[test]
    fn test_function_entry_requires_quoted_name() {
        assert_eq!(entry(&FunctionGrammar, "0:(f,1,(1,0,1,5),(1,6,3,1))"), None);
        assert_eq!(entry(&FunctionGrammar, "0:('it\\'s',1,(1,0,1,5),(1,6,3,1))"), None);
    }

    #[test]
    fn test_branch_entry() {
        let (key, info) = entry(&BranchGrammar, "2:(1,7,(7,4,9,5),[(7,4,8,1),(8,2,9,5)])").unwrap();
        assert_eq!(key, 2);
        assert_eq!(
            info,
            BranchInfo {
                kind: 1,
                line: 7,
                position: [7, 4, 9, 5],
                paths: vec![[7, 4, 8, 1], [8, 2, 9, 5]],
            }
        );
    }

    #[test]
    fn test_branch_entry_empty_paths() {
        let (_, info) = entry(&BranchGrammar, "0:(4,1,(1,1,1,1),[])").unwrap();
        assert!(info.paths.is_empty());
    }

    #[test]
    fn test_branch_kind_is_not_validated() {
        let (_, info) = entry(&BranchGrammar, "0:(200,1,(1,1,1,1),[])").unwrap();
        assert_eq!(info.kind, 200);
    }

    #[test]
    fn test_decode_paths_preserves_order_and_duplicates() {
        assert_eq!(
            decode_paths("(0,0,1,1),(0,1,1,2)"),
            vec![[0, 0, 1, 1], [0, 1, 1, 2]]
        );
        assert_eq!(
            decode_paths("(1,1,1,1),(1,1,1,1)"),
            vec![[1, 1, 1, 1], [1, 1, 1, 1]]
        );
    }

    #[test]
    fn test_decode_paths_drops_fragments() {
        assert_eq!(
            decode_paths("(1,2),((3,4,5,6),junk,(7,8,9,10"),
            vec![[3, 4, 5, 6]]
        );
        assert!(decode_paths("").is_empty());
    }
}
