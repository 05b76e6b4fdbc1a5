//! Map decoding: framing, scanning, and the malformed-input policy.
//!
//! ## Algorithm Overview
//!
//! 1. Trim whitespace and strip one layer of enclosing `{` `}`
//! 2. Walk the body looking for the next ASCII digit (a candidate key)
//! 3. Try to parse `key:(payload)` there with the map's [`EntryGrammar`]
//! 4. On success insert the entry (a later duplicate key replaces an earlier
//!    one) and continue after it; on failure skip the rest of that digit run
//!    and keep looking
//!
//! This finds the same leftmost, non-overlapping entries a pattern scan over
//! the body would, without backtracking.
//!
//! ## Malformed input
//!
//! By default decoding never fails. Text between entries that contains a
//! digit is recorded as a [`SkippedFragment`]; everything else is treated as
//! a separator. With [`DecoderConfig::strict()`] set, any skipped fragment turns
//! the result into [`Error::MalformedEntries`].

use crate::error::{Error, Result};
use crate::grammar::{
    end_of_digits, next_digit, parse_entry, BranchGrammar, Cursor, EntryGrammar, FunctionGrammar,
    StatementGrammar,
};
use crate::model::{BranchInfo, BranchMap, FunctionInfo, FunctionMap, StatementInfo, StatementMap};
use std::collections::BTreeMap;
use tracing::{debug, trace};

/// Configuration for the map decoder
#[derive(Debug, Clone, Default)]
pub struct DecoderConfig {
    /// Fail on unparsable fragments instead of skipping them
    pub strict: bool,
    /// Maximum number of entries to match per map (0 = unlimited).
    ///
    /// Every matched entry counts, including one whose key repeats an
    /// earlier entry, so the decoded map may hold fewer keys than this.
    pub max_entries: usize,
}

impl DecoderConfig {
    /// Creates a new decoder config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets strict mode
    pub fn strict(mut self, strict: bool) -> Self {
        self.strict = strict;
        self
    }

    /// Sets the maximum number of matched entries per map
    pub fn max_entries(mut self, max: usize) -> Self {
        self.max_entries = max;
        self
    }
}

/// A run of text between entries that looked like data but did not parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedFragment {
    /// Byte offset into the decoded text
    pub offset: usize,
    /// The fragment, without surrounding separators
    pub text: String,
}

/// Result of decoding one map
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded<T> {
    /// Decoded entries by key
    pub entries: BTreeMap<u32, T>,
    /// Fragments that did not match the entry grammar
    pub skipped: Vec<SkippedFragment>,
    /// True if decoding stopped early at [`DecoderConfig::max_entries()`]
    pub truncated: bool,
}

impl<T> Decoded<T> {
    /// Returns true if nothing was skipped
    pub fn is_clean(&self) -> bool {
        self.skipped.is_empty()
    }

    /// Discards diagnostics and returns the entries
    pub fn into_entries(self) -> BTreeMap<u32, T> {
        self.entries
    }
}

/// Decoder for the coverage-map text grammars
#[derive(Debug, Clone, Default)]
pub struct MapDecoder {
    config: DecoderConfig,
}

impl MapDecoder {
    /// Creates a new lenient decoder
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new decoder with custom configuration
    pub fn with_config(config: DecoderConfig) -> Self {
        Self { config }
    }

    /// The active configuration
    pub fn config(&self) -> &DecoderConfig {
        &self.config
    }

    /// Decodes `text` with the given entry grammar.
    ///
    /// Only fails in strict mode.
    pub fn decode<G: EntryGrammar + ?Sized>(
        &self,
        grammar: &G,
        text: &str,
    ) -> Result<Decoded<G::Value>> {
        let decoded = scan(grammar, text, self.config.max_entries);

        debug!(
            "Decoded {} map: {} entries, {} skipped fragment(s)",
            grammar.name(),
            decoded.entries.len(),
            decoded.skipped.len()
        );

        if self.config.strict {
            if let Some(first) = decoded.skipped.first() {
                return Err(Error::malformed_entries(
                    grammar.name(),
                    decoded.skipped.len(),
                    first.offset,
                    first.text.clone(),
                ));
            }
        }

        Ok(decoded)
    }

    /// Decodes a statement map
    pub fn statements(&self, text: &str) -> Result<Decoded<StatementInfo>> {
        self.decode(&StatementGrammar, text)
    }

    /// Decodes a function map
    pub fn functions(&self, text: &str) -> Result<Decoded<FunctionInfo>> {
        self.decode(&FunctionGrammar, text)
    }

    /// Decodes a branch map
    pub fn branches(&self, text: &str) -> Result<Decoded<BranchInfo>> {
        self.decode(&BranchGrammar, text)
    }
}

/// Decodes `{key:(line,column,length,count),...}`, skipping anything malformed
pub fn decode_statement_map(text: &str) -> StatementMap {
    scan(&StatementGrammar, text, 0).entries
}

/// Decodes `{key:('name',line,(a,b,c,d),(a,b,c,d)),...}`, skipping anything malformed
pub fn decode_function_map(text: &str) -> FunctionMap {
    scan(&FunctionGrammar, text, 0).entries
}

/// Decodes `{key:(type,line,(a,b,c,d),[paths]),...}`, skipping anything malformed
pub fn decode_branch_map(text: &str) -> BranchMap {
    scan(&BranchGrammar, text, 0).entries
}

/// Strips surrounding whitespace and one layer of braces.
///
/// Returns the byte offset of the body in `text`, and the body.
fn strip_braces(text: &str) -> (usize, &str) {
    let trimmed = text.trim_start();
    let mut offset = text.len() - trimmed.len();
    let mut body = trimmed.trim_end();

    if let Some(inner) = body.strip_prefix('{') {
        body = inner;
        offset += 1;
    }
    if let Some(inner) = body.strip_suffix('}') {
        body = inner;
    }

    (offset, body)
}

fn scan<G: EntryGrammar + ?Sized>(grammar: &G, text: &str, limit: usize) -> Decoded<G::Value> {
    let (base, body) = strip_braces(text);
    let bytes = body.as_bytes();

    let mut entries = BTreeMap::new();
    let mut skipped = Vec::new();
    let mut truncated = false;
    let mut pos = 0;
    let mut gap_start = 0;
    let mut matched = 0usize;

    while let Some(start) = next_digit(bytes, pos) {
        let mut cursor = Cursor::new(body, start);
        match parse_entry(grammar, &mut cursor) {
            Some((key, value)) => {
                record_gap(grammar, body, base, gap_start..start, &mut skipped);
                if entries.insert(key, value).is_some() {
                    trace!("Duplicate {} key {}, keeping last", grammar.name(), key);
                }
                pos = cursor.pos();
                gap_start = pos;
                matched += 1;

                if limit > 0 && matched >= limit {
                    truncated = next_digit(bytes, pos).is_some();
                    break;
                }
            }
            // A later start inside the same digit run reaches the same
            // continuation and fails the same way.
            None => pos = end_of_digits(bytes, start),
        }
    }

    if !truncated {
        record_gap(grammar, body, base, gap_start..body.len(), &mut skipped);
    }

    Decoded {
        entries,
        skipped,
        truncated,
    }
}

/// Records the unmatched text in `range` if it is more than a separator
fn record_gap<G: EntryGrammar + ?Sized>(
    grammar: &G,
    body: &str,
    base: usize,
    range: std::ops::Range<usize>,
    skipped: &mut Vec<SkippedFragment>,
) {
    let gap = &body[range.clone()];
    if !gap.bytes().any(|b| b.is_ascii_digit()) {
        return;
    }

    let is_sep = |c: char| c == ',' || c.is_whitespace();
    let text = gap.trim_start_matches(is_sep);
    let offset = base + range.start + (gap.len() - text.len());
    let text = text.trim_end_matches(is_sep);

    trace!(
        "Skipping unparsable {} fragment at offset {}: {:?}",
        grammar.name(),
        offset,
        text
    );

    skipped.push(SkippedFragment {
        offset,
        text: text.to_string(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_decoder_config_builder() {
        let config = DecoderConfig::new().strict(true).max_entries(10);
        assert!(config.strict);
        assert_eq!(config.max_entries, 10);
    }

    #[test]
    fn test_strip_braces() {
        assert_eq!(strip_braces("{1:(1,2,3,4)}"), (1, "1:(1,2,3,4)"));
        assert_eq!(strip_braces("  {}  "), (3, ""));
        assert_eq!(strip_braces("1:(1,2,3,4)"), (0, "1:(1,2,3,4)"));
        assert_eq!(strip_braces("{{}}"), (1, "{}"));
    }

    #[test]
    fn test_single_statement() {
        let map = decode_statement_map("{0:(1,2,3,4)}");
        assert_eq!(map.len(), 1);
        assert_eq!(map[&0], StatementInfo::new(1, 2, 3, 4));
    }

    #[test]
    fn test_outer_braces_optional() {
        assert_eq!(
            decode_statement_map("7:(1,2,3,4)"),
            decode_statement_map("{7:(1,2,3,4)}")
        );
    }

    #[test]
    fn test_last_duplicate_wins() {
        let map = decode_statement_map("{1:(1,2,3,4),1:(5,6,7,8)}");
        assert_eq!(map.len(), 1);
        assert_eq!(map[&1], StatementInfo::new(5, 6, 7, 8));

        let fns = decode_function_map("{1:('a',1,(1,1,1,1),(1,1,1,1)),1:('b',2,(2,2,2,2),(2,2,2,2))}");
        assert_eq!(fns[&1].name, "b");

        let branches = decode_branch_map("{4:(1,1,(1,1,1,1),[]),4:(2,9,(9,9,9,9),[(1,2,3,4)])}");
        assert_eq!(branches[&4].kind, 2);
        assert_eq!(branches[&4].paths.len(), 1);
    }

    #[test]
    fn test_empty_inputs() {
        for text in ["{}", "", "   "] {
            assert!(decode_statement_map(text).is_empty());
            assert!(decode_function_map(text).is_empty());
            assert!(decode_branch_map(text).is_empty());
        }
    }

    #[test]
    fn test_garbage_is_empty() {
        assert!(decode_statement_map("not a map").is_empty());
        assert!(decode_function_map("not a map").is_empty());
        assert!(decode_branch_map("not a map").is_empty());
    }

    #[test]
    fn test_malformed_entries_are_skipped() {
        let map = decode_statement_map("{1:(1,2,3,4),2:(5,6),3:(x,1,1,1),4:(9,9,9,9)}");
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![1, 4]);
    }

    #[test]
    fn test_entry_found_after_leading_junk() {
        // The key is the digit run immediately before ':'
        let map = decode_statement_map("{ab12:(1,2,3,4)}");
        assert_eq!(map[&12], StatementInfo::new(1, 2, 3, 4));

        let map = decode_statement_map("{9x12:(1,2,3,4)}");
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![12]);
    }

    #[test]
    fn test_function_map() {
        let map = decode_function_map(
            "{0:('main',1,(1,0,1,15),(1,16,9,1)),1:('',12,(12,2,12,10),(12,11,14,3))}",
        );
        assert_eq!(map.len(), 2);
        assert_eq!(map[&0].name, "main");
        assert_eq!(map[&0].end_pos, [1, 16, 9, 1]);
        assert_eq!(map[&1].name, "");
        assert_eq!(map[&1].line, 12);
    }

    #[test]
    fn test_function_with_quote_in_name_is_skipped() {
        let map = decode_function_map("{0:('it's',1,(1,1,1,1),(1,1,1,1)),1:('ok',2,(2,2,2,2),(2,2,2,2))}");
        assert_eq!(map.keys().copied().collect::<Vec<_>>(), vec![1]);
    }

    #[test]
    fn test_branch_map_paths_in_order() {
        let map = decode_branch_map("{3:(1,5,(5,2,5,30),[(0,0,1,1),(0,1,1,2)])}");
        assert_eq!(map[&3].paths, vec![[0, 0, 1, 1], [0, 1, 1, 2]]);
        assert_eq!(map[&3].position, [5, 2, 5, 30]);
    }

    #[test]
    fn test_lenient_decode_reports_skipped() {
        let text = "{1:(1,2,3,4), 2:(5,6) ,3:(7,7,7,7),oops}";
        let decoded = MapDecoder::new().statements(text).unwrap();
        assert_eq!(decoded.entries.len(), 2);
        assert_eq!(
            decoded.skipped,
            vec![SkippedFragment {
                offset: 14,
                text: "2:(5,6)".to_string(),
            }]
        );
        assert_eq!(&text[14..21], "2:(5,6)");
        assert!(!decoded.is_clean());
    }

    #[test]
    fn test_trailing_fragment_is_reported() {
        let decoded = MapDecoder::new().statements("{1:(1,2,3,4),2:(5,6,7}").unwrap();
        assert_eq!(decoded.skipped.len(), 1);
        assert_eq!(decoded.skipped[0].text, "2:(5,6,7");
    }

    #[test]
    fn test_separators_are_not_fragments() {
        let decoded = MapDecoder::new().statements("{1:(1,2,3,4), ,; 2:(1,1,1,1)}").unwrap();
        assert!(decoded.is_clean());
        assert_eq!(decoded.entries.len(), 2);
    }

    #[test]
    fn test_strict_mode_fails_on_fragments() {
        let decoder = MapDecoder::with_config(DecoderConfig::new().strict(true));
        let err = decoder.branches("{1:(1,1,(1,1,1,1),[]),2:(1,1,(1,1),[])}").unwrap_err();
        match err {
            Error::MalformedEntries { map, skipped, first, .. } => {
                assert_eq!(map, "branch");
                assert_eq!(skipped, 1);
                assert_eq!(first, "2:(1,1,(1,1),[])");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_strict_mode_accepts_clean_input() {
        let decoder = MapDecoder::with_config(DecoderConfig::new().strict(true));
        let decoded = decoder.functions("{5:('myFunc',10,(1,2,3,4),(5,6,7,8))}").unwrap();
        assert_eq!(decoded.entries[&5].line, 10);
        assert!(decoder.statements("{}").unwrap().entries.is_empty());
    }

    #[test]
    fn test_max_entries() {
        let decoder = MapDecoder::with_config(DecoderConfig::new().max_entries(2));
        let decoded = decoder
            .statements("{1:(1,1,1,1),2:(2,2,2,2),3:(3,3,3,3)}")
            .unwrap();
        assert_eq!(decoded.entries.len(), 2);
        assert!(decoded.truncated);
        assert!(decoded.is_clean());

        let decoded = decoder.statements("{1:(1,1,1,1),2:(2,2,2,2)}").unwrap();
        assert!(!decoded.truncated);
    }

    #[test]
    fn test_max_entries_counts_duplicate_keys() {
        let decoder = MapDecoder::with_config(DecoderConfig::new().max_entries(2));
        let decoded = decoder
            .statements("{1:(1,1,1,1),1:(5,5,5,5),2:(2,2,2,2)}")
            .unwrap();
        assert_eq!(decoded.entries.len(), 1);
        assert_eq!(decoded.entries[&1], StatementInfo::new(5, 5, 5, 5));
        assert!(decoded.truncated);
    }

    #[test]
    fn test_long_digit_runs() {
        let text = format!("{{{}}}", "1".repeat(10_000));
        let decoded = MapDecoder::new().statements(&text).unwrap();
        assert!(decoded.entries.is_empty());
        assert_eq!(decoded.skipped.len(), 1);
    }

    #[test]
    fn test_into_entries() {
        let decoded = MapDecoder::new().statements("{2:(1,2,3,4)}").unwrap();
        let entries = decoded.into_entries();
        assert_eq!(entries[&2].count, 4);
    }
}
