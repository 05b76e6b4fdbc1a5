//! Coercion of natively typed statement maps.
//!
//! Some record sources hand over the statement map already structured, as a
//! mapping from key to a sequence of loosely typed scalars. [`NativeScalar`]
//! closes that set of types: each supported integer width converts to `u32`
//! with two's-complement truncation, anything else becomes 0.

use crate::model::{StatementInfo, StatementMap};
use serde::Deserialize;
use std::collections::BTreeMap;
use tracing::trace;

/// A scalar value as delivered by a record source
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(from = "serde_json::Value")]
pub enum NativeScalar {
    /// Unsigned 8-bit
    U8(u8),
    /// Unsigned 16-bit
    U16(u16),
    /// Unsigned 32-bit
    U32(u32),
    /// Unsigned 64-bit
    U64(u64),
    /// Signed 8-bit
    I8(i8),
    /// Signed 16-bit
    I16(i16),
    /// Signed 32-bit
    I32(i32),
    /// Signed 64-bit
    I64(i64),
    /// Any other type (text, float, null, ...)
    Unsupported,
}

impl NativeScalar {
    /// Converts to the canonical `u32`.
    ///
    /// Wider and signed values are truncated to their low 32 bits.
    pub fn to_u32(&self) -> u32 {
        match *self {
            Self::U8(v) => u32::from(v),
            Self::U16(v) => u32::from(v),
            Self::U32(v) => v,
            Self::U64(v) => v as u32,
            Self::I8(v) => v as u32,
            Self::I16(v) => v as u32,
            Self::I32(v) => v as u32,
            Self::I64(v) => v as u32,
            Self::Unsupported => 0,
        }
    }

    /// Returns true for the fallback arm
    pub fn is_unsupported(&self) -> bool {
        matches!(self, Self::Unsupported)
    }
}

macro_rules! impl_from_int {
    ($($ty:ty => $arm:ident),* $(,)?) => {
        $(
            impl From<$ty> for NativeScalar {
                fn from(v: $ty) -> Self {
                    Self::$arm(v)
                }
            }
        )*
    };
}

impl_from_int! {
    u8 => U8,
    u16 => U16,
    u32 => U32,
    u64 => U64,
    i8 => I8,
    i16 => I16,
    i32 => I32,
    i64 => I64,
}

impl From<serde_json::Value> for NativeScalar {
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Number(n) => n
                .as_u64()
                .map(Self::U64)
                .or_else(|| n.as_i64().map(Self::I64))
                .unwrap_or(Self::Unsupported),
            _ => Self::Unsupported,
        }
    }
}

/// Statement map as delivered natively: key to `[line, column, length, count, ...]`
pub type NativeStatementMap = BTreeMap<u32, Vec<NativeScalar>>;

/// Converts a native statement map.
///
/// Entries with fewer than four elements are dropped; elements past the
/// fourth are ignored.
pub fn coerce_statement_map(native: &NativeStatementMap) -> StatementMap {
    native
        .iter()
        .filter_map(|(&key, values)| match values.as_slice() {
            [line, column, length, count, ..] => Some((
                key,
                StatementInfo::new(
                    line.to_u32(),
                    column.to_u32(),
                    length.to_u32(),
                    count.to_u32(),
                ),
            )),
            _ => {
                trace!(
                    "Dropping native statement {}: {} element(s)",
                    key,
                    values.len()
                );
                None
            }
        })
        .collect()
}
