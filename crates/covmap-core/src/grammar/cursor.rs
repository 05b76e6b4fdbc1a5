//! Lexical primitives for the coverage-map text grammars.
//!
//! A [`Cursor`] walks a `&str` byte by byte. Every delimiter in the grammars
//! is ASCII, so any position the cursor stops at after consuming a delimiter
//! or a digit is a valid `char` boundary.
//!
//! All readers return `Option`: a mismatch is the normal outcome of probing a
//! candidate entry, not an error. On `None` the cursor position is
//! unspecified and the caller is expected to discard the cursor.

/// A forward-only reader over grammar text
#[derive(Debug, Clone)]
pub struct Cursor<'a> {
    text: &'a str,
    pos: usize,
}

impl<'a> Cursor<'a> {
    /// Creates a cursor over `text` starting at byte offset `pos`
    pub fn new(text: &'a str, pos: usize) -> Self {
        Self { text, pos }
    }

    /// Current byte offset
    pub fn pos(&self) -> usize {
        self.pos
    }

    /// Returns true if the whole text has been consumed
    pub fn is_at_end(&self) -> bool {
        self.pos >= self.text.len()
    }

    /// The next byte without consuming it
    pub fn peek(&self) -> Option<u8> {
        self.text.as_bytes().get(self.pos).copied()
    }

    /// Consumes `byte` if it is next
    pub fn eat(&mut self, byte: u8) -> Option<()> {
        if self.peek()? == byte {
            self.pos += 1;
            Some(())
        } else {
            None
        }
    }

    /// Reads one or more ASCII digits as an unsigned integer.
    ///
    /// Values beyond `max` saturate to `max` rather than failing, so a matched
    /// digit run always yields a number.
    pub fn uint(&mut self, max: u64) -> Option<u64> {
        let bytes = self.text.as_bytes();
        let start = self.pos;
        let mut value: u64 = 0;

        while let Some(&b) = bytes.get(self.pos) {
            if !b.is_ascii_digit() {
                break;
            }
            value = value
                .saturating_mul(10)
                .saturating_add(u64::from(b - b'0'))
                .min(max);
            self.pos += 1;
        }

        (self.pos > start).then_some(value)
    }

    /// Reads a `u32` field
    pub fn u32(&mut self) -> Option<u32> {
        self.uint(u64::from(u32::MAX)).map(|v| v as u32)
    }

    /// Reads a `u8` field
    pub fn u8(&mut self) -> Option<u8> {
        self.uint(u64::from(u8::MAX)).map(|v| v as u8)
    }

    /// Reads `(a,b,c,d)`
    pub fn tuple4(&mut self) -> Option<[u32; 4]> {
        self.eat(b'(')?;
        let a = self.u32()?;
        self.eat(b',')?;
        let b = self.u32()?;
        self.eat(b',')?;
        let c = self.u32()?;
        self.eat(b',')?;
        let d = self.u32()?;
        self.eat(b')')?;
        Some([a, b, c, d])
    }

    /// Reads everything up to the next `delim` and consumes the delimiter.
    ///
    /// Fails if `delim` never occurs.
    pub fn until(&mut self, delim: u8) -> Option<&'a str> {
        let rest = &self.text.as_bytes()[self.pos..];
        let len = rest.iter().position(|&b| b == delim)?;
        let slice = &self.text[self.pos..self.pos + len];
        self.pos += len + 1;
        Some(slice)
    }

    /// Reads a single-quoted field. There is no escape syntax: the field ends
    /// at the first closing quote.
    pub fn quoted(&mut self) -> Option<&'a str> {
        self.eat(b'\'')?;
        self.until(b'\'')
    }
}

/// Offset of the next ASCII digit at or after `from`
pub(crate) fn next_digit(bytes: &[u8], from: usize) -> Option<usize> {
    bytes
        .get(from..)?
        .iter()
        .position(u8::is_ascii_digit)
        .map(|i| from + i)
}

/// Offset one past the digit run starting at `from`
pub(crate) fn end_of_digits(bytes: &[u8], from: usize) -> usize {
    bytes[from..]
        .iter()
        .position(|b| !b.is_ascii_digit())
        .map_or(bytes.len(), |i| from + i)
}
