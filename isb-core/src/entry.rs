//! Entry model and the line-oriented text grammar.
//!
//! | Prefix | Meaning |
//! |---|---|
//! | `@<hex>` | block header, byte offset |
//! | `$<8-hex>` | generic hex word or cipher key |
//! | `#<8-hex>` | parameter-region hex word |
//! | `+<8-hex>` | value of a number pair |
//! | none | decoded text |

use std::fmt;

/// Marks a number pair: `[MARKER_NUMBER, value]`
pub const MARKER_NUMBER: u32 = 0x40403;

/// Marks a text entry: `[MARKER_TEXT, byte_len, ciphered words..]`
pub const MARKER_TEXT: u32 = 0x40400;

/// Words at or above this value act as cipher keys in key-eligible positions
pub const KEY_THRESHOLD: u32 = 0x3000001;

/// Largest UTF-16 byte length a text entry may declare
pub const MAX_TEXT_LENGTH: usize = 0x7E;

/// Which region a hex word was found in. Only generic words can be promoted to keys.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HexTag {
    /// `#`, inside the leading parameter region of a block
    Parameter,
    /// `$`, anywhere else
    Generic,
}

impl HexTag {
    pub fn as_char(self) -> char {
        match self {
            HexTag::Parameter => '#',
            HexTag::Generic => '$',
        }
    }
}

/// One entry of a block
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Entry {
    /// Explicit cipher key leading a block
    Key(u32),
    Number(u32),
    /// `len` is the UTF-16LE byte length
    Text { len: usize, text: String },
    Hex(u32, HexTag),
}

impl Entry {
    /// Builds a text entry, computing its UTF-16LE byte length
    pub fn text(s: impl Into<String>) -> Self {
        let text = s.into();
        let len = text.encode_utf16().count() * 2;
        Entry::Text { len, text }
    }

    /// Hex entry that may carry a new key when re-encoded
    pub fn is_key_candidate(&self) -> bool {
        match self {
            Entry::Key(v) | Entry::Hex(v, HexTag::Generic) => *v >= KEY_THRESHOLD,
            _ => false,
        }
    }
}

impl fmt::Display for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Entry::Key(v) => write!(f, "${:08x}", v),
            Entry::Number(v) => write!(f, "+{:08x}", v),
            Entry::Text { text, .. } => f.write_str(text),
            Entry::Hex(v, tag) => write!(f, "{}{:08x}", tag.as_char(), v),
        }
    }
}

/// One parsed line of the text form
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Line {
    Header(u32),
    Entry(Entry),
}

/// Why a line could not be parsed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineError {
    Header,
    Value,
}

fn parse_hex(s: &str) -> Option<u32> {
    let s = s.trim();
    if s.is_empty() || !s.bytes().all(|b| b.is_ascii_hexdigit()) {
        return None;
    }
    u32::from_str_radix(s, 16).ok()
}

/// Classifies a line by its leading character. Line endings must already be stripped.
pub fn parse_line(line: &str) -> Result<Line, LineError> {
    let Some(first) = line.chars().next() else {
        return Ok(Line::Entry(Entry::text("")));
    };

    let rest = &line[first.len_utf8()..];
    match first {
        '@' => parse_hex(rest).map(Line::Header).ok_or(LineError::Header),
        '+' => parse_hex(rest)
            .map(|v| Line::Entry(Entry::Number(v)))
            .ok_or(LineError::Value),
        '#' => parse_hex(rest)
            .map(|v| Line::Entry(Entry::Hex(v, HexTag::Parameter)))
            .ok_or(LineError::Value),
        '$' => parse_hex(rest)
            .map(|v| Line::Entry(Entry::Hex(v, HexTag::Generic)))
            .ok_or(LineError::Value),
        _ => Ok(Line::Entry(Entry::text(line))),
    }
}
