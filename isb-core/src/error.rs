//! Error and warning types for the ISB codec.

use std::fmt;

use thiserror::Error;

/// Fatal errors. Any of these aborts processing of the current file.
#[derive(Debug, Error)]
pub enum IsbError {
    #[error("Empty input")]
    EmptyInput,

    #[error("File too small to be an ISB container: {words} word(s)")]
    FileTooSmall { words: usize },

    #[error("Invalid block count {blocks} for a buffer of {words} words")]
    InvalidBlockCount { blocks: u32, words: usize },

    #[error("Invalid offset table: {blocks} blocks do not fit in {words} words")]
    InvalidTableOffset { blocks: u32, words: usize },

    /// Text input contained no usable `@` block header.
    #[error("No valid block found in text input")]
    NoBlocks,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Text input is not valid UTF-8: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),
}

/// A convenience `Result` type alias using [`IsbError`].
pub type Result<T> = std::result::Result<T, IsbError>;

/// Recoverable conditions. The codec keeps going and reports these
/// alongside its output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Warning {
    /// A block's word range lies outside the buffer; the block was skipped.
    OutOfBoundsBlock { block: usize, start: u32, end: u32 },

    /// Decode: declared text length above the limit, written as two hex words.
    /// Encode: UTF-16 text above the limit, entry dropped.
    TextLengthOverflow { offset: u32, length: usize },

    /// A marker at the end of its block with no room for its payload.
    TruncatedEntry { offset: u32, marker: u32 },

    /// Decoded text was not valid UTF-16 and was replaced lossily.
    InvalidUtf16 { offset: u32 },

    /// An `@` line whose offset could not be parsed; the block was skipped.
    MalformedHeader { line: usize },

    /// A `+`, `#` or `$` line whose value could not be parsed; the line was skipped.
    MalformedValue { line: usize },

    /// A non-empty line before the first block header.
    OrphanLine { line: usize },
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Warning::OutOfBoundsBlock { block, start, end } => write!(
                f,
                "block {} spans 0x{:x}..0x{:x} outside the buffer, skipped",
                block, start, end
            ),
            Warning::TextLengthOverflow { offset, length } => write!(
                f,
                "text at 0x{:x} is {} bytes, limit is {}",
                offset,
                length,
                crate::MAX_TEXT_LENGTH
            ),
            Warning::TruncatedEntry { offset, marker } => write!(
                f,
                "marker 0x{:08x} at 0x{:x} is cut off by the block end",
                marker, offset
            ),
            Warning::InvalidUtf16 { offset } => {
                write!(f, "text at 0x{:x} is not valid UTF-16", offset)
            }
            Warning::MalformedHeader { line } => {
                write!(f, "line {}: malformed block header, block skipped", line)
            }
            Warning::MalformedValue { line } => {
                write!(f, "line {}: malformed hex value, line skipped", line)
            }
            Warning::OrphanLine { line } => {
                write!(f, "line {}: content before first block header ignored", line)
            }
        }
    }
}
