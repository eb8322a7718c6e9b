//! core functionality for decoding and encoding
//! ISB resource containers to and from an editable text form
//!
//! # Modules
//!
//! - `words`: bytes <-> little endian 32-bit words
//! - `crypto`: rotate/XOR word cipher
//! - `table`: trailing block offset table
//! - `entry`: entry model and line grammar
//! - `stream`: per-block entry state machine
//! - `codec`: whole-file decode/encode
//! - `batch`: directory batch processing

pub mod batch;
pub mod codec;
pub mod crypto;
pub mod entry;
pub mod error;
pub mod stream;
pub mod table;
pub mod words;

// Re-export commonly used items
pub use batch::{BatchOptions, BatchSummary, Mode, process_directory};
pub use codec::{Block, Decoded, Document, Encoded, decode, decode_file, encode, encode_file};
pub use entry::{Entry, HexTag, KEY_THRESHOLD, MARKER_NUMBER, MARKER_TEXT, MAX_TEXT_LENGTH};
pub use error::{IsbError, Result, Warning};
pub use table::{BlockRange, BlockTable};
