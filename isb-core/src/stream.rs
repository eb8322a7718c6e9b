//! Per-block entry state machine.
//!
//! A block is scanned in three steps: a region check on its first word (key or
//! parameter-region length), then a scan that classifies every remaining word,
//! then the running cipher key is handed back for the next block.

use std::ops::Range;

use tracing::{trace, warn};

use crate::crypto;
use crate::entry::{Entry, HexTag, KEY_THRESHOLD, MARKER_NUMBER, MARKER_TEXT, MAX_TEXT_LENGTH};
use crate::error::Warning;
use crate::words;

pub(crate) fn report(warnings: &mut Vec<Warning>, w: Warning) {
    warn!("{}", w);
    warnings.push(w);
}

/// Decodes the words in `range` into entries.
///
/// `key` is the cipher key in effect when the block starts. Returns the entries
/// and the key in effect when it ends.
pub fn decode_block(
    buffer: &[u32],
    range: Range<usize>,
    mut key: u32,
    warnings: &mut Vec<Warning>,
) -> (Vec<Entry>, u32) {
    let mut entries = Vec::new();
    let end = range.end;
    let mut idx = range.start;

    // Words before `cutoff` belong to the parameter region. A block led by a key
    // has no parameter region.
    let mut cutoff = idx;
    if idx < end {
        let first = buffer[idx];
        if first < KEY_THRESHOLD {
            cutoff = idx + (first >> 18) as usize + 1;
        } else {
            key = first;
            entries.push(Entry::Key(first));
            idx += 1;
        }
    }

    let hex_tag = |i: usize| {
        if i < cutoff {
            HexTag::Parameter
        } else {
            HexTag::Generic
        }
    };

    while idx < end {
        let value = buffer[idx];
        let offset = (idx * 4) as u32;

        match value {
            MARKER_NUMBER | MARKER_TEXT if idx + 1 >= end => {
                report(warnings, Warning::TruncatedEntry { offset, marker: value });
                entries.push(Entry::Hex(value, hex_tag(idx)));
                idx += 1;
            }
            MARKER_NUMBER => {
                entries.push(Entry::Number(buffer[idx + 1]));
                idx += 2;
            }
            MARKER_TEXT => {
                let len = buffer[idx + 1] as usize;
                if len > MAX_TEXT_LENGTH {
                    report(warnings, Warning::TextLengthOverflow { offset, length: len });
                    entries.push(Entry::Hex(value, HexTag::Parameter));
                    entries.push(Entry::Hex(buffer[idx + 1], HexTag::Parameter));
                    idx += 2;
                    continue;
                }

                let start = idx + 2;
                let wc = words::word_count(len);
                if start + wc > end {
                    report(warnings, Warning::TruncatedEntry { offset, marker: value });
                    entries.push(Entry::Hex(value, HexTag::Parameter));
                    entries.push(Entry::Hex(buffer[idx + 1], HexTag::Parameter));
                    idx += 2;
                    continue;
                }

                let (text, valid) = decode_text(&buffer[start..start + wc], key, len);
                if !valid {
                    report(warnings, Warning::InvalidUtf16 { offset });
                }
                trace!("text at 0x{:x}: {} bytes", offset, len);
                entries.push(Entry::Text { len, text });
                idx = start + wc;
            }
            _ => {
                entries.push(Entry::Hex(value, hex_tag(idx)));
                idx += 1;
            }
        }
    }

    (entries, key)
}

/// Deciphers text words and reads the first `len` bytes as UTF-16LE.
/// The flag is false when the bytes were not valid UTF-16.
fn decode_text(ciphered: &[u32], key: u32, len: usize) -> (String, bool) {
    let mut plain = ciphered.to_vec();
    crypto::decode_words(&mut plain, key);

    let mut bytes = words::to_bytes(&plain);
    bytes.truncate(len);

    let chunks = bytes.chunks_exact(2);
    let odd = !chunks.remainder().is_empty();
    let units: Vec<u16> = chunks.map(|c| u16::from_le_bytes([c[0], c[1]])).collect();

    match String::from_utf16(&units) {
        Ok(mut s) => {
            if odd {
                s.push(char::REPLACEMENT_CHARACTER);
            }
            (s, !odd)
        }
        Err(_) => {
            let mut s = String::from_utf16_lossy(&units);
            if odd {
                s.push(char::REPLACEMENT_CHARACTER);
            }
            (s, false)
        }
    }
}

/// Encodes one block's entries, appending words to `out`.
///
/// `key` is the running key carried from the previous block, `first_in_file`
/// marks the first block of the file. Returns the key in effect at block end.
pub fn encode_block(
    entries: &[Entry],
    mut key: u32,
    first_in_file: bool,
    out: &mut Vec<u32>,
    warnings: &mut Vec<Warning>,
) -> u32 {
    let mut rest = entries;

    // A file whose very first entry is a key starts with that key as a bare word.
    if first_in_file {
        if let Some(first) = entries.first() {
            if let Entry::Key(v) | Entry::Hex(v, HexTag::Generic) = first {
                if *v >= KEY_THRESHOLD {
                    out.push(*v);
                    key = *v;
                    rest = &entries[1..];
                }
            }
        }
    }

    for entry in rest {
        match entry {
            Entry::Key(v) => {
                out.push(*v);
                key = *v;
            }
            Entry::Number(v) => {
                out.push(MARKER_NUMBER);
                out.push(*v);
            }
            Entry::Hex(v, tag) => {
                out.push(*v);
                if *tag == HexTag::Generic && *v >= KEY_THRESHOLD {
                    key = *v;
                }
            }
            Entry::Text { text, .. } => {
                let bytes: Vec<u8> = text.encode_utf16().flat_map(u16::to_le_bytes).collect();
                if bytes.len() > MAX_TEXT_LENGTH {
                    report(
                        warnings,
                        Warning::TextLengthOverflow {
                            offset: (out.len() * 4) as u32,
                            length: bytes.len(),
                        },
                    );
                    continue;
                }

                let mut packed = words::pack_padded(&bytes);
                crypto::encode_words(&mut packed, key);
                out.push(MARKER_TEXT);
                out.push(bytes.len() as u32);
                out.extend_from_slice(&packed);
            }
        }
    }

    key
}
