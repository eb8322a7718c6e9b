//! Conversion between raw bytes and little endian 32-bit words
use crate::error::{IsbError, Result};

/// Number of words needed to hold `byte_len` bytes
#[inline]
pub fn word_count(byte_len: usize) -> usize {
    byte_len.div_ceil(4)
}

/// Unpacks bytes into little endian words, zero-padding the tail to a word boundary
pub fn from_bytes(data: &[u8]) -> Result<Vec<u32>> {
    if data.is_empty() {
        return Err(IsbError::EmptyInput);
    }
    Ok(pack_padded(data))
}

/// Same as [`from_bytes`] but accepts empty input (used for text payloads)
pub(crate) fn pack_padded(data: &[u8]) -> Vec<u32> {
    let mut words = Vec::with_capacity(word_count(data.len()));
    let mut chunks = data.chunks_exact(4);
    for chunk in &mut chunks {
        words.push(u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]));
    }

    let rest = chunks.remainder();
    if !rest.is_empty() {
        let mut tail = [0u8; 4];
        tail[..rest.len()].copy_from_slice(rest);
        words.push(u32::from_le_bytes(tail));
    }

    words
}

/// Packs words back into little endian bytes
pub fn to_bytes(words: &[u32]) -> Vec<u8> {
    let mut out = Vec::with_capacity(words.len() * 4);
    for w in words {
        out.extend_from_slice(&w.to_le_bytes());
    }
    out
}
