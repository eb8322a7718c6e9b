//! Rotate/XOR word cipher used for ISB text payloads

/// Rotates a word right by 3 bits
#[inline]
pub fn ror3(x: u32) -> u32 {
    x.rotate_right(3)
}

/// Rotates a word left by 3 bits, inverse of [`ror3`]
#[inline]
pub fn rol3(x: u32) -> u32 {
    x.rotate_left(3)
}

/// Deciphers a single word with the given key
#[inline]
pub fn decode_word(w: u32, key: u32) -> u32 {
    ror3(w) ^ key
}

/// Enciphers a single word with the given key
#[inline]
pub fn encode_word(w: u32, key: u32) -> u32 {
    rol3(w ^ key)
}

/// Deciphers a run of words in place
pub fn decode_words(v: &mut [u32], key: u32) {
    for w in v.iter_mut() {
        *w = decode_word(*w, key);
    }
}

/// Enciphers a run of words in place
pub fn encode_words(v: &mut [u32], key: u32) {
    for w in v.iter_mut() {
        *w = encode_word(*w, key);
    }
}
