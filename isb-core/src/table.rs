//! Trailing offset table that partitions a word buffer into blocks.
//!
//! Layout: `[block_0 .. block_{N-1} | offset_0 .. offset_{N-1} | N]`, offsets in bytes.

use crate::error::{IsbError, Result};

/// Byte range of a single block, `[start, end)`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockRange {
    pub start: u32,
    pub end: u32,
}

impl BlockRange {
    /// First word index of the block
    pub fn start_word(&self) -> usize {
        (self.start / 4) as usize
    }

    /// One past the last word index of the block
    pub fn end_word(&self) -> usize {
        (self.end / 4) as usize
    }

    /// Whether the block's word range lies inside a buffer of `len` words
    pub fn fits(&self, len: usize) -> bool {
        self.start_word() < len && self.end_word() <= len
    }
}

/// Parsed offset table. `offsets` carries one more entry than there are
/// blocks: the table's own start offset, which bounds the last block.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockTable {
    offsets: Vec<u32>,
    table_start: usize,
}

impl BlockTable {
    /// Locates and validates the offset table at the end of `words`
    pub fn parse(words: &[u32]) -> Result<Self> {
        let len = words.len();
        if len < 2 {
            return Err(IsbError::FileTooSmall { words: len });
        }

        let blocks = words[len - 1];
        if blocks == 0 || blocks as usize > len {
            return Err(IsbError::InvalidBlockCount { blocks, words: len });
        }

        let table_start = (len - 1)
            .checked_sub(blocks as usize)
            .ok_or(IsbError::InvalidTableOffset { blocks, words: len })?;

        let mut offsets = words[table_start..table_start + blocks as usize].to_vec();
        offsets.push((table_start * 4) as u32);

        Ok(Self {
            offsets,
            table_start,
        })
    }

    /// Number of blocks
    pub fn len(&self) -> usize {
        self.offsets.len() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Word index where the offset table begins
    pub fn table_start(&self) -> usize {
        self.table_start
    }

    /// Byte ranges of every block, in table order
    pub fn ranges(&self) -> impl Iterator<Item = BlockRange> + '_ {
        self.offsets.windows(2).map(|w| BlockRange {
            start: w[0],
            end: w[1],
        })
    }

    /// Appends the offset table for `starts` (block start byte offsets) to `words`
    pub fn build(words: &mut Vec<u32>, starts: &[u32]) {
        words.extend_from_slice(starts);
        words.push(starts.len() as u32);
    }
}
