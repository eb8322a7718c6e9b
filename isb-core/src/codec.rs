//! Whole-file decode/encode between the ISB container and its text form
use std::fs;
use std::path::Path;

use tracing::debug;

use crate::entry::{Entry, Line, LineError, parse_line};
use crate::error::{IsbError, Result, Warning};
use crate::stream::{decode_block, encode_block, report};
use crate::table::BlockTable;
use crate::words;

/// One block of the text form. `offset` is informational when encoding:
/// real offsets are recomputed from the emitted words.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Block {
    pub offset: u32,
    pub entries: Vec<Entry>,
}

/// All blocks of one file
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Document {
    pub blocks: Vec<Block>,
}

impl Document {
    /// Splits a word buffer into blocks and decodes each one,
    /// threading the cipher key from block to block
    pub fn from_words(buffer: &[u32], warnings: &mut Vec<Warning>) -> Result<Self> {
        let table = BlockTable::parse(buffer)?;
        debug!(
            "{} words, {} blocks, table at word {}",
            buffer.len(),
            table.len(),
            table.table_start()
        );

        let mut blocks = Vec::with_capacity(table.len());
        let mut key = 0;

        for (i, range) in table.ranges().enumerate() {
            let mut block = Block {
                offset: range.start,
                entries: Vec::new(),
            };

            if !range.fits(buffer.len()) {
                report(
                    warnings,
                    Warning::OutOfBoundsBlock {
                        block: i,
                        start: range.start,
                        end: range.end,
                    },
                );
                blocks.push(block);
                continue;
            }

            let (entries, next_key) =
                decode_block(buffer, range.start_word()..range.end_word(), key, warnings);
            debug!(
                "block {}: words {}..{}, {} entries, key 0x{:08x}",
                i,
                range.start_word(),
                range.end_word(),
                entries.len(),
                next_key
            );

            block.entries = entries;
            key = next_key;
            blocks.push(block);
        }

        Ok(Self { blocks })
    }

    /// Renders the line-oriented text form
    pub fn to_text(&self) -> String {
        let mut out = String::new();
        for block in &self.blocks {
            out.push_str(&format!("@{:x}\n", block.offset));
            for entry in &block.entries {
                out.push_str(&entry.to_string());
                out.push('\n');
            }
        }
        out
    }

    /// Parses the text form. Malformed headers drop their whole block,
    /// malformed values drop only their line.
    pub fn parse(text: &str, warnings: &mut Vec<Warning>) -> Result<Self> {
        let text = text.strip_prefix('\u{FEFF}').unwrap_or(text);

        let mut blocks = Vec::new();
        let mut current: Option<Block> = None;
        let mut skipping = false;

        for (i, raw) in text.lines().enumerate() {
            let line_no = i + 1;

            match parse_line(raw) {
                Ok(Line::Header(offset)) => {
                    blocks.extend(current.take());
                    current = Some(Block {
                        offset,
                        entries: Vec::new(),
                    });
                    skipping = false;
                }
                Err(LineError::Header) => {
                    report(warnings, Warning::MalformedHeader { line: line_no });
                    blocks.extend(current.take());
                    skipping = true;
                }
                Ok(Line::Entry(entry)) => match current.as_mut() {
                    Some(block) => block.entries.push(entry),
                    None if skipping => {}
                    None if raw.is_empty() => {}
                    None => report(warnings, Warning::OrphanLine { line: line_no }),
                },
                Err(LineError::Value) => match current {
                    Some(_) => report(warnings, Warning::MalformedValue { line: line_no }),
                    None if skipping => {}
                    None => report(warnings, Warning::OrphanLine { line: line_no }),
                },
            }
        }
        blocks.extend(current);

        if blocks.is_empty() {
            return Err(IsbError::NoBlocks);
        }

        Ok(Self { blocks })
    }

    /// Encodes every block and appends the offset table
    pub fn to_words(&self, warnings: &mut Vec<Warning>) -> Vec<u32> {
        let mut out = Vec::new();
        let mut starts = Vec::with_capacity(self.blocks.len());
        let mut key = 0;

        for (i, block) in self.blocks.iter().enumerate() {
            starts.push((out.len() * 4) as u32);
            key = encode_block(&block.entries, key, i == 0, &mut out, warnings);
            debug!(
                "block {}: {} entries, ends at word {}, key 0x{:08x}",
                i,
                block.entries.len(),
                out.len(),
                key
            );
        }

        BlockTable::build(&mut out, &starts);
        out
    }
}

/// Result of decoding one container
#[derive(Debug, Clone)]
pub struct Decoded {
    pub text: String,
    pub blocks: usize,
    pub warnings: Vec<Warning>,
}

/// Result of encoding one text file
#[derive(Debug, Clone)]
pub struct Encoded {
    pub bytes: Vec<u8>,
    pub blocks: usize,
    pub warnings: Vec<Warning>,
}

/// Decode an ISB container to its text form
pub fn decode(data: &[u8]) -> Result<Decoded> {
    let buffer = words::from_bytes(data)?;
    let mut warnings = Vec::new();
    let doc = Document::from_words(&buffer, &mut warnings)?;

    Ok(Decoded {
        text: doc.to_text(),
        blocks: doc.blocks.len(),
        warnings,
    })
}

/// Encode the text form back into an ISB container
pub fn encode(text: &str) -> Result<Encoded> {
    let mut warnings = Vec::new();
    let doc = Document::parse(text, &mut warnings)?;
    let buffer = doc.to_words(&mut warnings);

    Ok(Encoded {
        bytes: words::to_bytes(&buffer),
        blocks: doc.blocks.len(),
        warnings,
    })
}

/// Decode `src` and write the text form to `dst`
pub fn decode_file(src: &Path, dst: &Path) -> Result<Decoded> {
    let data = fs::read(src)?;
    let decoded = decode(&data)?;
    fs::write(dst, decoded.text.as_bytes())?;
    Ok(decoded)
}

/// Encode the text file `src` and write the container to `dst`
pub fn encode_file(src: &Path, dst: &Path) -> Result<Encoded> {
    let text = String::from_utf8(fs::read(src)?)?;
    let encoded = encode(&text)?;
    fs::write(dst, &encoded.bytes)?;
    Ok(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto;
    use crate::entry::{HexTag, MARKER_NUMBER, MARKER_TEXT};
    use proptest::prelude::*;

    const KEY: u32 = 0x0300_0050;

    fn cipher_text(s: &str, key: u32) -> Vec<u32> {
        let bytes: Vec<u8> = s.encode_utf16().flat_map(u16::to_le_bytes).collect();
        let mut packed = words::pack_padded(&bytes);
        crypto::encode_words(&mut packed, key);
        packed
    }

    /// Two blocks: a keyed one and one with a parameter region that
    /// relies on the key carried over from the first.
    fn sample_container() -> Vec<u8> {
        let mut buf = vec![KEY, MARKER_TEXT, 6];
        buf.extend(cipher_text("abc", KEY));
        buf.extend([MARKER_NUMBER, 0x2a]);
        let second = (buf.len() * 4) as u32;
        buf.extend([0x0004_0000, 0x11, 0x22, MARKER_TEXT, 4]);
        buf.extend(cipher_text("hi", KEY));
        buf.extend([0, second, 2]);
        words::to_bytes(&buf)
    }

    const SAMPLE_TEXT: &str = "@0\n$03000050\nabc\n+0000002a\n@1c\n#00040000\n#00000011\n$00000022\nhi\n";

    #[test]
    fn test_decode_sample() {
        let decoded = decode(&sample_container()).unwrap();
        assert_eq!(decoded.text, SAMPLE_TEXT);
        assert_eq!(decoded.blocks, 2);
        assert!(decoded.warnings.is_empty());
    }

    #[test]
    fn test_binary_roundtrip() {
        let original = sample_container();
        let decoded = decode(&original).unwrap();
        let encoded = encode(&decoded.text).unwrap();
        assert_eq!(encoded.bytes, original);
        assert!(encoded.warnings.is_empty());
    }

    #[test]
    fn test_single_block_container() {
        let data = words::to_bytes(&[0x0A, 0x00, 0x01]);
        let decoded = decode(&data).unwrap();
        assert_eq!(decoded.text, "@0\n#0000000a\n");
        assert_eq!(encode(&decoded.text).unwrap().bytes, data);
    }

    #[test]
    fn test_fatal_errors() {
        assert!(matches!(decode(&[]), Err(IsbError::EmptyInput)));
        assert!(matches!(
            decode(&[1, 2, 3, 4]),
            Err(IsbError::FileTooSmall { words: 1 })
        ));
        assert!(matches!(
            decode(&words::to_bytes(&[5, 0])),
            Err(IsbError::InvalidBlockCount { blocks: 0, .. })
        ));
        assert!(matches!(
            decode(&words::to_bytes(&[5, 6, 9])),
            Err(IsbError::InvalidBlockCount { blocks: 9, .. })
        ));
    }

    #[test]
    fn test_out_of_bounds_block_skipped() {
        // block 0 points far past the end, block 1 is the single word 0x0A
        let data = words::to_bytes(&[0x0A, 0x400, 0x00, 0x02]);
        let decoded = decode(&data).unwrap();
        assert_eq!(decoded.text, "@400\n@0\n#0000000a\n");
        assert_eq!(decoded.warnings.len(), 1);
        assert!(matches!(
            decoded.warnings[0],
            Warning::OutOfBoundsBlock { block: 0, .. }
        ));
    }

    #[test]
    fn test_oversized_text_decodes_as_hex() {
        let data = words::to_bytes(&[0x0, MARKER_TEXT, 0x80, 0x0, 0x1]);
        let decoded = decode(&data).unwrap();
        assert_eq!(decoded.text, "@0\n#00000000\n#00040400\n#00000080\n");
        assert!(matches!(
            decoded.warnings[0],
            Warning::TextLengthOverflow { offset: 4, length: 0x80 }
        ));
    }

    #[test]
    fn test_offsets_are_recomputed() {
        let encoded = encode("@ffff\n$00000001\n@0\n$00000002\n").unwrap();
        let buf = words::from_bytes(&encoded.bytes).unwrap();
        assert_eq!(buf, vec![1, 2, 0, 4, 2]);
    }

    #[test]
    fn test_parse_recovers_from_bad_lines() {
        let text = "orphan\n@0\n$zz\n+00000001\n@nothex\n$00000005\n@8\n$00000006\n";
        let mut warnings = Vec::new();
        let doc = Document::parse(text, &mut warnings).unwrap();

        assert_eq!(doc.blocks.len(), 2);
        assert_eq!(doc.blocks[0].entries, vec![Entry::Number(1)]);
        assert_eq!(
            doc.blocks[1].entries,
            vec![Entry::Hex(6, HexTag::Generic)]
        );
        assert_eq!(
            warnings,
            vec![
                Warning::OrphanLine { line: 1 },
                Warning::MalformedValue { line: 3 },
                Warning::MalformedHeader { line: 5 },
            ]
        );
    }

    #[test]
    fn test_parse_bom_and_crlf() {
        let mut warnings = Vec::new();
        let doc = Document::parse("\u{FEFF}@0\r\n+00000001\r\n\r\nabc\r\n", &mut warnings).unwrap();
        assert_eq!(
            doc.blocks[0].entries,
            vec![Entry::Number(1), Entry::text(""), Entry::text("abc")]
        );
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_no_blocks() {
        assert!(matches!(encode(""), Err(IsbError::NoBlocks)));
        assert!(matches!(encode("@xyz\nabc\n"), Err(IsbError::NoBlocks)));
    }

    #[test]
    fn test_oversized_text_dropped_on_encode() {
        let long = "あ".repeat(64);
        let text = format!("@0\n+00000001\n{}\n", long);
        let encoded = encode(&text).unwrap();
        assert_eq!(
            words::from_bytes(&encoded.bytes).unwrap(),
            vec![MARKER_NUMBER, 1, 0, 1]
        );
        assert_eq!(encoded.warnings.len(), 1);
    }

    #[test]
    fn test_empty_text_roundtrip() {
        let text = "@0\n$03000050\n\nabc\n";
        let encoded = encode(text).unwrap();
        assert_eq!(decode(&encoded.bytes).unwrap().text, text);
    }

    #[test]
    fn test_file_roundtrip() {
        let dir = tempfile::TempDir::new().unwrap();
        let isb = dir.path().join("sample.isb");
        let txt = dir.path().join("sample.txt");
        let back = dir.path().join("back.isb");

        fs::write(&isb, sample_container()).unwrap();
        let decoded = decode_file(&isb, &txt).unwrap();
        assert_eq!(fs::read_to_string(&txt).unwrap(), SAMPLE_TEXT);
        assert_eq!(decoded.blocks, 2);

        encode_file(&txt, &back).unwrap();
        assert_eq!(fs::read(&back).unwrap(), sample_container());
    }

    /// Decodes and re-encodes every container under `data/isb`, when present
    #[test]
    fn test_all_samples_roundtrip() {
        let samples_dir = Path::new(env!("CARGO_MANIFEST_DIR"))
            .parent()
            .unwrap()
            .join("data")
            .join("isb");

        if !samples_dir.exists() {
            println!("Warning: samples directory not found at {:?}", samples_dir);
            return;
        }

        let mut failed = Vec::new();
        for entry in fs::read_dir(&samples_dir).unwrap() {
            let path = entry.unwrap().path();
            if !path.is_file() {
                continue;
            }

            let original = fs::read(&path).unwrap();
            match decode(&original) {
                Ok(decoded) if decoded.warnings.is_empty() => {
                    let encoded = encode(&decoded.text).unwrap();
                    if encoded.bytes != original {
                        failed.push(path);
                    }
                }
                // containers that hit a lossy fallback are not expected to round-trip
                Ok(_) => {}
                Err(e) => panic!("{}: {}", path.display(), e),
            }
        }

        assert!(failed.is_empty(), "round-trip mismatch: {:?}", failed);
    }

    proptest! {
        #[test]
        fn prop_text_roundtrip(s in "[a-zA-Z0-9 ぁ-ゖ一-龥]{0,40}") {
            let text = format!("@0\n$03000050\n{}\n+00000001\n", s);
            let encoded = encode(&text).unwrap();
            prop_assert!(encoded.warnings.is_empty());
            prop_assert_eq!(decode(&encoded.bytes).unwrap().text, text);
        }
    }
}
