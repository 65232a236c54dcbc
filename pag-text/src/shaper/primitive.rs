use smallvec::smallvec;

use super::{ClusterGlyphs, ShapingBackend};
use crate::typeface::TypefaceRef;

/// One glyph per codepoint: no ligatures, no clustering.
#[derive(Clone, Copy, Debug, Default)]
pub struct PrimitiveShaper;

impl ShapingBackend for PrimitiveShaper {
    fn name(&self) -> &'static str {
        "primitive"
    }

    fn shape_run(&self, text: &str, typeface: &TypefaceRef) -> Vec<ClusterGlyphs> {
        Utf8Decoder::new(text.as_bytes())
            .map(|(index, unichar)| ClusterGlyphs::new(index, smallvec![typeface.glyph_id(unichar)]))
            .collect()
    }
}

/// Lenient UTF-8 decoder yielding `(byte offset, char)`.
///
/// An invalid lead byte, a bad continuation byte or a truncated sequence
/// skips the lead byte and decoding resumes at the next byte. Sequences
/// that decode to a non-scalar value (surrogates, > U+10FFFF) are
/// skipped whole.
#[derive(Clone, Debug)]
pub struct Utf8Decoder<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> Utf8Decoder<'a> {
    pub fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }
}

impl Iterator for Utf8Decoder<'_> {
    type Item = (usize, char);

    fn next(&mut self) -> Option<Self::Item> {
        while self.pos < self.bytes.len() {
            let start = self.pos;
            let lead = self.bytes[start];
            let (len, initial) = match lead {
                0x00..=0x7F => (1, lead as u32),
                _ if lead & 0xE0 == 0xC0 => (2, (lead & 0x1F) as u32),
                _ if lead & 0xF0 == 0xE0 => (3, (lead & 0x0F) as u32),
                _ if lead & 0xF8 == 0xF0 => (4, (lead & 0x07) as u32),
                _ => {
                    self.pos += 1;
                    continue;
                }
            };
            let Some(tail) = self.bytes.get(start + 1..start + len) else {
                self.pos += 1;
                continue;
            };
            if tail.iter().any(|b| b & 0xC0 != 0x80) {
                self.pos += 1;
                continue;
            }
            let code = tail
                .iter()
                .fold(initial, |code, b| (code << 6) | (b & 0x3F) as u32);
            self.pos += len;
            if let Some(unichar) = char::from_u32(code) {
                return Some((start, unichar));
            }
        }
        None
    }
}
