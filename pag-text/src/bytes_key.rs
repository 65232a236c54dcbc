//! Hashable key built from 32-bit words.

use smallvec::SmallVec;

/// A compact key made of `u32` words, used to identify glyph styles and
/// atlas entries. Floats are stored by their bit pattern.
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
pub struct BytesKey {
    values: SmallVec<[u32; 8]>,
}

impl BytesKey {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_u32(&mut self, value: u32) {
        self.values.push(value);
    }

    pub fn write_f32(&mut self, value: f32) {
        self.values.push(value.to_bits());
    }

    pub fn write_bool(&mut self, value: bool) {
        self.values.push(value as u32);
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}
