//! The per-command flag bits of a compressed block.

use crate::errors::PakError;
use bitstream_io::{BigEndian, BitWriter};

/// Ordered command flags for one compressed block, one bit per payload word.
///
/// A clear bit marks a literal; a set bit marks a match command or segment
/// terminator. Serialization packs the bits most significant first into
/// 32-bit words, zero-padding the tail, since the console consumes the
/// bitfield a word at a time.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Bitfield {
    bits: Vec<bool>,
}

impl Bitfield {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(bits: usize) -> Self {
        Self {
            bits: Vec::with_capacity(bits),
        }
    }

    pub fn push(&mut self, bit: bool) {
        self.bits.push(bit);
    }

    /// Number of bits, not counting the padding added on serialization.
    pub fn len(&self) -> usize {
        self.bits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bits.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = bool> + '_ {
        self.bits.iter().copied()
    }

    /// Serialized size in bytes: a whole number of 32-bit words.
    pub fn byte_len(&self) -> usize {
        (self.bits.len() + 31) / 32 * 4
    }

    /// Pack into big-endian 32-bit words, zero-padding the last word.
    pub fn to_bytes(&self) -> Result<Vec<u8>, PakError> {
        let mut buf = Vec::with_capacity(self.byte_len());
        {
            let mut out = BitWriter::endian(&mut buf, BigEndian);
            for bit in self.iter() {
                out.write_bit(bit)?;
            }
            let tail = (self.bits.len() % 32) as u32;
            if tail != 0 {
                out.write(32 - tail, 0u32)?;
            }
        }
        Ok(buf)
    }
}

impl FromIterator<bool> for Bitfield {
    fn from_iter<I: IntoIterator<Item = bool>>(iter: I) -> Self {
        Self {
            bits: iter.into_iter().collect(),
        }
    }
}
