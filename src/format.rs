//! Wire-level structures for compressed blocks and mesh slots.
//!
//! ## Compressed blocks
//! A self-describing block has four parts:
//!
//! | Bytes    | Description |
//! | :------: | ----------- |
//! | 0..4     | bitfield size `b` in bytes, little endian |
//! | 4..8     | decompressed size in bytes, little endian |
//! | 8..8+b   | command bitfield |
//! | 8+b..    | payload words, little endian `u16` |
//!
//! The size fields can be extracted into a [`BlockHeader`] with
//! [`Decoder::header()`].
//!
//! ## Command bitfield
//! One flag bit per payload word, most significant bit first, zero-padded to
//! a whole number of 32-bit words (the console DMAs the bitfield as words).
//! A clear bit marks a literal word; a set bit marks a match command or the
//! segment terminator.
//!
//! ## Payload words
//! Literal words are copied to the output as-is. A match word packs a window
//! offset and a run length:
//! ```text
//! ┌ byte offset from the window base (always even)
//! |             ┌ run length in words, minus two
//! 0000000000000 000
//! ```
//! Offsets are word-aligned, so bit 3 of a match word is always clear and a
//! flagged word can never collide with [`TERMINATOR`]. A flagged `0xFFFF`
//! instead ends the current segment's commands and advances the lookback
//! window base by [`SEGMENT_BYTES`].
//!
//! ## Mesh slots
//! A mesh slot is a fixed-stride directory entry pointing at the slot's
//! triangle, quad, and vertex arrays elsewhere in the blob:
//!
//! | Bytes    | Description |
//! | :------: | ----------- |
//! | 0        | triangle count |
//! | 1        | quad count |
//! | 2        | vertex count |
//! | 3        | reserved; repacking leaves it untouched |
//! | 4..8     | triangle array offset, little endian |
//! | 8..12    | quad array offset, little endian |
//! | 12..16   | vertex array offset, little endian |
//! | 16..24   | shadow and color array offsets ([`SlotLayout::Extended`] only) |
//!
//! Offsets are absolute byte positions in the blob, and an array with zero
//! elements stores offset zero. Vertex records are 4 bytes and face records
//! 12 bytes; see [`vertex`](crate::vertex) and [`face`](crate::face) for
//! their layouts.
//!
//! [`Decoder::header()`]: crate::Decoder::header

use crate::errors::PakError;
use smallvec::SmallVec;
use std::fmt;

/// Bytes per lookback window, and the most a single segment can hold.
pub const SEGMENT_BYTES: usize = 8192;
/// Bytes per payload word.
pub const WORD_BYTES: usize = 2;
/// Flagged payload word that ends a segment and advances the window base.
pub const TERMINATOR: u16 = 0xFFFF;
/// Shortest run a match command can encode, in bytes.
pub const MIN_MATCH_BYTES: usize = 4;
/// Longest run a match command can encode, in bytes.
pub const MAX_MATCH_BYTES: usize = 18;
/// Serialized size of one face record.
pub const FACE_RECORD_BYTES: usize = 12;
/// Serialized size of one packed vertex.
pub const VERTEX_RECORD_BYTES: usize = 4;

/// The size fields at the start of a compressed block.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BlockHeader {
    /// serialized bitfield size in bytes, always a whole number of 32-bit words
    pub bitfield_bytes: u32,
    /// size of the decompressed data
    pub full_size: u32,
}
impl BlockHeader {
    /// Serialized size of the header itself.
    pub const SIZE: usize = 8;

    /// Parse a block header from the front of `raw`.
    pub(crate) fn from_bytes(raw: &[u8]) -> Result<Self, PakError> {
        if raw.len() < Self::SIZE {
            return Err(PakError::Truncated("block header"));
        }
        Ok(Self {
            bitfield_bytes: u32::from_le_bytes(raw[0..4].try_into().unwrap()),
            full_size: u32::from_le_bytes(raw[4..8].try_into().unwrap()),
        })
    }

    pub(crate) fn to_bytes(self) -> [u8; Self::SIZE] {
        let mut out = [0; Self::SIZE];
        out[0..4].copy_from_slice(&self.bitfield_bytes.to_le_bytes());
        out[4..8].copy_from_slice(&self.full_size.to_le_bytes());
        out
    }
}

/// Valid mesh slot strides.
///
/// `Compact` slots hold the three core array offsets, while `Extended` slots
/// carry two further offsets (shadow and color arrays) that repacking reads
/// and writes back unchanged.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SlotLayout {
    Compact,
    Extended,
}

impl SlotLayout {
    /// Distance between consecutive slots in a directory, in bytes.
    pub const fn stride(self) -> usize {
        match self {
            Self::Compact => 16,
            Self::Extended => 24,
        }
    }

    const fn extra_offsets(self) -> usize {
        match self {
            Self::Compact => 0,
            Self::Extended => 2,
        }
    }
}

impl fmt::Display for SlotLayout {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Self::Compact => write!(f, "16-byte slots"),
            Self::Extended => write!(f, "24-byte slots"),
        }
    }
}

/// One parsed mesh slot header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MeshSlot {
    pub tri_count: u8,
    pub quad_count: u8,
    pub vert_count: u8,
    /// byte 3 of the slot, not interpreted here
    pub reserved: u8,
    pub tri_ofs: u32,
    pub quad_ofs: u32,
    pub vert_ofs: u32,
    /// shadow and color offsets for [`SlotLayout::Extended`] slots, else empty
    pub extra_ofs: SmallVec<[u32; 2]>,
}
impl MeshSlot {
    /// Parse the slot starting at byte `ofs` of `blob`.
    pub fn read(blob: &[u8], ofs: usize, layout: SlotLayout) -> Result<Self, PakError> {
        let raw = blob
            .get(ofs..ofs + layout.stride())
            .ok_or(PakError::BlobOverflow {
                end: ofs + layout.stride(),
                capacity: blob.len(),
            })?;
        let word = |at: usize| u32::from_le_bytes(raw[at..at + 4].try_into().unwrap());
        let extra_ofs = (0..layout.extra_offsets()).map(|n| word(16 + 4 * n)).collect();

        Ok(Self {
            tri_count: raw[0],
            quad_count: raw[1],
            vert_count: raw[2],
            reserved: raw[3],
            tri_ofs: word(4),
            quad_ofs: word(8),
            vert_ofs: word(12),
            extra_ofs,
        })
    }

    /// Write `self` back over the slot starting at byte `ofs`.
    pub fn write(&self, blob: &mut [u8], ofs: usize) -> Result<(), PakError> {
        let capacity = blob.len();
        let raw = blob
            .get_mut(ofs..ofs + self.layout().stride())
            .ok_or(PakError::BlobOverflow {
                end: ofs + self.layout().stride(),
                capacity,
            })?;

        raw[0] = self.tri_count;
        raw[1] = self.quad_count;
        raw[2] = self.vert_count;
        raw[3] = self.reserved;
        raw[4..8].copy_from_slice(&self.tri_ofs.to_le_bytes());
        raw[8..12].copy_from_slice(&self.quad_ofs.to_le_bytes());
        raw[12..16].copy_from_slice(&self.vert_ofs.to_le_bytes());
        for (n, extra) in self.extra_ofs.iter().enumerate() {
            raw[16 + 4 * n..20 + 4 * n].copy_from_slice(&extra.to_le_bytes());
        }

        Ok(())
    }

    /// The stride implied by the parsed extra offsets.
    pub fn layout(&self) -> SlotLayout {
        if self.extra_ofs.is_empty() {
            SlotLayout::Compact
        } else {
            SlotLayout::Extended
        }
    }
}
