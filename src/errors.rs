use std::io;
use std::num::TryFromIntError;
use thiserror::Error;

/// Possible errors that arise from compressing or unpacking scene data, or
/// from rewriting mesh slots inside a scene blob. The target hardware has no
/// recovery path for malformed assets, so every variant is fatal to the
/// operation that raised it.
#[derive(Debug, Error)]
pub enum PakError {
    /// Segment data must be a whole number of 16-bit words.
    #[error("data length {0} is odd; segment data is a run of 16-bit words")]
    OddLength(usize),

    /// A single segment cannot exceed the hardware lookback window.
    #[error("segment of {0} bytes exceeds the 8192 byte window")]
    SegmentTooLong(usize),

    /// The match sweep produced commands that do not exactly cover the segment.
    #[error("commands do not tile segment: expected next offset {expected:#x}, found {found:#x}")]
    SegmentTiling { expected: usize, found: usize },

    /// A match command referenced data the decompressor has not written yet.
    #[error("match source {src:#x} is ahead of the {written:#x} bytes written so far")]
    BadLookback { src: usize, written: usize },

    /// A command would write past the size declared in the block header.
    #[error("command writes past the declared size of {declared} bytes")]
    LengthOverrun { declared: usize },

    /// The compressed stream ended before the declared output was produced.
    #[error("compressed block truncated in {0}")]
    Truncated(&'static str),

    /// Faces are triangles or quads, nothing else.
    #[error("a face must have 3 or 4 corners, found {0}")]
    FaceArity(usize),

    /// A mesh array outgrew the one-byte count field in its slot header.
    #[error("{what} count {count} does not fit the one-byte slot field")]
    CountOverflow { what: &'static str, count: usize },

    /// A write would land past the end of the fixed-capacity blob.
    #[error("write ends at {end:#x}, past blob capacity {capacity:#x}")]
    BlobOverflow { end: usize, capacity: usize },

    /// A byte that should have been released as zero wasn't.
    #[error("byte at {0:#x} should be cleared but is not zero")]
    DirtyByte(usize),

    /// Input too large for the u32 size fields of a block header.
    #[error("{0}")]
    TooBig(#[from] TryFromIntError),

    #[error("{0}")]
    Io(#[from] io::Error),
}
