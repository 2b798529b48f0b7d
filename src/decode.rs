use crate::{
    errors::PakError,
    format::{BlockHeader, SEGMENT_BYTES, TERMINATOR, WORD_BYTES},
};
use bitstream_io::{BigEndian, BitReader};
use std::io::{Cursor, Write};

type LogWtr<'a> = &'a mut dyn Write;

/// Specify the decoding settings, such as logging and input.
///
/// To create a new `Decoder`, use [`for_bytes()`]. Then, change any of the
/// decoder settings. Finally, decode the block with [`decode()`].
/// ```
/// # use segpak::{Encoder, Decoder};
/// let original = b"ABBAABBAABBAABBA";
/// let compressed = Encoder::for_bytes(original)
///     .encode_to_vec()
///     .unwrap();
/// let decompressed = Decoder::for_bytes(&compressed)
///     .decode()
///     .unwrap();
/// assert_eq!(&original[..], decompressed);
/// ```
/// You can use a `Decoder` to get the [`BlockHeader`] with [`header()`]:
/// ```
/// # use segpak::{Encoder, Decoder};
/// # let original = b"ABBAABBAABBAABBA";
/// # let compressed = Encoder::for_bytes(original).encode_to_vec().unwrap();
/// let mut decoder = Decoder::for_bytes(&compressed);
/// let size = decoder.header().unwrap().full_size as usize;
/// assert_eq!(size, original.len());
/// ```
/// [`for_bytes()`]: Decoder::for_bytes
/// [`decode()`]: Decoder::decode
/// [`header()`]: Decoder::header
pub struct Decoder<'a> {
    src: &'a [u8],
    log: Option<LogWtr<'a>>,
    header: Option<BlockHeader>,
}

impl<'a> Decoder<'a> {
    #[inline]
    pub fn for_bytes(bytes: &'a [u8]) -> Self {
        Self {
            src: bytes,
            log: None,
            header: None,
        }
    }

    #[inline]
    pub fn with_logging<W: Write>(&mut self, wtr: &'a mut W) -> &mut Self {
        self.log = Some(wtr as LogWtr);
        self
    }

    /// The size fields from the front of the block, read once and cached.
    #[inline]
    pub fn header(&mut self) -> Result<BlockHeader, PakError> {
        if let Some(header) = self.header {
            Ok(header)
        } else {
            let header = BlockHeader::from_bytes(self.src)?;
            self.header = Some(header);
            Ok(header)
        }
    }

    #[inline]
    pub fn decode(&mut self) -> Result<Vec<u8>, PakError> {
        do_decode(self)
    }
}

/// Decompress a self-describing block into a `Vec<u8>`
///
/// This is a convenience function to decode a block without having to set
/// up a [`Decoder`]
pub fn decompress(block: &[u8]) -> Result<Vec<u8>, PakError> {
    Decoder::for_bytes(block).decode()
}

/// Decompress from a raw bitfield and payload, without the block container.
///
/// Callers that keep the two parts in reserved windows of a larger file know
/// the decompressed size from elsewhere; pass it as `full_size`.
pub fn decompress_parts(
    bitfield: &[u8],
    payload: &[u8],
    full_size: usize,
) -> Result<Vec<u8>, PakError> {
    run_decode(bitfield, payload, full_size, &mut None)
}

fn do_decode(opt: &mut Decoder) -> Result<Vec<u8>, PakError> {
    let header = opt.header()?;
    let Decoder { src, log, .. } = opt;

    let bitfield_end = BlockHeader::SIZE + header.bitfield_bytes as usize;
    if src.len() < bitfield_end {
        return Err(PakError::Truncated("bitfield"));
    }
    let bitfield = &src[BlockHeader::SIZE..bitfield_end];
    let payload = &src[bitfield_end..];

    if let Some(wtr) = log.as_mut() {
        writeln!(wtr, "# Header\n{:?}", &header)?;
    }

    run_decode(bitfield, payload, header.full_size as usize, log)
}

fn run_decode(
    bitfield: &[u8],
    payload: &[u8],
    full_size: usize,
    log: &mut Option<&mut dyn Write>,
) -> Result<Vec<u8>, PakError> {
    let mut flags = BitReader::endian(Cursor::new(bitfield), BigEndian);
    let mut words = payload
        .chunks_exact(WORD_BYTES)
        .map(|w| u16::from_le_bytes([w[0], w[1]]));

    let mut output: Vec<u8> = Vec::with_capacity(full_size);
    let mut window_base = 0;

    while output.len() < full_size {
        let flagged = flags.read_bit()?;
        let word = words.next().ok_or(PakError::Truncated("payload"))?;

        if !flagged {
            if output.len() + WORD_BYTES > full_size {
                return Err(PakError::LengthOverrun { declared: full_size });
            }
            if let Some(wtr) = log.as_mut() {
                writeln!(wtr, "{:04x} - literal: {:04x}", output.len(), word)?;
            }
            output.extend_from_slice(&word.to_le_bytes());
        } else if word == TERMINATOR {
            // flagged all-ones word: no copy, just slide the window forward
            window_base += SEGMENT_BYTES;
            if let Some(wtr) = log.as_mut() {
                writeln!(wtr, "---- - window base now {:#06x}", window_base)?;
            }
        } else {
            let distance = (word >> 3) as usize;
            let size = ((word & 0x7) as usize + 2) * WORD_BYTES;
            let start = window_base + distance;

            if start >= output.len() {
                return Err(PakError::BadLookback {
                    src: start,
                    written: output.len(),
                });
            }
            if output.len() + size > full_size {
                return Err(PakError::LengthOverrun { declared: full_size });
            }
            if let Some(wtr) = log.as_mut() {
                writeln!(
                    wtr,
                    "{:04x} - match: {} bytes from {:04x}",
                    output.len(),
                    size,
                    start
                )?;
            }

            // byte at a time so a run may overlap its own output
            for i in start..start + size {
                let byte = output[i];
                output.push(byte);
            }
        }
    }

    Ok(output)
}
