use crate::{
    bitfield::Bitfield,
    errors::PakError,
    format::{BlockHeader, SEGMENT_BYTES, TERMINATOR, WORD_BYTES},
};
use std::{
    fs::File,
    io::{BufWriter, Cursor, Write},
    path::Path,
};

mod sweep;

pub use self::sweep::MatchSettings;

type LogWtr<'a> = &'a mut dyn Write;

/// Specify the compression settings, such as degradation level, logging,
/// and output.
///
/// To create a new `Encoder`, use [`for_bytes()`]. Then, change any of the
/// sweep settings with `Encoder`'s helper methods. Finally, compress the
/// input into a self-describing block with [`encode_to_writer()`],
/// [`encode_to_file()`], or [`encode_to_vec()`].
/// ```
/// # use segpak::Encoder;
/// let input = b"ABBAABBAABBAABBA";
/// let compressed = Encoder::for_bytes(input)
///     .level(2)
///     .with_logging(&mut ::std::io::stdout())
///     .encode_to_vec();
/// ```
///
/// The default settings are the level 1 sweep ([`MatchSettings::default`]),
/// which claims the longest matches the format can encode, and no logging.
///
/// [`for_bytes()`]: Encoder::for_bytes
/// [`encode_to_writer()`]: Encoder::encode_to_writer
/// [`encode_to_file()`]: Encoder::encode_to_file
/// [`encode_to_vec()`]: Encoder::encode_to_vec
pub struct Encoder<'a> {
    src: &'a [u8],
    settings: MatchSettings,
    log: Option<LogWtr<'a>>,
}

impl<'a> Encoder<'a> {
    /// Create a new `Encoder` for the data in the `bytes` slice.
    #[inline]
    pub fn for_bytes(bytes: &'a [u8]) -> Self {
        Self {
            src: bytes,
            settings: MatchSettings::default(),
            log: None,
        }
    }

    /// Set the settings for the underlying match sweep. See [`MatchSettings`]
    /// for more details.
    #[inline]
    pub fn with_settings(&mut self, settings: MatchSettings) -> &mut Self {
        self.settings = settings;
        self
    }

    /// Convenience method to pick a numbered degradation preset without
    /// importing [`MatchSettings`]. See [`MatchSettings::level`].
    #[inline]
    pub fn level(&mut self, level: u8) -> &mut Self {
        self.settings = MatchSettings::level(level);
        self
    }

    /// Write debugging and diagnostic information to `log` while the input
    /// is being compressed.
    #[inline]
    pub fn with_logging<L: Write>(&mut self, log: &'a mut L) -> &mut Self {
        self.log = Some(log as LogWtr);
        self
    }

    /// Start the compression and write the block out to `wtr`
    #[inline]
    pub fn encode_to_writer<W: Write>(&mut self, wtr: W) -> Result<(), PakError> {
        do_encode(self, wtr)
    }

    /// Start the compression and write the block out to the newly created
    /// `File` `f`
    #[inline]
    pub fn encode_to_file<P: AsRef<Path>>(&mut self, f: P) -> Result<(), PakError> {
        let wtr = BufWriter::new(File::create(f)?);
        self.encode_to_writer(wtr)
    }

    /// Start the compression and return the block in a `Vec<u8>`.
    #[inline]
    pub fn encode_to_vec(&mut self) -> Result<Vec<u8>, PakError> {
        let data = Vec::new();
        let mut csr = Cursor::new(data);
        self.encode_to_writer(&mut csr).map(|_| csr.into_inner())
    }
}

/// Compress data into a self-describing block `Vec<u8>`
///
/// This is a convenience function to compress a byte slice without having
/// to import and set up an [`Encoder`].
pub fn compress(src: &[u8], settings: MatchSettings) -> Result<Vec<u8>, PakError> {
    Encoder::for_bytes(src)
        .with_settings(settings)
        .encode_to_vec()
}

/// Compress a single segment into its flag bits and payload words.
///
/// This is the engine underneath [`Encoder`], exposed for callers that pack
/// segments into containers of their own (texture pages keep per-segment
/// bitfields in reserved windows, for one). `seg` must be an even number of
/// bytes, at most [`SEGMENT_BYTES`] long. The returned payload ends with the
/// [`TERMINATOR`] word, and the bitfield with that word's set flag bit.
pub fn compress_segment(
    seg: &[u8],
    settings: MatchSettings,
) -> Result<(Bitfield, Vec<u16>), PakError> {
    if seg.len() % WORD_BYTES != 0 {
        return Err(PakError::OddLength(seg.len()));
    }
    if seg.len() > SEGMENT_BYTES {
        return Err(PakError::SegmentTooLong(seg.len()));
    }

    let mut bits = Bitfield::with_capacity(seg.len() / WORD_BYTES + 1);
    let mut payload = Vec::with_capacity(seg.len() / WORD_BYTES + 1);
    append_segment(seg, settings, &mut bits, &mut payload, &mut None)?;

    Ok((bits, payload))
}

fn do_encode<W: Write>(opts: &mut Encoder<'_>, mut wtr: W) -> Result<(), PakError> {
    let Encoder { src, settings, log } = opts;

    if src.len() % WORD_BYTES != 0 {
        return Err(PakError::OddLength(src.len()));
    }

    let segments = src.len() / SEGMENT_BYTES + 1;
    let mut bits = Bitfield::with_capacity(src.len() / WORD_BYTES + segments);
    let mut payload = Vec::with_capacity(src.len() / WORD_BYTES + segments);

    for seg in src.chunks(SEGMENT_BYTES) {
        append_segment(seg, *settings, &mut bits, &mut payload, log)?;
    }

    write_block(&mut wtr, src.len(), &bits, &payload)
}

/// Sweep one segment and append its commands, closed off by the terminator.
fn append_segment(
    seg: &[u8],
    settings: MatchSettings,
    bits: &mut Bitfield,
    payload: &mut Vec<u16>,
    log: &mut Option<&mut dyn Write>,
) -> Result<(), PakError> {
    let cmds = sweep::find_commands(seg, settings, log)?;

    for cmd in &cmds {
        bits.push(cmd.is_match());
        payload.push(cmd.payload_word());
    }
    // every segment's commands end with a flagged terminator word
    bits.push(true);
    payload.push(TERMINATOR);

    Ok(())
}

fn write_block(
    wtr: &mut dyn Write,
    full_size: usize,
    bits: &Bitfield,
    payload: &[u16],
) -> Result<(), PakError> {
    let header = BlockHeader {
        bitfield_bytes: bits.byte_len().try_into()?,
        full_size: full_size.try_into()?,
    };

    wtr.write_all(&header.to_bytes())?;
    wtr.write_all(&bits.to_bytes()?)?;
    for word in payload {
        wtr.write_all(&word.to_le_bytes())?;
    }

    Ok(())
}
