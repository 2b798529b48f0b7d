//! The match sweep that turns one segment into positioned commands.

use std::io::Write;

use crate::{
    errors::PakError,
    format::{MAX_MATCH_BYTES, MIN_MATCH_BYTES, WORD_BYTES},
};

/// Configure the match sweep that drives segment compression.
///
/// A sweep scans the segment for repeated runs from `max_match` down to
/// `min_match` bytes, claiming the longest runs first; every word left
/// unclaimed becomes a literal. `skip_matches` discards that many acceptable
/// matches before claiming any, degrading compression in a controlled way.
///
/// The numbered presets from [`level`](MatchSettings::level) step the sweep
/// down in fixed stages:
///
/// | Level | Max Match | Min Match | Skipped Matches |
/// | :---: | :-------: | :-------: | :-------------: |
/// | 1     | 18        | 4         | 0               |
/// | 2     | 16        | 4         | 0               |
/// | 3     | 12        | 4         | 0               |
/// | 4     | 8         | 4         | 0               |
/// | 5     | 8         | 4         | 8               |
///
/// Most data packs fine at level 1; the weaker presets are for the odd asset
/// that misbehaves at full strength.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct MatchSettings {
    /// longest run a match may claim, in bytes
    pub max_match: usize,
    /// shortest run worth a match command, in bytes
    pub min_match: usize,
    /// acceptable matches to discard before claiming any
    pub skip_matches: usize,
}

impl MatchSettings {
    pub const fn new(max_match: usize, min_match: usize, skip_matches: usize) -> Self {
        Self {
            max_match,
            min_match,
            skip_matches,
        }
    }

    /// Look up a numbered degradation preset. Out-of-range levels clamp to
    /// the nearest entry of the table.
    pub fn level(level: u8) -> Self {
        LEVELS[(level.clamp(1, 5) - 1) as usize]
    }

    /// Clamp the run bounds to encodable, word-aligned sizes.
    fn normalized(self) -> Self {
        let max_match = self.max_match.clamp(MIN_MATCH_BYTES, MAX_MATCH_BYTES) & !1;
        let min_match = self.min_match.clamp(MIN_MATCH_BYTES, max_match) & !1;
        Self {
            max_match,
            min_match,
            skip_matches: self.skip_matches,
        }
    }
}

impl Default for MatchSettings {
    fn default() -> Self {
        LEVELS[0]
    }
}

const LEVELS: [MatchSettings; 5] = [
    MatchSettings::new(18, 4, 0),
    MatchSettings::new(16, 4, 0),
    MatchSettings::new(12, 4, 0),
    MatchSettings::new(8, 4, 0),
    MatchSettings::new(8, 4, 8),
];

/// One positioned compression token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Command {
    /// pass the word at `ofs` through untouched
    Literal { ofs: usize, word: u16 },
    /// copy `words` words starting `distance` bytes past the window base
    Match {
        ofs: usize,
        distance: usize,
        words: usize,
    },
}

impl Command {
    pub(crate) fn ofs(&self) -> usize {
        match self {
            Self::Literal { ofs, .. } | Self::Match { ofs, .. } => *ofs,
        }
    }

    /// Segment bytes this command reproduces.
    pub(crate) fn byte_len(&self) -> usize {
        match self {
            Self::Literal { .. } => WORD_BYTES,
            Self::Match { words, .. } => words * WORD_BYTES,
        }
    }

    pub(crate) fn is_match(&self) -> bool {
        matches!(self, Self::Match { .. })
    }

    /// The 16-bit payload word for this command.
    pub(crate) fn payload_word(&self) -> u16 {
        match *self {
            Self::Literal { word, .. } => word,
            Self::Match {
                distance, words, ..
            } => ((distance as u16) << 3) | (words as u16 - 2),
        }
    }
}

/// Sweep `seg` for repeated runs and tile it with commands.
///
/// Runs are claimed longest first, left to right, over a per-word claim map;
/// a candidate is only acceptable while every word it covers is unclaimed.
/// Unclaimed words become literals, and the sorted result is checked to
/// cover the segment exactly before it is returned.
pub(crate) fn find_commands(
    seg: &[u8],
    settings: MatchSettings,
    log: &mut Option<&mut dyn Write>,
) -> Result<Vec<Command>, PakError> {
    debug_assert!(seg.len() % WORD_BYTES == 0);

    let MatchSettings {
        max_match,
        min_match,
        mut skip_matches,
    } = settings.normalized();

    let words = seg.len() / WORD_BYTES;
    let mut claimed = vec![false; words];
    let mut cmds = Vec::with_capacity(words / 2);

    let mut len = max_match.min(seg.len());
    while len >= min_match {
        let mut ofs = 0;
        while ofs + len <= seg.len() {
            let covered = ofs / WORD_BYTES..(ofs + len) / WORD_BYTES;
            if claimed[covered.clone()].iter().any(|&used| used) {
                ofs += WORD_BYTES;
                continue;
            }
            if let Some(distance) = find_run(seg, ofs, len) {
                if skip_matches > 0 {
                    skip_matches -= 1;
                } else {
                    if let Some(wtr) = log {
                        writeln!(wtr, "{:04x} - {} byte match from {:04x}", ofs, len, distance)?;
                    }
                    claimed[covered].fill(true);
                    cmds.push(Command::Match {
                        ofs,
                        distance,
                        words: len / WORD_BYTES,
                    });
                }
            }
            ofs += WORD_BYTES;
        }
        len -= WORD_BYTES;
    }

    for (word, &used) in claimed.iter().enumerate() {
        if !used {
            let ofs = word * WORD_BYTES;
            cmds.push(Command::Literal {
                ofs,
                word: u16::from_le_bytes([seg[ofs], seg[ofs + 1]]),
            });
        }
    }

    cmds.sort_unstable_by_key(Command::ofs);
    check_tiling(&cmds, seg.len())?;

    Ok(cmds)
}

/// Leftmost word-aligned source for the `len` byte run at `ofs`.
///
/// A source run must sit wholly inside the first `ofs` bytes, so a command
/// never copies data it is itself in the middle of producing. Word alignment
/// keeps the encoded distance even, which is what frees up `0xFFFF` as the
/// segment terminator.
fn find_run(seg: &[u8], ofs: usize, len: usize) -> Option<usize> {
    if len > ofs {
        return None;
    }
    let run = &seg[ofs..ofs + len];
    (0..=ofs - len)
        .step_by(WORD_BYTES)
        .find(|&src| &seg[src..src + len] == run)
}

/// Sorted commands must cover the segment exactly: no gaps, no overlap.
fn check_tiling(cmds: &[Command], seg_len: usize) -> Result<(), PakError> {
    let mut next = 0;
    for cmd in cmds {
        if cmd.ofs() != next {
            return Err(PakError::SegmentTiling {
                expected: next,
                found: cmd.ofs(),
            });
        }
        next += cmd.byte_len();
    }
    if next != seg_len {
        return Err(PakError::SegmentTiling {
            expected: seg_len,
            found: next,
        });
    }

    Ok(())
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn repeated_half_claims_one_match() {
        let seg = [1, 2, 3, 4, 5, 6, 7, 8, 1, 2, 3, 4, 5, 6, 7, 8];
        let cmds = find_commands(&seg, MatchSettings::default(), &mut None).unwrap();
        assert_eq!(
            cmds,
            vec![
                Command::Literal { ofs: 0, word: 0x0201 },
                Command::Literal { ofs: 2, word: 0x0403 },
                Command::Literal { ofs: 4, word: 0x0605 },
                Command::Literal { ofs: 6, word: 0x0807 },
                Command::Match {
                    ofs: 8,
                    distance: 0,
                    words: 4
                },
            ]
        );
        assert_eq!(cmds[4].payload_word(), 0x0002);
    }

    #[test]
    fn skipping_discards_every_match() {
        let seg = [1, 2, 3, 4, 5, 6, 7, 8, 1, 2, 3, 4, 5, 6, 7, 8];
        let settings = MatchSettings {
            skip_matches: 8,
            ..MatchSettings::default()
        };
        let cmds = find_commands(&seg, settings, &mut None).unwrap();
        assert_eq!(cmds.len(), 8);
        assert!(cmds.iter().all(|cmd| !cmd.is_match()));
    }

    #[test]
    fn unique_words_yield_all_literals() {
        let seg: Vec<u8> = (0u16..32).flat_map(|w| w.to_le_bytes()).collect();
        let cmds = find_commands(&seg, MatchSettings::default(), &mut None).unwrap();
        assert_eq!(cmds.len(), 32);
        assert!(cmds.iter().all(|cmd| !cmd.is_match()));
    }

    #[test]
    fn overlapping_commands_fail_the_tiling_check() {
        let cmds = [
            Command::Literal { ofs: 0, word: 0 },
            Command::Match {
                ofs: 2,
                distance: 0,
                words: 3,
            },
            Command::Literal { ofs: 6, word: 0 },
        ];
        let res = check_tiling(&cmds, 10);
        assert!(matches!(
            res,
            Err(PakError::SegmentTiling {
                expected: 8,
                found: 6
            })
        ));
    }

    #[test]
    fn short_cover_fails_the_tiling_check() {
        let cmds = [Command::Literal { ofs: 0, word: 0 }];
        let res = check_tiling(&cmds, 6);
        assert!(matches!(
            res,
            Err(PakError::SegmentTiling {
                expected: 6,
                found: 2
            })
        ));
    }

    #[test]
    fn presets_weaken_with_level() {
        assert_eq!(MatchSettings::level(1), MatchSettings::default());
        assert_eq!(MatchSettings::level(3).max_match, 12);
        assert_eq!(MatchSettings::level(5).skip_matches, 8);
        // out-of-range levels clamp instead of failing
        assert_eq!(MatchSettings::level(0), MatchSettings::level(1));
        assert_eq!(MatchSettings::level(9), MatchSettings::level(5));
    }
}
