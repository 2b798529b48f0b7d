//! Free-space bookkeeping for a fixed-capacity blob.
//!
//! Repacking reuses the holes left behind by released arrays before it
//! grows the blob's content. The free set stays sorted ascending by
//! capacity, so an acquire takes the snuggest hole that fits and only
//! falls back to the tail cursor when nothing does.

use crate::errors::PakError;
use log::trace;

/// A free byte interval, end exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Span {
    pub start: usize,
    pub end: usize,
}

impl Span {
    pub fn new(start: usize, end: usize) -> Self {
        debug_assert!(end > start);
        Self { start, end }
    }

    pub const fn len(&self) -> usize {
        self.end - self.start
    }

    pub const fn is_empty(&self) -> bool {
        self.end <= self.start
    }
}

/// Tracks the free spans and content end of one blob.
///
/// `content_end` is the first byte past all live data; everything from there
/// to the blob's capacity is untouched tail. The allocator never reads the
/// blob itself outside [`check_cleared`](Allocator::check_cleared), so
/// callers zero bytes as they release them.
#[derive(Debug, Clone, Default)]
pub struct Allocator {
    /// ascending by capacity
    free: Vec<Span>,
    content_end: usize,
}

impl Allocator {
    /// An allocator whose live data ends at `content_end`, with no holes.
    pub fn new(content_end: usize) -> Self {
        Self {
            free: Vec::new(),
            content_end,
        }
    }

    /// First byte past all live data. Never decreases.
    pub fn content_end(&self) -> usize {
        self.content_end
    }

    /// The current holes, ascending by capacity.
    pub fn free_spans(&self) -> &[Span] {
        &self.free
    }

    /// Return `span` to the free set, merging with at most one neighbor.
    ///
    /// Merging is single-step: a span adjacent to holes on both sides joins
    /// only one of them, and the holes meet up on some later release.
    pub fn release(&mut self, span: Span) {
        trace!("release {} bytes at {:#x}", span.len(), span.start);
        if let Some(before) = self.free.iter_mut().find(|f| f.end == span.start) {
            before.end = span.end;
        } else if let Some(after) = self.free.iter_mut().find(|f| f.start == span.end) {
            after.start = span.start;
        } else {
            self.free.push(span);
        }
        self.free.sort_unstable_by_key(Span::len);
    }

    /// Take `len` bytes from the snuggest hole that fits, or from freshly
    /// grown tail. Returns the starting offset.
    pub fn acquire(&mut self, len: usize) -> usize {
        if len == 0 {
            return self.content_end;
        }
        if let Some(at) = self.free.iter().position(|f| f.len() >= len) {
            let start = self.free[at].start;
            self.free[at].start += len;
            if self.free[at].is_empty() {
                self.free.remove(at);
            }
            self.free.sort_unstable_by_key(Span::len);
            trace!("acquire {} bytes at {:#x} from a hole", len, start);
            start
        } else {
            let start = self.content_end;
            self.content_end += len;
            trace!(
                "acquire {} bytes at {:#x}, content end now {:#x}",
                len,
                start,
                self.content_end
            );
            start
        }
    }

    /// Verify that every free byte, and the whole tail past `content_end`,
    /// reads back zero.
    pub fn check_cleared(&self, blob: &[u8]) -> Result<(), PakError> {
        if self.content_end > blob.len() {
            return Err(PakError::BlobOverflow {
                end: self.content_end,
                capacity: blob.len(),
            });
        }
        for span in &self.free {
            let hole = blob
                .get(span.start..span.end)
                .ok_or(PakError::BlobOverflow {
                    end: span.end,
                    capacity: blob.len(),
                })?;
            if let Some(at) = hole.iter().position(|&b| b != 0) {
                return Err(PakError::DirtyByte(span.start + at));
            }
        }
        if let Some(at) = blob[self.content_end..].iter().position(|&b| b != 0) {
            return Err(PakError::DirtyByte(self.content_end + at));
        }

        Ok(())
    }
}
