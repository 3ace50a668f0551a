//! Bounds-checked write cursor over a caller-owned buffer.
//!
//! The cursor holds offsets, never pointers. Base is always offset 0 of the
//! slice it guards; `limit` is the slice length. Once an advance would move
//! past `limit` the cursor latches into [`Position::Invalid`] and stays there.

use std::ops::Range;

/// Alignment of every record boundary, in bytes.
pub const ALIGNTO: usize = 4;

/// Round `len` up to the next [`ALIGNTO`] boundary.
#[inline]
pub const fn align(len: usize) -> usize {
    (len + ALIGNTO - 1) & !(ALIGNTO - 1)
}

/// Like [`align`], but `None` instead of wrapping for lengths near
/// `usize::MAX`.
#[inline]
pub const fn checked_align(len: usize) -> Option<usize> {
    match len.checked_add(ALIGNTO - 1) {
        Some(n) => Some(n & !(ALIGNTO - 1)),
        None => None,
    }
}

/// Cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Next write goes at this offset.
    At(usize),
    /// An earlier operation would have overrun the buffer.
    Invalid,
}

/// Write cursor: a position and the limit it must not pass.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Cursor {
    pos: Position,
    limit: usize,
}

impl Cursor {
    /// Create a cursor at `start` over `limit` bytes.
    ///
    /// A start beyond the limit yields an invalid cursor.
    pub fn new(start: usize, limit: usize) -> Self {
        let pos = if start <= limit {
            Position::At(start)
        } else {
            Position::Invalid
        };
        Self { pos, limit }
    }

    /// Claim the next `n` bytes and return their range.
    ///
    /// Fails, and invalidates the cursor, if the cursor is already invalid,
    /// if `offset + n` wraps, or if it lands past the limit.
    pub fn advance(&mut self, n: usize) -> Option<Range<usize>> {
        let Position::At(start) = self.pos else {
            return None;
        };
        match start.checked_add(n) {
            Some(end) if end <= self.limit => {
                self.pos = Position::At(end);
                Some(start..end)
            }
            _ => {
                self.pos = Position::Invalid;
                None
            }
        }
    }

    /// Bytes left before the limit, 0 once invalid.
    pub fn remaining(&self) -> usize {
        match self.pos {
            Position::At(off) => self.limit - off,
            Position::Invalid => 0,
        }
    }

    /// Current offset, if still valid.
    pub fn offset(&self) -> Option<usize> {
        match self.pos {
            Position::At(off) => Some(off),
            Position::Invalid => None,
        }
    }

    /// Limit this cursor was created with.
    pub fn limit(&self) -> usize {
        self.limit
    }

    /// Check whether the cursor is still usable.
    pub fn is_valid(&self) -> bool {
        matches!(self.pos, Position::At(_))
    }

    /// Latch the cursor into the invalid state.
    pub fn invalidate(&mut self) {
        self.pos = Position::Invalid;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_align() {
        assert_eq!(align(0), 0);
        assert_eq!(align(1), 4);
        assert_eq!(align(4), 4);
        assert_eq!(align(7), 8);
        assert_eq!(checked_align(usize::MAX), None);
        assert_eq!(checked_align(usize::MAX - 3), Some(usize::MAX - 3));
    }

    #[test]
    fn test_advance_within_limit() {
        let mut c = Cursor::new(0, 16);
        assert_eq!(c.advance(4), Some(0..4));
        assert_eq!(c.advance(12), Some(4..16));
        assert_eq!(c.remaining(), 0);
        assert!(c.is_valid());
        // Zero-length advance at the limit is fine.
        assert_eq!(c.advance(0), Some(16..16));
    }

    #[test]
    fn test_overrun_latches() {
        let mut c = Cursor::new(0, 8);
        assert!(c.advance(9).is_none());
        assert!(!c.is_valid());
        assert_eq!(c.remaining(), 0);
        assert_eq!(c.offset(), None);
        assert!(c.advance(0).is_none());
    }

    #[test]
    fn test_wraparound_rejected() {
        let mut c = Cursor::new(8, 16);
        assert!(c.advance(usize::MAX).is_none());
        assert!(!c.is_valid());
    }

    #[test]
    fn test_start_past_limit() {
        let c = Cursor::new(20, 16);
        assert!(!c.is_valid());
        assert_eq!(c.limit(), 16);
    }
}
