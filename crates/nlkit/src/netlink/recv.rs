//! Growable receive buffer for netlink datagrams.
//!
//! Holds received bytes and a read offset. When a datagram does not fit,
//! [`RecvBuf::grow`] moves only the unconsumed tail into a larger buffer and
//! rebinds the read offset to 0. The swap happens behind `&mut self`, so no
//! parsed view of the old buffer can survive it.

use bytes::BytesMut;

use super::message::MessageIter;
use crate::error::{Error, Result};

/// Default receive buffer size.
pub const DEFAULT_RECV_BUF: usize = 32 * 1024;

/// Ceiling for receive buffer growth.
pub const MAX_RECV_BUF: usize = 1024 * 1024;

/// Receive buffer: filled region `[rd, len)` plus spare capacity.
#[derive(Debug)]
pub struct RecvBuf {
    buf: BytesMut,
    rd: usize,
    max: usize,
}

impl Default for RecvBuf {
    fn default() -> Self {
        Self::new()
    }
}

impl RecvBuf {
    /// Create a buffer with the default limits.
    pub fn new() -> Self {
        Self::with_limits(DEFAULT_RECV_BUF, MAX_RECV_BUF)
    }

    /// Create a buffer of `initial` bytes that may grow up to `max`.
    pub fn with_limits(initial: usize, max: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(initial.min(max)),
            rd: 0,
            max,
        }
    }

    /// Received bytes not yet consumed.
    pub fn pending(&self) -> &[u8] {
        &self.buf[self.rd..]
    }

    /// Iterate the netlink messages in the pending bytes.
    pub fn messages(&self) -> MessageIter<'_> {
        MessageIter::new(self.pending())
    }

    /// Mark `n` pending bytes as consumed.
    pub fn consume(&mut self, n: usize) {
        self.rd = self.rd.saturating_add(n).min(self.buf.len());
        if self.rd == self.buf.len() {
            self.clear();
        }
    }

    /// Drop all pending bytes, keeping the allocation.
    pub fn clear(&mut self) {
        self.buf.clear();
        self.rd = 0;
    }

    /// Current allocation size.
    pub fn capacity(&self) -> usize {
        self.buf.capacity()
    }

    /// Free bytes after the filled region.
    pub fn spare(&self) -> usize {
        self.buf.capacity() - self.buf.len()
    }

    /// Ensure at least `n` spare bytes, growing if needed.
    pub fn reserve(&mut self, n: usize) -> Result<()> {
        if self.spare() >= n {
            return Ok(());
        }
        self.grow(n)
    }

    /// Move the pending tail into a larger buffer with at least
    /// `min_spare` free bytes after it.
    pub fn grow(&mut self, min_spare: usize) -> Result<()> {
        let tail = self.buf.len() - self.rd;
        let need = match tail.checked_add(min_spare) {
            Some(need) if need <= self.max => need,
            _ => return Err(Error::Overflow { capacity: self.max }),
        };
        let cap = self.buf.capacity().saturating_mul(2).clamp(need, self.max);

        let mut fresh = BytesMut::with_capacity(cap);
        fresh.extend_from_slice(&self.buf[self.rd..]);
        tracing::debug!(
            from = self.buf.capacity(),
            to = cap,
            kept = tail,
            "growing receive buffer"
        );
        self.buf = fresh;
        self.rd = 0;
        Ok(())
    }

    /// Append bytes received by other means.
    pub fn extend_from_slice(&mut self, data: &[u8]) -> Result<()> {
        self.reserve(data.len())?;
        self.buf.extend_from_slice(data);
        Ok(())
    }

    /// Writable storage for the socket layer.
    pub(crate) fn storage(&mut self) -> &mut BytesMut {
        &mut self.buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::Builder;

    fn message(seq: u32, payload: &[u8]) -> Vec<u8> {
        let mut buf = [0u8; 256];
        let mut b = Builder::netlink(&mut buf, 0x20, 0);
        b.set_seq(seq);
        b.put_bytes(1, payload);
        b.finish().unwrap().to_vec()
    }

    #[test]
    fn test_consume_and_clear() {
        let mut rb = RecvBuf::with_limits(64, 128);
        rb.extend_from_slice(&[1, 2, 3, 4]).unwrap();
        rb.consume(1);
        assert_eq!(rb.pending(), &[2, 3, 4]);
        rb.consume(10);
        assert!(rb.pending().is_empty());
        assert_eq!(rb.spare(), rb.capacity());
    }

    #[test]
    fn test_grow_keeps_only_tail() {
        let first = message(1, &[0xAA; 8]);
        let second = message(2, &[0xBB; 8]);

        let mut rb = RecvBuf::with_limits(first.len() + second.len(), 4096);
        rb.extend_from_slice(&first).unwrap();
        rb.extend_from_slice(&second).unwrap();
        rb.consume(first.len());
        assert_eq!(rb.spare(), rb.capacity() - first.len() - second.len());

        rb.grow(100).unwrap();
        assert_eq!(rb.pending(), &second[..]);
        assert!(rb.spare() >= 100);

        let seqs: Vec<u32> = rb.messages().map(|m| m.unwrap().seq()).collect();
        assert_eq!(seqs, vec![2]);
    }

    #[test]
    fn test_reserve_grows_on_demand() {
        let mut rb = RecvBuf::with_limits(16, 1024);
        rb.extend_from_slice(&[7; 12]).unwrap();
        rb.extend_from_slice(&[8; 100]).unwrap();
        assert_eq!(rb.pending().len(), 112);
        assert_eq!(rb.pending()[11], 7);
        assert_eq!(rb.pending()[12], 8);
    }

    #[test]
    fn test_growth_is_bounded() {
        let mut rb = RecvBuf::with_limits(16, 64);
        rb.extend_from_slice(&[0; 16]).unwrap();
        assert!(matches!(
            rb.reserve(100),
            Err(Error::Overflow { capacity: 64 })
        ));
        assert_eq!(rb.pending().len(), 16);
        assert!(rb.grow(usize::MAX).is_err());
    }

    #[test]
    fn test_messages_over_batch() {
        let mut rb = RecvBuf::new();
        for seq in 1..=3 {
            rb.extend_from_slice(&message(seq, b"x")).unwrap();
        }
        let seqs: Vec<u32> = rb.messages().map(|m| m.unwrap().seq()).collect();
        assert_eq!(seqs, vec![1, 2, 3]);
    }
}
