//! Message builder for constructing TLV messages in a caller-owned buffer.
//!
//! The builder never allocates and never writes outside the slice it was
//! given. Failures are sticky: the first `put` that does not fit zeroes the
//! message length field and latches the cursor invalid, after which every
//! append is a no-op. Callers chain their puts and check once, at
//! [`Builder::finish`].
//!
//! ```
//! use nlkit::{Builder, CtlMsg};
//!
//! let mut buf = [0u8; 128];
//! let mut b = Builder::ctl(&mut buf, 0x53550012);
//! b.put_i32(3, 12345);
//! let nest = b.begin_nest(6);
//! b.put_str(8, "nest 1");
//! b.end_nest(nest);
//! let wire = b.finish()?;
//!
//! let msg = CtlMsg::parse(wire)?;
//! assert_eq!(msg.attrs().get_i32(3), Some(12345));
//! # Ok::<(), nlkit::Error>(())
//! ```

use std::marker::PhantomData;
use std::ops::Range;

use super::attr::{Format, MAX_ATTR_LEN, Scalar, zstr_len};
use super::cursor::{ALIGNTO, Cursor, align, checked_align};
use crate::error::{Error, Result};

/// Location of a record written by [`Builder::put`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AttrHandle {
    offset: usize,
}

impl AttrHandle {
    /// Offset of the record header from the start of the message.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

/// Token returned when starting a nested attribute.
/// Used to finalize the nested attribute length.
///
/// Consumed by [`Builder::end_nest`], so a nest is closed at most once.
#[derive(Debug)]
pub struct NestToken<K> {
    /// Offset of the nested attribute header in the buffer.
    offset: usize,
    /// Key written into that header, for stale-token detection.
    key: K,
}

/// Builder for constructing messages of format `F` in place.
#[derive(Debug)]
pub struct Builder<'buf, F: Format> {
    buf: &'buf mut [u8],
    hdrlen: usize,
    cursor: Cursor,
    _format: PhantomData<F>,
}

impl<'buf, F: Format> Builder<'buf, F> {
    /// Start a message with a `hdrlen`-byte header region in `buf`.
    ///
    /// The header region is zeroed and the cursor placed right after it. A
    /// header shorter than the format minimum, or one that does not fit in
    /// `buf`, yields a builder that is already invalid.
    pub fn begin(buf: &'buf mut [u8], hdrlen: usize) -> Self {
        let limit = buf.len();
        let start = checked_align(hdrlen).filter(|&s| hdrlen >= F::MSG_HDRLEN && s <= limit);
        let mut b = Self {
            buf,
            hdrlen: if start.is_some() { hdrlen } else { 0 },
            cursor: Cursor::new(start.unwrap_or(usize::MAX), limit),
            _format: PhantomData,
        };
        match start {
            Some(start) => b.buf[..start].fill(0),
            None => b.fail(),
        }
        b
    }

    /// Size of the header region.
    pub fn header_len(&self) -> usize {
        self.hdrlen
    }

    /// Header region, for the framing layer to fill in.
    pub(crate) fn header_mut(&mut self) -> Option<&mut [u8]> {
        if !self.cursor.is_valid() {
            return None;
        }
        Some(&mut self.buf[..self.hdrlen])
    }

    /// Bytes written so far, header included (0 once invalid).
    pub fn len(&self) -> usize {
        self.cursor.offset().unwrap_or(0)
    }

    /// Check if nothing has been written past the header.
    pub fn is_empty(&self) -> bool {
        self.cursor.offset() == Some(align(self.hdrlen))
    }

    /// Bytes still available.
    pub fn remaining(&self) -> usize {
        self.cursor.remaining()
    }

    /// Check whether every operation so far has succeeded.
    pub fn is_valid(&self) -> bool {
        self.cursor.is_valid()
    }

    /// Bytes written so far (empty once invalid).
    pub fn as_bytes(&self) -> &[u8] {
        &self.buf[..self.len()]
    }

    /// Latch the failure state: cursor invalid, length field zeroed.
    fn fail(&mut self) {
        if self.cursor.is_valid() {
            tracing::trace!(capacity = self.buf.len(), "message overflow, discarding");
        }
        self.cursor.invalidate();
        if self.buf.len() >= F::MSG_HDRLEN {
            F::write_msg_len(&mut self.buf[..F::MSG_HDRLEN], 0);
        }
    }

    /// Claim room for one record with a `payload_len`-byte payload.
    ///
    /// Writes the header and zeroes payload and padding. Returns the offset
    /// of the record and the payload range.
    fn alloc(&mut self, key: F::Key, payload_len: usize) -> Option<(usize, Range<usize>)> {
        if !self.cursor.is_valid() {
            return None;
        }
        let attr_len = match payload_len.checked_add(F::ATTR_HDRLEN) {
            Some(len) if len <= MAX_ATTR_LEN => len,
            _ => {
                self.fail();
                return None;
            }
        };
        let Some(full) = checked_align(attr_len) else {
            self.fail();
            return None;
        };
        let Some(range) = self.cursor.advance(full) else {
            self.fail();
            return None;
        };

        let record = &mut self.buf[range.clone()];
        record.fill(0);
        F::write_attr_hdr(&mut record[..F::ATTR_HDRLEN], attr_len as u16, key);

        let payload_start = range.start + F::ATTR_HDRLEN;
        Some((range.start, payload_start..payload_start + payload_len))
    }

    /// Append an attribute with the given key and payload.
    pub fn put(&mut self, key: F::Key, payload: &[u8]) -> Option<AttrHandle> {
        let (offset, range) = self.alloc(key, payload.len())?;
        self.buf[range].copy_from_slice(payload);
        Some(AttrHandle { offset })
    }

    /// Append an attribute with a zeroed `len`-byte payload and hand the
    /// payload back for the caller to fill.
    pub fn reserve(&mut self, key: F::Key, len: usize) -> Option<&mut [u8]> {
        let (_, range) = self.alloc(key, len)?;
        Some(&mut self.buf[range])
    }

    /// Append a fixed-width integer attribute (native endian).
    pub fn put_int<T: Scalar>(&mut self, key: F::Key, value: T) -> Option<AttrHandle> {
        let (offset, range) = self.alloc(key, T::SIZE)?;
        value.write_ne(&mut self.buf[range]);
        Some(AttrHandle { offset })
    }

    /// Append a u8 attribute.
    pub fn put_u8(&mut self, key: F::Key, value: u8) -> Option<AttrHandle> {
        self.put_int(key, value)
    }

    /// Append a u16 attribute.
    pub fn put_u16(&mut self, key: F::Key, value: u16) -> Option<AttrHandle> {
        self.put_int(key, value)
    }

    /// Append a u32 attribute.
    pub fn put_u32(&mut self, key: F::Key, value: u32) -> Option<AttrHandle> {
        self.put_int(key, value)
    }

    /// Append an i32 attribute.
    pub fn put_i32(&mut self, key: F::Key, value: i32) -> Option<AttrHandle> {
        self.put_int(key, value)
    }

    /// Append a u64 attribute.
    pub fn put_u64(&mut self, key: F::Key, value: u64) -> Option<AttrHandle> {
        self.put_int(key, value)
    }

    /// Append an i64 attribute.
    pub fn put_i64(&mut self, key: F::Key, value: i64) -> Option<AttrHandle> {
        self.put_int(key, value)
    }

    /// Append a null-terminated string attribute.
    ///
    /// A string containing NUL cannot be read back and fails the message.
    pub fn put_str(&mut self, key: F::Key, value: &str) -> Option<AttrHandle> {
        if value.as_bytes().contains(&0) {
            self.fail();
            return None;
        }
        let (offset, range) = self.alloc(key, zstr_len(value.len()))?;
        // Terminator is already zero.
        self.buf[range.start..range.end - 1].copy_from_slice(value.as_bytes());
        Some(AttrHandle { offset })
    }

    /// Append a raw byte attribute.
    pub fn put_bytes(&mut self, key: F::Key, value: &[u8]) -> Option<AttrHandle> {
        self.put(key, value)
    }

    /// Append an empty (flag) attribute with no payload.
    pub fn put_flag(&mut self, key: F::Key) -> Option<AttrHandle> {
        self.put(key, &[])
    }

    /// Start a nested attribute. Returns a token to finalize it.
    pub fn begin_nest(&mut self, key: F::Key) -> Option<NestToken<F::Key>> {
        let key = F::nest_key(key);
        let (offset, _) = self.alloc(key, 0)?;
        Some(NestToken { offset, key })
    }

    /// End a nested attribute started with [`begin_nest`](Self::begin_nest).
    ///
    /// `None`, or a token that does not point at an open nest of this
    /// message, is ignored and reported as `false`. A nest longer than the
    /// 16-bit attribute limit fails the whole message.
    pub fn end_nest(&mut self, token: Option<NestToken<F::Key>>) -> bool {
        let Some(end) = self.cursor.offset() else {
            return false;
        };
        let Some(token) = token else {
            return false;
        };
        if !self.owns_nest(&token, end) {
            tracing::debug!(offset = token.offset, "ignoring stale nest token");
            return false;
        }
        let len = end - token.offset;
        if len > MAX_ATTR_LEN {
            self.fail();
            return false;
        }
        let hdr = &mut self.buf[token.offset..token.offset + F::ATTR_HDRLEN];
        F::write_attr_hdr(hdr, len as u16, token.key);
        true
    }

    /// Range-check a token against the written part of this buffer.
    ///
    /// The header must still hold the placeholder length `begin_nest`
    /// wrote; a closed nest has moved past it unless it was empty.
    fn owns_nest(&self, token: &NestToken<F::Key>, end: usize) -> bool {
        let start = align(self.hdrlen);
        let Some(hdr_end) = token.offset.checked_add(F::ATTR_HDRLEN) else {
            return false;
        };
        if token.offset < start || hdr_end > end || token.offset % ALIGNTO != 0 {
            return false;
        }
        matches!(
            F::read_attr_hdr(&self.buf[token.offset..hdr_end]),
            Some((len, key)) if len == F::ATTR_HDRLEN && key == token.key
        )
    }

    /// Finalize the message and return the bytes to send.
    ///
    /// Writes the total length into the header. Fails if any earlier
    /// operation overflowed.
    pub fn finish(self) -> Result<&'buf [u8]> {
        let capacity = self.buf.len();
        let Some(len) = self.cursor.offset() else {
            return Err(Error::Overflow { capacity });
        };
        let Ok(len32) = u32::try_from(len) else {
            return Err(Error::Overflow { capacity });
        };
        let buf: &'buf mut [u8] = self.buf;
        F::write_msg_len(&mut buf[..F::MSG_HDRLEN], len32);
        Ok(&buf[..len])
    }
}
