//! Attribute (TLV) records.
//!
//! Every record is `{ length, key }` followed by a payload and zero padding up
//! to the next 4-byte boundary. `length` counts the header and the payload,
//! never the padding. The header layout differs between wire protocols, so
//! it is abstracted behind [`Format`]; everything else in the codec is shared.

use std::fmt;
use std::marker::PhantomData;

use super::reader::Attrs;

/// Largest `length` an attribute may carry on the wire.
pub const MAX_ATTR_LEN: usize = u16::MAX as usize;

/// Wire layout of one protocol's records and message header.
pub trait Format: Copy + fmt::Debug + 'static {
    /// Attribute key as stored in the record header.
    type Key: Copy + Eq + fmt::Debug;

    /// Size of an attribute header.
    const ATTR_HDRLEN: usize;

    /// Smallest valid message header.
    const MSG_HDRLEN: usize;

    /// Write an attribute header into `out` (exactly `ATTR_HDRLEN` bytes).
    fn write_attr_hdr(out: &mut [u8], len: u16, key: Self::Key);

    /// Read an attribute header, returning `(length, raw key)`.
    fn read_attr_hdr(data: &[u8]) -> Option<(usize, Self::Key)>;

    /// Key to store for a nest header.
    fn nest_key(key: Self::Key) -> Self::Key {
        key
    }

    /// Strip any flag bits from a stored key.
    fn kind(raw: Self::Key) -> Self::Key {
        raw
    }

    /// Write the total message length into the message header.
    fn write_msg_len(hdr: &mut [u8], len: u32);

    /// Read the declared total message length from a message header.
    fn read_msg_len(hdr: &[u8]) -> Option<usize>;
}

mod private {
    pub trait Sealed {}
}

/// Fixed-width integers that can be carried as attribute payloads.
///
/// Encoding is native endian; decoding demands an exact payload size.
pub trait Scalar: private::Sealed + Copy {
    /// Encoded size in bytes.
    const SIZE: usize;

    /// Encode into `out`, which is exactly `SIZE` bytes.
    fn write_ne(self, out: &mut [u8]);

    /// Decode from a payload of exactly `SIZE` bytes.
    fn read_ne(data: &[u8]) -> Option<Self>;
}

macro_rules! impl_scalar {
    ($($t:ty),* $(,)?) => {
        $(
            impl private::Sealed for $t {}

            impl Scalar for $t {
                const SIZE: usize = std::mem::size_of::<$t>();

                #[inline]
                fn write_ne(self, out: &mut [u8]) {
                    out.copy_from_slice(&self.to_ne_bytes());
                }

                #[inline]
                fn read_ne(data: &[u8]) -> Option<Self> {
                    let bytes: [u8; std::mem::size_of::<$t>()] = data.try_into().ok()?;
                    Some(<$t>::from_ne_bytes(bytes))
                }
            }
        )*
    };
}

impl_scalar!(u8, u16, u32, u64, i8, i16, i32, i64);

/// Check that `data` is a single NUL-terminated string: non-empty, ending in
/// NUL, with no NUL before the last byte.
pub fn is_zstr(data: &[u8]) -> bool {
    match data.split_last() {
        Some((0, body)) => !body.contains(&0),
        _ => false,
    }
}

/// Payload size for a string of `len` bytes plus its terminator.
#[inline]
pub(crate) const fn zstr_len(len: usize) -> usize {
    len + 1
}

/// A single attribute record borrowed from a message buffer.
#[derive(Debug, Clone, Copy)]
pub struct Attr<'a, F: Format> {
    raw_key: F::Key,
    payload: &'a [u8],
    _format: PhantomData<F>,
}

impl<'a, F: Format> Attr<'a, F> {
    pub(crate) fn new(raw_key: F::Key, payload: &'a [u8]) -> Self {
        Self {
            raw_key,
            payload,
            _format: PhantomData,
        }
    }

    /// Attribute key with flag bits removed.
    pub fn key(&self) -> F::Key {
        F::kind(self.raw_key)
    }

    /// Attribute key exactly as stored on the wire.
    pub fn raw_key(&self) -> F::Key {
        self.raw_key
    }

    /// Payload bytes (padding excluded).
    pub fn payload(&self) -> &'a [u8] {
        self.payload
    }

    /// Decode a fixed-width integer; the payload size must match exactly.
    pub fn as_int<T: Scalar>(&self) -> Option<T> {
        T::read_ne(self.payload)
    }

    /// Decode a NUL-terminated UTF-8 string.
    pub fn as_str(&self) -> Option<&'a str> {
        if !is_zstr(self.payload) {
            return None;
        }
        std::str::from_utf8(&self.payload[..self.payload.len() - 1]).ok()
    }

    /// Payload, only if it is exactly `len` bytes long.
    pub fn as_bytes(&self, len: usize) -> Option<&'a [u8]> {
        (self.payload.len() == len).then_some(self.payload)
    }

    /// Parse the payload as a nested attribute sequence.
    ///
    /// Succeeds only if the children tile the payload exactly.
    pub fn as_nest(&self) -> Option<Attrs<'a, F>> {
        Attrs::parse_nest(self.payload)
    }
}
